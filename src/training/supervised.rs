use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use burn::module::AutodiffModule;
use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use burn::prelude::*;
use burn::tensor::activation::log_softmax;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::ai::features::encode_batch;
use crate::ai::{InferBackend, NetworkArchitecture, PolicyNetwork, TrainBackend};
use crate::checkpoint::{
    timestamp_secs, CheckpointManager, CheckpointManagerConfig, CheckpointMetadata,
    CheckpointMetrics, TrainingMode,
};
use crate::error::TrainingError;
use crate::game::BoardDims;
use crate::training::dataset::{LabeledDataset, LabeledExample};

/// Hyperparameters of the supervised path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisedConfig {
    pub learning_rate: f64,
    pub batch_size: usize,
    pub max_epochs: usize,
    /// Consecutive epochs without a better validation loss before stopping.
    pub patience: usize,
    pub validation_split: f32,
}

impl Default for SupervisedConfig {
    fn default() -> Self {
        SupervisedConfig {
            learning_rate: 1e-3,
            batch_size: 32,
            max_epochs: 100,
            patience: 5,
            validation_split: 0.2,
        }
    }
}

/// Why a training run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    Completed,
    EarlyStopped,
    Cancelled,
}

/// Outcome of a supervised run. `network` holds the best-validation weights,
/// which are also what was written to `best_path`.
#[derive(Debug)]
pub struct SupervisedReport {
    pub best_path: PathBuf,
    pub best_epoch: usize,
    pub best_val_loss: f32,
    pub epochs_run: usize,
    pub stop: StopReason,
    pub network: PolicyNetwork<InferBackend>,
}

/// Mini-batch trainer for the learned strategy's network.
pub struct SupervisedTrainer {
    config: SupervisedConfig,
    architecture: NetworkArchitecture,
    board: BoardDims,
    checkpoint: CheckpointManagerConfig,
    cancel: Arc<AtomicBool>,
}

impl SupervisedTrainer {
    pub fn new(
        config: SupervisedConfig,
        architecture: NetworkArchitecture,
        board: BoardDims,
        checkpoint: CheckpointManagerConfig,
    ) -> Self {
        SupervisedTrainer {
            config,
            architecture,
            board,
            checkpoint,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    /// Setting the flag stops the run at the next epoch boundary.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Train on `dataset`, keeping the weights with the lowest validation
    /// loss. Only those weights are persisted.
    ///
    /// Fails with `InsufficientTrainingData` before touching the filesystem
    /// when either partition would be empty.
    pub fn train(
        &self,
        dataset: &LabeledDataset,
        rng: &mut StdRng,
    ) -> Result<SupervisedReport, TrainingError> {
        if dataset.len() < 2 {
            return Err(TrainingError::InsufficientTrainingData {
                needed: 2,
                available: dataset.len(),
            });
        }
        if dataset.feature_len != self.architecture.input_len
            || dataset.action_slots != self.architecture.output_len
        {
            return Err(TrainingError::ArchitectureMismatch(format!(
                "dataset is {}x{}, network expects {}x{}",
                dataset.feature_len,
                dataset.action_slots,
                self.architecture.input_len,
                self.architecture.output_len
            )));
        }
        dataset.validate()?;

        let (train, validation) = dataset.split(self.config.validation_split, rng);
        if train.is_empty() || validation.is_empty() {
            return Err(TrainingError::InsufficientTrainingData {
                needed: 2,
                available: dataset.len(),
            });
        }

        let device = Default::default();
        let mut net: PolicyNetwork<TrainBackend> = self.architecture.init(&device);
        let mut optimizer = AdamConfig::new().init::<TrainBackend, PolicyNetwork<TrainBackend>>();
        let batch_size = self.config.batch_size.max(1);

        info!(
            train = train.len(),
            validation = validation.len(),
            max_epochs = self.config.max_epochs,
            "Starting supervised training"
        );

        let mut best: Option<(usize, f32, PolicyNetwork<InferBackend>)> = None;
        let mut since_best = 0usize;
        let mut epochs_run = 0usize;
        let mut updates = 0usize;
        let mut stop = StopReason::Completed;
        let mut order: Vec<usize> = (0..train.len()).collect();

        for epoch in 1..=self.config.max_epochs {
            if self.cancel.load(Ordering::Relaxed) {
                stop = StopReason::Cancelled;
                break;
            }

            order.shuffle(rng);
            let mut train_loss = 0.0f32;
            let mut batches = 0usize;
            for chunk in order.chunks(batch_size) {
                let examples: Vec<&LabeledExample> =
                    chunk.iter().map(|&i| &train.examples[i]).collect();
                let (inputs, targets) = batch_tensors::<TrainBackend>(&examples, &device);
                let loss = soft_cross_entropy(net.forward(inputs), targets);
                train_loss += tensor_scalar(loss.clone())?;
                batches += 1;

                let grads = loss.backward();
                let grads = GradientsParams::from_grads(grads, &net);
                net = optimizer.step(self.config.learning_rate, net.clone(), grads);
                updates += 1;
            }
            epochs_run = epoch;

            let snapshot = net.valid();
            let val_loss = validation_loss(&snapshot, &validation)?;
            info!(
                epoch,
                train_loss = train_loss / batches.max(1) as f32,
                val_loss,
                "Epoch finished"
            );

            if best.as_ref().is_none_or(|(_, loss, _)| val_loss < *loss) {
                best = Some((epoch, val_loss, snapshot));
                since_best = 0;
            } else {
                since_best += 1;
                if since_best >= self.config.patience {
                    debug!(epoch, patience = self.config.patience, "Stopping early");
                    stop = StopReason::EarlyStopped;
                    break;
                }
            }
        }

        let Some((best_epoch, best_val_loss, network)) = best else {
            info!("Supervised training cancelled before the first epoch finished");
            return Err(TrainingError::Cancelled);
        };

        let metadata = CheckpointMetadata {
            step: best_epoch,
            timestamp: timestamp_secs(),
            mode: TrainingMode::Supervised,
            architecture: self.architecture,
            board: self.board,
            metrics: CheckpointMetrics {
                score: -best_val_loss,
                loss: best_val_loss,
                training_steps: updates,
                ..Default::default()
            },
            supervised: Some(self.config.clone()),
            reinforcement: None,
        };
        let manager = CheckpointManager::new(self.checkpoint.clone());
        let best_path = manager.save_model(
            &network,
            &metadata,
            &format!("supervised_best_{}", metadata.timestamp),
        )?;

        info!(
            best_epoch,
            best_val_loss,
            epochs_run,
            ?stop,
            path = %best_path.display(),
            "Supervised training finished"
        );

        Ok(SupervisedReport {
            best_path,
            best_epoch,
            best_val_loss,
            epochs_run,
            stop,
            network,
        })
    }
}

/// Inputs and row-normalised targets for a batch.
fn batch_tensors<B: Backend>(
    examples: &[&LabeledExample],
    device: &B::Device,
) -> (Tensor<B, 2>, Tensor<B, 2>) {
    let features: Vec<Vec<f32>> = examples.iter().map(|e| e.features.clone()).collect();
    let targets: Vec<Vec<f32>> = examples
        .iter()
        .map(|e| {
            let total: f32 = e.target.iter().sum();
            e.target.iter().map(|v| v / total).collect()
        })
        .collect();
    (
        encode_batch::<B>(&features, device),
        encode_batch::<B>(&targets, device),
    )
}

/// Cross-entropy against a target distribution, averaged over the batch.
fn soft_cross_entropy<B: Backend>(logits: Tensor<B, 2>, targets: Tensor<B, 2>) -> Tensor<B, 1> {
    (targets * log_softmax(logits, 1))
        .sum_dim(1)
        .mean()
        .neg()
}

fn validation_loss(
    network: &PolicyNetwork<InferBackend>,
    validation: &LabeledDataset,
) -> Result<f32, TrainingError> {
    let device = Default::default();
    let examples: Vec<&LabeledExample> = validation.examples.iter().collect();
    let (inputs, targets) = batch_tensors::<InferBackend>(&examples, &device);
    tensor_scalar(soft_cross_entropy(network.forward(inputs), targets))
}

/// Pull the single value out of a loss tensor.
pub(crate) fn tensor_scalar<B: Backend>(tensor: Tensor<B, 1>) -> Result<f32, TrainingError> {
    tensor
        .into_data()
        .to_vec::<f32>()
        .map_err(|e| TrainingError::Inference(format!("{e:?}")))?
        .first()
        .copied()
        .ok_or_else(|| TrainingError::Inference("empty loss tensor".to_string()))
}
