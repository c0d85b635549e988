use burn::module::AutodiffModule;
use burn::optim::adaptor::OptimizerAdaptor;
use burn::optim::{Adam, AdamConfig, GradientsParams, Optimizer};
use burn::prelude::*;
use burn::record::{BinBytesRecorder, FullPrecisionSettings, Recorder};
use burn::tensor::TensorData;

use crate::ai::features::{encode_batch, extract_features};
use crate::ai::{
    Experience, InferBackend, ModelVersion, NetworkArchitecture, PolicyNetwork, TrainBackend,
};
use crate::error::TrainingError;
use crate::game::{generate_legal_actions, BoardDims};
use crate::training::supervised::tensor_scalar;

/// Online Q-network plus its optimizer. Targets come from whatever target
/// version the caller passes in.
pub struct DqnLearner {
    online: PolicyNetwork<TrainBackend>,
    optimizer: OptimizerAdaptor<Adam, PolicyNetwork<TrainBackend>, TrainBackend>,
    architecture: NetworkArchitecture,
    dims: BoardDims,
    learning_rate: f64,
    gamma: f32,
    device: <TrainBackend as Backend>::Device,
    steps: usize,
}

impl DqnLearner {
    pub fn new(
        architecture: NetworkArchitecture,
        dims: BoardDims,
        learning_rate: f64,
        gamma: f32,
    ) -> Self {
        let device = Default::default();
        DqnLearner {
            online: architecture.init(&device),
            optimizer: AdamConfig::new().init(),
            architecture,
            dims,
            learning_rate,
            gamma,
            device,
            steps: 0,
        }
    }

    /// Continue training from existing inference weights. The weights are
    /// moved onto the autodiff backend through an in-memory record; the
    /// optimizer starts fresh.
    pub fn from_network(
        architecture: NetworkArchitecture,
        dims: BoardDims,
        learning_rate: f64,
        gamma: f32,
        network: PolicyNetwork<InferBackend>,
    ) -> Result<Self, TrainingError> {
        let recorder = BinBytesRecorder::<FullPrecisionSettings>::default();
        let bytes = Recorder::<InferBackend>::record(&recorder, network.into_record(), ())
            .map_err(|e| TrainingError::Inference(format!("cannot record weights: {e}")))?;
        let device = Default::default();
        let record = Recorder::<TrainBackend>::load(&recorder, bytes, &device)
            .map_err(|e| TrainingError::Inference(format!("cannot load weights: {e}")))?;
        let mut learner = Self::new(architecture, dims, learning_rate, gamma);
        learner.online = architecture.init::<TrainBackend>(&device).load_record(record);
        Ok(learner)
    }

    pub fn architecture(&self) -> NetworkArchitecture {
        self.architecture
    }

    /// Gradient steps taken so far.
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Inference copy of the online weights, ready to publish.
    pub fn snapshot(&self) -> PolicyNetwork<InferBackend> {
        self.online.valid()
    }

    /// One gradient step on `batch`, returning the MSE loss.
    ///
    /// Target per experience: `reward` when done, else
    /// `reward + gamma * max` over the next state's legal slots as scored by
    /// `target`.
    pub fn train_step(
        &mut self,
        batch: &[Experience],
        target: &ModelVersion,
    ) -> Result<f32, TrainingError> {
        let batch_size = batch.len();
        if batch_size == 0 {
            return Err(TrainingError::InsufficientTrainingData {
                needed: 1,
                available: 0,
            });
        }
        if target.architecture() != self.architecture {
            return Err(TrainingError::ArchitectureMismatch(
                "target network differs from the online network".to_string(),
            ));
        }
        let slots = self.architecture.output_len;

        let mut states = Vec::with_capacity(batch_size);
        let mut next_states = Vec::with_capacity(batch_size);
        for (index, e) in batch.iter().enumerate() {
            if e.action_slot >= slots {
                return Err(TrainingError::MalformedExample {
                    index,
                    reason: format!("action slot {} outside 0..{}", e.action_slot, slots),
                });
            }
            states.push(extract_features(&e.state, self.dims)?);
            next_states.push(extract_features(&e.next_state, self.dims)?);
        }

        // Q(s, ·) for the batch: [B, slots]
        let q_all = self
            .online
            .forward(encode_batch::<TrainBackend>(&states, &self.device));

        // One-hot mask picks Q(s, a)
        let mut mask = vec![0.0f32; batch_size * slots];
        for (i, e) in batch.iter().enumerate() {
            mask[i * slots + e.action_slot] = 1.0;
        }
        let mask = Tensor::<TrainBackend, 2>::from_data(
            TensorData::new(mask, [batch_size, slots]),
            &self.device,
        );
        let q_taken = (q_all * mask).sum_dim(1);

        // Bellman targets from the target network, no gradient.
        let next_q: Vec<f32> = target
            .network()
            .forward(encode_batch::<InferBackend>(&next_states, &self.device))
            .into_data()
            .to_vec()
            .map_err(|e| TrainingError::Inference(format!("{e:?}")))?;

        let targets: Vec<f32> = batch
            .iter()
            .enumerate()
            .map(|(i, e)| {
                if e.done {
                    return e.reward;
                }
                let legal = generate_legal_actions(&e.next_state).len().min(slots);
                let max_q = next_q[i * slots..i * slots + legal]
                    .iter()
                    .copied()
                    .fold(f32::NEG_INFINITY, f32::max);
                if max_q.is_finite() {
                    e.reward + self.gamma * max_q
                } else {
                    e.reward
                }
            })
            .collect();
        let targets = Tensor::<TrainBackend, 2>::from_data(
            TensorData::new(targets, [batch_size, 1]),
            &self.device,
        );

        // MSE loss
        let diff = q_taken - targets;
        let loss = (diff.clone() * diff).mean();
        let loss_val = tensor_scalar(loss.clone())?;

        let grads = loss.backward();
        let grads = GradientsParams::from_grads(grads, &self.online);
        self.online = self
            .optimizer
            .step(self.learning_rate, self.online.clone(), grads);
        self.steps += 1;

        Ok(loss_val)
    }
}
