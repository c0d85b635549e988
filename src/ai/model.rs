use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use burn::backend::{Autodiff, NdArray};
use burn::tensor::TensorData;
use burn::prelude::*;

use crate::ai::networks::{NetworkArchitecture, PolicyNetwork};
use crate::error::DecisionError;

pub type InferBackend = NdArray<f32>;
pub type TrainBackend = Autodiff<InferBackend>;

/// One immutable published set of weights.
#[derive(Debug)]
pub struct ModelVersion {
    version: u64,
    architecture: NetworkArchitecture,
    // Parameters are lazily materialised, so the module is `Send` but not
    // `Sync`. Readers clone it out under the lock and run inference unlocked.
    network: Mutex<PolicyNetwork<InferBackend>>,
}

impl ModelVersion {
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn architecture(&self) -> NetworkArchitecture {
        self.architecture
    }

    /// A private copy of the weights. Tensor storage is shared, so this is
    /// cheap.
    pub fn network(&self) -> PolicyNetwork<InferBackend> {
        self.network
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Scores for a single feature row, one per action slot.
    pub fn score(&self, features: &[f32]) -> Result<Vec<f32>, DecisionError> {
        if features.len() != self.architecture.input_len {
            return Err(DecisionError::InvalidSnapshot(format!(
                "feature vector has {} entries, model expects {}",
                features.len(),
                self.architecture.input_len
            )));
        }
        let device = Default::default();
        let input = Tensor::<InferBackend, 2>::from_data(
            TensorData::new(features.to_vec(), [1, features.len()]),
            &device,
        );
        self.network()
            .forward(input)
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| DecisionError::Inference(format!("{e:?}")))
    }
}

/// Copy-on-write holder for a model's weights. Readers take an `Arc` to the
/// current version and keep using it for the whole decision; writers publish
/// a complete new version by swapping the reference.
#[derive(Debug, Default)]
pub struct SharedModel {
    current: RwLock<Option<Arc<ModelVersion>>>,
    next_version: AtomicU64,
}

impl SharedModel {
    /// A slot with no weights loaded yet.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_network(
        architecture: NetworkArchitecture,
        network: PolicyNetwork<InferBackend>,
    ) -> Self {
        let model = Self::empty();
        model.publish(architecture, network);
        model
    }

    /// Freshly initialised random weights.
    pub fn initialized(architecture: NetworkArchitecture) -> Self {
        let device = Default::default();
        Self::with_network(architecture, architecture.init(&device))
    }

    /// The version in force right now, if any.
    pub fn snapshot(&self) -> Option<Arc<ModelVersion>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Publish new weights; returns the version number assigned to them.
    pub fn publish(
        &self,
        architecture: NetworkArchitecture,
        network: PolicyNetwork<InferBackend>,
    ) -> u64 {
        let version = self.next_version.fetch_add(1, Ordering::SeqCst) + 1;
        self.swap(Arc::new(ModelVersion {
            version,
            architecture,
            network: Mutex::new(network),
        }));
        version
    }

    /// Install an already-published version (e.g. copying online weights
    /// into a target slot) without rebuilding it.
    pub fn publish_version(&self, version: Arc<ModelVersion>) {
        self.next_version.fetch_max(version.version, Ordering::SeqCst);
        self.swap(version);
    }

    pub fn is_loaded(&self) -> bool {
        self.snapshot().is_some()
    }

    pub fn version(&self) -> Option<u64> {
        self.snapshot().map(|m| m.version)
    }

    fn swap(&self, version: Arc<ModelVersion>) {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Some(version);
    }
}
