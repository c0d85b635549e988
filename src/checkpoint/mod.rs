mod manager;
mod metadata;

pub use manager::{timestamp_secs, CheckpointData, CheckpointManager, CheckpointManagerConfig};
pub use metadata::{CheckpointMetadata, CheckpointMetrics, TrainingMode};
