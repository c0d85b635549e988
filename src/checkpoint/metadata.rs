use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ai::NetworkArchitecture;
use crate::game::BoardDims;
use crate::training::{ReinforcementConfig, SupervisedConfig};

/// Which training path produced a checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainingMode {
    Supervised,
    Reinforcement,
}

impl TrainingMode {
    pub fn name(self) -> &'static str {
        match self {
            TrainingMode::Supervised => "supervised",
            TrainingMode::Reinforcement => "reinforcement",
        }
    }
}

impl fmt::Display for TrainingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TrainingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "supervised" => Ok(TrainingMode::Supervised),
            "reinforcement" | "rl" => Ok(TrainingMode::Reinforcement),
            other => Err(format!("unknown training mode '{}'", other)),
        }
    }
}

/// Metrics snapshot at checkpoint time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckpointMetrics {
    /// Ranking value for pruning; higher is better.
    pub score: f32,
    pub loss: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_reward: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epsilon: Option<f32>,
    pub training_steps: usize,
}

/// Top-level checkpoint metadata written to metadata.json.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointMetadata {
    /// Epoch for supervised runs, episode for reinforcement runs.
    pub step: usize,
    pub timestamp: u64,
    pub mode: TrainingMode,
    pub architecture: NetworkArchitecture,
    pub board: BoardDims,
    pub metrics: CheckpointMetrics,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supervised: Option<SupervisedConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reinforcement: Option<ReinforcementConfig>,
}
