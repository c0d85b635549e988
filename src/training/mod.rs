//! Training infrastructure: supervised fitting from labelled data, DQN
//! self-play with experience replay, reward shaping, and a sandbox
//! environment for local episodes.

pub mod dataset;
pub mod dqn_learner;
pub mod episode;
pub mod metrics;
pub mod replay_buffer;
pub mod reward;
pub mod supervised;
pub mod trainer;

pub use dataset::{evaluate_accuracy, LabeledDataset, LabeledExample};
pub use dqn_learner::DqnLearner;
pub use episode::{episode_seed, GameEnvironment, SandboxEnvironment, SandboxRules};
pub use metrics::{EpisodeResult, TrainingMetrics};
pub use replay_buffer::{ReplayBuffer, SharedReplayBuffer};
pub use reward::{compute_reward, reward_breakdown, RewardBreakdown};
pub use supervised::{StopReason, SupervisedConfig, SupervisedReport, SupervisedTrainer};
pub use trainer::{ReinforcementConfig, ReinforcementReport, ReinforcementTrainer};
