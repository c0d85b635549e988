pub mod features;
pub mod model;
pub mod networks;
pub mod strategies;
mod strategy;
mod tier;

pub use model::{InferBackend, ModelVersion, SharedModel, TrainBackend};
pub use networks::{NetworkArchitecture, PolicyNetwork, PolicyNetworkConfig};
pub use strategies::{
    EpsilonSchedule, HeuristicStrategy, HybridStrategy, LearnedStrategy, ReinforcementStrategy,
};
pub use strategy::{
    create_strategy, Experience, ModelSet, PendingDecision, Strategy, StrategyKind,
    StrategySettings,
};
pub use tier::{DifficultyTier, HeuristicWeights};
