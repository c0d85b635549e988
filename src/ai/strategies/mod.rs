mod heuristic;
mod hybrid;
mod learned;
mod reinforcement;

pub use heuristic::{HeuristicStrategy, DEFENSIVE_CAST_THRESHOLD, OFFENSIVE_CAST_THRESHOLD};
pub use hybrid::HybridStrategy;
pub use learned::{argmax, LearnedStrategy};
pub use reinforcement::{EpsilonSchedule, ReinforcementStrategy};
