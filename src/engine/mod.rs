//! Agent-facing facade: per-agent sessions, decision rate limiting, training
//! jobs and model hot-swap.

mod facade;
mod registry;
mod scheduler;

pub use facade::{Engine, ModelSlot, TrainingSource, FALLBACK_ACTION};
pub use registry::{agent_seed, AgentHandle, AgentRegistry, AgentSession, SharedSession};
pub use scheduler::{Clock, DecisionScheduler, ExplorationPolicy, ManualClock, SystemClock};
