use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::ai::features::feature_len;
use crate::ai::model::SharedModel;
use crate::ai::networks::NetworkArchitecture;
use crate::ai::strategies::{
    EpsilonSchedule, HeuristicStrategy, HybridStrategy, LearnedStrategy, ReinforcementStrategy,
};
use crate::ai::tier::DifficultyTier;
use crate::error::DecisionError;
use crate::game::{Action, BoardDims, GameStateSnapshot};

/// One decide-apply-observe cycle, as stored in the replay buffer.
#[derive(Debug, Clone)]
pub struct Experience {
    pub state: GameStateSnapshot,
    pub action: Action,
    /// Index of `action` in the legal list of `state`; also its network output slot.
    pub action_slot: usize,
    pub reward: f32,
    pub next_state: GameStateSnapshot,
    pub done: bool,
}

/// A reinforcement decision still waiting for its outcome.
#[derive(Debug, Clone)]
pub struct PendingDecision {
    pub state: GameStateSnapshot,
    pub action: Action,
    pub slot: usize,
}

impl PendingDecision {
    pub fn complete(self, next_state: GameStateSnapshot, reward: f32, done: bool) -> Experience {
        Experience {
            state: self.state,
            action: self.action,
            action_slot: self.slot,
            reward,
            next_state,
            done,
        }
    }
}

/// Strategy family selected when an agent is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Heuristic,
    Learned,
    Reinforcement,
    Hybrid,
}

impl StrategyKind {
    pub fn name(self) -> &'static str {
        match self {
            StrategyKind::Heuristic => "heuristic",
            StrategyKind::Learned => "learned",
            StrategyKind::Reinforcement => "reinforcement",
            StrategyKind::Hybrid => "hybrid",
        }
    }

    /// Whether agents of this kind read network weights.
    pub fn needs_model(self) -> bool {
        !matches!(self, StrategyKind::Heuristic)
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "heuristic" => Ok(StrategyKind::Heuristic),
            "learned" => Ok(StrategyKind::Learned),
            "reinforcement" | "rl" | "dqn" => Ok(StrategyKind::Reinforcement),
            "hybrid" => Ok(StrategyKind::Hybrid),
            other => Err(format!("unknown strategy type '{}'", other)),
        }
    }
}

/// Universal interface for every decision strategy.
///
/// Randomness is injected per call so tests and replays can fix it.
/// Strategies live behind per-agent mutexes shared across threads, hence
/// the `Send` bound.
pub trait Strategy: Send {
    /// Choose one action for the snapshot.
    fn decide(
        &mut self,
        state: &GameStateSnapshot,
        rng: &mut StdRng,
    ) -> Result<Action, DecisionError>;

    fn kind(&self) -> StrategyKind;

    fn tier(&self) -> DifficultyTier;

    /// Display name for logs.
    fn name(&self) -> &str;

    /// Exploration schedule, for strategies that explore.
    fn exploration(&self) -> Option<EpsilonSchedule> {
        None
    }

    /// Replace the exploration schedule. Returns false when the strategy
    /// does not explore.
    fn set_exploration(&mut self, _schedule: EpsilonSchedule) -> bool {
        false
    }

    /// Current exploration rate.
    fn epsilon(&self) -> Option<f32> {
        self.exploration().map(|s| s.epsilon)
    }

    /// Hand over the last decision that still awaits an outcome.
    fn take_pending(&mut self) -> Option<PendingDecision> {
        None
    }
}

/// Settings shared by all strategies of one engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrategySettings {
    pub dims: BoardDims,
    /// Network output width: six movement slots plus the cast slots.
    pub action_slots: usize,
    pub epsilon_start: f32,
    pub epsilon_floor: f32,
    /// Zero heuristic jitter when false.
    pub jitter: bool,
}

impl StrategySettings {
    pub fn new(dims: BoardDims, max_cast_slots: usize) -> Self {
        StrategySettings {
            dims,
            action_slots: Action::MOVEMENT.len() + max_cast_slots,
            epsilon_start: 1.0,
            epsilon_floor: 0.1,
            jitter: true,
        }
    }

    pub fn feature_len(&self) -> usize {
        feature_len(self.dims)
    }

    /// Architecture matching this board and slot count.
    pub fn architecture(&self, hidden: [usize; 3], dropout: f64) -> NetworkArchitecture {
        NetworkArchitecture::new(self.feature_len(), self.action_slots)
            .with_hidden(hidden)
            .with_dropout(dropout)
    }
}

impl Default for StrategySettings {
    fn default() -> Self {
        StrategySettings::new(BoardDims::STANDARD, 4)
    }
}

/// Model slots strategies read from. Cloning shares the slots.
#[derive(Debug, Clone, Default)]
pub struct ModelSet {
    /// Weights for learned and hybrid agents.
    pub learned: Arc<SharedModel>,
    /// Online network of reinforcement agents.
    pub online: Arc<SharedModel>,
    /// Target network of reinforcement agents.
    pub target: Arc<SharedModel>,
}

/// Build the strategy named by `kind`.
pub fn create_strategy(
    kind: StrategyKind,
    tier: DifficultyTier,
    models: &ModelSet,
    settings: StrategySettings,
) -> Box<dyn Strategy> {
    match kind {
        StrategyKind::Heuristic => Box::new(HeuristicStrategy::new(tier, settings)),
        StrategyKind::Learned => Box::new(LearnedStrategy::new(
            tier,
            Arc::clone(&models.learned),
            settings,
        )),
        StrategyKind::Reinforcement => Box::new(ReinforcementStrategy::new(
            tier,
            Arc::clone(&models.online),
            Arc::clone(&models.target),
            settings,
        )),
        StrategyKind::Hybrid => Box::new(HybridStrategy::new(
            tier,
            Box::new(LearnedStrategy::new(
                tier,
                Arc::clone(&models.learned),
                settings,
            )),
            settings,
        )),
    }
}
