use std::sync::Arc;

use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ai::model::SharedModel;
use crate::ai::strategies::learned::epsilon_greedy;
use crate::ai::strategy::{Experience, PendingDecision, Strategy, StrategyKind, StrategySettings};
use crate::ai::tier::DifficultyTier;
use crate::error::DecisionError;
use crate::game::{Action, GameStateSnapshot};

/// Geometric exploration decay clamped at a floor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpsilonSchedule {
    pub epsilon: f32,
    pub decay: f32,
    pub floor: f32,
}

impl EpsilonSchedule {
    pub fn new(start: f32, decay: f32, floor: f32) -> Self {
        let floor = floor.clamp(0.0, 1.0);
        EpsilonSchedule {
            epsilon: start.clamp(floor, 1.0),
            decay: decay.clamp(0.0, 1.0),
            floor,
        }
    }

    /// A rate that never changes.
    pub fn fixed(epsilon: f32) -> Self {
        let epsilon = epsilon.clamp(0.0, 1.0);
        Self::new(epsilon, 1.0, epsilon)
    }

    pub fn for_tier(tier: DifficultyTier, start: f32, floor: f32) -> Self {
        Self::new(start, tier.epsilon_decay(), floor)
    }

    /// Apply one decay step and return the new value.
    pub fn step(&mut self) -> f32 {
        self.epsilon = (self.epsilon * self.decay).max(self.floor);
        self.epsilon
    }
}

/// DQN-style strategy: acts with the online network, keeps a target
/// network for the Bellman targets computed during training.
pub struct ReinforcementStrategy {
    tier: DifficultyTier,
    online: Arc<SharedModel>,
    target: Arc<SharedModel>,
    schedule: EpsilonSchedule,
    pending: Option<PendingDecision>,
    decisions: u64,
    settings: StrategySettings,
}

impl ReinforcementStrategy {
    pub fn new(
        tier: DifficultyTier,
        online: Arc<SharedModel>,
        target: Arc<SharedModel>,
        settings: StrategySettings,
    ) -> Self {
        ReinforcementStrategy {
            tier,
            online,
            target,
            schedule: EpsilonSchedule::for_tier(
                tier,
                settings.epsilon_start,
                settings.epsilon_floor,
            ),
            pending: None,
            decisions: 0,
            settings,
        }
    }

    pub fn with_schedule(mut self, schedule: EpsilonSchedule) -> Self {
        self.schedule = schedule;
        self
    }

    pub fn schedule(&self) -> EpsilonSchedule {
        self.schedule
    }

    pub fn online(&self) -> &Arc<SharedModel> {
        &self.online
    }

    pub fn target(&self) -> &Arc<SharedModel> {
        &self.target
    }

    pub fn decisions(&self) -> u64 {
        self.decisions
    }

    /// Hard-copy the online weights into the target slot.
    pub fn sync_target(&self) -> Result<(), DecisionError> {
        let current = self.online.snapshot().ok_or_else(|| {
            DecisionError::ModelUnavailable(StrategyKind::Reinforcement.name().to_string())
        })?;
        debug!(version = current.version(), "Syncing target network");
        self.target.publish_version(current);
        Ok(())
    }

    /// Pair the pending decision with its observed outcome.
    pub fn complete_transition(
        &mut self,
        next_state: GameStateSnapshot,
        reward: f32,
        done: bool,
    ) -> Option<Experience> {
        self.pending
            .take()
            .map(|pending| pending.complete(next_state, reward, done))
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }
}

impl Strategy for ReinforcementStrategy {
    fn decide(
        &mut self,
        state: &GameStateSnapshot,
        rng: &mut StdRng,
    ) -> Result<Action, DecisionError> {
        self.pending = None;
        let (action, slot) = epsilon_greedy(
            &self.online,
            StrategyKind::Reinforcement,
            state,
            &self.settings,
            self.schedule.epsilon,
            rng,
        )?;
        self.pending = Some(PendingDecision {
            state: state.clone(),
            action: action.clone(),
            slot,
        });
        self.decisions += 1;
        self.schedule.step();
        Ok(action)
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::Reinforcement
    }

    fn tier(&self) -> DifficultyTier {
        self.tier
    }

    fn name(&self) -> &str {
        "Reinforcement"
    }

    fn exploration(&self) -> Option<EpsilonSchedule> {
        Some(self.schedule)
    }

    fn set_exploration(&mut self, schedule: EpsilonSchedule) -> bool {
        self.schedule = schedule;
        true
    }

    fn take_pending(&mut self) -> Option<PendingDecision> {
        self.pending.take()
    }
}
