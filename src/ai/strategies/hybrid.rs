use rand::rngs::StdRng;
use rand::Rng;
use tracing::trace;

use crate::ai::strategies::{EpsilonSchedule, HeuristicStrategy};
use crate::ai::strategy::{PendingDecision, Strategy, StrategyKind, StrategySettings};
use crate::ai::tier::DifficultyTier;
use crate::error::DecisionError;
use crate::game::{Action, GameStateSnapshot};

/// Per-decision coin flip between a heuristic and a learned sub-strategy.
pub struct HybridStrategy {
    tier: DifficultyTier,
    heuristic: HeuristicStrategy,
    learned: Box<dyn Strategy>,
    blend: f32,
}

impl HybridStrategy {
    pub fn new(
        tier: DifficultyTier,
        learned: Box<dyn Strategy>,
        settings: StrategySettings,
    ) -> Self {
        HybridStrategy {
            tier,
            heuristic: HeuristicStrategy::new(tier, settings),
            learned,
            blend: tier.blend_factor(),
        }
    }

    /// 0 always defers to the heuristic, 1 always to the learned half.
    pub fn with_blend(mut self, blend: f32) -> Self {
        self.blend = blend.clamp(0.0, 1.0);
        self
    }

    pub fn blend(&self) -> f32 {
        self.blend
    }
}

impl Strategy for HybridStrategy {
    fn decide(
        &mut self,
        state: &GameStateSnapshot,
        rng: &mut StdRng,
    ) -> Result<Action, DecisionError> {
        let draw: f32 = rng.random_range(0.0..1.0);
        if draw < self.blend {
            trace!(agent = state.agent_id(), draw, "Hybrid delegating to learned");
            self.learned.decide(state, rng)
        } else {
            trace!(agent = state.agent_id(), draw, "Hybrid delegating to heuristic");
            self.heuristic.decide(state, rng)
        }
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::Hybrid
    }

    fn tier(&self) -> DifficultyTier {
        self.tier
    }

    fn name(&self) -> &str {
        "Hybrid"
    }

    fn exploration(&self) -> Option<EpsilonSchedule> {
        self.learned.exploration()
    }

    fn set_exploration(&mut self, schedule: EpsilonSchedule) -> bool {
        self.learned.set_exploration(schedule)
    }

    fn take_pending(&mut self) -> Option<PendingDecision> {
        self.learned.take_pending()
    }
}
