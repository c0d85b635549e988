use rand::rngs::StdRng;
use rand::Rng;
use tracing::{debug, warn};

use crate::ai::features::board_metrics;
use crate::ai::strategy::{Strategy, StrategyKind, StrategySettings};
use crate::ai::tier::{DifficultyTier, HeuristicWeights};
use crate::error::{DecisionError, SimulationError};
use crate::game::{
    generate_legal_actions, settle, simulate_detailed, Action, Board, GameStateSnapshot,
    TargetScope,
};

/// Stack height (fraction of the board) at which self-targeted casts pay off.
pub const DEFENSIVE_CAST_THRESHOLD: f32 = 0.6;
/// Headroom (fraction of the board) required before attacking the opponent.
pub const OFFENSIVE_CAST_THRESHOLD: f32 = 0.7;

/// Rule-based strategy scoring every legal action by the board it leads to.
pub struct HeuristicStrategy {
    tier: DifficultyTier,
    weights: HeuristicWeights,
    jitter: f32,
    settings: StrategySettings,
}

impl HeuristicStrategy {
    pub fn new(tier: DifficultyTier, settings: StrategySettings) -> Self {
        let jitter = if settings.jitter {
            tier.jitter_amplitude()
        } else {
            0.0
        };
        HeuristicStrategy {
            tier,
            weights: tier.heuristic_weights(),
            jitter,
            settings,
        }
    }

    pub fn with_weights(mut self, weights: HeuristicWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn weights(&self) -> &HeuristicWeights {
        &self.weights
    }

    pub fn jitter_amplitude(&self) -> f32 {
        self.jitter
    }

    /// Noise-free score of the position `action` leads to.
    ///
    /// Movement that does not lock the piece is judged by where the piece
    /// would land if dropped from its new pose.
    pub fn evaluate(
        &self,
        state: &GameStateSnapshot,
        action: &Action,
    ) -> Result<f32, SimulationError> {
        let (board, lines) = Self::landing(state, action)?;
        Ok(self.score_board(&board, lines) + self.cast_bonus(state, action))
    }

    /// Board after `action` once the piece comes to rest, with rows cleared.
    pub fn landing(
        state: &GameStateSnapshot,
        action: &Action,
    ) -> Result<(Board, u32), SimulationError> {
        let sim = simulate_detailed(state, action)?;
        if sim.locked {
            Ok((sim.state.board, sim.lines_cleared))
        } else {
            settle(&sim.state.board, &sim.state.active_piece)
        }
    }

    fn score_board(&self, board: &Board, lines: u32) -> f32 {
        let w = &self.weights;
        let m = board_metrics(board);
        -w.holes * m.holes as f32 - w.bumpiness * m.bumpiness as f32
            - w.height * m.max_height as f32
            + w.tower_stability * m.stability
            + w.lines_cleared * lines as f32
    }

    fn cast_bonus(&self, state: &GameStateSnapshot, action: &Action) -> f32 {
        let Action::Cast { action_id, .. } = action else {
            return 0.0;
        };
        let Some(special) = state.special_action(action_id) else {
            return 0.0;
        };
        let ratio = board_metrics(&state.board).max_height as f32 / state.board.height() as f32;
        let timely = match special.target_scope {
            TargetScope::Caster => ratio >= DEFENSIVE_CAST_THRESHOLD,
            TargetScope::Opponent => 1.0 - ratio >= OFFENSIVE_CAST_THRESHOLD,
        };
        if timely {
            self.weights.risk_taking
        } else {
            0.0
        }
    }
}

impl Strategy for HeuristicStrategy {
    fn decide(
        &mut self,
        state: &GameStateSnapshot,
        rng: &mut StdRng,
    ) -> Result<Action, DecisionError> {
        state.validate(Some(self.settings.dims))?;

        let mut best: Option<(f32, Action)> = None;
        for action in generate_legal_actions(state) {
            let score = match self.evaluate(state, &action) {
                Ok(score) => score,
                Err(e) => {
                    warn!(agent = state.agent_id(), ?action, error = %e, "Excluding candidate");
                    continue;
                }
            };
            let noise = if self.jitter > 0.0 {
                rng.random_range(-self.jitter..=self.jitter)
            } else {
                0.0
            };
            let jittered = score + noise;
            // Strict comparison keeps the first candidate on ties.
            if best.as_ref().is_none_or(|(s, _)| jittered > *s) {
                best = Some((jittered, action));
            }
        }

        let (score, action) = best.ok_or(DecisionError::NoCandidates)?;
        debug!(agent = state.agent_id(), ?action, score, "Heuristic decision");
        Ok(action)
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::Heuristic
    }

    fn tier(&self) -> DifficultyTier {
        self.tier
    }

    fn name(&self) -> &str {
        "Heuristic"
    }
}
