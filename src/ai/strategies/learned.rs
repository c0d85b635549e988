use std::sync::Arc;

use rand::rngs::StdRng;
use rand::Rng;
use tracing::warn;

use crate::ai::features::extract_features;
use crate::ai::model::SharedModel;
use crate::ai::strategies::EpsilonSchedule;
use crate::ai::strategy::{Strategy, StrategyKind, StrategySettings};
use crate::ai::tier::DifficultyTier;
use crate::error::DecisionError;
use crate::game::{generate_legal_actions, Action, GameStateSnapshot};

/// Index of the highest score, first one on ties.
pub fn argmax(scores: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &s) in scores.iter().enumerate() {
        if best.is_none_or(|(_, b)| s > b) {
            best = Some((i, s));
        }
    }
    best.map(|(i, _)| i)
}

/// Epsilon-greedy pick over legal actions using one forward pass.
///
/// Slot `i` of the network output stands for the `i`-th legal action.
/// Returns the chosen action and its slot.
pub(crate) fn epsilon_greedy(
    model: &SharedModel,
    kind: StrategyKind,
    state: &GameStateSnapshot,
    settings: &StrategySettings,
    epsilon: f32,
    rng: &mut StdRng,
) -> Result<(Action, usize), DecisionError> {
    let features = extract_features(state, settings.dims)?;
    let snapshot = model
        .snapshot()
        .ok_or_else(|| DecisionError::ModelUnavailable(kind.name().to_string()))?;

    let mut legal = generate_legal_actions(state);
    legal.truncate(settings.action_slots);
    if legal.is_empty() {
        return Err(DecisionError::NoCandidates);
    }

    if rng.random_range(0.0..1.0) < epsilon {
        let slot = rng.random_range(0..legal.len());
        return Ok((legal.swap_remove(slot), slot));
    }

    let scores = snapshot.score(&features)?;
    let best = argmax(&scores).ok_or(DecisionError::NoCandidates)?;
    let slot = if best < legal.len() {
        best
    } else {
        warn!(
            agent = state.agent_id(),
            slot = best,
            legal = legal.len(),
            "Best slot is not currently legal, choosing at random"
        );
        rng.random_range(0..legal.len())
    };
    Ok((legal.swap_remove(slot), slot))
}

/// Feed-forward scorer. Exploration defaults to a fixed, tier-dependent
/// rate; the scheduler may hand it a decaying schedule instead.
pub struct LearnedStrategy {
    tier: DifficultyTier,
    model: Arc<SharedModel>,
    schedule: EpsilonSchedule,
    settings: StrategySettings,
}

impl LearnedStrategy {
    pub fn new(tier: DifficultyTier, model: Arc<SharedModel>, settings: StrategySettings) -> Self {
        LearnedStrategy {
            tier,
            model,
            schedule: EpsilonSchedule::fixed(tier.learned_epsilon()),
            settings,
        }
    }

    pub fn with_epsilon(mut self, epsilon: f32) -> Self {
        self.schedule = EpsilonSchedule::fixed(epsilon);
        self
    }

    pub fn model(&self) -> &Arc<SharedModel> {
        &self.model
    }
}

impl Strategy for LearnedStrategy {
    fn decide(
        &mut self,
        state: &GameStateSnapshot,
        rng: &mut StdRng,
    ) -> Result<Action, DecisionError> {
        let (action, _) = epsilon_greedy(
            &self.model,
            StrategyKind::Learned,
            state,
            &self.settings,
            self.schedule.epsilon,
            rng,
        )?;
        self.schedule.step();
        Ok(action)
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::Learned
    }

    fn tier(&self) -> DifficultyTier {
        self.tier
    }

    fn name(&self) -> &str {
        "Learned"
    }

    fn exploration(&self) -> Option<EpsilonSchedule> {
        Some(self.schedule)
    }

    fn set_exploration(&mut self, schedule: EpsilonSchedule) -> bool {
        self.schedule = schedule;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{BoardDims, Shape, SpecialAction, TargetScope};
    use rand::SeedableRng;

    fn small_settings() -> StrategySettings {
        StrategySettings::new(BoardDims::new(6, 8), 2)
    }

    fn loaded_model(settings: &StrategySettings) -> Arc<SharedModel> {
        Arc::new(SharedModel::initialized(
            settings.architecture([16, 16, 8], 0.0),
        ))
    }

    #[test]
    fn test_argmax_first_on_ties() {
        assert_eq!(argmax(&[1.0, 3.0, 3.0, -1.0]), Some(1));
        assert_eq!(argmax(&[]), None);
    }

    #[test]
    fn test_model_unavailable_without_weights() {
        let settings = small_settings();
        let mut strategy = LearnedStrategy::new(
            DifficultyTier::Hard,
            Arc::new(SharedModel::empty()),
            settings,
        );
        let snap = GameStateSnapshot::new(settings.dims, "bot", Shape::T);
        let mut rng = StdRng::seed_from_u64(0);
        let err = strategy.decide(&snap, &mut rng).unwrap_err();
        assert!(matches!(err, DecisionError::ModelUnavailable(_)));
    }

    #[test]
    fn test_invalid_snapshot_checked_before_model() {
        let settings = small_settings();
        let mut strategy = LearnedStrategy::new(
            DifficultyTier::Hard,
            Arc::new(SharedModel::empty()),
            settings,
        );
        let snap = GameStateSnapshot::new(BoardDims::STANDARD, "bot", Shape::T);
        let mut rng = StdRng::seed_from_u64(0);
        let err = strategy.decide(&snap, &mut rng).unwrap_err();
        assert!(matches!(err, DecisionError::InvalidSnapshot(_)));
    }

    #[test]
    fn test_greedy_choice_is_deterministic_and_legal() {
        let settings = small_settings();
        let model = loaded_model(&settings);
        let mut strategy =
            LearnedStrategy::new(DifficultyTier::Expert, model, settings).with_epsilon(0.0);
        let snap = GameStateSnapshot::new(settings.dims, "bot", Shape::L);
        let legal = generate_legal_actions(&snap);

        let mut rng_a = StdRng::seed_from_u64(1);
        let mut rng_b = StdRng::seed_from_u64(2);
        let a = strategy.decide(&snap, &mut rng_a).unwrap();
        let b = strategy.decide(&snap, &mut rng_b).unwrap();
        assert!(legal.contains(&a));
        // Six legal actions but eight slots: only an out-of-range argmax uses the rng.
        let scores = strategy
            .model()
            .snapshot()
            .unwrap()
            .score(&extract_features(&snap, settings.dims).unwrap())
            .unwrap();
        if argmax(&scores).unwrap() < legal.len() {
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_full_exploration_stays_legal() {
        let settings = small_settings();
        let mut strategy =
            LearnedStrategy::new(DifficultyTier::Easy, loaded_model(&settings), settings)
                .with_epsilon(1.0);
        let mut snap = GameStateSnapshot::new(settings.dims, "bot", Shape::S);
        snap.agent_stats.resource = 100.0;
        snap.available_actions_catalog.push(SpecialAction {
            id: "haste".into(),
            resource_cost: 10.0,
            target_scope: TargetScope::Caster,
            duration: 3.0,
        });
        let legal = generate_legal_actions(&snap);
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..50 {
            let action = strategy.decide(&snap, &mut rng).unwrap();
            assert!(legal.contains(&action));
        }
        assert_eq!(strategy.epsilon(), Some(1.0));
    }

    #[test]
    fn test_tier_sets_epsilon() {
        let settings = small_settings();
        let strategy = LearnedStrategy::new(
            DifficultyTier::Medium,
            Arc::new(SharedModel::empty()),
            settings,
        );
        assert_eq!(strategy.epsilon(), Some(DifficultyTier::Medium.learned_epsilon()));
    }

    #[test]
    fn test_decaying_schedule_steps_per_decision() {
        let settings = small_settings();
        let mut strategy =
            LearnedStrategy::new(DifficultyTier::Easy, loaded_model(&settings), settings);
        assert!(strategy.set_exploration(EpsilonSchedule::new(0.8, 0.5, 0.1)));
        let snap = GameStateSnapshot::new(settings.dims, "bot", Shape::O);
        let mut rng = StdRng::seed_from_u64(8);
        strategy.decide(&snap, &mut rng).unwrap();
        assert_eq!(strategy.epsilon(), Some(0.4));
        for _ in 0..10 {
            strategy.decide(&snap, &mut rng).unwrap();
        }
        assert_eq!(strategy.epsilon(), Some(0.1));
    }
}
