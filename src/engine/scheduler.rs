use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::ai::{DifficultyTier, EpsilonSchedule, StrategyKind};

/// Monotonic time source for rate limiting.
pub trait Clock: Send + Sync {
    /// Time elapsed since an arbitrary fixed origin.
    fn now(&self) -> Duration;
}

/// Wall-clock time measured from construction.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        SystemClock {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Clock advanced by hand; clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    micros: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.micros
            .fetch_add(by.as_micros() as u64, Ordering::SeqCst);
    }

    pub fn set(&self, to: Duration) {
        self.micros.store(to.as_micros() as u64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_micros(self.micros.load(Ordering::SeqCst))
    }
}

/// Exploration parameters handed to new agents.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExplorationPolicy {
    pub epsilon_start: f32,
    pub epsilon_floor: f32,
    /// Decay per decision; `None` uses the tier's rate.
    pub decay: Option<f32>,
}

impl Default for ExplorationPolicy {
    fn default() -> Self {
        ExplorationPolicy {
            epsilon_start: 1.0,
            epsilon_floor: 0.1,
            decay: None,
        }
    }
}

impl ExplorationPolicy {
    /// Initial schedule for an agent. Learned and hybrid agents explore at
    /// their tier's fixed rate; reinforcement agents decay from the start
    /// value to the floor.
    pub fn schedule_for(&self, kind: StrategyKind, tier: DifficultyTier) -> Option<EpsilonSchedule> {
        match kind {
            StrategyKind::Heuristic => None,
            StrategyKind::Learned | StrategyKind::Hybrid => {
                Some(EpsilonSchedule::fixed(tier.learned_epsilon()))
            }
            StrategyKind::Reinforcement => Some(EpsilonSchedule::new(
                self.epsilon_start,
                self.decay.unwrap_or_else(|| tier.epsilon_decay()),
                self.epsilon_floor,
            )),
        }
    }
}

/// Enforces the minimum interval between two decisions of the same agent
/// and assigns exploration schedules to new agents.
/// Each agent keeps its own last-decision timestamp; the scheduler only
/// compares it against the clock.
#[derive(Clone)]
pub struct DecisionScheduler {
    interval: Duration,
    clock: Arc<dyn Clock>,
    exploration: ExplorationPolicy,
}

impl DecisionScheduler {
    pub fn new(interval: Duration, clock: Arc<dyn Clock>) -> Self {
        DecisionScheduler {
            interval,
            clock,
            exploration: ExplorationPolicy::default(),
        }
    }

    pub fn with_exploration(mut self, exploration: ExplorationPolicy) -> Self {
        self.exploration = exploration;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn exploration(&self) -> ExplorationPolicy {
        self.exploration
    }

    pub fn exploration_for(
        &self,
        kind: StrategyKind,
        tier: DifficultyTier,
    ) -> Option<EpsilonSchedule> {
        self.exploration.schedule_for(kind, tier)
    }

    /// Admit a decision if the interval has passed since `last`, recording
    /// the new decision time. Rejected calls leave `last` untouched.
    pub fn admit(&self, last: &mut Option<Duration>) -> bool {
        let now = self.clock.now();
        match *last {
            Some(prev) if now.saturating_sub(prev) < self.interval => false,
            _ => {
                *last = Some(now);
                true
            }
        }
    }

    /// Time left before the next decision would be admitted.
    pub fn remaining(&self, last: Option<Duration>) -> Duration {
        last.map_or(Duration::ZERO, |prev| {
            self.interval
                .saturating_sub(self.clock.now().saturating_sub(prev))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scheduler(ms: u64) -> (DecisionScheduler, ManualClock) {
        let clock = ManualClock::new();
        let scheduler = DecisionScheduler::new(Duration::from_millis(ms), Arc::new(clock.clone()));
        (scheduler, clock)
    }

    #[test]
    fn test_first_decision_is_admitted() {
        let (scheduler, _) = scheduler(100);
        let mut last = None;
        assert!(scheduler.admit(&mut last));
        assert_eq!(last, Some(Duration::ZERO));
    }

    #[test]
    fn test_calls_within_interval_are_rejected() {
        let (scheduler, clock) = scheduler(100);
        let mut last = None;
        assert!(scheduler.admit(&mut last));

        clock.advance(Duration::from_millis(99));
        assert!(!scheduler.admit(&mut last));
        assert_eq!(scheduler.remaining(last), Duration::from_millis(1));

        clock.advance(Duration::from_millis(1));
        assert!(scheduler.admit(&mut last));
        assert_eq!(last, Some(Duration::from_millis(100)));
    }

    #[test]
    fn test_zero_interval_never_limits() {
        let (scheduler, _) = scheduler(0);
        let mut last = None;
        for _ in 0..5 {
            assert!(scheduler.admit(&mut last));
        }
    }

    #[test]
    fn test_exploration_depends_on_kind() {
        let (scheduler, _) = scheduler(100);
        let scheduler = scheduler.with_exploration(ExplorationPolicy {
            epsilon_start: 0.8,
            epsilon_floor: 0.05,
            decay: Some(0.9),
        });
        assert_eq!(
            scheduler.exploration_for(StrategyKind::Heuristic, DifficultyTier::Easy),
            None
        );
        let learned = scheduler
            .exploration_for(StrategyKind::Learned, DifficultyTier::Hard)
            .unwrap();
        assert_eq!(learned.epsilon, DifficultyTier::Hard.learned_epsilon());
        assert_eq!(learned.decay, 1.0);

        let rl = scheduler
            .exploration_for(StrategyKind::Reinforcement, DifficultyTier::Hard)
            .unwrap();
        assert_eq!(rl, EpsilonSchedule::new(0.8, 0.9, 0.05));
    }

    #[test]
    fn test_exploration_falls_back_to_tier_decay() {
        let (scheduler, _) = scheduler(100);
        let rl = scheduler
            .exploration_for(StrategyKind::Reinforcement, DifficultyTier::Easy)
            .unwrap();
        assert_eq!(rl.decay, DifficultyTier::Easy.epsilon_decay());
        assert_eq!(rl.epsilon, 1.0);
        assert_eq!(rl.floor, 0.1);
    }

    #[test]
    fn test_system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
