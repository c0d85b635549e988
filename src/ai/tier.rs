use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Difficulty tier governing heuristic weights, noise, exploration and blending.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum DifficultyTier {
    #[default]
    Easy,
    Medium,
    Hard,
    Expert,
}

/// Named heuristic weights. `holes`, `bumpiness` and `height` are penalties.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeuristicWeights {
    pub holes: f32,
    pub bumpiness: f32,
    pub height: f32,
    pub lines_cleared: f32,
    pub tower_stability: f32,
    /// Bonus applied to well-timed special actions.
    pub risk_taking: f32,
}

impl DifficultyTier {
    pub const ALL: [DifficultyTier; 4] = [
        DifficultyTier::Easy,
        DifficultyTier::Medium,
        DifficultyTier::Hard,
        DifficultyTier::Expert,
    ];

    /// 1-based level as used on the wire.
    pub fn level(self) -> u8 {
        match self {
            DifficultyTier::Easy => 1,
            DifficultyTier::Medium => 2,
            DifficultyTier::Hard => 3,
            DifficultyTier::Expert => 4,
        }
    }

    pub fn from_level(level: u8) -> Option<Self> {
        DifficultyTier::ALL.get(usize::from(level).checked_sub(1)?).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            DifficultyTier::Easy => "easy",
            DifficultyTier::Medium => "medium",
            DifficultyTier::Hard => "hard",
            DifficultyTier::Expert => "expert",
        }
    }

    pub fn heuristic_weights(self) -> HeuristicWeights {
        match self {
            DifficultyTier::Easy => HeuristicWeights {
                holes: 0.3,
                bumpiness: 0.2,
                height: 0.3,
                lines_cleared: 0.8,
                tower_stability: 0.4,
                risk_taking: 0.2,
            },
            DifficultyTier::Medium => HeuristicWeights {
                holes: 0.5,
                bumpiness: 0.4,
                height: 0.5,
                lines_cleared: 1.0,
                tower_stability: 0.6,
                risk_taking: 0.4,
            },
            DifficultyTier::Hard => HeuristicWeights {
                holes: 0.7,
                bumpiness: 0.6,
                height: 0.7,
                lines_cleared: 1.2,
                tower_stability: 0.8,
                risk_taking: 0.6,
            },
            DifficultyTier::Expert => HeuristicWeights {
                holes: 0.9,
                bumpiness: 0.8,
                height: 0.9,
                lines_cleared: 1.5,
                tower_stability: 1.0,
                risk_taking: 0.8,
            },
        }
    }

    /// Half-width of the uniform noise added to heuristic scores.
    pub fn jitter_amplitude(self) -> f32 {
        match self {
            DifficultyTier::Easy => 1.0,
            DifficultyTier::Medium => 0.6,
            DifficultyTier::Hard => 0.3,
            DifficultyTier::Expert => 0.1,
        }
    }

    /// Fixed exploration rate of the learned strategy.
    pub fn learned_epsilon(self) -> f32 {
        match self {
            DifficultyTier::Easy => 0.5,
            DifficultyTier::Medium => 0.3,
            DifficultyTier::Hard => 0.1,
            DifficultyTier::Expert => 0.05,
        }
    }

    /// Per-decision geometric epsilon decay of the reinforcement strategy.
    pub fn epsilon_decay(self) -> f32 {
        match self {
            DifficultyTier::Easy => 0.999,
            DifficultyTier::Medium => 0.998,
            DifficultyTier::Hard => 0.995,
            DifficultyTier::Expert => 0.99,
        }
    }

    /// Probability that a hybrid agent defers to its learned half.
    pub fn blend_factor(self) -> f32 {
        match self {
            DifficultyTier::Easy => 0.2,
            DifficultyTier::Medium => 0.4,
            DifficultyTier::Hard => 0.6,
            DifficultyTier::Expert => 0.8,
        }
    }
}

impl fmt::Display for DifficultyTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DifficultyTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" | "1" => Ok(DifficultyTier::Easy),
            "medium" | "2" => Ok(DifficultyTier::Medium),
            "hard" | "3" => Ok(DifficultyTier::Hard),
            "expert" | "4" => Ok(DifficultyTier::Expert),
            other => Err(format!(
                "unknown difficulty tier '{}' (expected easy, medium, hard or expert)",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weights_grow_with_tier() {
        for pair in DifficultyTier::ALL.windows(2) {
            let (lo, hi) = (pair[0].heuristic_weights(), pair[1].heuristic_weights());
            assert!(hi.holes > lo.holes);
            assert!(hi.bumpiness > lo.bumpiness);
            assert!(hi.height > lo.height);
            assert!(hi.lines_cleared > lo.lines_cleared);
            assert!(hi.tower_stability > lo.tower_stability);
        }
    }

    #[test]
    fn test_noise_and_exploration_shrink_with_tier() {
        for pair in DifficultyTier::ALL.windows(2) {
            assert!(pair[1].jitter_amplitude() < pair[0].jitter_amplitude());
            assert!(pair[1].learned_epsilon() < pair[0].learned_epsilon());
            assert!(pair[1].epsilon_decay() < pair[0].epsilon_decay());
            assert!(pair[1].blend_factor() > pair[0].blend_factor());
        }
    }

    #[test]
    fn test_level_roundtrip() {
        for tier in DifficultyTier::ALL {
            assert_eq!(DifficultyTier::from_level(tier.level()), Some(tier));
        }
        assert_eq!(DifficultyTier::from_level(0), None);
        assert_eq!(DifficultyTier::from_level(5), None);
    }

    #[test]
    fn test_parse() {
        assert_eq!("Hard".parse::<DifficultyTier>(), Ok(DifficultyTier::Hard));
        assert_eq!("4".parse::<DifficultyTier>(), Ok(DifficultyTier::Expert));
        assert!("impossible".parse::<DifficultyTier>().is_err());
    }
}
