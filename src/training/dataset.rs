use std::fs;
use std::path::Path;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::ai::features::extract_features;
use crate::ai::{Strategy, StrategySettings};
use crate::error::TrainingError;
use crate::game::{generate_legal_actions, Action, GameStateSnapshot};

/// One supervised example: a feature vector and a target distribution over
/// action slots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledExample {
    pub features: Vec<f32>,
    pub target: Vec<f32>,
}

/// Collection of labelled examples for a fixed input/output width.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledDataset {
    pub feature_len: usize,
    pub action_slots: usize,
    pub examples: Vec<LabeledExample>,
}

impl LabeledDataset {
    pub fn new(feature_len: usize, action_slots: usize) -> Self {
        LabeledDataset {
            feature_len,
            action_slots,
            examples: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    /// Append an example after checking its shape.
    pub fn push(&mut self, example: LabeledExample) -> Result<(), TrainingError> {
        self.check(self.examples.len(), &example)?;
        self.examples.push(example);
        Ok(())
    }

    pub fn validate(&self) -> Result<(), TrainingError> {
        self.examples
            .iter()
            .enumerate()
            .try_for_each(|(i, e)| self.check(i, e))
    }

    fn check(&self, index: usize, example: &LabeledExample) -> Result<(), TrainingError> {
        let malformed = |reason: String| TrainingError::MalformedExample { index, reason };
        if example.features.len() != self.feature_len {
            return Err(malformed(format!(
                "expected {} features, got {}",
                self.feature_len,
                example.features.len()
            )));
        }
        if example.target.len() != self.action_slots {
            return Err(malformed(format!(
                "expected {} target slots, got {}",
                self.action_slots,
                example.target.len()
            )));
        }
        if example
            .features
            .iter()
            .chain(example.target.iter())
            .any(|v| !v.is_finite())
        {
            return Err(malformed("contains a non-finite value".to_string()));
        }
        if example.target.iter().any(|&v| v < 0.0) {
            return Err(malformed("target has a negative entry".to_string()));
        }
        if example.target.iter().sum::<f32>() <= 0.0 {
            return Err(malformed("target distribution sums to zero".to_string()));
        }
        Ok(())
    }

    /// Load and validate a dataset from JSON.
    pub fn load(path: &Path) -> Result<Self, TrainingError> {
        let content = fs::read_to_string(path).map_err(|e| TrainingError::DatasetRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let dataset: LabeledDataset =
            serde_json::from_str(&content).map_err(|e| TrainingError::DatasetParse {
                path: path.to_path_buf(),
                source: e,
            })?;
        dataset.validate()?;
        Ok(dataset)
    }

    pub fn save(&self, path: &Path) -> Result<(), TrainingError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Shuffle and split into (train, validation). The validation share is
    /// rounded to the nearest whole example.
    pub fn split(&self, validation_ratio: f32, rng: &mut StdRng) -> (Self, Self) {
        let mut indices: Vec<usize> = (0..self.len()).collect();
        indices.shuffle(rng);
        let n_val = ((self.len() as f32) * validation_ratio.clamp(0.0, 1.0)).round() as usize;
        let (val_idx, train_idx) = indices.split_at(n_val.min(self.len()));
        let pick = |idx: &[usize]| LabeledDataset {
            feature_len: self.feature_len,
            action_slots: self.action_slots,
            examples: idx.iter().map(|&i| self.examples[i].clone()).collect(),
        };
        (pick(train_idx), pick(val_idx))
    }

    /// Label snapshots with the slot a demonstrator strategy picks.
    ///
    /// Snapshots the demonstrator cannot decide, or whose choice falls outside
    /// the slot range, are skipped with a warning.
    pub fn from_demonstrations(
        states: &[GameStateSnapshot],
        demonstrator: &mut dyn Strategy,
        settings: &StrategySettings,
        rng: &mut StdRng,
    ) -> Result<Self, TrainingError> {
        let mut dataset = LabeledDataset::new(settings.feature_len(), settings.action_slots);
        for (i, state) in states.iter().enumerate() {
            let features = match extract_features(state, settings.dims) {
                Ok(f) => f,
                Err(e) => {
                    warn!(index = i, error = %e, "Skipping demonstration");
                    continue;
                }
            };
            let action = match demonstrator.decide(state, rng) {
                Ok(a) => a,
                Err(e) if e.is_recoverable() => {
                    warn!(index = i, error = %e, "Skipping demonstration");
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            let Some(slot) = generate_legal_actions(state)
                .iter()
                .position(|a| *a == action)
                .filter(|&s| s < settings.action_slots)
            else {
                warn!(index = i, ?action, "Demonstrated action has no slot");
                continue;
            };
            let mut target = vec![0.0; settings.action_slots];
            target[slot] = 1.0;
            dataset.push(LabeledExample { features, target })?;
        }
        Ok(dataset)
    }
}

/// Fraction of labelled snapshots where `strategy` picks the labelled action.
/// Recoverable decision failures count as misses.
pub fn evaluate_accuracy(
    strategy: &mut dyn Strategy,
    labeled: &[(GameStateSnapshot, Action)],
    rng: &mut StdRng,
) -> Result<f32, TrainingError> {
    if labeled.is_empty() {
        return Err(TrainingError::InsufficientTrainingData {
            needed: 1,
            available: 0,
        });
    }
    let mut hits = 0usize;
    for (state, expected) in labeled {
        match strategy.decide(state, rng) {
            Ok(action) if action == *expected => hits += 1,
            Ok(_) => {}
            Err(e) if e.is_recoverable() => {
                warn!(agent = state.agent_id(), error = %e, "Counting failed decision as a miss");
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(hits as f32 / labeled.len() as f32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{DifficultyTier, HeuristicStrategy};
    use crate::game::{BoardDims, Shape};
    use rand::SeedableRng;
    use tempfile::TempDir;

    fn example(fill: f32, slot: usize) -> LabeledExample {
        let mut target = vec![0.0; 3];
        target[slot] = 1.0;
        LabeledExample {
            features: vec![fill; 4],
            target,
        }
    }

    fn dataset(n: usize) -> LabeledDataset {
        let mut d = LabeledDataset::new(4, 3);
        for i in 0..n {
            d.push(example(i as f32, i % 3)).unwrap();
        }
        d
    }

    #[test]
    fn test_push_rejects_wrong_shape() {
        let mut d = LabeledDataset::new(4, 3);
        let err = d
            .push(LabeledExample {
                features: vec![0.0; 5],
                target: vec![1.0, 0.0, 0.0],
            })
            .unwrap_err();
        assert!(matches!(err, TrainingError::MalformedExample { index: 0, .. }));

        let err = d
            .push(LabeledExample {
                features: vec![0.0; 4],
                target: vec![0.0; 3],
            })
            .unwrap_err();
        assert!(err.to_string().contains("sums to zero"));
        assert!(d.is_empty());
    }

    #[test]
    fn test_split_partitions_all_examples() {
        let d = dataset(10);
        let mut rng = StdRng::seed_from_u64(3);
        let (train, val) = d.split(0.2, &mut rng);
        assert_eq!(train.len(), 8);
        assert_eq!(val.len(), 2);
        let mut all: Vec<i32> = train
            .examples
            .iter()
            .chain(val.examples.iter())
            .map(|e| e.features[0] as i32)
            .collect();
        all.sort_unstable();
        assert_eq!(all, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data/demo.json");
        let d = dataset(4);
        d.save(&path).unwrap();
        let loaded = LabeledDataset::load(&path).unwrap();
        assert_eq!(loaded, d);
    }

    #[test]
    fn test_load_rejects_malformed_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(
            &path,
            r#"{"feature_len":2,"action_slots":2,"examples":[{"features":[1.0],"target":[1.0,0.0]}]}"#,
        )
        .unwrap();
        assert!(matches!(
            LabeledDataset::load(&path),
            Err(TrainingError::MalformedExample { index: 0, .. })
        ));
        assert!(matches!(
            LabeledDataset::load(&dir.path().join("missing.json")),
            Err(TrainingError::DatasetRead { .. })
        ));
    }

    #[test]
    fn test_demonstrations_are_one_hot_and_self_consistent() {
        let settings = StrategySettings {
            jitter: false,
            ..StrategySettings::new(BoardDims::new(6, 8), 2)
        };
        let states: Vec<GameStateSnapshot> = Shape::ALL
            .iter()
            .map(|&s| GameStateSnapshot::new(settings.dims, "bot", s))
            .collect();
        let mut demonstrator = HeuristicStrategy::new(DifficultyTier::Expert, settings);
        let mut rng = StdRng::seed_from_u64(0);
        let data =
            LabeledDataset::from_demonstrations(&states, &mut demonstrator, &settings, &mut rng)
                .unwrap();
        assert_eq!(data.len(), states.len());
        for e in &data.examples {
            assert_eq!(e.target.iter().sum::<f32>(), 1.0);
            assert_eq!(e.features.len(), settings.feature_len());
        }

        let labeled: Vec<(GameStateSnapshot, Action)> = states
            .iter()
            .map(|s| (s.clone(), demonstrator.decide(s, &mut rng).unwrap()))
            .collect();
        let accuracy = evaluate_accuracy(&mut demonstrator, &labeled, &mut rng).unwrap();
        assert_eq!(accuracy, 1.0);
    }

    #[test]
    fn test_accuracy_needs_data() {
        let mut strategy =
            HeuristicStrategy::new(DifficultyTier::Easy, StrategySettings::default());
        let mut rng = StdRng::seed_from_u64(0);
        assert!(evaluate_accuracy(&mut strategy, &[], &mut rng).is_err());
    }
}
