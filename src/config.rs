use std::path::Path;

use tracing::warn;

use crate::ai::{NetworkArchitecture, StrategySettings};
use crate::checkpoint::CheckpointManagerConfig;
use crate::engine::ExplorationPolicy;
use crate::error::ConfigError;
use crate::game::{BoardDims, STANDARD_HEIGHT, STANDARD_WIDTH};
use crate::training::{ReinforcementConfig, SupervisedConfig};

/// Board geometry and cast-slot count; together they fix the network shape.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    pub width: usize,
    pub height: usize,
    pub max_cast_slots: usize,
}

impl Default for BoardConfig {
    fn default() -> Self {
        BoardConfig {
            width: STANDARD_WIDTH,
            height: STANDARD_HEIGHT,
            max_cast_slots: 4,
        }
    }
}

impl BoardConfig {
    pub fn dims(&self) -> BoardDims {
        BoardDims::new(self.width, self.height)
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub hidden: [usize; 3],
    pub dropout: f64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        NetworkConfig {
            hidden: [256, 128, 64],
            dropout: 0.2,
        }
    }
}

/// Decision loop settings.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Minimum time between two decisions of one agent (5 frames at 60 fps).
    pub decision_interval_ms: u64,
    /// Base seed for per-agent random generators.
    pub seed: u64,
    /// Answer recoverable decision failures with a soft drop instead of no action.
    pub safe_fallback: bool,
    /// Give empty model slots random weights when a model-backed agent is created.
    pub auto_init_models: bool,
    pub heuristic_jitter: bool,
    /// Per-decision epsilon decay for reinforcement agents; unset uses the
    /// tier's rate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub epsilon_decay: Option<f32>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        SchedulerConfig {
            decision_interval_ms: 83,
            seed: 42,
            safe_fallback: true,
            auto_init_models: false,
            heuristic_jitter: true,
            epsilon_decay: None,
        }
    }
}

/// Top-level application configuration, loadable from TOML.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub board: BoardConfig,
    pub network: NetworkConfig,
    pub scheduler: SchedulerConfig,
    pub supervised: SupervisedConfig,
    pub reinforcement: ReinforcementConfig,
    pub checkpoint: CheckpointManagerConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: AppConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the file
    /// does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            warn!(path = %path.display(), "Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Settings handed to every strategy the engine creates.
    pub fn strategy_settings(&self) -> StrategySettings {
        StrategySettings {
            epsilon_start: self.reinforcement.epsilon_start,
            epsilon_floor: self.reinforcement.epsilon_floor,
            jitter: self.scheduler.heuristic_jitter,
            ..StrategySettings::new(self.board.dims(), self.board.max_cast_slots)
        }
    }

    /// Exploration parameters the decision scheduler gives new agents.
    pub fn exploration(&self) -> ExplorationPolicy {
        ExplorationPolicy {
            epsilon_start: self.reinforcement.epsilon_start,
            epsilon_floor: self.reinforcement.epsilon_floor,
            decay: self.scheduler.epsilon_decay,
        }
    }

    pub fn architecture(&self) -> NetworkArchitecture {
        self.strategy_settings()
            .architecture(self.network.hidden, self.network.dropout)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn fail(msg: &str) -> Result<(), ConfigError> {
            Err(ConfigError::Validation(msg.into()))
        }

        if self.board.width < 4 || self.board.height < 4 {
            return fail("board.width and board.height must be >= 4");
        }
        if self.network.hidden.contains(&0) {
            return fail("network.hidden sizes must be > 0");
        }
        if !(0.0..1.0).contains(&self.network.dropout) {
            return fail("network.dropout must be in [0, 1)");
        }

        if let Some(decay) = self.scheduler.epsilon_decay {
            if !(decay > 0.0 && decay <= 1.0) {
                return fail("scheduler.epsilon_decay must be in (0, 1]");
            }
        }

        let sup = &self.supervised;
        if sup.learning_rate <= 0.0 {
            return fail("supervised.learning_rate must be > 0");
        }
        if sup.batch_size == 0 {
            return fail("supervised.batch_size must be > 0");
        }
        if sup.max_epochs == 0 {
            return fail("supervised.max_epochs must be > 0");
        }
        if sup.patience == 0 {
            return fail("supervised.patience must be >= 1");
        }
        if sup.validation_split <= 0.0 || sup.validation_split >= 1.0 {
            return fail("supervised.validation_split must be in (0, 1)");
        }

        let rl = &self.reinforcement;
        if rl.learning_rate <= 0.0 {
            return fail("reinforcement.learning_rate must be > 0");
        }
        if rl.gamma < 0.0 || rl.gamma > 1.0 {
            return fail("reinforcement.gamma must be in [0, 1]");
        }
        if rl.epsilon_start < 0.0 || rl.epsilon_start > 1.0 {
            return fail("reinforcement.epsilon_start must be in [0, 1]");
        }
        if rl.epsilon_floor < 0.0 || rl.epsilon_floor > 1.0 {
            return fail("reinforcement.epsilon_floor must be in [0, 1]");
        }
        if rl.epsilon_floor > rl.epsilon_start {
            return fail("reinforcement.epsilon_floor must be <= reinforcement.epsilon_start");
        }
        if rl.batch_size == 0 {
            return fail("reinforcement.batch_size must be > 0");
        }
        if rl.replay_capacity < rl.batch_size {
            return fail("reinforcement.replay_capacity must be >= reinforcement.batch_size");
        }
        if rl.min_replay_size < rl.batch_size {
            return fail("reinforcement.min_replay_size must be >= reinforcement.batch_size");
        }
        if rl.target_update_interval == 0 {
            return fail("reinforcement.target_update_interval must be > 0");
        }
        if rl.num_episodes == 0 {
            return fail("reinforcement.num_episodes must be > 0");
        }
        if rl.max_steps == 0 {
            return fail("reinforcement.max_steps must be > 0");
        }

        if self.checkpoint.keep_last_n == 0 {
            return fail("checkpoint.keep_last_n must be >= 1");
        }

        Ok(())
    }

    /// Generate a TOML string with all default values (useful for creating
    /// example config files).
    pub fn default_toml() -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(&AppConfig::default())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::DifficultyTier;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        config.validate().expect("default config should be valid");
    }

    #[test]
    fn test_default_architecture_matches_board() {
        let arch = AppConfig::default().architecture();
        assert_eq!(arch.input_len, 10 * 20 + 21);
        assert_eq!(arch.output_len, 10);
        assert_eq!(arch.hidden, [256, 128, 64]);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let toml_str = r#"
[reinforcement]
learning_rate = 0.0005
tier = "hard"
"#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert!((config.reinforcement.learning_rate - 0.0005).abs() < 1e-9);
        assert_eq!(config.reinforcement.tier, DifficultyTier::Hard);
        // Other fields should be defaults
        assert!((config.reinforcement.gamma - 0.99).abs() < 1e-6);
        assert_eq!(config.supervised.patience, 5);
        assert_eq!(config.board.width, 10);
    }

    #[test]
    fn test_empty_toml_uses_all_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_validation_rejects_tiny_board() {
        let mut config = AppConfig::default();
        config.board.width = 2;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_bad_dropout() {
        let mut config = AppConfig::default();
        config.network.dropout = 1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_zero_hidden_layer() {
        let mut config = AppConfig::default();
        config.network.hidden = [256, 0, 64];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_validation_split_out_of_range() {
        let mut config = AppConfig::default();
        config.supervised.validation_split = 1.0;
        assert!(config.validate().is_err());
        config.supervised.validation_split = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_zero_patience() {
        let mut config = AppConfig::default();
        config.supervised.patience = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_negative_lr() {
        let mut config = AppConfig::default();
        config.reinforcement.learning_rate = -0.001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_invalid_gamma() {
        let mut config = AppConfig::default();
        config.reinforcement.gamma = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_floor_above_start() {
        let mut config = AppConfig::default();
        config.reinforcement.epsilon_start = 0.1;
        config.reinforcement.epsilon_floor = 0.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_replay_capacity_lt_batch() {
        let mut config = AppConfig::default();
        config.reinforcement.replay_capacity = 10;
        config.reinforcement.batch_size = 64;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_zero_target_interval() {
        let mut config = AppConfig::default();
        config.reinforcement.target_update_interval = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_epsilon_decay_is_validated_and_passed_on() {
        let mut config = AppConfig::default();
        assert_eq!(config.exploration().decay, None);
        config.scheduler.epsilon_decay = Some(0.0);
        assert!(config.validate().is_err());
        config.scheduler.epsilon_decay = Some(1.5);
        assert!(config.validate().is_err());
        config.scheduler.epsilon_decay = Some(0.97);
        config.validate().unwrap();
        assert_eq!(config.exploration().decay, Some(0.97));
        assert_eq!(config.exploration().epsilon_start, 1.0);
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = AppConfig::load_or_default(Path::new("nonexistent_config.toml")).unwrap();
        assert_eq!(config.reinforcement.num_episodes, 1000);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test_config.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(
            f,
            r#"
[board]
width = 6
height = 12
max_cast_slots = 2

[scheduler]
decision_interval_ms = 50
safe_fallback = false
"#
        )
        .unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.board.dims(), BoardDims::new(6, 12));
        assert_eq!(config.scheduler.decision_interval_ms, 50);
        assert!(!config.scheduler.safe_fallback);
        assert_eq!(config.strategy_settings().action_slots, 8);
        // Others are defaults
        assert!((config.supervised.learning_rate - 1e-3).abs() < 1e-9);
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[supervised]\nbatch_size = 0\n").unwrap();
        assert!(matches!(
            AppConfig::load(&path),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_default_toml_roundtrips() {
        let toml_str = AppConfig::default_toml().unwrap();
        let config: AppConfig = toml::from_str(&toml_str).unwrap();
        config.validate().expect("roundtripped config should be valid");
        assert_eq!(config, AppConfig::default());
    }
}
