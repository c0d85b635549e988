use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::ai::{
    DifficultyTier, EpsilonSchedule, ModelSet, NetworkArchitecture, ReinforcementStrategy,
    Strategy, StrategyKind, StrategySettings,
};
use crate::game::FALLBACK_ACTION;
use crate::checkpoint::{
    timestamp_secs, CheckpointManager, CheckpointManagerConfig, CheckpointMetadata,
    CheckpointMetrics, TrainingMode,
};
use crate::error::{DecisionError, TrainingError};
use crate::training::dqn_learner::DqnLearner;
use crate::training::episode::{episode_seed, GameEnvironment};
use crate::training::metrics::{EpisodeResult, TrainingMetrics};
use crate::training::replay_buffer::SharedReplayBuffer;
use crate::training::reward::compute_reward;
use crate::training::supervised::StopReason;

/// Hyperparameters of the self-play DQN loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReinforcementConfig {
    pub learning_rate: f64,
    pub gamma: f32,
    pub epsilon_start: f32,
    pub epsilon_floor: f32,
    pub batch_size: usize,
    pub replay_capacity: usize,
    /// Buffer size required before gradient steps begin.
    pub min_replay_size: usize,
    /// Environment steps between hard target syncs.
    pub target_update_interval: usize,
    pub num_episodes: usize,
    pub max_steps: usize,
    /// Episodes between periodic checkpoints.
    pub checkpoint_interval: usize,
    /// Sets the epsilon decay rate.
    pub tier: DifficultyTier,
    pub seed: u64,
}

impl Default for ReinforcementConfig {
    fn default() -> Self {
        ReinforcementConfig {
            learning_rate: 1e-3,
            gamma: 0.99,
            epsilon_start: 1.0,
            epsilon_floor: 0.1,
            batch_size: 32,
            replay_capacity: 10_000,
            min_replay_size: 32,
            target_update_interval: 100,
            num_episodes: 1000,
            max_steps: 2000,
            checkpoint_interval: 100,
            tier: DifficultyTier::Easy,
            seed: 0,
        }
    }
}

/// Outcome of a reinforcement run.
#[derive(Debug, Clone)]
pub struct ReinforcementReport {
    /// Final checkpoint, or the last periodic one if the run was cancelled.
    pub model_path: PathBuf,
    pub episodes_run: usize,
    pub total_steps: usize,
    pub gradient_steps: usize,
    pub final_epsilon: f32,
    pub average_reward: f32,
    pub stop: StopReason,
}

/// Episodic self-play trainer for the reinforcement strategy.
///
/// Learning happens in private online/target slots. Weights reach
/// `models` only when a checkpoint is written or the run completes, so a
/// cancelled or failed run never replaces what live agents are using. When
/// `models.online` already holds weights of the same architecture, training
/// continues from them.
pub struct ReinforcementTrainer {
    config: ReinforcementConfig,
    settings: StrategySettings,
    architecture: NetworkArchitecture,
    checkpoint: CheckpointManagerConfig,
    models: ModelSet,
    replay: SharedReplayBuffer,
    cancel: Arc<AtomicBool>,
}

impl ReinforcementTrainer {
    pub fn new(
        config: ReinforcementConfig,
        settings: StrategySettings,
        architecture: NetworkArchitecture,
        checkpoint: CheckpointManagerConfig,
    ) -> Self {
        let replay = SharedReplayBuffer::new(config.replay_capacity.max(1));
        ReinforcementTrainer {
            config,
            settings,
            architecture,
            checkpoint,
            models: ModelSet::default(),
            replay,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Slots to warm-start from and publish into.
    pub fn with_models(mut self, models: ModelSet) -> Self {
        self.models = models;
        self
    }

    /// Share a replay buffer with other producers (e.g. live agents).
    pub fn with_replay(mut self, replay: SharedReplayBuffer) -> Self {
        self.replay = replay;
        self
    }

    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn replay(&self) -> &SharedReplayBuffer {
        &self.replay
    }

    pub fn models(&self) -> &ModelSet {
        &self.models
    }

    /// Run the full training loop against `env`.
    pub fn train(
        &self,
        env: &mut dyn GameEnvironment,
    ) -> Result<ReinforcementReport, TrainingError> {
        if env.dims() != self.settings.dims {
            return Err(TrainingError::Environment(format!(
                "environment board is {}x{}, engine expects {}x{}",
                env.dims().width,
                env.dims().height,
                self.settings.dims.width,
                self.settings.dims.height
            )));
        }

        let config = &self.config;
        let mut learner = self.initial_learner()?;
        let private = ModelSet::default();
        private
            .online
            .publish(self.architecture, learner.snapshot());
        let mut strategy = ReinforcementStrategy::new(
            config.tier,
            Arc::clone(&private.online),
            Arc::clone(&private.target),
            self.settings,
        )
        .with_schedule(EpsilonSchedule::for_tier(
            config.tier,
            config.epsilon_start,
            config.epsilon_floor,
        ));
        strategy.sync_target()?;

        let mut rng = StdRng::seed_from_u64(config.seed);
        let mut metrics = TrainingMetrics::new();
        let mut total_steps = 0usize;
        let mut last_checkpoint: Option<PathBuf> = None;
        let mut episodes_run = 0usize;
        let window = config.checkpoint_interval.max(1);

        info!(
            episodes = config.num_episodes,
            tier = %config.tier,
            "Starting reinforcement training"
        );

        for episode in 1..=config.num_episodes {
            if self.cancel.load(Ordering::Relaxed) {
                info!(episode, "Reinforcement training cancelled");
                let model_path = last_checkpoint.ok_or(TrainingError::Cancelled)?;
                return Ok(ReinforcementReport {
                    model_path,
                    episodes_run,
                    total_steps,
                    gradient_steps: learner.steps(),
                    final_epsilon: strategy.schedule().epsilon,
                    average_reward: metrics.average_reward(window),
                    stop: StopReason::Cancelled,
                });
            }

            let mut state = env.reset(episode_seed(config.seed, episode));
            if state.agent_stats.status.is_terminal() {
                return Err(TrainingError::Environment(format!(
                    "episode {} started in terminal status {:?}",
                    episode, state.agent_stats.status
                )));
            }
            let mut episode_reward = 0.0f32;
            let mut length = 0usize;

            while length < config.max_steps && !state.agent_stats.status.is_terminal() {
                let action = match strategy.decide(&state, &mut rng) {
                    Ok(action) => action,
                    Err(e) if e.is_recoverable() => {
                        warn!(
                            episode,
                            step = length,
                            error = %e,
                            "Decision failed, applying fallback"
                        );
                        FALLBACK_ACTION
                    }
                    Err(e) => return Err(e.into()),
                };
                let next = env.apply(&action)?;
                let (from, to) = (state.agent_stats.status, next.agent_stats.status);
                if !from.can_transition_to(to) {
                    return Err(TrainingError::Environment(format!(
                        "status moved backwards from {:?} to {:?}",
                        from, to
                    )));
                }

                let reward = compute_reward(&state, &next);
                let done = to.is_terminal();
                if let Some(experience) = strategy.complete_transition(next.clone(), reward, done)
                {
                    self.replay.push(experience);
                }

                if self.replay.len() >= config.min_replay_size.max(config.batch_size) {
                    if let Some(batch) = self.replay.sample(config.batch_size, &mut rng) {
                        let target = private.target.snapshot().ok_or_else(|| {
                            DecisionError::ModelUnavailable(
                                StrategyKind::Reinforcement.name().to_string(),
                            )
                        })?;
                        let loss = learner.train_step(&batch, &target)?;
                        private
                            .online
                            .publish(self.architecture, learner.snapshot());
                        metrics.record_update(loss);
                    }
                }

                total_steps += 1;
                if config.target_update_interval > 0
                    && total_steps % config.target_update_interval == 0
                {
                    strategy.sync_target()?;
                }

                episode_reward += reward;
                length += 1;
                state = next;
            }

            metrics.record_episode(EpisodeResult {
                total_reward: episode_reward,
                length,
                lines_cleared: state.agent_stats.lines_cleared,
                final_status: state.agent_stats.status,
            });
            episodes_run = episode;

            info!(
                episode,
                reward = episode_reward,
                length,
                epsilon = strategy.epsilon().unwrap_or_default(),
                loss = metrics.average_loss(window),
                "Episode finished"
            );

            if config.checkpoint_interval > 0 && episode % config.checkpoint_interval == 0 {
                let dir_name = format!("reinforcement_{:07}", episode);
                match self.save(&learner, &strategy, &metrics, episode, &dir_name) {
                    Ok(path) => {
                        self.publish(&learner, &private);
                        last_checkpoint = Some(path);
                    }
                    Err(e) => warn!(episode, error = %e, "Checkpoint failed"),
                }
            }
        }

        let dir_name = format!("reinforcement_final_{}", timestamp_secs());
        let model_path = self.save(&learner, &strategy, &metrics, episodes_run, &dir_name)?;
        self.publish(&learner, &private);

        info!(
            episodes = metrics.total_episodes(),
            steps = total_steps,
            average_reward = metrics.average_reward(window),
            victory_rate = metrics.victory_rate(window),
            "Reinforcement training complete"
        );

        Ok(ReinforcementReport {
            model_path,
            episodes_run,
            total_steps,
            gradient_steps: learner.steps(),
            final_epsilon: strategy.schedule().epsilon,
            average_reward: metrics.average_reward(window),
            stop: StopReason::Completed,
        })
    }

    /// Learner seeded from the published online weights when they fit.
    fn initial_learner(&self) -> Result<DqnLearner, TrainingError> {
        let config = &self.config;
        match self.models.online.snapshot() {
            Some(current) if current.architecture() == self.architecture => {
                info!(version = current.version(), "Continuing from published weights");
                DqnLearner::from_network(
                    self.architecture,
                    self.settings.dims,
                    config.learning_rate,
                    config.gamma,
                    current.network(),
                )
            }
            current => {
                if let Some(other) = current {
                    warn!(
                        version = other.version(),
                        "Published weights have another architecture, starting fresh"
                    );
                }
                Ok(DqnLearner::new(
                    self.architecture,
                    self.settings.dims,
                    config.learning_rate,
                    config.gamma,
                ))
            }
        }
    }

    /// Copy the private weights into the shared slots.
    fn publish(&self, learner: &DqnLearner, private: &ModelSet) {
        let online = self
            .models
            .online
            .publish(self.architecture, learner.snapshot());
        if let Some(target) = private.target.snapshot() {
            self.models
                .target
                .publish(target.architecture(), target.network());
        }
        debug!(version = online, "Published reinforcement weights");
    }

    fn save(
        &self,
        learner: &DqnLearner,
        strategy: &ReinforcementStrategy,
        metrics: &TrainingMetrics,
        episode: usize,
        dir_name: &str,
    ) -> Result<PathBuf, TrainingError> {
        let window = self.config.checkpoint_interval.max(1);
        let average_reward = metrics.average_reward(window);
        let metadata = CheckpointMetadata {
            step: episode,
            timestamp: timestamp_secs(),
            mode: TrainingMode::Reinforcement,
            architecture: self.architecture,
            board: self.settings.dims,
            metrics: CheckpointMetrics {
                score: average_reward,
                loss: metrics.average_loss(window),
                average_reward: Some(average_reward),
                epsilon: Some(strategy.schedule().epsilon),
                training_steps: learner.steps(),
            },
            supervised: None,
            reinforcement: Some(self.config.clone()),
        };
        debug!(episode, dir = dir_name, "Saving reinforcement checkpoint");
        let manager = CheckpointManager::new(self.checkpoint.clone());
        Ok(manager.save_model(&learner.snapshot(), &metadata, dir_name)?)
    }
}
