use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, PoisonError};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, trace, warn};

use crate::ai::{
    create_strategy, DifficultyTier, EpsilonSchedule, InferBackend, ModelSet,
    NetworkArchitecture, PolicyNetwork, SharedModel, StrategyKind, StrategySettings,
};
use crate::checkpoint::{CheckpointManager, CheckpointManagerConfig};
use crate::config::AppConfig;
use crate::engine::registry::{agent_seed, AgentHandle, AgentRegistry, AgentSession};
use crate::engine::scheduler::{Clock, DecisionScheduler, SystemClock};
use crate::error::EngineError;
pub use crate::game::FALLBACK_ACTION;
use crate::game::{Action, GameStateSnapshot};
use crate::training::{
    compute_reward, GameEnvironment, LabeledDataset, ReinforcementTrainer, SharedReplayBuffer,
    SupervisedTrainer,
};

/// Which published weights a model operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelSlot {
    /// Read by learned and hybrid agents.
    Learned,
    /// Online and target networks of reinforcement agents.
    Reinforcement,
}

/// Input of a training run.
pub enum TrainingSource {
    Supervised(LabeledDataset),
    Reinforcement(Box<dyn GameEnvironment>),
}

/// Entry point for collaborators: agent lifecycle, rate-limited decisions,
/// training, and model hot-swap.
pub struct Engine {
    config: AppConfig,
    settings: StrategySettings,
    architecture: NetworkArchitecture,
    models: ModelSet,
    registry: AgentRegistry,
    scheduler: DecisionScheduler,
    replay: SharedReplayBuffer,
    cancel: Arc<AtomicBool>,
}

impl Engine {
    pub fn new(config: AppConfig) -> Result<Self, EngineError> {
        Self::with_clock(config, Arc::new(SystemClock::new()))
    }

    pub fn with_clock(config: AppConfig, clock: Arc<dyn Clock>) -> Result<Self, EngineError> {
        config.validate()?;
        let settings = config.strategy_settings();
        let architecture = config.architecture();
        let scheduler = DecisionScheduler::new(
            Duration::from_millis(config.scheduler.decision_interval_ms),
            clock,
        )
        .with_exploration(config.exploration());
        let replay = SharedReplayBuffer::new(config.reinforcement.replay_capacity);
        info!(
            width = settings.dims.width,
            height = settings.dims.height,
            action_slots = settings.action_slots,
            "Engine ready"
        );
        Ok(Engine {
            config,
            settings,
            architecture,
            models: ModelSet::default(),
            registry: AgentRegistry::new(),
            scheduler,
            replay,
            cancel: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn settings(&self) -> StrategySettings {
        self.settings
    }

    pub fn architecture(&self) -> NetworkArchitecture {
        self.architecture
    }

    pub fn models(&self) -> &ModelSet {
        &self.models
    }

    /// Experiences completed by live reinforcement agents.
    pub fn replay(&self) -> &SharedReplayBuffer {
        &self.replay
    }

    /// Setting the flag stops a running `train` at its next epoch or
    /// episode boundary.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Register a new agent.
    ///
    /// Model-backed kinds read the engine's shared slots; with
    /// `auto_init_models` set, empty slots receive random weights here.
    pub fn create_agent(
        &self,
        agent_id: &str,
        kind: StrategyKind,
        tier: DifficultyTier,
    ) -> Result<AgentHandle, EngineError> {
        if self.registry.contains(agent_id) {
            return Err(EngineError::DuplicateAgent(agent_id.to_string()));
        }
        if kind.needs_model() && self.config.scheduler.auto_init_models {
            self.ensure_models(kind);
        }

        let handle = AgentHandle {
            agent_id: agent_id.to_string(),
            kind,
            tier,
        };
        let mut strategy = create_strategy(kind, tier, &self.models, self.settings);
        if let Some(schedule) = self.scheduler.exploration_for(kind, tier) {
            strategy.set_exploration(schedule);
        }
        let seed = agent_seed(self.config.scheduler.seed, agent_id);
        self.registry
            .insert(AgentSession::new(handle.clone(), strategy, seed))?;
        info!(agent = agent_id, %kind, %tier, "Agent created");
        Ok(handle)
    }

    fn ensure_models(&self, kind: StrategyKind) {
        match kind {
            StrategyKind::Heuristic => {}
            StrategyKind::Learned | StrategyKind::Hybrid => {
                if !self.models.learned.is_loaded() {
                    debug!("Initialising learned model with random weights");
                    self.models
                        .learned
                        .publish(self.architecture, self.architecture.init(&Default::default()));
                }
            }
            StrategyKind::Reinforcement => {
                if !self.models.online.is_loaded() {
                    debug!("Initialising reinforcement model with random weights");
                    self.models
                        .online
                        .publish(self.architecture, self.architecture.init(&Default::default()));
                }
                if !self.models.target.is_loaded() {
                    if let Some(online) = self.models.online.snapshot() {
                        self.models.target.publish_version(online);
                    }
                }
            }
        }
    }

    pub fn remove_agent(&self, agent_id: &str) -> Result<AgentHandle, EngineError> {
        let handle = self.registry.remove(agent_id)?;
        info!(agent = agent_id, "Agent removed");
        Ok(handle)
    }

    pub fn agent_ids(&self) -> Vec<String> {
        self.registry.ids()
    }

    pub fn agent(&self, agent_id: &str) -> Result<AgentHandle, EngineError> {
        let session = self.registry.get(agent_id)?;
        let guard = session.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(guard.handle().clone())
    }

    /// Current exploration rate of an agent, if its strategy explores.
    pub fn agent_epsilon(&self, agent_id: &str) -> Result<Option<f32>, EngineError> {
        let session = self.registry.get(agent_id)?;
        let guard = session.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(guard.epsilon())
    }

    /// Exploration schedule of an agent, if its strategy explores.
    pub fn exploration(&self, agent_id: &str) -> Result<Option<EpsilonSchedule>, EngineError> {
        let session = self.registry.get(agent_id)?;
        let guard = session.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(guard.strategy.exploration())
    }

    /// Override an agent's exploration schedule. Returns false for agents
    /// that do not explore.
    pub fn set_exploration(
        &self,
        agent_id: &str,
        schedule: EpsilonSchedule,
    ) -> Result<bool, EngineError> {
        let session = self.registry.get(agent_id)?;
        let mut guard = session.lock().unwrap_or_else(PoisonError::into_inner);
        let applied = guard.strategy.set_exploration(schedule);
        if applied {
            debug!(
                agent = agent_id,
                epsilon = schedule.epsilon,
                decay = schedule.decay,
                floor = schedule.floor,
                "Exploration updated"
            );
        }
        Ok(applied)
    }

    /// Ask an agent for its next action.
    ///
    /// Returns `Ok(None)` when the call falls inside the agent's decision
    /// interval. Recoverable evaluation failures are logged and answered with
    /// [`FALLBACK_ACTION`] (or `None` with safe fallback disabled); a missing
    /// model is an error.
    pub fn decide(
        &self,
        agent_id: &str,
        state: &GameStateSnapshot,
    ) -> Result<Option<Action>, EngineError> {
        let session = self.registry.get(agent_id)?;
        let mut guard = session.lock().unwrap_or_else(PoisonError::into_inner);
        let session = &mut *guard;

        if !self.scheduler.admit(&mut session.last_decision) {
            trace!(
                agent = agent_id,
                remaining_ms = self.scheduler.remaining(session.last_decision).as_millis() as u64,
                "Decision rate-limited"
            );
            return Ok(None);
        }

        match session.strategy.decide(state, &mut session.rng) {
            Ok(action) => {
                session.decisions += 1;
                Ok(Some(action))
            }
            Err(e) if e.is_recoverable() => {
                session.fallbacks += 1;
                let fallback = self.config.scheduler.safe_fallback.then_some(FALLBACK_ACTION);
                warn!(agent = agent_id, error = %e, ?fallback, "Decision failed, falling back");
                Ok(fallback)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Report the snapshot that followed an agent's last decision.
    ///
    /// For reinforcement agents this completes the pending experience,
    /// pushes it to the shared replay buffer and returns its reward; other
    /// agents have nothing pending and get `None`.
    pub fn observe(
        &self,
        agent_id: &str,
        next_state: &GameStateSnapshot,
    ) -> Result<Option<f32>, EngineError> {
        let session = self.registry.get(agent_id)?;
        let pending = session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .strategy
            .take_pending();
        let Some(pending) = pending else {
            return Ok(None);
        };
        let reward = compute_reward(&pending.state, next_state);
        let done = next_state.agent_stats.status.is_terminal();
        self.replay
            .push(pending.complete(next_state.clone(), reward, done));
        trace!(agent = agent_id, reward, done, "Experience recorded");
        Ok(Some(reward))
    }

    /// Run a training job and publish its result for live agents. Returns the
    /// persisted artifact: the best snapshot for supervised runs, the final
    /// model for reinforcement runs.
    pub fn train(
        &self,
        source: TrainingSource,
        output_dir: &Path,
    ) -> Result<PathBuf, EngineError> {
        let checkpoint = CheckpointManagerConfig {
            checkpoint_dir: output_dir.to_path_buf(),
            ..self.config.checkpoint.clone()
        };
        match source {
            TrainingSource::Supervised(dataset) => {
                let trainer = SupervisedTrainer::new(
                    self.config.supervised.clone(),
                    self.architecture,
                    self.settings.dims,
                    checkpoint,
                )
                .with_cancel_flag(self.cancel_flag());
                let mut rng = StdRng::seed_from_u64(self.config.scheduler.seed);
                let report = trainer.train(&dataset, &mut rng)?;
                let version = self.publish_model(ModelSlot::Learned, report.network);
                info!(version, path = %report.best_path.display(), "Published supervised model");
                Ok(report.best_path)
            }
            TrainingSource::Reinforcement(mut env) => {
                let trainer = ReinforcementTrainer::new(
                    self.config.reinforcement.clone(),
                    self.settings,
                    self.architecture,
                    checkpoint,
                )
                .with_models(self.models.clone())
                .with_replay(self.replay.clone())
                .with_cancel_flag(self.cancel_flag());
                let report = trainer.train(env.as_mut())?;
                info!(
                    episodes = report.episodes_run,
                    version = self.models.online.version(),
                    path = %report.model_path.display(),
                    "Reinforcement training published"
                );
                Ok(report.model_path)
            }
        }
    }

    /// Load a checkpoint directory into a slot after checking it fits the
    /// engine's board and action slots.
    pub fn load_model(&self, slot: ModelSlot, dir: &Path) -> Result<u64, EngineError> {
        let manager = CheckpointManager::new(CheckpointManagerConfig {
            checkpoint_dir: dir.parent().unwrap_or(dir).to_path_buf(),
            ..self.config.checkpoint.clone()
        });
        let data = manager.load_model(dir)?;
        let loaded = data.metadata.architecture;
        if loaded.input_len != self.architecture.input_len
            || loaded.output_len != self.architecture.output_len
        {
            return Err(EngineError::ArchitectureMismatch(format!(
                "checkpoint is {}x{}, engine expects {}x{}",
                loaded.input_len,
                loaded.output_len,
                self.architecture.input_len,
                self.architecture.output_len
            )));
        }
        let version = self.publish_into(slot, loaded, data.network);
        info!(?slot, version, path = %dir.display(), "Loaded model");
        Ok(version)
    }

    /// Atomically replace the weights in `slot`; decisions already running
    /// keep the version they started with.
    pub fn publish_model(&self, slot: ModelSlot, network: PolicyNetwork<InferBackend>) -> u64 {
        self.publish_into(slot, self.architecture, network)
    }

    fn publish_into(
        &self,
        slot: ModelSlot,
        architecture: NetworkArchitecture,
        network: PolicyNetwork<InferBackend>,
    ) -> u64 {
        match slot {
            ModelSlot::Learned => self.models.learned.publish(architecture, network),
            ModelSlot::Reinforcement => {
                let version = self.models.online.publish(architecture, network);
                sync(&self.models.online, &self.models.target);
                version
            }
        }
    }
}

fn sync(from: &SharedModel, to: &SharedModel) {
    if let Some(current) = from.snapshot() {
        to.publish_version(current);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::scheduler::ManualClock;
    use crate::error::DecisionError;
    use crate::game::{BoardDims, Shape};
    use crate::training::{LabeledExample, SandboxEnvironment, SandboxRules};
    use tempfile::TempDir;

    fn config() -> AppConfig {
        let mut config = AppConfig::default();
        config.board.width = 4;
        config.board.height = 8;
        config.board.max_cast_slots = 0;
        config.network.hidden = [16, 8, 8];
        config.network.dropout = 0.0;
        config.scheduler.decision_interval_ms = 100;
        config.scheduler.auto_init_models = true;
        config
    }

    fn build(config: AppConfig) -> (Engine, ManualClock) {
        let clock = ManualClock::new();
        let engine = Engine::with_clock(config, Arc::new(clock.clone())).unwrap();
        (engine, clock)
    }

    fn snapshot(id: &str) -> GameStateSnapshot {
        GameStateSnapshot::new(BoardDims::new(4, 8), id, Shape::T)
    }

    #[test]
    fn test_decide_is_rate_limited_per_agent() {
        let (engine, clock) = build(config());
        engine
            .create_agent("a", StrategyKind::Heuristic, DifficultyTier::Easy)
            .unwrap();
        engine
            .create_agent("b", StrategyKind::Heuristic, DifficultyTier::Easy)
            .unwrap();

        assert!(engine.decide("a", &snapshot("a")).unwrap().is_some());
        assert!(engine.decide("a", &snapshot("a")).unwrap().is_none());
        // Another agent has its own interval.
        assert!(engine.decide("b", &snapshot("b")).unwrap().is_some());

        clock.advance(Duration::from_millis(100));
        assert!(engine.decide("a", &snapshot("a")).unwrap().is_some());
    }

    #[test]
    fn test_invalid_snapshot_falls_back_to_soft_drop() {
        let (engine, _) = build(config());
        engine
            .create_agent("a", StrategyKind::Heuristic, DifficultyTier::Hard)
            .unwrap();
        let wrong = GameStateSnapshot::new(BoardDims::new(10, 20), "a", Shape::T);
        assert_eq!(engine.decide("a", &wrong).unwrap(), Some(Action::SoftDrop));
    }

    #[test]
    fn test_invalid_snapshot_without_fallback_yields_nothing() {
        let mut config = config();
        config.scheduler.safe_fallback = false;
        let (engine, _) = build(config);
        engine
            .create_agent("a", StrategyKind::Heuristic, DifficultyTier::Hard)
            .unwrap();
        let wrong = GameStateSnapshot::new(BoardDims::new(10, 20), "a", Shape::T);
        assert_eq!(engine.decide("a", &wrong).unwrap(), None);
    }

    #[test]
    fn test_missing_model_fails_loudly() {
        let mut config = config();
        config.scheduler.auto_init_models = false;
        let (engine, _) = build(config);
        engine
            .create_agent("a", StrategyKind::Learned, DifficultyTier::Expert)
            .unwrap();
        let err = engine.decide("a", &snapshot("a")).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Decision(DecisionError::ModelUnavailable(_))
        ));
    }

    #[test]
    fn test_create_and_remove_agents() {
        let (engine, _) = build(config());
        let handle = engine
            .create_agent("rl", StrategyKind::Reinforcement, DifficultyTier::Medium)
            .unwrap();
        assert_eq!(handle.kind, StrategyKind::Reinforcement);
        assert!(engine.models().online.is_loaded());
        assert!(engine.models().target.is_loaded());
        assert!(matches!(
            engine.create_agent("rl", StrategyKind::Heuristic, DifficultyTier::Easy),
            Err(EngineError::DuplicateAgent(_))
        ));

        engine.remove_agent("rl").unwrap();
        assert!(engine.agent_ids().is_empty());
        assert!(matches!(
            engine.decide("rl", &snapshot("rl")),
            Err(EngineError::UnknownAgent(_))
        ));
    }

    #[test]
    fn test_observe_records_reinforcement_experience() {
        let (engine, _) = build(config());
        engine
            .create_agent("rl", StrategyKind::Reinforcement, DifficultyTier::Easy)
            .unwrap();
        engine
            .create_agent("h", StrategyKind::Heuristic, DifficultyTier::Easy)
            .unwrap();

        let state = snapshot("rl");
        let action = engine.decide("rl", &state).unwrap().unwrap();
        let next = crate::game::simulate(&state, &action).unwrap_or_else(|_| state.clone());
        assert!(engine.observe("rl", &next).unwrap().is_some());
        assert_eq!(engine.replay().len(), 1);
        // Nothing pending any more.
        assert!(engine.observe("rl", &next).unwrap().is_none());

        engine.decide("h", &snapshot("h")).unwrap();
        assert!(engine.observe("h", &snapshot("h")).unwrap().is_none());
        assert_eq!(engine.replay().len(), 1);
    }

    #[test]
    fn test_epsilon_decays_across_decisions() {
        let (engine, clock) = build(config());
        engine
            .create_agent("rl", StrategyKind::Reinforcement, DifficultyTier::Expert)
            .unwrap();
        let mut previous = engine.agent_epsilon("rl").unwrap().unwrap();
        for _ in 0..20 {
            engine.decide("rl", &snapshot("rl")).unwrap();
            clock.advance(Duration::from_millis(100));
            let eps = engine.agent_epsilon("rl").unwrap().unwrap();
            assert!(eps <= previous);
            assert!(eps >= engine.settings().epsilon_floor);
            previous = eps;
        }
    }

    #[test]
    fn test_supervised_training_publishes_learned_model() {
        let dir = TempDir::new().unwrap();
        let mut config = config();
        config.supervised.max_epochs = 3;
        let (engine, _) = build(config);
        let settings = engine.settings();

        let mut dataset = LabeledDataset::new(settings.feature_len(), settings.action_slots);
        for i in 0..10 {
            let mut target = vec![0.0; settings.action_slots];
            target[i % settings.action_slots] = 1.0;
            dataset
                .push(LabeledExample {
                    features: vec![i as f32 / 10.0; settings.feature_len()],
                    target,
                })
                .unwrap();
        }

        assert!(!engine.models().learned.is_loaded());
        let path = engine
            .train(TrainingSource::Supervised(dataset), dir.path())
            .unwrap();
        assert!(path.starts_with(dir.path()));
        assert!(engine.models().learned.is_loaded());

        let mut reload = crate::config::AppConfig::default();
        reload.board = engine.config().board.clone();
        reload.network = engine.config().network.clone();
        let (other, _) = build(reload);
        assert!(other.load_model(ModelSlot::Learned, &path).is_ok());
    }

    #[test]
    fn test_reinforcement_training_updates_shared_slots() {
        let dir = TempDir::new().unwrap();
        let mut config = config();
        config.reinforcement.num_episodes = 2;
        config.reinforcement.max_steps = 20;
        config.reinforcement.batch_size = 4;
        config.reinforcement.min_replay_size = 4;
        config.reinforcement.checkpoint_interval = 1;
        let (engine, _) = build(config);
        engine
            .create_agent("rl", StrategyKind::Reinforcement, DifficultyTier::Easy)
            .unwrap();
        let before = engine.models().online.version().unwrap();

        let env = SandboxEnvironment::new(SandboxRules::new(BoardDims::new(4, 8)));
        let path = engine
            .train(TrainingSource::Reinforcement(Box::new(env)), dir.path())
            .unwrap();
        assert!(path.exists());
        assert!(engine.models().online.version().unwrap() > before);
        // The live agent reads the freshly published weights.
        assert!(engine.decide("rl", &snapshot("rl")).unwrap().is_some());
    }

    #[test]
    fn test_scheduler_assigns_and_overrides_exploration() {
        let mut config = config();
        config.reinforcement.epsilon_start = 0.6;
        config.reinforcement.epsilon_floor = 0.2;
        config.scheduler.epsilon_decay = Some(0.5);
        let (engine, clock) = build(config);
        engine
            .create_agent("rl", StrategyKind::Reinforcement, DifficultyTier::Easy)
            .unwrap();
        engine
            .create_agent("h", StrategyKind::Heuristic, DifficultyTier::Easy)
            .unwrap();

        assert_eq!(
            engine.exploration("rl").unwrap(),
            Some(EpsilonSchedule::new(0.6, 0.5, 0.2))
        );
        engine.decide("rl", &snapshot("rl")).unwrap();
        assert_eq!(engine.agent_epsilon("rl").unwrap(), Some(0.3));

        assert!(engine
            .set_exploration("rl", EpsilonSchedule::fixed(0.05))
            .unwrap());
        clock.advance(Duration::from_millis(100));
        engine.decide("rl", &snapshot("rl")).unwrap();
        assert_eq!(engine.agent_epsilon("rl").unwrap(), Some(0.05));

        assert_eq!(engine.exploration("h").unwrap(), None);
        assert!(!engine
            .set_exploration("h", EpsilonSchedule::fixed(0.5))
            .unwrap());
        assert!(matches!(
            engine.set_exploration("ghost", EpsilonSchedule::fixed(0.5)),
            Err(EngineError::UnknownAgent(_))
        ));
    }

    #[test]
    fn test_engine_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Engine>();
        assert_send_sync::<ModelSet>();
    }

    #[test]
    fn test_concurrent_decisions_while_training() {
        let dir = TempDir::new().unwrap();
        let mut config = config();
        config.scheduler.decision_interval_ms = 0;
        config.supervised.max_epochs = 2;
        let (engine, _) = build(config);
        let settings = engine.settings();
        let ids = ["h0", "h1", "l0", "l1"];
        for id in ids {
            let kind = if id.starts_with('h') {
                StrategyKind::Heuristic
            } else {
                StrategyKind::Learned
            };
            engine.create_agent(id, kind, DifficultyTier::Medium).unwrap();
        }

        let mut dataset = LabeledDataset::new(settings.feature_len(), settings.action_slots);
        for i in 0..12 {
            let mut target = vec![0.0; settings.action_slots];
            target[i % settings.action_slots] = 1.0;
            dataset
                .push(LabeledExample {
                    features: vec![i as f32 / 12.0; settings.feature_len()],
                    target,
                })
                .unwrap();
        }
        let before = engine.models().learned.version().unwrap();

        std::thread::scope(|scope| {
            let trainer =
                scope.spawn(|| engine.train(TrainingSource::Supervised(dataset), dir.path()));
            let deciders: Vec<_> = ids
                .iter()
                .map(|&id| {
                    let engine = &engine;
                    scope.spawn(move || {
                        let state = snapshot(id);
                        for _ in 0..25 {
                            let action = engine.decide(id, &state).unwrap().unwrap();
                            assert!(crate::game::generate_legal_actions(&state).contains(&action));
                        }
                    })
                })
                .collect();
            for decider in deciders {
                decider.join().unwrap();
            }
            assert!(trainer.join().unwrap().is_ok());
        });

        assert!(engine.models().learned.version().unwrap() > before);
        assert!(engine.decide("l0", &snapshot("l0")).unwrap().is_some());
    }

    #[test]
    fn test_cancelled_reinforcement_run_keeps_live_weights() {
        let dir = TempDir::new().unwrap();
        let (engine, _) = build(config());
        engine
            .create_agent("rl", StrategyKind::Reinforcement, DifficultyTier::Easy)
            .unwrap();
        let online = engine.models().online.version();
        let target = engine.models().target.version();

        engine
            .cancel_flag()
            .store(true, std::sync::atomic::Ordering::Relaxed);
        let env = SandboxEnvironment::new(SandboxRules::new(BoardDims::new(4, 8)));
        assert!(engine
            .train(TrainingSource::Reinforcement(Box::new(env)), dir.path())
            .is_err());
        assert_eq!(engine.models().online.version(), online);
        assert_eq!(engine.models().target.version(), target);
    }

    #[test]
    fn test_load_model_rejects_other_board_size() {
        let dir = TempDir::new().unwrap();
        let (engine, _) = build(config());
        let manager = CheckpointManager::new(CheckpointManagerConfig {
            checkpoint_dir: dir.path().to_path_buf(),
            ..Default::default()
        });
        let arch = NetworkArchitecture::new(10, 3).with_hidden([4, 4, 4]);
        let metadata = crate::checkpoint::CheckpointMetadata {
            step: 1,
            timestamp: 0,
            mode: crate::checkpoint::TrainingMode::Supervised,
            architecture: arch,
            board: BoardDims::new(4, 8),
            metrics: Default::default(),
            supervised: None,
            reinforcement: None,
        };
        let path = manager
            .save_model(&arch.init(&Default::default()), &metadata, "foreign")
            .unwrap();
        assert!(matches!(
            engine.load_model(ModelSlot::Reinforcement, &path),
            Err(EngineError::ArchitectureMismatch(_))
        ));
        assert!(!engine.models().online.is_loaded());
    }

    #[test]
    fn test_publish_model_hot_swaps_reinforcement_slots() {
        let (engine, _) = build(config());
        let arch = engine.architecture();
        let v1 = engine.publish_model(ModelSlot::Reinforcement, arch.init(&Default::default()));
        let held = engine.models().online.snapshot().unwrap();
        let v2 = engine.publish_model(ModelSlot::Reinforcement, arch.init(&Default::default()));
        assert!(v2 > v1);
        assert_eq!(held.version(), v1);
        assert_eq!(engine.models().target.version(), Some(v2));
    }
}
