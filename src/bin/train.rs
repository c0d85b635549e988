#![recursion_limit = "256"]

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ml_tower_tetris::ai::{
    create_strategy, DifficultyTier, HeuristicStrategy, Strategy, StrategyKind,
};
use ml_tower_tetris::config::AppConfig;
use ml_tower_tetris::engine::{Engine, ModelSlot, TrainingSource};
use ml_tower_tetris::game::{Action, GameStateSnapshot};
use ml_tower_tetris::training::{
    episode_seed, evaluate_accuracy, GameEnvironment, LabeledDataset, SandboxEnvironment,
    SandboxRules,
};

/// Train and evaluate tower-tetris decision models.
#[derive(Parser)]
#[command(name = "train", about = "Train tower-tetris decision models")]
struct Cli {
    /// Path to TOML configuration file
    #[arg(long, default_value = "config.toml", global = true)]
    config: PathBuf,

    /// Directory for checkpoints (defaults to checkpoint.checkpoint_dir)
    #[arg(long, global = true)]
    output: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fit the learned strategy's network to a labelled dataset
    Supervised {
        /// JSON dataset of feature vectors and target distributions
        #[arg(long)]
        data: PathBuf,

        /// Override maximum epochs
        #[arg(long)]
        epochs: Option<usize>,

        /// Override learning rate
        #[arg(long)]
        lr: Option<f64>,
    },
    /// Train the DQN agent by self-play in the sandbox environment
    Reinforcement {
        /// Override number of training episodes
        #[arg(long)]
        episodes: Option<usize>,

        /// Override learning rate
        #[arg(long)]
        lr: Option<f64>,

        /// Tier controlling the epsilon decay rate
        #[arg(long)]
        tier: Option<DifficultyTier>,
    },
    /// Record a heuristic demonstrator's choices as a labelled dataset
    Demonstrate {
        /// Where to write the dataset
        #[arg(long)]
        out: PathBuf,

        #[arg(long, default_value_t = 20)]
        episodes: usize,

        #[arg(long, default_value = "expert")]
        tier: DifficultyTier,
    },
    /// Measure how often a saved model agrees with the expert heuristic
    Evaluate {
        /// Checkpoint directory to load
        #[arg(long)]
        model: PathBuf,

        #[arg(long, default_value_t = 5)]
        episodes: usize,
    },
    /// Print the default configuration as TOML
    DefaultConfig,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    if let Command::DefaultConfig = cli.command {
        print!("{}", AppConfig::default_toml()?);
        return Ok(());
    }

    let mut config = AppConfig::load_or_default(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config.display()))?;
    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| config.checkpoint.checkpoint_dir.clone());

    match cli.command {
        Command::Supervised { data, epochs, lr } => {
            if let Some(epochs) = epochs {
                config.supervised.max_epochs = epochs;
            }
            if let Some(lr) = lr {
                config.supervised.learning_rate = lr;
            }
            let dataset = LabeledDataset::load(&data)
                .with_context(|| format!("loading dataset from {}", data.display()))?;
            let engine = Engine::new(config)?;
            let path = engine
                .train(TrainingSource::Supervised(dataset), &output)
                .context("supervised training")?;
            println!("Best model saved to {}", path.display());
        }
        Command::Reinforcement { episodes, lr, tier } => {
            if let Some(episodes) = episodes {
                config.reinforcement.num_episodes = episodes;
            }
            if let Some(lr) = lr {
                config.reinforcement.learning_rate = lr;
            }
            if let Some(tier) = tier {
                config.reinforcement.tier = tier;
            }
            let env = SandboxEnvironment::new(SandboxRules::new(config.board.dims()));
            let engine = Engine::new(config)?;
            let path = engine
                .train(TrainingSource::Reinforcement(Box::new(env)), &output)
                .context("reinforcement training")?;
            println!("Final model saved to {}", path.display());
        }
        Command::Demonstrate {
            out,
            episodes,
            tier,
        } => {
            config.validate()?;
            let states = collect_states(&config, episodes, tier)?;
            let settings = config.strategy_settings();
            let mut demonstrator = HeuristicStrategy::new(tier, settings);
            let mut rng = StdRng::seed_from_u64(config.scheduler.seed);
            let dataset =
                LabeledDataset::from_demonstrations(&states, &mut demonstrator, &settings, &mut rng)?;
            dataset.save(&out)?;
            println!("Wrote {} examples to {}", dataset.len(), out.display());
        }
        Command::Evaluate { model, episodes } => {
            config.scheduler.auto_init_models = false;
            let states = collect_states(&config, episodes, DifficultyTier::Expert)?;
            let engine = Engine::new(config.clone())?;
            engine.load_model(ModelSlot::Learned, &model)?;

            let settings = engine.settings();
            let mut rng = StdRng::seed_from_u64(config.scheduler.seed);
            let mut expert = HeuristicStrategy::new(DifficultyTier::Expert, settings);
            let labeled = states
                .into_iter()
                .map(|s| expert.decide(&s, &mut rng).map(|a| (s, a)))
                .collect::<Result<Vec<(GameStateSnapshot, Action)>, _>>()?;

            let mut learned = create_strategy(
                StrategyKind::Learned,
                DifficultyTier::Expert,
                engine.models(),
                settings,
            );
            let accuracy = evaluate_accuracy(learned.as_mut(), &labeled, &mut rng)?;
            println!(
                "Agreement with expert heuristic over {} states: {:.1}%",
                labeled.len(),
                accuracy * 100.0
            );
        }
        Command::DefaultConfig => unreachable!(),
    }

    Ok(())
}

/// Play sandbox episodes with a heuristic agent and keep every snapshot it saw.
fn collect_states(
    config: &AppConfig,
    episodes: usize,
    tier: DifficultyTier,
) -> Result<Vec<GameStateSnapshot>> {
    if episodes == 0 {
        bail!("episodes must be > 0");
    }
    let settings = config.strategy_settings();
    let mut env = SandboxEnvironment::new(SandboxRules::new(config.board.dims()));
    let mut player = HeuristicStrategy::new(tier, settings);
    let mut rng = StdRng::seed_from_u64(config.scheduler.seed);
    let max_steps = config.reinforcement.max_steps;

    let mut states = Vec::new();
    for episode in 0..episodes {
        let mut state = env.reset(episode_seed(config.scheduler.seed, episode));
        let mut steps = 0;
        while steps < max_steps && !state.agent_stats.status.is_terminal() {
            let action = player.decide(&state, &mut rng)?;
            states.push(state);
            state = env.apply(&action)?;
            steps += 1;
        }
        info!(episode, steps, lines = state.agent_stats.lines_cleared, "Collected episode");
    }
    Ok(states)
}
