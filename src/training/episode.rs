use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::trace;

use crate::error::{SimulationError, TrainingError};
use crate::game::{
    fitted, simulate_detailed, Action, AgentStatus, BoardDims, GameStateSnapshot, Shape,
    Simulated, SpecialAction,
};

/// The game-state mutator: applies an action and returns the authoritative
/// next snapshot.
pub trait GameEnvironment {
    /// Start a new episode and return its first snapshot.
    fn reset(&mut self, seed: u64) -> GameStateSnapshot;

    /// Apply `action` to the current state.
    fn apply(&mut self, action: &Action) -> Result<GameStateSnapshot, TrainingError>;

    fn dims(&self) -> BoardDims;
}

/// Rule knobs of [`SandboxEnvironment`].
#[derive(Debug, Clone)]
pub struct SandboxRules {
    pub dims: BoardDims,
    /// The piece falls one row after this many actions.
    pub gravity_every: usize,
    /// Lines needed to win; 0 disables victory.
    pub victory_lines: u32,
    pub queue_len: usize,
    /// Match clock advance per action, in seconds.
    pub tick_seconds: f32,
    /// Resource earned per cleared line.
    pub resource_per_line: f32,
    pub catalog: Vec<SpecialAction>,
}

impl SandboxRules {
    pub fn new(dims: BoardDims) -> Self {
        SandboxRules {
            dims,
            gravity_every: 3,
            victory_lines: 40,
            queue_len: 3,
            tick_seconds: 0.1,
            resource_per_line: 10.0,
            catalog: Vec::new(),
        }
    }
}

/// Small local rule set built on the engine's simulator: single player,
/// gravity every few actions, random seven-piece queue, elimination when a
/// spawned piece collides.
pub struct SandboxEnvironment {
    rules: SandboxRules,
    agent_id: String,
    state: GameStateSnapshot,
    rng: StdRng,
    since_gravity: usize,
}

impl SandboxEnvironment {
    pub fn new(rules: SandboxRules) -> Self {
        let state = GameStateSnapshot::new(rules.dims, "sandbox", Shape::T);
        SandboxEnvironment {
            rules,
            agent_id: "sandbox".to_string(),
            state,
            rng: StdRng::seed_from_u64(0),
            since_gravity: 0,
        }
    }

    pub fn with_agent_id(mut self, agent_id: impl Into<String>) -> Self {
        self.agent_id = agent_id.into();
        self
    }

    pub fn state(&self) -> &GameStateSnapshot {
        &self.state
    }

    fn random_shape(&mut self) -> Shape {
        Shape::ALL[self.rng.random_range(0..Shape::ALL.len())]
    }

    /// Apply one action the way the game would, treating blocked moves as no-ops.
    fn resolve(&self, action: &Action) -> Result<Simulated, SimulationError> {
        match simulate_detailed(&self.state, action) {
            Err(SimulationError::PieceResting) => {
                // A blocked soft drop locks the piece in place.
                simulate_detailed(&self.state, &Action::HardDrop)
            }
            Err(e) if !matches!(action, Action::HardDrop) => {
                trace!(?action, error = %e, "Sandbox ignoring blocked action");
                Ok(Simulated {
                    state: self.state.clone(),
                    locked: false,
                    lines_cleared: 0,
                })
            }
            other => other,
        }
    }

    fn after_lock(&mut self, next: &mut GameStateSnapshot, lines: u32) {
        while next.queued_pieces.len() < self.rules.queue_len {
            let id = self.random_shape().id();
            next.queued_pieces.push(id);
        }
        next.agent_stats.resource += lines as f32 * self.rules.resource_per_line;
        if fitted(&next.board, next.active_piece).is_err() {
            next.agent_stats.status = AgentStatus::Eliminated;
        }
        self.since_gravity = 0;
    }
}

impl GameEnvironment for SandboxEnvironment {
    fn reset(&mut self, seed: u64) -> GameStateSnapshot {
        self.rng = StdRng::seed_from_u64(seed);
        self.since_gravity = 0;
        let shape = self.random_shape();
        let mut state = GameStateSnapshot::new(self.rules.dims, self.agent_id.clone(), shape);
        state.available_actions_catalog = self.rules.catalog.clone();
        for _ in 0..self.rules.queue_len {
            let id = self.random_shape().id();
            state.queued_pieces.push(id);
        }
        self.state = state.clone();
        state
    }

    fn apply(&mut self, action: &Action) -> Result<GameStateSnapshot, TrainingError> {
        if self.state.agent_stats.status.is_terminal() {
            return Err(TrainingError::Environment(
                "episode already finished".to_string(),
            ));
        }

        let sim = self
            .resolve(action)
            .map_err(|e| TrainingError::Environment(e.to_string()))?;
        let mut next = sim.state;
        if sim.locked {
            self.after_lock(&mut next, sim.lines_cleared);
        } else {
            self.since_gravity += 1;
            if self.since_gravity >= self.rules.gravity_every {
                self.since_gravity = 0;
                let fell = next.active_piece.shifted(0, 1);
                match fitted(&next.board, fell) {
                    Ok(piece) => next.active_piece = piece,
                    Err(_) => {
                        let locked = simulate_detailed(&next, &Action::HardDrop)
                            .map_err(|e| TrainingError::Environment(e.to_string()))?;
                        next = locked.state;
                        self.after_lock(&mut next, locked.lines_cleared);
                    }
                }
            }
        }

        next.elapsed += self.rules.tick_seconds;
        next.expire_effects();
        if self.rules.victory_lines > 0
            && next.agent_stats.status == AgentStatus::Playing
            && next.agent_stats.lines_cleared >= self.rules.victory_lines
        {
            next.agent_stats.status = AgentStatus::Victorious;
        }

        self.state = next.clone();
        Ok(next)
    }

    fn dims(&self) -> BoardDims {
        self.rules.dims
    }
}

/// Derive a deterministic seed for a given episode index.
pub fn episode_seed(base_seed: u64, episode_index: usize) -> u64 {
    // FNV-1a-inspired mixing for deterministic, well-distributed seeds
    let mut hash = base_seed ^ 0x517cc1b727220a95;
    let index = episode_index as u64;
    hash = hash.wrapping_mul(0x100000001b3);
    hash ^= index;
    hash = hash.wrapping_mul(0x100000001b3);
    hash ^= index >> 32;
    hash
}
