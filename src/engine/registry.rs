use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::ai::{DifficultyTier, Strategy, StrategyKind};
use crate::error::EngineError;

/// Derive an agent's RNG seed from the engine seed and its id, so every
/// agent replays identically regardless of creation order.
pub fn agent_seed(base_seed: u64, agent_id: &str) -> u64 {
    // FNV-1a over the id, folded into the base seed
    let mut hash = 0xcbf29ce484222325u64 ^ base_seed;
    for byte in agent_id.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

/// Public description of a registered agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentHandle {
    pub agent_id: String,
    pub kind: StrategyKind,
    pub tier: DifficultyTier,
}

/// One live agent: its strategy, RNG and decision bookkeeping.
pub struct AgentSession {
    pub(crate) handle: AgentHandle,
    pub(crate) strategy: Box<dyn Strategy>,
    pub(crate) rng: StdRng,
    pub(crate) last_decision: Option<Duration>,
    pub(crate) decisions: u64,
    pub(crate) fallbacks: u64,
}

impl AgentSession {
    pub fn new(handle: AgentHandle, strategy: Box<dyn Strategy>, seed: u64) -> Self {
        AgentSession {
            handle,
            strategy,
            rng: StdRng::seed_from_u64(seed),
            last_decision: None,
            decisions: 0,
            fallbacks: 0,
        }
    }

    pub fn handle(&self) -> &AgentHandle {
        &self.handle
    }

    /// Decisions the strategy produced.
    pub fn decisions(&self) -> u64 {
        self.decisions
    }

    /// Recoverable failures answered with the fallback.
    pub fn fallbacks(&self) -> u64 {
        self.fallbacks
    }

    pub fn epsilon(&self) -> Option<f32> {
        self.strategy.epsilon()
    }
}

pub type SharedSession = Arc<Mutex<AgentSession>>;

/// Active agents by id. The map lock is held only to look sessions up;
/// decisions run under the per-agent lock, so different agents never wait
/// on each other.
#[derive(Default)]
pub struct AgentRegistry {
    sessions: RwLock<HashMap<String, SharedSession>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, session: AgentSession) -> Result<(), EngineError> {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let id = session.handle.agent_id.clone();
        if sessions.contains_key(&id) {
            return Err(EngineError::DuplicateAgent(id));
        }
        sessions.insert(id, Arc::new(Mutex::new(session)));
        Ok(())
    }

    pub fn get(&self, agent_id: &str) -> Result<SharedSession, EngineError> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(agent_id)
            .cloned()
            .ok_or_else(|| EngineError::UnknownAgent(agent_id.to_string()))
    }

    pub fn remove(&self, agent_id: &str) -> Result<AgentHandle, EngineError> {
        let session = self
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(agent_id)
            .ok_or_else(|| EngineError::UnknownAgent(agent_id.to_string()))?;
        let handle = session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .handle
            .clone();
        Ok(handle)
    }

    pub fn contains(&self, agent_id: &str) -> bool {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(agent_id)
    }

    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registered ids, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        ids.sort();
        ids
    }
}
