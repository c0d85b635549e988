use serde::{Deserialize, Serialize};

use super::{ActivePiece, Board, BoardDims, Shape};
use crate::error::DecisionError;

/// Lifecycle of an agent within a match. Transitions only leave `Playing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgentStatus {
    #[default]
    Playing,
    Eliminated,
    Victorious,
}

impl AgentStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, AgentStatus::Playing)
    }

    /// Whether moving from `self` to `next` respects the one-way lifecycle.
    pub fn can_transition_to(self, next: AgentStatus) -> bool {
        self == next || self == AgentStatus::Playing
    }

    /// Numeric code used in feature vectors.
    pub fn code(self) -> f32 {
        match self {
            AgentStatus::Playing => 0.0,
            AgentStatus::Eliminated => -1.0,
            AgentStatus::Victorious => 1.0,
        }
    }
}

/// Per-agent counters supplied with every snapshot.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AgentStats {
    pub agent_id: String,
    pub score: u64,
    pub level: u32,
    pub lines_cleared: u32,
    pub combo_count: u32,
    /// Mana-like gauge spent by special actions.
    pub resource: f32,
    pub status: AgentStatus,
}

impl AgentStats {
    pub fn new(agent_id: impl Into<String>) -> Self {
        AgentStats {
            agent_id: agent_id.into(),
            level: 1,
            ..Default::default()
        }
    }
}

/// Who a special action may be aimed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetScope {
    /// Helps the caster ("light" spells).
    #[serde(rename = "SELF")]
    Caster,
    /// Hinders the opponent ("dark" spells).
    #[serde(rename = "OPPONENT")]
    Opponent,
}

/// Catalog entry for a castable special action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecialAction {
    pub id: String,
    pub resource_cost: f32,
    pub target_scope: TargetScope,
    /// Effect duration in seconds.
    pub duration: f32,
}

/// A timed effect currently in force.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveEffect {
    pub action_id: String,
    pub caster_id: String,
    pub target_id: String,
    pub start: f32,
    pub end: f32,
}

impl ActiveEffect {
    pub fn is_active_at(&self, time: f32) -> bool {
        self.start <= time && time < self.end
    }
}

/// Immutable view of the game handed to the engine for one decision tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameStateSnapshot {
    pub board: Board,
    pub active_piece: ActivePiece,
    pub queued_pieces: Vec<u8>,
    pub held_piece: Option<u8>,
    pub agent_stats: AgentStats,
    pub opponent_stats: Option<AgentStats>,
    pub available_actions_catalog: Vec<SpecialAction>,
    pub active_effects: Vec<ActiveEffect>,
    /// Match clock in seconds; effect windows are expressed against it.
    #[serde(default)]
    pub elapsed: f32,
}

impl GameStateSnapshot {
    /// Empty board with a freshly spawned piece and default stats.
    pub fn new(dims: BoardDims, agent_id: impl Into<String>, shape: Shape) -> Self {
        GameStateSnapshot {
            board: Board::new(dims),
            active_piece: ActivePiece::spawn(shape, dims.width),
            queued_pieces: Vec::new(),
            held_piece: None,
            agent_stats: AgentStats::new(agent_id),
            opponent_stats: None,
            available_actions_catalog: Vec::new(),
            active_effects: Vec::new(),
            elapsed: 0.0,
        }
    }

    pub fn with_opponent(mut self, opponent_id: impl Into<String>) -> Self {
        self.opponent_stats = Some(AgentStats::new(opponent_id));
        self
    }

    pub fn dims(&self) -> BoardDims {
        self.board.dims()
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_stats.agent_id
    }

    pub fn special_action(&self, id: &str) -> Option<&SpecialAction> {
        self.available_actions_catalog.iter().find(|a| a.id == id)
    }

    /// Structural checks a strategy needs before it can evaluate the snapshot.
    pub fn validate(&self, expected: Option<BoardDims>) -> Result<(), DecisionError> {
        self.board.validate(expected)?;
        if Shape::from_id(self.active_piece.shape_id).is_none() {
            return Err(DecisionError::InvalidSnapshot(format!(
                "active piece has unknown shape id {}",
                self.active_piece.shape_id
            )));
        }
        if let Some(bad) = self
            .queued_pieces
            .iter()
            .chain(self.held_piece.iter())
            .find(|&&id| Shape::from_id(id).is_none())
        {
            return Err(DecisionError::InvalidSnapshot(format!(
                "queued or held piece has unknown shape id {}",
                bad
            )));
        }
        if !self.agent_stats.resource.is_finite() || self.agent_stats.resource < 0.0 {
            return Err(DecisionError::InvalidSnapshot(format!(
                "agent resource {} is not a finite non-negative value",
                self.agent_stats.resource
            )));
        }
        Ok(())
    }

    /// Drop effects whose window has closed at the current clock.
    pub fn expire_effects(&mut self) {
        let now = self.elapsed;
        self.active_effects.retain(|e| e.end > now);
    }

    /// Effects currently applied to the given agent.
    pub fn effects_on<'a>(&'a self, agent_id: &'a str) -> impl Iterator<Item = &'a ActiveEffect> {
        let now = self.elapsed;
        self.active_effects
            .iter()
            .filter(move |e| e.target_id == agent_id && e.is_active_at(now))
    }
}
