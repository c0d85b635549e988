//! Agent actions and the fast simulator that previews them.
//!
//! Simulation is a planning approximation: it never mutates the input
//! snapshot and ignores gravity timing, so its results can drift from the
//! authoritative game.

use serde::{Deserialize, Serialize};

use super::{ActiveEffect, ActivePiece, Board, GameStateSnapshot, Shape, TargetScope};
use crate::error::SimulationError;

/// Answer to a recoverable decision failure when a safe action is wanted.
pub const FALLBACK_ACTION: Action = Action::SoftDrop;

/// Everything an agent can ask the game to do on one tick.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    MoveLeft,
    MoveRight,
    RotateCw,
    RotateCcw,
    SoftDrop,
    HardDrop,
    Cast {
        action_id: String,
        target_agent_id: String,
    },
}

impl Action {
    /// The six movement actions in generation order.
    pub const MOVEMENT: [Action; 6] = [
        Action::MoveLeft,
        Action::MoveRight,
        Action::RotateCw,
        Action::RotateCcw,
        Action::SoftDrop,
        Action::HardDrop,
    ];

    pub fn is_cast(&self) -> bool {
        matches!(self, Action::Cast { .. })
    }

    /// Wire code shared with the match coordinator (1..=7).
    pub fn code(&self) -> u8 {
        match self {
            Action::MoveLeft => 1,
            Action::MoveRight => 2,
            Action::RotateCw => 3,
            Action::RotateCcw => 4,
            Action::SoftDrop => 5,
            Action::HardDrop => 6,
            Action::Cast { .. } => 7,
        }
    }
}

/// Result of simulating one action, with the bookkeeping evaluators need.
#[derive(Debug, Clone, PartialEq)]
pub struct Simulated {
    pub state: GameStateSnapshot,
    /// The active piece was stamped into the board.
    pub locked: bool,
    pub lines_cleared: u32,
}

/// Movement actions unconditionally, then one cast per affordable catalog
/// entry. Opponent-scoped casts additionally require an opponent snapshot.
pub fn generate_legal_actions(state: &GameStateSnapshot) -> Vec<Action> {
    let mut actions = Action::MOVEMENT.to_vec();
    let resource = state.agent_stats.resource;
    for special in &state.available_actions_catalog {
        if special.resource_cost > resource {
            continue;
        }
        let target = match special.target_scope {
            TargetScope::Caster => state.agent_stats.agent_id.clone(),
            TargetScope::Opponent => match &state.opponent_stats {
                Some(opponent) => opponent.agent_id.clone(),
                None => continue,
            },
        };
        actions.push(Action::Cast {
            action_id: special.id.clone(),
            target_agent_id: target,
        });
    }
    actions
}

/// Apply `action` to a copy of `state` with the engine's fast approximation.
pub fn simulate(
    state: &GameStateSnapshot,
    action: &Action,
) -> Result<GameStateSnapshot, SimulationError> {
    simulate_detailed(state, action).map(|sim| sim.state)
}

/// Like [`simulate`], also reporting whether the piece locked and how many
/// rows cleared.
pub fn simulate_detailed(
    state: &GameStateSnapshot,
    action: &Action,
) -> Result<Simulated, SimulationError> {
    let mut next = state.clone();
    let mut locked = false;
    let mut lines_cleared = 0;
    let piece = state.active_piece;

    match action {
        Action::MoveLeft => next.active_piece = fitted(&state.board, piece.shifted(-1, 0))?,
        Action::MoveRight => next.active_piece = fitted(&state.board, piece.shifted(1, 0))?,
        Action::RotateCw => next.active_piece = fitted(&state.board, piece.rotated_cw())?,
        Action::RotateCcw => next.active_piece = fitted(&state.board, piece.rotated_ccw())?,
        Action::SoftDrop => {
            fitted(&state.board, piece)?;
            next.active_piece = fitted(&state.board, piece.shifted(0, 1))
                .map_err(|_| SimulationError::PieceResting)?;
        }
        Action::HardDrop => {
            let (board, cleared) = settle(&state.board, &piece)?;
            next.board = board;
            lines_cleared = cleared;
            locked = true;
            credit_lines(&mut next, cleared);
            promote_next_piece(&mut next, piece.shape()?);
        }
        Action::Cast {
            action_id,
            target_agent_id,
        } => cast(&mut next, action_id, target_agent_id)?,
    }

    Ok(Simulated {
        state: next,
        locked,
        lines_cleared,
    })
}

/// Drop `piece` as far as it goes, stamp it and clear full rows. Returns the
/// settled board and the number of rows cleared. The input board is untouched.
pub fn settle(board: &Board, piece: &ActivePiece) -> Result<(Board, u32), SimulationError> {
    let landed = landing_pose(board, piece)?;
    let mut settled = board.clone();
    let id = u32::from(landed.shape_id);
    for (row, col) in landed.cells()? {
        settled.set(row as usize, col as usize, id);
    }
    let cleared = settled.clear_full_rows();
    Ok((settled, cleared))
}

/// Lowest pose reachable by moving straight down from `piece`.
pub fn landing_pose(board: &Board, piece: &ActivePiece) -> Result<ActivePiece, SimulationError> {
    let mut current = fitted(board, *piece)?;
    while let Ok(lower) = fitted(board, current.shifted(0, 1)) {
        current = lower;
    }
    Ok(current)
}

/// Check that every cell of `piece` is on the board and unoccupied.
pub fn fitted(board: &Board, piece: ActivePiece) -> Result<ActivePiece, SimulationError> {
    for (row, col) in piece.cells()? {
        if !board.contains(row, col) {
            return Err(SimulationError::OutOfBounds {
                row,
                col,
                width: board.width(),
                height: board.height(),
            });
        }
        if board.is_occupied(row as usize, col as usize) {
            return Err(SimulationError::Collision { row, col });
        }
    }
    Ok(piece)
}

/// Base points for clearing 1..=4 rows at once; scaled by level.
pub fn line_clear_points(lines: u32) -> u64 {
    match lines {
        0 => 0,
        1 => 100,
        2 => 300,
        3 => 500,
        _ => 800,
    }
}

fn credit_lines(state: &mut GameStateSnapshot, cleared: u32) {
    let stats = &mut state.agent_stats;
    if cleared == 0 {
        stats.combo_count = 0;
        return;
    }
    stats.lines_cleared += cleared;
    stats.combo_count += 1;
    stats.score += line_clear_points(cleared) * u64::from(stats.level.max(1));
}

fn promote_next_piece(state: &mut GameStateSnapshot, current: Shape) {
    let shape = if state.queued_pieces.is_empty() {
        current
    } else {
        let id = state.queued_pieces.remove(0);
        Shape::from_id(id).unwrap_or(current)
    };
    state.active_piece = ActivePiece::spawn(shape, state.board.width());
}

fn cast(
    state: &mut GameStateSnapshot,
    action_id: &str,
    target: &str,
) -> Result<(), SimulationError> {
    let special = state
        .special_action(action_id)
        .cloned()
        .ok_or_else(|| SimulationError::UnknownSpecialAction(action_id.to_string()))?;

    let available = state.agent_stats.resource;
    if special.resource_cost > available {
        return Err(SimulationError::InsufficientResource {
            id: special.id,
            cost: special.resource_cost,
            available,
        });
    }

    let expected_target = match special.target_scope {
        TargetScope::Caster => state.agent_stats.agent_id.as_str(),
        TargetScope::Opponent => match &state.opponent_stats {
            Some(opponent) => opponent.agent_id.as_str(),
            None => return Err(SimulationError::NoOpponent(special.id)),
        },
    };
    if expected_target != target {
        return Err(SimulationError::InvalidTarget {
            id: special.id,
            target: target.to_string(),
        });
    }

    state.agent_stats.resource = available - special.resource_cost;
    state.active_effects.push(ActiveEffect {
        action_id: special.id,
        caster_id: state.agent_stats.agent_id.clone(),
        target_id: target.to_string(),
        start: state.elapsed,
        end: state.elapsed + special.duration,
    });
    Ok(())
}
