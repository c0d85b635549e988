//! Game-state snapshot model and the engine's fast action simulator. The
//! authoritative physics lives outside this crate; everything here is a
//! planning approximation over immutable snapshots.

mod action;
mod board;
mod piece;
mod state;

pub use action::{
    fitted, generate_legal_actions, landing_pose, line_clear_points, settle, simulate,
    simulate_detailed, Action, Simulated, FALLBACK_ACTION,
};
pub use board::{Board, BoardDims, STANDARD_HEIGHT, STANDARD_WIDTH};
pub use piece::{ActivePiece, Shape};
pub use state::{
    ActiveEffect, AgentStats, AgentStatus, GameStateSnapshot, SpecialAction, TargetScope,
};
