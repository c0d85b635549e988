use crate::ai::features::board_metrics;
use crate::game::{AgentStatus, GameStateSnapshot};

pub const SCORE_SCALE: f32 = 0.01;
pub const HEIGHT_PENALTY: f32 = 0.1;
pub const HOLE_PENALTY: f32 = 0.5;
pub const BUMPINESS_PENALTY: f32 = 0.2;
pub const ELIMINATION_PENALTY: f32 = -10.0;
pub const VICTORY_BONUS: f32 = 20.0;

/// Reward for clearing `lines` rows in one transition.
pub fn line_clear_reward(lines: u32) -> f32 {
    match lines {
        0 => 0.0,
        1 => 1.0,
        2 => 3.0,
        3 => 5.0,
        _ => 8.0,
    }
}

/// Individual reward terms of one transition.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RewardBreakdown {
    pub lines: f32,
    pub score: f32,
    pub height: f32,
    pub holes: f32,
    pub bumpiness: f32,
    pub terminal: f32,
}

impl RewardBreakdown {
    pub fn total(&self) -> f32 {
        self.lines + self.score + self.height + self.holes + self.bumpiness + self.terminal
    }
}

/// Score every reward term for the transition `state -> next`.
///
/// Only increases in height, holes and bumpiness are penalised; decreases earn
/// nothing. Terminal terms fire only when the status changes on this step.
pub fn reward_breakdown(state: &GameStateSnapshot, next: &GameStateSnapshot) -> RewardBreakdown {
    let before = board_metrics(&state.board);
    let after = board_metrics(&next.board);
    let lines = next
        .agent_stats
        .lines_cleared
        .saturating_sub(state.agent_stats.lines_cleared);
    let score_gain = next.agent_stats.score.saturating_sub(state.agent_stats.score);

    let increase = |a: u32, b: u32| b.saturating_sub(a) as f32;

    let terminal = if state.agent_stats.status == next.agent_stats.status {
        0.0
    } else {
        match next.agent_stats.status {
            AgentStatus::Eliminated => ELIMINATION_PENALTY,
            AgentStatus::Victorious => VICTORY_BONUS,
            AgentStatus::Playing => 0.0,
        }
    };

    RewardBreakdown {
        lines: line_clear_reward(lines),
        score: score_gain as f32 * SCORE_SCALE,
        height: -increase(before.max_height, after.max_height) * HEIGHT_PENALTY,
        holes: -increase(before.holes, after.holes) * HOLE_PENALTY,
        bumpiness: -increase(before.bumpiness, after.bumpiness) * BUMPINESS_PENALTY,
        terminal,
    }
}

/// Deterministic scalar reward for `state -> next`.
pub fn compute_reward(state: &GameStateSnapshot, next: &GameStateSnapshot) -> f32 {
    reward_breakdown(state, next).total()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{Board, BoardDims, Shape};

    fn base() -> GameStateSnapshot {
        GameStateSnapshot::new(BoardDims::new(4, 6), "bot", Shape::O)
    }

    #[test]
    fn test_no_change_no_reward() {
        let s = base();
        assert_eq!(compute_reward(&s, &s.clone()), 0.0);
    }

    #[test]
    fn test_line_rewards_are_superlinear() {
        let rewards: Vec<f32> = (1..=5).map(line_clear_reward).collect();
        assert_eq!(rewards, vec![1.0, 3.0, 5.0, 8.0, 8.0]);
    }

    #[test]
    fn test_two_lines_and_score() {
        let s = base();
        let mut next = s.clone();
        next.agent_stats.lines_cleared = 2;
        next.agent_stats.score = 300;
        let r = compute_reward(&s, &next);
        assert!((r - (3.0 + 0.01 * 300.0)).abs() < 1e-5, "reward {}", r);
    }

    #[test]
    fn test_only_increases_are_penalised() {
        let mut s = base();
        s.board = Board::from_ascii(&["....", "....", "....", "#...", "....", "##.#"]).unwrap();
        let mut next = s.clone();
        next.board = Board::new(BoardDims::new(4, 6));
        assert_eq!(compute_reward(&s, &next), 0.0);

        let r = compute_reward(&next, &s);
        let b = reward_breakdown(&next, &s);
        assert!(r < 0.0);
        assert!((b.height + 0.3).abs() < 1e-6);
        assert_eq!(b.holes, -0.5);
    }

    #[test]
    fn test_elimination_penalty() {
        let s = base();
        let mut next = s.clone();
        next.agent_stats.status = AgentStatus::Eliminated;
        let r = compute_reward(&s, &next);
        assert!(r <= -10.0);

        // Already eliminated: nothing new happened.
        assert_eq!(compute_reward(&next, &next.clone()), 0.0);
    }

    #[test]
    fn test_victory_bonus() {
        let s = base();
        let mut next = s.clone();
        next.agent_stats.status = AgentStatus::Victorious;
        next.agent_stats.lines_cleared = 1;
        assert_eq!(compute_reward(&s, &next), 21.0);
    }
}
