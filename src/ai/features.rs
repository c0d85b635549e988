//! Fixed-length feature vectors for the networks and the board metrics
//! shared by heuristic scoring and rewards.
//!
//! Every vector for a given board size has the same length, so one network
//! shape serves all snapshots of that board.

use burn::prelude::*;
use burn::tensor::TensorData;

use crate::error::DecisionError;
use crate::game::{AgentStats, Board, BoardDims, GameStateSnapshot};

/// Active piece descriptor: shape, x, y, rotation.
pub const PIECE_FEATURES: usize = 4;
/// score, level, lines, combo, resource, status.
pub const STATS_FEATURES: usize = 6;
/// Presence flag plus the agent stat block.
pub const OPPONENT_FEATURES: usize = STATS_FEATURES + 1;
/// holes, bumpiness, max height, stability.
pub const DERIVED_FEATURES: usize = 4;

/// Derived board metrics used by evaluation and rewards.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoardMetrics {
    pub holes: u32,
    pub bumpiness: u32,
    pub max_height: u32,
    pub stability: f32,
}

/// Height of each column, measured from the bottom to its topmost occupied cell.
pub fn column_heights(board: &Board) -> Vec<u32> {
    let height = board.height();
    (0..board.width())
        .map(|col| {
            (0..height)
                .find(|&row| board.is_occupied(row, col))
                .map_or(0, |row| (height - row) as u32)
        })
        .collect()
}

/// Empty cells with at least one occupied cell above them, summed over columns.
pub fn holes(board: &Board) -> u32 {
    let mut total = 0;
    for col in 0..board.width() {
        let mut covered = false;
        for row in 0..board.height() {
            if board.is_occupied(row, col) {
                covered = true;
            } else if covered {
                total += 1;
            }
        }
    }
    total
}

/// Sum of absolute height differences between adjacent columns.
pub fn bumpiness(board: &Board) -> u32 {
    column_heights(board)
        .windows(2)
        .map(|pair| pair[0].abs_diff(pair[1]))
        .sum()
}

/// Height of the tallest column, counted from the bottom.
pub fn max_height(board: &Board) -> u32 {
    column_heights(board).into_iter().max().unwrap_or(0)
}

/// 1 / (1 + variance of column heights), further scaled down linearly once
/// the mean column height passes half the board. Always within [0, 1].
pub fn stability(board: &Board) -> f32 {
    let heights = column_heights(board);
    if heights.is_empty() {
        return 1.0;
    }
    let n = heights.len() as f32;
    let mean = heights.iter().map(|&h| h as f32).sum::<f32>() / n;
    let variance = heights
        .iter()
        .map(|&h| {
            let d = h as f32 - mean;
            d * d
        })
        .sum::<f32>()
        / n;

    let mut score = 1.0 / (1.0 + variance);
    let half = board.height() as f32 / 2.0;
    if mean > half {
        score *= ((board.height() as f32 - mean) / half).clamp(0.0, 1.0);
    }
    score.clamp(0.0, 1.0)
}

pub fn board_metrics(board: &Board) -> BoardMetrics {
    let heights = column_heights(board);
    BoardMetrics {
        holes: holes(board),
        bumpiness: heights.windows(2).map(|p| p[0].abs_diff(p[1])).sum(),
        max_height: heights.iter().copied().max().unwrap_or(0),
        stability: stability(board),
    }
}

/// Length of the vector produced by [`extract_features`] for a board size.
pub fn feature_len(dims: BoardDims) -> usize {
    dims.cell_count() + PIECE_FEATURES + STATS_FEATURES + OPPONENT_FEATURES + DERIVED_FEATURES
}

/// Flatten a snapshot into the fixed-length model input:
/// board occupancy, piece descriptor, agent stats, opponent stats, derived metrics.
pub fn extract_features(
    state: &GameStateSnapshot,
    dims: BoardDims,
) -> Result<Vec<f32>, DecisionError> {
    state.validate(Some(dims))?;
    let board = &state.board;
    let mut features = Vec::with_capacity(feature_len(dims));

    features.extend(board.cells().iter().map(|&c| if c != 0 { 1.0 } else { 0.0 }));

    let piece = &state.active_piece;
    features.push(f32::from(piece.shape_id) / 7.0);
    features.push(piece.x as f32 / dims.width as f32);
    features.push(piece.y as f32 / dims.height as f32);
    features.push(f32::from(piece.rotation) / 3.0);

    push_stats(&mut features, &state.agent_stats);
    match &state.opponent_stats {
        Some(opponent) => {
            features.push(1.0);
            push_stats(&mut features, opponent);
        }
        None => features.extend(std::iter::repeat(0.0).take(OPPONENT_FEATURES)),
    }

    let metrics = board_metrics(board);
    let cells = dims.cell_count() as f32;
    features.push(metrics.holes as f32 / cells);
    features.push(metrics.bumpiness as f32 / cells);
    features.push(metrics.max_height as f32 / dims.height as f32);
    features.push(metrics.stability);

    debug_assert_eq!(features.len(), feature_len(dims));
    Ok(features)
}

fn push_stats(features: &mut Vec<f32>, stats: &AgentStats) {
    features.push((stats.score as f32).ln_1p() / 10.0);
    features.push(stats.level as f32 / 20.0);
    features.push(stats.lines_cleared as f32 / 100.0);
    features.push(stats.combo_count as f32 / 10.0);
    features.push(stats.resource / 100.0);
    features.push(stats.status.code());
}

/// Stack feature rows into a `[batch, len]` tensor.
pub fn encode_batch<B: Backend>(rows: &[Vec<f32>], device: &B::Device) -> Tensor<B, 2> {
    let width = rows.first().map_or(0, Vec::len);
    let flat: Vec<f32> = rows.iter().flatten().copied().collect();
    Tensor::<B, 2>::from_data(TensorData::new(flat, [rows.len(), width]), device)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{ActivePiece, Shape};
    use burn::backend::NdArray;
    use proptest::prelude::*;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_empty_board_metrics() {
        let board = Board::new(BoardDims::STANDARD);
        assert_eq!(holes(&board), 0);
        assert_eq!(bumpiness(&board), 0);
        assert_eq!(max_height(&board), 0);
        assert_eq!(stability(&board), 1.0);
    }

    #[test]
    fn test_holes_counts_covered_gaps() {
        let board = Board::from_ascii(&["....", "#.#.", "..#.", "#.##"]).unwrap();
        // Column 0: one gap under the block at row 1. Column 2: none.
        assert_eq!(holes(&board), 1);
    }

    #[test]
    fn test_heights_and_bumpiness() {
        let board = Board::from_ascii(&["....", "..#.", ".##.", "####"]).unwrap();
        assert_eq!(column_heights(&board), vec![1, 2, 3, 1]);
        assert_eq!(bumpiness(&board), 1 + 1 + 2);
        assert_eq!(max_height(&board), 3);
    }

    #[test]
    fn test_single_column_has_no_bumpiness() {
        let board = Board::from_ascii(&[".", "#", "#"]).unwrap();
        assert_eq!(bumpiness(&board), 0);
        assert_eq!(max_height(&board), 2);
    }

    #[test]
    fn test_flat_low_stack_is_stable() {
        let board = Board::from_ascii(&["....", "....", "....", "####"]).unwrap();
        assert_eq!(stability(&board), 1.0);
    }

    #[test]
    fn test_tall_flat_stack_penalised() {
        let board = Board::from_ascii(&["....", "####", "####", "####"]).unwrap();
        let s = stability(&board);
        assert!(s < 1.0 && s > 0.0, "stability {}", s);
    }

    #[test]
    fn test_uneven_stack_less_stable() {
        let flat = Board::from_ascii(&["....", "....", "####", "####"]).unwrap();
        let uneven = Board::from_ascii(&["#...", "#...", "#...", "##.."]).unwrap();
        assert!(stability(&uneven) < stability(&flat));
    }

    #[test]
    fn test_feature_vector_length() {
        let dims = BoardDims::STANDARD;
        let snap = GameStateSnapshot::new(dims, "bot", Shape::T);
        let features = extract_features(&snap, dims).unwrap();
        assert_eq!(features.len(), feature_len(dims));
        assert_eq!(feature_len(dims), 200 + 21);

        let with_opponent = snap.with_opponent("rival");
        let features = extract_features(&with_opponent, dims).unwrap();
        assert_eq!(features.len(), feature_len(dims));
    }

    #[test]
    fn test_feature_occupancy_prefix() {
        let dims = BoardDims::new(4, 4);
        let mut snap = GameStateSnapshot::new(dims, "bot", Shape::O);
        snap.board = Board::from_ascii(&["....", "....", "....", "#..#"]).unwrap();
        snap.active_piece = ActivePiece::new(Shape::O, 1, 0, 0);
        let features = extract_features(&snap, dims).unwrap();
        assert_eq!(features[12], 1.0);
        assert_eq!(features[13], 0.0);
        assert_eq!(features[15], 1.0);
        assert_eq!(features.iter().take(16).sum::<f32>(), 2.0);
    }

    #[test]
    fn test_dimension_mismatch_is_invalid_snapshot() {
        let snap = GameStateSnapshot::new(BoardDims::new(8, 16), "bot", Shape::T);
        let err = extract_features(&snap, BoardDims::STANDARD).unwrap_err();
        assert!(matches!(err, DecisionError::InvalidSnapshot(_)));
    }

    #[test]
    fn test_encode_batch_shape() {
        let device = Default::default();
        let rows = vec![vec![0.0; 5], vec![1.0; 5], vec![0.5; 5]];
        let tensor = encode_batch::<TestBackend>(&rows, &device);
        assert_eq!(tensor.dims(), [3, 5]);
    }

    fn arb_board() -> impl Strategy<Value = Board> {
        (1usize..12, 1usize..24).prop_flat_map(|(w, h)| {
            proptest::collection::vec(0u32..3, w * h).prop_map(move |cells| {
                let rows: Vec<Vec<u32>> = cells.chunks(w).map(|c| c.to_vec()).collect();
                Board::from_rows(&rows).unwrap()
            })
        })
    }

    proptest! {
        #[test]
        fn prop_metrics_are_bounded(board in arb_board()) {
            let m = board_metrics(&board);
            prop_assert!(m.holes as usize <= board.width() * board.height());
            prop_assert!(m.max_height as usize <= board.height());
            prop_assert!((0.0..=1.0).contains(&m.stability));
            prop_assert_eq!(m.holes, holes(&board));
            prop_assert_eq!(m.bumpiness, bumpiness(&board));
        }

        #[test]
        fn prop_holes_never_exceed_empty_cells(board in arb_board()) {
            let empty_cells = board.cells().iter().filter(|&&c| c == 0).count();
            prop_assert!(holes(&board) as usize <= empty_cells);
            let mut cleared = board.clone();
            cleared.clear_full_rows();
            prop_assert!(max_height(&cleared) <= max_height(&board));
        }
    }
}
