use crate::board::{Board, Color, COLS};
use crate::engine::eval::evaluate;
use crate::engine::{CENTER_BIAS, CENTER_COL, ENGINE_COLOR, MAX_DEPTH, OPPONENT_COLOR, WIN_SCORE};

/// Bounded-depth minimax with alpha-beta pruning. Deterministic: the same
/// position always yields the same column.
#[derive(Debug, Clone, Copy, Default)]
pub struct Engine;

impl Engine {
    pub const fn new() -> Self {
        Self
    }

    /// Picks a column for the engine (yellow) to play.
    ///
    /// Wins on the spot when possible, otherwise blocks an opponent win on
    /// the spot, otherwise searches. Ties lean toward the center column.
    pub fn best_move(&self, board: &Board) -> usize {
        if let Some(col) = find_winning_move(board, ENGINE_COLOR) {
            return col;
        }
        if let Some(col) = find_winning_move(board, OPPONENT_COLOR) {
            return col;
        }

        let mut best_score = f64::NEG_INFINITY;
        let mut best_col = None;

        for col in 0..COLS {
            if !board.is_valid_move(col) {
                continue;
            }
            let mut child = *board;
            child.drop_disc(col, ENGINE_COLOR);
            let mut score = minimax(
                &child,
                MAX_DEPTH - 1,
                f64::NEG_INFINITY,
                f64::INFINITY,
                false,
            );
            if col == CENTER_COL {
                score += CENTER_BIAS;
            }
            if score > best_score {
                best_score = score;
                best_col = Some(col);
            }
        }

        best_col.unwrap_or_else(|| {
            if board.is_valid_move(CENTER_COL) {
                CENTER_COL
            } else {
                (0..COLS)
                    .find(|&col| board.is_valid_move(col))
                    .unwrap_or(CENTER_COL)
            }
        })
    }
}

fn find_winning_move(board: &Board, color: Color) -> Option<usize> {
    (0..COLS).find(|&col| {
        let mut child = *board;
        match child.drop_disc(col, color) {
            Some(row) => child.check_win(row, col),
            None => false,
        }
    })
}

fn minimax(board: &Board, depth: u32, mut alpha: f64, mut beta: f64, maximizing: bool) -> f64 {
    if depth == 0 || board.is_full() {
        return evaluate(board);
    }

    if maximizing {
        let mut max_eval = f64::NEG_INFINITY;
        for col in 0..COLS {
            if !board.is_valid_move(col) {
                continue;
            }
            let mut child = *board;
            let Some(row) = child.drop_disc(col, ENGINE_COLOR) else {
                continue;
            };
            if child.check_win(row, col) {
                // Deeper remaining depth means fewer moves played: prefer
                // the quicker win.
                return WIN_SCORE + f64::from(depth);
            }
            let eval = minimax(&child, depth - 1, alpha, beta, false);
            max_eval = max_eval.max(eval);
            alpha = alpha.max(eval);
            if beta <= alpha {
                break;
            }
        }
        max_eval
    } else {
        let mut min_eval = f64::INFINITY;
        for col in 0..COLS {
            if !board.is_valid_move(col) {
                continue;
            }
            let mut child = *board;
            let Some(row) = child.drop_disc(col, OPPONENT_COLOR) else {
                continue;
            };
            if child.check_win(row, col) {
                return -WIN_SCORE - f64::from(depth);
            }
            let eval = minimax(&child, depth - 1, alpha, beta, true);
            min_eval = min_eval.min(eval);
            beta = beta.min(eval);
            if beta <= alpha {
                break;
            }
        }
        min_eval
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn takes_an_immediate_win() {
        let mut board = Board::new();
        for _ in 0..3 {
            board.drop_disc(5, Color::Yellow);
        }
        for _ in 0..3 {
            board.drop_disc(0, Color::Red);
        }
        // Column 5 completes yellow's vertical line; the red threat on
        // column 0 must not distract.
        assert_eq!(Engine::new().best_move(&board), 5);
    }

    #[test]
    fn blocks_an_immediate_horizontal_threat() {
        let mut board = Board::new();
        board.drop_disc(0, Color::Red);
        board.drop_disc(0, Color::Yellow);
        board.drop_disc(1, Color::Red);
        board.drop_disc(1, Color::Yellow);
        board.drop_disc(2, Color::Red);
        // Red threatens 0,1,2,3 along the bottom row.
        assert_eq!(Engine::new().best_move(&board), 3);
    }

    #[test]
    fn blocks_an_immediate_vertical_threat() {
        let mut board = Board::new();
        for _ in 0..3 {
            board.drop_disc(6, Color::Red);
        }
        board.drop_disc(0, Color::Yellow);
        assert_eq!(Engine::new().best_move(&board), 6);
    }

    #[test]
    fn opens_in_the_center() {
        assert_eq!(Engine::new().best_move(&Board::new()), CENTER_COL);
    }

    #[test]
    fn plays_the_only_legal_column() {
        // Fill columns 0..=5 with a win-free checker pattern.
        let mut board = Board::new();
        for col in 0..COLS - 1 {
            let start_red = matches!(col, 0 | 1 | 4 | 5);
            for i in 0..6 {
                let color = if (i % 2 == 0) == start_red {
                    Color::Red
                } else {
                    Color::Yellow
                };
                board.drop_disc(col, color);
            }
        }
        assert_eq!(Engine::new().best_move(&board), 6);
    }
}
