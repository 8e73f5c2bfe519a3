use crate::board::{Board, COLS, ROWS};
use crate::engine::{ENGINE_COLOR, OPPONENT_COLOR};

/// Heuristic score of a position from the engine's point of view: the sum
/// over all 69 length-4 windows of the board (26 horizontal, 21 vertical,
/// 12 per diagonal orientation).
pub(crate) fn evaluate(board: &Board) -> f64 {
    let mut score = 0.0;

    for row in 0..ROWS {
        for col in 0..COLS - 3 {
            score += evaluate_window([
                board.cell(row, col),
                board.cell(row, col + 1),
                board.cell(row, col + 2),
                board.cell(row, col + 3),
            ]);
        }
    }

    for col in 0..COLS {
        for row in 0..ROWS - 3 {
            score += evaluate_window([
                board.cell(row, col),
                board.cell(row + 1, col),
                board.cell(row + 2, col),
                board.cell(row + 3, col),
            ]);
        }
    }

    for row in 3..ROWS {
        for col in 0..COLS - 3 {
            score += evaluate_window([
                board.cell(row, col),
                board.cell(row - 1, col + 1),
                board.cell(row - 2, col + 2),
                board.cell(row - 3, col + 3),
            ]);
        }
    }

    for row in 0..ROWS - 3 {
        for col in 0..COLS - 3 {
            score += evaluate_window([
                board.cell(row, col),
                board.cell(row + 1, col + 1),
                board.cell(row + 2, col + 2),
                board.cell(row + 3, col + 3),
            ]);
        }
    }

    score
}

/// Defence is weighted harder than offence build-up: an opponent window one
/// disc away from completion outweighs anything short of the engine's own
/// immediate win.
fn evaluate_window(window: [u8; 4]) -> f64 {
    let engine_disc = ENGINE_COLOR.disc();
    let opponent_disc = OPPONENT_COLOR.disc();

    let mut own = 0;
    let mut theirs = 0;
    let mut empty = 0;
    for cell in window {
        if cell == engine_disc {
            own += 1;
        } else if cell == opponent_disc {
            theirs += 1;
        } else {
            empty += 1;
        }
    }

    let mut score = 0.0;
    if own == 4 {
        score += 100.0;
    } else if own == 3 && empty == 1 {
        score += 10.0;
    } else if own == 2 && empty == 2 {
        score += 5.0;
    }
    if theirs == 3 && empty == 1 {
        score -= 80.0;
    }
    score
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Color;

    #[test]
    fn empty_board_is_neutral() {
        assert_eq!(evaluate(&Board::new()), 0.0);
    }

    #[test]
    fn window_weights() {
        let y = Color::Yellow.disc();
        let r = Color::Red.disc();
        assert_eq!(evaluate_window([y, y, y, y]), 100.0);
        assert_eq!(evaluate_window([y, y, y, 0]), 10.0);
        assert_eq!(evaluate_window([y, y, 0, 0]), 5.0);
        assert_eq!(evaluate_window([r, r, r, 0]), -80.0);
        assert_eq!(evaluate_window([r, r, 0, 0]), 0.0);
        assert_eq!(evaluate_window([y, y, y, r]), 0.0);
    }

    #[test]
    fn open_three_is_penalised_per_window() {
        // Three red discs on the bottom row with both ends open sit inside
        // two one-gap windows.
        let mut board = Board::new();
        for col in 1..4 {
            board.drop_disc(col, Color::Red);
        }
        assert_eq!(evaluate(&board), -160.0);
    }
}
