use serde::{Deserialize, Serialize};

pub const ROWS: usize = 6;
pub const COLS: usize = 7;

const EMPTY: u8 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Red,
    Yellow,
}

impl Color {
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Red => Self::Yellow,
            Self::Yellow => Self::Red,
        }
    }

    /// Cell value used on the wire and in the grid: red = 1, yellow = 2.
    pub const fn disc(self) -> u8 {
        match self {
            Self::Red => 1,
            Self::Yellow => 2,
        }
    }
}

/// 6x7 grid. Row 0 is the top, row 5 the bottom; a dropped disc settles in
/// the highest-index empty row of its column. Serializes as the plain
/// integer matrix the protocol expects (0 empty, 1 red, 2 yellow).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Board {
    cells: [[u8; COLS]; ROWS],
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    pub const fn new() -> Self {
        Self {
            cells: [[EMPTY; COLS]; ROWS],
        }
    }

    pub const fn cell(&self, row: usize, col: usize) -> u8 {
        self.cells[row][col]
    }

    /// A move is legal while the column exists and its top cell is empty.
    pub fn is_valid_move(&self, col: usize) -> bool {
        col < COLS && self.cells[0][col] == EMPTY
    }

    /// Drops a disc into `col`, returning the landing row, or `None` when
    /// the column is full.
    pub fn drop_disc(&mut self, col: usize, color: Color) -> Option<usize> {
        if col >= COLS {
            return None;
        }
        for row in (0..ROWS).rev() {
            if self.cells[row][col] == EMPTY {
                self.cells[row][col] = color.disc();
                return Some(row);
            }
        }
        None
    }

    /// Win detection scans only the four lines through the last-placed cell,
    /// summing both directions plus the origin.
    pub fn check_win(&self, row: usize, col: usize) -> bool {
        let player = self.cells[row][col];
        if player == EMPTY {
            return false;
        }

        const DIRECTIONS: [(i32, i32); 4] = [(0, 1), (1, 0), (1, 1), (-1, 1)];
        DIRECTIONS
            .iter()
            .any(|&(d_row, d_col)| self.count_line(row, col, d_row, d_col, player) >= 4)
    }

    fn count_line(&self, row: usize, col: usize, d_row: i32, d_col: i32, player: u8) -> u32 {
        let mut count = 1;
        for sign in [1, -1] {
            let mut r = row as i32 + sign * d_row;
            let mut c = col as i32 + sign * d_col;
            while (0..ROWS as i32).contains(&r)
                && (0..COLS as i32).contains(&c)
                && self.cells[r as usize][c as usize] == player
            {
                count += 1;
                r += sign * d_row;
                c += sign * d_col;
            }
        }
        count
    }

    pub fn is_full(&self) -> bool {
        self.cells[0].iter().all(|&cell| cell != EMPTY)
    }

    pub fn disc_count(&self) -> u32 {
        self.cells
            .iter()
            .flatten()
            .filter(|&&cell| cell != EMPTY)
            .count() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drop_settles_bottom_up() {
        let mut board = Board::new();
        assert_eq!(board.drop_disc(3, Color::Red), Some(5));
        assert_eq!(board.drop_disc(3, Color::Yellow), Some(4));
        assert_eq!(board.drop_disc(3, Color::Red), Some(3));
        assert_eq!(board.cell(5, 3), 1);
        assert_eq!(board.cell(4, 3), 2);
        assert_eq!(board.cell(3, 3), 1);
        assert_eq!(board.cell(2, 3), 0);
    }

    #[test]
    fn last_column_is_legal_out_of_range_is_not() {
        let mut board = Board::new();
        assert!(board.is_valid_move(6));
        assert_eq!(board.drop_disc(6, Color::Red), Some(5));
        assert!(!board.is_valid_move(7));
        assert!(!board.is_valid_move(usize::MAX));
        assert_eq!(board.drop_disc(7, Color::Red), None);
    }

    #[test]
    fn full_column_rejects_drop() {
        let mut board = Board::new();
        for i in 0..ROWS {
            let color = if i % 2 == 0 { Color::Red } else { Color::Yellow };
            assert!(board.drop_disc(0, color).is_some());
        }
        assert!(!board.is_valid_move(0));
        assert_eq!(board.drop_disc(0, Color::Red), None);
    }

    #[test]
    fn horizontal_win() {
        let mut board = Board::new();
        for col in 0..3 {
            board.drop_disc(col, Color::Red);
            assert!(!board.check_win(5, col));
        }
        let row = board.drop_disc(3, Color::Red).unwrap();
        assert!(board.check_win(row, 3));
    }

    #[test]
    fn vertical_win() {
        let mut board = Board::new();
        for _ in 0..3 {
            board.drop_disc(2, Color::Yellow);
        }
        let row = board.drop_disc(2, Color::Yellow).unwrap();
        assert!(board.check_win(row, 2));
    }

    #[test]
    fn diagonal_wins() {
        // Rising diagonal for red, anchored at columns 0..=3.
        let mut board = Board::new();
        for col in 1..4 {
            for _ in 0..col {
                board.drop_disc(col, Color::Yellow);
            }
        }
        for col in 0..3 {
            let row = board.drop_disc(col, Color::Red).unwrap();
            assert!(!board.check_win(row, col));
        }
        let row = board.drop_disc(3, Color::Red).unwrap();
        assert!(board.check_win(row, 3));

        // Falling diagonal for yellow.
        let mut board = Board::new();
        for col in 0..3 {
            for _ in 0..(3 - col) {
                board.drop_disc(col, Color::Red);
            }
        }
        for col in 1..4 {
            let row = board.drop_disc(col, Color::Yellow).unwrap();
            assert!(!board.check_win(row, col));
        }
        let row = board.drop_disc(0, Color::Yellow).unwrap();
        assert!(board.check_win(row, 0));
    }

    #[test]
    fn win_requires_the_placed_disc() {
        // Three in a row with a gap: neither end cell completes a line of
        // four until the gap is filled.
        let mut board = Board::new();
        board.drop_disc(0, Color::Red);
        board.drop_disc(1, Color::Red);
        board.drop_disc(3, Color::Red);
        assert!(!board.check_win(5, 0));
        assert!(!board.check_win(5, 1));
        assert!(!board.check_win(5, 3));
        let row = board.drop_disc(2, Color::Red).unwrap();
        assert!(board.check_win(row, 2));
    }

    #[test]
    fn board_full_after_forty_two_discs() {
        let mut board = Board::new();
        for (i, col) in draw_sequence().into_iter().enumerate() {
            assert!(!board.is_full());
            let color = if i % 2 == 0 { Color::Red } else { Color::Yellow };
            let row = board.drop_disc(col, color).unwrap();
            assert!(!board.check_win(row, col), "unexpected win at move {}", i + 1);
        }
        assert!(board.is_full());
        assert_eq!(board.disc_count(), 42);
    }

    // A 42-move alternating sequence (red moves first) that fills the board
    // without any four-in-a-row.
    fn draw_sequence() -> Vec<usize> {
        let mut seq = Vec::with_capacity(42);
        for pair in [(0, 1), (2, 3), (4, 5)] {
            let (a, b) = pair;
            seq.extend_from_slice(&[a, b, a, b, b, a, b, a, a, b, a, b]);
        }
        seq.extend_from_slice(&[6; 6]);
        seq
    }
}
