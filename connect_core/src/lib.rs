pub mod board;
pub mod engine;

pub use board::{Board, Color, COLS, ROWS};
pub use engine::Engine;
