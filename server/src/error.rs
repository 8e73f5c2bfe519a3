use thiserror::Error;

use crate::store::StoreError;

/// Everything the session layer can reject. Each variant maps to a stable
/// code carried in the `error` protocol message; none of these close the
/// socket.
#[derive(Debug, Error)]
pub enum GameError {
    #[error("game not found")]
    GameNotFound,
    #[error("game is not active")]
    GameNotActive,
    #[error("not your turn")]
    NotYourTurn,
    #[error("invalid move: column is full")]
    InvalidMove,
    #[error("you are not in this game")]
    NotInGame,
    #[error("player already in queue")]
    AlreadyInQueue,
    #[error("player already in a game")]
    AlreadyInGame,
    #[error("username must be between 3 and 50 characters")]
    InvalidUsername,
    #[error("player 2 is not a bot")]
    NotABotGame,
    #[error("no game to reconnect to")]
    NothingToRestore,
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl GameError {
    pub const fn code(&self) -> &'static str {
        match self {
            Self::GameNotFound => "GAME_NOT_FOUND",
            Self::GameNotActive => "GAME_NOT_ACTIVE",
            Self::NotYourTurn => "NOT_YOUR_TURN",
            Self::InvalidMove => "INVALID_MOVE",
            Self::NotInGame => "NOT_IN_GAME",
            Self::AlreadyInQueue => "ALREADY_IN_QUEUE",
            Self::AlreadyInGame => "ALREADY_IN_GAME",
            Self::InvalidUsername => "INVALID_USERNAME",
            Self::NotABotGame => "NOT_A_BOT_GAME",
            Self::NothingToRestore => "NO_GAME_TO_RESTORE",
            Self::Store(_) => "STORE_ERROR",
        }
    }
}
