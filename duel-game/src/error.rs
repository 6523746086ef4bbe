use crate::sequencer::GamePhase;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, GameError>;

#[derive(Error, Debug)]
pub enum GameError {
    #[error("Duel core error: {0}")]
    DuelCore(#[from] duel_core::DuelError),

    #[error("Invalid game state: expected {expected:?}, was {actual:?}")]
    InvalidPhase {
        expected: GamePhase,
        actual: GamePhase,
    },

    #[error("A roll is already in flight")]
    RollInFlight,

    #[error("Roll set is full")]
    RollSetFull,

    #[error("No roll has settled yet")]
    NothingToAdvance,

    #[error("Save task failed: {0}")]
    SaveTask(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
