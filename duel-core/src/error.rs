use thiserror::Error;

pub type Result<T> = std::result::Result<T, DuelError>;

#[derive(Error, Debug)]
pub enum DuelError {
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Player not found: {id}")]
    PlayerNotFound { id: String },

    #[error("Game not found: {id}")]
    GameNotFound { id: String },

    #[error("Invalid player name: {0}")]
    InvalidName(String),

    #[error("Invalid roll set: {0}")]
    InvalidRolls(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DuelError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn invalid_rolls(msg: impl Into<String>) -> Self {
        Self::InvalidRolls(msg.into())
    }

    /// Setup errors are fatal at startup; everything else is reported and
    /// the user may retry the action.
    pub fn is_setup_error(&self) -> bool {
        matches!(self, Self::Config(_) | Self::Io(_))
    }
}
