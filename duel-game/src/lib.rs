//! Five-dice duel against the computer
//!
//! The player and the computer take turns rolling one die at a time until
//! each holds five. The higher total wins; equal totals are a tie. Finished
//! matches are handed to the gateway in `duel-core` for storage.

pub mod dice;
pub mod error;
pub mod messages;
pub mod result;
pub mod scoring;
pub mod sequencer;
pub mod session;

pub use dice::{DiceRoller, ScriptedRoller, SeededRoller, ThreadRoller};
pub use error::{GameError, Result};
pub use result::GameResult;
pub use sequencer::{
    Advance, Completion, GamePhase, IgnoreReason, NextStep, RollSet, RollTicket, Side,
    TurnSequencer,
};
pub use session::{
    GameSession, PacingConfig, RollEvent, RoundOutcome, SaveHandle, Scoreboard, SessionTally,
};

use duel_core::GameGateway;
use std::sync::Arc;

/// Start a session for `name` with live dice and default pacing.
pub async fn start_session(
    gateway: Arc<GameGateway>,
    name: &str,
) -> Result<GameSession<GameGateway>> {
    GameSession::start(gateway, name, Box::new(ThreadRoller), PacingConfig::default()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use duel_core::GatewayConfig;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_start_session_resolves_player() {
        let temp_dir = tempdir().unwrap();
        let gateway = Arc::new(
            GameGateway::new(GatewayConfig::in_data_dir(temp_dir.path()))
                .await
                .unwrap(),
        );

        let session = start_session(gateway.clone(), "  ada ").await.unwrap();
        assert_eq!(session.player().name, "ada");
        assert_eq!(session.phase(), GamePhase::PlayerTurn);

        let again = start_session(gateway, "ada").await.unwrap();
        assert_eq!(again.player().id, session.player().id);
    }
}
