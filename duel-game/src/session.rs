use crate::dice::DiceRoller;
use crate::error::{GameError, Result};
use crate::result::GameResult;
use crate::sequencer::{Advance, Completion, GamePhase, NextStep, RollTicket, Side, TurnSequencer};
use async_trait::async_trait;
use duel_core::{Game, GameGateway, Player, Winner};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Delays that pace a match for a human watching it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacingConfig {
    /// Time a die spends tumbling before it settles.
    pub roll_animation: Duration,
    /// Pause between one side settling and the other side's turn.
    pub turn_delay: Duration,
    /// Pause between the last die settling and the result.
    pub end_delay: Duration,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            roll_animation: Duration::from_millis(600),
            turn_delay: Duration::from_millis(800),
            end_delay: Duration::from_millis(1000),
        }
    }
}

impl PacingConfig {
    pub fn is_instant(&self) -> bool {
        self.roll_animation.is_zero() && self.turn_delay.is_zero() && self.end_delay.is_zero()
    }

    /// No delays at all.
    pub fn instant() -> Self {
        Self {
            roll_animation: Duration::ZERO,
            turn_delay: Duration::ZERO,
            end_delay: Duration::ZERO,
        }
    }

    fn delay_for(&self, step: NextStep) -> Duration {
        match step {
            NextStep::EndGame => self.end_delay,
            NextStep::ComputerRoll | NextStep::PlayerTurn => self.turn_delay,
        }
    }
}

/// The slice of the gateway a session needs.
#[async_trait]
pub trait Scoreboard: Send + Sync {
    async fn create_or_get_player(&self, name: &str) -> duel_core::Result<Player>;

    async fn save_game(
        &self,
        player_id: &str,
        player_rolls: &[u8],
        computer_rolls: &[u8],
        won: bool,
    ) -> duel_core::Result<Game>;
}

#[async_trait]
impl Scoreboard for GameGateway {
    async fn create_or_get_player(&self, name: &str) -> duel_core::Result<Player> {
        GameGateway::create_or_get_player(self, name).await
    }

    async fn save_game(
        &self,
        player_id: &str,
        player_rolls: &[u8],
        computer_rolls: &[u8],
        won: bool,
    ) -> duel_core::Result<Game> {
        GameGateway::save_game(self, player_id, player_rolls, computer_rolls, won).await
    }
}

/// A save running in the background.
pub struct SaveHandle {
    handle: JoinHandle<duel_core::Result<Game>>,
}

impl SaveHandle {
    pub async fn outcome(self) -> Result<Game> {
        match self.handle.await {
            Ok(saved) => Ok(saved?),
            Err(e) => Err(GameError::SaveTask(e.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RollEvent {
    pub side: Side,
    pub face: u8,
    /// 1-based position within the side's roll set.
    pub roll_number: usize,
    /// Side's running total including this roll.
    pub total: u32,
}

pub enum RoundOutcome {
    Continue {
        player: RollEvent,
        computer: RollEvent,
    },
    Finished {
        player: RollEvent,
        computer: RollEvent,
        result: GameResult,
        save: SaveHandle,
    },
}

/// Outcomes over the life of a session; ties are kept apart from wins and losses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionTally {
    pub wins: u32,
    pub losses: u32,
    pub ties: u32,
}

impl SessionTally {
    fn record(&mut self, winner: Winner) {
        match winner {
            Winner::Player => self.wins += 1,
            Winner::Computer => self.losses += 1,
            Winner::Tie => self.ties += 1,
        }
    }

    pub fn played(&self) -> u32 {
        self.wins + self.losses + self.ties
    }
}

/// One player's sitting at the table: consecutive matches against the computer.
pub struct GameSession<S: Scoreboard + 'static> {
    scoreboard: Arc<S>,
    player: Player,
    sequencer: TurnSequencer,
    roller: Box<dyn DiceRoller>,
    pacing: PacingConfig,
    tally: SessionTally,
}

impl<S: Scoreboard + 'static> GameSession<S> {
    /// Resolve the player by name. No match can start if this fails.
    pub async fn start(
        scoreboard: Arc<S>,
        name: &str,
        roller: Box<dyn DiceRoller>,
        pacing: PacingConfig,
    ) -> Result<Self> {
        let player = scoreboard.create_or_get_player(name).await?;
        tracing::info!("Session started for player '{}' ({})", player.name, player.id);

        Ok(Self {
            scoreboard,
            player,
            sequencer: TurnSequencer::new(),
            roller,
            pacing,
            tally: SessionTally::default(),
        })
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn sequencer(&self) -> &TurnSequencer {
        &self.sequencer
    }

    pub fn phase(&self) -> GamePhase {
        self.sequencer.phase()
    }

    pub fn tally(&self) -> SessionTally {
        self.tally
    }

    pub fn roller(&mut self) -> &mut dyn DiceRoller {
        self.roller.as_mut()
    }

    /// Replace the cached player with a fresher snapshot of the same player.
    pub fn refresh_player(&mut self, player: &Player) {
        if player.id == self.player.id {
            self.player = player.clone();
        }
    }

    /// Roll once for the player and once for the computer.
    ///
    /// When the match ends the result is returned straight away; the save
    /// runs on its own task and is reported through the returned handle.
    ///
    /// A round that fails after the player's die is cast, or that was
    /// dropped before it finished, abandons the match so the next call
    /// starts a fresh one.
    pub async fn play_round(&mut self) -> Result<RoundOutcome> {
        if matches!(
            self.sequencer.phase(),
            GamePhase::PlayerRolling | GamePhase::ComputerRolling
        ) {
            tracing::warn!(
                "Abandoning interrupted match for '{}' in {:?}",
                self.player.name,
                self.sequencer.phase()
            );
            self.sequencer.reset();
        }

        let ticket = self.sequencer.request_player_roll()?;
        match self.finish_round(ticket).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                tracing::warn!("Round failed, abandoning match: {}", e);
                self.sequencer.reset();
                Err(e)
            }
        }
    }

    pub fn pacing(&self) -> &PacingConfig {
        &self.pacing
    }

    /// Change the delays for the rounds that follow.
    pub fn set_pacing(&mut self, pacing: PacingConfig) {
        self.pacing = pacing;
    }

    async fn finish_round(&mut self, ticket: RollTicket) -> Result<RoundOutcome> {
        let (player, next) = self.roll_and_settle(ticket).await?;
        tokio::time::sleep(self.pacing.delay_for(next)).await;

        let computer_ticket = match self.sequencer.advance()? {
            Advance::ComputerRolling(ticket) => ticket,
            other => {
                return Err(GameError::Internal(format!(
                    "expected computer turn, got {:?}",
                    other
                )))
            }
        };
        let (computer, next) = self.roll_and_settle(computer_ticket).await?;
        tokio::time::sleep(self.pacing.delay_for(next)).await;

        match self.sequencer.advance()? {
            Advance::PlayerTurn => Ok(RoundOutcome::Continue { player, computer }),
            Advance::Ended(result) => {
                self.tally.record(result.winner);
                let save = self.spawn_save(&result);
                Ok(RoundOutcome::Finished {
                    player,
                    computer,
                    result,
                    save,
                })
            }
            Advance::ComputerRolling(_) => Err(GameError::Internal(
                "computer asked to roll twice in one round".to_string(),
            )),
        }
    }

    /// Start a fresh match with the same player.
    pub fn try_again(&mut self) {
        self.sequencer.reset();
        tracing::info!("New match started for '{}'", self.player.name);
    }

    async fn roll_and_settle(&mut self, ticket: RollTicket) -> Result<(RollEvent, NextStep)> {
        tokio::time::sleep(self.pacing.roll_animation).await;
        let face = self.roller.roll();

        match self.sequencer.complete_roll(ticket, face) {
            Completion::Accepted {
                side,
                face,
                roll_number,
                next,
            } => {
                let total = match side {
                    Side::Player => self.sequencer.player_rolls().total(),
                    Side::Computer => self.sequencer.computer_rolls().total(),
                };
                Ok((
                    RollEvent {
                        side,
                        face,
                        roll_number,
                        total,
                    },
                    next,
                ))
            }
            Completion::Ignored(reason) => Err(GameError::Internal(format!(
                "own roll was rejected: {:?}",
                reason
            ))),
        }
    }

    fn spawn_save(&self, result: &GameResult) -> SaveHandle {
        let scoreboard = Arc::clone(&self.scoreboard);
        let player_id = self.player.id.clone();
        let player_rolls = result.player_rolls.clone();
        let computer_rolls = result.opponent_rolls.clone();
        let won = result.player_wins;

        let handle = tokio::spawn(async move {
            let saved = scoreboard
                .save_game(&player_id, &player_rolls, &computer_rolls, won)
                .await;
            match &saved {
                Ok(game) => tracing::info!("Game {} saved", game.id),
                Err(e) => tracing::error!("Failed to save game for {}: {}", player_id, e),
            }
            saved
        });

        SaveHandle { handle }
    }
}
