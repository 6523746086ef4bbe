//! Turn sequencing for one match.
//!
//! The player and the computer alternate single rolls until both hold
//! [`TOTAL_ROLLS`] dice. Every roll is issued as a [`RollTicket`] stamped with
//! a fresh generation; a completion is only accepted for the ticket that is
//! currently outstanding, so repeated or late completions are ignored instead
//! of being appended twice.
//!
//! Pacing is not handled here. After a roll settles the sequencer records the
//! [`NextStep`] and waits for [`TurnSequencer::advance`], which the caller
//! invokes once its delay has elapsed.

use crate::error::{GameError, Result};
use crate::result::GameResult;
use duel_core::TOTAL_ROLLS;
use serde::{Deserialize, Serialize};

/// Face values accumulated by one side, capped at [`TOTAL_ROLLS`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RollSet {
    faces: Vec<u8>,
}

impl RollSet {
    pub fn new() -> Self {
        Self {
            faces: Vec::with_capacity(TOTAL_ROLLS),
        }
    }

    pub fn push(&mut self, face: u8) -> Result<()> {
        if self.is_full() {
            return Err(GameError::RollSetFull);
        }
        self.faces.push(face);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.faces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.faces.len() >= TOTAL_ROLLS
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.faces
    }

    pub fn total(&self) -> u32 {
        crate::scoring::calculate_score(&self.faces)
    }

    fn clear(&mut self) {
        self.faces.clear();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GamePhase {
    PlayerTurn,
    PlayerRolling,
    ComputerRolling,
    GameEnded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Player,
    Computer,
}

/// Correlates a roll request with its completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RollTicket {
    side: Side,
    phase: GamePhase,
    generation: u64,
}

impl RollTicket {
    pub fn side(&self) -> Side {
        self.side
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// What happens once the settle delay has passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextStep {
    ComputerRoll,
    PlayerTurn,
    EndGame,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    WrongPhase {
        expected: GamePhase,
        actual: GamePhase,
    },
    /// Not the outstanding ticket: a duplicate, or from a reset match.
    Stale,
    RollSetFull,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Accepted {
        side: Side,
        face: u8,
        /// 1-based position of this roll within the side's set.
        roll_number: usize,
        next: NextStep,
    },
    Ignored(IgnoreReason),
}

impl Completion {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Completion::Accepted { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    ComputerRolling(RollTicket),
    PlayerTurn,
    Ended(GameResult),
}

#[derive(Debug)]
pub struct TurnSequencer {
    phase: GamePhase,
    player_rolls: RollSet,
    computer_rolls: RollSet,
    generation: u64,
    outstanding: Option<RollTicket>,
    settled: Option<NextStep>,
    result: Option<GameResult>,
}

impl Default for TurnSequencer {
    fn default() -> Self {
        Self::new()
    }
}

impl TurnSequencer {
    pub fn new() -> Self {
        Self {
            phase: GamePhase::PlayerTurn,
            player_rolls: RollSet::new(),
            computer_rolls: RollSet::new(),
            generation: 0,
            outstanding: None,
            settled: None,
            result: None,
        }
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn player_rolls(&self) -> &RollSet {
        &self.player_rolls
    }

    pub fn computer_rolls(&self) -> &RollSet {
        &self.computer_rolls
    }

    pub fn result(&self) -> Option<&GameResult> {
        self.result.as_ref()
    }

    pub fn outstanding(&self) -> Option<RollTicket> {
        self.outstanding
    }

    pub fn pending_step(&self) -> Option<NextStep> {
        self.settled
    }

    pub fn can_roll(&self) -> bool {
        self.phase == GamePhase::PlayerTurn
            && self.outstanding.is_none()
            && self.settled.is_none()
            && !self.player_rolls.is_full()
    }

    /// Start a player roll. Only valid on the player's turn with nothing in flight.
    pub fn request_player_roll(&mut self) -> Result<RollTicket> {
        if self.phase != GamePhase::PlayerTurn {
            return Err(GameError::InvalidPhase {
                expected: GamePhase::PlayerTurn,
                actual: self.phase,
            });
        }

        if self.outstanding.is_some() || self.settled.is_some() {
            return Err(GameError::RollInFlight);
        }

        if self.player_rolls.is_full() {
            return Err(GameError::RollSetFull);
        }

        self.phase = GamePhase::PlayerRolling;
        let ticket = self.issue(Side::Player);

        tracing::debug!(
            "Player roll {} requested (generation {})",
            self.player_rolls.len() + 1,
            ticket.generation
        );
        Ok(ticket)
    }

    /// Record the settled face for `ticket`.
    ///
    /// Completions that do not match the current phase and the outstanding
    /// ticket leave the match untouched.
    pub fn complete_roll(&mut self, ticket: RollTicket, face: u8) -> Completion {
        if ticket.phase != self.phase {
            tracing::debug!(
                "Ignoring {:?} completion during {:?}",
                ticket.phase,
                self.phase
            );
            return Completion::Ignored(IgnoreReason::WrongPhase {
                expected: ticket.phase,
                actual: self.phase,
            });
        }

        if self.outstanding != Some(ticket) {
            tracing::debug!(
                "Ignoring stale {:?} completion (generation {})",
                ticket.side,
                ticket.generation
            );
            return Completion::Ignored(IgnoreReason::Stale);
        }

        let rolls = match ticket.side {
            Side::Player => &mut self.player_rolls,
            Side::Computer => &mut self.computer_rolls,
        };
        if rolls.push(face).is_err() {
            return Completion::Ignored(IgnoreReason::RollSetFull);
        }
        let roll_number = rolls.len();
        self.outstanding = None;

        let next = match ticket.side {
            Side::Player => NextStep::ComputerRoll,
            Side::Computer if self.player_rolls.is_full() && self.computer_rolls.is_full() => {
                NextStep::EndGame
            }
            Side::Computer => NextStep::PlayerTurn,
        };
        self.settled = Some(next);

        tracing::debug!(
            "{:?} roll {} settled on {}, next: {:?}",
            ticket.side,
            roll_number,
            face,
            next
        );

        Completion::Accepted {
            side: ticket.side,
            face,
            roll_number,
            next,
        }
    }

    /// Apply the step recorded by the last accepted completion.
    pub fn advance(&mut self) -> Result<Advance> {
        let next = self.settled.take().ok_or(GameError::NothingToAdvance)?;

        match next {
            NextStep::ComputerRoll => {
                self.phase = GamePhase::ComputerRolling;
                Ok(Advance::ComputerRolling(self.issue(Side::Computer)))
            }
            NextStep::PlayerTurn => {
                self.phase = GamePhase::PlayerTurn;
                Ok(Advance::PlayerTurn)
            }
            NextStep::EndGame => {
                let result = GameResult::from_rolls(
                    self.player_rolls.as_slice(),
                    self.computer_rolls.as_slice(),
                );
                self.result = Some(result.clone());
                self.phase = GamePhase::GameEnded;

                tracing::info!(
                    "Match ended {} vs {}: {}",
                    result.player_total,
                    result.opponent_total,
                    result.winner
                );
                Ok(Advance::Ended(result))
            }
        }
    }

    /// Clear both roll sets and any roll in flight, ready for a new match.
    pub fn reset(&mut self) {
        self.phase = GamePhase::PlayerTurn;
        self.player_rolls.clear();
        self.computer_rolls.clear();
        self.outstanding = None;
        self.settled = None;
        self.result = None;
    }

    fn issue(&mut self, side: Side) -> RollTicket {
        self.generation += 1;
        let ticket = RollTicket {
            side,
            phase: self.phase,
            generation: self.generation,
        };
        self.outstanding = Some(ticket);
        ticket
    }
}
