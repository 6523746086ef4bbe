use crate::scoring::{calculate_score, determine_winner};
use duel_core::Winner;
use serde::{Deserialize, Serialize};

/// Outcome of a finished match. Built once, never changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameResult {
    pub player_rolls: Vec<u8>,
    pub opponent_rolls: Vec<u8>,
    pub player_total: u32,
    pub opponent_total: u32,
    pub winner: Winner,
    pub player_wins: bool,
    /// Elimination only exists in survival play; a standard match never sets it.
    pub is_eliminated: bool,
}

impl GameResult {
    pub fn from_rolls(player_rolls: &[u8], opponent_rolls: &[u8]) -> Self {
        let player_total = calculate_score(player_rolls);
        let opponent_total = calculate_score(opponent_rolls);
        let winner = determine_winner(player_total, opponent_total);

        Self {
            player_rolls: player_rolls.to_vec(),
            opponent_rolls: opponent_rolls.to_vec(),
            player_total,
            opponent_total,
            winner,
            player_wins: winner == Winner::Player,
            is_eliminated: false,
        }
    }

    /// Absolute point gap between the two sides.
    pub fn margin(&self) -> u32 {
        self.player_total.abs_diff(self.opponent_total)
    }

    pub fn is_tie(&self) -> bool {
        self.winner == Winner::Tie
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_win() {
        let result = GameResult::from_rolls(&[3, 5, 2, 6, 4], &[1, 1, 1, 1, 1]);
        assert_eq!(result.player_total, 20);
        assert_eq!(result.opponent_total, 5);
        assert_eq!(result.winner, Winner::Player);
        assert!(result.player_wins);
        assert!(!result.is_eliminated);
        assert_eq!(result.margin(), 15);
    }

    #[test]
    fn test_equal_totals_tie() {
        let result = GameResult::from_rolls(&[3, 3, 3, 3, 3], &[1, 2, 3, 4, 5]);
        assert_eq!(result.player_total, 15);
        assert_eq!(result.opponent_total, 15);
        assert!(result.is_tie());
        assert!(!result.player_wins);
    }
}
