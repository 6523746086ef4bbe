use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Dice rolled by each side in one match.
pub const TOTAL_ROLLS: usize = 5;
pub const DICE_MIN: u8 = 1;
pub const DICE_MAX: u8 = 6;

/// Outcome of a finished match, from the player's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Winner {
    Player,
    Computer,
    Tie,
}

impl Winner {
    /// Strictly greater total wins; equal totals are a draw.
    pub fn from_totals(player_total: u32, computer_total: u32) -> Self {
        match player_total.cmp(&computer_total) {
            Ordering::Greater => Winner::Player,
            Ordering::Less => Winner::Computer,
            Ordering::Equal => Winner::Tie,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Winner::Player => "player",
            Winner::Computer => "computer",
            Winner::Tie => "tie",
        }
    }
}

impl fmt::Display for Winner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Winner {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "player" => Ok(Winner::Player),
            "computer" => Ok(Winner::Computer),
            "tie" => Ok(Winner::Tie),
            other => Err(format!("unknown winner '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    InProgress,
    Completed,
}

impl GameStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameStatus::InProgress => "in_progress",
            GameStatus::Completed => "completed",
        }
    }
}

impl FromStr for GameStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in_progress" => Ok(GameStatus::InProgress),
            "completed" => Ok(GameStatus::Completed),
            other => Err(format!("unknown game status '{}'", other)),
        }
    }
}

/// A named player and their cumulative statistics.
///
/// Owned by the gateway; clients only ever see snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: String,
    pub name: String,
    pub total_games: u32,
    pub total_points: u64,
    pub best_score: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Player {
    /// Leaderboard order: best score descending, then total points
    /// descending, then the longest-standing player first.
    pub fn leaderboard_cmp(a: &Player, b: &Player) -> Ordering {
        b.best_score
            .cmp(&a.best_score)
            .then_with(|| b.total_points.cmp(&a.total_points))
            .then_with(|| a.created_at.cmp(&b.created_at))
    }

    pub fn average_score(&self) -> f64 {
        if self.total_games == 0 {
            0.0
        } else {
            self.total_points as f64 / self.total_games as f64
        }
    }
}

/// Sort players into leaderboard order in place.
pub fn rank_players(players: &mut [Player]) {
    players.sort_by(Player::leaderboard_cmp);
}

/// One persisted match record. Never modified after insertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Game {
    pub id: String,
    pub player_id: String,
    pub player_score: u32,
    pub computer_score: u32,
    pub player_rolls: Vec<u8>,
    pub computer_rolls: Vec<u8>,
    pub status: GameStatus,
    pub winner: Winner,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player: Option<Player>,
}

impl Game {
    pub fn player_won(&self) -> bool {
        self.winner == Winner::Player
    }

    pub fn player_name(&self) -> &str {
        self.player
            .as_ref()
            .map(|p| p.name.as_str())
            .unwrap_or("Unknown")
    }
}

/// Sum of a set of face values.
pub fn roll_total(rolls: &[u8]) -> u32 {
    rolls.iter().map(|&r| u32::from(r)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(name: &str, best: u32, points: u64) -> Player {
        Player {
            id: name.to_string(),
            name: name.to_string(),
            total_games: 1,
            total_points: points,
            best_score: best,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_winner_from_totals() {
        assert_eq!(Winner::from_totals(20, 5), Winner::Player);
        assert_eq!(Winner::from_totals(5, 20), Winner::Computer);
        assert_eq!(Winner::from_totals(15, 15), Winner::Tie);
    }

    #[test]
    fn test_winner_string_forms() {
        for winner in [Winner::Player, Winner::Computer, Winner::Tie] {
            assert_eq!(winner.as_str().parse::<Winner>().unwrap(), winner);
        }
        assert_eq!(serde_json::to_string(&Winner::Tie).unwrap(), "\"tie\"");
        assert!("draw".parse::<Winner>().is_err());
    }

    #[test]
    fn test_rank_players_breaks_ties_on_points() {
        let mut players = vec![
            player("a", 20, 40),
            player("b", 25, 10),
            player("c", 20, 90),
        ];
        rank_players(&mut players);

        let names: Vec<&str> = players.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["b", "c", "a"]);
    }

    #[test]
    fn test_roll_total() {
        assert_eq!(roll_total(&[]), 0);
        assert_eq!(roll_total(&[3, 5, 2, 6, 4]), 20);
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn ranked_players_are_ordered(
                stats in prop::collection::vec((0u32..=30, 0u64..500), 0..40)
            ) {
                let mut players: Vec<Player> = stats
                    .iter()
                    .enumerate()
                    .map(|(i, (best, points))| player(&format!("p{}", i), *best, *points))
                    .collect();
                rank_players(&mut players);

                for pair in players.windows(2) {
                    let (a, b) = (&pair[0], &pair[1]);
                    prop_assert!(a.best_score >= b.best_score);
                    if a.best_score == b.best_score {
                        prop_assert!(a.total_points >= b.total_points);
                    }
                }
            }
        }
    }
}
