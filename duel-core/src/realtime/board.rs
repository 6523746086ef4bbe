use crate::realtime::FeedEvent;
use crate::types::{rank_players, Game, Player};

/// Client-side view of the leaderboard and recent games, kept current by
/// applying feed events instead of polling the gateway.
#[derive(Debug, Clone, Default)]
pub struct LiveBoard {
    players: Vec<Player>,
    recent_games: Vec<Game>,
    recent_limit: usize,
}

impl LiveBoard {
    pub fn new(mut players: Vec<Player>, recent_games: Vec<Game>, recent_limit: usize) -> Self {
        rank_players(&mut players);
        let mut board = Self {
            players,
            recent_games,
            recent_limit,
        };
        board.recent_games.truncate(recent_limit);
        board
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn recent_games(&self) -> &[Game] {
        &self.recent_games
    }

    pub fn apply(&mut self, event: &FeedEvent) {
        match event {
            FeedEvent::GameInserted(game) => {
                self.recent_games.insert(0, game.clone());
                self.recent_games.truncate(self.recent_limit);
            }
            FeedEvent::PlayerUpdated(player) => {
                // Only players already on the board are refreshed
                if let Some(existing) = self.players.iter_mut().find(|p| p.id == player.id) {
                    *existing = player.clone();
                    rank_players(&mut self.players);
                }
            }
        }
    }

    /// Insert or replace a player, e.g. one who just joined.
    pub fn upsert_player(&mut self, player: Player) {
        match self.players.iter_mut().find(|p| p.id == player.id) {
            Some(existing) => *existing = player,
            None => self.players.push(player),
        }
        rank_players(&mut self.players);
    }

    pub fn rank_of(&self, player_id: &str) -> Option<usize> {
        self.players
            .iter()
            .position(|p| p.id == player_id)
            .map(|idx| idx + 1)
    }
}
