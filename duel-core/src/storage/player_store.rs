use crate::error::Result;
use crate::storage::Storage;
use crate::types::Player;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

pub(crate) const PLAYER_COLUMNS: &str =
    "id, name, total_games, total_points, best_score, created_at, updated_at";

/// Map a player from `row`, whose player columns start at `offset`.
pub(crate) fn player_from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Player> {
    Ok(Player {
        id: row.get(offset)?,
        name: row.get(offset + 1)?,
        total_games: row.get(offset + 2)?,
        total_points: row.get::<_, i64>(offset + 3)?.max(0) as u64,
        best_score: row.get(offset + 4)?,
        created_at: from_millis(row.get(offset + 5)?),
        updated_at: from_millis(row.get(offset + 6)?),
    })
}

pub(crate) fn from_millis(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or_else(Utc::now)
}

pub(crate) fn load_player(conn: &Connection, player_id: &str) -> rusqlite::Result<Option<Player>> {
    let sql = format!("SELECT {} FROM players WHERE id = ?1", PLAYER_COLUMNS);
    conn.query_row(&sql, params![player_id], |row| player_from_row(row, 0))
        .optional()
}

/// Fold one finished game into a player's statistics in a single statement.
///
/// Returns the updated player, or `None` when no player has `player_id`.
pub(crate) fn apply_game(
    conn: &Connection,
    player_id: &str,
    score: u32,
    at: DateTime<Utc>,
) -> rusqlite::Result<Option<Player>> {
    let changed = conn.execute(
        "UPDATE players
         SET total_games = total_games + 1,
             total_points = total_points + ?2,
             best_score = MAX(best_score, ?3),
             updated_at = ?4
         WHERE id = ?1",
        params![player_id, i64::from(score), score, at.timestamp_millis()],
    )?;

    if changed == 0 {
        return Ok(None);
    }
    load_player(conn, player_id)
}

pub struct PlayerStore<'a> {
    storage: &'a Storage,
}

impl<'a> PlayerStore<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    pub async fn insert_player(&self, player: &Player) -> Result<()> {
        let conn = self.storage.get_connection().await;

        conn.execute(
            "INSERT INTO players (id, name, total_games, total_points, best_score, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                player.id,
                player.name,
                player.total_games,
                player.total_points as i64,
                player.best_score,
                player.created_at.timestamp_millis(),
                player.updated_at.timestamp_millis(),
            ],
        )?;

        Ok(())
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Option<Player>> {
        let conn = self.storage.get_connection().await;

        let sql = format!("SELECT {} FROM players WHERE name = ?1", PLAYER_COLUMNS);
        let player = conn
            .query_row(&sql, params![name], |row| player_from_row(row, 0))
            .optional()?;

        Ok(player)
    }

    pub async fn find_by_id(&self, player_id: &str) -> Result<Option<Player>> {
        let conn = self.storage.get_connection().await;
        Ok(load_player(&conn, player_id)?)
    }

    /// Players in leaderboard order.
    pub async fn top_players(&self, limit: usize) -> Result<Vec<Player>> {
        let conn = self.storage.get_connection().await;

        let sql = format!(
            "SELECT {} FROM players
             ORDER BY best_score DESC, total_points DESC, created_at ASC
             LIMIT ?1",
            PLAYER_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;

        let player_iter = stmt.query_map(params![limit as i64], |row| player_from_row(row, 0))?;

        let mut players = Vec::new();
        for player in player_iter {
            players.push(player?);
        }

        Ok(players)
    }

    /// 1-based leaderboard position; players level on both keys share a rank.
    pub async fn rank_of(&self, player: &Player) -> Result<usize> {
        let conn = self.storage.get_connection().await;

        let ahead: i64 = conn.query_row(
            "SELECT COUNT(*) FROM players
             WHERE best_score > ?1 OR (best_score = ?1 AND total_points > ?2)",
            params![player.best_score, player.total_points as i64],
            |row| row.get(0),
        )?;

        Ok(ahead as usize + 1)
    }

    pub async fn player_count(&self) -> Result<usize> {
        let conn = self.storage.get_connection().await;

        let count: i64 = conn.query_row("SELECT COUNT(*) FROM players", [], |row| row.get(0))?;

        Ok(count as usize)
    }
}
