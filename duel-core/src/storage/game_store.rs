use crate::error::Result;
use crate::storage::player_store::{from_millis, player_from_row, PLAYER_COLUMNS};
use crate::storage::Storage;
use crate::types::{Game, GameStatus, Winner};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

const GAME_COLUMNS: &str = "g.id, g.player_id, g.player_score, g.computer_score, g.player_rolls, \
     g.computer_rolls, g.status, g.winner, g.created_at, g.completed_at";

// Number of game columns ahead of the joined player columns.
const GAME_COLUMN_COUNT: usize = 10;

fn conversion_error(
    idx: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

#[derive(Debug)]
struct ParseError(String);

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ParseError {}

fn rolls_from_row(row: &Row<'_>, idx: usize) -> rusqlite::Result<Vec<u8>> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw).map_err(|e| conversion_error(idx, e))
}

fn game_from_row(row: &Row<'_>) -> rusqlite::Result<Game> {
    let status: String = row.get(6)?;
    let winner: String = row.get(7)?;

    let player_id: Option<String> = row.get(GAME_COLUMN_COUNT)?;
    let player = match player_id {
        Some(_) => Some(player_from_row(row, GAME_COLUMN_COUNT)?),
        None => None,
    };

    Ok(Game {
        id: row.get(0)?,
        player_id: row.get(1)?,
        player_score: row.get(2)?,
        computer_score: row.get(3)?,
        player_rolls: rolls_from_row(row, 4)?,
        computer_rolls: rolls_from_row(row, 5)?,
        status: status
            .parse::<GameStatus>()
            .map_err(|e| conversion_error(6, ParseError(e)))?,
        winner: winner
            .parse::<Winner>()
            .map_err(|e| conversion_error(7, ParseError(e)))?,
        created_at: from_millis(row.get(8)?),
        completed_at: row.get::<_, Option<i64>>(9)?.map(from_millis),
        player,
    })
}

pub(crate) fn insert_game_row(conn: &Connection, game: &Game) -> Result<()> {
    conn.execute(
        "INSERT INTO games
         (id, player_id, player_score, computer_score, player_rolls, computer_rolls,
          status, winner, created_at, completed_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            game.id,
            game.player_id,
            game.player_score,
            game.computer_score,
            serde_json::to_string(&game.player_rolls)?,
            serde_json::to_string(&game.computer_rolls)?,
            game.status.as_str(),
            game.winner.as_str(),
            game.created_at.timestamp_millis(),
            game.completed_at.map(|t| t.timestamp_millis()),
        ],
    )?;

    Ok(())
}

pub struct GameStore<'a> {
    storage: &'a Storage,
}

impl<'a> GameStore<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Load a game joined with the player who played it.
    pub async fn load_game(&self, game_id: &str) -> Result<Option<Game>> {
        let conn = self.storage.get_connection().await;

        let sql = format!(
            "SELECT {}, {} FROM games g
             LEFT JOIN players p ON p.id = g.player_id
             WHERE g.id = ?1",
            GAME_COLUMNS,
            prefixed_player_columns()
        );
        let game = conn
            .query_row(&sql, params![game_id], game_from_row)
            .optional()?;

        Ok(game)
    }

    /// Completed games, newest first, joined with their players.
    pub async fn recent_completed(&self, limit: usize) -> Result<Vec<Game>> {
        let conn = self.storage.get_connection().await;

        let sql = format!(
            "SELECT {}, {} FROM games g
             LEFT JOIN players p ON p.id = g.player_id
             WHERE g.status = 'completed'
             ORDER BY g.completed_at DESC, g.rowid DESC
             LIMIT ?1",
            GAME_COLUMNS,
            prefixed_player_columns()
        );
        let mut stmt = conn.prepare(&sql)?;

        let game_iter = stmt.query_map(params![limit as i64], game_from_row)?;

        let mut games = Vec::new();
        for game in game_iter {
            games.push(game?);
        }

        Ok(games)
    }
}

fn prefixed_player_columns() -> String {
    PLAYER_COLUMNS
        .split(", ")
        .map(|column| format!("p.{}", column))
        .collect::<Vec<_>>()
        .join(", ")
}
