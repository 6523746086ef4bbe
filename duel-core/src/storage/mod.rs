pub mod change_log;
pub mod game_store;
pub mod player_store;

pub use change_log::ChangeLogStore;
pub use game_store::GameStore;
pub use player_store::PlayerStore;

use crate::error::Result;
use rusqlite::Connection;
use std::path::Path;
use std::time::Duration;
use tokio::sync::Mutex;

// Other processes may hold the write lock briefly while they save a game
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub struct Storage {
    conn: Mutex<Connection>,
}

impl Storage {
    pub async fn new(db_path: &Path) -> Result<Self> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let conn = Connection::open(db_path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        let storage = Self {
            conn: Mutex::new(conn),
        };

        storage.init_schema().await?;
        Ok(storage)
    }

    async fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock().await;

        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        tracing::debug!("Database journal mode: {}", mode);

        // Players table
        conn.execute(
            "CREATE TABLE IF NOT EXISTS players (
                id TEXT PRIMARY KEY,
                name TEXT UNIQUE NOT NULL,
                total_games INTEGER NOT NULL DEFAULT 0,
                total_points INTEGER NOT NULL DEFAULT 0,
                best_score INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )",
            [],
        )?;

        // Games table, rolls stored as JSON arrays
        conn.execute(
            "CREATE TABLE IF NOT EXISTS games (
                id TEXT PRIMARY KEY,
                player_id TEXT NOT NULL,
                player_score INTEGER NOT NULL,
                computer_score INTEGER NOT NULL,
                player_rolls TEXT NOT NULL,
                computer_rolls TEXT NOT NULL,
                status TEXT NOT NULL,
                winner TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                completed_at INTEGER,
                FOREIGN KEY (player_id) REFERENCES players(id)
            )",
            [],
        )?;

        // Every committed change, so other connections can replay it
        conn.execute(
            "CREATE TABLE IF NOT EXISTS change_log (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                origin TEXT NOT NULL,
                table_name TEXT NOT NULL,
                kind TEXT NOT NULL,
                record TEXT NOT NULL,
                created_at INTEGER NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_games_completed
             ON games (status, completed_at DESC)",
            [],
        )?;

        Ok(())
    }

    pub async fn get_connection(&self) -> tokio::sync::MutexGuard<'_, Connection> {
        self.conn.lock().await
    }
}
