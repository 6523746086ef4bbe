//! Live change feed.
//!
//! The gateway publishes a raw [`ChangeEvent`] for every row it writes that
//! clients care about. Subscribers decode those payloads into typed
//! [`FeedEvent`]s; anything that fails to decode is logged and dropped.

pub mod board;
pub(crate) mod watcher;

pub use board::LiveBoard;

use crate::error::{DuelError, Result};
use crate::types::{Game, Player};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};

pub const GAMES_TABLE: &str = "games";
pub const PLAYERS_TABLE: &str = "players";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Insert => "INSERT",
            ChangeKind::Update => "UPDATE",
        }
    }
}

impl FromStr for ChangeKind {
    type Err = DuelError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "INSERT" => Ok(ChangeKind::Insert),
            "UPDATE" => Ok(ChangeKind::Update),
            other => Err(DuelError::internal(format!("unknown change kind '{}'", other))),
        }
    }
}

/// A row-level change as it travels over the feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub table: String,
    pub kind: ChangeKind,
    pub record: serde_json::Value,
}

impl ChangeEvent {
    pub fn game_inserted(game: &Game) -> Result<Self> {
        Ok(Self {
            table: GAMES_TABLE.to_string(),
            kind: ChangeKind::Insert,
            record: serde_json::to_value(game)?,
        })
    }

    pub fn player_updated(player: &Player) -> Result<Self> {
        Ok(Self {
            table: PLAYERS_TABLE.to_string(),
            kind: ChangeKind::Update,
            record: serde_json::to_value(player)?,
        })
    }
}

/// Typed events delivered to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    GameInserted(Game),
    PlayerUpdated(Player),
}

impl FeedEvent {
    pub fn decode(change: &ChangeEvent) -> Result<Self> {
        match (change.table.as_str(), change.kind) {
            (GAMES_TABLE, ChangeKind::Insert) => Ok(FeedEvent::GameInserted(
                serde_json::from_value(change.record.clone())?,
            )),
            (PLAYERS_TABLE, ChangeKind::Update) => Ok(FeedEvent::PlayerUpdated(
                serde_json::from_value(change.record.clone())?,
            )),
            (table, kind) => Err(DuelError::internal(format!(
                "Unsupported change {:?} on table '{}'",
                kind, table
            ))),
        }
    }
}

/// Fan-out channel shared by the gateway and every connected client.
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    tx: broadcast::Sender<ChangeEvent>,
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish a change. Having no subscribers is not an error.
    pub fn publish(&self, change: ChangeEvent) {
        let table = change.table.clone();
        match self.tx.send(change) {
            Ok(receivers) => {
                tracing::debug!("Published {} change to {} subscribers", table, receivers)
            }
            Err(_) => tracing::debug!("No subscribers for {} change", table),
        }
    }

    pub fn subscribe(&self) -> Subscription {
        Subscription {
            rx: self.tx.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

pub struct Subscription {
    rx: broadcast::Receiver<ChangeEvent>,
}

impl Subscription {
    /// Wait for the next decodable event. Returns `None` once the feed closes.
    pub async fn next(&mut self) -> Option<FeedEvent> {
        loop {
            match self.rx.recv().await {
                Ok(change) => {
                    if let Some(event) = decode_or_drop(&change) {
                        return Some(event);
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("Live feed lagged, skipped {} events", skipped);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Next already-delivered event, without waiting.
    pub fn try_next(&mut self) -> Option<FeedEvent> {
        loop {
            match self.rx.try_recv() {
                Ok(change) => {
                    if let Some(event) = decode_or_drop(&change) {
                        return Some(event);
                    }
                }
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::warn!("Live feed lagged, skipped {} events", skipped);
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }
}

fn decode_or_drop(change: &ChangeEvent) -> Option<FeedEvent> {
    match FeedEvent::decode(change) {
        Ok(event) => Some(event),
        Err(e) => {
            tracing::warn!("Dropping malformed {} payload: {}", change.table, e);
            None
        }
    }
}
