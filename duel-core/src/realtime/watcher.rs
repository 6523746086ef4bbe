//! Replays changes committed by other gateways sharing the database.
//!
//! Each gateway publishes its own writes straight to its feed. Writes from
//! other processes only show up in the `change_log` table, so a background
//! task polls it and republishes what it finds. `PRAGMA data_version` only
//! moves when another connection commits, which keeps idle polls to a single
//! pragma read.

use crate::error::Result;
use crate::realtime::{ChangeEvent, ChangeFeed};
use crate::storage::{change_log, Storage};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

pub(crate) struct WatchState {
    origin: String,
    last_seq: i64,
    data_version: Option<i64>,
}

impl WatchState {
    pub(crate) fn new(origin: String, last_seq: i64) -> Self {
        Self {
            origin,
            last_seq,
            data_version: None,
        }
    }
}

pub(crate) fn spawn_watcher(
    storage: Arc<Storage>,
    feed: ChangeFeed,
    mut state: WatchState,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            match poll_once(&storage, &mut state).await {
                Ok(changes) => {
                    for change in changes {
                        feed.publish(change);
                    }
                }
                Err(e) => tracing::warn!("Change log poll failed: {}", e),
            }
        }
    })
}

/// Changes from other gateways committed since the last poll.
pub(crate) async fn poll_once(storage: &Storage, state: &mut WatchState) -> Result<Vec<ChangeEvent>> {
    let conn = storage.get_connection().await;

    let version: i64 = conn.query_row("PRAGMA data_version", [], |row| row.get(0))?;
    if state.data_version == Some(version) {
        return Ok(Vec::new());
    }
    state.data_version = Some(version);

    let mut changes = Vec::new();
    for logged in change_log::read_since(&conn, state.last_seq)? {
        state.last_seq = logged.seq;
        if logged.origin == state.origin {
            continue;
        }

        let seq = logged.seq;
        match logged.into_event() {
            Ok(change) => changes.push(change),
            Err(e) => tracing::warn!("Skipping unreadable change {}: {}", seq, e),
        }
    }

    if !changes.is_empty() {
        tracing::debug!("Picked up {} changes from other gateways", changes.len());
    }
    Ok(changes)
}
