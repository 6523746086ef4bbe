use crate::error::Result;
use crate::realtime::{ChangeEvent, ChangeKind};
use crate::storage::Storage;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

/// A change as read back from the log.
#[derive(Debug, Clone)]
pub struct LoggedChange {
    pub seq: i64,
    /// Gateway that wrote the change.
    pub origin: String,
    table: String,
    kind: String,
    record: String,
}

impl LoggedChange {
    pub fn into_event(self) -> Result<ChangeEvent> {
        Ok(ChangeEvent {
            table: self.table,
            kind: self.kind.parse::<ChangeKind>()?,
            record: serde_json::from_str(&self.record)?,
        })
    }
}

/// Append a change in the caller's transaction. Returns its sequence number.
pub(crate) fn append(conn: &Connection, origin: &str, change: &ChangeEvent) -> Result<i64> {
    conn.execute(
        "INSERT INTO change_log (origin, table_name, kind, record, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            origin,
            change.table,
            change.kind.as_str(),
            serde_json::to_string(&change.record)?,
            Utc::now().timestamp_millis(),
        ],
    )?;

    Ok(conn.last_insert_rowid())
}

pub(crate) fn read_since(conn: &Connection, after_seq: i64) -> Result<Vec<LoggedChange>> {
    let mut stmt = conn.prepare(
        "SELECT seq, origin, table_name, kind, record FROM change_log
         WHERE seq > ?1
         ORDER BY seq ASC",
    )?;

    let change_iter = stmt.query_map(params![after_seq], |row| {
        Ok(LoggedChange {
            seq: row.get(0)?,
            origin: row.get(1)?,
            table: row.get(2)?,
            kind: row.get(3)?,
            record: row.get(4)?,
        })
    })?;

    let mut changes = Vec::new();
    for change in change_iter {
        changes.push(change?);
    }

    Ok(changes)
}

pub(crate) fn latest_seq(conn: &Connection) -> Result<i64> {
    let seq: i64 = conn.query_row("SELECT COALESCE(MAX(seq), 0) FROM change_log", [], |row| {
        row.get(0)
    })?;
    Ok(seq)
}

pub struct ChangeLogStore<'a> {
    storage: &'a Storage,
}

impl<'a> ChangeLogStore<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    pub async fn latest_seq(&self) -> Result<i64> {
        let conn = self.storage.get_connection().await;
        latest_seq(&conn)
    }

    pub async fn since(&self, after_seq: i64) -> Result<Vec<LoggedChange>> {
        let conn = self.storage.get_connection().await;
        read_since(&conn, after_seq)
    }

    /// Drop entries written before `cutoff`. Returns how many were removed.
    pub async fn prune_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let conn = self.storage.get_connection().await;

        let removed = conn.execute(
            "DELETE FROM change_log WHERE created_at < ?1",
            params![cutoff.timestamp_millis()],
        )?;

        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_append_and_read_back() {
        let temp_dir = tempdir().unwrap();
        let storage = Storage::new(&temp_dir.path().join("log.db")).await.unwrap();

        let change = ChangeEvent {
            table: "players".to_string(),
            kind: ChangeKind::Update,
            record: json!({ "id": "p1" }),
        };
        let first = {
            let conn = storage.get_connection().await;
            let first = append(&conn, "gw-a", &change).unwrap();
            append(&conn, "gw-b", &change).unwrap();
            first
        };

        let store = ChangeLogStore::new(&storage);
        assert_eq!(store.latest_seq().await.unwrap(), first + 1);

        let changes = store.since(first).await.unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].origin, "gw-b");

        let event = changes[0].clone().into_event().unwrap();
        assert_eq!(event.kind, ChangeKind::Update);
        assert_eq!(event.record["id"], "p1");

        let removed = store
            .prune_before(Utc::now() + Duration::minutes(1))
            .await
            .unwrap();
        assert_eq!(removed, 2);
        assert_eq!(store.latest_seq().await.unwrap(), 0);
    }

    #[test]
    fn test_unknown_kind_fails_to_decode() {
        let change = LoggedChange {
            seq: 1,
            origin: "gw".to_string(),
            table: "games".to_string(),
            kind: "DELETE".to_string(),
            record: "{}".to_string(),
        };
        assert!(change.into_event().is_err());
    }
}
