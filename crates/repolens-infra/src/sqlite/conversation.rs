//! SQLite conversation store implementation.
//!
//! Implements `ConversationStore` from `repolens-core`. Each turn is one row
//! in `messages` whose `message` column holds the turn's JSON form.

use repolens_core::conversation::store::ConversationStore;
use repolens_types::conversation::Turn;
use repolens_types::error::RepositoryError;
use sqlx::Row;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `ConversationStore`.
#[derive(Clone)]
pub struct SqliteConversationStore {
    pool: DatabasePool,
}

impl SqliteConversationStore {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

// ---------------------------------------------------------------------------
// Internal row types
// ---------------------------------------------------------------------------

struct MessageRow {
    id: i64,
    message: String,
}

impl MessageRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            message: row.try_get("message")?,
        })
    }

    fn into_turn(self) -> Result<Turn, RepositoryError> {
        serde_json::from_str(&self.message).map_err(|e| {
            RepositoryError::Query(format!("invalid message JSON in row {}: {e}", self.id))
        })
    }
}

// ---------------------------------------------------------------------------
// ConversationStore impl
// ---------------------------------------------------------------------------

impl ConversationStore for SqliteConversationStore {
    async fn recent_turns(&self, session_id: &str, limit: u32) -> Result<Vec<Turn>, RepositoryError> {
        let rows = sqlx::query(
            r#"SELECT id, message FROM messages
               WHERE session_id = ?
               ORDER BY created_at DESC, id DESC
               LIMIT ?"#,
        )
        .bind(session_id)
        .bind(limit as i64)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let mut turns = Vec::with_capacity(rows.len());
        for row in &rows {
            let r = MessageRow::from_row(row).map_err(|e| RepositoryError::Query(e.to_string()))?;
            turns.push(r.into_turn()?);
        }
        // Newest-first from the query; callers want oldest-first.
        turns.reverse();
        Ok(turns)
    }

    async fn append_turn(&self, session_id: &str, turn: &Turn) -> Result<(), RepositoryError> {
        let message = serde_json::to_string(turn)
            .map_err(|e| RepositoryError::Query(format!("serialize turn: {e}")))?;

        sqlx::query("INSERT INTO messages (session_id, message) VALUES (?, ?)")
            .bind(session_id)
            .bind(&message)
            .execute(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        tracing::debug!(session_id = %session_id, kind = %turn.kind, "stored conversation turn");
        Ok(())
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool.reader)
            .await
            .map_err(|_| RepositoryError::Connection)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::pool::default_database_url;
    use repolens_types::conversation::TurnKind;
    use serde_json::json;

    async fn test_store() -> (SqliteConversationStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let pool = DatabasePool::new(&default_database_url(dir.path())).await.unwrap();
        (SqliteConversationStore::new(pool), dir)
    }

    #[tokio::test]
    async fn test_append_and_read_back_in_order() {
        let (store, _dir) = test_store().await;

        store.append_turn("s1", &Turn::human("first")).await.unwrap();
        store.append_turn("s1", &Turn::assistant("second")).await.unwrap();
        store.append_turn("s1", &Turn::human("third")).await.unwrap();

        let turns = store.recent_turns("s1", 10).await.unwrap();
        let contents: Vec<&str> = turns.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second", "third"]);
        assert_eq!(turns[1].kind, TurnKind::Assistant);
    }

    #[tokio::test]
    async fn test_limit_keeps_most_recent() {
        let (store, _dir) = test_store().await;
        for i in 0..15 {
            store.append_turn("s1", &Turn::human(format!("m{i}"))).await.unwrap();
        }

        let turns = store.recent_turns("s1", 10).await.unwrap();
        assert_eq!(turns.len(), 10);
        assert_eq!(turns.first().unwrap().content, "m5");
        assert_eq!(turns.last().unwrap().content, "m14");
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let (store, _dir) = test_store().await;
        store.append_turn("a", &Turn::human("for a")).await.unwrap();
        store.append_turn("b", &Turn::human("for b")).await.unwrap();

        let turns = store.recent_turns("a", 10).await.unwrap();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].content, "for a");
        assert!(store.recent_turns("missing", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_metadata_round_trips_and_row_shape() {
        let (store, _dir) = test_store().await;
        let turn = Turn::assistant("sorry").with_data(json!({"request_id": "r1", "error": "boom"}));
        store.append_turn("s1", &turn).await.unwrap();

        let back = store.recent_turns("s1", 1).await.unwrap();
        assert_eq!(back, vec![turn]);

        let (raw,): (String,) = sqlx::query_as("SELECT message FROM messages")
            .fetch_one(&store.pool.reader)
            .await
            .unwrap();
        let raw: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(raw["type"], "ai");
        assert_eq!(raw["data"]["request_id"], "r1");
    }

    #[tokio::test]
    async fn test_corrupt_row_is_a_query_error() {
        let (store, _dir) = test_store().await;
        sqlx::query("INSERT INTO messages (session_id, message) VALUES ('s1', 'not json')")
            .execute(&store.pool.writer)
            .await
            .unwrap();

        let err = store.recent_turns("s1", 10).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Query(_)));
    }

    #[tokio::test]
    async fn test_ping() {
        let (store, _dir) = test_store().await;
        assert!(store.ping().await.is_ok());
    }
}
