//! ConversationStore trait definition.
//!
//! Defines the port for the append-only, per-session turn log. The SQLite
//! implementation lives in repolens-infra.

use std::future::Future;

use repolens_types::conversation::Turn;
use repolens_types::error::RepositoryError;

/// Append-only log of turns, keyed by session id.
///
/// Implementations must return turns oldest-first even when the backing
/// query reads newest-first.
pub trait ConversationStore: Send + Sync {
    /// The most recent `limit` turns of a session, ordered oldest to newest.
    fn recent_turns(
        &self,
        session_id: &str,
        limit: u32,
    ) -> impl Future<Output = Result<Vec<Turn>, RepositoryError>> + Send;

    /// Append one turn to a session.
    fn append_turn(
        &self,
        session_id: &str,
        turn: &Turn,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Cheap round-trip used by the dependency health check.
    fn ping(&self) -> impl Future<Output = Result<(), RepositoryError>> + Send;
}
