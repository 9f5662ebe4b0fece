//! Session persistence.
//!
//! Refresh digests are salted, so a store can never look a session up by the
//! token itself. Sessions are keyed by user instead, and every lookup walks
//! that user's sessions running the (deliberately slow) digest comparison on
//! each one. That scan dominates the cost of a refresh, which is why every
//! store caps how many sessions a single user may hold.

use async_trait::async_trait;
use std::sync::Arc;

use super::error::StoreError;
use super::refresh_token::RefreshTokenVerifier;
use super::types::{RefreshToken, SessionRecord, UserId};

mod memory;
mod postgres;

pub use memory::MemorySessionStore;
pub use postgres::{PgSessionStore, SessionQueries};

pub const DEFAULT_MAX_SESSIONS_PER_USER: usize = 10;

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Persist a new session, evicting the user's oldest sessions past the cap.
    async fn save(&self, session: &SessionRecord) -> Result<(), StoreError>;

    /// Remove the session holding `refresh_digest`.
    ///
    /// Returns whether a row was removed. A missing row is not an error, which
    /// keeps logout idempotent and lets a refresh detect that a concurrent
    /// caller consumed the same session first.
    async fn delete(&self, user_id: &UserId, refresh_digest: &str) -> Result<bool, StoreError>;

    /// First session of `user_id` whose digest matches `candidate`.
    async fn find_by_token(
        &self,
        user_id: &UserId,
        candidate: &RefreshToken,
    ) -> Result<Option<SessionRecord>, StoreError>;
}

/// Run the digest comparison over `candidates` on the blocking pool.
pub(crate) async fn first_match(
    verifier: Arc<dyn RefreshTokenVerifier>,
    candidates: Vec<SessionRecord>,
    candidate: &RefreshToken,
) -> Result<Option<SessionRecord>, StoreError> {
    if candidates.is_empty() {
        return Ok(None);
    }

    let candidate = candidate.clone();
    tokio::task::spawn_blocking(move || {
        candidates
            .into_iter()
            .find(|session| verifier.matches(&session.refresh_digest, &candidate))
    })
    .await
    .map_err(|e| StoreError::Scan(e.to_string()))
}
