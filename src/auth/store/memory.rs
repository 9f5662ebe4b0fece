use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use super::{first_match, SessionStore, DEFAULT_MAX_SESSIONS_PER_USER};
use crate::auth::error::StoreError;
use crate::auth::refresh_token::RefreshTokenVerifier;
use crate::auth::types::{RefreshToken, SessionRecord, UserId};

/// Process-local store, used when no database is configured and in tests.
///
/// Sessions are kept per user in insertion order, so the front of each queue
/// is always the oldest session.
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<UserId, VecDeque<SessionRecord>>>,
    verifier: Arc<dyn RefreshTokenVerifier>,
    max_sessions_per_user: usize,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new(verifier: Arc<dyn RefreshTokenVerifier>) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            verifier,
            max_sessions_per_user: DEFAULT_MAX_SESSIONS_PER_USER,
        }
    }

    /// Zero disables the cap.
    #[must_use]
    pub fn with_max_sessions_per_user(mut self, max: usize) -> Self {
        self.max_sessions_per_user = max;
        self
    }

    /// Number of live sessions held by `user_id`.
    pub async fn count(&self, user_id: &UserId) -> usize {
        self.sessions
            .read()
            .await
            .get(user_id)
            .map_or(0, VecDeque::len)
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn save(&self, session: &SessionRecord) -> Result<(), StoreError> {
        let mut sessions = self.sessions.write().await;
        let user_sessions = sessions.entry(session.user_id.clone()).or_default();
        user_sessions.push_back(session.clone());

        if self.max_sessions_per_user > 0 {
            while user_sessions.len() > self.max_sessions_per_user {
                if let Some(evicted) = user_sessions.pop_front() {
                    debug!(
                        user_id = %evicted.user_id,
                        token_pair_id = %evicted.token_pair_id,
                        "evicted oldest session"
                    );
                }
            }
        }

        Ok(())
    }

    async fn delete(&self, user_id: &UserId, refresh_digest: &str) -> Result<bool, StoreError> {
        let mut sessions = self.sessions.write().await;
        let Some(user_sessions) = sessions.get_mut(user_id) else {
            return Ok(false);
        };

        let removed = match user_sessions
            .iter()
            .position(|session| session.refresh_digest == refresh_digest)
        {
            Some(index) => user_sessions.remove(index).is_some(),
            None => false,
        };

        if user_sessions.is_empty() {
            sessions.remove(user_id);
        }

        Ok(removed)
    }

    async fn find_by_token(
        &self,
        user_id: &UserId,
        candidate: &RefreshToken,
    ) -> Result<Option<SessionRecord>, StoreError> {
        // Snapshot and release the lock before the slow comparisons.
        let candidates: Vec<SessionRecord> = self
            .sessions
            .read()
            .await
            .get(user_id)
            .map(|user_sessions| user_sessions.iter().rev().cloned().collect())
            .unwrap_or_default();

        first_match(self.verifier.clone(), candidates, candidate).await
    }
}
