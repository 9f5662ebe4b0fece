use thiserror::Error;

/// Failure raised by a session store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("session scan aborted: {0}")]
    Scan(String),
    #[error("invalid table prefix: {0:?}")]
    InvalidTablePrefix(String),
}

/// Every failure the session engine can surface.
///
/// Credential and protocol variants are client-attributable and must be
/// answered with a rejection; the remaining variants are infrastructure
/// failures that callers log and alert on. Nothing here is retried in-core.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("access token invalid")]
    AccessTokenInvalid,
    /// Internal signal only: refresh proceeds with an expired access token.
    #[error("access token expired")]
    AccessTokenExpired,
    #[error("user agent changed")]
    UserAgentChanged,
    #[error("session not found")]
    SessionNotFound,
    #[error("user id must not be empty")]
    InvalidUser,
    #[error("failed to sign access token: {0}")]
    Signing(String),
    #[error("entropy source unavailable: {0}")]
    EntropySource(String),
    #[error("failed to hash refresh token: {0}")]
    Hashing(String),
    #[error("session storage failure: {0}")]
    Storage(#[from] StoreError),
}

impl AuthError {
    /// True for expected, client-attributable outcomes.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::AccessTokenInvalid
                | Self::AccessTokenExpired
                | Self::UserAgentChanged
                | Self::SessionNotFound
                | Self::InvalidUser
        )
    }
}
