//! Issue, rotate and revoke token pairs.

use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use super::access_token::{AccessTokenCodec, TokenValidation};
use super::error::AuthError;
use super::id::{TokenPairIdGenerator, UuidGenerator};
use super::notifier::IpChangePublisher;
use super::refresh_token::RefreshTokenAlgorithm;
use super::store::SessionStore;
use super::types::{
    AccessToken, AccessTokenPayload, RefreshToken, SessionRecord, TokenPair, UserId, UserIpChanged,
    UserRole,
};

/// The session engine. Holds only shared handles, so it is cheap to clone
/// into every request.
#[derive(Clone)]
pub struct SessionService {
    codec: Arc<dyn AccessTokenCodec>,
    refresh_tokens: Arc<dyn RefreshTokenAlgorithm>,
    ids: Arc<dyn TokenPairIdGenerator>,
    store: Arc<dyn SessionStore>,
    publisher: Arc<dyn IpChangePublisher>,
}

impl SessionService {
    #[must_use]
    pub fn new(
        codec: Arc<dyn AccessTokenCodec>,
        refresh_tokens: Arc<dyn RefreshTokenAlgorithm>,
        store: Arc<dyn SessionStore>,
        publisher: Arc<dyn IpChangePublisher>,
    ) -> Self {
        Self {
            codec,
            refresh_tokens,
            ids: Arc::new(UuidGenerator),
            store,
            publisher,
        }
    }

    #[must_use]
    pub fn with_id_generator(mut self, ids: Arc<dyn TokenPairIdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    /// Access token validation, exposed for the bearer middleware.
    #[must_use]
    pub fn validate(&self, token: &AccessToken) -> TokenValidation {
        self.codec.validate(token)
    }

    /// Start a new session for `user_id`.
    ///
    /// # Errors
    /// `InvalidUser` for an empty id, otherwise an infrastructure error.
    #[instrument(skip(self, user_id, user_agent, ip), fields(user_id = %user_id))]
    pub async fn authenticate(
        &self,
        user_id: &UserId,
        user_agent: &str,
        ip: &str,
    ) -> Result<TokenPair, AuthError> {
        if user_id.is_empty() {
            return Err(AuthError::InvalidUser);
        }

        let pair = self.issue(user_id, user_agent, ip).await?;
        info!("session issued");
        Ok(pair)
    }

    /// Exchange a token pair for a new one, consuming the old session.
    ///
    /// The access token may be expired but must carry a valid signature.
    ///
    /// # Errors
    /// `AccessTokenInvalid`, `SessionNotFound` and `UserAgentChanged` reject the
    /// client. Any other variant is an infrastructure failure.
    #[instrument(skip_all, fields(user_id = tracing::field::Empty))]
    pub async fn refresh(
        &self,
        access_token: &AccessToken,
        refresh_token: &RefreshToken,
        user_agent: &str,
        ip: &str,
    ) -> Result<TokenPair, AuthError> {
        let payload = match self.codec.validate(access_token) {
            TokenValidation::Valid(payload) | TokenValidation::Expired(payload) => payload,
            TokenValidation::Invalid => return Err(AuthError::AccessTokenInvalid),
        };
        if payload.user_id.is_empty() {
            return Err(AuthError::AccessTokenInvalid);
        }
        let user_id = payload.user_id;
        tracing::Span::current().record("user_id", tracing::field::display(&user_id));

        let session = self
            .store
            .find_by_token(&user_id, refresh_token)
            .await?
            .ok_or(AuthError::SessionNotFound)?;

        // Single use: whoever removes the row owns the rotation.
        if !self.store.delete(&user_id, &session.refresh_digest).await? {
            debug!("session consumed by a concurrent refresh");
            return Err(AuthError::SessionNotFound);
        }

        if session.user_agent != user_agent {
            warn!(token_pair_id = %session.token_pair_id, "user agent changed, session revoked");
            return Err(AuthError::UserAgentChanged);
        }

        if session.ip != ip {
            self.publisher.publish(UserIpChanged {
                user_id: user_id.clone(),
                old_ip: session.ip.clone(),
                new_ip: ip.to_string(),
            });
        }

        match self.issue(&user_id, user_agent, ip).await {
            Ok(pair) => {
                info!(previous = %session.token_pair_id, "session refreshed");
                Ok(pair)
            }
            Err(e) => {
                warn!(
                    previous = %session.token_pair_id,
                    "refresh failed after old session was removed: {e}"
                );
                Err(e)
            }
        }
    }

    /// Revoke the session holding `refresh_token`. Unknown tokens are a no-op.
    ///
    /// # Errors
    /// Only store failures.
    #[instrument(skip(self, refresh_token, user_id), fields(user_id = %user_id))]
    pub async fn logout(
        &self,
        refresh_token: &RefreshToken,
        user_id: &UserId,
    ) -> Result<(), AuthError> {
        let Some(session) = self.store.find_by_token(user_id, refresh_token).await? else {
            debug!("no session matched, nothing to revoke");
            return Ok(());
        };

        if self.store.delete(user_id, &session.refresh_digest).await? {
            info!(token_pair_id = %session.token_pair_id, "session revoked");
        }
        Ok(())
    }

    async fn issue(
        &self,
        user_id: &UserId,
        user_agent: &str,
        ip: &str,
    ) -> Result<TokenPair, AuthError> {
        let token_pair_id = self.ids.generate();
        let access_token = self.codec.generate(&AccessTokenPayload {
            user_id: user_id.clone(),
            token_pair_id: token_pair_id.clone(),
            role: UserRole::default_role(),
        })?;

        let refresh_token = self.refresh_tokens.generate()?;
        let refresh_digest = self.digest(&refresh_token).await?;

        self.store
            .save(&SessionRecord {
                user_id: user_id.clone(),
                token_pair_id,
                refresh_digest,
                user_agent: user_agent.to_string(),
                ip: ip.to_string(),
            })
            .await?;

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    async fn digest(&self, token: &RefreshToken) -> Result<String, AuthError> {
        let algorithm = self.refresh_tokens.clone();
        let token = token.clone();
        tokio::task::spawn_blocking(move || algorithm.digest(&token))
            .await
            .map_err(|e| AuthError::Hashing(e.to_string()))?
    }
}
