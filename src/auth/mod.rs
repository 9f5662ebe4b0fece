//! Token pair session engine.
//!
//! An access token is a short-lived HS512 JWT that any holder of the signing
//! secret can verify without touching storage. A refresh token is an opaque
//! random string; only its Argon2id digest is persisted, next to the user
//! agent and IP it was issued to. Every refresh consumes the old session and
//! issues a new pair, so a refresh token works exactly once.
//!
//! ## Refresh rules
//!
//! - The access token must carry a valid signature; expiry is tolerated.
//! - The refresh token must match a stored session of the same user.
//! - A different user agent revokes the session and issues nothing.
//! - A different IP is reported to the registered [`notifier::IpChangeHandler`]
//!   but does not block the refresh.

pub mod access_token;
pub mod error;
pub mod id;
pub mod notifier;
pub mod refresh_token;
pub mod service;
pub mod store;
pub mod types;

pub use access_token::{AccessTokenCodec, Hs512Codec, TokenValidation};
pub use error::{AuthError, StoreError};
pub use notifier::{IpChangeHandler, IpChangeNotifier, IpChangePublisher};
pub use refresh_token::{Argon2RefreshTokens, RefreshTokenAlgorithm, RefreshTokenVerifier};
pub use service::SessionService;
pub use store::{MemorySessionStore, PgSessionStore, SessionStore};
pub use types::{
    AccessToken, AccessTokenPayload, RefreshToken, SessionRecord, TokenPair, TokenPairId, UserId,
    UserIpChanged, UserRole,
};
