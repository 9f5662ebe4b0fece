//! Value types shared by the session engine and its adapters.

use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

/// Role embedded in every access token minted by the engine.
pub const DEFAULT_ROLE: &str = "user";

macro_rules! string_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            #[must_use]
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }
    };
}

string_newtype!(
    /// Externally assigned user identifier.
    UserId
);
string_newtype!(
    /// Free-form role label; only [`DEFAULT_ROLE`] is ever issued.
    UserRole
);
string_newtype!(
    /// Correlates an access token with the session generation it was minted alongside.
    TokenPairId
);
string_newtype!(
    /// Signed, self-contained access credential.
    AccessToken
);
string_newtype!(
    /// Opaque refresh credential. Only its salted digest is ever stored.
    RefreshToken
);

macro_rules! debug_as {
    (visible: $($name:ident),+) => {
        $(impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_tuple(stringify!($name)).field(&self.0).finish()
            }
        })+
    };
    (redacted: $($name:ident),+) => {
        $(impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_tuple(stringify!($name))
                    .field(&format_args!("[REDACTED]"))
                    .finish()
            }
        })+
    };
}

// Identifiers are safe to print; the two credentials are not.
debug_as!(visible: UserId, UserRole, TokenPairId);
debug_as!(redacted: AccessToken, RefreshToken);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for TokenPairId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl UserRole {
    #[must_use]
    pub fn default_role() -> Self {
        Self::new(DEFAULT_ROLE)
    }
}

/// Claims carried inside an access token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccessTokenPayload {
    pub user_id: UserId,
    pub token_pair_id: TokenPairId,
    pub role: UserRole,
}

/// Access + refresh credentials handed to the client together.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TokenPair {
    #[schema(value_type = String)]
    pub access_token: AccessToken,
    #[schema(value_type = String)]
    pub refresh_token: RefreshToken,
}

/// Persisted refresh-side state for one login on one device.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionRecord {
    pub user_id: UserId,
    pub token_pair_id: TokenPairId,
    pub refresh_digest: String,
    pub user_agent: String,
    pub ip: String,
}

/// Raised when a refresh arrives from a different IP than the session was issued to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserIpChanged {
    pub user_id: UserId,
    pub old_ip: String,
    pub new_ip: String,
}
