//! Signed access tokens (JWT, HS512).
//!
//! Access tokens are never persisted: possession of a validly signed,
//! unexpired token is the whole proof of identity. Validation still hands back
//! the claims of an expired token so the refresh flow can bind the old
//! session to a user without asking for a second proof.

use jsonwebtoken::{
    decode, encode, errors::ErrorKind, get_current_timestamp, Algorithm, DecodingKey,
    EncodingKey, Header, Validation,
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::error::AuthError;
use super::types::{AccessToken, AccessTokenPayload, TokenPairId, UserId, UserRole};

pub const DEFAULT_ACCESS_TOKEN_TTL_SECONDS: i64 = 15 * 60;

/// Result of checking an access token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TokenValidation {
    Valid(AccessTokenPayload),
    /// Signature checks out but the expiry horizon has passed.
    Expired(AccessTokenPayload),
    Invalid,
}

impl TokenValidation {
    /// Payload for `Valid` and `Expired` outcomes.
    #[must_use]
    pub fn payload(&self) -> Option<&AccessTokenPayload> {
        match self {
            Self::Valid(payload) | Self::Expired(payload) => Some(payload),
            Self::Invalid => None,
        }
    }
}

pub trait AccessTokenCodec: Send + Sync {
    /// Sign a new access token for `payload`.
    ///
    /// # Errors
    /// Returns `AuthError::Signing` if the signer fails.
    fn generate(&self, payload: &AccessTokenPayload) -> Result<AccessToken, AuthError>;

    fn validate(&self, token: &AccessToken) -> TokenValidation;
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    user_id: String,
    token_pair_id: String,
    role: String,
    exp: i64,
}

impl From<Claims> for AccessTokenPayload {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: UserId::new(claims.user_id),
            token_pair_id: TokenPairId::new(claims.token_pair_id),
            role: UserRole::new(claims.role),
        }
    }
}

/// HMAC-SHA512 JWT codec over a shared secret.
pub struct Hs512Codec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl_seconds: i64,
}

impl Hs512Codec {
    #[must_use]
    pub fn new(secret: &SecretString) -> Self {
        let bytes = secret.expose_secret().as_bytes();
        Self {
            encoding_key: EncodingKey::from_secret(bytes),
            decoding_key: DecodingKey::from_secret(bytes),
            ttl_seconds: DEFAULT_ACCESS_TOKEN_TTL_SECONDS,
        }
    }

    #[must_use]
    pub fn with_ttl_seconds(mut self, seconds: i64) -> Self {
        self.ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn ttl_seconds(&self) -> i64 {
        self.ttl_seconds
    }

    fn validation(validate_exp: bool) -> Validation {
        // Only HS512 is accepted; a token announcing any other `alg` fails.
        let mut validation = Validation::new(Algorithm::HS512);
        validation.leeway = 0;
        validation.validate_exp = validate_exp;
        validation.set_required_spec_claims(&["exp"]);
        validation
    }
}

impl AccessTokenCodec for Hs512Codec {
    fn generate(&self, payload: &AccessTokenPayload) -> Result<AccessToken, AuthError> {
        let now = i64::try_from(get_current_timestamp())
            .map_err(|e| AuthError::Signing(e.to_string()))?;
        let claims = Claims {
            user_id: payload.user_id.as_str().to_string(),
            token_pair_id: payload.token_pair_id.as_str().to_string(),
            role: payload.role.as_str().to_string(),
            exp: now + self.ttl_seconds,
        };

        encode(&Header::new(Algorithm::HS512), &claims, &self.encoding_key)
            .map(AccessToken::new)
            .map_err(|e| AuthError::Signing(e.to_string()))
    }

    fn validate(&self, token: &AccessToken) -> TokenValidation {
        match decode::<Claims>(token.as_str(), &self.decoding_key, &Self::validation(true)) {
            Ok(data) => TokenValidation::Valid(data.claims.into()),
            Err(err) if matches!(err.kind(), ErrorKind::ExpiredSignature) => {
                // Signature was already verified; decode again without the
                // expiry check to recover the claims.
                match decode::<Claims>(token.as_str(), &self.decoding_key, &Self::validation(false))
                {
                    Ok(data) => TokenValidation::Expired(data.claims.into()),
                    Err(_) => TokenValidation::Invalid,
                }
            }
            Err(_) => TokenValidation::Invalid,
        }
    }
}
