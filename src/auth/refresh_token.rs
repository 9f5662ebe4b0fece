//! Refresh token generation and salted digests.

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use base64ct::{Base64UrlUnpadded, Encoding};
use rand::{rngs::OsRng, RngCore};

use super::error::AuthError;
use super::types::RefreshToken;

const REFRESH_TOKEN_BYTES: usize = 32;

/// Checks a presented refresh token against a stored digest.
pub trait RefreshTokenVerifier: Send + Sync {
    /// Same effort for every candidate; never a plain equality check.
    fn matches(&self, digest: &str, candidate: &RefreshToken) -> bool;
}

/// Mints refresh tokens and the salted digests persisted in their place.
pub trait RefreshTokenAlgorithm: RefreshTokenVerifier {
    /// # Errors
    /// Returns `AuthError::EntropySource` if the OS random source fails.
    fn generate(&self) -> Result<RefreshToken, AuthError>;

    /// # Errors
    /// Returns `AuthError::Hashing` if the digest cannot be computed.
    fn digest(&self, token: &RefreshToken) -> Result<String, AuthError>;
}

/// Argon2id digests in PHC string format with a fresh salt per call.
#[derive(Clone)]
pub struct Argon2RefreshTokens {
    argon2: Argon2<'static>,
}

impl Argon2RefreshTokens {
    #[must_use]
    pub fn new() -> Self {
        Self::with_params(Params::default())
    }

    #[must_use]
    pub fn with_params(params: Params) -> Self {
        Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        }
    }
}

impl Default for Argon2RefreshTokens {
    fn default() -> Self {
        Self::new()
    }
}

impl RefreshTokenVerifier for Argon2RefreshTokens {
    fn matches(&self, digest: &str, candidate: &RefreshToken) -> bool {
        // Params and salt come from the PHC string, not from `self`.
        PasswordHash::new(digest).is_ok_and(|parsed| {
            self.argon2
                .verify_password(candidate.as_str().as_bytes(), &parsed)
                .is_ok()
        })
    }
}

impl RefreshTokenAlgorithm for Argon2RefreshTokens {
    fn generate(&self) -> Result<RefreshToken, AuthError> {
        let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| AuthError::EntropySource(e.to_string()))?;
        Ok(RefreshToken::new(Base64UrlUnpadded::encode_string(&bytes)))
    }

    fn digest(&self, token: &RefreshToken) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(token.as_str().as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AuthError::Hashing(e.to_string()))
    }
}

/// Cheap Argon2 parameters for tests.
#[cfg(test)]
pub(crate) fn test_refresh_tokens() -> Argon2RefreshTokens {
    match Params::new(Params::MIN_M_COST, 1, 1, None) {
        Ok(params) => Argon2RefreshTokens::with_params(params),
        Err(_) => Argon2RefreshTokens::new(),
    }
}
