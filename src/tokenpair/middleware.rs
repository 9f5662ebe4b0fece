//! Bearer access token gate.
//!
//! [`require_bearer`] runs before protected handlers. Only a validly signed,
//! unexpired token passes; its payload is stored in the request extensions
//! and handed to handlers through the [`Identity`] extractor.

use axum::{
    extract::{FromRequestParts, Request},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use tracing::debug;

use super::types::ErrorResponse;
use crate::auth::{AccessToken, AccessTokenPayload, SessionService, TokenValidation};

/// Verified claims of the caller.
#[derive(Clone, Debug)]
pub struct Identity(pub AccessTokenPayload);

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse::new("unauthorized")),
    )
        .into_response()
}

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AccessTokenPayload>()
            .cloned()
            .map(Self)
            .ok_or_else(unauthorized)
    }
}

/// Token from `Authorization: Bearer <token>`; the scheme is case-insensitive.
pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<AccessToken> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return None;
    }
    Some(AccessToken::new(token))
}

pub async fn require_bearer(mut request: Request, next: Next) -> Response {
    let Some(service) = request.extensions().get::<SessionService>().cloned() else {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    };

    let Some(token) = bearer_token(request.headers()) else {
        debug!("missing or malformed bearer token");
        return unauthorized();
    };

    match service.validate(&token) {
        TokenValidation::Valid(payload) => {
            request.extensions_mut().insert(payload);
            next.run(request).await
        }
        TokenValidation::Expired(_) => {
            debug!("expired bearer token");
            unauthorized()
        }
        TokenValidation::Invalid => {
            debug!("invalid bearer token");
            unauthorized()
        }
    }
}
