pub mod health;
pub mod logout;
pub mod me;
pub mod refresh;
pub mod token;

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use tracing::{debug, error};

use super::types::ErrorResponse;
use crate::auth::AuthError;

/// Map an engine error to a response.
///
/// Credential and protocol failures share one generic 403 so callers learn
/// nothing about which check failed. A changed user agent is the exception
/// and gets a 401 with a reason.
pub(crate) fn auth_error_response(err: &AuthError) -> Response {
    match err {
        AuthError::UserAgentChanged => {
            debug!("refresh rejected: {err}");
            (
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse::new("user agent changed")),
            )
                .into_response()
        }
        AuthError::InvalidUser => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("user_id is required")),
        )
            .into_response(),
        err if err.is_client_error() => {
            debug!("request rejected: {err}");
            (StatusCode::FORBIDDEN, Json(ErrorResponse::new("forbidden"))).into_response()
        }
        err => {
            error!("session engine failure: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new("internal server error")),
            )
                .into_response()
        }
    }
}

pub(crate) fn bad_request(rejection: &JsonRejection) -> Response {
    debug!("invalid request body: {rejection}");
    invalid_body()
}

/// 400 for a body that parsed but left a required field empty.
pub(crate) fn missing_field(field: &str) -> Response {
    debug!("invalid request body: {field} is empty");
    invalid_body()
}

fn invalid_body() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse::new("invalid request body")),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StoreError;

    #[test]
    fn protocol_errors_are_indistinguishable() {
        for err in [AuthError::SessionNotFound, AuthError::AccessTokenInvalid] {
            assert_eq!(auth_error_response(&err).status(), StatusCode::FORBIDDEN);
        }
    }

    #[test]
    fn user_agent_change_is_unauthorized() {
        assert_eq!(
            auth_error_response(&AuthError::UserAgentChanged).status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn missing_field_is_bad_request() {
        assert_eq!(missing_field("refresh_token").status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn infrastructure_errors_are_internal() {
        let err = AuthError::Storage(StoreError::Scan("boom".into()));
        assert_eq!(
            auth_error_response(&err).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            auth_error_response(&AuthError::Signing("x".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
