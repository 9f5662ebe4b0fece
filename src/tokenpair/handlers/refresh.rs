use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::StatusCode,
    response::{IntoResponse, Json},
};

use super::{auth_error_response, bad_request, missing_field};
use crate::auth::{AccessToken, RefreshToken, SessionService, TokenPair};
use crate::tokenpair::{
    client::ClientContext,
    types::{ErrorResponse, RefreshRequest},
};

#[utoipa::path(
    post,
    path = "/auth/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Rotated token pair; the presented refresh token is spent", body = TokenPair),
        (status = 400, description = "Invalid request body", body = ErrorResponse),
        (status = 401, description = "User agent changed; the session was revoked", body = ErrorResponse),
        (status = 403, description = "Token pair rejected", body = ErrorResponse),
        (status = 500, description = "Token pair could not be rotated", body = ErrorResponse),
    ),
    tag = "auth"
)]
pub async fn refresh(
    Extension(service): Extension<SessionService>,
    client: ClientContext,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> impl IntoResponse {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return bad_request(&rejection),
    };
    if request.access_token.is_empty() {
        return missing_field("access_token");
    }
    if request.refresh_token.is_empty() {
        return missing_field("refresh_token");
    }

    match service
        .refresh(
            &AccessToken::new(request.access_token),
            &RefreshToken::new(request.refresh_token),
            &client.user_agent,
            &client.ip,
        )
        .await
    {
        Ok(pair) => (StatusCode::OK, Json(pair)).into_response(),
        Err(err) => auth_error_response(&err),
    }
}
