use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use super::{auth_error_response, bad_request, missing_field};
use crate::auth::{RefreshToken, SessionService};
use crate::tokenpair::{
    middleware::Identity,
    types::{ErrorResponse, LogoutRequest},
};

#[utoipa::path(
    post,
    path = "/auth/logout",
    request_body = LogoutRequest,
    responses(
        (status = 200, description = "Session revoked, or nothing to revoke"),
        (status = 400, description = "Invalid request body", body = ErrorResponse),
        (status = 401, description = "Missing, invalid or expired access token", body = ErrorResponse),
        (status = 500, description = "Session store failure", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
pub async fn logout(
    Extension(service): Extension<SessionService>,
    Identity(identity): Identity,
    payload: Result<Json<LogoutRequest>, JsonRejection>,
) -> impl IntoResponse {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return bad_request(&rejection),
    };
    if request.refresh_token.is_empty() {
        return missing_field("refresh_token");
    }

    match service
        .logout(&RefreshToken::new(request.refresh_token), &identity.user_id)
        .await
    {
        Ok(()) => StatusCode::OK.into_response(),
        Err(err) => auth_error_response(&err),
    }
}
