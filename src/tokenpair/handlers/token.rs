use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::StatusCode,
    response::{IntoResponse, Json},
};

use super::{auth_error_response, bad_request};
use crate::auth::{SessionService, TokenPair, UserId};
use crate::tokenpair::{
    client::ClientContext,
    types::{ErrorResponse, TokenRequest},
};

#[utoipa::path(
    post,
    path = "/auth/token",
    request_body = TokenRequest,
    responses(
        (status = 200, description = "New token pair", body = TokenPair),
        (status = 400, description = "Invalid request body", body = ErrorResponse),
        (status = 500, description = "Token pair could not be issued", body = ErrorResponse),
    ),
    tag = "auth"
)]
pub async fn token(
    Extension(service): Extension<SessionService>,
    client: ClientContext,
    payload: Result<Json<TokenRequest>, JsonRejection>,
) -> impl IntoResponse {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return bad_request(&rejection),
    };

    match service
        .authenticate(&UserId::new(request.user_id), &client.user_agent, &client.ip)
        .await
    {
        Ok(pair) => (StatusCode::OK, Json(pair)).into_response(),
        Err(err) => auth_error_response(&err),
    }
}
