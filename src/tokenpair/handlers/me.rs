use axum::{
    http::StatusCode,
    response::{IntoResponse, Json},
};

use crate::tokenpair::{
    middleware::Identity,
    types::{ErrorResponse, MeResponse},
};

#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "Caller identity from the access token", body = MeResponse),
        (status = 401, description = "Missing, invalid or expired access token", body = ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
pub async fn me(Identity(identity): Identity) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(MeResponse {
            user_id: identity.user_id.into(),
        }),
    )
}
