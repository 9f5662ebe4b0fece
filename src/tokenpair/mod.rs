//! HTTP service around the session engine.

use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Request, StatusCode},
    routing::{get, options},
    Extension, Json, Router,
};
use sqlx::postgres::PgPoolOptions;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer,
    timeout::TimeoutLayer, trace::TraceLayer,
};
use tracing::{info, info_span, warn, Span};
use ulid::Ulid;

use crate::auth::{
    Argon2RefreshTokens, Hs512Codec, IpChangeNotifier, MemorySessionStore, PgSessionStore,
    SessionService, SessionStore,
};
use crate::cli::actions::server::Args;

pub mod client;
pub mod handlers;
pub mod middleware;
mod openapi;
pub mod types;
pub mod webhook;

pub use openapi::openapi;

/// Build the complete application router around `service`.
#[must_use]
pub fn app(service: SessionService, request_timeout: Duration) -> Router {
    let (router, doc) = openapi::api_router().split_for_parts();
    let doc = Arc::new(doc);

    router
        .route("/health", options(handlers::health::health))
        .route(
            "/openapi.json",
            get(move || {
                let doc = doc.clone();
                async move { Json(doc.as_ref().clone()) }
            }),
        )
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(request_timeout_layer(request_timeout))
                .layer(Extension(service)),
        )
}

/// Build every component from `args` and serve until Ctrl-C.
///
/// # Errors
/// Returns an error if the database is unreachable or the listener cannot bind.
pub async fn new(args: Args) -> Result<()> {
    let codec = Hs512Codec::new(&args.access_token_secret)
        .with_ttl_seconds(args.access_token_ttl_seconds);
    info!(
        access_token_ttl_seconds = codec.ttl_seconds(),
        max_sessions_per_user = args.max_sessions_per_user,
        "session engine configured"
    );
    let refresh_tokens = Arc::new(Argon2RefreshTokens::new());

    let store: Arc<dyn SessionStore> = if let Some(dsn) = &args.dsn {
        let pool = PgPoolOptions::new()
            .min_connections(1)
            .max_connections(5)
            .max_lifetime(Duration::from_secs(60 * 2))
            .test_before_acquire(true)
            .connect(dsn)
            .await
            .context("Failed to connect to database")?;

        let store = PgSessionStore::new(pool, refresh_tokens.clone(), &args.table_prefix)?
            .with_max_sessions_per_user(args.max_sessions_per_user);
        store
            .create_schema()
            .await
            .context("Failed to create sessions table")?;
        Arc::new(store)
    } else {
        warn!("No --dsn given, sessions are kept in memory and lost on restart");
        Arc::new(
            MemorySessionStore::new(refresh_tokens.clone())
                .with_max_sessions_per_user(args.max_sessions_per_user),
        )
    };

    let notifier = Arc::new(IpChangeNotifier::new());
    notifier.set_handler(Arc::new(webhook::WebhookIpChangeHandler::new(
        args.ip_changed_webhook_url.as_deref(),
    )?));

    let service = SessionService::new(Arc::new(codec), refresh_tokens, store, notifier);
    let app = app(service, args.request_timeout);

    let listener = TcpListener::bind(format!("[::]:{}", args.port)).await?;

    info!("Listening on [::]:{}", args.port);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for shutdown signal: {e}");
            std::future::pending::<()>().await;
        }
        info!("Gracefully shutdown");
    })
    .await?;

    Ok(())
}

fn request_timeout_layer(timeout: Duration) -> TimeoutLayer {
    TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, timeout)
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tower::ServiceExt;

    #[tokio::test]
    async fn slow_requests_time_out() -> Result<()> {
        let router = Router::new()
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    "done"
                }),
            )
            .layer(request_timeout_layer(Duration::from_millis(10)));

        let response = router
            .oneshot(Request::builder().uri("/slow").body(Body::empty())?)
            .await?;
        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
        Ok(())
    }
}
