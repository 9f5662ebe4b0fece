//! Forwards IP change events to an HTTP endpoint.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, error, info_span, warn, Instrument};
use url::Url;

use crate::auth::{IpChangeHandler, UserIpChanged};

#[derive(Debug, Serialize)]
struct IpChangedPayload<'a> {
    user_id: &'a str,
    new_ip: &'a str,
}

/// `POST {url}` with `{"user_id", "new_ip"}` for every event. Single attempt,
/// failures are logged and dropped.
pub struct WebhookIpChangeHandler {
    client: Client,
    url: Option<Url>,
}

impl WebhookIpChangeHandler {
    /// # Errors
    /// Returns an error if `url` does not parse or the HTTP client cannot be built.
    pub fn new(url: Option<&str>) -> Result<Self> {
        let url = url
            .map(|url| Url::parse(url).with_context(|| format!("invalid webhook URL: {url}")))
            .transpose()?;

        let client = Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self { client, url })
    }
}

#[async_trait]
impl IpChangeHandler for WebhookIpChangeHandler {
    async fn handle(&self, event: UserIpChanged) {
        let Some(url) = &self.url else {
            warn!(user_id = %event.user_id, "ip changed but no webhook URL is configured");
            return;
        };

        let payload = IpChangedPayload {
            user_id: event.user_id.as_str(),
            new_ip: &event.new_ip,
        };

        let span = info_span!("webhook.ip_changed", http.method = "POST", url = %url);
        match self
            .client
            .post(url.clone())
            .json(&payload)
            .send()
            .instrument(span)
            .await
        {
            Ok(response) if response.status().is_success() => {
                debug!(user_id = %event.user_id, "ip change webhook delivered");
            }
            Ok(response) => {
                error!(
                    user_id = %event.user_id,
                    status = %response.status(),
                    "ip change webhook rejected"
                );
            }
            Err(e) => {
                error!(user_id = %event.user_id, "ip change webhook failed: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::UserId;
    use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
    use serde_json::Value;
    use tokio::net::TcpListener;
    use tokio::sync::mpsc;

    fn event() -> UserIpChanged {
        UserIpChanged {
            user_id: UserId::new("user-a"),
            old_ip: "1.2.3.4".into(),
            new_ip: "5.6.7.8".into(),
        }
    }

    async fn receiver(status: StatusCode) -> Result<(String, mpsc::UnboundedReceiver<Value>)> {
        let (tx, rx) = mpsc::unbounded_channel();
        let app = Router::new()
            .route(
                "/hook",
                post(
                    move |State(tx): State<mpsc::UnboundedSender<Value>>, Json(body): Json<Value>| async move {
                        let _ = tx.send(body);
                        status
                    },
                ),
            )
            .with_state(tx);

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Ok((format!("http://{addr}/hook"), rx))
    }

    #[tokio::test]
    async fn posts_user_and_new_ip() -> Result<()> {
        let (url, mut rx) = receiver(StatusCode::NO_CONTENT).await?;
        let handler = WebhookIpChangeHandler::new(Some(&url))?;

        handler.handle(event()).await;

        let body = rx.recv().await.context("webhook body")?;
        assert_eq!(
            body,
            serde_json::json!({"user_id": "user-a", "new_ip": "5.6.7.8"})
        );
        Ok(())
    }

    #[tokio::test]
    async fn error_status_is_swallowed() -> Result<()> {
        let (url, mut rx) = receiver(StatusCode::INTERNAL_SERVER_ERROR).await?;
        let handler = WebhookIpChangeHandler::new(Some(&url))?;

        handler.handle(event()).await;
        assert!(rx.recv().await.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_swallowed() -> Result<()> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        drop(listener);

        let handler = WebhookIpChangeHandler::new(Some(&format!("http://{addr}/hook")))?;
        handler.handle(event()).await;
        Ok(())
    }

    #[tokio::test]
    async fn without_url_nothing_is_sent() -> Result<()> {
        let handler = WebhookIpChangeHandler::new(None)?;
        handler.handle(event()).await;
        Ok(())
    }

    #[test]
    fn invalid_url_is_rejected() {
        assert!(WebhookIpChangeHandler::new(Some("not a url")).is_err());
    }
}
