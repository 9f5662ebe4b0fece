use crate::{cli::telemetry, tokenpair};
use anyhow::Result;
use secrecy::SecretString;
use std::time::Duration;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: Option<String>,
    pub access_token_secret: SecretString,
    pub access_token_ttl_seconds: i64,
    pub max_sessions_per_user: usize,
    pub table_prefix: String,
    pub ip_changed_webhook_url: Option<String>,
    pub request_timeout: Duration,
}

/// Execute the server action.
///
/// # Errors
/// Returns an error if the database is unreachable or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let result = tokenpair::new(args).await;
    telemetry::shutdown_tracer();
    result
}
