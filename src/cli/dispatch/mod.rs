//! Map parsed command-line arguments to the action to run.

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::{auth, ARG_DSN, ARG_PORT, ARG_REQUEST_TIMEOUT_SECONDS};
use anyhow::Result;
use std::time::Duration;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let auth_opts = auth::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port: matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080),
        dsn: matches
            .get_one::<String>(ARG_DSN)
            .cloned()
            .filter(|dsn| !dsn.is_empty()),
        access_token_secret: auth_opts.access_token_secret,
        access_token_ttl_seconds: auth_opts.access_token_ttl_seconds,
        max_sessions_per_user: auth_opts.max_sessions_per_user,
        table_prefix: auth_opts.table_prefix,
        ip_changed_webhook_url: auth_opts.ip_changed_webhook_url,
        request_timeout: Duration::from_secs(
            matches
                .get_one::<u64>(ARG_REQUEST_TIMEOUT_SECONDS)
                .copied()
                .unwrap_or(30),
        ),
    }))
}
