use anyhow::{Context, Result};
use clap::{builder::ValueParser, Arg, ArgMatches, Command};
use regex::Regex;
use secrecy::SecretString;

pub const ARG_ACCESS_TOKEN_SECRET: &str = "access-token-secret";
pub const ARG_ACCESS_TOKEN_TTL_SECONDS: &str = "access-token-ttl-seconds";
pub const ARG_MAX_SESSIONS_PER_USER: &str = "max-sessions-per-user";
pub const ARG_TABLE_PREFIX: &str = "table-prefix";
pub const ARG_IP_CHANGED_WEBHOOK_URL: &str = "ip-changed-webhook-url";

#[derive(Debug)]
pub struct Options {
    pub access_token_secret: SecretString,
    pub access_token_ttl_seconds: i64,
    pub max_sessions_per_user: usize,
    pub table_prefix: String,
    pub ip_changed_webhook_url: Option<String>,
}

impl Options {
    /// # Errors
    /// Returns an error if the signing secret is missing.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let access_token_secret = matches
            .get_one::<String>(ARG_ACCESS_TOKEN_SECRET)
            .cloned()
            .map(SecretString::from)
            .context("missing required argument: --access-token-secret")?;

        Ok(Self {
            access_token_secret,
            access_token_ttl_seconds: matches
                .get_one::<i64>(ARG_ACCESS_TOKEN_TTL_SECONDS)
                .copied()
                .unwrap_or(crate::auth::access_token::DEFAULT_ACCESS_TOKEN_TTL_SECONDS),
            max_sessions_per_user: matches
                .get_one::<usize>(ARG_MAX_SESSIONS_PER_USER)
                .copied()
                .unwrap_or(crate::auth::store::DEFAULT_MAX_SESSIONS_PER_USER),
            table_prefix: matches
                .get_one::<String>(ARG_TABLE_PREFIX)
                .cloned()
                .unwrap_or_default(),
            ip_changed_webhook_url: matches.get_one::<String>(ARG_IP_CHANGED_WEBHOOK_URL).cloned(),
        })
    }
}

/// Table prefixes end up inside SQL, so only `[a-z0-9_]` is accepted.
#[must_use]
pub fn validator_table_prefix() -> ValueParser {
    ValueParser::from(move |prefix: &str| -> std::result::Result<String, String> {
        let re = Regex::new(r"^[a-z0-9_]*$").map_err(|e| e.to_string())?;
        if re.is_match(prefix) {
            Ok(prefix.to_string())
        } else {
            Err("table prefix may only contain [a-z0-9_]".to_string())
        }
    })
}

#[must_use]
pub fn validator_url() -> ValueParser {
    ValueParser::from(move |value: &str| -> std::result::Result<String, String> {
        url::Url::parse(value)
            .map(|_| value.to_string())
            .map_err(|e| format!("invalid URL: {e}"))
    })
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_ACCESS_TOKEN_SECRET)
                .long(ARG_ACCESS_TOKEN_SECRET)
                .help("Secret used to sign access tokens (HS512)")
                .env("TOKENPAIR_ACCESS_TOKEN_SECRET")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_ACCESS_TOKEN_TTL_SECONDS)
                .long(ARG_ACCESS_TOKEN_TTL_SECONDS)
                .help("Access token lifetime in seconds")
                .env("TOKENPAIR_ACCESS_TOKEN_TTL_SECONDS")
                .default_value("900")
                .value_parser(clap::value_parser!(i64).range(1..)),
        )
        .arg(
            Arg::new(ARG_MAX_SESSIONS_PER_USER)
                .long(ARG_MAX_SESSIONS_PER_USER)
                .help("Sessions kept per user before the oldest is evicted (0 = unbounded)")
                .env("TOKENPAIR_MAX_SESSIONS_PER_USER")
                .default_value("10")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new(ARG_TABLE_PREFIX)
                .long(ARG_TABLE_PREFIX)
                .help("Prefix for database table names")
                .env("TOKENPAIR_TABLE_PREFIX")
                .default_value("")
                .value_parser(validator_table_prefix()),
        )
        .arg(
            Arg::new(ARG_IP_CHANGED_WEBHOOK_URL)
                .long(ARG_IP_CHANGED_WEBHOOK_URL)
                .help("URL notified with a POST when a refresh comes from a new IP")
                .env("TOKENPAIR_IP_CHANGED_WEBHOOK_URL")
                .value_parser(validator_url()),
        )
}
