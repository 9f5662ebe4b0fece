//! `PostgreSQL` session store.
//!
//! `sql/schema.sql` holds the unprefixed schema for reference. At startup the
//! store creates its own, possibly prefixed, table and index through
//! [`PgSessionStore::create_schema`].

use async_trait::async_trait;
use regex::Regex;
use sqlx::{PgPool, Row};
use std::sync::Arc;
use tracing::Instrument;

use super::{first_match, SessionStore, DEFAULT_MAX_SESSIONS_PER_USER};
use crate::auth::error::StoreError;
use crate::auth::refresh_token::RefreshTokenVerifier;
use crate::auth::types::{RefreshToken, SessionRecord, TokenPairId, UserId};

/// SQL statements for one (optionally prefixed) sessions table.
#[derive(Clone, Debug)]
pub struct SessionQueries {
    schema: Vec<String>,
    insert: String,
    evict: String,
    delete: String,
    select_by_user: String,
}

impl SessionQueries {
    /// # Errors
    /// Returns `StoreError::InvalidTablePrefix` unless the prefix matches `[a-z0-9_]*`.
    pub fn new(prefix: &str) -> Result<Self, StoreError> {
        // The prefix is spliced into SQL, so only identifier characters pass.
        let valid = Regex::new(r"^[a-z0-9_]*$").is_ok_and(|regex| regex.is_match(prefix));
        if !valid {
            return Err(StoreError::InvalidTablePrefix(prefix.to_string()));
        }

        let table = format!("{prefix}sessions");
        Ok(Self {
            schema: vec![
                format!(
                    "CREATE TABLE IF NOT EXISTS {table} (\
                     id BIGSERIAL PRIMARY KEY, \
                     user_id TEXT NOT NULL, \
                     token_pair_id TEXT NOT NULL, \
                     refresh_digest TEXT NOT NULL, \
                     user_agent TEXT NOT NULL, \
                     ip TEXT NOT NULL, \
                     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW())"
                ),
                format!(
                    "CREATE INDEX IF NOT EXISTS {table}_user_id_idx \
                     ON {table} (user_id, created_at DESC)"
                ),
            ],
            insert: format!(
                "INSERT INTO {table} (user_id, token_pair_id, refresh_digest, user_agent, ip) \
                 VALUES ($1, $2, $3, $4, $5)"
            ),
            evict: format!(
                "DELETE FROM {table} WHERE user_id = $1 AND id NOT IN \
                 (SELECT id FROM {table} WHERE user_id = $1 \
                 ORDER BY created_at DESC, id DESC LIMIT $2)"
            ),
            delete: format!("DELETE FROM {table} WHERE user_id = $1 AND refresh_digest = $2"),
            select_by_user: format!(
                "SELECT user_id, token_pair_id, refresh_digest, user_agent, ip FROM {table} \
                 WHERE user_id = $1 ORDER BY created_at DESC, id DESC"
            ),
        })
    }
}

pub struct PgSessionStore {
    pool: PgPool,
    verifier: Arc<dyn RefreshTokenVerifier>,
    queries: SessionQueries,
    max_sessions_per_user: usize,
}

impl PgSessionStore {
    /// # Errors
    /// Returns an error if `table_prefix` is not a safe identifier prefix.
    pub fn new(
        pool: PgPool,
        verifier: Arc<dyn RefreshTokenVerifier>,
        table_prefix: &str,
    ) -> Result<Self, StoreError> {
        Ok(Self {
            pool,
            verifier,
            queries: SessionQueries::new(table_prefix)?,
            max_sessions_per_user: DEFAULT_MAX_SESSIONS_PER_USER,
        })
    }

    /// Create the sessions table and its index if they are missing.
    ///
    /// # Errors
    /// Returns an error if a DDL statement fails.
    pub async fn create_schema(&self) -> Result<(), StoreError> {
        for statement in &self.queries.schema {
            sqlx::query(statement)
                .execute(&self.pool)
                .instrument(query_span("CREATE", statement))
                .await?;
        }
        Ok(())
    }

    /// Zero disables the cap.
    #[must_use]
    pub fn with_max_sessions_per_user(mut self, max: usize) -> Self {
        self.max_sessions_per_user = max;
        self
    }
}

fn query_span(operation: &'static str, statement: &str) -> tracing::Span {
    tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = operation,
        db.statement = statement
    )
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn save(&self, session: &SessionRecord) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(&self.queries.insert)
            .bind(session.user_id.as_str())
            .bind(session.token_pair_id.as_str())
            .bind(&session.refresh_digest)
            .bind(&session.user_agent)
            .bind(&session.ip)
            .execute(&mut *tx)
            .instrument(query_span("INSERT", &self.queries.insert))
            .await?;

        if self.max_sessions_per_user > 0 {
            let keep = i64::try_from(self.max_sessions_per_user).unwrap_or(i64::MAX);
            let evicted = sqlx::query(&self.queries.evict)
                .bind(session.user_id.as_str())
                .bind(keep)
                .execute(&mut *tx)
                .instrument(query_span("DELETE", &self.queries.evict))
                .await?
                .rows_affected();
            if evicted > 0 {
                tracing::debug!(user_id = %session.user_id, evicted, "evicted oldest sessions");
            }
        }

        tx.commit().await?;
        Ok(())
    }

    async fn delete(&self, user_id: &UserId, refresh_digest: &str) -> Result<bool, StoreError> {
        let result = sqlx::query(&self.queries.delete)
            .bind(user_id.as_str())
            .bind(refresh_digest)
            .execute(&self.pool)
            .instrument(query_span("DELETE", &self.queries.delete))
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_by_token(
        &self,
        user_id: &UserId,
        candidate: &RefreshToken,
    ) -> Result<Option<SessionRecord>, StoreError> {
        let rows = sqlx::query(&self.queries.select_by_user)
            .bind(user_id.as_str())
            .fetch_all(&self.pool)
            .instrument(query_span("SELECT", &self.queries.select_by_user))
            .await?;

        let candidates = rows
            .into_iter()
            .map(|row| {
                Ok(SessionRecord {
                    user_id: UserId::new(row.try_get::<String, _>("user_id")?),
                    token_pair_id: TokenPairId::new(row.try_get::<String, _>("token_pair_id")?),
                    refresh_digest: row.try_get("refresh_digest")?,
                    user_agent: row.try_get("user_agent")?,
                    ip: row.try_get("ip")?,
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()?;

        first_match(self.verifier.clone(), candidates, candidate).await
    }
}
