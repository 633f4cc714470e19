use crate::models::WatcherConfig;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use std::collections::{BTreeSet, HashSet};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when interacting with PostgreSQL
#[derive(Debug, Error)]
pub enum PostgresError {
    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// PostgreSQL client for watcher state
///
/// Keeps, per (scope, profile key), the set of candidate ids a seeker has
/// already been notified about, so repeated auto-hunt cycles only announce
/// new matches.
pub struct PostgresClient {
    pool: PgPool,
}

impl PostgresClient {
    /// Create a new PostgreSQL client from a connection string
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        acquire_timeout: Duration,
        idle_timeout: Duration,
    ) -> Result<Self, PostgresError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(acquire_timeout)
            .idle_timeout(idle_timeout)
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        // Run migrations on startup
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Create a new PostgreSQL client from settings
    pub async fn from_settings(
        url: &str,
        max_connections: Option<u32>,
        min_connections: Option<u32>,
        acquire_timeout_secs: Option<u64>,
        idle_timeout_secs: Option<u64>,
    ) -> Result<Self, PostgresError> {
        tracing::info!("Connecting to PostgreSQL");

        Self::new(
            url,
            max_connections.unwrap_or(10),
            min_connections.unwrap_or(1),
            Duration::from_secs(acquire_timeout_secs.unwrap_or(5)),
            Duration::from_secs(idle_timeout_secs.unwrap_or(600)),
        )
        .await
    }

    /// Ids already notified for a seeker
    pub async fn fetch_notified_matches(
        &self,
        scope: &str,
        profile_key: &str,
    ) -> Result<HashSet<String>, PostgresError> {
        let query = r#"
            SELECT match_id
            FROM notified_matches
            WHERE scope = $1 AND profile_key = $2
        "#;

        let rows = sqlx::query(query)
            .bind(scope)
            .bind(profile_key)
            .fetch_all(&self.pool)
            .await?;

        let ids: HashSet<String> = rows.iter().map(|row| row.get("match_id")).collect();

        tracing::debug!("{}/{} has {} notified matches", scope, profile_key, ids.len());

        Ok(ids)
    }

    /// Replace the notified set for a seeker
    ///
    /// Delete and insert run in one transaction; concurrent writers resolve
    /// as last write wins.
    pub async fn store_notified_matches(
        &self,
        scope: &str,
        profile_key: &str,
        ids: &[String],
    ) -> Result<(), PostgresError> {
        if scope.is_empty() || profile_key.is_empty() {
            return Err(PostgresError::InvalidInput(
                "scope and profile key must be non-empty".to_string(),
            ));
        }

        let ids = unique_sorted(ids);
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM notified_matches WHERE scope = $1 AND profile_key = $2")
            .bind(scope)
            .bind(profile_key)
            .execute(&mut *tx)
            .await?;

        if !ids.is_empty() {
            let query = r#"
                INSERT INTO notified_matches (scope, profile_key, match_id, notified_at)
                SELECT $1, $2, UNNEST($3::text[]), NOW()
            "#;

            sqlx::query(query)
                .bind(scope)
                .bind(profile_key)
                .bind(&ids)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        tracing::debug!("Stored {} notified matches for {}/{}", ids.len(), scope, profile_key);

        Ok(())
    }

    /// Forget every notified match for a seeker
    pub async fn clear_notified_matches(
        &self,
        scope: &str,
        profile_key: &str,
    ) -> Result<u64, PostgresError> {
        let result = sqlx::query("DELETE FROM notified_matches WHERE scope = $1 AND profile_key = $2")
            .bind(scope)
            .bind(profile_key)
            .execute(&self.pool)
            .await?;

        tracing::info!(
            "Cleared {} notified matches for {}/{}",
            result.rows_affected(),
            scope,
            profile_key
        );

        Ok(result.rows_affected())
    }

    /// Watcher override for a scope, if one is stored
    pub async fn fetch_watcher_config(&self, scope: &str) -> Result<Option<WatcherConfig>, PostgresError> {
        let row = sqlx::query("SELECT config FROM watcher_configs WHERE scope = $1")
            .bind(scope)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| row.get::<Json<WatcherConfig>, _>("config").0))
    }

    /// Insert or replace the watcher override for a scope
    pub async fn store_watcher_config(
        &self,
        scope: &str,
        config: &WatcherConfig,
    ) -> Result<(), PostgresError> {
        if scope.is_empty() {
            return Err(PostgresError::InvalidInput("scope must be non-empty".to_string()));
        }

        let query = r#"
            INSERT INTO watcher_configs (scope, config, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (scope) DO UPDATE
            SET config = EXCLUDED.config, updated_at = NOW()
        "#;

        sqlx::query(query)
            .bind(scope)
            .bind(Json(config))
            .execute(&self.pool)
            .await?;

        tracing::debug!("Stored watcher config for scope {}", scope);

        Ok(())
    }

    /// Health check for the database connection
    pub async fn health_check(&self) -> Result<bool, PostgresError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| true)
            .map_err(Into::into)
    }
}

/// Deduplicated, sorted, non-empty ids
fn unique_sorted(ids: &[String]) -> Vec<String> {
    ids.iter()
        .filter(|id| !id.is_empty())
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
