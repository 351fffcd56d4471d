/// Database Module
///
/// This module handles all PostgreSQL database operations including:
/// - Connection pool management
/// - Schema migrations
/// - The `Repository` seam used by the indexer and the read endpoint
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;

use crate::error::{IndexerError, IndexerResult};
use crate::etl::load;
use crate::models::{CreateDelegation, Delegation};

/// Persistence contract for bakers and delegations
///
/// `count_delegations` and `last_processed_level` are the checkpoint: there is
/// no separate cursor, the stored rows are the cursor.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Upsert each baker, then insert its delegation, in batch order.
    /// Returns the number of delegations inserted.
    async fn create(&self, batch: &[CreateDelegation]) -> IndexerResult<usize>;

    /// Every stored delegation, timestamp ascending
    async fn find_all(&self) -> IndexerResult<Vec<Delegation>>;

    /// Number of stored delegations
    async fn count_delegations(&self) -> IndexerResult<i64>;

    /// Highest stored level, 0 when empty
    async fn last_processed_level(&self) -> IndexerResult<i64>;
}

/// Connection pool settings
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub max_lifetime: Duration,
}

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool
    pub async fn new(database_url: &str, config: &PoolConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .max_lifetime(config.max_lifetime)
            .connect(database_url)
            .await
            .context("Failed to connect to PostgreSQL database")?;

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool
    #[cfg(test)]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run database migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await.context("Failed to run database migrations")?;

        tracing::info!("Database migrations completed successfully");
        Ok(())
    }

    /// Test the database connection
    pub async fn test_connection(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await.context("Database connection test failed")?;

        Ok(())
    }
}

#[async_trait]
impl Repository for Database {
    async fn create(&self, batch: &[CreateDelegation]) -> IndexerResult<usize> {
        load::batch_insert_delegations(&self.pool, batch).await.map_err(IndexerError::Persistence)
    }

    async fn find_all(&self) -> IndexerResult<Vec<Delegation>> {
        sqlx::query_as::<_, Delegation>(
            r#"
            SELECT id, delegator, baker_id, amount, timestamp, level,
                   operation_hash, is_new_delegation, previous_baker, indexed_at
            FROM delegations
            ORDER BY timestamp ASC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(IndexerError::Query)
    }

    async fn count_delegations(&self) -> IndexerResult<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM delegations")
            .fetch_one(&self.pool)
            .await
            .map_err(IndexerError::Checkpoint)
    }

    async fn last_processed_level(&self) -> IndexerResult<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COALESCE(MAX(level), 0) FROM delegations")
            .fetch_one(&self.pool)
            .await
            .map_err(IndexerError::Checkpoint)
    }
}
