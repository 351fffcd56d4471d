/// Pipeline Module
///
/// Runs the indexing loop: one Extract → Transform → Load cycle immediately,
/// then one per tick until shutdown. Cycles never overlap, so each checkpoint
/// read sees every write of the cycles before it.
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::db::Repository;
use crate::error::IndexerResult;
use crate::etl::extract::{extract_operations, plan_fetch, FetchLimits};
use crate::etl::transform::TransformStats;
use crate::models::IndexMode;
use crate::service::DelegationService;
use crate::tzkt::DelegationSource;

/// Statistics for one indexing cycle
#[derive(Debug, Clone, PartialEq)]
pub struct CycleStats {
    pub mode: IndexMode,
    pub fetched: usize,
    pub transform: TransformStats,
    pub inserted: usize,
    pub elapsed_time: Duration,
}

impl CycleStats {
    fn new(mode: IndexMode) -> Self {
        Self { mode, fetched: 0, transform: TransformStats::default(), inserted: 0, elapsed_time: Duration::ZERO }
    }

    pub fn operations_per_second(&self) -> f64 {
        let secs = self.elapsed_time.as_secs_f64();
        if secs == 0.0 {
            0.0
        } else {
            self.fetched as f64 / secs
        }
    }
}

/// Why the loop returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// The shutdown flag was raised
    Requested,
    /// Every shutdown sender was dropped
    Disconnected,
}

/// Configuration for the indexing loop
#[derive(Debug, Clone)]
pub struct IndexerConfig {
    pub interval: Duration,
    pub limits: FetchLimits,
}

/// Single worker that keeps the local store in step with TzKT
pub struct Indexer {
    source: Arc<dyn DelegationSource>,
    repository: Arc<dyn Repository>,
    service: DelegationService,
    config: IndexerConfig,
}

impl Indexer {
    /// Create a new indexer instance
    pub fn new(
        source: Arc<dyn DelegationSource>,
        repository: Arc<dyn Repository>,
        service: DelegationService,
        config: IndexerConfig,
    ) -> Self {
        Self { source, repository, service, config }
    }

    /// Run one fetch-transform-write cycle
    pub async fn index_once(&self) -> IndexerResult<CycleStats> {
        let start_time = Instant::now();

        let mode = plan_fetch(self.repository.as_ref()).await.inspect_err(|e| {
            tracing::warn!(error = %e, "Failed to read checkpoint");
        })?;
        let mut stats = CycleStats::new(mode);

        let operations = extract_operations(self.source.as_ref(), mode, self.config.limits).await?;
        stats.fetched = operations.len();

        if operations.is_empty() {
            tracing::info!(mode = mode.as_str(), "No new delegations found");
            stats.elapsed_time = start_time.elapsed();
            return Ok(stats);
        }

        tracing::info!(count = operations.len(), "Processing delegations");
        let summary = self.service.create(&operations).await?;
        stats.transform = summary.transform;
        stats.inserted = summary.inserted;
        stats.elapsed_time = start_time.elapsed();

        tracing::info!(
            mode = mode.as_str(),
            fetched = stats.fetched,
            accepted = stats.transform.accepted,
            skipped = stats.transform.skipped(),
            inserted = stats.inserted,
            elapsed_ms = stats.elapsed_time.as_millis() as u64,
            ops_per_sec = format!("{:.1}", stats.operations_per_second()),
            "Indexing cycle complete"
        );

        Ok(stats)
    }

    /// Run a cycle now, then one per interval until `shutdown` fires.
    ///
    /// A failed cycle is logged and retried on the next tick. An in-flight
    /// cycle is never interrupted; shutdown is checked between cycles.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> ShutdownReason {
        tracing::info!(interval_secs = self.config.interval.as_secs(), "Starting delegation indexer");

        let mut ticker = tokio::time::interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if *shutdown.borrow() {
                tracing::info!("Indexer stopping due to shutdown signal");
                return ShutdownReason::Requested;
            }

            tokio::select! {
                // the first tick completes immediately
                _ = ticker.tick() => self.run_cycle().await,
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        tracing::info!("Indexer stopping, shutdown channel closed");
                        return ShutdownReason::Disconnected;
                    }
                }
            }
        }
    }

    async fn run_cycle(&self) {
        if let Err(e) = self.index_once().await {
            if e.is_upstream() {
                tracing::warn!(error = %e, "Indexing failed, TzKT request will be retried on next tick");
            } else {
                tracing::warn!(error = %e, "Indexing failed");
            }
        }
    }
}
