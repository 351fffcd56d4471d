/// Delegation Service Module
///
/// Use-case layer shared by the indexing loop (write side) and the HTTP
/// endpoint (read side).
use chrono::Utc;
use std::sync::Arc;

use crate::db::Repository;
use crate::error::IndexerResult;
use crate::etl::transform::{transform_batch, TransformStats};
use crate::models::{DelegationView, DelegationsResponse};
use crate::tzkt::TzktDelegation;

/// Result of handing one page of operations to the repository
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateSummary {
    pub transform: TransformStats,
    pub inserted: usize,
}

#[derive(Clone)]
pub struct DelegationService {
    repository: Arc<dyn Repository>,
}

impl DelegationService {
    pub fn new(repository: Arc<dyn Repository>) -> Self {
        Self { repository }
    }

    /// Transform a page of operations and persist the accepted ones as one batch.
    ///
    /// An empty batch never reaches the repository. Repository errors are
    /// returned as-is.
    pub async fn create(&self, operations: &[TzktDelegation]) -> IndexerResult<CreateSummary> {
        tracing::debug!(total = operations.len(), "Processing operations");

        let (batch, transform) = transform_batch(operations, Utc::now());
        if batch.is_empty() {
            tracing::info!(skipped = transform.skipped(), "No valid delegations to create");
            return Ok(CreateSummary { transform, inserted: 0 });
        }

        let inserted = self.repository.create(&batch).await?;
        Ok(CreateSummary { transform, inserted })
    }

    /// All stored delegations in storage order
    pub async fn get_delegations(&self) -> IndexerResult<DelegationsResponse> {
        let delegations = self.repository.find_all().await?;
        let data = delegations.into_iter().map(DelegationView::from).collect();

        Ok(DelegationsResponse { data })
    }
}
