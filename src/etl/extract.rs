/// Extract Module
///
/// Decides which page of operations to request next and fetches it. The
/// decision is derived from stored data only: an empty store bootstraps from
/// the most recent page, otherwise the fetch resumes strictly above the
/// highest stored level.
use crate::db::Repository;
use crate::error::IndexerResult;
use crate::models::IndexMode;
use crate::tzkt::{DelegationSource, TzktDelegation};

/// Page sizes for the two fetch shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchLimits {
    pub bootstrap: usize,
    pub incremental: usize,
}

/// Read the checkpoint and pick the fetch mode
pub async fn plan_fetch(repository: &dyn Repository) -> IndexerResult<IndexMode> {
    let count = repository.count_delegations().await?;
    if count == 0 {
        return Ok(IndexMode::Bootstrap);
    }

    let after_level = repository.last_processed_level().await?;
    Ok(IndexMode::Incremental { after_level })
}

/// Fetch the page described by `mode`
pub async fn extract_operations(
    source: &dyn DelegationSource,
    mode: IndexMode,
    limits: FetchLimits,
) -> IndexerResult<Vec<TzktDelegation>> {
    match mode {
        IndexMode::Bootstrap => {
            tracing::info!(limit = limits.bootstrap, "Database is empty, fetching initial batch of recent delegations");
            source.fetch_recent(limits.bootstrap).await
        }
        IndexMode::Incremental { after_level } => {
            tracing::info!(after_level, limit = limits.incremental, "Fetching new delegations");
            source.fetch_from_level(after_level, limits.incremental).await
        }
    }
}

#[cfg(test)]
pub mod testing {
    //! Scripted delegation source that records every request.
    use super::*;
    use crate::error::IndexerError;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum FetchCall {
        Recent { limit: usize },
        FromLevel { after_level: i64, limit: usize },
    }

    #[derive(Default)]
    pub struct ScriptedSource {
        pub pages: Mutex<VecDeque<IndexerResult<Vec<TzktDelegation>>>>,
        pub calls: Mutex<Vec<FetchCall>>,
    }

    impl ScriptedSource {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn push_page(&self, page: Vec<TzktDelegation>) {
            self.pages.lock().unwrap().push_back(Ok(page));
        }

        pub fn push_error(&self, message: &str) {
            self.pages.lock().unwrap().push_back(Err(IndexerError::Fetch(message.to_string())));
        }

        pub fn calls(&self) -> Vec<FetchCall> {
            self.calls.lock().unwrap().clone()
        }

        fn next_page(&self) -> IndexerResult<Vec<TzktDelegation>> {
            self.pages.lock().unwrap().pop_front().unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    #[async_trait]
    impl DelegationSource for ScriptedSource {
        async fn fetch_recent(&self, limit: usize) -> IndexerResult<Vec<TzktDelegation>> {
            self.calls.lock().unwrap().push(FetchCall::Recent { limit });
            self.next_page()
        }

        async fn fetch_from_level(&self, after_level: i64, limit: usize) -> IndexerResult<Vec<TzktDelegation>> {
            self.calls.lock().unwrap().push(FetchCall::FromLevel { after_level, limit });
            self.next_page()
        }
    }
}
