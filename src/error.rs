/// Error Module
///
/// Failures that cross component boundaries. Per-record validation problems
/// are not errors: the transformer reports them as `SkipReason`s.
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IndexerError {
    /// Upstream unreachable, non-success status, or a payload that does not decode
    #[error("failed to fetch delegations: {0}")]
    Fetch(String),

    /// One of the aggregate queries used to pick the next fetch window failed
    #[error("checkpoint query failed: {0}")]
    Checkpoint(#[source] sqlx::Error),

    /// A baker upsert or delegation insert failed; the batch was rolled back
    #[error("failed to persist delegations: {0}")]
    Persistence(#[source] sqlx::Error),

    /// Read-side query failed
    #[error("failed to query delegations: {0}")]
    Query(#[source] sqlx::Error),
}

pub type IndexerResult<T> = std::result::Result<T, IndexerError>;

impl IndexerError {
    /// Every error is retried on the next tick, but only these are worth a warning
    /// that names the upstream.
    pub fn is_upstream(&self) -> bool {
        matches!(self, Self::Fetch(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_cause() {
        let err = IndexerError::Persistence(sqlx::Error::Protocol("duplicate key".to_string()));
        assert!(err.to_string().contains("failed to persist delegations"));
        assert!(err.to_string().contains("duplicate key"));
    }

    #[test]
    fn test_upstream_classification() {
        assert!(IndexerError::Fetch("timeout".to_string()).is_upstream());
        assert!(!IndexerError::Checkpoint(sqlx::Error::PoolTimedOut).is_upstream());
    }
}
