/// Data Models Module
///
/// This module defines the canonical records the indexer persists (bakers and
/// delegations), the write DTO pairing them, and the read-side response shapes.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Baker address recorded for operations that remove a delegate
pub const UNDELEGATED: &str = "UNDELEGATED";

/// A delegation target, one row per address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Baker {
    pub address: String,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

/// A stored delegation operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Delegation {
    pub id: i64,
    pub delegator: String,
    pub baker_id: String,
    pub amount: i64,
    pub timestamp: DateTime<Utc>,
    pub level: i64,
    pub operation_hash: String,
    pub is_new_delegation: bool,
    pub previous_baker: Option<String>,
    pub indexed_at: DateTime<Utc>,
}

/// A delegation that has not been stored yet; the id is assigned by the database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDelegation {
    pub delegator: String,
    pub baker_id: String,
    pub amount: i64,
    pub timestamp: DateTime<Utc>,
    pub level: i64,
    pub operation_hash: String,
    pub is_new_delegation: bool,
    pub previous_baker: Option<String>,
    pub indexed_at: DateTime<Utc>,
}

/// One unit of work for the repository: the baker is upserted before the
/// delegation referencing it is inserted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateDelegation {
    pub baker: Baker,
    pub delegation: NewDelegation,
}

/// Public projection of a stored delegation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegationView {
    pub timestamp: DateTime<Utc>,
    pub amount: i64,
    pub delegator: String,
    pub level: i64,
}

impl From<Delegation> for DelegationView {
    fn from(delegation: Delegation) -> Self {
        Self {
            timestamp: delegation.timestamp,
            amount: delegation.amount,
            delegator: delegation.delegator,
            level: delegation.level,
        }
    }
}

/// Envelope used by every read endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub data: T,
}

pub type DelegationsResponse = ApiResponse<Vec<DelegationView>>;

/// How a cycle chose what to fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexMode {
    /// Store is empty: take the most recent page
    Bootstrap,
    /// Store has data: resume strictly above the stored maximum level
    Incremental { after_level: i64 },
}

impl IndexMode {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Bootstrap => "bootstrap",
            Self::Incremental { .. } => "incremental",
        }
    }
}
