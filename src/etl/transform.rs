/// Transform Module
///
/// Turns raw TzKT delegation operations into the (baker, delegation) pairs the
/// repository writes. Records that cannot be indexed are skipped, never failed:
/// the caller gets a `SkipReason` and a running tally in `TransformStats`.
use chrono::{DateTime, NaiveDateTime, Utc};

use crate::models::{Baker, CreateDelegation, NewDelegation, UNDELEGATED};
use crate::tzkt::TzktDelegation;

/// TzKT timestamps are second-precision UTC, e.g. `2024-01-01T12:00:00Z`
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

const DELEGATION_TYPE: &str = "delegation";
const APPLIED_STATUS: &str = "applied";

/// Why an operation produced no write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NotDelegation,
    NotApplied,
    InvalidTimestamp,
    MissingSender,
}

impl SkipReason {
    pub fn as_str(&self) -> &str {
        match self {
            Self::NotDelegation => "wrong operation type",
            Self::NotApplied => "operation not applied",
            Self::InvalidTimestamp => "invalid timestamp",
            Self::MissingSender => "missing sender address",
        }
    }
}

/// Tally of a batch transformation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformStats {
    pub accepted: usize,
    pub not_delegation: usize,
    pub not_applied: usize,
    pub invalid_timestamp: usize,
    pub missing_sender: usize,
}

impl TransformStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_skip(&mut self, reason: SkipReason) {
        match reason {
            SkipReason::NotDelegation => self.not_delegation += 1,
            SkipReason::NotApplied => self.not_applied += 1,
            SkipReason::InvalidTimestamp => self.invalid_timestamp += 1,
            SkipReason::MissingSender => self.missing_sender += 1,
        }
    }

    pub fn skipped(&self) -> usize {
        self.not_delegation + self.not_applied + self.invalid_timestamp + self.missing_sender
    }
}

/// Parse a TzKT timestamp; anything but the exact `YYYY-MM-DDTHH:MM:SSZ` shape is rejected
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .ok()
        // chrono alone accepts unpadded fields
        .filter(|naive| naive.format(TIMESTAMP_FORMAT).to_string() == raw)
        .map(|naive| naive.and_utc())
}

/// Transform a single operation into a write pair
///
/// Derivations:
/// - no `newDelegate` means an undelegation, recorded against the `UNDELEGATED` baker
/// - `is_new_delegation` only when there is a new delegate and no previous one
/// - `previous_baker` is the previous delegate's address when present
pub fn transform_delegation(
    op: &TzktDelegation,
    indexed_at: DateTime<Utc>,
) -> Result<CreateDelegation, SkipReason> {
    if op.kind != DELEGATION_TYPE {
        return Err(SkipReason::NotDelegation);
    }

    if op.status != APPLIED_STATUS {
        return Err(SkipReason::NotApplied);
    }

    let timestamp = parse_timestamp(&op.timestamp).ok_or(SkipReason::InvalidTimestamp)?;
    let delegator = op.sender_address().ok_or(SkipReason::MissingSender)?;

    let baker_address = match &op.new_delegate {
        Some(account) => account.address.clone(),
        None => UNDELEGATED.to_string(),
    };
    let is_undelegation = op.new_delegate.is_none();

    let baker = Baker { address: baker_address.clone(), first_seen: timestamp, last_seen: timestamp };

    let delegation = NewDelegation {
        delegator: delegator.to_string(),
        baker_id: baker_address,
        amount: op.amount,
        timestamp,
        level: op.level,
        operation_hash: op.hash.clone(),
        is_new_delegation: !is_undelegation && op.prev_delegate.is_none(),
        previous_baker: op.prev_delegate.as_ref().map(|account| account.address.clone()),
        indexed_at,
    };

    Ok(CreateDelegation { baker, delegation })
}

/// Transform a page of operations, preserving input order
pub fn transform_batch(ops: &[TzktDelegation], indexed_at: DateTime<Utc>) -> (Vec<CreateDelegation>, TransformStats) {
    let mut stats = TransformStats::new();
    let mut batch = Vec::with_capacity(ops.len());

    for op in ops {
        match transform_delegation(op, indexed_at) {
            Ok(pair) => {
                stats.accepted += 1;
                batch.push(pair);
            }
            Err(reason) => {
                tracing::debug!(
                    hash = %op.hash,
                    level = op.level,
                    kind = %op.kind,
                    status = %op.status,
                    reason = reason.as_str(),
                    "Skipping operation"
                );
                stats.add_skip(reason);
            }
        }
    }

    (batch, stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tzkt::Account;
    use chrono::TimeZone;

    fn account(address: &str) -> Option<Account> {
        Some(Account { alias: None, address: address.to_string() })
    }

    fn op(level: i64) -> TzktDelegation {
        TzktDelegation {
            kind: "delegation".to_string(),
            id: level,
            level,
            timestamp: "2024-01-01T12:00:00Z".to_string(),
            block: "BLock".to_string(),
            hash: format!("oo{level}"),
            counter: 1,
            initiator: None,
            sender: account("tz1delegator"),
            gas_limit: 0,
            gas_used: 0,
            storage_limit: 0,
            baker_fee: 0,
            amount: 1_000_000,
            prev_delegate: None,
            new_delegate: account("tz1baker"),
            status: "applied".to_string(),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_new_delegation() {
        let pair = transform_delegation(&op(1000), now()).unwrap();
        let expected_ts = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();

        assert_eq!(pair.baker.address, "tz1baker");
        assert_eq!(pair.baker.first_seen, expected_ts);
        assert_eq!(pair.baker.last_seen, expected_ts);
        assert_eq!(pair.delegation.delegator, "tz1delegator");
        assert_eq!(pair.delegation.baker_id, "tz1baker");
        assert_eq!(pair.delegation.amount, 1_000_000);
        assert_eq!(pair.delegation.level, 1000);
        assert_eq!(pair.delegation.operation_hash, "oo1000");
        assert_eq!(pair.delegation.timestamp, expected_ts);
        assert_eq!(pair.delegation.indexed_at, now());
        assert!(pair.delegation.is_new_delegation);
        assert_eq!(pair.delegation.previous_baker, None);
    }

    #[test]
    fn test_undelegation_uses_sentinel_baker() {
        let mut record = op(1000);
        record.new_delegate = None;
        record.prev_delegate = account("tz1old");

        let pair = transform_delegation(&record, now()).unwrap();
        assert_eq!(pair.baker.address, UNDELEGATED);
        assert_eq!(pair.delegation.baker_id, UNDELEGATED);
        assert!(!pair.delegation.is_new_delegation);
        assert_eq!(pair.delegation.previous_baker.as_deref(), Some("tz1old"));
    }

    #[test]
    fn test_undelegation_without_previous_is_not_new() {
        let mut record = op(1000);
        record.new_delegate = None;

        let pair = transform_delegation(&record, now()).unwrap();
        assert_eq!(pair.baker.address, UNDELEGATED);
        assert!(!pair.delegation.is_new_delegation);
        assert_eq!(pair.delegation.previous_baker, None);
    }

    #[test]
    fn test_redelegation() {
        let mut record = op(1000);
        record.prev_delegate = account("tz1old");
        record.new_delegate = account("tz1new");

        let pair = transform_delegation(&record, now()).unwrap();
        assert_eq!(pair.baker.address, "tz1new");
        assert!(!pair.delegation.is_new_delegation);
        assert_eq!(pair.delegation.previous_baker.as_deref(), Some("tz1old"));
    }

    #[test]
    fn test_skip_reasons() {
        let mut wrong_type = op(1);
        wrong_type.kind = "transaction".to_string();
        assert_eq!(transform_delegation(&wrong_type, now()), Err(SkipReason::NotDelegation));

        for status in ["failed", "backtracked", "skipped", ""] {
            let mut not_applied = op(1);
            not_applied.status = status.to_string();
            assert_eq!(transform_delegation(&not_applied, now()), Err(SkipReason::NotApplied));
        }

        let mut bad_ts = op(1);
        bad_ts.timestamp = "invalid-timestamp".to_string();
        assert_eq!(transform_delegation(&bad_ts, now()), Err(SkipReason::InvalidTimestamp));

        let mut no_sender = op(1);
        no_sender.sender = None;
        assert_eq!(transform_delegation(&no_sender, now()), Err(SkipReason::MissingSender));

        let mut empty_sender = op(1);
        empty_sender.sender = account("");
        assert_eq!(transform_delegation(&empty_sender, now()), Err(SkipReason::MissingSender));
    }

    #[test]
    fn test_timestamp_profile_is_strict() {
        assert!(parse_timestamp("2024-01-01T12:00:00Z").is_some());
        assert!(parse_timestamp("2024-01-01T12:00:00.123Z").is_none());
        assert!(parse_timestamp("2024-01-01T12:00:00+01:00").is_none());
        assert!(parse_timestamp("2024-01-01 12:00:00").is_none());
        assert!(parse_timestamp("2024-13-01T12:00:00Z").is_none());
        assert!(parse_timestamp("").is_none());
    }

    #[test]
    fn test_timestamp_rejects_loose_fields() {
        assert!(parse_timestamp("2024-1-1T1:2:3Z").is_none());
        assert!(parse_timestamp(" 2024-01-01T12:00:00Z").is_none());
        assert!(parse_timestamp("2024-01-01T 12:00:00Z").is_none());
        assert!(parse_timestamp("+2024-01-01T12:00:00Z").is_none());
        assert!(parse_timestamp("2024-01-01T12:00:00Z ").is_none());
    }

    #[test]
    fn test_loose_timestamp_is_skipped() {
        let mut record = op(1);
        record.timestamp = "2024-1-1T1:2:3Z".to_string();

        assert_eq!(transform_delegation(&record, now()), Err(SkipReason::InvalidTimestamp));
    }

    #[test]
    fn test_batch_filters_and_keeps_order() {
        let mut origination = op(2);
        origination.kind = "origination".to_string();
        let ops = vec![op(1), origination, op(3)];

        let (batch, stats) = transform_batch(&ops, now());
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].delegation.level, 1);
        assert_eq!(batch[1].delegation.level, 3);
        assert_eq!(stats.accepted, 2);
        assert_eq!(stats.not_delegation, 1);
        assert_eq!(stats.skipped(), 1);
    }

    #[test]
    fn test_batch_of_invalid_records_is_empty() {
        let mut bad_ts = op(1);
        bad_ts.timestamp = "invalid-timestamp".to_string();

        let (batch, stats) = transform_batch(&[bad_ts], now());
        assert!(batch.is_empty());
        assert_eq!(stats.invalid_timestamp, 1);
    }
}
