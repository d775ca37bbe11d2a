//! Skip ledger: counts of rejected rows by reason

use serde::Serialize;
use std::collections::BTreeMap;

/// Ledger key for rows whose foreign keys could not be resolved
pub const MISSING_CITY_OR_REGION: &str = "Missing city or region mapping";

/// Ledger key for reviews whose hotel is not in the datastore
pub const HOTEL_NOT_FOUND: &str = "Hotel not found in database";

/// Ledger key for rows lost with a failed batch
pub const BATCH_FAILED: &str = "Batch processing error";

/// Multiset over skip reasons for one import run.
///
/// Counts only ever increase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SkipLedger {
    total: u64,
    reasons: BTreeMap<String, u64>,
}

impl SkipLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one skipped row.
    pub fn record(&mut self, reason: impl Into<String>) {
        self.record_many(reason, 1);
    }

    /// Count `rows` skipped rows sharing one reason.
    pub fn record_many(&mut self, reason: impl Into<String>, rows: u64) {
        if rows == 0 {
            return;
        }
        *self.reasons.entry(reason.into()).or_default() += rows;
        self.total += rows;
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn count(&self, reason: &str) -> u64 {
        self.reasons.get(reason).copied().unwrap_or(0)
    }

    /// `(reason, count)` pairs ordered by reason
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.reasons.iter().map(|(r, c)| (r.as_str(), *c))
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_counts_per_reason_and_total() {
        let mut ledger = SkipLedger::new();
        ledger.record("Missing required field: ReviewTitle");
        ledger.record("Missing required field: ReviewTitle");
        ledger.record(HOTEL_NOT_FOUND);

        assert_eq!(ledger.total(), 3);
        assert_eq!(ledger.count("Missing required field: ReviewTitle"), 2);
        assert_eq!(ledger.count(HOTEL_NOT_FOUND), 1);
        assert_eq!(ledger.count("never seen"), 0);
    }

    #[test]
    fn test_record_many() {
        let mut ledger = SkipLedger::new();
        ledger.record_many(BATCH_FAILED, 250);
        ledger.record_many(BATCH_FAILED, 0);
        assert_eq!(ledger.total(), 250);
        assert_eq!(ledger.iter().collect::<Vec<_>>(), vec![(BATCH_FAILED, 250)]);
    }

    #[test]
    fn test_serializes_as_report() {
        let mut ledger = SkipLedger::new();
        ledger.record(MISSING_CITY_OR_REGION);
        let json = serde_json::to_value(&ledger).unwrap_or_default();
        assert_eq!(json["total"], 1);
        assert_eq!(json["reasons"][MISSING_CITY_OR_REGION], 1);
    }
}
