//! Domain types for claim aggregation
//!
//! Everything here is transient, derived per-request from the external
//! claim table. Nothing is persisted by this service.

use serde::{Deserialize, Serialize};

/// Per-recipient totals for one creator, as returned in the `/query`
/// preview. Sorted by `total_value` descending before it leaves the
/// storage layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedRow {
    pub to_address: String,
    pub total_value: f64,
    pub claim_count: i64,
    pub creator: String,
}

/// Whole-population statistics for one creator. Unlike the preview,
/// these are never truncated by the request limit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatorStats {
    pub creator: String,
    pub total_claims: i64,
    pub unique_addresses: i64,
    pub total_value_sum: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregated_row_serializes_with_wire_field_names() {
        let row = AggregatedRow {
            to_address: "0xabc".to_string(),
            total_value: 12.5,
            claim_count: 3,
            creator: "alice".to_string(),
        };

        let value = serde_json::to_value(&row).unwrap();
        assert_eq!(value["to_address"], "0xabc");
        assert_eq!(value["total_value"], 12.5);
        assert_eq!(value["claim_count"], 3);
        assert_eq!(value["creator"], "alice");
    }

    #[test]
    fn test_creator_stats_round_trips() {
        let stats = CreatorStats {
            creator: "alice".to_string(),
            total_claims: 5,
            unique_addresses: 2,
            total_value_sum: 40.0,
        };

        let json = serde_json::to_string(&stats).unwrap();
        let back: CreatorStats = serde_json::from_str(&json).unwrap();
        assert_eq!(back, stats);
    }
}
