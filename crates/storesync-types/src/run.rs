//! Run history and aggregate statistics model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What started a sync run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerType {
    Manual,
    Scheduled,
}

impl TriggerType {
    /// Wire-format string for storage.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Scheduled => "scheduled",
        }
    }

    /// Parse the stored wire format.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "manual" => Some(Self::Manual),
            "scheduled" => Some(Self::Scheduled),
            _ => None,
        }
    }
}

impl std::fmt::Display for TriggerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counters accumulated by the drain loop of one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    pub total: u64,
    pub successful: u64,
    pub failed: u64,
}

/// One immutable row of run history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncRun {
    pub id: i64,
    /// Time-derived, lexically sortable batch identifier.
    pub batch_id: String,
    pub total: u64,
    pub successful: u64,
    pub failed: u64,
    pub duration_ms: i64,
    pub started_at: String,
    pub completed_at: String,
    pub trigger_type: TriggerType,
}

/// Generate a batch identifier from a UTC timestamp.
///
/// The format (`YYYYMMDD-HHMMSS`) sorts lexically in time order.
#[must_use]
pub fn batch_id_at(now: DateTime<Utc>) -> String {
    now.format("%Y%m%d-%H%M%S").to_string()
}

/// One date-keyed row of accumulated daily totals.
///
/// Upserted by accumulation: a second run on the same date adds counts
/// and averages the duration estimate rather than overwriting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyAggregate {
    /// `YYYY-MM-DD` date key.
    pub date: String,
    pub total_synced: u64,
    pub successful: u64,
    pub failed: u64,
    pub avg_duration_ms: i64,
}

/// Per-status queue counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub pending: u64,
    pub processing: u64,
    pub completed: u64,
    pub failed: u64,
    pub total: u64,
}

/// Today's queue activity with a derived success rate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TodayStats {
    pub total: u64,
    pub completed: u64,
    pub failed: u64,
    pub pending: u64,
    pub processing: u64,
    /// Percentage of today's rows that completed, rounded to 2 decimals.
    pub success_rate: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn trigger_type_wire_roundtrip() {
        assert_eq!(TriggerType::parse("manual"), Some(TriggerType::Manual));
        assert_eq!(TriggerType::parse("scheduled"), Some(TriggerType::Scheduled));
        assert_eq!(TriggerType::parse("cron"), None);
    }

    #[test]
    fn batch_id_format_and_ordering() {
        let earlier = Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap();
        let later = Utc.with_ymd_and_hms(2026, 3, 1, 14, 5, 59).unwrap();
        let a = batch_id_at(earlier);
        let b = batch_id_at(later);
        assert_eq!(a, "20260301-093000");
        assert_eq!(b, "20260301-140559");
        assert!(a < b);
    }

    #[test]
    fn run_stats_default_is_zeroed() {
        let stats = RunStats::default();
        assert_eq!(stats.total, 0);
        assert_eq!(stats.successful, 0);
        assert_eq!(stats.failed, 0);
    }
}
