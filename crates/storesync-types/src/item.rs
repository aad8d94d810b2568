//! Work queue item model.

use serde::{Deserialize, Serialize};

use crate::product::ProductRecord;

/// Lifecycle state of a queued work item.
///
/// Transitions are owned by the queue store: pending → processing on
/// dequeue, processing → completed/failed/pending on write outcome, and
/// processing → pending on a reaper force-reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ItemStatus {
    /// Wire-format string for storage.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Parse the stored wire format.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "processing" => Some(Self::Processing),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of synchronization an item was admitted under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncType {
    /// Routine refresh of an existing or new catalog entry.
    Update,
    /// Full re-sync forced by an operator.
    Full,
}

impl SyncType {
    /// Wire-format string for storage.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Update => "update",
            Self::Full => "full",
        }
    }

    /// Parse the stored wire format.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "update" => Some(Self::Update),
            "full" => Some(Self::Full),
            _ => None,
        }
    }
}

impl std::fmt::Display for SyncType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the durable work queue.
///
/// Timestamps are ISO-8601 UTC strings (e.g. `"2026-01-15T10:00:00Z"`);
/// the store handles backend formatting internally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: i64,
    /// External product code; unique across the queue.
    pub natural_key: String,
    pub display_name: String,
    pub payload: ProductRecord,
    pub status: ItemStatus,
    pub attempts: u32,
    pub max_attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<String>,
    pub sync_type: SyncType,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_wire_roundtrip() {
        for status in [
            ItemStatus::Pending,
            ItemStatus::Processing,
            ItemStatus::Completed,
            ItemStatus::Failed,
        ] {
            assert_eq!(ItemStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(ItemStatus::parse("bogus"), None);
    }

    #[test]
    fn status_serde_matches_wire_format() {
        let json = serde_json::to_string(&ItemStatus::Processing).unwrap();
        assert_eq!(json, "\"processing\"");
    }

    #[test]
    fn sync_type_wire_roundtrip() {
        assert_eq!(SyncType::parse("update"), Some(SyncType::Update));
        assert_eq!(SyncType::parse("full"), Some(SyncType::Full));
        assert_eq!(SyncType::parse(""), None);
    }
}
