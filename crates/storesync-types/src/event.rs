//! Typed events published by the engine during a run.
//!
//! Delivery is fire-and-forget, at most once; disconnected subscribers
//! get no replay. Transports (push channel, log, webhook) subscribe
//! independently of the engine.

use serde::{Deserialize, Serialize};

use crate::run::{QueueStats, RunStats};

/// One event on the real-time surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SyncEvent {
    RunStarted {
        batch_id: String,
        total: u64,
    },
    /// Emitted once per item as the drain loop picks it up.
    Progress {
        processed: u64,
        successful: u64,
        failed: u64,
        current: String,
        pending: u64,
    },
    ItemCompleted {
        natural_key: String,
    },
    ItemFailed {
        natural_key: String,
        error: String,
    },
    /// Fuller queue snapshot, emitted every 10 items and at drain end.
    StatsSnapshot {
        stats: QueueStats,
    },
    RunCompleted {
        batch_id: String,
        stats: RunStats,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_tag_with_snake_case_names() {
        let event = SyncEvent::RunStarted {
            batch_id: "20260301-093000".into(),
            total: 42,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"event\":\"run_started\""), "got: {json}");

        let event = SyncEvent::ItemFailed {
            natural_key: "A1".into(),
            error: "boom".into(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"event\":\"item_failed\""), "got: {json}");
    }

    #[test]
    fn stats_snapshot_roundtrip() {
        let event = SyncEvent::StatsSnapshot {
            stats: QueueStats {
                pending: 3,
                processing: 1,
                completed: 10,
                failed: 2,
                total: 16,
            },
        };
        let json = serde_json::to_string(&event).unwrap();
        let back: SyncEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, back);
    }
}
