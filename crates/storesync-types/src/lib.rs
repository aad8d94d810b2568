//! Shared domain types for the storesync engine.
//!
//! Pure data types used by the queue store, the sync engine, and the CLI.
//! Kept in a leaf crate so storage and engine crates can share them
//! without circular dependencies.

#![warn(clippy::pedantic)]

pub mod error;
pub mod event;
pub mod item;
pub mod product;
pub mod run;

pub use error::{ErrorKind, ErrorRecord};
pub use event::SyncEvent;
pub use item::{ItemStatus, SyncType, WorkItem};
pub use product::ProductRecord;
pub use run::{batch_id_at, DailyAggregate, QueueStats, RunStats, SyncRun, TodayStats, TriggerType};
