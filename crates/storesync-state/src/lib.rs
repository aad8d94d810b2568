//! Durable state for the storesync engine.
//!
//! Provides the [`QueueStore`] trait and a [`SqliteStore`] implementation
//! covering the work queue, the error ledger, run history, and daily
//! aggregate statistics.

#![warn(clippy::pedantic)]

pub mod error;
pub mod sqlite;
pub mod store;

pub use error::StoreError;
pub use sqlite::SqliteStore;
pub use store::{Page, Pagination, QueueFilter, QueueStore};
