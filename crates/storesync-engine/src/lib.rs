//! The storesync engine: fetches catalog records from a source system,
//! validates and admits them into the durable queue, and drains the queue
//! into a relational destination with bounded retries.
//!
//! The [`orchestrator::SyncEngine`] ties the pieces together; the traits
//! ([`source::CatalogSource`], [`destination::CatalogWriter`],
//! [`notify::Notifier`]) are the seams for transports and tests.

#![warn(clippy::pedantic)]

pub mod config;
pub mod destination;
pub mod error;
pub mod events;
pub mod notify;
pub mod orchestrator;
pub mod processor;
pub mod source;
pub mod validator;

pub use config::Config;
pub use destination::{CatalogWriter, PgCatalogWriter};
pub use error::SyncError;
pub use events::EventBus;
pub use notify::{LogNotifier, Notifier, RunReport};
pub use orchestrator::{EngineStatus, SyncEngine};
pub use processor::{ProcessOutcome, Processor};
pub use source::{CatalogSource, SourceClient};
