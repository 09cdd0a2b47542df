//! draftsync-core - Draft synchronization engine for the listing wizard
//!
//! Keeps an in-progress multi-step listing draft durable and consistent
//! across reloads, tabs, and transient network loss: write-through local
//! persistence, debounced remote sync, cross-tab last-write-wins adoption,
//! and offline recovery.

pub mod bus;
pub mod clock;
pub mod config;
pub mod connectivity;
pub mod debounce;
pub mod engine;
pub mod error;
pub mod models;
pub mod slot;
pub mod store;

pub use config::EngineConfig;
pub use engine::{DraftEngine, Hydration};
pub use error::{Error, Result};
pub use models::{Draft, DraftFields, FieldKey, FieldValue, LocalRecord, OwnerId, StatusSnapshot, SyncStatus};
