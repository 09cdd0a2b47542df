//! Shared models for draftsync

mod draft;
mod record;
mod status;

pub use draft::{Draft, DraftFields, FieldKey, FieldValue, OwnerId};
pub use record::LocalRecord;
pub use status::{StatusSnapshot, SyncStatus};
