pub mod client;
pub mod error;
#[path = "trait.rs"]
pub mod r#trait;
pub mod types;

pub use client::PocketBaseQueueStore;
pub use error::StoreError;
pub use r#trait::QueueStore;
pub use types::{MapPoolDefinition, MapPoolEntryRow, QueueDefinition, QueueMapPoolAssoc, RatingJournalRow, RecentMapRow};
