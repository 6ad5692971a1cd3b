//! Saving finished itineraries.
//!
//! The coordinator hands every completed itinerary to a [`PersistenceSink`]
//! once. [`FallbackSink`] routes authenticated callers to durable storage
//! ([`SqlitePlanStore`]) and everyone else, or any durable failure, to local
//! JSON files ([`JsonFilePlanStore`]).

mod error;
mod local;
mod sink;
mod sqlite;
mod traits;
mod types;

pub use error::PersistenceError;
pub use local::JsonFilePlanStore;
pub use sink::FallbackSink;
pub use sqlite::SqlitePlanStore;
pub use traits::{PersistenceSink, PlanStore};
pub use types::{share_code, PersistReceipt, StorageKind, StoredPlan};
