//! Trait definitions for the persistence module.

use async_trait::async_trait;

use super::error::PersistenceError;
use super::types::{PersistReceipt, StorageKind, StoredPlan};
use crate::generation::Caller;
use crate::trip::{Itinerary, TripPreferences};

/// Receives each finished itinerary exactly once per successful run.
#[async_trait]
pub trait PersistenceSink: Send + Sync {
    /// Save the itinerary. Authenticated callers get durable storage.
    async fn persist(
        &self,
        preferences: &TripPreferences,
        itinerary: &Itinerary,
        caller: &Caller,
    ) -> Result<PersistReceipt, PersistenceError>;
}

/// A place plans can be written to and read back from.
pub trait PlanStore: Send + Sync {
    /// Which kind of storage this is.
    fn kind(&self) -> StorageKind;

    /// Save a plan and return the stored record.
    fn save(
        &self,
        owner: Option<&str>,
        preferences: &TripPreferences,
        itinerary: &Itinerary,
    ) -> Result<StoredPlan, PersistenceError>;

    /// Look a plan up by the reference handed out on save.
    fn get(&self, reference: &str) -> Result<Option<StoredPlan>, PersistenceError>;
}
