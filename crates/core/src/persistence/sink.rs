//! Persistence sink with a local fallback.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{info, warn};

use super::{PersistReceipt, PersistenceError, PersistenceSink, PlanStore, StoredPlan};
use crate::generation::Caller;
use crate::trip::{Itinerary, TripPreferences};

/// Saves authenticated callers' plans durably and everyone else's locally.
///
/// When the durable save fails the plan is saved locally instead, so a
/// finished itinerary is never lost because of a storage outage.
pub struct FallbackSink {
    durable: Arc<dyn PlanStore>,
    local: Arc<dyn PlanStore>,
}

impl FallbackSink {
    pub fn new(durable: Arc<dyn PlanStore>, local: Arc<dyn PlanStore>) -> Self {
        Self { durable, local }
    }

    /// Find a plan by reference, checking durable storage first.
    pub fn lookup(&self, reference: &str) -> Result<Option<StoredPlan>, PersistenceError> {
        if let Some(plan) = self.durable.get(reference)? {
            return Ok(Some(plan));
        }
        self.local.get(reference)
    }

    fn save_to(
        store: &dyn PlanStore,
        owner: Option<&str>,
        preferences: &TripPreferences,
        itinerary: &Itinerary,
    ) -> Result<PersistReceipt, PersistenceError> {
        let plan = store.save(owner, preferences, itinerary)?;
        Ok(PersistReceipt {
            reference: plan.share_code,
            kind: store.kind(),
            saved_at: Utc::now(),
        })
    }
}

#[async_trait]
impl PersistenceSink for FallbackSink {
    async fn persist(
        &self,
        preferences: &TripPreferences,
        itinerary: &Itinerary,
        caller: &Caller,
    ) -> Result<PersistReceipt, PersistenceError> {
        let Some(user_id) = caller.user_id.as_deref() else {
            return Self::save_to(self.local.as_ref(), None, preferences, itinerary);
        };

        match Self::save_to(self.durable.as_ref(), Some(user_id), preferences, itinerary) {
            Ok(receipt) => Ok(receipt),
            Err(durable) => {
                warn!(
                    "Durable save of itinerary {} failed, falling back to local: {}",
                    itinerary.id, durable
                );
                match Self::save_to(self.local.as_ref(), Some(user_id), preferences, itinerary) {
                    Ok(receipt) => {
                        info!(
                            "Itinerary {} saved locally as {}",
                            itinerary.id, receipt.reference
                        );
                        Ok(receipt)
                    }
                    Err(local) => Err(PersistenceError::FallbackFailed {
                        durable: durable.to_string(),
                        local: local.to_string(),
                    }),
                }
            }
        }
    }
}
