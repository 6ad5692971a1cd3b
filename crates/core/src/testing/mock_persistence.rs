//! Mock persistence sink and plan store.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::RwLock;

use crate::generation::Caller;
use crate::persistence::{
    PersistReceipt, PersistenceError, PersistenceSink, PlanStore, StorageKind, StoredPlan,
};
use crate::trip::{Itinerary, TripPreferences};

/// A recorded persist call for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedPersist {
    pub itinerary: Itinerary,
    pub caller: Caller,
    /// Whether the call succeeded.
    pub success: bool,
}

/// Mock implementation of the PersistenceSink trait.
///
/// Authenticated callers get a durable receipt, anonymous ones a local one.
/// The reference is the itinerary id.
#[derive(Debug, Default)]
pub struct MockPersistenceSink {
    calls: Arc<RwLock<Vec<RecordedPersist>>>,
    next_error: Arc<RwLock<Option<PersistenceError>>>,
    panic_next: Arc<RwLock<bool>>,
}

impl MockPersistenceSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next persist call fails with this error.
    pub async fn set_next_error(&self, error: PersistenceError) {
        *self.next_error.write().await = Some(error);
    }

    /// The next persist call panics before recording anything.
    pub async fn panic_next(&self) {
        *self.panic_next.write().await = true;
    }

    pub async fn recorded(&self) -> Vec<RecordedPersist> {
        self.calls.read().await.clone()
    }

    pub async fn persist_count(&self) -> usize {
        self.calls.read().await.len()
    }
}

#[async_trait]
impl PersistenceSink for MockPersistenceSink {
    async fn persist(
        &self,
        _preferences: &TripPreferences,
        itinerary: &Itinerary,
        caller: &Caller,
    ) -> Result<PersistReceipt, PersistenceError> {
        let panic_now = std::mem::take(&mut *self.panic_next.write().await);
        if panic_now {
            panic!("mock sink panic for itinerary {}", itinerary.id);
        }

        let error = self.next_error.write().await.take();
        self.calls.write().await.push(RecordedPersist {
            itinerary: itinerary.clone(),
            caller: caller.clone(),
            success: error.is_none(),
        });

        if let Some(error) = error {
            return Err(error);
        }

        let kind = if caller.is_authenticated() {
            StorageKind::Durable
        } else {
            StorageKind::Local
        };
        Ok(PersistReceipt {
            reference: itinerary.id.clone(),
            kind,
            saved_at: Utc::now(),
        })
    }
}

/// In-memory PlanStore with injectable failures.
#[derive(Debug)]
pub struct MockPlanStore {
    kind: StorageKind,
    plans: Mutex<Vec<StoredPlan>>,
    next_error: Mutex<Option<String>>,
}

impl MockPlanStore {
    pub fn new(kind: StorageKind) -> Self {
        Self {
            kind,
            plans: Mutex::new(Vec::new()),
            next_error: Mutex::new(None),
        }
    }

    /// The next save fails with a database error carrying this message.
    pub fn set_next_error(&self, message: &str) {
        *lock(&self.next_error) = Some(message.to_string());
    }

    pub fn saved(&self) -> Vec<StoredPlan> {
        lock(&self.plans).clone()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

impl PlanStore for MockPlanStore {
    fn kind(&self) -> StorageKind {
        self.kind
    }

    fn save(
        &self,
        owner: Option<&str>,
        preferences: &TripPreferences,
        itinerary: &Itinerary,
    ) -> Result<StoredPlan, PersistenceError> {
        if let Some(message) = lock(&self.next_error).take() {
            return Err(PersistenceError::Database(message));
        }
        let plan = StoredPlan::new(owner, preferences, itinerary);
        lock(&self.plans).push(plan.clone());
        Ok(plan)
    }

    fn get(&self, reference: &str) -> Result<Option<StoredPlan>, PersistenceError> {
        Ok(lock(&self.plans)
            .iter()
            .find(|p| p.share_code == reference)
            .cloned())
    }
}
