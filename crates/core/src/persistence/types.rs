//! Persistence types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::trip::{Itinerary, TripPreferences};

/// Where a plan ended up.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StorageKind {
    /// Shared, account-backed storage.
    Durable,
    /// Storage on this node only.
    Local,
}

impl StorageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageKind::Durable => "durable",
            StorageKind::Local => "local",
        }
    }
}

/// Returned by the sink for a successful save.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PersistReceipt {
    /// Share code for durable plans, plan id for local ones.
    pub reference: String,
    pub kind: StorageKind,
    pub saved_at: DateTime<Utc>,
}

/// A saved plan as read back from a store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredPlan {
    pub id: String,
    pub share_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    pub destination: String,
    pub duration_days: u32,
    pub preferences: TripPreferences,
    pub itinerary: Itinerary,
    pub created_at: DateTime<Utc>,
}

impl StoredPlan {
    /// Build a plan record for a fresh save.
    pub fn new(owner: Option<&str>, preferences: &TripPreferences, itinerary: &Itinerary) -> Self {
        let id = uuid::Uuid::new_v4().to_string();
        let created_at = Utc::now();
        Self {
            share_code: share_code(&id, &created_at),
            id,
            owner: owner.map(str::to_string),
            destination: itinerary.destination.clone(),
            duration_days: itinerary.duration_days(),
            preferences: preferences.clone(),
            itinerary: itinerary.clone(),
            created_at,
        }
    }
}

/// Short, URL-safe code derived from the plan id.
pub fn share_code(id: &str, created_at: &DateTime<Utc>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(id.as_bytes());
    hasher.update(created_at.to_rfc3339().as_bytes());
    hasher
        .finalize()
        .iter()
        .take(6)
        .map(|b| format!("{:02x}", b))
        .collect()
}
