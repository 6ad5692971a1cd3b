//! SQLite-backed durable plan store.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use super::{PersistenceError, PlanStore, StorageKind, StoredPlan};
use crate::trip::{Itinerary, TripPreferences};

/// SQLite-backed plan store. Plans are looked up by share code.
pub struct SqlitePlanStore {
    conn: Mutex<Connection>,
}

impl SqlitePlanStore {
    /// Open the store, creating the database file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, PersistenceError> {
        let conn = Connection::open(path)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self, PersistenceError> {
        let conn = Connection::open_in_memory()?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), PersistenceError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS plans (
                id TEXT PRIMARY KEY,
                share_code TEXT NOT NULL UNIQUE,
                owner TEXT,
                destination TEXT NOT NULL,
                duration_days INTEGER NOT NULL,
                preferences TEXT NOT NULL,
                itinerary TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_plans_owner ON plans(owner);
            CREATE INDEX IF NOT EXISTS idx_plans_created_at ON plans(created_at);
            "#,
        )?;
        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, PersistenceError> {
        self.conn
            .lock()
            .map_err(|_| PersistenceError::Database("connection lock poisoned".to_string()))
    }

    /// Number of stored plans.
    pub fn count(&self) -> Result<u64, PersistenceError> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM plans", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn row_to_plan(row: &rusqlite::Row) -> rusqlite::Result<PlanRow> {
        Ok(PlanRow {
            id: row.get(0)?,
            share_code: row.get(1)?,
            owner: row.get(2)?,
            destination: row.get(3)?,
            duration_days: row.get(4)?,
            preferences: row.get(5)?,
            itinerary: row.get(6)?,
            created_at: row.get(7)?,
        })
    }
}

/// Raw row; JSON columns are decoded outside rusqlite so failures surface
/// as serialization errors.
struct PlanRow {
    id: String,
    share_code: String,
    owner: Option<String>,
    destination: String,
    duration_days: u32,
    preferences: String,
    itinerary: String,
    created_at: String,
}

impl PlanRow {
    fn into_plan(self) -> Result<StoredPlan, PersistenceError> {
        let created_at = DateTime::parse_from_rfc3339(&self.created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        Ok(StoredPlan {
            id: self.id,
            share_code: self.share_code,
            owner: self.owner,
            destination: self.destination,
            duration_days: self.duration_days,
            preferences: serde_json::from_str(&self.preferences)?,
            itinerary: serde_json::from_str(&self.itinerary)?,
            created_at,
        })
    }
}

impl PlanStore for SqlitePlanStore {
    fn kind(&self) -> StorageKind {
        StorageKind::Durable
    }

    fn save(
        &self,
        owner: Option<&str>,
        preferences: &TripPreferences,
        itinerary: &Itinerary,
    ) -> Result<StoredPlan, PersistenceError> {
        let plan = StoredPlan::new(owner, preferences, itinerary);
        let preferences_json = serde_json::to_string(&plan.preferences)?;
        let itinerary_json = serde_json::to_string(&plan.itinerary)?;

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO plans (id, share_code, owner, destination, duration_days, preferences, itinerary, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                plan.id,
                plan.share_code,
                plan.owner,
                plan.destination,
                plan.duration_days,
                preferences_json,
                itinerary_json,
                plan.created_at.to_rfc3339(),
            ],
        )?;

        Ok(plan)
    }

    fn get(&self, reference: &str) -> Result<Option<StoredPlan>, PersistenceError> {
        let conn = self.conn()?;

        let result = conn.query_row(
            "SELECT id, share_code, owner, destination, duration_days, preferences, itinerary, created_at FROM plans WHERE share_code = ?",
            params![reference],
            Self::row_to_plan,
        );

        match result {
            Ok(row) => row.into_plan().map(Some),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
