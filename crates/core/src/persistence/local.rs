//! Local fallback store: one JSON file per plan.

use std::fs;
use std::path::{Path, PathBuf};

use super::{PersistenceError, PlanStore, StorageKind, StoredPlan};
use crate::trip::{Itinerary, TripPreferences};

/// Writes plans as `<dir>/<id>.json`. The plan id doubles as its reference.
pub struct JsonFilePlanStore {
    dir: PathBuf,
}

impl JsonFilePlanStore {
    /// Use `dir` for plan files, creating it if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| PersistenceError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, reference: &str) -> Result<PathBuf, PersistenceError> {
        let valid = !reference.is_empty()
            && reference
                .chars()
                .all(|c| c.is_ascii_hexdigit() || c == '-');
        if !valid {
            return Err(PersistenceError::InvalidReference(reference.to_string()));
        }
        Ok(self.dir.join(format!("{}.json", reference)))
    }
}

impl PlanStore for JsonFilePlanStore {
    fn kind(&self) -> StorageKind {
        StorageKind::Local
    }

    fn save(
        &self,
        owner: Option<&str>,
        preferences: &TripPreferences,
        itinerary: &Itinerary,
    ) -> Result<StoredPlan, PersistenceError> {
        let mut plan = StoredPlan::new(owner, preferences, itinerary);
        plan.share_code = plan.id.clone();

        let path = self.path_for(&plan.id)?;
        let json = serde_json::to_vec_pretty(&plan)?;

        // Write-then-rename so readers never see a partial file.
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|source| PersistenceError::Io {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &path).map_err(|source| PersistenceError::Io {
            path: path.clone(),
            source,
        })?;

        Ok(plan)
    }

    fn get(&self, reference: &str) -> Result<Option<StoredPlan>, PersistenceError> {
        let path = match self.path_for(reference) {
            Ok(path) => path,
            Err(PersistenceError::InvalidReference(_)) => return Ok(None),
            Err(e) => return Err(e),
        };

        match fs::read(&path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(PersistenceError::Io { path, source }),
        }
    }
}
