use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{AppError, AppResult};
use crate::models::Snapshot;
use tracing;

/// Owns the on-disk backup document. The full snapshot is rewritten on every
/// save; the write goes to a sibling temp file first and is renamed over the
/// target so a crash mid-write never leaves a truncated document.
pub struct BackupService {
    path: PathBuf,
}

impl BackupService {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Loads the snapshot, returning empty defaults when no backup exists yet.
    pub fn load(&self) -> AppResult<Snapshot> {
        if !self.path.exists() {
            tracing::info!("No backup file at {}, starting empty", self.path.display());
            return Ok(Snapshot::default());
        }

        let data = fs::read_to_string(&self.path)
            .map_err(|e| AppError::Persistence(format!("read {}: {}", self.path.display(), e)))?;
        serde_json::from_str(&data)
            .map_err(|e| AppError::Persistence(format!("parse {}: {}", self.path.display(), e)))
    }

    pub fn save(&self, snapshot: &Snapshot) -> AppResult<()> {
        let data = serde_json::to_string_pretty(snapshot)
            .map_err(|e| AppError::Persistence(format!("serialize snapshot: {}", e)))?;

        let tmp_path = self.tmp_path();
        fs::write(&tmp_path, data)
            .map_err(|e| AppError::Persistence(format!("write {}: {}", tmp_path.display(), e)))?;
        fs::rename(&tmp_path, &self.path).map_err(|e| {
            AppError::Persistence(format!("rename into {}: {}", self.path.display(), e))
        })?;

        tracing::debug!("Backup flushed to {}", self.path.display());
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RegistryState;
    use std::collections::{HashMap, HashSet};
    use tempfile::TempDir;

    fn service_in(dir: &TempDir) -> BackupService {
        BackupService::new(dir.path().join("bot_backup.bak"))
    }

    #[test]
    fn missing_file_loads_empty_defaults() {
        let dir = TempDir::new().unwrap();
        let backup = service_in(&dir);
        assert_eq!(backup.load().unwrap(), Snapshot::default());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = TempDir::new().unwrap();
        let backup = service_in(&dir);

        let state = RegistryState {
            authorized: HashSet::from([111, 222]),
            usage: HashMap::from([(111, 4), (222, 90)]),
        };
        let snapshot = state.to_snapshot();

        backup.save(&snapshot).unwrap();
        assert_eq!(backup.load().unwrap(), snapshot);
    }

    #[test]
    fn saved_document_is_stable_across_rewrites() {
        let dir = TempDir::new().unwrap();
        let backup = service_in(&dir);

        let snapshot = RegistryState {
            authorized: HashSet::from([333, 111]),
            usage: HashMap::from([(111, 1)]),
        }
        .to_snapshot();

        backup.save(&snapshot).unwrap();
        let first = fs::read_to_string(backup.path()).unwrap();
        backup.save(&backup.load().unwrap()).unwrap();
        let second = fs::read_to_string(backup.path()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn no_temp_file_left_behind_after_save() {
        let dir = TempDir::new().unwrap();
        let backup = service_in(&dir);
        backup.save(&Snapshot::default()).unwrap();

        let entries: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec!["bot_backup.bak"]);
    }

    #[test]
    fn corrupt_file_is_a_persistence_error() {
        let dir = TempDir::new().unwrap();
        let backup = service_in(&dir);
        fs::write(backup.path(), "{not json").unwrap();
        assert!(matches!(
            backup.load(),
            Err(crate::errors::AppError::Persistence(_))
        ));
    }
}
