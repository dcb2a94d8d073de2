use std::sync::Mutex;

use crate::errors::{AppError, AppResult};
use crate::models::RegistryState;
use crate::services::BackupService;
use tracing;

/// Access control and quota bookkeeping over the in-memory mirror of the
/// backup document. Every mutating operation flushes the full snapshot before
/// returning, so the on-disk state never lags a user-visible acknowledgment.
///
/// The mutex covers the whole read-modify-write-flush sequence; the daily
/// reset task runs on a separate tokio task and must not interleave with a
/// command handler's mutation.
pub struct UserRegistry {
    state: Mutex<RegistryState>,
    backup: BackupService,
    admin_id: i64,
    daily_limit: u32,
}

impl UserRegistry {
    /// Re-derives the in-memory state from the backup store. A missing backup
    /// file yields an empty registry; an unreadable one is a startup failure.
    pub fn load(backup: BackupService, admin_id: i64, daily_limit: u32) -> AppResult<Self> {
        let state = RegistryState::from_snapshot(backup.load()?);
        tracing::info!(
            "Registry loaded: {} authorized users, {} usage records",
            state.authorized.len(),
            state.usage.len()
        );
        Ok(Self {
            state: Mutex::new(state),
            backup,
            admin_id,
            daily_limit,
        })
    }

    pub fn is_admin(&self, user_id: i64) -> bool {
        user_id == self.admin_id
    }

    pub fn is_authorized(&self, user_id: i64) -> bool {
        self.lock().authorized.contains(&user_id)
    }

    pub fn daily_limit(&self) -> u32 {
        self.daily_limit
    }

    /// Adds a user to the authorized set. Only the admin may grant access.
    pub fn grant(&self, caller_id: i64, user_id: i64) -> AppResult<()> {
        if !self.is_admin(caller_id) {
            return Err(AppError::Permission);
        }

        let mut state = self.lock();
        state.authorized.insert(user_id);
        self.backup.save(&state.to_snapshot())?;
        tracing::info!("User {} authorized by admin", user_id);
        Ok(())
    }

    /// Consumes one quota slot for the user and returns the remaining count
    /// for today. Denied without any state change once the ceiling is hit.
    pub fn check_and_increment(&self, user_id: i64) -> AppResult<u32> {
        let mut state = self.lock();
        let count = state.usage.entry(user_id).or_insert(0);
        if *count >= self.daily_limit {
            return Err(AppError::QuotaExceeded);
        }
        *count += 1;
        let remaining = self.daily_limit - *count;
        self.backup.save(&state.to_snapshot())?;
        Ok(remaining)
    }

    /// Returns a previously consumed slot, used when the lookup fails after
    /// the slot was reserved. A failed relay must not cost quota.
    pub fn release(&self, user_id: i64) {
        let mut state = self.lock();
        if let Some(count) = state.usage.get_mut(&user_id) {
            *count = count.saturating_sub(1);
        }
        if let Err(e) = self.backup.save(&state.to_snapshot()) {
            tracing::warn!("Failed to flush after releasing quota slot: {}", e);
        }
    }

    /// Zeroes every tracked counter; fired once per day at midnight.
    pub fn reset_all(&self) -> AppResult<()> {
        let mut state = self.lock();
        for count in state.usage.values_mut() {
            *count = 0;
        }
        self.backup.save(&state.to_snapshot())?;
        tracing::info!("Daily usage counters reset");
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RegistryState> {
        // A poisoned mutex means a panic mid-mutation; the state itself is
        // still structurally valid, so keep serving.
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const ADMIN: i64 = 5045936267;
    const LIMIT: u32 = 90;

    fn registry_in(dir: &TempDir) -> UserRegistry {
        let backup = BackupService::new(dir.path().join("bot_backup.bak"));
        UserRegistry::load(backup, ADMIN, LIMIT).unwrap()
    }

    #[test]
    fn admin_is_not_implicitly_authorized_for_queries() {
        let dir = TempDir::new().unwrap();
        let registry = registry_in(&dir);
        assert!(registry.is_admin(ADMIN));
        assert!(!registry.is_authorized(ADMIN));
    }

    #[test]
    fn grant_by_non_admin_is_rejected_without_mutation() {
        let dir = TempDir::new().unwrap();
        let registry = registry_in(&dir);

        assert!(matches!(
            registry.grant(222, 111),
            Err(AppError::Permission)
        ));
        assert!(!registry.is_authorized(111));
        // Rejection happens before any flush; no backup file is created.
        assert!(!dir.path().join("bot_backup.bak").exists());
    }

    #[test]
    fn grant_persists_across_reload() {
        let dir = TempDir::new().unwrap();
        {
            let registry = registry_in(&dir);
            registry.grant(ADMIN, 111).unwrap();
        }
        let reloaded = registry_in(&dir);
        assert!(reloaded.is_authorized(111));
    }

    #[test]
    fn quota_ceiling_scenario() {
        let dir = TempDir::new().unwrap();
        let registry = registry_in(&dir);
        registry.grant(ADMIN, 111).unwrap();

        // 90 queries succeed, counting down from 89 to 0.
        for n in 1..=LIMIT {
            let remaining = registry.check_and_increment(111).unwrap();
            assert_eq!(remaining, LIMIT - n);
        }

        // The 91st is denied and does not change the persisted state.
        assert!(matches!(
            registry.check_and_increment(111),
            Err(AppError::QuotaExceeded)
        ));
        let reloaded = registry_in(&dir);
        assert!(matches!(
            reloaded.check_and_increment(111),
            Err(AppError::QuotaExceeded)
        ));

        // After the daily reset the full ceiling is available again.
        registry.reset_all().unwrap();
        assert_eq!(registry.check_and_increment(111).unwrap(), LIMIT - 1);
    }

    #[test]
    fn release_returns_a_consumed_slot() {
        let dir = TempDir::new().unwrap();
        let registry = registry_in(&dir);

        assert_eq!(registry.check_and_increment(111).unwrap(), LIMIT - 1);
        registry.release(111);
        assert_eq!(registry.check_and_increment(111).unwrap(), LIMIT - 1);
    }

    #[test]
    fn release_without_a_record_is_a_no_op() {
        let dir = TempDir::new().unwrap();
        let registry = registry_in(&dir);
        registry.release(999);
        assert_eq!(registry.check_and_increment(999).unwrap(), LIMIT - 1);
    }

    #[test]
    fn reset_all_survives_reload() {
        let dir = TempDir::new().unwrap();
        {
            let registry = registry_in(&dir);
            registry.check_and_increment(111).unwrap();
            registry.check_and_increment(111).unwrap();
            registry.reset_all().unwrap();
        }
        let reloaded = registry_in(&dir);
        assert_eq!(reloaded.check_and_increment(111).unwrap(), LIMIT - 1);
    }
}
