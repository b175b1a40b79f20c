use std::sync::atomic::{AtomicBool, Ordering};

use crate::models::user::{PERMISSION_ADMIN, PERMISSION_ORDINARY};
use crate::store::{StoreError, UserStore};

/// Decides whether a first-time registrant becomes the administrator.
///
/// "Does any user exist?" only ever moves from no to yes (deletion does not
/// reset it), so a positive answer is cached for the process lifetime and
/// later registrations skip the query. The gate is held in `AppState` and
/// injected into the registration path, so tests construct isolated
/// instances instead of sharing a process global.
pub struct BootstrapGate {
    user_seen: AtomicBool,
}

impl BootstrapGate {
    pub fn new() -> Self {
        Self {
            user_seen: AtomicBool::new(false),
        }
    }

    /// Memoized existence check.
    ///
    /// A negative result is never cached: until the first user is observed,
    /// every call performs a real query, so concurrent first registrations
    /// keep looking at the actual table.
    pub fn any_user_exists(&self, store: &UserStore) -> Result<bool, StoreError> {
        if self.user_seen.load(Ordering::Acquire) {
            return Ok(true);
        }
        let exists = store.any_user()?;
        if exists {
            self.user_seen.store(true, Ordering::Release);
        }
        Ok(exists)
    }

    /// Permission for a new registrant: admin for the very first user ever,
    /// ordinary for everyone after.
    ///
    /// The second direct check narrows the window between two concurrent
    /// first registrations but does not close it; exactly-once admin grant
    /// is best-effort, not guaranteed.
    pub fn permission_for_new_user(&self, store: &UserStore) -> Result<i64, StoreError> {
        if self.any_user_exists(store)? {
            return Ok(PERMISSION_ORDINARY);
        }
        if store.any_user()? {
            return Ok(PERMISSION_ORDINARY);
        }
        self.user_seen.store(true, Ordering::Release);
        Ok(PERMISSION_ADMIN)
    }
}

impl Default for BootstrapGate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ProviderProfile;

    fn memory_store() -> UserStore {
        UserStore::open(":memory:").unwrap()
    }

    fn register(store: &UserStore, gate: &BootstrapGate, openid: &str) -> i64 {
        let profile = ProviderProfile {
            openid: openid.to_string(),
            username: format!("user-{}", openid),
            avatar: None,
        };
        store.upsert_from_provider(&profile, gate).unwrap().permission
    }

    #[test]
    fn empty_store_reports_no_user_and_does_not_cache() {
        let store = memory_store();
        let gate = BootstrapGate::new();

        assert!(!gate.any_user_exists(&store).unwrap());
        // Still a real query, still false.
        assert!(!gate.any_user_exists(&store).unwrap());
    }

    #[test]
    fn existence_flips_cache_permanently() {
        let store = memory_store();
        let gate = BootstrapGate::new();

        register(&store, &BootstrapGate::new(), "1");

        assert!(gate.any_user_exists(&store).unwrap());
        // Served from cache even if the table were to empty out.
        store.delete_by_id(1).unwrap();
        assert!(gate.any_user_exists(&store).unwrap());
    }

    #[test]
    fn first_grant_is_admin_and_flips_cache() {
        let store = memory_store();
        let gate = BootstrapGate::new();

        assert_eq!(gate.permission_for_new_user(&store).unwrap(), PERMISSION_ADMIN);
        // The grant itself marks the gate; the next registrant is ordinary
        // even before the first row lands.
        assert_eq!(gate.permission_for_new_user(&store).unwrap(), PERMISSION_ORDINARY);
    }

    #[test]
    fn populated_store_grants_ordinary() {
        let store = memory_store();
        register(&store, &BootstrapGate::new(), "1");

        let gate = BootstrapGate::new();
        assert_eq!(gate.permission_for_new_user(&store).unwrap(), PERMISSION_ORDINARY);
    }

    #[test]
    fn double_check_catches_row_inserted_after_cold_cache_read() {
        let store = memory_store();
        let gate = BootstrapGate::new();

        // Cold cache observes an empty table.
        assert!(!gate.any_user_exists(&store).unwrap());

        // Another registration lands in between.
        register(&store, &BootstrapGate::new(), "1");

        // The direct re-check inside the grant path sees the new row.
        assert_eq!(gate.permission_for_new_user(&store).unwrap(), PERMISSION_ORDINARY);
    }
}
