//! Guest-to-account cart migration.
//!
//! When a guest signs in, their cart moves to the account exactly once:
//! snapshot to a backup slot, upload, then clear the guest cart. If the
//! upload fails the backup is restored and the guest cart stays
//! authoritative, so nothing is lost and the next sign-in retries.
//!
//! The upload is awaited to completion before the account cart is ever
//! read, so a load can never race a half-written sync.

use std::sync::{Mutex, PoisonError};

use tracing::{info, instrument, warn};

use crate::auth::Credentials;
use crate::cart::local::LocalCartStore;
use crate::cart::remote::{CartRemote, ServerCart};
use crate::cart::CartEvents;
use crate::notify::Notifier;

/// Which store is authoritative for cart reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CartMode {
    /// Guest cart in client-side storage.
    #[default]
    Guest,
    /// Account cart on the delivery backend.
    Authenticated,
}

#[derive(Default)]
struct ReconcilerState {
    mode: CartMode,
    /// Set on the first sign-in of a session; re-entry is a no-op
    /// until sign-out re-arms it.
    migrated: bool,
}

/// Orchestrates the one-time migration of guest cart contents into the
/// account cart at sign-in, with rollback on failure.
pub struct CartReconciler<R> {
    local: LocalCartStore,
    server: ServerCart<R>,
    events: CartEvents,
    notifier: Notifier,
    state: Mutex<ReconcilerState>,
}

impl<R: CartRemote> CartReconciler<R> {
    #[must_use]
    pub fn new(
        local: LocalCartStore,
        server: ServerCart<R>,
        events: CartEvents,
        notifier: Notifier,
    ) -> Self {
        Self {
            local,
            server,
            events,
            notifier,
            state: Mutex::new(ReconcilerState::default()),
        }
    }

    /// Store currently authoritative for cart reads and writes.
    #[must_use]
    pub fn mode(&self) -> CartMode {
        self.lock_state().mode
    }

    /// React to an auth session transition.
    ///
    /// Sign-out resets to guest mode and re-arms the migration guard.
    /// The first sign-in of a session migrates the guest cart into the
    /// account; firing the transition again (an effect re-run, a
    /// duplicate watch notification) is a no-op.
    #[instrument(skip_all, fields(signed_in = credentials.is_some()))]
    pub async fn on_auth_change(&self, credentials: Option<&Credentials>) {
        let Some(credentials) = credentials else {
            let mut state = self.lock_state();
            state.mode = CartMode::Guest;
            state.migrated = false;
            drop(state);
            self.events.changed();
            return;
        };

        {
            let mut state = self.lock_state();
            if state.migrated {
                return;
            }
            state.migrated = true;
        }

        self.migrate(credentials).await;
    }

    /// Migrate the guest cart into the account cart.
    async fn migrate(&self, credentials: &Credentials) {
        let items = self.local.load();
        if items.is_empty() {
            self.enter_mode(CartMode::Authenticated);
            return;
        }

        if let Err(error) = self.local.backup(&items) {
            warn!(%error, "could not snapshot guest cart before migration");
            self.notifier
                .error("Could not prepare your cart for sign-in.");
            return;
        }

        if self
            .server
            .sync(&credentials.user_id, &items, &credentials.token)
            .await
        {
            // The account owns the lines now. Drop the backup before the
            // primary so an interruption here cannot resurrect the cart.
            if let Err(error) = self.local.clear_backup() {
                warn!(%error, "failed to drop migration backup");
            }
            if let Err(error) = self.local.clear() {
                warn!(%error, "failed to clear guest cart after migration");
            }
            info!(item_count = items.len(), "guest cart migrated to account");
            self.enter_mode(CartMode::Authenticated);
        } else {
            // Upload failed; the guest cart stays authoritative and must
            // come back exactly as it was.
            if let Err(error) = self.local.restore_backup() {
                warn!(%error, "failed to restore guest cart after failed migration");
            }
        }
    }

    fn enter_mode(&self, mode: CartMode) {
        self.lock_state().mode = mode;
        self.events.changed();
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, ReconcilerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use gobi_eats_core::{CartLineId, FoodId, Price, UserId};
    use secrecy::SecretString;

    use super::*;
    use crate::backend::BackendError;
    use crate::cart::line::{CartLine, FoodSnapshot};
    use crate::storage::{keys, MemoryStorage, Storage};

    #[derive(Clone, Default)]
    struct FakeRemote {
        sync_calls: Arc<Mutex<Vec<Vec<CartLine>>>>,
        fail_sync: Arc<AtomicBool>,
        server_lines: Arc<Mutex<Vec<CartLine>>>,
    }

    impl FakeRemote {
        fn sync_count(&self) -> usize {
            self.sync_calls.lock().unwrap().len()
        }
    }

    impl CartRemote for FakeRemote {
        async fn load(
            &self,
            _user: &UserId,
            _token: &SecretString,
        ) -> Result<Vec<CartLine>, BackendError> {
            Ok(self.server_lines.lock().unwrap().clone())
        }

        async fn sync(
            &self,
            _user: &UserId,
            items: &[CartLine],
            _token: &SecretString,
        ) -> Result<(), BackendError> {
            self.sync_calls.lock().unwrap().push(items.to_vec());
            if self.fail_sync.load(Ordering::SeqCst) {
                return Err(BackendError::Api {
                    status: 500,
                    message: "sync rejected".to_string(),
                });
            }
            *self.server_lines.lock().unwrap() = items.to_vec();
            Ok(())
        }

        async fn add(
            &self,
            _user: &UserId,
            _food: &FoodId,
            _quantity: u32,
            _selected_size: Option<&str>,
            _token: &SecretString,
        ) -> Result<(), BackendError> {
            Ok(())
        }

        async fn update_quantity(
            &self,
            _line: &CartLineId,
            _quantity: u32,
            _token: &SecretString,
        ) -> Result<(), BackendError> {
            Ok(())
        }

        async fn remove(
            &self,
            _line: &CartLineId,
            _token: &SecretString,
        ) -> Result<(), BackendError> {
            Ok(())
        }

        async fn clear(
            &self,
            _user: &UserId,
            _token: &SecretString,
        ) -> Result<(), BackendError> {
            Ok(())
        }
    }

    struct Fixture {
        reconciler: CartReconciler<FakeRemote>,
        remote: FakeRemote,
        local: LocalCartStore,
        storage: MemoryStorage,
        notifier: Notifier,
    }

    fn fixture() -> Fixture {
        let storage = MemoryStorage::new();
        let events = CartEvents::new();
        let notifier = Notifier::new();
        let remote = FakeRemote::default();
        let local = LocalCartStore::new(Arc::new(storage.clone()), events.clone());
        let server = ServerCart::new(remote.clone(), notifier.clone(), events.clone());
        let reconciler =
            CartReconciler::new(local.clone(), server, events, notifier.clone());
        Fixture {
            reconciler,
            remote,
            local,
            storage,
            notifier,
        }
    }

    fn credentials() -> Credentials {
        Credentials::new(UserId::new("u-1"), SecretString::from("token"))
    }

    fn burger(quantity: u32) -> CartLine {
        CartLine {
            id: None,
            food_id: FoodId::new("f1"),
            quantity,
            selected_size: None,
            food: FoodSnapshot {
                id: FoodId::new("f1"),
                food_name: "Burger".to_string(),
                price: Price::from_tugrik(5000),
                image: "x".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn test_empty_guest_cart_skips_sync() {
        let f = fixture();
        f.reconciler.on_auth_change(Some(&credentials())).await;

        assert_eq!(f.reconciler.mode(), CartMode::Authenticated);
        assert_eq!(f.remote.sync_count(), 0);
    }

    #[tokio::test]
    async fn test_successful_migration_moves_cart() {
        let f = fixture();
        f.local.add(burger(2)).unwrap();

        f.reconciler.on_auth_change(Some(&credentials())).await;

        assert_eq!(f.reconciler.mode(), CartMode::Authenticated);
        let synced = f.remote.sync_calls.lock().unwrap().clone();
        assert_eq!(synced, vec![vec![burger(2)]]);
        assert!(f.local.is_empty());
        assert!(f.storage.get(keys::CART_BACKUP).is_none());
    }

    #[tokio::test]
    async fn test_failed_migration_restores_guest_cart_exactly() {
        let f = fixture();
        f.local.add(burger(1)).unwrap();
        let before = f.local.load();
        f.remote.fail_sync.store(true, Ordering::SeqCst);
        let mut notices = f.notifier.subscribe();

        f.reconciler.on_auth_change(Some(&credentials())).await;

        // No data loss, backup cleaned up, still in guest mode.
        assert_eq!(f.local.load(), before);
        assert!(f.storage.get(keys::CART_BACKUP).is_none());
        assert_eq!(f.reconciler.mode(), CartMode::Guest);
        assert!(notices.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_transition_fires_sync_at_most_once() {
        let f = fixture();
        f.local.add(burger(1)).unwrap();
        let creds = credentials();

        f.reconciler.on_auth_change(Some(&creds)).await;
        f.reconciler.on_auth_change(Some(&creds)).await;

        assert_eq!(f.remote.sync_count(), 1);
    }

    #[tokio::test]
    async fn test_sign_out_rearms_the_guard() {
        let f = fixture();
        f.local.add(burger(1)).unwrap();
        f.remote.fail_sync.store(true, Ordering::SeqCst);
        let creds = credentials();

        f.reconciler.on_auth_change(Some(&creds)).await;
        assert_eq!(f.remote.sync_count(), 1);

        // Still signed in: a re-fired transition must not retry.
        f.reconciler.on_auth_change(Some(&creds)).await;
        assert_eq!(f.remote.sync_count(), 1);

        // Sign out, sign back in: a fresh session retries the upload.
        f.reconciler.on_auth_change(None).await;
        assert_eq!(f.reconciler.mode(), CartMode::Guest);
        f.remote.fail_sync.store(false, Ordering::SeqCst);
        f.reconciler.on_auth_change(Some(&creds)).await;

        assert_eq!(f.remote.sync_count(), 2);
        assert_eq!(f.reconciler.mode(), CartMode::Authenticated);
    }
}
