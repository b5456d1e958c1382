//! Guest cart persisted in client-side storage.
//!
//! Authoritative while the user is signed out. Every mutation persists
//! synchronously and announces itself on the cart broadcast; a missing
//! or malformed payload reads as an empty cart, never an error.
//!
//! The store also owns the migration backup slot: a snapshot taken
//! just before the guest cart is uploaded to an account, kept until
//! the upload either succeeds (dropped) or fails (restored).

use std::sync::Arc;

use tracing::warn;

use crate::cart::line::{self, CartLine, RawCartLine};
use crate::cart::CartEvents;
use crate::storage::{keys, Storage, StorageError};

/// Cart store for unauthenticated sessions.
#[derive(Clone)]
pub struct LocalCartStore {
    storage: Arc<dyn Storage>,
    events: CartEvents,
}

impl LocalCartStore {
    /// Create the store and recover from any interrupted migration.
    #[must_use]
    pub fn new(storage: Arc<dyn Storage>, events: CartEvents) -> Self {
        let store = Self { storage, events };
        store.recover_interrupted_migration();
        store
    }

    /// Load the guest cart. Missing or malformed data is an empty cart.
    #[must_use]
    pub fn load(&self) -> Vec<CartLine> {
        let Some(payload) = self.storage.get(keys::CART) else {
            return Vec::new();
        };
        match serde_json::from_str::<Vec<RawCartLine>>(&payload) {
            Ok(raw) => line::normalize_lines(raw),
            Err(error) => {
                warn!(%error, "stored cart is malformed, treating as empty");
                Vec::new()
            }
        }
    }

    /// True when the guest cart holds no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.load().is_empty()
    }

    /// Add `item`, merging with an existing line for the same food and
    /// size.
    ///
    /// # Errors
    ///
    /// Returns an error when the cart cannot be persisted.
    pub fn add(&self, item: CartLine) -> Result<(), StorageError> {
        let mut lines = self.load();
        line::merge_line(&mut lines, item);
        self.persist(&lines)
    }

    /// Set the quantity of the line matching `item`, clamped to the
    /// floor of one. No-op when no line matches.
    ///
    /// # Errors
    ///
    /// Returns an error when the cart cannot be persisted.
    pub fn set_quantity(&self, item: &CartLine, quantity: i64) -> Result<(), StorageError> {
        let mut lines = self.load();
        let Some(found) = lines.iter_mut().find(|l| l.matches(item)) else {
            return Ok(());
        };
        found.quantity = line::clamp_quantity(quantity);
        self.persist(&lines)
    }

    /// Remove the line matching `item`, if present.
    ///
    /// # Errors
    ///
    /// Returns an error when the cart cannot be persisted.
    pub fn remove(&self, item: &CartLine) -> Result<(), StorageError> {
        let mut lines = self.load();
        let before = lines.len();
        lines.retain(|l| !l.matches(item));
        if lines.len() == before {
            return Ok(());
        }
        self.persist(&lines)
    }

    /// Empty the store.
    ///
    /// # Errors
    ///
    /// Returns an error when the key cannot be removed.
    pub fn clear(&self) -> Result<(), StorageError> {
        self.storage.remove(keys::CART)?;
        self.events.changed();
        Ok(())
    }

    // =========================================================================
    // Migration backup slot
    // =========================================================================

    /// Snapshot `lines` into the backup slot.
    pub(crate) fn backup(&self, lines: &[CartLine]) -> Result<(), StorageError> {
        self.storage.set(keys::CART_BACKUP, &encode(lines)?)
    }

    /// Restore the cart from the backup slot and drop the backup.
    pub(crate) fn restore_backup(&self) -> Result<(), StorageError> {
        if let Some(snapshot) = self.storage.get(keys::CART_BACKUP) {
            self.storage.set(keys::CART, &snapshot)?;
        }
        self.storage.remove(keys::CART_BACKUP)?;
        self.events.changed();
        Ok(())
    }

    /// Drop the backup slot after a completed migration.
    pub(crate) fn clear_backup(&self) -> Result<(), StorageError> {
        self.storage.remove(keys::CART_BACKUP)
    }

    /// A backup with no primary cart means a migration was interrupted
    /// after the primary was cleared; restore the backup rather than
    /// silently losing the cart. A populated primary wins over a stale
    /// backup.
    fn recover_interrupted_migration(&self) {
        if self.storage.get(keys::CART_BACKUP).is_none() {
            return;
        }
        if self.storage.get(keys::CART).is_none() {
            if let Err(error) = self.restore_backup() {
                warn!(%error, "failed to restore interrupted cart backup");
            }
        } else if let Err(error) = self.clear_backup() {
            warn!(%error, "failed to drop stale cart backup");
        }
    }

    fn persist(&self, lines: &[CartLine]) -> Result<(), StorageError> {
        self.storage.set(keys::CART, &encode(lines)?)?;
        self.events.changed();
        Ok(())
    }
}

fn encode(lines: &[CartLine]) -> Result<String, StorageError> {
    Ok(serde_json::to_string(lines)?)
}
