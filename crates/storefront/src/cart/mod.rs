//! Cart domain: guest and server carts, reconciliation, view model.
//!
//! # Architecture
//!
//! Exactly one cart store is authoritative at any moment:
//!
//! - signed out → the guest cart in client-side storage ([`local`])
//! - signed in (after migration) → the account cart on the backend
//!   ([`remote`])
//!
//! [`sync`] owns the transition: the one-time migration of guest cart
//! contents into the account at sign-in, with rollback on failure.
//! [`view_model`] is the single surface the UI reads, whichever store
//! is behind it.
//!
//! Both stores announce mutations on the payload-free [`CartEvents`]
//! broadcast; subscribers re-read their store rather than patching
//! state from event payloads.

pub mod line;
pub mod local;
pub mod remote;
pub mod sync;
pub mod view_model;

pub use line::{CartLine, FoodSnapshot, RawCartLine};
pub use local::LocalCartStore;
pub use remote::{CartRemote, ServerCart};
pub use sync::{CartMode, CartReconciler};
pub use view_model::{CartSnapshot, CartViewModel};

use tokio::sync::broadcast;

const EVENT_CAPACITY: usize = 16;

/// A cart-changed announcement. Deliberately payload-free: receivers
/// re-read the authoritative store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartEvent {
    Changed,
}

/// Broadcast handle shared by every cart store and subscriber.
#[derive(Debug, Clone)]
pub struct CartEvents {
    tx: broadcast::Sender<CartEvent>,
}

impl CartEvents {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self { tx }
    }

    /// Subscribe to change announcements.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<CartEvent> {
        self.tx.subscribe()
    }

    /// Announce that some cart store changed. Fire-and-forget.
    pub fn changed(&self) {
        let _ = self.tx.send(CartEvent::Changed);
    }
}

impl Default for CartEvents {
    fn default() -> Self {
        Self::new()
    }
}
