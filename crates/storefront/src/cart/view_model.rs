//! Single reactive cart surface for the UI.
//!
//! Presents `items`, `total`, and `item_count` regardless of which
//! store is authoritative. Mutations follow the optimistic contract:
//! apply the tentative change to the in-memory snapshot immediately,
//! issue the authoritative-store mutation, and on failure replace the
//! tentative state wholesale with an authoritative reload - the UI
//! never shows an unconfirmed state indefinitely.

use std::sync::{Arc, PoisonError, RwLock};

use gobi_eats_core::Price;
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

use crate::auth::AuthSession;
use crate::cart::line::{self, CartLine};
use crate::cart::local::LocalCartStore;
use crate::cart::remote::{CartRemote, ServerCart};
use crate::cart::sync::{CartMode, CartReconciler};
use crate::cart::CartEvents;
use crate::error::AppError;
use crate::notify::Notifier;

/// Derived cart state the UI renders from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CartSnapshot {
    pub items: Vec<CartLine>,
    /// Sum of line totals. The delivery fee is added at checkout, not
    /// here.
    pub total: Price,
    /// Total number of units across all lines.
    pub item_count: u32,
}

impl CartSnapshot {
    /// Empty cart.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Derive totals from a list of lines.
    #[must_use]
    pub fn from_items(items: Vec<CartLine>) -> Self {
        let total = items.iter().map(CartLine::line_total).sum();
        let item_count = items.iter().map(|l| l.quantity).sum();
        Self {
            items,
            total,
            item_count,
        }
    }
}

/// Reactive cart view model over whichever store is authoritative.
pub struct CartViewModel<R> {
    reconciler: Arc<CartReconciler<R>>,
    local: LocalCartStore,
    server: ServerCart<R>,
    auth: AuthSession,
    events: CartEvents,
    notifier: Notifier,
    state: RwLock<CartSnapshot>,
}

impl<R: CartRemote> CartViewModel<R> {
    #[must_use]
    pub fn new(
        reconciler: Arc<CartReconciler<R>>,
        local: LocalCartStore,
        server: ServerCart<R>,
        auth: AuthSession,
        events: CartEvents,
        notifier: Notifier,
    ) -> Self {
        Self {
            reconciler,
            local,
            server,
            auth,
            events,
            notifier,
            state: RwLock::new(CartSnapshot::empty()),
        }
    }

    /// Current derived cart state.
    #[must_use]
    pub fn snapshot(&self) -> CartSnapshot {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Reload from whichever store is authoritative right now.
    pub async fn refresh(&self) -> CartSnapshot {
        let items = match self.reconciler.mode() {
            CartMode::Guest => self.local.load(),
            CartMode::Authenticated => match self.auth.current() {
                Some(credentials) => {
                    self.server
                        .load(&credentials.user_id, &credentials.token)
                        .await
                }
                None => Vec::new(),
            },
        };
        let snapshot = CartSnapshot::from_items(items);
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = snapshot.clone();
        snapshot
    }

    /// Refresh on every cart change announcement, until every publisher
    /// is gone. The embedding UI spawns this once per view model.
    pub async fn watch(&self) {
        let mut events = self.events.subscribe();
        loop {
            match events.recv().await {
                // A lagged receiver only means announcements were
                // coalesced; one reload catches up.
                Ok(_) | Err(RecvError::Lagged(_)) => {
                    self.refresh().await;
                }
                Err(RecvError::Closed) => break,
            }
        }
    }

    /// Add `item` to the cart, merging with an existing line for the
    /// same food and size.
    pub async fn add_item(&self, item: CartLine) {
        self.apply_optimistic(|lines| line::merge_line(lines, item.clone()));

        match self.reconciler.mode() {
            CartMode::Guest => {
                if let Err(error) = self.local.add(item) {
                    warn!(%error, "failed to persist added item");
                    self.notifier.error(AppError::from(error).user_message());
                    self.refresh().await;
                }
            }
            CartMode::Authenticated => {
                let Some(credentials) = self.auth.current() else {
                    self.refresh().await;
                    return;
                };
                if !self
                    .server
                    .add(&credentials.user_id, &item, &credentials.token)
                    .await
                {
                    self.refresh().await;
                }
            }
        }
    }

    /// Change the quantity of the line matching `item` by `delta`,
    /// floored at one.
    pub async fn update_quantity(&self, item: &CartLine, delta: i64) {
        let quantity = line::clamp_quantity(i64::from(item.quantity) + delta);

        self.apply_optimistic(|lines| {
            if let Some(found) = lines.iter_mut().find(|l| l.matches(item)) {
                found.quantity = quantity;
            }
        });

        match self.reconciler.mode() {
            CartMode::Guest => {
                if let Err(error) = self.local.set_quantity(item, i64::from(quantity)) {
                    warn!(%error, "failed to persist quantity change");
                    self.notifier.error(AppError::from(error).user_message());
                    self.refresh().await;
                }
            }
            CartMode::Authenticated => match &item.id {
                Some(line_id) => {
                    let Some(credentials) = self.auth.current() else {
                        self.refresh().await;
                        return;
                    };
                    if !self
                        .server
                        .update_quantity(line_id, quantity, &credentials.token)
                        .await
                    {
                        self.refresh().await;
                    }
                }
                None => self.reload_inconsistent("update").await,
            },
        }
    }

    /// Remove the line matching `item`.
    pub async fn remove_item(&self, item: &CartLine) {
        self.apply_optimistic(|lines| lines.retain(|l| !l.matches(item)));

        match self.reconciler.mode() {
            CartMode::Guest => {
                if let Err(error) = self.local.remove(item) {
                    warn!(%error, "failed to persist item removal");
                    self.notifier.error(AppError::from(error).user_message());
                    self.refresh().await;
                }
            }
            CartMode::Authenticated => match &item.id {
                Some(line_id) => {
                    let Some(credentials) = self.auth.current() else {
                        self.refresh().await;
                        return;
                    };
                    if !self.server.remove(line_id, &credentials.token).await {
                        self.refresh().await;
                    }
                }
                None => self.reload_inconsistent("remove").await,
            },
        }
    }

    /// Empty the authoritative cart.
    pub async fn clear_cart(&self) {
        self.apply_optimistic(Vec::clear);

        match self.reconciler.mode() {
            CartMode::Guest => {
                if let Err(error) = self.local.clear() {
                    warn!(%error, "failed to clear guest cart");
                    self.notifier.error(AppError::from(error).user_message());
                    self.refresh().await;
                }
            }
            CartMode::Authenticated => {
                let Some(credentials) = self.auth.current() else {
                    self.refresh().await;
                    return;
                };
                if !self
                    .server
                    .clear(&credentials.user_id, &credentials.token)
                    .await
                {
                    self.refresh().await;
                }
            }
        }
    }

    /// An account-mode line without its server id is stale client
    /// state; reload instead of guessing which line to touch.
    async fn reload_inconsistent(&self, operation: &str) {
        warn!(operation, "cart line missing server id, reloading");
        self.refresh().await;
    }

    fn apply_optimistic(&self, mutate: impl FnOnce(&mut Vec<CartLine>)) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let mut items = state.items.clone();
        mutate(&mut items);
        *state = CartSnapshot::from_items(items);
    }
}
