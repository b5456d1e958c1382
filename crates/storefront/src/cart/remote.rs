//! Server cart client.
//!
//! Authoritative while the user is signed in. The [`CartRemote`] trait
//! is the seam services are written against, so they can be exercised
//! with an in-process fake; [`BackendClient`] is the production
//! implementation.
//!
//! [`ServerCart`] layers the user-facing failure contract on top: a
//! failed load notifies the user and reads as an empty cart ("could
//! not confirm", not "no items"), mutation failures notify and report
//! `false`, and nothing at this layer retries automatically.

use gobi_eats_core::{CartLineId, FoodId, UserId};
use secrecy::SecretString;
use tracing::warn;

use crate::backend::{BackendClient, BackendError};
use crate::cart::line::{self, CartLine};
use crate::cart::CartEvents;
use crate::notify::Notifier;

/// Remote cart operations.
pub trait CartRemote {
    /// Load the account cart.
    async fn load(
        &self,
        user: &UserId,
        token: &SecretString,
    ) -> Result<Vec<CartLine>, BackendError>;

    /// Upload the full guest cart in one request.
    async fn sync(
        &self,
        user: &UserId,
        items: &[CartLine],
        token: &SecretString,
    ) -> Result<(), BackendError>;

    /// Add one item to the account cart.
    async fn add(
        &self,
        user: &UserId,
        food: &FoodId,
        quantity: u32,
        selected_size: Option<&str>,
        token: &SecretString,
    ) -> Result<(), BackendError>;

    /// Set the quantity of one cart line.
    async fn update_quantity(
        &self,
        line: &CartLineId,
        quantity: u32,
        token: &SecretString,
    ) -> Result<(), BackendError>;

    /// Remove one cart line.
    async fn remove(&self, line: &CartLineId, token: &SecretString) -> Result<(), BackendError>;

    /// Empty the account cart.
    async fn clear(&self, user: &UserId, token: &SecretString) -> Result<(), BackendError>;
}

impl CartRemote for BackendClient {
    async fn load(
        &self,
        user: &UserId,
        token: &SecretString,
    ) -> Result<Vec<CartLine>, BackendError> {
        Ok(line::normalize_lines(self.fetch_cart(user, token).await?))
    }

    async fn sync(
        &self,
        user: &UserId,
        items: &[CartLine],
        token: &SecretString,
    ) -> Result<(), BackendError> {
        self.sync_cart(user, items, token).await
    }

    async fn add(
        &self,
        user: &UserId,
        food: &FoodId,
        quantity: u32,
        selected_size: Option<&str>,
        token: &SecretString,
    ) -> Result<(), BackendError> {
        self.add_cart_line(user, food, quantity, selected_size, token)
            .await
    }

    async fn update_quantity(
        &self,
        line: &CartLineId,
        quantity: u32,
        token: &SecretString,
    ) -> Result<(), BackendError> {
        self.update_cart_line(line, quantity, token).await
    }

    async fn remove(&self, line: &CartLineId, token: &SecretString) -> Result<(), BackendError> {
        self.remove_cart_line(line, token).await
    }

    async fn clear(&self, user: &UserId, token: &SecretString) -> Result<(), BackendError> {
        self.clear_cart(user, token).await
    }
}

/// Account cart with the user-facing failure contract applied.
#[derive(Clone)]
pub struct ServerCart<R> {
    remote: R,
    notifier: Notifier,
    events: CartEvents,
}

impl<R: CartRemote> ServerCart<R> {
    pub const fn new(remote: R, notifier: Notifier, events: CartEvents) -> Self {
        Self {
            remote,
            notifier,
            events,
        }
    }

    /// Load the account cart. On failure the user is notified and the
    /// result reads as empty - the caller must treat empty as "could
    /// not confirm", not "no items exist".
    pub async fn load(&self, user: &UserId, token: &SecretString) -> Vec<CartLine> {
        match self.remote.load(user, token).await {
            Ok(lines) => lines,
            Err(error) => {
                warn!(%error, "failed to load account cart");
                self.notifier
                    .error("Could not load your cart. Please try again.");
                Vec::new()
            }
        }
    }

    /// Add one item. Reports success; failure is notified.
    pub async fn add(&self, user: &UserId, item: &CartLine, token: &SecretString) -> bool {
        match self
            .remote
            .add(
                user,
                &item.food_id,
                item.quantity,
                item.selected_size.as_deref(),
                token,
            )
            .await
        {
            Ok(()) => {
                self.events.changed();
                true
            }
            Err(error) => {
                warn!(%error, "failed to add cart line");
                self.notifier
                    .error("Could not add the item to your cart.");
                false
            }
        }
    }

    /// Upload the guest cart. Reports success; failure is notified.
    pub async fn sync(&self, user: &UserId, items: &[CartLine], token: &SecretString) -> bool {
        match self.remote.sync(user, items, token).await {
            Ok(()) => {
                self.events.changed();
                true
            }
            Err(error) => {
                warn!(%error, "cart sync failed");
                self.notifier
                    .error("Could not move your cart to your account.");
                false
            }
        }
    }

    /// Set a line's quantity. Reports success; failure is notified.
    pub async fn update_quantity(
        &self,
        line: &CartLineId,
        quantity: u32,
        token: &SecretString,
    ) -> bool {
        match self.remote.update_quantity(line, quantity, token).await {
            Ok(()) => {
                self.events.changed();
                true
            }
            Err(error) => {
                warn!(%error, "failed to update cart line");
                self.notifier.error("Could not update the item quantity.");
                false
            }
        }
    }

    /// Remove a line. Reports success; failure is notified.
    pub async fn remove(&self, line: &CartLineId, token: &SecretString) -> bool {
        match self.remote.remove(line, token).await {
            Ok(()) => {
                self.events.changed();
                true
            }
            Err(error) => {
                warn!(%error, "failed to remove cart line");
                self.notifier.error("Could not remove the item.");
                false
            }
        }
    }

    /// Empty the account cart. Reports success; failure is notified.
    pub async fn clear(&self, user: &UserId, token: &SecretString) -> bool {
        match self.remote.clear(user, token).await {
            Ok(()) => {
                self.events.changed();
                true
            }
            Err(error) => {
                warn!(%error, "failed to clear account cart");
                self.notifier.error("Could not clear your cart.");
                false
            }
        }
    }
}
