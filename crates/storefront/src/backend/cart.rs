//! Cart endpoints.

use gobi_eats_core::{CartLineId, FoodId, UserId};
use secrecy::SecretString;
use tracing::instrument;

use super::{BackendClient, BackendError};
use crate::cart::line::{CartLine, RawCartLine};

impl BackendClient {
    /// Load the server cart for `user`.
    ///
    /// Lines come back in whatever shape the backend stored them;
    /// callers normalize before use.
    ///
    /// # Errors
    ///
    /// Returns an error when the request fails or the body is
    /// unparseable.
    #[instrument(skip(self, token))]
    pub async fn fetch_cart(
        &self,
        user: &UserId,
        token: &SecretString,
    ) -> Result<Vec<RawCartLine>, BackendError> {
        self.get_json(&format!("cart/{user}"), Some(token)).await
    }

    /// Add one item to the server cart.
    ///
    /// # Errors
    ///
    /// Returns an error when the request fails.
    #[instrument(skip(self, token))]
    pub async fn add_cart_line(
        &self,
        user: &UserId,
        food: &FoodId,
        quantity: u32,
        selected_size: Option<&str>,
        token: &SecretString,
    ) -> Result<(), BackendError> {
        let body = serde_json::json!({
            "userId": user,
            "foodId": food,
            "quantity": quantity,
            "selectedSize": selected_size,
        });
        self.post_unit("cart/add", &body, Some(token)).await
    }

    /// Set the quantity of a server cart line.
    ///
    /// # Errors
    ///
    /// Returns an error when the request fails.
    #[instrument(skip(self, token))]
    pub async fn update_cart_line(
        &self,
        line: &CartLineId,
        quantity: u32,
        token: &SecretString,
    ) -> Result<(), BackendError> {
        let body = serde_json::json!({ "id": line, "quantity": quantity });
        self.post_unit("cart/update", &body, Some(token)).await
    }

    /// Remove a server cart line.
    ///
    /// # Errors
    ///
    /// Returns an error when the request fails.
    #[instrument(skip(self, token))]
    pub async fn remove_cart_line(
        &self,
        line: &CartLineId,
        token: &SecretString,
    ) -> Result<(), BackendError> {
        let body = serde_json::json!({ "id": line });
        self.post_unit("cart/remove", &body, Some(token)).await
    }

    /// Empty the server cart for `user`.
    ///
    /// # Errors
    ///
    /// Returns an error when the request fails.
    #[instrument(skip(self, token))]
    pub async fn clear_cart(
        &self,
        user: &UserId,
        token: &SecretString,
    ) -> Result<(), BackendError> {
        let body = serde_json::json!({ "userId": user });
        self.post_unit("cart/clear", &body, Some(token)).await
    }

    /// Upload the full guest cart in one request.
    ///
    /// Local lines never carry a server id, so the canonical
    /// serialization simply omits the field.
    ///
    /// # Errors
    ///
    /// Returns an error when the request fails.
    #[instrument(skip(self, items, token), fields(item_count = items.len()))]
    pub async fn sync_cart(
        &self,
        user: &UserId,
        items: &[CartLine],
        token: &SecretString,
    ) -> Result<(), BackendError> {
        let body = serde_json::json!({ "userId": user, "items": items });
        self.post_unit("cart/sync", &body, Some(token)).await
    }
}
