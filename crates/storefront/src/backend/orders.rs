//! Order endpoints.

use gobi_eats_core::{OrderId, Price};
use secrecy::SecretString;
use tracing::instrument;

use super::types::{CardSession, CreateOrderRequest, CreateOrderResponse, Order};
use super::{BackendClient, BackendError};

impl BackendClient {
    /// Create an order from the current cart contents.
    ///
    /// # Errors
    ///
    /// Returns an error when the request fails or the body is
    /// unparseable.
    #[instrument(skip(self, request, token), fields(item_count = request.items.len()))]
    pub async fn create_order(
        &self,
        request: &CreateOrderRequest,
        token: &SecretString,
    ) -> Result<Order, BackendError> {
        let response: CreateOrderResponse = self.post_json("order", request, Some(token)).await?;
        Ok(response.order)
    }

    /// Fetch an order. Bearer auth is optional depending on the flow
    /// (the payment-pending view may resume before sign-in restores).
    ///
    /// # Errors
    ///
    /// Returns an error when the request fails or the body is
    /// unparseable.
    #[instrument(skip(self, token))]
    pub async fn fetch_order(
        &self,
        order: &OrderId,
        token: Option<&SecretString>,
    ) -> Result<Order, BackendError> {
        self.get_json(&format!("order/{order}"), token).await
    }

    /// Request a hosted card checkout session for an order.
    ///
    /// # Errors
    ///
    /// Returns an error when the request fails or the body is
    /// unparseable.
    #[instrument(skip(self, token))]
    pub async fn create_card_session(
        &self,
        order: &OrderId,
        total_price: Price,
        token: &SecretString,
    ) -> Result<CardSession, BackendError> {
        let body = serde_json::json!({ "orderId": order, "totalPrice": total_price });
        self.post_json("stripe/create-session", &body, Some(token))
            .await
    }
}
