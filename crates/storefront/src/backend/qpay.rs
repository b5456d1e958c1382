//! QPay gateway endpoints.
//!
//! The backend proxies the gateway; invoice creation and settlement
//! checks are the only two operations the client ever needs.

use gobi_eats_core::{InvoiceId, OrderId, Price};
use secrecy::SecretString;
use tracing::instrument;

use super::types::{InvoiceCheck, InvoicePayload};
use super::{BackendClient, BackendError};

impl BackendClient {
    /// Create a payment invoice for an order total.
    ///
    /// # Errors
    ///
    /// Returns an error when the request fails or the body is
    /// unparseable.
    #[instrument(skip(self, token))]
    pub async fn create_invoice(
        &self,
        order: &OrderId,
        amount: Price,
        token: &SecretString,
    ) -> Result<InvoicePayload, BackendError> {
        let body = serde_json::json!({ "orderId": order, "amount": amount });
        self.post_json("qpay/create", &body, Some(token)).await
    }

    /// Ask the gateway whether an invoice has settled.
    ///
    /// # Errors
    ///
    /// Returns an error when the request fails or the body is
    /// unparseable.
    #[instrument(skip(self, token))]
    pub async fn check_invoice(
        &self,
        invoice: &InvoiceId,
        token: &SecretString,
    ) -> Result<bool, BackendError> {
        let body = serde_json::json!({ "invoiceId": invoice });
        let check: InvoiceCheck = self.post_json("qpay/check", &body, Some(token)).await?;
        Ok(check.paid)
    }
}
