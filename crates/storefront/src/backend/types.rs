//! Wire types for the delivery backend REST API.
//!
//! Request bodies are camelCase; QPay responses use the gateway's own
//! snake_case field names.

use chrono::{DateTime, Utc};
use gobi_eats_core::{InvoiceId, OrderId, OrderStatus, Price, UserId};
use serde::{Deserialize, Serialize};

use crate::cart::line::CartLine;

/// How the user pays for an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// QPay invoice, settled by scanning the QR payload.
    Qpay,
    /// Hosted card checkout session.
    Card,
    /// Cash on delivery.
    Cod,
}

/// Body of `POST /order`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub user_id: UserId,
    pub items: Vec<CartLine>,
    /// Cart total plus the delivery fee.
    pub total_price: Price,
    pub payment_method: PaymentMethod,
}

/// Order as returned by the delivery backend.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub status: OrderStatus,
    pub total_price: Price,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Envelope of `POST /order`.
#[derive(Debug, Deserialize)]
pub(crate) struct CreateOrderResponse {
    pub order: Order,
}

/// QPay invoice payload from `POST /qpay/create`.
#[derive(Debug, Clone, Deserialize)]
pub struct InvoicePayload {
    pub invoice_id: InvoiceId,
    /// Deep-link / QR text the user scans.
    pub qr_text: String,
    /// Optional pre-rendered QR image (base64 or URL, gateway's choice).
    #[serde(default)]
    pub qr_image: Option<String>,
}

/// Settlement answer from `POST /qpay/check`.
#[derive(Debug, Deserialize)]
pub(crate) struct InvoiceCheck {
    pub paid: bool,
}

/// Hosted card checkout session from `POST /stripe/create-session`.
#[derive(Debug, Clone, Deserialize)]
pub struct CardSession {
    /// Redirect URL of the hosted payment page.
    pub url: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_order_envelope_parses() {
        let body = r#"{
            "order": {
                "id": "o-1",
                "status": "WAITING_PAYMENT",
                "totalPrice": 18000,
                "createdAt": "2026-07-01T10:00:00Z"
            }
        }"#;
        let parsed: CreateOrderResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.order.id, OrderId::new("o-1"));
        assert_eq!(parsed.order.status, OrderStatus::WaitingPayment);
        assert_eq!(parsed.order.total_price, Price::from_tugrik(18_000));
    }

    #[test]
    fn test_invoice_payload_parses_without_image() {
        let body = r#"{"invoice_id": "inv-1", "qr_text": "qpay://pay/inv-1"}"#;
        let parsed: InvoicePayload = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.invoice_id, InvoiceId::new("inv-1"));
        assert!(parsed.qr_image.is_none());
    }

    #[test]
    fn test_payment_method_wire_names() {
        assert_eq!(
            serde_json::to_string(&PaymentMethod::Qpay).unwrap(),
            "\"qpay\""
        );
        assert_eq!(
            serde_json::to_string(&PaymentMethod::Cod).unwrap(),
            "\"cod\""
        );
    }
}
