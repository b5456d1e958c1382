//! Payment invoice creation and settlement polling.
//!
//! One orchestrator instance owns one order's invoice lifecycle:
//! create the invoice once, expose the scan payload, poll the gateway
//! until it reports settlement, then tell dependents to refetch the
//! order. See [`orchestrator`] for the state machine.

mod orchestrator;

pub use orchestrator::{PaymentOrchestrator, PaymentPhase, PollOutcome};

use gobi_eats_core::{InvoiceId, OrderId, Price};
use secrecy::SecretString;
use tokio::sync::broadcast;

use crate::backend::types::InvoicePayload;
use crate::backend::{BackendClient, BackendError};

const EVENT_CAPACITY: usize = 16;

/// Payment gateway operations.
///
/// The seam services are written against; [`BackendClient`] is the
/// production implementation (the backend proxies QPay).
pub trait PaymentGateway {
    /// Create an invoice for an order total.
    async fn create_invoice(
        &self,
        order: &OrderId,
        amount: Price,
        token: &SecretString,
    ) -> Result<InvoicePayload, BackendError>;

    /// True when the invoice has settled.
    async fn check_invoice(
        &self,
        invoice: &InvoiceId,
        token: &SecretString,
    ) -> Result<bool, BackendError>;
}

impl PaymentGateway for BackendClient {
    async fn create_invoice(
        &self,
        order: &OrderId,
        amount: Price,
        token: &SecretString,
    ) -> Result<InvoicePayload, BackendError> {
        Self::create_invoice(self, order, amount, token).await
    }

    async fn check_invoice(
        &self,
        invoice: &InvoiceId,
        token: &SecretString,
    ) -> Result<bool, BackendError> {
        Self::check_invoice(self, invoice, token).await
    }
}

/// A pending invoice with its scan payload.
///
/// The amount always equals the order total at creation time; the
/// gateway is the only party that can change anything afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invoice {
    pub invoice_id: InvoiceId,
    pub order_id: OrderId,
    pub amount: Price,
    /// Deep-link / QR text the user scans.
    pub qr_text: String,
    /// Optional pre-rendered QR image.
    pub qr_image: Option<String>,
}

/// Broadcast when polling observes settlement, so dependents (order
/// views) refetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentEvent {
    pub order_id: OrderId,
    pub invoice_id: InvoiceId,
}

/// Broadcast handle for settlement announcements.
#[derive(Debug, Clone)]
pub struct PaymentEvents {
    tx: broadcast::Sender<PaymentEvent>,
}

impl PaymentEvents {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self { tx }
    }

    /// Subscribe to settlement announcements.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<PaymentEvent> {
        self.tx.subscribe()
    }

    /// Announce a settlement. Fire-and-forget.
    pub fn settled(&self, event: PaymentEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for PaymentEvents {
    fn default() -> Self {
        Self::new()
    }
}
