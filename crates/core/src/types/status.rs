//! Status enums for orders and payment invoices.

use serde::{Deserialize, Serialize};

/// Order lifecycle status.
///
/// Maps to the delivery backend's wire values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Pending,
    WaitingPayment,
    CodPending,
    Paid,
    Delivering,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// The order has an open invoice and is waiting for settlement.
    #[must_use]
    pub const fn awaits_payment(self) -> bool {
        matches!(self, Self::WaitingPayment)
    }

    /// Payment has settled (or was never required) and fulfilment may proceed.
    #[must_use]
    pub const fn is_settled(self) -> bool {
        matches!(self, Self::Paid | Self::Delivering | Self::Delivered)
    }

    /// No further status transitions are possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }
}

/// Payment invoice settlement status, derived from gateway polling.
///
/// Never stored beyond the session; the gateway is the source of truth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceStatus {
    #[default]
    Pending,
    Paid,
}
