//! Invoice lifecycle state machine.
//!
//! `Idle → Creating → AwaitingPayment → Paid`, with `Failed` out of
//! `Creating`. The phase lives in a watch channel so the UI can render
//! every transition; the duplicate-create guard and the stop-on-settle
//! rule are structural (phase transitions), not ad hoc flags.

use std::time::Duration;

use gobi_eats_core::{InvoiceStatus, OrderId, Price};
use secrecy::SecretString;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument, warn};

use super::{Invoice, PaymentEvent, PaymentEvents, PaymentGateway};
use crate::notify::Notifier;

/// Where one order's invoice currently stands.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PaymentPhase {
    /// No invoice requested yet.
    #[default]
    Idle,
    /// Creation request in flight.
    Creating,
    /// Invoice issued; waiting for the gateway to see the payment.
    AwaitingPayment(Invoice),
    /// Settled. Terminal: no further checks are issued.
    Paid(Invoice),
    /// Creation failed. Terminal for this orchestrator; the user may
    /// start over, which builds a fresh orchestrator.
    Failed,
}

impl PaymentPhase {
    /// Settlement status of the issued invoice, when one exists.
    #[must_use]
    pub const fn invoice_status(&self) -> Option<InvoiceStatus> {
        match self {
            Self::AwaitingPayment(_) => Some(InvoiceStatus::Pending),
            Self::Paid(_) => Some(InvoiceStatus::Paid),
            Self::Idle | Self::Creating | Self::Failed => None,
        }
    }
}

/// Why a polling run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The gateway reported settlement.
    Paid,
    /// The maximum poll duration elapsed without settlement.
    TimedOut,
    /// Cancelled by the owner (view teardown), or polling was started
    /// in a phase with nothing to poll.
    Cancelled,
}

/// Creates exactly one invoice per order and polls it to settlement.
pub struct PaymentOrchestrator<G> {
    gateway: G,
    notifier: Notifier,
    events: PaymentEvents,
    phase: watch::Sender<PaymentPhase>,
    cancel: watch::Sender<bool>,
}

impl<G: PaymentGateway> PaymentOrchestrator<G> {
    #[must_use]
    pub fn new(gateway: G, notifier: Notifier, events: PaymentEvents) -> Self {
        let (phase, _) = watch::channel(PaymentPhase::Idle);
        let (cancel, _) = watch::channel(false);
        Self {
            gateway,
            notifier,
            events,
            phase,
            cancel,
        }
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> PaymentPhase {
        self.phase.borrow().clone()
    }

    /// Observe phase transitions.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<PaymentPhase> {
        self.phase.subscribe()
    }

    /// Stop any polling run. No phase transition happens after this;
    /// the owner is tearing the view down.
    pub fn cancel(&self) {
        self.cancel.send_replace(true);
    }

    /// Create the invoice for `order` over `amount`.
    ///
    /// At most one creation is ever issued per orchestrator: re-entry
    /// while one is in flight, after success, or after failure is a
    /// no-op that returns the current phase unchanged.
    #[instrument(skip(self, token))]
    pub async fn create_invoice(
        &self,
        order: &OrderId,
        amount: Price,
        token: &SecretString,
    ) -> PaymentPhase {
        let mut entered = false;
        self.phase.send_if_modified(|phase| {
            if matches!(phase, PaymentPhase::Idle) {
                *phase = PaymentPhase::Creating;
                entered = true;
                return true;
            }
            false
        });
        if !entered {
            return self.phase();
        }

        match self.gateway.create_invoice(order, amount, token).await {
            Ok(payload) => {
                info!(invoice = %payload.invoice_id, "invoice created");
                self.phase.send_replace(PaymentPhase::AwaitingPayment(Invoice {
                    invoice_id: payload.invoice_id,
                    order_id: order.clone(),
                    amount,
                    qr_text: payload.qr_text,
                    qr_image: payload.qr_image,
                }));
            }
            Err(error) => {
                warn!(%error, "invoice creation failed");
                self.notifier
                    .error("Could not start the payment. Please try again.");
                self.phase.send_replace(PaymentPhase::Failed);
            }
        }
        self.phase()
    }

    /// Poll the gateway until settlement, timeout, or cancellation.
    ///
    /// Issues an immediate check, then repeats every `interval` up to
    /// `timeout`. Transient check failures are swallowed and retried on
    /// the next tick. Once the gateway reports settlement, the phase
    /// becomes [`PaymentPhase::Paid`], a settlement event is broadcast,
    /// and no further checks are issued. On timeout the phase stays
    /// [`PaymentPhase::AwaitingPayment`] and the user is told to check
    /// the order manually.
    #[instrument(skip(self, token), fields(interval_secs = interval.as_secs()))]
    pub async fn poll_until_paid(
        &self,
        interval: Duration,
        timeout: Duration,
        token: &SecretString,
    ) -> PollOutcome {
        let invoice = match self.phase() {
            PaymentPhase::AwaitingPayment(invoice) => invoice,
            PaymentPhase::Paid(_) => return PollOutcome::Paid,
            _ => return PollOutcome::Cancelled,
        };

        let mut cancel = self.cancel.subscribe();
        if *cancel.borrow_and_update() {
            return PollOutcome::Cancelled;
        }

        let deadline = tokio::time::Instant::now() + timeout;
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = tokio::time::sleep_until(deadline) => {
                    self.notifier.info(
                        "Still waiting for the payment. If you have already paid, \
                         check the order again in a moment.",
                    );
                    return PollOutcome::TimedOut;
                }
                changed = cancel.changed() => {
                    if changed.is_err() || *cancel.borrow_and_update() {
                        return PollOutcome::Cancelled;
                    }
                }
                _ = ticker.tick() => {
                    match self.gateway.check_invoice(&invoice.invoice_id, token).await {
                        Ok(true) => {
                            info!(invoice = %invoice.invoice_id, "invoice settled");
                            self.phase.send_replace(PaymentPhase::Paid(invoice.clone()));
                            self.events.settled(PaymentEvent {
                                order_id: invoice.order_id.clone(),
                                invoice_id: invoice.invoice_id.clone(),
                            });
                            self.notifier.success("Payment received. Thank you!");
                            return PollOutcome::Paid;
                        }
                        Ok(false) => {
                            debug!(invoice = %invoice.invoice_id, "invoice not settled yet");
                        }
                        // A missed heartbeat is not worth alarming the
                        // user over; the next tick retries.
                        Err(error) => {
                            debug!(%error, "invoice status check failed, retrying on next tick");
                        }
                    }
                }
            }
        }
    }
}
