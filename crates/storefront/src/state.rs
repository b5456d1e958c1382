//! Application state wiring the subsystem together.
//!
//! The embedding UI constructs one [`Storefront`] at startup and clones
//! it freely; every shared resource lives behind a single `Arc`. The
//! two long-running watchers ([`Storefront::watch_auth`] and
//! [`Storefront::watch_cart`]) are spawned once by the embedder.

use std::sync::Arc;

use crate::auth::AuthSession;
use crate::backend::BackendClient;
use crate::cart::local::LocalCartStore;
use crate::cart::remote::ServerCart;
use crate::cart::sync::{CartMode, CartReconciler};
use crate::cart::view_model::CartViewModel;
use crate::cart::CartEvents;
use crate::checkout::CheckoutService;
use crate::config::StorefrontConfig;
use crate::error::AppError;
use crate::notify::Notifier;
use crate::payment::{PaymentEvents, PaymentOrchestrator, PollOutcome};
use crate::storage::{FileStorage, Storage};

/// Application state shared across all views.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// the cart, checkout, payment, and notification surfaces.
#[derive(Clone)]
pub struct Storefront {
    inner: Arc<StorefrontInner>,
}

struct StorefrontInner {
    config: StorefrontConfig,
    backend: BackendClient,
    auth: AuthSession,
    notifier: Notifier,
    cart_events: CartEvents,
    payment_events: PaymentEvents,
    reconciler: Arc<CartReconciler<BackendClient>>,
    cart: Arc<CartViewModel<BackendClient>>,
    checkout: CheckoutService<BackendClient, BackendClient>,
}

impl Storefront {
    /// Create the application state with file-backed storage under the
    /// configured directory.
    ///
    /// # Errors
    ///
    /// Returns an error when the storage directory cannot be created or
    /// the HTTP client fails to build.
    pub fn new(config: StorefrontConfig) -> Result<Self, AppError> {
        let storage: Arc<dyn Storage> = Arc::new(FileStorage::open(config.storage_dir.clone())?);
        Self::with_storage(config, storage)
    }

    /// Create the application state over externally provided storage
    /// (tests, embedded targets).
    ///
    /// # Errors
    ///
    /// Returns an error when the HTTP client fails to build.
    pub fn with_storage(
        config: StorefrontConfig,
        storage: Arc<dyn Storage>,
    ) -> Result<Self, AppError> {
        let backend = BackendClient::new(&config)?;
        let auth = AuthSession::new();
        let notifier = Notifier::new();
        let cart_events = CartEvents::new();
        let payment_events = PaymentEvents::new();

        let local = LocalCartStore::new(Arc::clone(&storage), cart_events.clone());
        let server = ServerCart::new(backend.clone(), notifier.clone(), cart_events.clone());
        let reconciler = Arc::new(CartReconciler::new(
            local.clone(),
            server.clone(),
            cart_events.clone(),
            notifier.clone(),
        ));
        let cart = Arc::new(CartViewModel::new(
            Arc::clone(&reconciler),
            local,
            server,
            auth.clone(),
            cart_events.clone(),
            notifier.clone(),
        ));
        let checkout = CheckoutService::new(
            Arc::clone(&cart),
            backend.clone(),
            auth.clone(),
            storage,
            notifier.clone(),
            config.delivery_fee,
        );

        Ok(Self {
            inner: Arc::new(StorefrontInner {
                config,
                backend,
                auth,
                notifier,
                cart_events,
                payment_events,
                reconciler,
                cart,
                checkout,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the delivery backend client.
    #[must_use]
    pub fn backend(&self) -> &BackendClient {
        &self.inner.backend
    }

    /// Get a reference to the auth session.
    #[must_use]
    pub fn auth(&self) -> &AuthSession {
        &self.inner.auth
    }

    /// Get a reference to the user-facing notification bus.
    #[must_use]
    pub fn notifier(&self) -> &Notifier {
        &self.inner.notifier
    }

    /// Get a reference to the cart change broadcast.
    #[must_use]
    pub fn cart_events(&self) -> &CartEvents {
        &self.inner.cart_events
    }

    /// Get a reference to the payment settlement broadcast.
    #[must_use]
    pub fn payment_events(&self) -> &PaymentEvents {
        &self.inner.payment_events
    }

    /// Get a reference to the cart view model.
    #[must_use]
    pub fn cart(&self) -> &Arc<CartViewModel<BackendClient>> {
        &self.inner.cart
    }

    /// Get a reference to the checkout service.
    #[must_use]
    pub fn checkout(&self) -> &CheckoutService<BackendClient, BackendClient> {
        &self.inner.checkout
    }

    /// Which cart store is authoritative right now.
    #[must_use]
    pub fn cart_mode(&self) -> CartMode {
        self.inner.reconciler.mode()
    }

    /// Build an orchestrator for one order's invoice lifecycle.
    #[must_use]
    pub fn payment_orchestrator(&self) -> PaymentOrchestrator<BackendClient> {
        PaymentOrchestrator::new(
            self.inner.backend.clone(),
            self.inner.notifier.clone(),
            self.inner.payment_events.clone(),
        )
    }

    /// Poll an invoice at the interactive payment-dialog cadence.
    /// Returns `None` when the user is signed out.
    pub async fn poll_payment_interactive(
        &self,
        orchestrator: &PaymentOrchestrator<BackendClient>,
    ) -> Option<PollOutcome> {
        let credentials = self.inner.auth.current()?;
        Some(
            orchestrator
                .poll_until_paid(
                    self.inner.config.qpay_poll_interval,
                    self.inner.config.qpay_poll_timeout,
                    &credentials.token,
                )
                .await,
        )
    }

    /// Poll an invoice at the slow background order-detail cadence.
    /// Returns `None` when the user is signed out.
    pub async fn poll_payment_background(
        &self,
        orchestrator: &PaymentOrchestrator<BackendClient>,
    ) -> Option<PollOutcome> {
        let credentials = self.inner.auth.current()?;
        Some(
            orchestrator
                .poll_until_paid(
                    self.inner.config.order_poll_interval,
                    self.inner.config.qpay_poll_timeout,
                    &credentials.token,
                )
                .await,
        )
    }

    /// Resume a payment-pending order across restarts: refetch the
    /// order recorded at checkout and, when it still awaits payment,
    /// re-issue its invoice and poll at the background cadence. The
    /// pending marker is dropped once the gateway reports settlement.
    ///
    /// Returns `Ok(None)` when no order is pending.
    ///
    /// # Errors
    ///
    /// Returns an error when the recorded order cannot be fetched or
    /// the user is signed out.
    pub async fn resume_pending_payment(&self) -> Result<Option<PollOutcome>, AppError> {
        let Some(order) = self.inner.checkout.resume_pending_order().await? else {
            return Ok(None);
        };
        let orchestrator = self.payment_orchestrator();
        self.inner
            .checkout
            .start_qpay(&orchestrator, &order)
            .await?;
        let outcome = self.poll_payment_background(&orchestrator).await;
        if outcome == Some(PollOutcome::Paid) {
            self.inner.checkout.clear_pending_order();
        }
        Ok(outcome)
    }

    /// Drive auth transitions into the cart reconciler. The embedder
    /// spawns this once; it runs until the session is dropped.
    pub async fn watch_auth(&self) {
        let mut sessions = self.inner.auth.subscribe();
        loop {
            let credentials = sessions.borrow_and_update().clone();
            self.inner.reconciler.on_auth_change(credentials.as_ref()).await;
            if sessions.changed().await.is_err() {
                break;
            }
        }
    }

    /// Keep the cart view model fresh on every change announcement.
    /// The embedder spawns this once.
    pub async fn watch_cart(&self) {
        self.inner.cart.watch().await;
    }
}
