//! Checkout: validation, order placement, payment dispatch.
//!
//! Invariants are enforced before any network call: an empty cart or a
//! line with no resolvable food never reaches the backend. On success
//! the authoritative cart is consumed by the order and the order id is
//! recorded so a payment-pending view can resume across restarts.

use std::sync::Arc;

use gobi_eats_core::{OrderId, Price};
use secrecy::SecretString;
use tracing::{info, instrument, warn};

use crate::auth::AuthSession;
use crate::backend::types::{CardSession, CreateOrderRequest, Order, PaymentMethod};
use crate::backend::{BackendClient, BackendError};
use crate::cart::remote::CartRemote;
use crate::cart::view_model::{CartSnapshot, CartViewModel};
use crate::error::AppError;
use crate::notify::Notifier;
use crate::payment::{PaymentGateway, PaymentOrchestrator, PaymentPhase};
use crate::storage::{keys, Storage};

/// Order operations.
///
/// The seam checkout is written against; [`BackendClient`] is the
/// production implementation.
pub trait OrderApi {
    /// Create an order from the cart contents.
    async fn create_order(
        &self,
        request: &CreateOrderRequest,
        token: &SecretString,
    ) -> Result<Order, BackendError>;

    /// Fetch an order; bearer auth is optional depending on the flow.
    async fn fetch_order(
        &self,
        order: &OrderId,
        token: Option<&SecretString>,
    ) -> Result<Order, BackendError>;

    /// Request a hosted card checkout session.
    async fn create_card_session(
        &self,
        order: &OrderId,
        total_price: Price,
        token: &SecretString,
    ) -> Result<CardSession, BackendError>;
}

impl OrderApi for BackendClient {
    async fn create_order(
        &self,
        request: &CreateOrderRequest,
        token: &SecretString,
    ) -> Result<Order, BackendError> {
        Self::create_order(self, request, token).await
    }

    async fn fetch_order(
        &self,
        order: &OrderId,
        token: Option<&SecretString>,
    ) -> Result<Order, BackendError> {
        Self::fetch_order(self, order, token).await
    }

    async fn create_card_session(
        &self,
        order: &OrderId,
        total_price: Price,
        token: &SecretString,
    ) -> Result<CardSession, BackendError> {
        Self::create_card_session(self, order, total_price, token).await
    }
}

/// Checkout flow over the authoritative cart.
pub struct CheckoutService<R, A> {
    cart: Arc<CartViewModel<R>>,
    orders: A,
    auth: AuthSession,
    storage: Arc<dyn Storage>,
    notifier: Notifier,
    delivery_fee: Price,
}

impl<R: CartRemote, A: OrderApi> CheckoutService<R, A> {
    #[must_use]
    pub fn new(
        cart: Arc<CartViewModel<R>>,
        orders: A,
        auth: AuthSession,
        storage: Arc<dyn Storage>,
        notifier: Notifier,
        delivery_fee: Price,
    ) -> Self {
        Self {
            cart,
            orders,
            auth,
            storage,
            notifier,
            delivery_fee,
        }
    }

    /// Validate the cart and place the order. The delivery fee is added
    /// here, on top of the cart total.
    ///
    /// On success the cart is cleared and the order id recorded under
    /// the pending-order key.
    ///
    /// # Errors
    ///
    /// Returns an error when the user is signed out, the cart fails
    /// validation, or the backend rejects the order. Every error is
    /// also surfaced to the user as a notice.
    #[instrument(skip(self))]
    pub async fn place_order(&self, method: PaymentMethod) -> Result<Order, AppError> {
        let Some(credentials) = self.auth.current() else {
            let error = AppError::Unauthorized("checkout requires a signed-in user".to_string());
            self.notifier.error(error.user_message());
            return Err(error);
        };

        // Authoritative read; the optimistic snapshot may be mid-flight.
        let snapshot = self.cart.refresh().await;
        self.validate(&snapshot)?;

        let request = CreateOrderRequest {
            user_id: credentials.user_id.clone(),
            items: snapshot.items,
            total_price: snapshot.total + self.delivery_fee,
            payment_method: method,
        };

        let order = match self.orders.create_order(&request, &credentials.token).await {
            Ok(order) => order,
            Err(error) => {
                warn!(%error, "order creation failed");
                self.notifier
                    .error("Could not place your order. Please try again.");
                return Err(error.into());
            }
        };

        info!(order = %order.id, "order placed");

        // The cart is consumed by the order.
        self.cart.clear_cart().await;
        if let Err(error) = self.storage.set(keys::LAST_ORDER, order.id.as_str()) {
            warn!(%error, "failed to record pending order id");
        }

        Ok(order)
    }

    /// Begin QPay payment for `order`: refuse orders that are no longer
    /// awaiting payment (an invoice must never be re-issued for a
    /// settled order), then hand the total to the orchestrator.
    ///
    /// # Errors
    ///
    /// Returns an error when the user is signed out or the order is not
    /// awaiting payment.
    pub async fn start_qpay<G: PaymentGateway>(
        &self,
        orchestrator: &PaymentOrchestrator<G>,
        order: &Order,
    ) -> Result<PaymentPhase, AppError> {
        let Some(credentials) = self.auth.current() else {
            let error = AppError::Unauthorized("payment requires a signed-in user".to_string());
            self.notifier.error(error.user_message());
            return Err(error);
        };
        if !order.status.awaits_payment() {
            return Err(self.reject("This order is not awaiting payment."));
        }
        Ok(orchestrator
            .create_invoice(&order.id, order.total_price, &credentials.token)
            .await)
    }

    /// Card path: request the hosted checkout session and return its
    /// redirect URL. Everything past the redirect belongs to the
    /// payment provider.
    ///
    /// # Errors
    ///
    /// Returns an error when the user is signed out or the session
    /// cannot be created.
    pub async fn request_card_session(&self, order: &Order) -> Result<String, AppError> {
        let Some(credentials) = self.auth.current() else {
            let error = AppError::Unauthorized("payment requires a signed-in user".to_string());
            self.notifier.error(error.user_message());
            return Err(error);
        };
        match self
            .orders
            .create_card_session(&order.id, order.total_price, &credentials.token)
            .await
        {
            Ok(session) => Ok(session.url),
            Err(error) => {
                warn!(%error, "card session creation failed");
                self.notifier
                    .error("Could not open the card payment page.");
                Err(error.into())
            }
        }
    }

    /// Resume the payment-pending view across restarts: refetch the
    /// order recorded at checkout. Returns `None` (and forgets the
    /// marker) when the order no longer waits for payment.
    ///
    /// # Errors
    ///
    /// Returns an error when the recorded order cannot be fetched.
    pub async fn resume_pending_order(&self) -> Result<Option<Order>, AppError> {
        let Some(order_id) = self.storage.get(keys::LAST_ORDER) else {
            return Ok(None);
        };
        let token = self.auth.current().map(|credentials| credentials.token);
        let order = self
            .orders
            .fetch_order(&OrderId::new(order_id), token.as_ref())
            .await?;
        if order.status.awaits_payment() {
            return Ok(Some(order));
        }
        self.clear_pending_order();
        Ok(None)
    }

    /// Forget the pending-order marker (payment settled or order
    /// closed).
    pub fn clear_pending_order(&self) {
        if let Err(error) = self.storage.remove(keys::LAST_ORDER) {
            warn!(%error, "failed to clear pending order marker");
        }
    }

    fn validate(&self, snapshot: &CartSnapshot) -> Result<(), AppError> {
        if snapshot.items.is_empty() {
            return Err(self.reject("Your cart is empty."));
        }
        if snapshot
            .items
            .iter()
            .any(|line| line.food_id.as_str().is_empty())
        {
            return Err(self.reject("Some items in your cart are no longer available."));
        }
        Ok(())
    }

    fn reject(&self, message: &str) -> AppError {
        self.notifier.error(message);
        AppError::Validation(message.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    use gobi_eats_core::{CartLineId, FoodId, OrderStatus, UserId};

    use super::*;
    use crate::cart::line::{CartLine, FoodSnapshot};
    use crate::cart::local::LocalCartStore;
    use crate::cart::remote::ServerCart;
    use crate::cart::sync::CartReconciler;
    use crate::cart::CartEvents;
    use crate::storage::MemoryStorage;

    #[derive(Clone, Default)]
    struct NullRemote;

    impl CartRemote for NullRemote {
        async fn load(
            &self,
            _user: &UserId,
            _token: &SecretString,
        ) -> Result<Vec<CartLine>, BackendError> {
            Ok(Vec::new())
        }

        async fn sync(
            &self,
            _user: &UserId,
            _items: &[CartLine],
            _token: &SecretString,
        ) -> Result<(), BackendError> {
            Ok(())
        }

        async fn add(
            &self,
            _user: &UserId,
            _food: &FoodId,
            _quantity: u32,
            _selected_size: Option<&str>,
            _token: &SecretString,
        ) -> Result<(), BackendError> {
            Ok(())
        }

        async fn update_quantity(
            &self,
            _line: &CartLineId,
            _quantity: u32,
            _token: &SecretString,
        ) -> Result<(), BackendError> {
            Ok(())
        }

        async fn remove(
            &self,
            _line: &CartLineId,
            _token: &SecretString,
        ) -> Result<(), BackendError> {
            Ok(())
        }

        async fn clear(
            &self,
            _user: &UserId,
            _token: &SecretString,
        ) -> Result<(), BackendError> {
            Ok(())
        }
    }

    #[derive(Clone, Default)]
    struct FakeOrders {
        create_calls: Arc<AtomicUsize>,
        fail_create: Arc<AtomicBool>,
        last_request: Arc<Mutex<Option<CreateOrderRequest>>>,
        fetched_status: Arc<Mutex<OrderStatus>>,
    }

    impl OrderApi for FakeOrders {
        async fn create_order(
            &self,
            request: &CreateOrderRequest,
            _token: &SecretString,
        ) -> Result<Order, BackendError> {
            self.create_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_create.load(Ordering::SeqCst) {
                return Err(BackendError::Api {
                    status: 500,
                    message: "order rejected".to_string(),
                });
            }
            *self.last_request.lock().unwrap() = Some(request.clone());
            Ok(Order {
                id: OrderId::new("o-1"),
                status: OrderStatus::WaitingPayment,
                total_price: request.total_price,
                created_at: None,
            })
        }

        async fn fetch_order(
            &self,
            order: &OrderId,
            _token: Option<&SecretString>,
        ) -> Result<Order, BackendError> {
            Ok(Order {
                id: order.clone(),
                status: *self.fetched_status.lock().unwrap(),
                total_price: Price::from_tugrik(18_000),
                created_at: None,
            })
        }

        async fn create_card_session(
            &self,
            _order: &OrderId,
            _total_price: Price,
            _token: &SecretString,
        ) -> Result<CardSession, BackendError> {
            Ok(CardSession {
                url: "https://pay.example/session".to_string(),
            })
        }
    }

    struct Fixture {
        checkout: CheckoutService<NullRemote, FakeOrders>,
        orders: FakeOrders,
        local: LocalCartStore,
        storage: MemoryStorage,
        auth: AuthSession,
        notifier: Notifier,
    }

    fn fixture() -> Fixture {
        let storage = MemoryStorage::new();
        let events = CartEvents::new();
        let notifier = Notifier::new();
        let auth = AuthSession::new();
        let orders = FakeOrders::default();
        let local = LocalCartStore::new(Arc::new(storage.clone()), events.clone());
        let server = ServerCart::new(NullRemote, notifier.clone(), events.clone());
        let reconciler = Arc::new(CartReconciler::new(
            local.clone(),
            server.clone(),
            events.clone(),
            notifier.clone(),
        ));
        let cart = Arc::new(CartViewModel::new(
            reconciler,
            local.clone(),
            server,
            auth.clone(),
            events,
            notifier.clone(),
        ));
        let checkout = CheckoutService::new(
            cart,
            orders.clone(),
            auth.clone(),
            Arc::new(storage.clone()),
            notifier.clone(),
            Price::from_tugrik(3000),
        );
        Fixture {
            checkout,
            orders,
            local,
            storage,
            auth,
            notifier,
        }
    }

    fn sign_in(f: &Fixture) {
        f.auth
            .sign_in(UserId::new("u-1"), SecretString::from("token"));
    }

    fn burger(quantity: u32) -> CartLine {
        CartLine {
            id: None,
            food_id: FoodId::new("f1"),
            quantity,
            selected_size: None,
            food: FoodSnapshot {
                id: FoodId::new("f1"),
                food_name: "Burger".to_string(),
                price: Price::from_tugrik(5000),
                image: "x".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn test_empty_cart_is_rejected_before_any_call() {
        let f = fixture();
        sign_in(&f);
        let mut notices = f.notifier.subscribe();

        let result = f.checkout.place_order(PaymentMethod::Qpay).await;

        assert!(matches!(result, Err(AppError::Validation(_))));
        assert_eq!(f.orders.create_calls.load(Ordering::SeqCst), 0);
        assert!(notices.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_unresolvable_food_is_rejected_before_any_call() {
        let f = fixture();
        sign_in(&f);
        f.storage
            .set(keys::CART, r#"[{"foodId": "", "quantity": 1}]"#)
            .unwrap();

        let result = f.checkout.place_order(PaymentMethod::Qpay).await;

        assert!(matches!(result, Err(AppError::Validation(_))));
        assert_eq!(f.orders.create_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_signed_out_checkout_is_rejected() {
        let f = fixture();
        f.local.add(burger(1)).unwrap();

        let result = f.checkout.place_order(PaymentMethod::Cod).await;

        assert!(matches!(result, Err(AppError::Unauthorized(_))));
        assert_eq!(f.orders.create_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_place_order_adds_fee_clears_cart_and_records_id() {
        let f = fixture();
        sign_in(&f);
        f.local.add(burger(3)).unwrap();

        let order = f.checkout.place_order(PaymentMethod::Qpay).await.unwrap();

        // 3 x 5000 cart total plus the 3000 delivery fee.
        let request = f.orders.last_request.lock().unwrap().clone().unwrap();
        assert_eq!(request.total_price, Price::from_tugrik(18_000));
        assert_eq!(request.items.len(), 1);
        assert_eq!(order.status, OrderStatus::WaitingPayment);

        assert!(f.local.is_empty());
        assert_eq!(f.storage.get(keys::LAST_ORDER).unwrap(), "o-1");
    }

    #[tokio::test]
    async fn test_failed_order_keeps_cart() {
        let f = fixture();
        sign_in(&f);
        f.local.add(burger(2)).unwrap();
        f.orders.fail_create.store(true, Ordering::SeqCst);

        let result = f.checkout.place_order(PaymentMethod::Qpay).await;

        assert!(matches!(result, Err(AppError::Backend(_))));
        assert_eq!(f.local.load().first().unwrap().quantity, 2);
        assert!(f.storage.get(keys::LAST_ORDER).is_none());
    }

    #[tokio::test]
    async fn test_settled_order_cannot_get_a_new_invoice() {
        let f = fixture();
        sign_in(&f);
        let order = Order {
            id: OrderId::new("o-1"),
            status: OrderStatus::Paid,
            total_price: Price::from_tugrik(18_000),
            created_at: None,
        };

        // A gateway must never be reached for a settled order, so a
        // panicking one proves the guard fires first.
        struct NoGateway;
        impl PaymentGateway for NoGateway {
            async fn create_invoice(
                &self,
                _order: &OrderId,
                _amount: Price,
                _token: &SecretString,
            ) -> Result<crate::backend::types::InvoicePayload, BackendError> {
                panic!("invoice created for a settled order");
            }

            async fn check_invoice(
                &self,
                _invoice: &gobi_eats_core::InvoiceId,
                _token: &SecretString,
            ) -> Result<bool, BackendError> {
                panic!("check issued for a settled order");
            }
        }

        let orchestrator = PaymentOrchestrator::new(
            NoGateway,
            f.notifier.clone(),
            crate::payment::PaymentEvents::new(),
        );
        let result = f.checkout.start_qpay(&orchestrator, &order).await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_resume_returns_only_payment_pending_orders() {
        let f = fixture();
        sign_in(&f);
        f.storage.set(keys::LAST_ORDER, "o-1").unwrap();
        *f.orders.fetched_status.lock().unwrap() = OrderStatus::WaitingPayment;

        let resumed = f.checkout.resume_pending_order().await.unwrap();
        assert_eq!(resumed.unwrap().id, OrderId::new("o-1"));

        // Once the order settles the marker is stale and gets dropped.
        *f.orders.fetched_status.lock().unwrap() = OrderStatus::Paid;
        let resumed = f.checkout.resume_pending_order().await.unwrap();
        assert!(resumed.is_none());
        assert!(f.storage.get(keys::LAST_ORDER).is_none());
    }

    #[tokio::test]
    async fn test_card_session_returns_redirect_url() {
        let f = fixture();
        sign_in(&f);
        let order = Order {
            id: OrderId::new("o-1"),
            status: OrderStatus::WaitingPayment,
            total_price: Price::from_tugrik(18_000),
            created_at: None,
        };

        let url = f.checkout.request_card_session(&order).await.unwrap();
        assert_eq!(url, "https://pay.example/session");
    }
}
