//! Checkout/Order Sequencer
//!
//! Drives a checkout from address capture through payment to a stored order:
//!
//! ```text
//! Idle -> AddressCapture -> PaymentProcessing -> Completed
//!              |                                    |
//!              +-- cancel -> Idle      reopen ------+-> AddressCapture
//! ```
//!
//! [`CheckoutSequencer::submit`] borrows the cart mutably for the whole payment wait, so no cart
//! edit can land between the payment and the order snapshot.

use std::{fmt, sync::Arc};

use jiff::Timestamp;
use rusty_money::iso::Currency;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::{
    cart::{CartEngine, CartStore},
    notify::{Notice, Notifier},
    orders::{BillingAddress, Order, OrderId, OrderRepository, OrderStoreError},
    session::Session,
};

pub mod payment;

pub use payment::{
    DEFAULT_PAYMENT_LATENCY, PaymentGateway, PaymentOutcome, SimulatedPaymentGateway,
};

/// Where a checkout is
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutState {
    /// Not checking out
    Idle,

    /// Collecting the billing address
    AddressCapture,

    /// Waiting on the payment gateway
    PaymentProcessing,

    /// Order placed
    Completed {
        /// The placed order
        order_id: OrderId,
    },
}

impl fmt::Display for CheckoutState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::AddressCapture => f.write_str("address capture"),
            Self::PaymentProcessing => f.write_str("payment processing"),
            Self::Completed { order_id } => write!(f, "completed ({order_id})"),
        }
    }
}

/// Checkout errors
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Nobody is signed in
    #[error("sign in to check out")]
    AuthorizationRequired,

    /// The cart has no lines
    #[error("cart is empty")]
    EmptyCart,

    /// The action is not allowed in the current state
    #[error("cannot {action} during {state}")]
    InvalidTransition {
        /// State the checkout was in
        state: CheckoutState,

        /// Attempted action
        action: &'static str,
    },

    /// A required billing field is blank
    #[error("billing {0} is required")]
    MissingBillingField(&'static str),

    /// The payment gateway refused the charge
    #[error("payment declined: {reason}")]
    PaymentDeclined {
        /// Gateway reason
        reason: String,
    },

    /// The order could not be stored
    #[error("failed to store order: {0}")]
    Storage(#[from] OrderStoreError),
}

/// Checkout/Order Sequencer
pub struct CheckoutSequencer<R, P> {
    repository: R,
    payment: P,
    notifier: Arc<dyn Notifier>,
    currency: &'static Currency,
    state: CheckoutState,
    last_order_at: Option<Timestamp>,
}

impl<R: fmt::Debug, P: fmt::Debug> fmt::Debug for CheckoutSequencer<R, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheckoutSequencer")
            .field("repository", &self.repository)
            .field("payment", &self.payment)
            .field("currency", &self.currency.iso_alpha_code)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl<R, P> CheckoutSequencer<R, P>
where
    R: OrderRepository,
    P: PaymentGateway,
{
    /// An idle sequencer storing orders priced in `currency`.
    pub fn new(
        repository: R,
        payment: P,
        notifier: Arc<dyn Notifier>,
        currency: &'static Currency,
    ) -> Self {
        Self {
            repository,
            payment,
            notifier,
            currency,
            state: CheckoutState::Idle,
            last_order_at: None,
        }
    }

    /// Current state
    pub fn state(&self) -> &CheckoutState {
        &self.state
    }

    /// Order storage
    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// Open the address form. Also reopens a completed checkout.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::AuthorizationRequired`] for anonymous sessions,
    /// [`CheckoutError::InvalidTransition`] while a payment is in flight and
    /// [`CheckoutError::EmptyCart`] if there is nothing to buy.
    pub fn begin<S: CartStore>(
        &mut self,
        session: &Session,
        cart: &CartEngine<S>,
    ) -> Result<(), CheckoutError> {
        self.require_sign_in(session)?;

        if self.state == CheckoutState::PaymentProcessing {
            return Err(self.invalid("begin checkout"));
        }

        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        self.transition(CheckoutState::AddressCapture);

        Ok(())
    }

    /// Close the address form without ordering.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::InvalidTransition`] outside address capture.
    pub fn cancel(&mut self) -> Result<(), CheckoutError> {
        if self.state != CheckoutState::AddressCapture {
            return Err(self.invalid("cancel"));
        }

        self.transition(CheckoutState::Idle);

        Ok(())
    }

    /// Take payment and place the order.
    ///
    /// On success the order is stored, the cart cleared and the sequencer is
    /// [`CheckoutState::Completed`]. On any failure after validation the cart is left as it was
    /// and the sequencer returns to [`CheckoutState::AddressCapture`].
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::InvalidTransition`] outside address capture,
    /// [`CheckoutError::AuthorizationRequired`] if the session signed out since
    /// [`begin`](Self::begin), [`CheckoutError::MissingBillingField`] for a blank field, [`CheckoutError::EmptyCart`],
    /// [`CheckoutError::PaymentDeclined`] when the gateway refuses, and
    /// [`CheckoutError::Storage`] when the order cannot be stored.
    #[instrument(skip_all, fields(items = cart.total_items()))]
    pub async fn submit<S: CartStore>(
        &mut self,
        session: &Session,
        cart: &mut CartEngine<S>,
        billing_address: BillingAddress,
    ) -> Result<Order, CheckoutError> {
        if self.state != CheckoutState::AddressCapture {
            return Err(self.invalid("submit payment"));
        }

        self.require_sign_in(session)?;

        if let Some(field) = billing_address.missing_field() {
            return Err(CheckoutError::MissingBillingField(field));
        }

        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let summary = cart.summary();

        self.transition(CheckoutState::PaymentProcessing);

        if let PaymentOutcome::Declined { reason } = self.payment.authorize(summary).await {
            warn!(%reason, "payment declined");

            self.notifier.notify(Notice::destructive("Payment declined", reason.clone()));
            self.transition(CheckoutState::AddressCapture);

            return Err(CheckoutError::PaymentDeclined { reason });
        }

        let created_at = self.next_order_time();
        let order = Order::confirmed(
            OrderId::from_timestamp(created_at),
            session.user().map(|user| user.id.clone()),
            cart.lines().to_vec(),
            billing_address,
            self.currency,
            created_at,
        );

        if let Err(error) = self.repository.append(order.clone()).await {
            warn!(%error, "order could not be stored");

            self.transition(CheckoutState::AddressCapture);

            return Err(error.into());
        }

        self.last_order_at = Some(created_at);
        cart.clear_cart();

        info!(order_id = %order.id(), total = %order.total(), "order placed");

        self.notifier.notify(Notice::info(
            "Order placed successfully!",
            format!("Your order #{} has been confirmed.", order.id()),
        ));
        self.transition(CheckoutState::Completed {
            order_id: order.id().clone(),
        });

        Ok(order)
    }

    fn require_sign_in(&self, session: &Session) -> Result<(), CheckoutError> {
        if session.is_authenticated() {
            return Ok(());
        }

        self.notifier.notify(Notice::destructive(
            "Please log in",
            "You need to be logged in to proceed with checkout.",
        ));

        Err(CheckoutError::AuthorizationRequired)
    }

    /// Now, nudged forward so ids never repeat or go backwards within this sequencer.
    fn next_order_time(&self) -> Timestamp {
        let now = Timestamp::now();

        match self.last_order_at {
            Some(last) if now.as_millisecond() <= last.as_millisecond() => {
                Timestamp::from_millisecond(last.as_millisecond() + 1).unwrap_or(now)
            }
            _ => now,
        }
    }

    fn transition(&mut self, next: CheckoutState) {
        debug!(from = %self.state, to = %next, "checkout transition");

        self.state = next;
    }

    fn invalid(&self, action: &'static str) -> CheckoutError {
        CheckoutError::InvalidTransition {
            state: self.state.clone(),
            action,
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use rusty_money::iso;
    use testresult::TestResult;

    use crate::{
        cart::{MemoryCartStore, NewCartItem},
        catalog::{CategoryId, Product, ProductId},
        notify::{RecordingNotifier, Severity},
        orders::{InMemoryOrderRepository, repository::MockOrderRepository},
        session::{User, UserId},
    };

    use super::{payment::MockPaymentGateway, *};

    fn shopper() -> Session {
        Session::signed_in(User {
            id: UserId::new("u1"),
            name: "Asha".to_string(),
            email: "asha@example.com".to_string(),
        })
    }

    fn address() -> BillingAddress {
        BillingAddress {
            full_name: "Asha Rao".to_string(),
            email: "asha@example.com".to_string(),
            phone: "+91 98765 43210".to_string(),
            address: "12 MG Road".to_string(),
            city: "Pune".to_string(),
            state: "Maharashtra".to_string(),
            zip_code: "411001".to_string(),
            ..BillingAddress::default()
        }
    }

    fn cart_with_keychains(quantity: usize) -> TestResult<CartEngine<MemoryCartStore>> {
        let keychain = Product::new(
            ProductId(1),
            "Keychain",
            Decimal::new(24900, 2),
            CategoryId::new("keychain"),
            "key.jpg",
        )?;

        let mut cart = CartEngine::new(MemoryCartStore::new());

        for _ in 0..quantity {
            cart.add_to_cart(NewCartItem::from_product(&keychain));
        }

        Ok(cart)
    }

    fn approving() -> MockPaymentGateway {
        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_authorize()
            .returning(|_| PaymentOutcome::Approved);
        gateway
    }

    fn sequencer<R: OrderRepository, P: PaymentGateway>(
        repository: R,
        payment: P,
    ) -> (CheckoutSequencer<R, P>, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier::new());

        (
            CheckoutSequencer::new(repository, payment, notifier.clone(), iso::INR),
            notifier,
        )
    }

    #[tokio::test]
    async fn places_an_order_and_clears_the_cart() -> TestResult {
        let mut cart = cart_with_keychains(2)?;
        let (mut checkout, notifier) = sequencer(InMemoryOrderRepository::new(), approving());

        checkout.begin(&shopper(), &cart)?;
        let order = checkout.submit(&shopper(), &mut cart, address()).await?;

        assert_eq!(order.subtotal(), Decimal::new(49800, 2));
        assert_eq!(order.shipping(), Decimal::ZERO);
        assert_eq!(order.tax(), Decimal::new(3984, 2));
        assert_eq!(order.total(), Decimal::new(53784, 2));
        assert_eq!(order.user_id(), Some(&UserId::new("u1")));

        assert!(cart.is_empty());
        assert_eq!(checkout.repository().load().await?, vec![order.clone()]);
        assert_eq!(
            checkout.state(),
            &CheckoutState::Completed {
                order_id: order.id().clone()
            }
        );
        assert_eq!(
            notifier.notices(),
            vec![Notice::info(
                "Order placed successfully!",
                format!("Your order #{} has been confirmed.", order.id())
            )]
        );

        Ok(())
    }

    #[tokio::test]
    async fn signing_out_before_payment_places_no_order() -> TestResult {
        let mut cart = cart_with_keychains(1)?;
        let mut payment = MockPaymentGateway::new();
        payment.expect_authorize().never();
        let (mut checkout, notifier) = sequencer(InMemoryOrderRepository::new(), payment);

        checkout.begin(&shopper(), &cart)?;
        let result = checkout
            .submit(&Session::anonymous(), &mut cart, address())
            .await;

        assert!(matches!(result, Err(CheckoutError::AuthorizationRequired)));
        assert_eq!(checkout.state(), &CheckoutState::AddressCapture);
        assert_eq!(cart.total_items(), 1);
        assert!(checkout.repository().load().await?.is_empty());
        assert_eq!(
            notifier.notices().first().map(|n| n.severity),
            Some(Severity::Destructive)
        );

        Ok(())
    }

    #[tokio::test]
    async fn anonymous_sessions_are_refused() -> TestResult {
        let cart = cart_with_keychains(1)?;
        let (mut checkout, notifier) = sequencer(InMemoryOrderRepository::new(), approving());

        let result = checkout.begin(&Session::anonymous(), &cart);

        assert!(matches!(result, Err(CheckoutError::AuthorizationRequired)));
        assert_eq!(checkout.state(), &CheckoutState::Idle);
        assert!(
            notifier
                .notices()
                .iter()
                .all(|n| n.severity == Severity::Destructive && n.title == "Please log in")
        );

        Ok(())
    }

    #[tokio::test]
    async fn empty_carts_cannot_check_out() -> TestResult {
        let cart = cart_with_keychains(0)?;
        let (mut checkout, _) = sequencer(InMemoryOrderRepository::new(), approving());

        assert!(matches!(
            checkout.begin(&shopper(), &cart),
            Err(CheckoutError::EmptyCart)
        ));

        Ok(())
    }

    #[tokio::test]
    async fn blank_billing_fields_keep_the_form_open() -> TestResult {
        let mut cart = cart_with_keychains(1)?;
        let mut gateway = MockPaymentGateway::new();
        gateway.expect_authorize().never();
        let (mut checkout, _) = sequencer(InMemoryOrderRepository::new(), gateway);

        checkout.begin(&shopper(), &cart)?;

        let result = checkout
            .submit(
                &shopper(),
                &mut cart,
                BillingAddress {
                    city: String::new(),
                    ..address()
                },
            )
            .await;

        assert!(matches!(result, Err(CheckoutError::MissingBillingField("city"))));
        assert_eq!(checkout.state(), &CheckoutState::AddressCapture);

        Ok(())
    }

    #[tokio::test]
    async fn declined_payments_leave_the_cart_alone() -> TestResult {
        let mut cart = cart_with_keychains(2)?;
        let gateway = SimulatedPaymentGateway::new(std::time::Duration::ZERO)
            .declining("insufficient funds");
        let (mut checkout, notifier) = sequencer(InMemoryOrderRepository::new(), gateway);

        checkout.begin(&shopper(), &cart)?;
        let result = checkout.submit(&shopper(), &mut cart, address()).await;

        assert!(matches!(
            result,
            Err(CheckoutError::PaymentDeclined { ref reason }) if reason == "insufficient funds"
        ));
        assert_eq!(cart.total_items(), 2);
        assert!(checkout.repository().load().await?.is_empty());
        assert_eq!(checkout.state(), &CheckoutState::AddressCapture);
        assert!(
            notifier
                .notices()
                .iter()
                .all(|n| n.severity == Severity::Destructive)
        );

        Ok(())
    }

    #[tokio::test]
    async fn storage_failures_keep_the_cart() -> TestResult {
        let mut cart = cart_with_keychains(1)?;
        let mut repository = MockOrderRepository::new();
        repository.expect_append().returning(|_| {
            Err(OrderStoreError::Storage(crate::storage::StorageError::Io(
                std::io::Error::other("disk full"),
            )))
        });
        let (mut checkout, _) = sequencer(repository, approving());

        checkout.begin(&shopper(), &cart)?;
        let result = checkout.submit(&shopper(), &mut cart, address()).await;

        assert!(matches!(result, Err(CheckoutError::Storage(_))));
        assert_eq!(cart.total_items(), 1);
        assert_eq!(checkout.state(), &CheckoutState::AddressCapture);

        Ok(())
    }

    #[tokio::test]
    async fn cancel_only_from_address_capture() -> TestResult {
        let cart = cart_with_keychains(1)?;
        let (mut checkout, _) = sequencer(InMemoryOrderRepository::new(), approving());

        assert!(matches!(
            checkout.cancel(),
            Err(CheckoutError::InvalidTransition { action: "cancel", .. })
        ));

        checkout.begin(&shopper(), &cart)?;
        checkout.cancel()?;

        assert_eq!(checkout.state(), &CheckoutState::Idle);

        Ok(())
    }

    #[tokio::test]
    async fn submit_requires_an_open_form() -> TestResult {
        let mut cart = cart_with_keychains(1)?;
        let (mut checkout, _) = sequencer(InMemoryOrderRepository::new(), approving());

        let result = checkout.submit(&shopper(), &mut cart, address()).await;

        assert!(matches!(
            result,
            Err(CheckoutError::InvalidTransition {
                state: CheckoutState::Idle,
                ..
            })
        ));

        Ok(())
    }

    #[tokio::test]
    async fn completed_checkouts_reopen_with_increasing_ids() -> TestResult {
        let mut cart = cart_with_keychains(1)?;
        let (mut checkout, _) = sequencer(InMemoryOrderRepository::new(), approving());

        checkout.begin(&shopper(), &cart)?;
        let first = checkout.submit(&shopper(), &mut cart, address()).await?;

        let mut more = cart_with_keychains(3)?;
        checkout.begin(&shopper(), &more)?;
        assert_eq!(checkout.state(), &CheckoutState::AddressCapture);

        let second = checkout.submit(&shopper(), &mut more, address()).await?;

        assert!(second.created_at() > first.created_at());
        assert_ne!(first.id(), second.id());
        assert_eq!(checkout.repository().load().await?.len(), 2);

        Ok(())
    }
}
