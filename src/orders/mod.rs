//! Orders
//!
//! Historical order records. An order is created once, at the end of a successful checkout,
//! and never changes afterwards.

use std::fmt;

use jiff::Timestamp;
use rust_decimal::Decimal;
use rusty_money::iso::Currency;
use serde::{Deserialize, Serialize};

use crate::{
    cart::CartLineItem,
    pricing::{self, OrderSummary},
    session::UserId,
};

pub mod repository;

pub use repository::{
    InMemoryOrderRepository, JsonFileOrderRepository, OrderRepository, OrderStoreError,
};

/// Time-based order token: milliseconds since the Unix epoch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    /// Order id for the given instant
    pub fn from_timestamp(timestamp: Timestamp) -> Self {
        Self(timestamp.as_millisecond().to_string())
    }

    /// Wrap an existing id, e.g. one typed by the shopper
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Order Status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Awaiting processing
    Pending,

    /// Being prepared
    Processing,

    /// Handed to the carrier
    Shipped,

    /// Received by the shopper
    Delivered,

    /// Paid and accepted
    Confirmed,
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Confirmed => "confirmed",
        })
    }
}

/// Billing address captured at checkout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingAddress {
    /// Full name
    pub full_name: String,

    /// Email address
    pub email: String,

    /// Phone number
    pub phone: String,

    /// Street address
    pub address: String,

    /// City
    pub city: String,

    /// State
    pub state: String,

    /// ZIP / PIN code
    pub zip_code: String,

    /// Country
    pub country: String,
}

impl Default for BillingAddress {
    fn default() -> Self {
        Self {
            full_name: String::new(),
            email: String::new(),
            phone: String::new(),
            address: String::new(),
            city: String::new(),
            state: String::new(),
            zip_code: String::new(),
            country: "India".to_string(),
        }
    }
}

impl BillingAddress {
    /// The first required field that is blank, by its form label.
    pub fn missing_field(&self) -> Option<&'static str> {
        [
            ("full name", &self.full_name),
            ("email", &self.email),
            ("phone", &self.phone),
            ("address", &self.address),
            ("city", &self.city),
            ("state", &self.state),
            ("ZIP code", &self.zip_code),
            ("country", &self.country),
        ]
        .into_iter()
        .find(|(_, value)| value.trim().is_empty())
        .map(|(label, _)| label)
    }
}

/// A placed order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    user_id: Option<UserId>,
    items: Vec<CartLineItem>,
    billing_address: BillingAddress,
    subtotal: Decimal,
    shipping: Decimal,
    tax: Decimal,
    total: Decimal,
    currency: String,
    status: OrderStatus,
    created_at: Timestamp,
}

impl Order {
    /// Record a confirmed order for the given cart snapshot, pricing it with the storefront
    /// policy.
    pub fn confirmed(
        id: OrderId,
        user_id: Option<UserId>,
        items: Vec<CartLineItem>,
        billing_address: BillingAddress,
        currency: &Currency,
        created_at: Timestamp,
    ) -> Self {
        let OrderSummary {
            subtotal,
            shipping,
            tax,
            total,
        } = pricing::summarize(pricing::total_price(&items));

        Self {
            id,
            user_id,
            items,
            billing_address,
            subtotal,
            shipping,
            tax,
            total,
            currency: currency.iso_alpha_code.to_string(),
            status: OrderStatus::Confirmed,
            created_at,
        }
    }

    /// Order id
    pub fn id(&self) -> &OrderId {
        &self.id
    }

    /// User who placed the order
    pub fn user_id(&self) -> Option<&UserId> {
        self.user_id.as_ref()
    }

    /// Line items as they were at checkout
    pub fn items(&self) -> &[CartLineItem] {
        &self.items
    }

    /// Billing address
    pub fn billing_address(&self) -> &BillingAddress {
        &self.billing_address
    }

    /// Subtotal charged
    pub fn subtotal(&self) -> Decimal {
        self.subtotal
    }

    /// Shipping charged
    pub fn shipping(&self) -> Decimal {
        self.shipping
    }

    /// Tax charged
    pub fn tax(&self) -> Decimal {
        self.tax
    }

    /// Total charged
    pub fn total(&self) -> Decimal {
        self.total
    }

    /// ISO currency code of every amount
    pub fn currency(&self) -> &str {
        &self.currency
    }

    /// Status
    pub fn status(&self) -> OrderStatus {
        self.status
    }

    /// When the order was placed
    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// Units across all lines
    pub fn total_items(&self) -> u64 {
        self.items.iter().map(|line| u64::from(line.quantity)).sum()
    }
}

/// Read-only view over stored orders for the order history screen.
#[derive(Debug, Clone, Default)]
pub struct OrderHistory {
    orders: Vec<Order>,
}

impl OrderHistory {
    /// Wrap orders in storage (insertion) order
    pub fn new(orders: Vec<Order>) -> Self {
        Self { orders }
    }

    /// Load every stored order.
    ///
    /// # Errors
    ///
    /// Returns an [`OrderStoreError`] if the repository cannot be read.
    pub async fn load<R>(repository: &R) -> Result<Self, OrderStoreError>
    where
        R: OrderRepository + ?Sized,
    {
        Ok(Self::new(repository.load().await?))
    }

    /// Orders placed by a user, newest first
    pub fn for_user(&self, user: &UserId) -> Vec<&Order> {
        self.newest_first()
            .into_iter()
            .filter(|order| order.user_id() == Some(user))
            .collect()
    }

    /// Every order, newest first
    pub fn newest_first(&self) -> Vec<&Order> {
        let mut orders: Vec<&Order> = self.orders.iter().collect();

        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        orders
    }

    /// Find an order by id
    pub fn get(&self, id: &OrderId) -> Option<&Order> {
        self.orders.iter().find(|order| &order.id == id)
    }

    /// Number of orders
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    /// Whether there are no orders
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}
