//! Cart
//!
//! The cart engine owns the shopper's line items. Totals are always derived from the current
//! lines, never stored. Every mutation writes a snapshot through the [`CartStore`]; a failed
//! write is logged and the in-memory cart stays authoritative.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    catalog::{Product, ProductId},
    pricing::{self, OrderSummary, PricedLine},
};

pub mod store;

pub use store::{CartStore, JsonFileCartStore, MemoryCartStore};

/// Identifies a single cart line, independent of its product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineId(Uuid);

impl LineId {
    /// Generate a fresh line id
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for LineId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Personalisation captured when a customizable product is added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customization {
    /// Text to print
    pub text: String,

    /// Font family
    pub font: String,

    /// Hex colour, e.g. `#000000`
    pub color: String,

    /// Placement, e.g. `center` or `top-left`
    pub position: String,
}

impl Customization {
    /// Customization with the given text and the dialog's default styling
    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }
}

impl Default for Customization {
    fn default() -> Self {
        Self {
            text: String::new(),
            font: "Arial".to_string(),
            color: "#000000".to_string(),
            position: "center".to_string(),
        }
    }
}

/// A request to add one unit of a product.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCartItem {
    /// Product id
    pub product_id: ProductId,

    /// Product name at the time of adding
    pub name: String,

    /// Unit price at the time of adding
    pub unit_price: Decimal,

    /// Image reference at the time of adding
    pub image: String,

    /// Optional personalisation
    pub customization: Option<Customization>,
}

impl NewCartItem {
    /// Snapshot an un-customized catalog product
    pub fn from_product(product: &Product) -> Self {
        Self {
            product_id: product.id(),
            name: product.name().to_string(),
            unit_price: product.price(),
            image: product.image().to_string(),
            customization: None,
        }
    }

    /// Snapshot a catalog product with a personalisation.
    ///
    /// Products that are not customizable ignore the record, as the storefront only collects one
    /// for customizable products.
    pub fn customized(product: &Product, customization: Customization) -> Self {
        Self {
            customization: product.is_customizable().then_some(customization),
            ..Self::from_product(product)
        }
    }
}

/// One cart row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLineItem {
    /// Line id
    pub line_id: LineId,

    /// Product id
    pub product_id: ProductId,

    /// Product name snapshot
    pub name: String,

    /// Unit price snapshot
    pub unit_price: Decimal,

    /// Image reference snapshot
    pub image: String,

    /// Number of units
    pub quantity: u32,

    /// Personalisation, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customization: Option<Customization>,
}

impl CartLineItem {
    /// Whether the line carries a personalisation
    pub fn is_customized(&self) -> bool {
        self.customization.is_some()
    }
}

impl PricedLine for CartLineItem {
    fn unit_price(&self) -> Decimal {
        self.unit_price
    }

    fn quantity(&self) -> u32 {
        self.quantity
    }
}

/// Cart Engine
#[derive(Debug)]
pub struct CartEngine<S> {
    lines: Vec<CartLineItem>,
    store: S,
}

impl<S: CartStore> CartEngine<S> {
    /// An empty cart backed by `store`. Nothing is loaded from the store.
    pub fn new(store: S) -> Self {
        Self {
            lines: Vec::new(),
            store,
        }
    }

    /// Reload the cart saved in `store`, starting empty if the snapshot is unreadable.
    pub fn restore(store: S) -> Self {
        let lines = store.load().unwrap_or_else(|error| {
            warn!(%error, "discarding unreadable cart snapshot");
            Vec::new()
        });

        let lines = lines.into_iter().filter(|line| line.quantity > 0).collect();

        Self { lines, store }
    }

    /// Add one unit of a product.
    ///
    /// Un-customized items merge into the existing un-customized line for the product.
    /// Customized items always start a new line. Returns the id of the affected line.
    pub fn add_to_cart(&mut self, item: NewCartItem) -> LineId {
        let existing = if item.customization.is_none() {
            self.lines
                .iter_mut()
                .find(|line| line.product_id == item.product_id && !line.is_customized())
        } else {
            None
        };

        let line_id = if let Some(line) = existing {
            line.quantity = line.quantity.saturating_add(1);
            line.line_id
        } else {
            let line_id = LineId::new();

            self.lines.push(CartLineItem {
                line_id,
                product_id: item.product_id,
                name: item.name,
                unit_price: item.unit_price,
                image: item.image,
                quantity: 1,
                customization: item.customization,
            });

            line_id
        };

        debug!(product_id = %item.product_id, %line_id, "added to cart");

        self.persist();

        line_id
    }

    /// Set the quantity of a product's line; zero removes the line.
    ///
    /// The targeted line is the product's un-customized line if it has one, otherwise its first
    /// line in cart order. Use [`Self::update_line_quantity`] to address a specific
    /// customized line.
    pub fn update_quantity(&mut self, product_id: ProductId, quantity: u32) {
        if let Some(line_id) = self.target_line(product_id) {
            self.update_line_quantity(line_id, quantity);
        }
    }

    /// As [`Self::update_quantity`], for callers holding a signed quantity. Anything at or
    /// below zero removes the line.
    pub fn update_quantity_signed(&mut self, product_id: ProductId, quantity: i64) {
        let quantity = u32::try_from(quantity.max(0)).unwrap_or(u32::MAX);

        self.update_quantity(product_id, quantity);
    }

    /// Set the quantity of one line; zero removes it. Returns whether the line existed.
    pub fn update_line_quantity(&mut self, line_id: LineId, quantity: u32) -> bool {
        if quantity == 0 {
            return self.remove_line(line_id);
        }

        let Some(line) = self.lines.iter_mut().find(|line| line.line_id == line_id) else {
            return false;
        };

        line.quantity = quantity;

        debug!(%line_id, quantity, "updated cart quantity");

        self.persist();

        true
    }

    /// Remove every line for a product.
    pub fn remove_from_cart(&mut self, product_id: ProductId) {
        let before = self.lines.len();

        self.lines.retain(|line| line.product_id != product_id);

        if self.lines.len() != before {
            debug!(%product_id, removed = before - self.lines.len(), "removed from cart");
            self.persist();
        }
    }

    /// Remove one line. Returns whether the line existed.
    pub fn remove_line(&mut self, line_id: LineId) -> bool {
        let before = self.lines.len();

        self.lines.retain(|line| line.line_id != line_id);

        let removed = self.lines.len() != before;

        if removed {
            debug!(%line_id, "removed cart line");
            self.persist();
        }

        removed
    }

    /// Empty the cart.
    pub fn clear_cart(&mut self) {
        self.lines.clear();

        debug!("cleared cart");

        self.persist();
    }

    /// Units of a product across all of its lines.
    pub fn cart_item_quantity(&self, product_id: ProductId) -> u64 {
        self.lines
            .iter()
            .filter(|line| line.product_id == product_id)
            .map(|line| u64::from(line.quantity))
            .sum()
    }

    /// Units across the whole cart.
    pub fn total_items(&self) -> u64 {
        self.lines.iter().map(|line| u64::from(line.quantity)).sum()
    }

    /// Sum of unit price × quantity over all lines.
    pub fn total_price(&self) -> Decimal {
        pricing::total_price(&self.lines)
    }

    /// Shipping, tax and total for the current lines.
    pub fn summary(&self) -> OrderSummary {
        pricing::summarize(self.total_price())
    }

    /// Lines in the order they were added
    pub fn lines(&self) -> &[CartLineItem] {
        &self.lines
    }

    /// A line by id
    pub fn line(&self, line_id: LineId) -> Option<&CartLineItem> {
        self.lines.iter().find(|line| line.line_id == line_id)
    }

    /// Whether the cart has no lines
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// The backing store
    pub fn store(&self) -> &S {
        &self.store
    }

    fn target_line(&self, product_id: ProductId) -> Option<LineId> {
        let mut matching = self
            .lines
            .iter()
            .filter(|line| line.product_id == product_id);

        let first = matching.clone().next()?;

        Some(
            matching
                .find(|line| !line.is_customized())
                .unwrap_or(first)
                .line_id,
        )
    }

    fn persist(&mut self) {
        if let Err(error) = self.store.save(&self.lines) {
            warn!(%error, "failed to persist cart snapshot");
        }
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use crate::storage::StorageError;

    use super::{store::MockCartStore, *};

    fn item(id: u32, minor: i64) -> NewCartItem {
        NewCartItem {
            product_id: ProductId(id),
            name: format!("Product {id}"),
            unit_price: Decimal::new(minor, 2),
            image: format!("{id}.jpg"),
            customization: None,
        }
    }

    fn customized(id: u32, minor: i64, text: &str) -> NewCartItem {
        NewCartItem {
            customization: Some(Customization::with_text(text)),
            ..item(id, minor)
        }
    }

    fn cart() -> CartEngine<MemoryCartStore> {
        CartEngine::new(MemoryCartStore::new())
    }

    fn assert_totals_consistent(cart: &CartEngine<MemoryCartStore>) {
        let quantities: u64 = cart.lines().iter().map(|l| u64::from(l.quantity)).sum();

        assert_eq!(cart.total_items(), quantities, "total items drifted from lines");
        assert!(
            cart.lines().iter().all(|l| l.quantity > 0),
            "cart kept an empty line"
        );
    }

    #[test]
    fn adding_the_same_product_merges_lines() {
        let mut cart = cart();

        let first = cart.add_to_cart(item(1, 24900));
        let second = cart.add_to_cart(item(1, 24900));

        assert_eq!(first, second);
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.cart_item_quantity(ProductId(1)), 2);
        assert_eq!(cart.total_price(), Decimal::new(49800, 2));
    }

    #[test]
    fn customized_items_never_merge() {
        let mut cart = cart();

        cart.add_to_cart(item(1, 24900));
        cart.add_to_cart(customized(1, 24900, "ACME"));
        cart.add_to_cart(customized(1, 24900, "ACME"));
        cart.add_to_cart(item(1, 24900));

        assert_eq!(cart.lines().len(), 3);
        assert_eq!(cart.cart_item_quantity(ProductId(1)), 4);
        assert_eq!(cart.lines().first().map(|l| l.quantity), Some(2));
    }

    #[test]
    fn price_is_snapshotted_at_add_time() {
        let mut cart = cart();

        cart.add_to_cart(item(1, 100));
        cart.add_to_cart(item(1, 999));

        assert_eq!(cart.total_price(), Decimal::new(200, 2));
    }

    #[test]
    fn update_quantity_to_zero_matches_remove() {
        let mut updated = cart();
        let mut removed = cart();

        for cart in [&mut updated, &mut removed] {
            cart.add_to_cart(item(1, 100));
            cart.add_to_cart(item(2, 200));
        }

        updated.update_quantity(ProductId(1), 0);
        removed.remove_from_cart(ProductId(1));

        let remaining = |cart: &CartEngine<MemoryCartStore>| {
            cart.lines()
                .iter()
                .map(|l| (l.product_id, l.quantity))
                .collect::<Vec<_>>()
        };

        assert_eq!(remaining(&updated), remaining(&removed));
        assert_eq!(updated.total_price(), removed.total_price());
    }

    #[test]
    fn signed_quantities_at_or_below_zero_remove() {
        let mut cart = cart();

        cart.add_to_cart(item(1, 100));
        cart.update_quantity_signed(ProductId(1), -3);

        assert!(cart.is_empty());
    }

    #[test]
    fn update_quantity_prefers_the_plain_line() {
        let mut cart = cart();

        cart.add_to_cart(customized(1, 100, "A"));
        cart.add_to_cart(item(1, 100));

        cart.update_quantity(ProductId(1), 5);

        let quantities: Vec<(bool, u32)> = cart
            .lines()
            .iter()
            .map(|l| (l.is_customized(), l.quantity))
            .collect();

        assert_eq!(quantities, vec![(true, 1), (false, 5)]);
    }

    #[test]
    fn update_quantity_falls_back_to_the_first_customized_line() {
        let mut cart = cart();

        cart.add_to_cart(customized(1, 100, "A"));
        cart.add_to_cart(customized(1, 100, "B"));

        cart.update_quantity(ProductId(1), 3);

        let quantities: Vec<u32> = cart.lines().iter().map(|l| l.quantity).collect();

        assert_eq!(quantities, vec![3, 1]);
    }

    #[test]
    fn line_operations_address_one_line() -> TestResult {
        let mut cart = cart();

        cart.add_to_cart(customized(1, 100, "A"));
        let second = cart.add_to_cart(customized(1, 100, "B"));

        assert!(cart.update_line_quantity(second, 4));

        let line = cart.line(second).ok_or("line missing")?;
        assert_eq!(line.quantity, 4);

        assert!(cart.remove_line(second));
        assert!(!cart.remove_line(second));
        assert_eq!(cart.lines().len(), 1);

        Ok(())
    }

    #[test]
    fn remove_from_cart_removes_every_matching_line() {
        let mut cart = cart();

        cart.add_to_cart(item(1, 100));
        cart.add_to_cart(customized(1, 100, "A"));
        cart.add_to_cart(item(2, 100));

        cart.remove_from_cart(ProductId(1));

        assert_eq!(cart.cart_item_quantity(ProductId(1)), 0);
        assert_eq!(cart.total_items(), 1);
    }

    #[test]
    fn clear_cart_is_idempotent() {
        let mut cart = cart();

        cart.add_to_cart(item(1, 100));

        cart.clear_cart();
        assert!(cart.is_empty());

        cart.clear_cart();
        assert!(cart.is_empty());
        assert_eq!(cart.total_price(), Decimal::ZERO);
    }

    #[test]
    fn totals_follow_every_mutation() {
        let mut cart = cart();

        cart.add_to_cart(item(1, 100));
        assert_totals_consistent(&cart);

        cart.add_to_cart(item(2, 250));
        cart.add_to_cart(customized(2, 250, "X"));
        assert_totals_consistent(&cart);

        cart.update_quantity(ProductId(2), 7);
        assert_totals_consistent(&cart);
        assert_eq!(cart.total_items(), 9);

        cart.update_quantity(ProductId(3), 2);
        assert_totals_consistent(&cart);

        cart.remove_from_cart(ProductId(1));
        assert_totals_consistent(&cart);
        assert_eq!(cart.total_items(), 8);
    }

    #[test]
    fn total_price_ignores_add_order() {
        let mut forwards = cart();
        let mut backwards = cart();

        let adds = [
            item(1, 24900),
            item(2, 79900),
            customized(6, 9900, "Hi"),
            item(1, 24900),
        ];

        for add in adds.iter().cloned() {
            forwards.add_to_cart(add);
        }

        for add in adds.iter().rev().cloned() {
            backwards.add_to_cart(add);
        }

        assert_eq!(forwards.total_price(), backwards.total_price());
        assert_eq!(forwards.total_items(), backwards.total_items());
    }

    #[test]
    fn every_mutation_persists_a_snapshot() {
        let mut cart = cart();

        cart.add_to_cart(item(1, 100));
        cart.update_quantity(ProductId(1), 3);
        cart.clear_cart();

        assert_eq!(cart.store().save_count(), 3);
        assert!(cart.store().saved().is_empty());
    }

    #[test]
    fn failed_persistence_does_not_fail_the_mutation() {
        let mut store = MockCartStore::new();
        store.expect_save().times(2).returning(|_| {
            Err(StorageError::Io(std::io::Error::other("disk full")))
        });

        let mut cart = CartEngine::new(store);

        cart.add_to_cart(item(1, 100));
        cart.add_to_cart(item(1, 100));

        assert_eq!(cart.total_items(), 2);
    }

    #[test]
    fn restore_reloads_a_file_snapshot() -> TestResult {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("cart.json");

        let mut cart = CartEngine::new(JsonFileCartStore::new(&path));
        cart.add_to_cart(item(1, 24900));
        cart.add_to_cart(customized(6, 9900, "Team"));
        cart.update_quantity(ProductId(1), 2);

        let restored = CartEngine::restore(JsonFileCartStore::new(&path));

        assert_eq!(restored.lines(), cart.lines());
        assert_eq!(restored.total_price(), Decimal::new(59700, 2));

        Ok(())
    }

    #[test]
    fn restore_starts_empty_when_the_snapshot_is_unreadable() {
        let mut store = MockCartStore::new();
        store
            .expect_load()
            .returning(|| Err(StorageError::Io(std::io::Error::other("gone"))));

        let cart = CartEngine::restore(store);

        assert!(cart.is_empty());
    }
}
