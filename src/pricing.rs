//! Pricing
//!
//! Shipping and tax policy. The storefront shows an 8% tax estimate on the cart while invoices
//! apply 18% GST; the two rates are separate policies and must not be merged.

use decimal_percentage::Percentage;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Orders strictly above this subtotal ship for free.
pub const FREE_SHIPPING_THRESHOLD: Decimal = Decimal::from_parts(50, 0, 0, false, 0);

/// Flat shipping charge for orders at or below the threshold.
pub const FLAT_SHIPPING: Decimal = Decimal::from_parts(599, 0, 0, false, 2);

/// Tax estimate shown on the cart and charged at checkout.
pub fn cart_tax_rate() -> Percentage {
    Percentage::from(Decimal::new(8, 2))
}

/// GST applied when an invoice is generated.
pub fn invoice_gst_rate() -> Percentage {
    Percentage::from(Decimal::new(18, 2))
}

/// Something with a unit price and a quantity.
pub trait PricedLine {
    /// Price of a single unit
    fn unit_price(&self) -> Decimal;

    /// Number of units
    fn quantity(&self) -> u32;

    /// Unit price multiplied by quantity
    fn line_total(&self) -> Decimal {
        self.unit_price() * Decimal::from(self.quantity())
    }
}

/// Sum of line totals. Zero for no lines.
pub fn total_price<L: PricedLine>(lines: &[L]) -> Decimal {
    lines.iter().map(PricedLine::line_total).sum()
}

/// Shipping charge for a subtotal.
pub fn shipping(subtotal: Decimal) -> Decimal {
    if subtotal > FREE_SHIPPING_THRESHOLD {
        Decimal::ZERO
    } else {
        FLAT_SHIPPING
    }
}

/// Storefront tax estimate for a subtotal.
pub fn cart_tax(subtotal: Decimal) -> Decimal {
    apply_rate(cart_tax_rate(), subtotal)
}

/// Invoice GST for a subtotal.
pub fn invoice_tax(subtotal: Decimal) -> Decimal {
    apply_rate(invoice_gst_rate(), subtotal)
}

/// Subtotal plus shipping plus the storefront tax.
pub fn total(subtotal: Decimal) -> Decimal {
    subtotal + shipping(subtotal) + cart_tax(subtotal)
}

fn apply_rate(rate: Percentage, amount: Decimal) -> Decimal {
    (rate * amount).round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Derived checkout totals for a subtotal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSummary {
    /// Sum of line totals
    pub subtotal: Decimal,

    /// Shipping charge
    pub shipping: Decimal,

    /// Storefront tax
    pub tax: Decimal,

    /// Amount payable
    pub total: Decimal,
}

/// Compute the checkout totals for a subtotal.
pub fn summarize(subtotal: Decimal) -> OrderSummary {
    let shipping = shipping(subtotal);
    let tax = cart_tax(subtotal);

    OrderSummary {
        subtotal,
        shipping,
        tax,
        total: subtotal + shipping + tax,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Line(Decimal, u32);

    impl PricedLine for Line {
        fn unit_price(&self) -> Decimal {
            self.0
        }

        fn quantity(&self) -> u32 {
            self.1
        }
    }

    #[test]
    fn shipping_is_charged_at_the_threshold() {
        assert_eq!(shipping(Decimal::new(5000, 2)), Decimal::new(599, 2));
    }

    #[test]
    fn shipping_is_free_above_the_threshold() {
        assert_eq!(shipping(Decimal::new(5001, 2)), Decimal::ZERO);
    }

    #[test]
    fn cart_and_invoice_tax_use_different_rates() {
        assert_eq!(cart_tax(Decimal::ONE_HUNDRED), Decimal::new(800, 2));
        assert_eq!(invoice_tax(Decimal::ONE_HUNDRED), Decimal::new(1800, 2));
    }

    #[test]
    fn tax_is_rounded_to_two_places() {
        assert_eq!(cart_tax(Decimal::new(1234, 2)), Decimal::new(99, 2));
    }

    #[test]
    fn total_adds_shipping_and_tax() {
        assert_eq!(total(Decimal::new(49800, 2)), Decimal::new(53784, 2));
        assert_eq!(
            total(Decimal::new(1000, 2)),
            Decimal::new(1000, 2) + Decimal::new(599, 2) + Decimal::new(80, 2)
        );
    }

    #[test]
    fn summarize_matches_individual_policies() {
        let summary = summarize(Decimal::new(49800, 2));

        assert_eq!(
            summary,
            OrderSummary {
                subtotal: Decimal::new(49800, 2),
                shipping: Decimal::ZERO,
                tax: Decimal::new(3984, 2),
                total: Decimal::new(53784, 2),
            }
        );
    }

    #[test]
    fn total_price_sums_line_totals() {
        let lines = [
            Line(Decimal::new(24900, 2), 2),
            Line(Decimal::new(9900, 2), 1),
        ];

        assert_eq!(total_price(&lines), Decimal::new(59700, 2));
    }

    #[test]
    fn total_price_of_no_lines_is_zero() {
        let lines: [Line; 0] = [];

        assert_eq!(total_price(&lines), Decimal::ZERO);
    }
}
