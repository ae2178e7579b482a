//! Terminal tables
//!
//! Plain-text views of the catalog, cart and order history.

use std::io;

use rust_decimal::Decimal;
use rusty_money::{Money, iso::Currency};
use tabled::{
    builder::Builder,
    settings::{
        Alignment, Color, Style,
        object::{Columns, Rows},
    },
};

use crate::{
    cart::CartLineItem,
    catalog::{Product, Template},
    orders::Order,
    pricing::{OrderSummary, PricedLine},
};

/// Format an amount in the given currency, e.g. `₹249.00`.
pub fn money(amount: Decimal, currency: &Currency) -> String {
    Money::from_decimal(amount, currency).to_string()
}

fn money_for_code(amount: Decimal, code: &str) -> String {
    rusty_money::iso::find(code)
        .map_or_else(|| format!("{code} {amount:.2}"), |currency| money(amount, currency))
}

fn write_table(
    out: &mut impl io::Write,
    builder: Builder,
    right_aligned: Columns<std::ops::Range<usize>>,
) -> io::Result<()> {
    let mut table = builder.build();

    table.with(Style::modern_rounded());
    table.modify(Rows::first(), Color::BOLD);
    table.modify(right_aligned, Alignment::right());

    writeln!(out, "{table}")
}

/// Product listing
///
/// # Errors
///
/// Returns any error from writing to `out`.
pub fn write_products(
    out: &mut impl io::Write,
    products: &[&Product],
    currency: &Currency,
) -> io::Result<()> {
    let mut builder = Builder::default();

    builder.push_record(["ID", "Name", "Category", "Price", "Was", "Rating", "Tag"]);

    for product in products {
        builder.push_record([
            product.id().to_string(),
            product.name().to_string(),
            product.category().to_string(),
            money(product.price(), currency),
            product
                .original_price()
                .map(|was| {
                    let off = product
                        .discount_percent()
                        .map(|percent| format!(" (-{percent}%)"))
                        .unwrap_or_default();
                    format!("{}{off}", money(was, currency))
                })
                .unwrap_or_default(),
            product.rating().to_string(),
            product.tag().unwrap_or_default().to_string(),
        ]);
    }

    write_table(out, builder, Columns::new(3..6))
}

/// Template listing
///
/// # Errors
///
/// Returns any error from writing to `out`.
pub fn write_templates(out: &mut impl io::Write, templates: &[Template]) -> io::Result<()> {
    let mut builder = Builder::default();

    builder.push_record(["ID", "Name", "Category", "Description"]);

    for template in templates {
        builder.push_record([
            template.id().to_string(),
            template.name().to_string(),
            template.category().to_string(),
            template.description().to_string(),
        ]);
    }

    write_table(out, builder, Columns::new(0..1))
}

/// Cart lines followed by the order summary
///
/// # Errors
///
/// Returns any error from writing to `out`.
pub fn write_cart(
    out: &mut impl io::Write,
    lines: &[CartLineItem],
    summary: &OrderSummary,
    currency: &Currency,
) -> io::Result<()> {
    if lines.is_empty() {
        return writeln!(out, "Your cart is empty");
    }

    let mut builder = Builder::default();

    builder.push_record(["#", "Product", "Customization", "Qty", "Unit", "Amount"]);

    for (idx, line) in lines.iter().enumerate() {
        builder.push_record([
            format!("{}", idx + 1),
            line.name.clone(),
            line.customization
                .as_ref()
                .map(|c| format!("\"{}\" {} {}", c.text, c.font, c.color))
                .unwrap_or_default(),
            line.quantity.to_string(),
            money(line.unit_price, currency),
            money(line.line_total(), currency),
        ]);
    }

    write_table(out, builder, Columns::new(3..6))?;

    write_summary(out, summary, currency)
}

fn write_summary(
    out: &mut impl io::Write,
    summary: &OrderSummary,
    currency: &Currency,
) -> io::Result<()> {
    let shipping = if summary.shipping.is_zero() {
        "Free".to_string()
    } else {
        money(summary.shipping, currency)
    };

    let rows = [
        ("Subtotal", money(summary.subtotal, currency)),
        ("Shipping", shipping),
        ("Tax", money(summary.tax, currency)),
        ("Total", money(summary.total, currency)),
    ];

    let width = rows
        .iter()
        .map(|(_, value)| value.chars().count())
        .max()
        .unwrap_or(0);

    for (label, value) in rows {
        writeln!(out, " {label:<10}{value:>width$}")?;
    }

    Ok(())
}

/// Order history, in the order given
///
/// # Errors
///
/// Returns any error from writing to `out`.
pub fn write_orders(out: &mut impl io::Write, orders: &[&Order]) -> io::Result<()> {
    if orders.is_empty() {
        return writeln!(out, "No orders yet");
    }

    let mut builder = Builder::default();

    builder.push_record(["Order", "Placed", "Items", "Total", "Status"]);

    for order in orders {
        builder.push_record([
            format!("#{}", order.id()),
            order.created_at().strftime("%Y-%m-%d %H:%M").to_string(),
            order.total_items().to_string(),
            money_for_code(order.total(), order.currency()),
            order.status().to_string(),
        ]);
    }

    write_table(out, builder, Columns::new(2..4))
}
