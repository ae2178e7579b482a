//! Invoice markup

use jiff::civil::Date;
use rust_decimal::Decimal;
use rusty_money::iso;

use crate::{
    invoice::{COMPANY_NAME, COMPANY_TAGLINE, InvoiceOptions, InvoiceTotals},
    orders::Order,
    pricing::PricedLine,
};

const STYLES: &str = r"
    * { margin: 0; padding: 0; box-sizing: border-box; }
    body {
      font-family: 'Inter', -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
      background: #ffffff;
      color: #1a1a1a;
      line-height: 1.5;
      font-size: 14px;
    }
    .invoice-container { max-width: 800px; margin: 60px auto; }
    .header {
      display: flex;
      justify-content: space-between;
      align-items: flex-start;
      padding-bottom: 60px;
      border-bottom: 1px solid #e5e5e5;
      margin-bottom: 60px;
    }
    .company-name { font-size: 24px; font-weight: 600; margin-bottom: 8px; }
    .company-tagline { color: #666666; }
    .invoice-meta { text-align: right; min-width: 200px; }
    .invoice-title { font-size: 32px; font-weight: 300; margin-bottom: 8px; }
    .invoice-number { font-size: 16px; color: #666666; }
    .main-content { display: grid; grid-template-columns: 1fr 1fr; gap: 60px; margin-bottom: 60px; }
    .section-title {
      font-size: 12px;
      font-weight: 600;
      text-transform: uppercase;
      letter-spacing: 0.05em;
      color: #666666;
      margin-bottom: 16px;
    }
    .info-item { margin-bottom: 12px; }
    .info-label { font-size: 12px; color: #999999; }
    .status-badge { display: inline-block; text-transform: capitalize; font-weight: 500; }
    .items-title { font-size: 16px; font-weight: 600; margin-bottom: 16px; }
    .items-table { width: 100%; border-collapse: collapse; margin-bottom: 40px; }
    .items-table th {
      text-align: left;
      font-size: 12px;
      color: #666666;
      padding: 12px 0;
      border-bottom: 1px solid #e5e5e5;
    }
    .items-table td { padding: 16px 0; border-bottom: 1px solid #f5f5f5; }
    .item-quantity, .item-price { text-align: right; }
    .totals-section { margin-left: auto; width: 300px; }
    .total-row { display: flex; justify-content: space-between; padding: 8px 0; }
    .total-row.final { border-top: 1px solid #1a1a1a; font-weight: 600; font-size: 16px; }
    .footer {
      display: flex;
      justify-content: space-between;
      margin-top: 80px;
      padding-top: 40px;
      border-top: 1px solid #e5e5e5;
      color: #666666;
      font-size: 12px;
    }
    .footer-company { font-weight: 600; color: #1a1a1a; }
    @media print {
      .invoice-container { margin: 0; max-width: none; }
    }
";

/// Escape text for use in HTML element content and attribute values.
pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());

    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }

    escaped
}

/// `d/m/yyyy`, the Indian English short date.
fn short_date(date: Date) -> String {
    format!("{}/{}/{}", date.day(), date.month(), date.year())
}

struct Amounts {
    symbol: String,
}

impl Amounts {
    fn for_code(code: &str) -> Self {
        let symbol = iso::find(code).map_or_else(|| format!("{code} "), |c| c.symbol.to_string());

        Self { symbol }
    }

    fn show(&self, amount: Decimal) -> String {
        format!("{}{:.2}", escape(&self.symbol), amount)
    }
}

pub(super) fn document(order: &Order, totals: InvoiceTotals, options: &InvoiceOptions) -> String {
    let amounts = Amounts::for_code(order.currency());
    let billing = order.billing_address();
    let id = escape(order.id().as_str());
    let order_date = order
        .created_at()
        .to_zoned(options.time_zone.clone())
        .date();

    let rows: String = order
        .items()
        .iter()
        .map(|item| {
            format!(
                "<tr>\
                 <td class=\"item-name\">{}</td>\
                 <td class=\"item-quantity\">{}</td>\
                 <td class=\"item-price\">{}</td>\
                 <td class=\"item-price\">{}</td>\
                 </tr>\n",
                escape(&item.name),
                item.quantity,
                amounts.show(item.unit_price),
                amounts.show(item.line_total()),
            )
        })
        .collect();

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="UTF-8">
<title>Invoice - {id}</title>
<style>{STYLES}</style>
</head>
<body>
<div class="invoice-container">
<div class="header">
<div class="company-info">
<div class="company-name">{company}</div>
<div class="company-tagline">{tagline}</div>
</div>
<div class="invoice-meta">
<div class="invoice-title">Invoice</div>
<div class="invoice-number">INV-{id}</div>
</div>
</div>
<div class="main-content">
<div class="info-section">
<div class="section-title">Invoice Details</div>
<div class="info-item"><div class="info-label">Order ID</div><div class="info-value">{id}</div></div>
<div class="info-item"><div class="info-label">Invoice Date</div><div class="info-value">{issued}</div></div>
<div class="info-item"><div class="info-label">Order Date</div><div class="info-value">{ordered}</div></div>
<div class="info-item"><div class="info-label">Status</div><div class="status-badge">{status}</div></div>
</div>
<div class="info-section">
<div class="section-title">Bill To</div>
<div class="info-item"><div class="info-label">Name</div><div class="info-value">{name}</div></div>
<div class="info-item"><div class="info-label">Address</div><div class="info-value">{address}<br>
{city}, {state} {zip}<br>
{country}</div></div>
</div>
</div>
<div class="items-section">
<div class="items-title">Items</div>
<table class="items-table">
<thead>
<tr><th>Description</th><th>Qty</th><th>Unit Price</th><th>Amount</th></tr>
</thead>
<tbody>
{rows}</tbody>
</table>
</div>
<div class="totals-section">
<div class="total-row"><span class="total-label">Subtotal</span><span class="total-value">{subtotal}</span></div>
<div class="total-row"><span class="total-label">GST (18%)</span><span class="total-value">{gst}</span></div>
<div class="total-row final"><span class="total-label">Total</span><span class="total-value">{total}</span></div>
</div>
<div class="footer">
<div class="footer-left">
<div class="footer-company">{company}</div>
<div class="footer-address">123 Business Park<br>Mumbai, Maharashtra 400001</div>
</div>
<div class="footer-right">
<div class="footer-contact">orders@eduprint.com<br>+91-22-1234-5678</div>
</div>
</div>
</div>
</body>
</html>
"#,
        company = escape(COMPANY_NAME),
        tagline = escape(COMPANY_TAGLINE),
        issued = short_date(options.issued_on),
        ordered = short_date(order_date),
        status = order.status(),
        name = escape(&billing.full_name),
        address = escape(&billing.address),
        city = escape(&billing.city),
        state = escape(&billing.state),
        zip = escape(&billing.zip_code),
        country = escape(&billing.country),
        subtotal = amounts.show(totals.subtotal),
        gst = amounts.show(totals.gst),
        total = amounts.show(totals.total),
    )
}
