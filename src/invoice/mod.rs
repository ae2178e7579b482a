//! Invoice Renderer
//!
//! Renders a stored order as a standalone, printable HTML invoice. Invoice totals are recomputed
//! from the line items with 18% GST and no shipping, so they intentionally differ from the
//! amounts charged at checkout.

use std::{
    io,
    path::{Path, PathBuf},
    process::Command,
};

use jiff::{civil::Date, tz::TimeZone};
use mockall::automock;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    conversion::{Download, DownloadSink},
    notify::{Notice, Notifier},
    orders::Order,
    pricing,
};

mod html;

pub use html::escape;

/// Seller name printed on every invoice
pub const COMPANY_NAME: &str = "EduPrint Solutions";

/// Seller tagline
pub const COMPANY_TAGLINE: &str = "Quality Educational Materials & Printing Services";

/// Inputs that would otherwise come from the clock and locale.
#[derive(Debug, Clone)]
pub struct InvoiceOptions {
    /// Printed as the invoice date
    pub issued_on: Date,

    /// Zone the order timestamp is shown in
    pub time_zone: TimeZone,
}

impl InvoiceOptions {
    /// Issue today, in the system time zone.
    pub fn today() -> Self {
        let now = jiff::Zoned::now();

        Self {
            issued_on: now.date(),
            time_zone: now.time_zone().clone(),
        }
    }
}

/// Invoice totals
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvoiceTotals {
    /// Sum of line amounts
    pub subtotal: Decimal,

    /// GST on the subtotal
    pub gst: Decimal,

    /// Subtotal plus GST
    pub total: Decimal,
}

impl InvoiceTotals {
    /// Recompute totals from the order's line items.
    pub fn for_order(order: &Order) -> Self {
        let subtotal = pricing::total_price(order.items());
        let gst = pricing::invoice_tax(subtotal);

        Self {
            subtotal,
            gst,
            total: subtotal + gst,
        }
    }
}

/// Render an order as an HTML document.
pub fn render(order: &Order, options: &InvoiceOptions) -> String {
    html::document(order, InvoiceTotals::for_order(order), options)
}

/// A rendered invoice, ready to save
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceArtifact {
    /// `Invoice-{order id}.html`
    pub file_name: String,

    /// Rendered document
    pub html: String,
}

impl InvoiceArtifact {
    /// Render the invoice for an order
    pub fn for_order(order: &Order, options: &InvoiceOptions) -> Self {
        Self {
            file_name: format!("Invoice-{}.html", order.id()),
            html: render(order, options),
        }
    }
}

/// The print view could not be opened.
#[derive(Debug, Error)]
#[error("print view could not be opened")]
pub struct PopupBlocked {
    /// Why, when known
    #[source]
    pub source: Option<io::Error>,
}

/// Invoice errors
#[derive(Debug, Error)]
pub enum InvoiceError {
    /// The invoice file could not be saved
    #[error("failed to save invoice: {0}")]
    Save(#[source] io::Error),
}

/// Opens a saved invoice for printing.
#[automock]
pub trait InvoicePresenter: Send + Sync {
    /// Show the invoice saved at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`PopupBlocked`] if no print view could be opened.
    fn present(&self, artifact: &InvoiceArtifact, path: &Path) -> Result<(), PopupBlocked>;
}

/// Hands the saved file to a desktop opener command (`xdg-open`, `open`).
#[derive(Debug, Clone)]
pub struct CommandPresenter {
    program: String,
}

impl CommandPresenter {
    /// Use the given opener
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for CommandPresenter {
    fn default() -> Self {
        Self::new(if cfg!(target_os = "macos") {
            "open"
        } else {
            "xdg-open"
        })
    }
}

impl InvoicePresenter for CommandPresenter {
    fn present(&self, _artifact: &InvoiceArtifact, path: &Path) -> Result<(), PopupBlocked> {
        let status = Command::new(&self.program)
            .arg(path)
            .status()
            .map_err(|error| PopupBlocked {
                source: Some(error),
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(PopupBlocked { source: None })
        }
    }
}

/// A saved invoice
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceDelivery {
    /// Where the sink put it
    pub saved_to: PathBuf,

    /// Whether the print view opened
    pub presented: bool,
}

/// Save the invoice for an order, then try to open it for printing.
///
/// A blocked print view is reported to the shopper but does not fail the delivery.
///
/// # Errors
///
/// Returns [`InvoiceError::Save`] if the invoice file cannot be written.
pub async fn deliver(
    order: &Order,
    options: &InvoiceOptions,
    presenter: Option<&dyn InvoicePresenter>,
    sink: &dyn DownloadSink,
    notifier: &dyn Notifier,
) -> Result<InvoiceDelivery, InvoiceError> {
    let artifact = InvoiceArtifact::for_order(order, options);

    let saved_to = sink
        .save(Download {
            file_name: artifact.file_name.clone(),
            content_type: "text/html",
            bytes: artifact.html.clone().into_bytes(),
        })
        .await
        .map_err(|error| {
            notifier.notify(Notice::destructive(
                "Invoice failed",
                "Error generating invoice. Please try again.",
            ));

            InvoiceError::Save(error)
        })?;

    info!(order = %order.id(), path = %saved_to.display(), "invoice saved");

    let Some(presenter) = presenter else {
        return Ok(InvoiceDelivery {
            saved_to,
            presented: false,
        });
    };

    let presented = match presenter.present(&artifact, &saved_to) {
        Ok(()) => {
            debug!(order = %order.id(), "invoice print view opened");
            true
        }
        Err(error) => {
            warn!(%error, "invoice print view blocked");

            notifier.notify(Notice::destructive(
                "Print view blocked",
                "Please allow popups to download the invoice",
            ));

            false
        }
    };

    Ok(InvoiceDelivery {
        saved_to,
        presented,
    })
}

#[cfg(test)]
mod tests {
    use jiff::Timestamp;
    use rusty_money::iso;
    use testresult::TestResult;

    use crate::{
        cart::{CartLineItem, LineId},
        catalog::ProductId,
        conversion::{DirectorySink, sink::MockDownloadSink},
        notify::{RecordingNotifier, Severity},
        orders::{BillingAddress, OrderId},
    };

    use super::*;

    fn line(name: &str, minor: i64, quantity: u32) -> CartLineItem {
        CartLineItem {
            line_id: LineId::new(),
            product_id: ProductId(1),
            name: name.to_string(),
            unit_price: Decimal::new(minor, 2),
            image: "key.jpg".to_string(),
            quantity,
            customization: None,
        }
    }

    fn order(items: Vec<CartLineItem>) -> Result<Order, jiff::Error> {
        let at = Timestamp::from_millisecond(1_700_000_000_000)?;

        Ok(Order::confirmed(
            OrderId::from_timestamp(at),
            None,
            items,
            BillingAddress {
                full_name: "Asha <Rao>".to_string(),
                address: "12 MG Road".to_string(),
                city: "Pune".to_string(),
                state: "Maharashtra".to_string(),
                zip_code: "411001".to_string(),
                ..BillingAddress::default()
            },
            iso::INR,
            at,
        ))
    }

    fn options() -> InvoiceOptions {
        InvoiceOptions {
            issued_on: jiff::civil::date(2024, 3, 5),
            time_zone: TimeZone::UTC,
        }
    }

    #[test]
    fn totals_use_gst_without_shipping() -> TestResult {
        let totals = InvoiceTotals::for_order(&order(vec![line("Keychain", 24900, 2)])?);

        assert_eq!(totals.subtotal, Decimal::new(49800, 2));
        assert_eq!(totals.gst, Decimal::new(8964, 2));
        assert_eq!(totals.total, Decimal::new(58764, 2));

        Ok(())
    }

    #[test]
    fn renders_header_details_and_lines() -> TestResult {
        let html = render(&order(vec![line("Keychain", 24900, 2)])?, &options());

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("INV-1700000000000"));
        assert!(html.contains("EduPrint Solutions"));
        assert!(html.contains("5/3/2024"));
        assert!(html.contains("14/11/2023"));
        assert!(html.contains("confirmed"));
        assert!(html.contains("₹249.00"));
        assert!(html.contains("₹498.00"));
        assert!(html.contains("GST (18%)"));
        assert!(html.contains("₹89.64"));
        assert!(html.contains("₹587.64"));

        Ok(())
    }

    #[test]
    fn interpolated_text_is_escaped() -> TestResult {
        let html = render(&order(vec![line("Pen & <Ink>", 9900, 1)])?, &options());

        assert!(html.contains("Asha &lt;Rao&gt;"));
        assert!(html.contains("Pen &amp; &lt;Ink&gt;"));
        assert!(!html.contains("<Ink>"));

        Ok(())
    }

    #[test]
    fn zero_items_render_an_empty_table() -> TestResult {
        let html = render(&order(Vec::new())?, &options());

        assert!(html.contains("<tbody>\n</tbody>"));
        assert!(html.contains("₹0.00"));

        Ok(())
    }

    #[tokio::test]
    async fn blocked_print_view_still_saves_the_file() -> TestResult {
        let dir = tempfile::tempdir()?;
        let sink = DirectorySink::new(dir.path());
        let notifier = RecordingNotifier::new();
        let order = order(vec![line("Keychain", 24900, 1)])?;

        let mut presenter = MockInvoicePresenter::new();
        presenter
            .expect_present()
            .times(1)
            .returning(|_, _| Err(PopupBlocked { source: None }));

        let delivery = deliver(&order, &options(), Some(&presenter), &sink, &notifier).await?;

        assert!(!delivery.presented);
        assert_eq!(
            delivery.saved_to,
            dir.path().join("Invoice-1700000000000.html")
        );
        assert!(std::fs::read_to_string(&delivery.saved_to)?.contains("INV-1700000000000"));
        assert_eq!(
            notifier.notices(),
            vec![Notice::destructive(
                "Print view blocked",
                "Please allow popups to download the invoice"
            )]
        );

        Ok(())
    }

    #[tokio::test]
    async fn save_failures_are_errors() -> TestResult {
        let notifier = RecordingNotifier::new();
        let order = order(Vec::new())?;

        let mut sink = MockDownloadSink::new();
        sink.expect_save()
            .returning(|_| Err(io::Error::other("disk full")));

        let result = deliver(&order, &options(), None, &sink, &notifier).await;

        assert!(matches!(result, Err(InvoiceError::Save(_))));
        assert!(
            notifier
                .notices()
                .iter()
                .all(|notice| notice.severity == Severity::Destructive)
        );

        Ok(())
    }
}
