//! CLI configuration

use std::{path::PathBuf, time::Duration};

use clap::{Args, Parser, Subcommand};
use eduprint::{
    catalog::{PriceRange, ProductId, TemplateId},
    conversion::TargetFormat,
    orders::BillingAddress,
    session::{Session, User, UserId},
};

/// Log output format.
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum LogFormat {
    /// Compact, human-readable logs.
    Compact,

    /// Structured JSON logs.
    Json,
}

/// Logging settings.
#[derive(Debug, Args)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,

    /// Log format (compact, json)
    #[arg(
        long,
        global = true,
        env = "LOG_FORMAT",
        value_enum,
        default_value_t = LogFormat::Compact
    )]
    pub log_format: LogFormat,
}

/// Local storage locations.
#[derive(Debug, Args)]
pub struct StorageConfig {
    /// Directory holding `cart.json` and `orders.json`
    #[arg(long, global = true, env = "EDUPRINT_DATA_DIR", default_value = ".eduprint")]
    pub data_dir: PathBuf,

    /// Directory downloads and invoices are saved into
    #[arg(long, global = true, env = "EDUPRINT_DOWNLOAD_DIR", default_value = "downloads")]
    pub download_dir: PathBuf,

    /// Catalog YAML file; the bundled catalog when omitted
    #[arg(long, global = true, env = "EDUPRINT_CATALOG")]
    pub catalog: Option<PathBuf>,

    /// Directory relative template image paths are resolved against
    #[arg(long, global = true, env = "EDUPRINT_ASSET_ROOT", default_value = ".")]
    pub asset_root: PathBuf,
}

impl StorageConfig {
    /// Cart snapshot file
    pub fn cart_path(&self) -> PathBuf {
        self.data_dir.join("cart.json")
    }

    /// Order collection file
    pub fn orders_path(&self) -> PathBuf {
        self.data_dir.join("orders.json")
    }
}

/// Who is signed in.
#[derive(Debug, Args)]
pub struct SessionConfig {
    /// Email of the signed-in shopper; anonymous when omitted
    #[arg(long, global = true, env = "EDUPRINT_USER")]
    pub user: Option<String>,

    /// Display name of the signed-in shopper
    #[arg(long, global = true, env = "EDUPRINT_USER_NAME")]
    pub user_name: Option<String>,
}

impl SessionConfig {
    /// Session for the configured shopper
    pub fn session(&self) -> Session {
        self.user.as_ref().map_or_else(Session::anonymous, |email| {
            Session::signed_in(User {
                id: UserId::new(email.clone()),
                name: self.user_name.clone().unwrap_or_else(|| email.clone()),
                email: email.clone(),
            })
        })
    }
}

/// EduPrint storefront
#[derive(Debug, Parser)]
#[command(name = "eduprint", about = "EduPrint storefront", long_about = None)]
pub struct Config {
    #[command(subcommand)]
    pub command: Command,

    #[command(flatten)]
    pub storage: StorageConfig,

    #[command(flatten)]
    pub session: SessionConfig,

    #[command(flatten)]
    pub logging: LoggingConfig,

    /// Simulated payment processing delay in milliseconds
    #[arg(long, global = true, env = "EDUPRINT_PAYMENT_LATENCY_MS", default_value_t = 2000)]
    pub payment_latency_ms: u64,
}

impl Config {
    /// Load configuration from environment and CLI arguments
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be parsed
    pub fn load() -> Result<Self, clap::Error> {
        // Load .env file if present (ignore if missing)
        _ = dotenvy::dotenv();

        Self::try_parse()
    }

    /// Simulated payment delay
    pub fn payment_latency(&self) -> Duration {
        Duration::from_millis(self.payment_latency_ms)
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List products
    Products(ProductsArgs),

    /// List free templates
    Templates,

    /// Show or edit the cart
    #[command(subcommand)]
    Cart(CartCommand),

    /// Check out the cart
    Checkout(CheckoutArgs),

    /// List your orders
    Orders,

    /// Save (and optionally open) the invoice for an order
    Invoice(InvoiceArgs),

    /// Download a template
    Download(DownloadArgs),
}

#[derive(Debug, Args)]
pub struct ProductsArgs {
    /// Only this category
    #[arg(long)]
    pub category: Option<String>,

    /// Price band
    #[arg(long, value_enum, default_value_t = PriceRange::All)]
    pub price_range: PriceRange,

    /// Search names, descriptions and categories
    #[arg(long)]
    pub search: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum CartCommand {
    /// Show the cart
    Show,

    /// Add one unit of a product
    Add(AddArgs),

    /// Set a product's quantity; zero or less removes it
    Update {
        /// Product id
        product_id: u32,

        /// New quantity
        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },

    /// Remove a product
    Remove {
        /// Product id
        product_id: u32,
    },

    /// Empty the cart
    Clear,
}

#[derive(Debug, Args)]
pub struct AddArgs {
    /// Product id
    pub product_id: u32,

    /// Text to print on a customizable product
    #[arg(long)]
    pub text: Option<String>,

    /// Font family for the printed text
    #[arg(long, requires = "text")]
    pub font: Option<String>,

    /// Hex colour for the printed text
    #[arg(long, requires = "text")]
    pub color: Option<String>,

    /// Placement of the printed text
    #[arg(long, requires = "text")]
    pub position: Option<String>,
}

impl AddArgs {
    pub fn product_id(&self) -> ProductId {
        ProductId(self.product_id)
    }
}

#[derive(Debug, Args)]
pub struct CheckoutArgs {
    /// Full name
    #[arg(long)]
    pub full_name: String,

    /// Email; the signed-in shopper's when omitted
    #[arg(long)]
    pub email: Option<String>,

    /// Phone number
    #[arg(long)]
    pub phone: String,

    /// Street address
    #[arg(long)]
    pub address: String,

    /// City
    #[arg(long)]
    pub city: String,

    /// State
    #[arg(long)]
    pub state: String,

    /// ZIP / PIN code
    #[arg(long)]
    pub zip_code: String,

    /// Country
    #[arg(long, default_value = "India")]
    pub country: String,

    /// Simulate a declined payment
    #[arg(long)]
    pub decline: bool,
}

impl CheckoutArgs {
    /// Billing address, defaulting the email to the shopper's
    pub fn billing_address(self, session: &Session) -> BillingAddress {
        BillingAddress {
            full_name: self.full_name,
            email: self
                .email
                .or_else(|| session.user().map(|user| user.email.clone()))
                .unwrap_or_default(),
            phone: self.phone,
            address: self.address,
            city: self.city,
            state: self.state,
            zip_code: self.zip_code,
            country: self.country,
        }
    }
}

#[derive(Debug, Args)]
pub struct InvoiceArgs {
    /// Order id
    pub order_id: String,

    /// Open the saved invoice for printing
    #[arg(long)]
    pub print: bool,
}

#[derive(Debug, Args)]
pub struct DownloadArgs {
    /// Template id
    pub template_id: u32,

    /// File format
    #[arg(long, value_enum, default_value_t = TargetFormat::Png)]
    pub format: TargetFormat,
}

impl DownloadArgs {
    pub fn template_id(&self) -> TemplateId {
        TemplateId(self.template_id)
    }
}
