//! EduPrint storefront CLI

use std::{
    io::{self, Write},
    sync::Arc,
};

use anyhow::Context;
use eduprint::{
    audit::SessionDownloadLog,
    cart::{CartEngine, Customization, JsonFileCartStore, NewCartItem},
    catalog::{Catalog, CategoryId, ProductFilter, ProductId},
    checkout::{CheckoutSequencer, SimulatedPaymentGateway},
    conversion::{AssetPipeline, DefaultAssetSource, DirectorySink},
    invoice::{self, CommandPresenter, InvoiceOptions, InvoicePresenter},
    notify::{Notifier, TracingNotifier},
    orders::{JsonFileOrderRepository, OrderHistory, OrderId},
    session::Session,
    tables,
};

mod config;
mod observability;

use config::{
    CartCommand, CheckoutArgs, Command, Config, DownloadArgs, InvoiceArgs, StorageConfig,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().unwrap_or_else(|error| error.exit());

    observability::init(&config.logging)?;

    run(config).await
}

async fn run(config: Config) -> anyhow::Result<()> {
    let catalog = match &config.storage.catalog {
        Some(path) => Catalog::from_path(path)
            .with_context(|| format!("failed to load catalog from {}", path.display()))?,
        None => Catalog::bundled().context("bundled catalog is invalid")?,
    };

    let session = config.session.session();
    let latency = config.payment_latency();
    let notifier: Arc<dyn Notifier> = Arc::new(TracingNotifier);
    let mut out = io::stdout().lock();

    match config.command {
        Command::Products(ref args) => {
            let filter = ProductFilter {
                category: args.category.clone().map(CategoryId::new),
                price_range: args.price_range,
                query: args.search.clone(),
            };

            tables::write_products(
                &mut out,
                &catalog.filter_products(&filter),
                catalog.currency(),
            )?;
        }
        Command::Templates => tables::write_templates(&mut out, catalog.templates())?,
        Command::Cart(ref command) => cart(&mut out, &catalog, &config.storage, command)?,
        Command::Checkout(args) => {
            checkout(&mut out, &catalog, &config.storage, &session, notifier, latency, args)
                .await?;
        }
        Command::Orders => {
            let history = load_history(&config.storage).await?;
            let orders = match session.user() {
                Some(user) => history.for_user(&user.id),
                None => history.newest_first(),
            };

            tables::write_orders(&mut out, &orders)?;
        }
        Command::Invoice(ref args) => {
            save_invoice(&mut out, &config.storage, notifier.as_ref(), args).await?;
        }
        Command::Download(ref args) => {
            download(&mut out, &catalog, &config.storage, &session, notifier, args).await?;
        }
    }

    Ok(())
}

fn cart(
    out: &mut impl Write,
    catalog: &Catalog,
    storage: &StorageConfig,
    command: &CartCommand,
) -> anyhow::Result<()> {
    let mut cart = CartEngine::restore(JsonFileCartStore::new(storage.cart_path()));

    match command {
        CartCommand::Show => {}
        CartCommand::Add(args) => {
            let product = catalog
                .product(args.product_id())
                .with_context(|| format!("no product with id {}", args.product_id))?;

            let item = match &args.text {
                Some(text) => {
                    let defaults = Customization::default();
                    let customization = Customization {
                        text: text.clone(),
                        font: args.font.clone().unwrap_or(defaults.font),
                        color: args.color.clone().unwrap_or(defaults.color),
                        position: args.position.clone().unwrap_or(defaults.position),
                    };

                    if !product.is_customizable() {
                        writeln!(
                            out,
                            "{} cannot be customized; adding it without text",
                            product.name()
                        )?;
                    }

                    NewCartItem::customized(product, customization)
                }
                None => NewCartItem::from_product(product),
            };

            cart.add_to_cart(item);
        }
        CartCommand::Update {
            product_id,
            quantity,
        } => cart.update_quantity_signed(ProductId(*product_id), *quantity),
        CartCommand::Remove { product_id } => cart.remove_from_cart(ProductId(*product_id)),
        CartCommand::Clear => cart.clear_cart(),
    }

    tables::write_cart(out, cart.lines(), &cart.summary(), catalog.currency())?;

    Ok(())
}

async fn checkout(
    out: &mut impl Write,
    catalog: &Catalog,
    storage: &StorageConfig,
    session: &Session,
    notifier: Arc<dyn Notifier>,
    latency: std::time::Duration,
    args: CheckoutArgs,
) -> anyhow::Result<()> {
    let mut cart = CartEngine::restore(JsonFileCartStore::new(storage.cart_path()));

    let mut gateway = SimulatedPaymentGateway::new(latency);
    if args.decline {
        gateway = gateway.declining("The card issuer declined the payment.");
    }

    let mut sequencer = CheckoutSequencer::new(
        JsonFileOrderRepository::new(storage.orders_path()),
        gateway,
        notifier,
        catalog.currency(),
    );

    sequencer.begin(session, &cart)?;

    tables::write_cart(out, cart.lines(), &cart.summary(), catalog.currency())?;
    writeln!(out, "Processing payment...")?;
    out.flush()?;

    let order = sequencer
        .submit(session, &mut cart, args.billing_address(session))
        .await?;

    writeln!(
        out,
        "Order #{} confirmed, total {}",
        order.id(),
        tables::money(order.total(), catalog.currency())
    )?;

    Ok(())
}

async fn load_history(storage: &StorageConfig) -> anyhow::Result<OrderHistory> {
    let repository = JsonFileOrderRepository::new(storage.orders_path());

    OrderHistory::load(&repository)
        .await
        .context("failed to read order history")
}

async fn save_invoice(
    out: &mut impl Write,
    storage: &StorageConfig,
    notifier: &dyn Notifier,
    args: &InvoiceArgs,
) -> anyhow::Result<()> {
    let history = load_history(storage).await?;
    let order = history
        .get(&OrderId::new(args.order_id.clone()))
        .with_context(|| format!("no order #{}", args.order_id))?;

    let opener = CommandPresenter::default();
    let presenter = args.print.then_some(&opener as &dyn InvoicePresenter);

    let delivery = invoice::deliver(
        order,
        &InvoiceOptions::today(),
        presenter,
        &DirectorySink::new(&storage.download_dir),
        notifier,
    )
    .await?;

    writeln!(out, "Invoice saved to {}", delivery.saved_to.display())?;

    Ok(())
}

async fn download(
    out: &mut impl Write,
    catalog: &Catalog,
    storage: &StorageConfig,
    session: &Session,
    notifier: Arc<dyn Notifier>,
    args: &DownloadArgs,
) -> anyhow::Result<()> {
    let template = catalog
        .template(args.template_id())
        .with_context(|| format!("no template with id {}", args.template_id))?;

    let pipeline = AssetPipeline::new(
        Arc::new(DefaultAssetSource::new(&storage.asset_root)),
        Arc::new(DirectorySink::new(&storage.download_dir)),
        Arc::new(SessionDownloadLog::new()),
        notifier,
    );

    let outcome = pipeline.download(session, template, args.format).await?;

    writeln!(out, "Saved {}", outcome.saved_to.display())?;

    Ok(())
}
