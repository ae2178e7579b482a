//! Catalog Fixtures

use rust_decimal::Decimal;
use rusty_money::iso::{self, Currency};
use serde::Deserialize;

use crate::catalog::{
    Catalog, CatalogError, Category, CategoryId, Product, ProductId, Template, TemplateId,
};

/// Top level catalog document
#[derive(Debug, Deserialize)]
pub struct CatalogFixture {
    /// ISO currency code shared by every price
    pub currency: String,

    /// Categories
    pub categories: Vec<CategoryFixture>,

    /// Products
    pub products: Vec<ProductFixture>,

    /// Free templates
    #[serde(default)]
    pub templates: Vec<TemplateFixture>,
}

/// Category Fixture
#[derive(Debug, Deserialize)]
pub struct CategoryFixture {
    /// Category id
    pub id: String,

    /// Display name
    pub name: String,
}

/// Product Fixture
#[derive(Debug, Deserialize)]
pub struct ProductFixture {
    /// Product id
    pub id: u32,

    /// Product name
    pub name: String,

    /// Product description
    #[serde(default)]
    pub description: String,

    /// Product price (e.g., "249.00 INR")
    pub price: String,

    /// Pre-discount price
    pub original_price: Option<String>,

    /// Image reference
    pub image: String,

    /// Category id
    pub category: String,

    /// Rating out of 5
    #[serde(default)]
    pub rating: Decimal,

    /// Accepts a customization record
    #[serde(default)]
    pub customizable: bool,

    /// Display tag
    pub tag: Option<String>,
}

/// Template Fixture
#[derive(Debug, Deserialize)]
pub struct TemplateFixture {
    /// Template id
    pub id: u32,

    /// Template name
    pub name: String,

    /// Template description
    #[serde(default)]
    pub description: String,

    /// Source image reference
    pub image: String,

    /// Gallery category
    pub category: String,
}

impl TryFrom<CatalogFixture> for Catalog {
    type Error = CatalogError;

    fn try_from(fixture: CatalogFixture) -> Result<Self, Self::Error> {
        let currency = find_currency(&fixture.currency)?;

        let categories = fixture
            .categories
            .into_iter()
            .map(|c| Category {
                id: CategoryId::new(c.id),
                name: c.name,
            })
            .collect();

        let products = fixture
            .products
            .into_iter()
            .map(|p| product_from_fixture(p, currency))
            .collect::<Result<Vec<_>, _>>()?;

        let templates = fixture
            .templates
            .into_iter()
            .map(|t| {
                Template::new(TemplateId(t.id), t.name, t.image, t.category)
                    .map(|template| template.with_description(t.description))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Catalog::new(currency, categories, products, templates)
    }
}

fn product_from_fixture(
    fixture: ProductFixture,
    currency: &'static Currency,
) -> Result<Product, CatalogError> {
    let price = parse_price_in(&fixture.price, currency)?;

    let mut product = Product::new(
        ProductId(fixture.id),
        fixture.name,
        price,
        CategoryId::new(fixture.category),
        fixture.image,
    )?
    .with_description(fixture.description)
    .with_customizable(fixture.customizable)
    .with_rating(fixture.rating)?;

    if let Some(original) = fixture.original_price.as_deref() {
        product = product.with_original_price(parse_price_in(original, currency)?)?;
    }

    if let Some(tag) = fixture.tag {
        product = product.with_tag(tag);
    }

    Ok(product)
}

fn parse_price_in(s: &str, currency: &'static Currency) -> Result<Decimal, CatalogError> {
    let (amount, price_currency) = parse_price(s)?;

    if price_currency != currency {
        return Err(CatalogError::CurrencyMismatch(
            currency.iso_alpha_code.to_string(),
            price_currency.iso_alpha_code.to_string(),
        ));
    }

    Ok(amount)
}

fn find_currency(code: &str) -> Result<&'static Currency, CatalogError> {
    iso::find(code).ok_or_else(|| CatalogError::UnknownCurrency(code.to_string()))
}

/// Parse price string (e.g., "249.00 INR") into an amount and currency
///
/// # Errors
///
/// Returns an error if the string is not in the format "AMOUNT CURRENCY",
/// if the amount cannot be parsed as a decimal, or if the currency code
/// is not recognized.
pub fn parse_price(s: &str) -> Result<(Decimal, &'static Currency), CatalogError> {
    let mut parts = s.split_whitespace();

    let (Some(amount), Some(code), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(CatalogError::InvalidPrice(format!(
            "Expected format 'AMOUNT CURRENCY', got: {s}"
        )));
    };

    let amount = amount
        .parse::<Decimal>()
        .map_err(|_err| CatalogError::InvalidPrice(s.to_string()))?;

    Ok((amount, find_currency(code)?))
}
