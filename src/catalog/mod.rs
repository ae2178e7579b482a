//! Catalog
//!
//! The static product, template and category data the storefront is built on. A catalog is
//! loaded once at startup and never mutated afterwards.

use std::{fmt, fs, path::Path};

use rust_decimal::{Decimal, RoundingStrategy};
use rustc_hash::FxHashMap;
use rusty_money::iso::Currency;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod filter;
pub mod fixtures;

pub use filter::{PriceRange, ProductFilter};

const BUNDLED_CATALOG: &str = include_str!("../../fixtures/catalog.yml");

/// Highest rating a product can carry.
const MAX_RATING: Decimal = Decimal::from_parts(5, 0, 0, false, 0);

/// Catalog construction errors
#[derive(Debug, Error)]
pub enum CatalogError {
    /// IO error reading a catalog file
    #[error("failed to read catalog file: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("failed to parse catalog YAML: {0}")]
    Yaml(#[from] serde_norway::Error),

    /// Invalid price format
    #[error("invalid price format: {0}")]
    InvalidPrice(String),

    /// Unknown currency code
    #[error("unknown currency code: {0}")]
    UnknownCurrency(String),

    /// A price was given in a different currency to the catalog
    #[error("currency mismatch: expected {0}, found {1}")]
    CurrencyMismatch(String, String),

    /// Two products share an id
    #[error("duplicate product id {0}")]
    DuplicateProduct(ProductId),

    /// Two templates share an id
    #[error("duplicate template id {0}")]
    DuplicateTemplate(TemplateId),

    /// Two categories share an id
    #[error("duplicate category id {0}")]
    DuplicateCategory(CategoryId),

    /// A product refers to a category the catalog does not define
    #[error("product {product} refers to unknown category {category}")]
    UnknownCategory {
        /// Offending product
        product: ProductId,

        /// Category it refers to
        category: CategoryId,
    },

    /// A name was empty
    #[error("{0} has an empty name")]
    EmptyName(String),

    /// A product price was negative
    #[error("product {0} has a negative price")]
    NegativePrice(ProductId),

    /// The pre-discount price is lower than the selling price
    #[error("product {0} has an original price below its price")]
    OriginalPriceBelowPrice(ProductId),

    /// Ratings run from 0 to 5
    #[error("product {0} has a rating outside 0..=5")]
    RatingOutOfRange(ProductId),
}

/// Product identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub u32);

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Template identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateId(pub u32);

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Category identifier, e.g. `office-supplies`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryId(String);

impl CategoryId {
    /// Creates a new category id
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Category
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    /// Category id
    pub id: CategoryId,

    /// Display name
    pub name: String,
}

/// A purchasable catalog product.
#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    id: ProductId,
    name: String,
    description: String,
    price: Decimal,
    original_price: Option<Decimal>,
    category: CategoryId,
    image: String,
    customizable: bool,
    tag: Option<String>,
    rating: Decimal,
}

impl Product {
    /// Creates a new product.
    ///
    /// # Errors
    ///
    /// - [`CatalogError::EmptyName`]: the name is blank.
    /// - [`CatalogError::NegativePrice`]: the price is below zero.
    pub fn new(
        id: ProductId,
        name: impl Into<String>,
        price: Decimal,
        category: CategoryId,
        image: impl Into<String>,
    ) -> Result<Self, CatalogError> {
        let name = name.into().trim().to_string();

        if name.is_empty() {
            return Err(CatalogError::EmptyName(format!("product {id}")));
        }

        if price < Decimal::ZERO {
            return Err(CatalogError::NegativePrice(id));
        }

        Ok(Self {
            id,
            name,
            description: String::new(),
            price,
            original_price: None,
            category,
            image: image.into(),
            customizable: false,
            tag: None,
            rating: Decimal::ZERO,
        })
    }

    /// Sets the product description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the pre-discount price shown struck through next to the price.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::OriginalPriceBelowPrice`] when `original` is below the price.
    pub fn with_original_price(mut self, original: Decimal) -> Result<Self, CatalogError> {
        if original < self.price {
            return Err(CatalogError::OriginalPriceBelowPrice(self.id));
        }

        self.original_price = Some(original);

        Ok(self)
    }

    /// Sets the product rating.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::RatingOutOfRange`] when the rating is outside `0..=5`.
    pub fn with_rating(mut self, rating: Decimal) -> Result<Self, CatalogError> {
        if rating < Decimal::ZERO || rating > MAX_RATING {
            return Err(CatalogError::RatingOutOfRange(self.id));
        }

        self.rating = rating;

        Ok(self)
    }

    /// Sets the display tag, e.g. "Best Seller".
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Marks the product as accepting a customization record.
    #[must_use]
    pub fn with_customizable(mut self, customizable: bool) -> Self {
        self.customizable = customizable;
        self
    }

    /// Product id
    pub fn id(&self) -> ProductId {
        self.id
    }

    /// Product name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Product description
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Unit price
    pub fn price(&self) -> Decimal {
        self.price
    }

    /// Pre-discount price, if the product is on offer
    pub fn original_price(&self) -> Option<Decimal> {
        self.original_price
    }

    /// Category id
    pub fn category(&self) -> &CategoryId {
        &self.category
    }

    /// Image reference
    pub fn image(&self) -> &str {
        &self.image
    }

    /// Whether the product accepts a customization record
    pub fn is_customizable(&self) -> bool {
        self.customizable
    }

    /// Display tag
    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    /// Rating out of 5
    pub fn rating(&self) -> Decimal {
        self.rating
    }

    /// Percentage saved against the original price, rounded to a whole percent.
    pub fn discount_percent(&self) -> Option<Decimal> {
        let original = self.original_price?;

        if original.is_zero() || original == self.price {
            return None;
        }

        let saved = (original - self.price) / original * Decimal::ONE_HUNDRED;

        Some(saved.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
    }
}

/// A free downloadable template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    id: TemplateId,
    name: String,
    description: String,
    image: String,
    category: String,
}

impl Template {
    /// Creates a new template.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::EmptyName`] if the name is blank.
    pub fn new(
        id: TemplateId,
        name: impl Into<String>,
        image: impl Into<String>,
        category: impl Into<String>,
    ) -> Result<Self, CatalogError> {
        let name = name.into().trim().to_string();

        if name.is_empty() {
            return Err(CatalogError::EmptyName(format!("template {id}")));
        }

        Ok(Self {
            id,
            name,
            description: String::new(),
            image: image.into(),
            category: category.into(),
        })
    }

    /// Sets the template description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Template id
    pub fn id(&self) -> TemplateId {
        self.id
    }

    /// Template name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Template description
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Source image reference (URL or path)
    pub fn image(&self) -> &str {
        &self.image
    }

    /// Free-form gallery category
    pub fn category(&self) -> &str {
        &self.category
    }
}

/// Catalog
#[derive(Debug)]
pub struct Catalog {
    currency: &'static Currency,
    categories: Vec<Category>,
    products: Vec<Product>,
    templates: Vec<Template>,
    product_index: FxHashMap<ProductId, usize>,
    template_index: FxHashMap<TemplateId, usize>,
}

impl Catalog {
    /// Builds a catalog, validating ids and category references.
    ///
    /// # Errors
    ///
    /// Returns a [`CatalogError`] for duplicate ids or products in unknown categories.
    pub fn new(
        currency: &'static Currency,
        categories: Vec<Category>,
        products: Vec<Product>,
        templates: Vec<Template>,
    ) -> Result<Self, CatalogError> {
        for (i, category) in categories.iter().enumerate() {
            if categories
                .iter()
                .take(i)
                .any(|other| other.id == category.id)
            {
                return Err(CatalogError::DuplicateCategory(category.id.clone()));
            }
        }

        let mut product_index = FxHashMap::default();

        for (i, product) in products.iter().enumerate() {
            if product_index.insert(product.id, i).is_some() {
                return Err(CatalogError::DuplicateProduct(product.id));
            }

            if !categories.iter().any(|c| c.id == product.category) {
                return Err(CatalogError::UnknownCategory {
                    product: product.id,
                    category: product.category.clone(),
                });
            }
        }

        let mut template_index = FxHashMap::default();

        for (i, template) in templates.iter().enumerate() {
            if template_index.insert(template.id, i).is_some() {
                return Err(CatalogError::DuplicateTemplate(template.id));
            }
        }

        Ok(Self {
            currency,
            categories,
            products,
            templates,
            product_index,
            template_index,
        })
    }

    /// The catalog shipped with the storefront.
    ///
    /// # Errors
    ///
    /// Returns a [`CatalogError`] if the bundled data fails validation.
    pub fn bundled() -> Result<Self, CatalogError> {
        Self::from_yaml_str(BUNDLED_CATALOG)
    }

    /// Load a catalog from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns a [`CatalogError`] if the file cannot be read, parsed or validated.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let contents = fs::read_to_string(path)?;

        Self::from_yaml_str(&contents)
    }

    /// Parse a catalog from YAML text.
    ///
    /// # Errors
    ///
    /// Returns a [`CatalogError`] if the text cannot be parsed or validated.
    pub fn from_yaml_str(contents: &str) -> Result<Self, CatalogError> {
        let fixture: fixtures::CatalogFixture = serde_norway::from_str(contents)?;

        fixture.try_into()
    }

    /// Currency every catalog price is expressed in
    pub fn currency(&self) -> &'static Currency {
        self.currency
    }

    /// All categories, in catalog order
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// All products, in catalog order
    pub fn products(&self) -> &[Product] {
        &self.products
    }

    /// All templates, in catalog order
    pub fn templates(&self) -> &[Template] {
        &self.templates
    }

    /// Look up a product by id
    pub fn product(&self, id: ProductId) -> Option<&Product> {
        self.product_index
            .get(&id)
            .and_then(|&i| self.products.get(i))
    }

    /// Look up a template by id
    pub fn template(&self, id: TemplateId) -> Option<&Template> {
        self.template_index
            .get(&id)
            .and_then(|&i| self.templates.get(i))
    }

    /// Look up a category by id
    pub fn category(&self, id: &CategoryId) -> Option<&Category> {
        self.categories.iter().find(|c| &c.id == id)
    }

    /// Products matching the filter, in catalog order.
    pub fn filter_products(&self, filter: &ProductFilter) -> Vec<&Product> {
        self.products.iter().filter(|p| filter.matches(p)).collect()
    }
}
