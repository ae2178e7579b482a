//! Product filtering for the catalog listing.

use rust_decimal::Decimal;

use crate::catalog::{CategoryId, Product};

/// Price bands offered by the listing. Band edges are inclusive where they touch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum PriceRange {
    /// No price restriction
    #[default]
    All,

    /// Strictly below 100
    #[value(name = "under-100")]
    Under100,

    /// 100 to 250 inclusive
    #[value(name = "100-250")]
    From100To250,

    /// 250 to 500 inclusive
    #[value(name = "250-500")]
    From250To500,

    /// Strictly above 500
    #[value(name = "over-500")]
    Over500,
}

impl PriceRange {
    /// Whether a price falls inside this band.
    pub fn contains(self, price: Decimal) -> bool {
        let hundred = Decimal::ONE_HUNDRED;
        let two_fifty = Decimal::new(250, 0);
        let five_hundred = Decimal::new(500, 0);

        match self {
            Self::All => true,
            Self::Under100 => price < hundred,
            Self::From100To250 => price >= hundred && price <= two_fifty,
            Self::From250To500 => price >= two_fifty && price <= five_hundred,
            Self::Over500 => price > five_hundred,
        }
    }
}

/// Listing filter: category, price band and free-text search, all combined with AND.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    /// Restrict to a single category
    pub category: Option<CategoryId>,

    /// Restrict to a price band
    pub price_range: PriceRange,

    /// Case-insensitive search over name, description and category
    pub query: Option<String>,
}

impl ProductFilter {
    /// Whether the product passes every configured restriction.
    pub fn matches(&self, product: &Product) -> bool {
        if self
            .category
            .as_ref()
            .is_some_and(|category| product.category() != category)
        {
            return false;
        }

        if !self.price_range.contains(product.price()) {
            return false;
        }

        match self.query.as_deref().map(str::to_lowercase) {
            Some(query) if !query.is_empty() => {
                product.name().to_lowercase().contains(&query)
                    || product.description().to_lowercase().contains(&query)
                    || product.category().as_str().to_lowercase().contains(&query)
            }
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::ValueEnum;
    use testresult::TestResult;

    use crate::catalog::{Catalog, ProductId};

    use super::*;

    fn ids(products: &[&Product]) -> Vec<u32> {
        products.iter().map(|p| p.id().0).collect()
    }

    #[test]
    fn price_range_edges_are_inclusive_between_bands() {
        assert!(PriceRange::From100To250.contains(Decimal::new(250, 0)));
        assert!(PriceRange::From250To500.contains(Decimal::new(250, 0)));
        assert!(!PriceRange::Under100.contains(Decimal::ONE_HUNDRED));
        assert!(!PriceRange::Over500.contains(Decimal::new(500, 0)));
    }

    #[test]
    fn price_range_parses_listing_names() {
        assert_eq!(
            PriceRange::from_str("250-500", false),
            Ok(PriceRange::From250To500)
        );
        assert_eq!(
            PriceRange::from_str("under-100", false),
            Ok(PriceRange::Under100)
        );
        assert!(PriceRange::from_str("cheap", false).is_err());
    }

    #[test]
    fn price_range_help_lists_every_band() {
        let names: Vec<String> = PriceRange::value_variants()
            .iter()
            .filter_map(ValueEnum::to_possible_value)
            .map(|value| value.get_name().to_string())
            .collect();

        assert_eq!(names, vec!["all", "under-100", "100-250", "250-500", "over-500"]);
    }

    #[test]
    fn default_filter_returns_everything_in_order() -> TestResult {
        let catalog = Catalog::bundled()?;

        let products = catalog.filter_products(&ProductFilter::default());

        assert_eq!(ids(&products), vec![1, 2, 3, 4, 5, 6]);

        Ok(())
    }

    #[test]
    fn category_and_price_filters_combine() -> TestResult {
        let catalog = Catalog::bundled()?;

        let filter = ProductFilter {
            category: Some(CategoryId::new("office-supplies")),
            price_range: PriceRange::From100To250,
            query: None,
        };

        assert_eq!(ids(&catalog.filter_products(&filter)), vec![1]);

        Ok(())
    }

    #[test]
    fn query_matches_description_case_insensitively() -> TestResult {
        let catalog = Catalog::bundled()?;

        let filter = ProductFilter {
            query: Some("BALLPOINT".to_string()),
            ..ProductFilter::default()
        };

        let products = catalog.filter_products(&filter);

        assert_eq!(ids(&products), vec![6]);
        assert_eq!(products.first().map(|p| p.id()), Some(ProductId(6)));

        Ok(())
    }

    #[test]
    fn query_matches_category_id() -> TestResult {
        let catalog = Catalog::bundled()?;

        let filter = ProductFilter {
            query: Some("tech".to_string()),
            ..ProductFilter::default()
        };

        assert_eq!(ids(&catalog.filter_products(&filter)), vec![4]);

        Ok(())
    }

    #[test]
    fn empty_query_is_ignored() -> TestResult {
        let catalog = Catalog::bundled()?;

        let filter = ProductFilter {
            query: Some(String::new()),
            ..ProductFilter::default()
        };

        assert_eq!(catalog.filter_products(&filter).len(), 6);

        Ok(())
    }
}
