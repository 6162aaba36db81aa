//! The markup contract with the catalog's listing pages
//!
//! Every selector the parser depends on lives here. A change to the site's
//! markup is absorbed by overriding entries from the `[selectors]` config
//! table instead of editing the parser.

use crate::catalog::ExtractError;
use scraper::Selector;
use serde::Deserialize;

/// Number of leading characters stripped from the launch-date text
///
/// The site prefixes every launch date with a fixed label such as
/// `"Release Date : "`.
pub const DATE_PREFIX_LEN: usize = 15;

/// Attribute of the title anchor that carries the product identifier
pub const PRODUCT_ID_ATTR: &str = "data-product-id";

/// Selector strings for a listing page
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SelectorSet {
    /// Product blocks, selected from the document root
    pub products: String,

    /// Title anchor inside a product block
    pub title_link: String,

    /// Thumbnail image inside a product block
    pub image: String,

    /// Launch-date element inside a product block
    pub launch_date: String,

    /// Category anchors inside a product block
    pub category_links: String,

    /// Price element inside a product block
    pub price: String,

    /// Pagination anchors, selected from the document root
    pub pagination: String,
}

impl Default for SelectorSet {
    fn default() -> Self {
        Self {
            products: "#products > .item".to_string(),
            title_link: ".title_product > a".to_string(),
            image: ".img_product img".to_string(),
            launch_date: ".launch_date".to_string(),
            category_links: ".cate_product a".to_string(),
            price: ".price-new".to_string(),
            pagination: "ul.pagination > li > a".to_string(),
        }
    }
}

impl SelectorSet {
    /// Iterates over `(name, selector)` pairs, used for validation and error messages
    pub fn entries(&self) -> [(&'static str, &str); 7] {
        [
            ("products", &self.products),
            ("title-link", &self.title_link),
            ("image", &self.image),
            ("launch-date", &self.launch_date),
            ("category-links", &self.category_links),
            ("price", &self.price),
            ("pagination", &self.pagination),
        ]
    }
}

/// A [`SelectorSet`] compiled into `scraper` selectors
#[derive(Debug, Clone)]
pub(crate) struct CompiledSelectors {
    pub products: Selector,
    pub title_link: Selector,
    pub image: Selector,
    pub launch_date: Selector,
    pub category_links: Selector,
    pub price: Selector,
    pub pagination: Selector,
}

impl CompiledSelectors {
    pub fn compile(set: &SelectorSet) -> Result<Self, ExtractError> {
        Ok(Self {
            products: compile_one("products", &set.products)?,
            title_link: compile_one("title-link", &set.title_link)?,
            image: compile_one("image", &set.image)?,
            launch_date: compile_one("launch-date", &set.launch_date)?,
            category_links: compile_one("category-links", &set.category_links)?,
            price: compile_one("price", &set.price)?,
            pagination: compile_one("pagination", &set.pagination)?,
        })
    }
}

fn compile_one(name: &'static str, selector: &str) -> Result<Selector, ExtractError> {
    Selector::parse(selector).map_err(|e| ExtractError::InvalidSelector {
        name,
        selector: selector.to_string(),
        message: format!("{:?}", e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_contract() {
        let set = SelectorSet::default();
        assert_eq!(set.products, "#products > .item");
        assert_eq!(set.title_link, ".title_product > a");
        assert_eq!(set.image, ".img_product img");
        assert_eq!(set.launch_date, ".launch_date");
        assert_eq!(set.category_links, ".cate_product a");
        assert_eq!(set.price, ".price-new");
        assert_eq!(set.pagination, "ul.pagination > li > a");
    }

    #[test]
    fn test_default_contract_compiles() {
        assert!(CompiledSelectors::compile(&SelectorSet::default()).is_ok());
    }

    #[test]
    fn test_invalid_selector_is_reported_by_name() {
        let set = SelectorSet {
            price: "..[".to_string(),
            ..SelectorSet::default()
        };

        match CompiledSelectors::compile(&set) {
            Err(ExtractError::InvalidSelector { name, selector, .. }) => {
                assert_eq!(name, "price");
                assert_eq!(selector, "..[");
            }
            other => panic!("expected InvalidSelector, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_partial_override_keeps_defaults() {
        let set: SelectorSet = toml::from_str(r#"price = ".price-sale""#).unwrap();
        assert_eq!(set.price, ".price-sale");
        assert_eq!(set.products, SelectorSet::default().products);
    }
}
