use serde::{Deserialize, Serialize};
use std::fmt;

/// One catalog entry extracted from a listing page
///
/// Every field except `date` is optional: a selector that finds nothing
/// yields `None` instead of an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    /// Product identifier (`data-product-id` of the title anchor)
    pub id: Option<String>,

    /// Product detail link, as written in the markup
    pub url: Option<String>,

    /// Display title
    pub name: Option<String>,

    /// Thumbnail URL
    pub image: Option<String>,

    /// Launch date text with its label prefix removed
    pub date: String,

    /// Category tags in document order
    pub categories: Vec<CategoryRef>,

    /// Raw price text, currency symbol included
    pub price: Option<String>,
}

impl ProductRecord {
    /// Returns the last category attached to the product, if any
    ///
    /// Category tags run from broad to narrow, so the last one is the most
    /// specific.
    pub fn most_specific_category(&self) -> Option<&CategoryRef> {
        self.categories.last()
    }
}

/// One category tag attached to a product
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRef {
    /// Category label text
    pub name: Option<String>,

    /// Category link
    pub url: Option<String>,
}

/// A raw pagination href, not yet resolved against the page URL
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageReference(pub String);

impl PageReference {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PageReference {
    fn from(href: &str) -> Self {
        Self(href.to_string())
    }
}

/// Everything extracted from one listing page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedListing {
    /// Product records in block order
    pub products: Vec<ProductRecord>,

    /// Pagination links in document order
    pub pagination: Vec<PageReference>,
}
