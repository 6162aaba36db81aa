//! Catalog listing extraction
//!
//! This module contains the page parser and the data it produces:
//! - Product records and their category tags
//! - Raw pagination references to follow
//! - The selector contract with the site's markup

mod parser;
pub mod selectors;
mod types;

pub use parser::{strip_date_prefix, ListingParser};
pub use selectors::{SelectorSet, DATE_PREFIX_LEN};
pub use types::{CategoryRef, PageReference, ParsedListing, ProductRecord};

use thiserror::Error;

/// Errors raised while extracting a listing page
///
/// Only the launch date is mandatory; every other field degrades to `None`.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Product block {block} on {page} has no launch date")]
    MissingLaunchDate { page: String, block: usize },

    #[error("Product block {block} on {page} has a launch date shorter than its label: {text:?}")]
    ShortLaunchDate {
        page: String,
        block: usize,
        text: String,
    },

    #[error("Invalid {name} selector '{selector}': {message}")]
    InvalidSelector {
        name: &'static str,
        selector: String,
        message: String,
    },
}

impl ExtractError {
    /// Returns true for the malformed launch-date kind
    pub fn is_malformed_date(&self) -> bool {
        matches!(
            self,
            Self::MissingLaunchDate { .. } | Self::ShortLaunchDate { .. }
        )
    }
}
