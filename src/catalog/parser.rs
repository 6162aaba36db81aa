//! Listing page parser
//!
//! Turns one product listing page into product records and the raw
//! pagination hrefs to follow. Parsing is a pure function of the document:
//! URLs are not resolved and nothing is fetched here.

use crate::catalog::selectors::{
    CompiledSelectors, SelectorSet, DATE_PREFIX_LEN, PRODUCT_ID_ATTR,
};
use crate::catalog::{CategoryRef, ExtractError, PageReference, ParsedListing, ProductRecord};
use scraper::{ElementRef, Html};
use url::Url;

/// Parser for the catalog's product listing pages
///
/// The parser is configured with the URL the crawl starts from and is then
/// invoked once per fetched page, including every page reached through the
/// pagination links it returns.
#[derive(Debug, Clone)]
pub struct ListingParser {
    start_url: Url,
    selectors: CompiledSelectors,
}

impl ListingParser {
    /// Creates a parser using the default markup contract
    pub fn new(start_url: Url) -> Result<Self, ExtractError> {
        Self::with_selectors(start_url, &SelectorSet::default())
    }

    /// Creates a parser using an overridden markup contract
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::InvalidSelector`] if any selector fails to parse.
    pub fn with_selectors(start_url: Url, selectors: &SelectorSet) -> Result<Self, ExtractError> {
        Ok(Self {
            start_url,
            selectors: CompiledSelectors::compile(selectors)?,
        })
    }

    /// The URL the crawl starts from
    pub fn start_url(&self) -> &Url {
        &self.start_url
    }

    /// Parses raw HTML of one listing page
    ///
    /// `page_url` is the URL the page was fetched from. It is only used to
    /// label errors; pagination hrefs are returned exactly as written.
    ///
    /// # Errors
    ///
    /// Fails on the first product block whose launch date is absent or
    /// shorter than the fixed label prefix. No records and no pagination
    /// references are returned for such a page.
    ///
    /// # Example
    ///
    /// ```
    /// use suruga_watch::catalog::ListingParser;
    /// use url::Url;
    ///
    /// let url = Url::parse("https://www.suruga-ya.com/en/products").unwrap();
    /// let parser = ListingParser::new(url.clone()).unwrap();
    /// let html = r#"<ul class="pagination"><li><a href="/en/products?page=2">2</a></li></ul>"#;
    /// let listing = parser.parse(html, &url).unwrap();
    /// assert!(listing.products.is_empty());
    /// assert_eq!(listing.pagination[0].as_str(), "/en/products?page=2");
    /// ```
    pub fn parse(&self, html: &str, page_url: &Url) -> Result<ParsedListing, ExtractError> {
        let document = Html::parse_document(html);
        self.parse_document(&document, page_url)
    }

    /// Parses an already parsed listing page
    pub fn parse_document(
        &self,
        document: &Html,
        page_url: &Url,
    ) -> Result<ParsedListing, ExtractError> {
        let mut products = Vec::new();
        for (block, item) in document.select(&self.selectors.products).enumerate() {
            products.push(self.extract_product(item, block, page_url)?);
        }

        let pagination = self.extract_pagination(document);

        tracing::trace!(
            "Parsed {}: {} products, {} pagination links",
            page_url,
            products.len(),
            pagination.len()
        );

        Ok(ParsedListing {
            products,
            pagination,
        })
    }

    fn extract_product(
        &self,
        item: ElementRef<'_>,
        block: usize,
        page_url: &Url,
    ) -> Result<ProductRecord, ExtractError> {
        let raw_date = item
            .select(&self.selectors.launch_date)
            .find_map(own_text)
            .ok_or_else(|| ExtractError::MissingLaunchDate {
                page: page_url.to_string(),
                block,
            })?;

        let date = strip_date_prefix(&raw_date)
            .ok_or_else(|| ExtractError::ShortLaunchDate {
                page: page_url.to_string(),
                block,
                text: raw_date.clone(),
            })?
            .to_string();

        let categories = item
            .select(&self.selectors.category_links)
            .map(|anchor| CategoryRef {
                name: own_text(anchor),
                url: attr(anchor, "href"),
            })
            .collect();

        Ok(ProductRecord {
            id: item
                .select(&self.selectors.title_link)
                .find_map(|anchor| attr(anchor, PRODUCT_ID_ATTR)),
            url: item
                .select(&self.selectors.title_link)
                .find_map(|anchor| attr(anchor, "href")),
            name: item.select(&self.selectors.title_link).find_map(own_text),
            image: item
                .select(&self.selectors.image)
                .find_map(|img| attr(img, "src")),
            date,
            categories,
            price: item.select(&self.selectors.price).find_map(own_text),
        })
    }

    fn extract_pagination(&self, document: &Html) -> Vec<PageReference> {
        document
            .select(&self.selectors.pagination)
            .filter_map(|anchor| anchor.value().attr("href"))
            .map(PageReference::from)
            .collect()
    }
}

/// Removes the fixed launch-date label
///
/// Counts characters, not bytes. Returns `None` when the text is shorter
/// than the label.
pub fn strip_date_prefix(text: &str) -> Option<&str> {
    text.char_indices()
        .map(|(idx, _)| idx)
        .chain(std::iter::once(text.len()))
        .nth(DATE_PREFIX_LEN)
        .map(|idx| &text[idx..])
}

/// First text node that is a direct child of the element, untrimmed
fn own_text(element: ElementRef<'_>) -> Option<String> {
    element
        .children()
        .find_map(|node| node.value().as_text().map(|text| (**text).to_owned()))
}

fn attr(element: ElementRef<'_>, name: &str) -> Option<String> {
    element.value().attr(name).map(str::to_string)
}
