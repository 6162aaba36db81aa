//! Detection of newly listed products

use crate::catalog::ProductRecord;
use std::collections::HashSet;

/// Returns the products of `current` whose id is not in `known`
///
/// Products keep their crawl order. A product listed on several pages is
/// returned once, in its first position. Products without an id cannot be
/// tracked and are never reported.
///
/// # Example
///
/// ```
/// use std::collections::HashSet;
/// use suruga_watch::watch::find_new_products;
/// use suruga_watch::ProductRecord;
///
/// let product = |id: &str| ProductRecord {
///     id: Some(id.to_string()),
///     url: None,
///     name: None,
///     image: None,
///     date: "2024-01-01".to_string(),
///     categories: vec![],
///     price: None,
/// };
///
/// let known = HashSet::from(["1".to_string()]);
/// let current = [product("1"), product("2")];
/// let new = find_new_products(&known, &current);
/// assert_eq!(new.len(), 1);
/// assert_eq!(new[0].id.as_deref(), Some("2"));
/// ```
pub fn find_new_products<'a>(
    known: &HashSet<String>,
    current: &'a [ProductRecord],
) -> Vec<&'a ProductRecord> {
    let mut reported: HashSet<&str> = HashSet::new();
    let mut new = Vec::new();

    for product in current {
        let Some(id) = product.id.as_deref() else {
            continue;
        };
        if !known.contains(id) && reported.insert(id) {
            new.push(product);
        }
    }

    new
}
