use url::Url;

/// Tracking query parameters dropped during normalization
const TRACKING_PARAMS: &[&str] = &["fbclid", "gclid", "mc_eid"];

/// Normalizes a URL into the key used by the crawl's seen set
///
/// # Normalization Steps
///
/// 1. Host is already lowercased by the parser
/// 2. Remove fragment (everything after #)
/// 3. Remove dot segments and trailing slash from the path (root stays `/`)
/// 4. Remove tracking query parameters (`utm_*`, `fbclid`, `gclid`, `mc_eid`)
/// 5. Sort remaining query parameters by key, keeping the order of repeated keys
/// 6. Remove empty query string
///
/// Pagination links to the same page often differ only in parameter order,
/// so `?page=2&sort=new` and `?sort=new&page=2` normalize to the same key.
///
/// # Examples
///
/// ```
/// use suruga_watch::url::normalize_url;
/// use url::Url;
///
/// let url = Url::parse("https://Example.com/list/?sort=new&page=2#top").unwrap();
/// assert_eq!(normalize_url(&url).as_str(), "https://example.com/list?page=2&sort=new");
/// ```
pub fn normalize_url(url: &Url) -> Url {
    let mut url = url.clone();

    url.set_fragment(None);

    let normalized_path = normalize_path(url.path());
    url.set_path(&normalized_path);

    if url.query().is_some() {
        let params = filter_and_sort_query_params(&url);
        if params.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(params);
        }
    }

    url
}

/// Normalizes a URL path by removing dot segments and trailing slashes
fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }

    if segments.is_empty() {
        return "/".to_string();
    }

    format!("/{}", segments.join("/"))
}

/// Filters out tracking parameters and sorts the remaining ones by key
fn filter_and_sort_query_params(url: &Url) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    params.sort_by(|a, b| a.0.cmp(&b.0));
    params
}

fn is_tracking_param(key: &str) -> bool {
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key)
}
