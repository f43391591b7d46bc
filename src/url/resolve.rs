use crate::config::SiteConfig;
use crate::UrlError;
use url::Url;

/// Query parameter the catalog uses for listing pagination
const PAGE_PARAM: &str = "page";

/// Builds the absolute category listing URL from the site configuration
///
/// `category_path` may be a path relative to `base_url` or an absolute URL.
///
/// # Examples
///
/// ```
/// use metro_harvest::config::SiteConfig;
/// use metro_harvest::url::category_url;
///
/// let site = SiteConfig {
///     base_url: "https://shop.example.com".to_string(),
///     category_path: "/category/tea".to_string(),
/// };
/// assert_eq!(category_url(&site).unwrap().as_str(), "https://shop.example.com/category/tea");
/// ```
pub fn category_url(site: &SiteConfig) -> Result<Url, UrlError> {
    let base = parse_origin(&site.base_url)?;
    base.join(site.category_path.trim())
        .map_err(|e| UrlError::Parse(format!("{}: {}", site.category_path, e)))
}

/// Parses the base origin, accepting only HTTP(S) URLs with a host
pub fn parse_origin(base_url: &str) -> Result<Url, UrlError> {
    let url = Url::parse(base_url).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingOrigin(base_url.to_string()));
    }

    Ok(url)
}

/// Returns the URL of listing page `page`
///
/// Page 1 is the category URL itself; later pages carry `?page=N`.
pub fn listing_page_url(category: &Url, page: u32) -> Url {
    if page <= 1 {
        return category.clone();
    }

    let mut url = category.clone();
    let retained: Vec<(String, String)> = category
        .query_pairs()
        .filter(|(key, _)| key != PAGE_PARAM)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    url.query_pairs_mut()
        .clear()
        .extend_pairs(retained)
        .append_pair(PAGE_PARAM, &page.to_string());
    url
}

/// Resolves an `href` found in a page against the site origin
///
/// Returns None for empty, fragment-only, and non-HTTP(S) links.
pub fn resolve_link(base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    match base.join(href) {
        Ok(absolute) if absolute.scheme() == "http" || absolute.scheme() == "https" => {
            Some(absolute)
        }
        _ => None,
    }
}
