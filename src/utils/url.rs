// src/utils/url.rs

//! URL helpers for listing pagination and post recognition.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

/// Date-prefixed post path: `/YYYY/MM/DD/slug`, trailing slash already removed.
static POST_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/\d{4}/\d{2}/\d{2}/[^/]+$").expect("valid post regex"));

/// URL of a listing page. Page 1 is the bare site root.
///
/// # Examples
/// ```
/// use rando::utils::url::listing_page_url;
///
/// assert_eq!(listing_page_url("https://example.com", 1), "https://example.com/");
/// assert_eq!(listing_page_url("https://example.com/", 3), "https://example.com/page/3/");
/// ```
pub fn listing_page_url(base: &str, page: usize) -> String {
    let base = base.trim_end_matches('/');
    if page <= 1 {
        format!("{base}/")
    } else {
        format!("{base}/page/{page}/")
    }
}

/// Canonical post URL for an anchor target, or `None` if it is not a post.
///
/// Relative targets resolve against `base`. Only targets on the base host (or
/// one of its subdomains) qualify. The canonical form is the base origin plus
/// the path without its trailing slash; query and fragment are dropped.
pub fn canonical_post_url(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }

    let target = base.join(href).ok()?;
    if !is_same_site(base, &target) {
        return None;
    }

    let path = target.path();
    let path = path.strip_suffix('/').unwrap_or(path);
    if !POST_PATH.is_match(path) {
        return None;
    }

    Some(format!("{}{}", base.origin().ascii_serialization(), path))
}

fn is_same_site(base: &Url, target: &Url) -> bool {
    match (base.host_str(), target.host_str()) {
        (Some(base_host), Some(host)) => {
            host == base_host || host.ends_with(&format!(".{base_host}"))
        }
        _ => false,
    }
}
