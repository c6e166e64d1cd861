//! URL helpers for catalog links and image addresses
//!
//! Catalog cards carry a mix of site-relative hrefs, protocol-relative image
//! sources and absolute URLs. These helpers turn them into absolute URLs and
//! derive upload filenames.

use url::Url;

/// Filename used when an image URL has no usable last segment
pub const FALLBACK_IMAGE_NAME: &str = "image.jpg";

/// Makes a listing href absolute against the catalog origin
///
/// Hrefs that already start with `http` are returned unchanged, and an empty
/// href yields the origin itself.
///
/// # Examples
///
/// ```
/// use moto_harvest::url::absolutize_href;
///
/// assert_eq!(
///     absolutize_href("/avanzimoto/Usato/honda-1", "https://dealer.moto.it"),
///     "https://dealer.moto.it/avanzimoto/Usato/honda-1"
/// );
/// assert_eq!(
///     absolutize_href("https://other.it/a", "https://dealer.moto.it"),
///     "https://other.it/a"
/// );
/// ```
pub fn absolutize_href(href: &str, origin: &str) -> String {
    let href = href.trim();
    if href.is_empty() {
        return origin.to_string();
    }
    if href.starts_with("http") {
        return href.to_string();
    }

    match Url::parse(origin).and_then(|base| base.join(href)) {
        Ok(url) => url.to_string(),
        Err(_) => format!("{}{}", origin.trim_end_matches('/'), href),
    }
}

/// Expands a protocol-relative image URL (`//cdn/...`) to HTTPS
pub fn normalize_image_url(src: &str) -> String {
    let src = src.trim();
    match src.strip_prefix("//") {
        Some(rest) => format!("https://{}", rest),
        None => src.to_string(),
    }
}

/// Derives an upload filename from the last path segment of an image URL
pub fn filename_from_url(image_url: &str) -> String {
    let segment = match Url::parse(image_url) {
        Ok(url) => url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .map(|s| s.to_string()),
        Err(_) => image_url
            .split(['?', '#'])
            .next()
            .and_then(|path| path.rsplit('/').next())
            .map(|s| s.to_string()),
    };

    segment
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| FALLBACK_IMAGE_NAME.to_string())
}
