//! ImageKit URL helpers.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::{Captures, Regex};

static HOST_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?i)https?://[^/]+/").expect("Invalid regex"));

static TR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"tr=([^&]*)").expect("Invalid regex"));

/// Resolve a stored image reference to a URL on `endpoint`.
///
/// URLs already under the endpoint are kept as they are. Other absolute URLs
/// have their host replaced by the endpoint; relative paths are joined onto it. `width`/`height` add a resize transformation, merged into
/// an existing `tr=` parameter if there is one. Blank input yields `""`.
#[must_use]
pub fn image_url(endpoint: &str, path_or_url: &str, width: Option<u32>, height: Option<u32>) -> String {
    let path_or_url = path_or_url.trim();
    if path_or_url.is_empty() {
        return String::new();
    }
    let endpoint = endpoint.trim_end_matches('/');

    let mut url = if is_under_endpoint(endpoint, path_or_url) {
        path_or_url.to_string()
    } else if HOST_RE.is_match(path_or_url) {
        HOST_RE
            .replace(path_or_url, format!("{endpoint}/"))
            .into_owned()
    } else if path_or_url.starts_with("http://") || path_or_url.starts_with("https://") {
        path_or_url.to_string()
    } else {
        format!("{endpoint}/{}", path_or_url.trim_start_matches('/'))
    };

    let transforms: Vec<String> = [width.map(|w| format!("w-{w}")), height.map(|h| format!("h-{h}"))]
        .into_iter()
        .flatten()
        .collect();
    if transforms.is_empty() {
        return url;
    }
    let transforms = transforms.join(",");

    if TR_RE.is_match(&url) {
        url = TR_RE
            .replace(&url, |caps: &Captures<'_>| {
                let existing = caps.get(1).map_or("", |m| m.as_str());
                if existing.is_empty() {
                    format!("tr={transforms}")
                } else {
                    format!("tr={existing},{transforms}")
                }
            })
            .into_owned();
    } else {
        let separator = if url.contains('?') { '&' } else { '?' };
        url = format!("{url}{separator}tr={transforms}");
    }
    url
}

/// Whether `url` is `endpoint` itself or a path below it. Scheme and host
/// compare case-insensitively.
fn is_under_endpoint(endpoint: &str, url: &str) -> bool {
    let Some(head) = url.get(..endpoint.len()) else {
        return false;
    };
    head.eq_ignore_ascii_case(endpoint)
        && matches!(url.as_bytes().get(endpoint.len()), None | Some(b'/' | b'?'))
}

/// `{endpoint}/{image_id}?tr={transformation}`.
#[must_use]
pub fn transformed_url(endpoint: &str, image_id: &str, transformation: &str) -> String {
    format!(
        "{}/{}?tr={transformation}",
        endpoint.trim_end_matches('/'),
        image_id.trim_start_matches('/')
    )
}

/// Upload file name `{Name}_{yyyyMMddHHmmss}.{ext}`.
///
/// The product name keeps ASCII letters, digits, `-` and `_`; anything else
/// becomes `_`. The extension comes from the uploaded file name and defaults
/// to `jpg`.
#[must_use]
pub fn file_name_for(product_name: &str, original_file_name: Option<&str>, now: DateTime<Utc>) -> String {
    let mut stem: String = product_name
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if stem.is_empty() {
        stem.push_str("product");
    }

    let ext = original_file_name
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| "jpg".to_string());

    format!("{stem}_{}.{ext}", now.format("%Y%m%d%H%M%S"))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    const ENDPOINT: &str = "https://ik.imagekit.io/tennisshop";

    #[test]
    fn test_image_url_blank_is_empty() {
        assert_eq!(image_url(ENDPOINT, "  ", Some(100), None), "");
    }

    #[test]
    fn test_image_url_joins_relative_paths() {
        assert_eq!(
            image_url(ENDPOINT, "/products/a.jpg", None, None),
            "https://ik.imagekit.io/tennisshop/products/a.jpg"
        );
        assert_eq!(
            image_url(ENDPOINT, "products/a.jpg", None, None),
            "https://ik.imagekit.io/tennisshop/products/a.jpg"
        );
    }

    #[test]
    fn test_image_url_rewrites_host() {
        assert_eq!(
            image_url(ENDPOINT, "https://cdn.example.com/products/a.jpg", None, None),
            "https://ik.imagekit.io/tennisshop/products/a.jpg"
        );
    }

    #[test]
    fn test_image_url_keeps_urls_already_on_endpoint() {
        assert_eq!(
            image_url(ENDPOINT, "https://ik.imagekit.io/tennisshop/products/a.jpg", Some(300), None),
            "https://ik.imagekit.io/tennisshop/products/a.jpg?tr=w-300"
        );
        assert_eq!(
            image_url(
                "https://ik.imagekit.io/tennisshop/",
                "https://IK.imagekit.io/tennisshop/products/a.jpg",
                None,
                None
            ),
            "https://IK.imagekit.io/tennisshop/products/a.jpg"
        );
    }

    #[test]
    fn test_image_url_rewrites_other_accounts_on_same_host() {
        assert_eq!(
            image_url(ENDPOINT, "https://ik.imagekit.io/tennisshopold/a.jpg", None, None),
            "https://ik.imagekit.io/tennisshop/tennisshopold/a.jpg"
        );
    }

    #[test]
    fn test_image_url_adds_and_merges_transforms() {
        assert_eq!(
            image_url(ENDPOINT, "products/a.jpg", Some(300), Some(200)),
            "https://ik.imagekit.io/tennisshop/products/a.jpg?tr=w-300,h-200"
        );
        assert_eq!(
            image_url(ENDPOINT, "products/a.jpg?v=2", Some(300), None),
            "https://ik.imagekit.io/tennisshop/products/a.jpg?v=2&tr=w-300"
        );
        assert_eq!(
            image_url(ENDPOINT, "products/a.jpg?tr=q-80", None, Some(50)),
            "https://ik.imagekit.io/tennisshop/products/a.jpg?tr=q-80,h-50"
        );
    }

    #[test]
    fn test_transformed_url() {
        assert_eq!(
            transformed_url(ENDPOINT, "products/a.jpg", "w-100"),
            "https://ik.imagekit.io/tennisshop/products/a.jpg?tr=w-100"
        );
    }

    #[test]
    fn test_file_name_for() {
        let now = Utc.with_ymd_and_hms(2025, 3, 9, 14, 5, 7).single().unwrap_or_default();
        assert_eq!(
            file_name_for("Wilson Pro Staff 97", Some("IMG_01.PNG"), now),
            "Wilson_Pro_Staff_97_20250309140507.png"
        );
        assert_eq!(file_name_for("", None, now), "product_20250309140507.jpg");
        assert_eq!(
            file_name_for("Vợt Yonex", Some("noext"), now),
            "V_t_Yonex_20250309140507.jpg"
        );
    }
}
