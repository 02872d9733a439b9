//! URL and input validation utilities

use url::Url;

/// Check if a parsed URL uses a fetchable scheme (http or https)
pub fn is_fetchable_scheme(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}
