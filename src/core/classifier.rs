//! URL classification into an ordered provider candidate list
//!
//! The classifier inspects only the host and path shape of a URL; it never
//! performs network activity. Rules run in a fixed priority order and the
//! first match picks the primary candidate. Domain-specific providers exist
//! only where a raw HTTP GET cannot reach the media asset directly, so the
//! generic HTTP provider is appended as a universal fallback wherever a
//! later attempt could still succeed.

use tracing::debug;
use url::Url;

use crate::core::error_handling::{ErrorReport, FetchResult};
use crate::core::models::{ProviderCandidate, ProviderId};
use crate::utils::validation;

/// Priority assigned to the primary candidate
const PRIMARY_PRIORITY: u8 = 10;

/// Priority assigned to the appended generic fallback
const FALLBACK_PRIORITY: u8 = 0;

/// Domains resolvable by the generic video extractor
const EXTRACTOR_DOMAINS: &[&str] = &[
    "youtube.com",
    "youtu.be",
    "facebook.com",
    "fb.watch",
    "twitter.com",
    "x.com",
    "vimeo.com",
    "dailymotion.com",
    "soundcloud.com",
    "twitch.tv",
    "bandcamp.com",
    "bilibili.com",
];

/// Classify a raw URL string, rejecting anything that is not an absolute
/// http/https URL before any network activity.
pub fn classify_str(raw_url: &str) -> FetchResult<Vec<ProviderCandidate>> {
    let trimmed = raw_url.trim();
    let url = Url::parse(trimmed).map_err(|e| {
        ErrorReport::invalid_url(format!("not an absolute URL: {} ({})", trimmed, e))
    })?;

    if !validation::is_fetchable_scheme(&url) {
        return Err(ErrorReport::invalid_url(format!(
            "unsupported scheme '{}', expected http or https",
            url.scheme()
        )));
    }

    Ok(classify(&url))
}

/// Classify an already-parsed http(s) URL.
pub fn classify(url: &Url) -> Vec<ProviderCandidate> {
    let host = normalized_host(url);

    let primary = if host.contains("drive.google.com") {
        ProviderId::GoogleDrive
    } else if host.contains("instagram.com") {
        ProviderId::SocialPost
    } else if host.contains("tiktok.com") {
        ProviderId::ShortVideo
    } else if matches_extractor_domain(&host) {
        ProviderId::VideoExtractor
    } else {
        ProviderId::GenericHttp
    };

    let mut candidates = vec![ProviderCandidate {
        provider: primary,
        priority: PRIMARY_PRIORITY,
    }];

    // Social post failures are terminal by design, so a fallback candidate
    // would never be attempted; everything else degrades to a direct fetch.
    if primary != ProviderId::GenericHttp && primary != ProviderId::SocialPost {
        candidates.push(ProviderCandidate {
            provider: ProviderId::GenericHttp,
            priority: FALLBACK_PRIORITY,
        });
    }

    debug!(
        host = %host,
        primary = %primary,
        candidates = candidates.len(),
        "classified URL"
    );

    candidates
}

/// Lowercased host with a leading `www.` stripped.
fn normalized_host(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
    host.strip_prefix("www.").unwrap_or(&host).to_string()
}

/// Exact match or subdomain of an allow-listed hosting domain.
pub fn matches_extractor_domain(host: &str) -> bool {
    EXTRACTOR_DOMAINS
        .iter()
        .any(|d| host == *d || host.ends_with(&format!(".{}", d)))
}
