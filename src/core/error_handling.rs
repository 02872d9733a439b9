//! Error taxonomy and upstream-signal classification
//!
//! Every provider failure is normalized into an [`ErrorReport`] carrying an
//! [`ErrorKind`] and a recoverability flag. Recoverability governs only
//! whether the router advances to the next candidate; it never causes silent
//! success. Classification of upstream signals (HTTP status codes, transport
//! errors) lives here so providers keep a single narrow translation layer at
//! their boundary.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::core::models::ProviderId;

/// Terminal error messages are bounded to this many characters for display
pub const MAX_ERROR_MESSAGE_LEN: usize = 300;

/// Failure classification for the routing state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Input was not an absolute http/https URL
    InvalidUrl,
    /// A URL or upstream response could not be parsed
    Parsing,
    /// The provider does not handle this URL
    UnsupportedUrl,
    /// Upstream refused access (403-equivalent, confirmation page)
    AccessDenied,
    /// Upstream demands authentication the process cannot supply
    LoginRequired,
    /// The target resource does not exist
    NotFound,
    /// A resolution API answered but declined the request
    ProviderRejected,
    /// Transient upstream failure
    ProviderUnavailable,
    /// Transport-level failure (DNS, TLS, timeout, non-2xx)
    Network,
    /// The provider completed without producing a file
    NoArtifactProduced,
    /// Unclassifiable failure, treated as non-recoverable
    Unknown,
}

impl ErrorKind {
    /// Default recoverability per kind. `Parsing` defaults to terminal;
    /// providers that can fall back on a parse failure say so explicitly.
    pub fn recoverable_by_default(self) -> bool {
        matches!(
            self,
            ErrorKind::UnsupportedUrl | ErrorKind::ProviderRejected | ErrorKind::ProviderUnavailable
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidUrl => "invalid_url",
            ErrorKind::Parsing => "parsing",
            ErrorKind::UnsupportedUrl => "unsupported_url",
            ErrorKind::AccessDenied => "access_denied",
            ErrorKind::LoginRequired => "login_required",
            ErrorKind::NotFound => "not_found",
            ErrorKind::ProviderRejected => "provider_rejected",
            ErrorKind::ProviderUnavailable => "provider_unavailable",
            ErrorKind::Network => "network",
            ErrorKind::NoArtifactProduced => "no_artifact_produced",
            ErrorKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized failure shape surfaced by providers and the router
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("[{kind}] {message}")]
pub struct ErrorReport {
    pub kind: ErrorKind,

    /// Provider that produced the failure, absent for pre-provider failures
    pub provider: Option<ProviderId>,

    pub message: String,

    /// Whether the router may advance to the next candidate
    pub recoverable: bool,
}

impl ErrorReport {
    /// Build a report using the kind's default recoverability.
    pub fn new(kind: ErrorKind, provider: Option<ProviderId>, message: impl Into<String>) -> Self {
        let recoverable = kind.recoverable_by_default();
        Self {
            kind,
            provider,
            message: bound_message(message.into()),
            recoverable,
        }
    }

    /// Build a report that permits fallback to the next candidate.
    pub fn recoverable(
        kind: ErrorKind,
        provider: Option<ProviderId>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            recoverable: true,
            ..Self::new(kind, provider, message)
        }
    }

    /// Build a terminal report.
    pub fn terminal(
        kind: ErrorKind,
        provider: Option<ProviderId>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            recoverable: false,
            ..Self::new(kind, provider, message)
        }
    }

    pub fn invalid_url(message: impl Into<String>) -> Self {
        Self::terminal(ErrorKind::InvalidUrl, None, message)
    }

    /// Classify a transport error from reqwest.
    pub fn from_transport(provider: ProviderId, err: &reqwest::Error) -> Self {
        let detail = if err.is_timeout() {
            format!("request timed out: {}", err)
        } else if err.is_connect() {
            format!("connection failed: {}", err)
        } else {
            format!("network error: {}", err)
        };
        Self::terminal(ErrorKind::Network, Some(provider), detail)
    }

    /// Classify a non-2xx HTTP status observed after redirects.
    pub fn from_status(provider: ProviderId, status: reqwest::StatusCode, url: &str) -> Self {
        Self::terminal(
            ErrorKind::Network,
            Some(provider),
            format!("server returned HTTP {} for {}", status.as_u16(), url),
        )
    }
}

fn bound_message(message: String) -> String {
    if message.chars().count() <= MAX_ERROR_MESSAGE_LEN {
        message
    } else {
        let mut bounded: String = message.chars().take(MAX_ERROR_MESSAGE_LEN - 3).collect();
        bounded.push_str("...");
        bounded
    }
}

/// Result type alias for provider and router operations
pub type FetchResult<T> = Result<T, ErrorReport>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_recoverability_matches_policy() {
        assert!(ErrorKind::UnsupportedUrl.recoverable_by_default());
        assert!(ErrorKind::ProviderRejected.recoverable_by_default());
        assert!(ErrorKind::ProviderUnavailable.recoverable_by_default());

        assert!(!ErrorKind::InvalidUrl.recoverable_by_default());
        assert!(!ErrorKind::Parsing.recoverable_by_default());
        assert!(!ErrorKind::AccessDenied.recoverable_by_default());
        assert!(!ErrorKind::LoginRequired.recoverable_by_default());
        assert!(!ErrorKind::NotFound.recoverable_by_default());
        assert!(!ErrorKind::Network.recoverable_by_default());
        assert!(!ErrorKind::NoArtifactProduced.recoverable_by_default());
        assert!(!ErrorKind::Unknown.recoverable_by_default());
    }

    #[test]
    fn test_message_is_bounded() {
        let report = ErrorReport::new(ErrorKind::Unknown, None, "x".repeat(1000));
        assert_eq!(report.message.chars().count(), MAX_ERROR_MESSAGE_LEN);
        assert!(report.message.ends_with("..."));
    }

    #[test]
    fn test_explicit_recoverability_overrides_default() {
        let report = ErrorReport::recoverable(ErrorKind::Parsing, Some(ProviderId::ShortVideo), "bad json");
        assert!(report.recoverable);

        let report = ErrorReport::terminal(ErrorKind::ProviderRejected, Some(ProviderId::ShortVideo), "nope");
        assert!(!report.recoverable);
    }

    #[test]
    fn test_display_includes_kind_and_message() {
        let report = ErrorReport::invalid_url("missing scheme");
        assert_eq!(report.to_string(), "[invalid_url] missing scheme");
    }
}
