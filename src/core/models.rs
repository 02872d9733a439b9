//! Core data models for the media fetcher

use bytes::Bytes;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::error_handling::ErrorReport;

/// A single user-supplied retrieval request.
///
/// Created once per user action and owned by the router for the duration of
/// one routing pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaRequest {
    pub raw_url: String,
}

impl MediaRequest {
    pub fn new(raw_url: impl Into<String>) -> Self {
        Self {
            raw_url: raw_url.into(),
        }
    }
}

/// Retrieval strategy identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderId {
    GenericHttp,

    GoogleDrive,

    ShortVideo,

    SocialPost,

    VideoExtractor,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::GenericHttp => "generic_http",
            ProviderId::GoogleDrive => "google_drive",
            ProviderId::ShortVideo => "short_video",
            ProviderId::SocialPost => "social_post",
            ProviderId::VideoExtractor => "video_extractor",
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A provider selected by the classifier for a given URL.
///
/// Candidates are ordered highest priority first and never mutated after
/// creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderCandidate {
    pub provider: ProviderId,

    pub priority: u8,
}

/// Static per-provider capability descriptor
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ProviderCapabilities {
    pub requires_credential: bool,

    pub supports_streaming_probe: bool,
}

/// Pre-flight size estimate for user-facing display.
///
/// Probe failures are non-fatal and degrade to unknown values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProbeInfo {
    pub size_bytes: Option<u64>,

    pub suggested_name: Option<String>,
}

impl ProbeInfo {
    pub fn unknown() -> Self {
        Self::default()
    }
}

/// The bytes of a fetched artifact, either fully buffered or exposed as a
/// stream so callers can forward chunks before the transfer completes.
pub enum PayloadBody {
    Buffered(Bytes),
    Streaming(BoxStream<'static, Result<Bytes, ErrorReport>>),
}

impl fmt::Debug for PayloadBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PayloadBody::Buffered(bytes) => f.debug_tuple("Buffered").field(&bytes.len()).finish(),
            PayloadBody::Streaming(_) => f.write_str("Streaming(..)"),
        }
    }
}

impl PayloadBody {
    /// Buffered length, if already known without consuming the body.
    pub fn buffered_len(&self) -> Option<u64> {
        match self {
            PayloadBody::Buffered(bytes) => Some(bytes.len() as u64),
            PayloadBody::Streaming(_) => None,
        }
    }
}

/// Raw fetch result plus provenance, owned by the producing provider until
/// handed to the result assembler.
#[derive(Debug)]
pub struct RetrievedPayload {
    pub source_provider: ProviderId,

    pub suggested_name: String,

    pub declared_mime: Option<String>,

    /// Declared size, when the upstream reported one
    pub size_bytes: Option<u64>,

    pub body: PayloadBody,
}

/// The normalized success result of one routing pass.
///
/// `filename` is sanitized (no path separators or reserved characters,
/// non-empty, at most 150 characters) and `mime_type` is always concrete.
#[derive(Debug)]
pub struct MediaArtifact {
    pub filename: String,

    pub mime_type: String,

    pub bytes: Bytes,

    pub size_bytes: u64,
}
