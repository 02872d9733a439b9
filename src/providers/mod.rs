//! Retrieval strategies
//!
//! One provider per retrieval strategy, all behind the same capability
//! interface so the router never special-cases any of them.

pub mod generic_http;
pub mod google_drive;
pub mod short_video;
pub mod social_post;
pub mod video_extractor;

// Re-export providers
pub use generic_http::GenericHttpProvider;
pub use google_drive::GoogleDriveProvider;
pub use short_video::ShortVideoProvider;
pub use social_post::{InstagramWebSource, PostMetadata, PostMetadataSource, SocialPostProvider};
pub use video_extractor::{
    ExtractedMedia, ExtractorProbe, VideoExtractor, VideoExtractorProvider, YtDlpCli,
};

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use url::Url;
use uuid::Uuid;

use crate::core::config::{CredentialBlob, FetcherConfig};
use crate::core::error_handling::FetchResult;
use crate::core::models::{ProbeInfo, ProviderCapabilities, ProviderId, RetrievedPayload};
use crate::utils::network;

/// Per-call context handed to every provider invocation.
///
/// The credential blob is injected at router construction and treated as
/// immutable; providers never discover it from the filesystem themselves.
#[derive(Clone)]
pub struct FetchContext {
    pub config: Arc<FetcherConfig>,

    pub credential: Option<CredentialBlob>,

    pub cancel: CancellationToken,

    /// Routing pass identifier, for log correlation
    pub request_id: Uuid,
}

/// One retrieval strategy for a class of URLs.
#[async_trait]
pub trait Provider: Send + Sync {
    fn id(&self) -> ProviderId;

    fn capabilities(&self) -> ProviderCapabilities;

    /// Whether this provider's strategy applies to the given normalized host.
    fn handles_host(&self, host: &str) -> bool;

    /// Optional pre-flight size estimate for user-facing display. Failures
    /// are non-fatal; the default degrades to "unknown size".
    async fn probe(&self, url: &Url, cx: &FetchContext) -> FetchResult<ProbeInfo> {
        let _ = (url, cx);
        Ok(ProbeInfo::unknown())
    }

    /// Retrieve the media artifact behind `url`.
    async fn fetch(&self, url: &Url, cx: &FetchContext) -> FetchResult<RetrievedPayload>;
}

/// Build the default provider set over one shared HTTP client.
pub fn default_provider_set(
    config: &FetcherConfig,
) -> anyhow::Result<HashMap<ProviderId, Arc<dyn Provider>>> {
    let client = network::build_http_client(&config.user_agent, config.request_timeout())?;

    let generic = Arc::new(GenericHttpProvider::new(client.clone()));
    let drive = Arc::new(GoogleDriveProvider::new(client.clone()));
    let short_video = Arc::new(ShortVideoProvider::new(
        client.clone(),
        config.short_video_api_base.clone(),
    ));
    let social = Arc::new(SocialPostProvider::new(
        client.clone(),
        Arc::new(InstagramWebSource::new(client.clone())),
    ));
    let extractor = Arc::new(VideoExtractorProvider::new(Arc::new(YtDlpCli::new(
        config.extractor_binary.clone(),
    ))));

    let mut providers: HashMap<ProviderId, Arc<dyn Provider>> = HashMap::new();
    providers.insert(ProviderId::GenericHttp, generic);
    providers.insert(ProviderId::GoogleDrive, drive);
    providers.insert(ProviderId::ShortVideo, short_video);
    providers.insert(ProviderId::SocialPost, social);
    providers.insert(ProviderId::VideoExtractor, extractor);
    Ok(providers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_provider_set_registers_all_strategies() {
        let config = FetcherConfig::default();
        let providers = default_provider_set(&config).unwrap();
        assert_eq!(providers.len(), 5);
        for (id, provider) in &providers {
            assert_eq!(provider.id(), *id);
            // No strategy in the default set demands a credential up front
            assert!(!provider.capabilities().requires_credential);
        }
    }

    #[test]
    fn test_provider_host_claims() {
        let config = FetcherConfig::default();
        let providers = default_provider_set(&config).unwrap();
        assert!(providers[&ProviderId::GenericHttp].handles_host("anything.example"));
        assert!(providers[&ProviderId::GoogleDrive].handles_host("drive.google.com"));
        assert!(providers[&ProviderId::ShortVideo].handles_host("tiktok.com"));
        assert!(providers[&ProviderId::SocialPost].handles_host("instagram.com"));
        assert!(!providers[&ProviderId::SocialPost].handles_host("tiktok.com"));
        assert!(providers[&ProviderId::VideoExtractor].handles_host("youtu.be"));
        assert!(!providers[&ProviderId::VideoExtractor].handles_host("example.com"));
    }
}
