//! Short-video resolution API provider
//!
//! Calls a third-party resolution API (tikwm-compatible) with the original
//! URL as a parameter. The API answers with a JSON envelope carrying a
//! status code, a playable media URL and metadata; on success a second GET
//! fetches the resolved media. A rejected or malformed envelope is
//! recoverable since the direct fetch may still work.

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::core::error_handling::{ErrorKind, ErrorReport, FetchResult};
use crate::core::models::{
    PayloadBody, ProbeInfo, ProviderCapabilities, ProviderId, RetrievedPayload,
};
use crate::providers::{FetchContext, Provider};

/// Resolution API response envelope
#[derive(Debug, Deserialize)]
struct ApiEnvelope {
    code: i64,

    #[serde(default)]
    msg: Option<String>,

    #[serde(default)]
    data: Option<ApiData>,
}

#[derive(Debug, Deserialize)]
struct ApiData {
    /// Playable media URL
    #[serde(default)]
    play: Option<String>,

    #[serde(default)]
    title: Option<String>,

    #[serde(default)]
    size: Option<u64>,

    #[serde(default)]
    author: Option<ApiAuthor>,
}

#[derive(Debug, Deserialize)]
struct ApiAuthor {
    #[serde(default)]
    unique_id: Option<String>,
}

pub struct ShortVideoProvider {
    client: Client,
    api_base: String,
}

impl ShortVideoProvider {
    pub fn new(client: Client, api_base: String) -> Self {
        Self { client, api_base }
    }

    fn api_url(&self, url: &Url) -> String {
        format!(
            "{}?url={}",
            self.api_base,
            urlencoding::encode(url.as_str())
        )
    }

    /// Ask the resolution API for a playable media URL and metadata.
    async fn resolve(&self, url: &Url, cx: &FetchContext) -> FetchResult<ResolvedVideo> {
        let api_url = self.api_url(url);
        debug!(api_url = %api_url, "contacting short-video resolution API");

        let response = self
            .client
            .get(&api_url)
            .timeout(cx.config.request_timeout())
            .send()
            .await
            .map_err(|e| ErrorReport::from_transport(ProviderId::ShortVideo, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ErrorReport::from_status(ProviderId::ShortVideo, status, &api_url));
        }

        let envelope: ApiEnvelope = response.json().await.map_err(|e| {
            ErrorReport::recoverable(
                ErrorKind::Parsing,
                Some(ProviderId::ShortVideo),
                format!("malformed resolution API response: {}", e),
            )
        })?;

        let play = envelope.data.as_ref().and_then(|d| d.play.clone());
        match (envelope.code, play) {
            (0, Some(play)) if !play.is_empty() => {
                let data = envelope.data.unwrap_or(ApiData {
                    play: None,
                    title: None,
                    size: None,
                    author: None,
                });
                Ok(ResolvedVideo {
                    play,
                    title: data.title.unwrap_or_else(|| "short_video".to_string()),
                    author: data
                        .author
                        .and_then(|a| a.unique_id)
                        .unwrap_or_else(|| "user".to_string()),
                    size: data.size,
                })
            }
            _ => Err(ErrorReport::recoverable(
                ErrorKind::ProviderRejected,
                Some(ProviderId::ShortVideo),
                format!(
                    "resolution API declined the request: {}",
                    envelope.msg.unwrap_or_else(|| "unknown API error".to_string())
                ),
            )),
        }
    }
}

/// Successful resolution result
struct ResolvedVideo {
    play: String,
    title: String,
    author: String,
    size: Option<u64>,
}

impl ResolvedVideo {
    fn filename(&self) -> String {
        format!("{}_{}.mp4", self.author, self.title)
    }
}

#[async_trait]
impl Provider for ShortVideoProvider {
    fn id(&self) -> ProviderId {
        ProviderId::ShortVideo
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            requires_credential: false,
            supports_streaming_probe: true,
        }
    }

    fn handles_host(&self, host: &str) -> bool {
        host.contains("tiktok.com")
    }

    async fn probe(&self, url: &Url, cx: &FetchContext) -> FetchResult<ProbeInfo> {
        let resolved = self.resolve(url, cx).await?;
        Ok(ProbeInfo {
            size_bytes: resolved.size,
            suggested_name: Some(resolved.filename()),
        })
    }

    async fn fetch(&self, url: &Url, cx: &FetchContext) -> FetchResult<RetrievedPayload> {
        let resolved = self.resolve(url, cx).await?;
        let filename = resolved.filename();

        debug!(media_url = %resolved.play, name = %filename, "fetching resolved short video");

        let response = self
            .client
            .get(&resolved.play)
            .timeout(cx.config.transfer_timeout())
            .send()
            .await
            .map_err(|e| ErrorReport::from_transport(ProviderId::ShortVideo, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ErrorReport::from_status(
                ProviderId::ShortVideo,
                status,
                &resolved.play,
            ));
        }

        let size_bytes = response.content_length().or(resolved.size);
        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| ErrorReport::from_transport(ProviderId::ShortVideo, &e)));

        Ok(RetrievedPayload {
            source_provider: ProviderId::ShortVideo,
            suggested_name: filename,
            declared_mime: Some("video/mp4".to_string()),
            size_bytes,
            body: PayloadBody::Streaming(Box::pin(stream)),
        })
    }
}
