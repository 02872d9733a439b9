//! Social post extractor provider
//!
//! Resolves an Instagram-style post URL into its direct media URL via a
//! metadata source, then performs the binary transfer with a plain GET.
//! The metadata source sits behind a trait so the extraction capability
//! stays an opaque external service.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use futures_util::StreamExt;
use regex::Regex;
use reqwest::Client;
use std::sync::Arc;
use std::sync::OnceLock;
use tracing::{debug, warn};
use url::Url;

use crate::core::error_handling::{ErrorKind, ErrorReport, FetchResult};
use crate::core::models::{
    PayloadBody, ProbeInfo, ProviderCapabilities, ProviderId, RetrievedPayload,
};
use crate::providers::{FetchContext, Provider};

fn shortcode_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?:p|reel|tv)/([\w-]+)").expect("static regex"))
}

/// Post metadata resolved by the extraction capability
#[derive(Debug, Clone)]
pub struct PostMetadata {
    pub owner: String,

    pub shortcode: String,

    /// Post creation time, when the upstream reports one
    pub taken_at: Option<DateTime<Utc>>,

    pub is_video: bool,

    pub video_url: Option<String>,

    pub image_url: Option<String>,
}

impl PostMetadata {
    /// Direct media URL: primary field for the post type, with the other
    /// field as fallback when the primary is absent.
    fn media_url(&self) -> Option<(&str, bool)> {
        if self.is_video {
            self.video_url
                .as_deref()
                .map(|u| (u, true))
                .or_else(|| self.image_url.as_deref().map(|u| (u, false)))
        } else {
            self.image_url
                .as_deref()
                .map(|u| (u, false))
                .or_else(|| self.video_url.as_deref().map(|u| (u, true)))
        }
    }
}

/// External post-metadata capability
#[async_trait]
pub trait PostMetadataSource: Send + Sync {
    async fn lookup(&self, shortcode: &str, cx: &FetchContext) -> FetchResult<PostMetadata>;
}

/// Default metadata source using the public Instagram web JSON endpoint.
pub struct InstagramWebSource {
    client: Client,
}

impl InstagramWebSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn endpoint(shortcode: &str) -> String {
        format!("https://www.instagram.com/p/{}/?__a=1&__d=dis", shortcode)
    }
}

#[async_trait]
impl PostMetadataSource for InstagramWebSource {
    async fn lookup(&self, shortcode: &str, cx: &FetchContext) -> FetchResult<PostMetadata> {
        let endpoint = Self::endpoint(shortcode);
        let response = self
            .client
            .get(&endpoint)
            .timeout(cx.config.request_timeout())
            .send()
            .await
            .map_err(|e| ErrorReport::from_transport(ProviderId::SocialPost, &e))?;

        let status = response.status();
        match status.as_u16() {
            200 => {}
            404 => {
                return Err(ErrorReport::terminal(
                    ErrorKind::NotFound,
                    Some(ProviderId::SocialPost),
                    format!("post {} not found", shortcode),
                ));
            }
            401 | 403 => {
                return Err(ErrorReport::terminal(
                    ErrorKind::LoginRequired,
                    Some(ProviderId::SocialPost),
                    "profile is private or the post requires login",
                ));
            }
            code if status.is_server_error() => {
                return Err(ErrorReport::recoverable(
                    ErrorKind::ProviderUnavailable,
                    Some(ProviderId::SocialPost),
                    format!("upstream answered HTTP {}", code),
                ));
            }
            code => {
                return Err(ErrorReport::terminal(
                    ErrorKind::Network,
                    Some(ProviderId::SocialPost),
                    format!("unexpected HTTP {} from {}", code, endpoint),
                ));
            }
        }

        let value: serde_json::Value = response.json().await.map_err(|e| {
            ErrorReport::recoverable(
                ErrorKind::ProviderUnavailable,
                Some(ProviderId::SocialPost),
                format!("unreadable post metadata response: {}", e),
            )
        })?;

        parse_post_metadata(&value, shortcode).ok_or_else(|| {
            // A JSON body without post fields is the logged-out shell page
            ErrorReport::terminal(
                ErrorKind::LoginRequired,
                Some(ProviderId::SocialPost),
                "post metadata is not publicly accessible (login required)",
            )
        })
    }
}

/// Pull the fields we need out of either web response shape (`graphql`
/// documents or the newer `items` array).
fn parse_post_metadata(value: &serde_json::Value, shortcode: &str) -> Option<PostMetadata> {
    let node = value
        .pointer("/graphql/shortcode_media")
        .or_else(|| value.pointer("/items/0"))?;

    let owner = node
        .pointer("/owner/username")
        .or_else(|| node.pointer("/user/username"))
        .and_then(|v| v.as_str())
        .unwrap_or("post")
        .to_string();

    let is_video = node
        .get("is_video")
        .and_then(|v| v.as_bool())
        .or_else(|| node.get("media_type").and_then(|v| v.as_i64()).map(|t| t == 2))
        .unwrap_or(false);

    let video_url = node
        .get("video_url")
        .or_else(|| node.pointer("/video_versions/0/url"))
        .and_then(|v| v.as_str())
        .map(str::to_string);

    let image_url = node
        .get("display_url")
        .or_else(|| node.pointer("/image_versions2/candidates/0/url"))
        .and_then(|v| v.as_str())
        .map(str::to_string);

    let taken_at = node
        .get("taken_at_timestamp")
        .or_else(|| node.get("taken_at"))
        .and_then(|v| v.as_i64())
        .and_then(|secs| Utc.timestamp_opt(secs, 0).single());

    Some(PostMetadata {
        owner,
        shortcode: shortcode.to_string(),
        taken_at,
        is_video,
        video_url,
        image_url,
    })
}

pub struct SocialPostProvider {
    client: Client,
    source: Arc<dyn PostMetadataSource>,
}

impl SocialPostProvider {
    pub fn new(client: Client, source: Arc<dyn PostMetadataSource>) -> Self {
        Self { client, source }
    }

    /// Metadata lookup with a single retry on a transient upstream failure.
    async fn lookup_with_retry(
        &self,
        shortcode: &str,
        cx: &FetchContext,
    ) -> FetchResult<PostMetadata> {
        match self.source.lookup(shortcode, cx).await {
            Err(report)
                if report.kind == ErrorKind::ProviderUnavailable && report.recoverable =>
            {
                warn!(
                    shortcode = %shortcode,
                    "transient metadata failure, retrying once: {}",
                    report.message
                );
                self.source.lookup(shortcode, cx).await
            }
            other => other,
        }
    }
}

#[async_trait]
impl Provider for SocialPostProvider {
    fn id(&self) -> ProviderId {
        ProviderId::SocialPost
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            requires_credential: false,
            supports_streaming_probe: false,
        }
    }

    fn handles_host(&self, host: &str) -> bool {
        host.contains("instagram.com")
    }

    async fn fetch(&self, url: &Url, cx: &FetchContext) -> FetchResult<RetrievedPayload> {
        let shortcode = extract_shortcode(url).ok_or_else(|| {
            ErrorReport::terminal(
                ErrorKind::Parsing,
                Some(ProviderId::SocialPost),
                format!("invalid post URL format (no /p/, /reel/ or /tv/ segment): {}", url),
            )
        })?;

        debug!(shortcode = %shortcode, "fetching post metadata");
        let metadata = self.lookup_with_retry(&shortcode, cx).await?;

        let Some((media_url, is_video)) = metadata.media_url() else {
            return Err(ErrorReport::terminal(
                ErrorKind::Parsing,
                Some(ProviderId::SocialPost),
                format!("no media URL found in post {}", shortcode),
            ));
        };

        let date = metadata.taken_at.unwrap_or_else(Utc::now);
        let ext = if is_video { "mp4" } else { "jpg" };
        let filename = format!(
            "{}_{}_{}.{}",
            metadata.owner,
            shortcode,
            date.format("%Y%m%d"),
            ext
        );
        let mime = if is_video { "video/mp4" } else { "image/jpeg" };

        debug!(media_url = %media_url, name = %filename, "fetching post media");

        let response = self
            .client
            .get(media_url)
            .timeout(cx.config.transfer_timeout())
            .send()
            .await
            .map_err(|e| ErrorReport::from_transport(ProviderId::SocialPost, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ErrorReport::from_status(ProviderId::SocialPost, status, media_url));
        }

        let size_bytes = response.content_length();
        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| ErrorReport::from_transport(ProviderId::SocialPost, &e)));

        Ok(RetrievedPayload {
            source_provider: ProviderId::SocialPost,
            suggested_name: filename,
            declared_mime: Some(mime.to_string()),
            size_bytes,
            body: PayloadBody::Streaming(Box::pin(stream)),
        })
    }
}

/// Extract the short identifier from a `/p/`, `/reel/` or `/tv/` path.
fn extract_shortcode(url: &Url) -> Option<String> {
    shortcode_re()
        .captures(url.path())
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}
