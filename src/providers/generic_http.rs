//! Direct HTTP GET provider
//!
//! Universal fallback strategy: a plain GET with redirects followed.
//! Filename comes from the Content-Disposition header when present and
//! well-formed, else from the URL path's last segment, else the fixed
//! fallback constant. MIME comes from the Content-Type header stripped of
//! parameters.

use async_trait::async_trait;
use futures_util::StreamExt;
use regex::Regex;
use reqwest::{Client, Response};
use std::sync::OnceLock;
use tracing::debug;
use url::Url;

use crate::core::error_handling::{ErrorReport, FetchResult};
use crate::core::models::{
    PayloadBody, ProbeInfo, ProviderCapabilities, ProviderId, RetrievedPayload,
};
use crate::providers::{FetchContext, Provider};
use crate::utils::file_utils::FALLBACK_FILENAME;
use crate::utils::mime::strip_mime_params;

fn disposition_filename_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)filename\*?=(?:UTF-8'')?([^;]+)"#).expect("static regex")
    })
}

pub struct GenericHttpProvider {
    client: Client,
}

impl GenericHttpProvider {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Issue the GET and verify the final status after redirects.
    async fn execute(&self, url: &str, cx: &FetchContext) -> FetchResult<Response> {
        let response = self
            .client
            .get(url)
            .timeout(cx.config.transfer_timeout())
            .send()
            .await
            .map_err(|e| ErrorReport::from_transport(ProviderId::GenericHttp, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ErrorReport::from_status(ProviderId::GenericHttp, status, url));
        }
        Ok(response)
    }

    /// Turn an already-validated response into a payload, attributing it to
    /// `provider`. The Google Drive provider reuses this path so its
    /// confirmed-good connection is consumed directly.
    pub(crate) fn payload_from_response(
        response: Response,
        request_url: &Url,
        provider: ProviderId,
    ) -> RetrievedPayload {
        let suggested_name = derive_filename(&response, request_url);
        let declared_mime = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(strip_mime_params);
        let size_bytes = response.content_length();

        debug!(
            provider = %provider,
            name = %suggested_name,
            mime = ?declared_mime,
            size = ?size_bytes,
            "opened HTTP payload"
        );

        let stream = response
            .bytes_stream()
            .map(move |chunk| chunk.map_err(|e| ErrorReport::from_transport(provider, &e)));

        RetrievedPayload {
            source_provider: provider,
            suggested_name,
            declared_mime,
            size_bytes,
            body: PayloadBody::Streaming(Box::pin(stream)),
        }
    }
}

#[async_trait]
impl Provider for GenericHttpProvider {
    fn id(&self) -> ProviderId {
        ProviderId::GenericHttp
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            requires_credential: false,
            supports_streaming_probe: true,
        }
    }

    fn handles_host(&self, _host: &str) -> bool {
        // Universal fallback
        true
    }

    async fn probe(&self, url: &Url, cx: &FetchContext) -> FetchResult<ProbeInfo> {
        let response = self
            .client
            .head(url.as_str())
            .timeout(cx.config.probe_timeout())
            .send()
            .await
            .map_err(|e| ErrorReport::from_transport(ProviderId::GenericHttp, &e))?;

        if !response.status().is_success() {
            return Ok(ProbeInfo::unknown());
        }
        Ok(ProbeInfo {
            size_bytes: response.content_length(),
            suggested_name: Some(derive_filename(&response, url)),
        })
    }

    async fn fetch(&self, url: &Url, cx: &FetchContext) -> FetchResult<RetrievedPayload> {
        let response = self.execute(url.as_str(), cx).await?;
        Ok(Self::payload_from_response(response, url, ProviderId::GenericHttp))
    }
}

/// Filename resolution order: well-formed Content-Disposition value, then
/// the decoded last URL path segment, then the fallback constant. A header
/// or path candidate only counts when it contains a dot and does not end
/// with one.
fn derive_filename(response: &Response, request_url: &Url) -> String {
    if let Some(value) = response
        .headers()
        .get(reqwest::header::CONTENT_DISPOSITION)
        .and_then(|v| v.to_str().ok())
    {
        if let Some(name) = filename_from_disposition(value) {
            return name;
        }
    }

    filename_from_url_path(request_url).unwrap_or_else(|| FALLBACK_FILENAME.to_string())
}

fn filename_from_disposition(value: &str) -> Option<String> {
    let captures = disposition_filename_re().captures(value)?;
    let raw = captures.get(1)?.as_str().trim().trim_matches('"');
    let decoded = urlencoding::decode(raw).map(|s| s.into_owned()).ok()?;
    if decoded.contains('.') && !decoded.ends_with('.') {
        Some(decoded)
    } else {
        None
    }
}

fn filename_from_url_path(url: &Url) -> Option<String> {
    let last = url.path_segments()?.filter(|s| !s.is_empty()).next_back()?;
    let decoded = urlencoding::decode(last).map(|s| s.into_owned()).ok()?;
    if decoded.contains('.') && !decoded.ends_with('.') {
        Some(decoded)
    } else {
        None
    }
}
