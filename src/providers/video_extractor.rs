//! Generic video extractor provider
//!
//! Wraps an external extraction capability (yt-dlp compatible) behind the
//! same fetch/probe interface as every other provider. Two phases: a
//! metadata-only probe that resolves the best video+audio format pair and an
//! approximate size, then the actual download staged in a scoped temporary
//! directory, merged into one container and read back into memory. The
//! extractor's failure text is classified in exactly one place.

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};
use url::Url;

use crate::core::error_handling::{ErrorKind, ErrorReport, FetchResult};
use crate::core::models::{
    PayloadBody, ProbeInfo, ProviderCapabilities, ProviderId, RetrievedPayload,
};
use crate::providers::{FetchContext, Provider};
use crate::utils::file_utils::sanitize_filename;

/// Best available video+audio pair, single file fallback
const FORMAT_SELECTOR: &str = "bv*+ba/b";

/// Container used when separate streams need merging
const MERGE_CONTAINER: &str = "mp4";

/// Metadata-only resolution result
#[derive(Debug, Clone, Default)]
pub struct ExtractorProbe {
    pub size_bytes: Option<u64>,

    pub suggested_name: Option<String>,
}

/// A fully downloaded and merged media file
#[derive(Debug)]
pub struct ExtractedMedia {
    pub file_name: String,

    pub bytes: Bytes,
}

/// External video/audio extraction capability
#[async_trait]
pub trait VideoExtractor: Send + Sync {
    /// Resolve format metadata without transferring media bytes.
    async fn probe(
        &self,
        url: &str,
        cookie_file: Option<&Path>,
        cx: &FetchContext,
    ) -> FetchResult<ExtractorProbe>;

    /// Download and merge the media, returning the finished file.
    async fn download(
        &self,
        url: &str,
        cookie_file: Option<&Path>,
        cx: &FetchContext,
    ) -> FetchResult<ExtractedMedia>;
}

/// Default extractor: the yt-dlp command-line binary as a subprocess.
pub struct YtDlpCli {
    binary: String,
}

impl YtDlpCli {
    pub fn new(binary: String) -> Self {
        Self { binary }
    }

    /// Run the binary with a hard timeout; the child is killed on cancel,
    /// timeout or drop.
    async fn run(
        &self,
        args: Vec<String>,
        timeout: Duration,
        cx: &FetchContext,
    ) -> FetchResult<std::process::Output> {
        debug!(binary = %self.binary, ?args, "invoking extractor");

        let mut command = Command::new(&self.binary);
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = tokio::select! {
            _ = cx.cancel.cancelled() => {
                return Err(ErrorReport::terminal(
                    ErrorKind::Unknown,
                    Some(ProviderId::VideoExtractor),
                    "extraction cancelled by caller",
                ));
            }
            result = tokio::time::timeout(timeout, command.output()) => match result {
                Err(_) => {
                    return Err(ErrorReport::terminal(
                        ErrorKind::Network,
                        Some(ProviderId::VideoExtractor),
                        format!("extractor timed out after {}s", timeout.as_secs()),
                    ));
                }
                Ok(Err(e)) => {
                    return Err(ErrorReport::terminal(
                        ErrorKind::Unknown,
                        Some(ProviderId::VideoExtractor),
                        format!("failed to launch extractor '{}': {}", self.binary, e),
                    ));
                }
                Ok(Ok(output)) => output,
            },
        };

        Ok(output)
    }

    fn base_args(cookie_file: Option<&Path>) -> Vec<String> {
        let mut args = vec![
            "--no-playlist".to_string(),
            "-f".to_string(),
            FORMAT_SELECTOR.to_string(),
        ];
        if let Some(path) = cookie_file {
            args.push("--cookies".to_string());
            args.push(path.display().to_string());
        }
        args
    }
}

#[async_trait]
impl VideoExtractor for YtDlpCli {
    async fn probe(
        &self,
        url: &str,
        cookie_file: Option<&Path>,
        cx: &FetchContext,
    ) -> FetchResult<ExtractorProbe> {
        let mut args = Self::base_args(cookie_file);
        args.push("-J".to_string());
        args.push(url.to_string());

        let output = self.run(args, cx.config.probe_timeout(), cx).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify_extractor_failure(&stderr, cookie_file.is_some()));
        }

        let info: Value = serde_json::from_slice(&output.stdout).map_err(|e| {
            ErrorReport::terminal(
                ErrorKind::Parsing,
                Some(ProviderId::VideoExtractor),
                format!("unreadable extractor metadata: {}", e),
            )
        })?;

        Ok(probe_from_metadata(&info))
    }

    async fn download(
        &self,
        url: &str,
        cookie_file: Option<&Path>,
        cx: &FetchContext,
    ) -> FetchResult<ExtractedMedia> {
        // Scoped staging area, removed on every exit path
        let staging = tempfile::tempdir().map_err(|e| {
            ErrorReport::terminal(
                ErrorKind::Unknown,
                Some(ProviderId::VideoExtractor),
                format!("failed to create staging directory: {}", e),
            )
        })?;
        let output_template = staging.path().join("%(title)s.%(ext)s");

        let mut args = Self::base_args(cookie_file);
        args.push("--merge-output-format".to_string());
        args.push(MERGE_CONTAINER.to_string());
        args.push("--no-progress".to_string());
        args.push("-q".to_string());
        args.push("-o".to_string());
        args.push(output_template.display().to_string());
        args.push(url.to_string());

        let output = self.run(args, cx.config.transfer_timeout(), cx).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify_extractor_failure(&stderr, cookie_file.is_some()));
        }

        let downloaded = first_file_in(staging.path()).ok_or_else(|| {
            ErrorReport::terminal(
                ErrorKind::NoArtifactProduced,
                Some(ProviderId::VideoExtractor),
                "extractor finished but produced no file",
            )
        })?;

        let file_name = downloaded
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("download.mp4")
            .to_string();

        let bytes = tokio::fs::read(&downloaded).await.map_err(|e| {
            ErrorReport::terminal(
                ErrorKind::Unknown,
                Some(ProviderId::VideoExtractor),
                format!("failed to read downloaded file: {}", e),
            )
        })?;

        debug!(file = %file_name, size = bytes.len(), "extractor produced file");

        Ok(ExtractedMedia {
            file_name,
            bytes: Bytes::from(bytes),
        })
    }
}

/// The single translation layer from extractor failure text to the error
/// taxonomy. Replace with a structured mapping the moment the capability
/// exposes typed errors.
fn classify_extractor_failure(stderr: &str, had_credential: bool) -> ErrorReport {
    let provider = Some(ProviderId::VideoExtractor);
    let lowered = stderr.to_ascii_lowercase();

    if stderr.contains("Unsupported URL") {
        return ErrorReport::recoverable(
            ErrorKind::UnsupportedUrl,
            provider,
            "URL is not supported by the video extractor",
        );
    }

    if stderr.contains("HTTP Error 403") || lowered.contains("error 403") {
        let mut message = String::from(
            "access denied (HTTP 403): the platform blocked the request \
             (login-restricted content, rate limiting or regional blocks)",
        );
        if had_credential {
            message.push_str("; authentication via the cookie file failed or was insufficient");
        } else {
            message.push_str("; no cookie file was supplied");
        }
        return ErrorReport::terminal(ErrorKind::AccessDenied, provider, message);
    }

    if lowered.contains("login required")
        || lowered.contains("confirm your age")
        || lowered.contains("video is private")
    {
        let message = if had_credential {
            "login/age check failed even with cookies; they may be expired or invalid"
        } else {
            "this content requires login or age verification (cookie file needed)"
        };
        return ErrorReport::terminal(ErrorKind::LoginRequired, provider, message);
    }

    ErrorReport::terminal(
        ErrorKind::Unknown,
        provider,
        format!("extractor failed: {}", stderr.trim()),
    )
}

/// Size and name resolution over the extractor's metadata document.
fn probe_from_metadata(info: &Value) -> ExtractorProbe {
    let direct_size = info
        .get("filesize_approx")
        .and_then(Value::as_u64)
        .or_else(|| info.get("filesize").and_then(Value::as_u64));

    // Sum the per-stream sizes of the selected format pair when the
    // top-level size is absent
    let size_bytes = direct_size.or_else(|| {
        info.get("requested_formats")
            .and_then(Value::as_array)
            .map(|formats| {
                formats
                    .iter()
                    .filter_map(|f| {
                        f.get("filesize")
                            .and_then(Value::as_u64)
                            .or_else(|| f.get("filesize_approx").and_then(Value::as_u64))
                    })
                    .sum::<u64>()
            })
            .filter(|total| *total > 0)
    });

    let title = info.get("title").and_then(Value::as_str).unwrap_or("download");
    let ext = info.get("ext").and_then(Value::as_str).unwrap_or("mp4");
    let suggested_name = info
        .get("_filename")
        .and_then(Value::as_str)
        .map(|f| {
            Path::new(f)
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or(f)
                .to_string()
        })
        .unwrap_or_else(|| format!("{}.{}", sanitize_filename(title), ext));

    ExtractorProbe {
        size_bytes,
        suggested_name: Some(suggested_name),
    }
}

fn first_file_in(dir: &Path) -> Option<PathBuf> {
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)
        .ok()?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();
    entries.sort();
    entries.into_iter().next()
}

/// Provider wrapper over the extraction capability.
pub struct VideoExtractorProvider {
    extractor: std::sync::Arc<dyn VideoExtractor>,
}

impl VideoExtractorProvider {
    pub fn new(extractor: std::sync::Arc<dyn VideoExtractor>) -> Self {
        Self { extractor }
    }

    fn cookie_path(cx: &FetchContext) -> Option<PathBuf> {
        cx.credential.as_ref().map(|c| c.path().to_path_buf())
    }
}

#[async_trait]
impl Provider for VideoExtractorProvider {
    fn id(&self) -> ProviderId {
        ProviderId::VideoExtractor
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            requires_credential: false,
            supports_streaming_probe: true,
        }
    }

    fn handles_host(&self, host: &str) -> bool {
        crate::core::classifier::matches_extractor_domain(host)
    }

    async fn probe(&self, url: &Url, cx: &FetchContext) -> FetchResult<ProbeInfo> {
        let cookie = Self::cookie_path(cx);
        let probe = self
            .extractor
            .probe(url.as_str(), cookie.as_deref(), cx)
            .await?;
        Ok(ProbeInfo {
            size_bytes: probe.size_bytes,
            suggested_name: probe.suggested_name,
        })
    }

    async fn fetch(&self, url: &Url, cx: &FetchContext) -> FetchResult<RetrievedPayload> {
        let cookie = Self::cookie_path(cx);
        if cookie.is_none() {
            warn!("no cookie file supplied; restricted content will likely fail");
        }

        let media = self
            .extractor
            .download(url.as_str(), cookie.as_deref(), cx)
            .await?;

        let size = media.bytes.len() as u64;
        Ok(RetrievedPayload {
            source_provider: ProviderId::VideoExtractor,
            suggested_name: media.file_name,
            declared_mime: None,
            size_bytes: Some(size),
            body: PayloadBody::Buffered(media.bytes),
        })
    }
}
