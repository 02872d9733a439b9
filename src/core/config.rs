//! Application configuration management

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::utils::network;

/// Main fetcher configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetcherConfig {
    /// Timeout for API calls and response headers, in seconds
    pub request_timeout_secs: u64,
    /// Upper bound for one full media transfer, in seconds
    pub transfer_timeout_secs: u64,
    /// Timeout for metadata-only probes, in seconds
    pub probe_timeout_secs: u64,
    /// Abort transfers whose size exceeds this many bytes, when set
    pub max_payload_bytes: Option<u64>,
    pub user_agent: String,
    /// Netscape-format cookie file passed opaquely to providers that
    /// support authenticated access. Absence is not an error.
    pub cookie_file: Option<PathBuf>,
    /// Base URL of the short-video resolution API
    pub short_video_api_base: String,
    /// Name or path of the external video extractor binary
    pub extractor_binary: String,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 15,
            transfer_timeout_secs: 300,
            probe_timeout_secs: 20,
            max_payload_bytes: Some(1024 * 1024 * 1024), // 1GB
            user_agent: network::get_user_agent().to_string(),
            cookie_file: Some(PathBuf::from("cookies.txt")),
            short_video_api_base: "https://www.tikwm.com/api/".to_string(),
            extractor_binary: "yt-dlp".to_string(),
        }
    }
}

impl FetcherConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn transfer_timeout(&self) -> Duration {
        Duration::from_secs(self.transfer_timeout_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    /// Load configuration from disk, or fall back to defaults when no file
    /// exists yet.
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;
        let config: FetcherConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", config_path))?;

        tracing::debug!("Loaded configuration from: {:?}", config_path);
        Ok(config)
    }

    /// Persist configuration to disk as pretty-printed JSON.
    pub fn save(&self) -> Result<()> {
        let config_path = Self::get_config_path()?;
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content =
            serde_json::to_string_pretty(self).with_context(|| "Failed to serialize config")?;
        std::fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;

        tracing::info!("Saved configuration to: {:?}", config_path);
        Ok(())
    }

    /// Get the path to the configuration file
    pub fn get_config_path() -> Result<PathBuf> {
        let project_dirs = ProjectDirs::from("com", "mediafetcher", "pro")
            .with_context(|| "Failed to get project directories")?;
        Ok(project_dirs.config_dir().join("config.json"))
    }

    /// Reject configurations that cannot drive a routing pass.
    pub fn validate(&self) -> Result<()> {
        if self.request_timeout_secs == 0 {
            anyhow::bail!("request_timeout_secs must be greater than 0");
        }
        if self.transfer_timeout_secs == 0 {
            anyhow::bail!("transfer_timeout_secs must be greater than 0");
        }
        if self.probe_timeout_secs == 0 {
            anyhow::bail!("probe_timeout_secs must be greater than 0");
        }
        if self.max_payload_bytes == Some(0) {
            anyhow::bail!("max_payload_bytes must be greater than 0 when set");
        }
        if self.user_agent.is_empty() {
            anyhow::bail!("user_agent must not be empty");
        }
        if self.short_video_api_base.is_empty() {
            anyhow::bail!("short_video_api_base must not be empty");
        }
        url::Url::parse(&self.short_video_api_base)
            .with_context(|| "short_video_api_base must be a valid URL")?;
        if self.extractor_binary.is_empty() {
            anyhow::bail!("extractor_binary must not be empty");
        }
        Ok(())
    }
}

/// Opaque authentication token set loaded once at process start and
/// immutable for the process lifetime.
#[derive(Debug, Clone)]
pub struct CredentialBlob {
    path: PathBuf,
    contents: Arc<Vec<u8>>,
}

impl CredentialBlob {
    /// Load the credential file at `path`. A missing file is not an error;
    /// providers degrade to unauthenticated behavior.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            tracing::warn!(
                "Cookie file {:?} not found, running unauthenticated",
                path
            );
            return Ok(None);
        }
        let contents = std::fs::read(path)
            .with_context(|| format!("Failed to read cookie file: {:?}", path))?;
        tracing::info!("Loaded credential blob from {:?} ({} bytes)", path, contents.len());
        Ok(Some(Self {
            path: path.to_path_buf(),
            contents: Arc::new(contents),
        }))
    }

    /// On-disk location, for providers that pass the file to an external
    /// process.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contents(&self) -> &[u8] {
        &self.contents
    }
}
