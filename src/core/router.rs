//! Fallback orchestrator
//!
//! Drives the candidate list produced by the classifier: providers are
//! invoked strictly one at a time, a recoverable failure advances to the
//! next candidate, a terminal failure (or an exhausted list) surfaces the
//! final cause unchanged. Provider calls are often rate-limited or consume
//! one-time resolved URLs, so there is no speculative parallel attempt.

use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use url::Url;
use uuid::Uuid;

use crate::core::assembler;
use crate::core::classifier;
use crate::core::config::{CredentialBlob, FetcherConfig};
use crate::core::error_handling::{ErrorKind, ErrorReport, FetchResult};
use crate::core::models::{MediaArtifact, MediaRequest, ProbeInfo, ProviderId};
use crate::providers::{self, FetchContext, Provider};

/// Routes one media request through the provider candidates.
///
/// Construction loads the optional credential blob exactly once; it is
/// read-only for the router's lifetime and handed opaquely to providers
/// that accept one.
pub struct MediaRouter {
    providers: HashMap<ProviderId, Arc<dyn Provider>>,
    config: Arc<FetcherConfig>,
    credential: Option<CredentialBlob>,
}

impl MediaRouter {
    /// Build a router with the default provider set.
    pub fn new(config: FetcherConfig) -> anyhow::Result<Self> {
        config.validate()?;
        let providers = providers::default_provider_set(&config)?;
        Self::with_providers(config, providers)
    }

    /// Build a router over an explicit provider set.
    pub fn with_providers(
        config: FetcherConfig,
        providers: HashMap<ProviderId, Arc<dyn Provider>>,
    ) -> anyhow::Result<Self> {
        let credential = match &config.cookie_file {
            Some(path) => CredentialBlob::load(path)?,
            None => None,
        };
        Ok(Self {
            providers,
            config: Arc::new(config),
            credential,
        })
    }

    fn context(&self, cancel: &CancellationToken, request_id: Uuid) -> FetchContext {
        FetchContext {
            config: Arc::clone(&self.config),
            credential: self.credential.clone(),
            cancel: cancel.clone(),
            request_id,
        }
    }

    /// Route a request to a [`MediaArtifact`], falling back across
    /// candidates on recoverable failures.
    pub async fn route(
        &self,
        request: &MediaRequest,
        cancel: &CancellationToken,
    ) -> FetchResult<MediaArtifact> {
        let request_id = Uuid::new_v4();

        let candidates = classifier::classify_str(&request.raw_url)?;
        let url = parse_validated_url(&request.raw_url)?;

        info!(
            %request_id,
            url = %url,
            candidates = ?candidates.iter().map(|c| c.provider).collect::<Vec<_>>(),
            "routing media request"
        );

        let cx = self.context(cancel, request_id);
        let total = candidates.len();
        let mut last_report: Option<ErrorReport> = None;

        for (index, candidate) in candidates.iter().enumerate() {
            if cancel.is_cancelled() {
                // No provider was invoked for this abort
                return Err(assembler::cancelled(None));
            }

            let provider = self.provider(candidate.provider)?;
            if let Some(host) = url.host_str() {
                if !provider.handles_host(host) {
                    // Registry and classifier disagree; attempt anyway
                    warn!(
                        %request_id,
                        provider = %candidate.provider,
                        host = %host,
                        "provider does not claim this host"
                    );
                }
            }
            info!(
                %request_id,
                provider = %candidate.provider,
                attempt = index + 1,
                of = total,
                "attempting provider"
            );

            match provider.fetch(&url, &cx).await {
                Ok(payload) => {
                    info!(
                        %request_id,
                        provider = %candidate.provider,
                        "provider succeeded, assembling artifact"
                    );
                    return assembler::assemble(payload, self.config.max_payload_bytes, cancel)
                        .await;
                }
                Err(report) => {
                    if report.recoverable && index + 1 < total {
                        warn!(
                            %request_id,
                            provider = %candidate.provider,
                            kind = %report.kind,
                            "recoverable failure, falling back to next candidate: {}",
                            report.message
                        );
                        last_report = Some(report);
                        continue;
                    }
                    error!(
                        %request_id,
                        provider = %candidate.provider,
                        kind = %report.kind,
                        recoverable = report.recoverable,
                        "terminal failure: {}",
                        report.message
                    );
                    return Err(report);
                }
            }
        }

        // The classifier always emits at least one candidate, so this is
        // only reachable with an empty explicit provider map
        Err(last_report.unwrap_or_else(|| {
            ErrorReport::terminal(ErrorKind::Unknown, None, "no provider candidates attempted")
        }))
    }

    /// Pre-flight size/name estimate from the primary candidate. Never
    /// fails: probe errors degrade to unknown values.
    pub async fn probe(&self, request: &MediaRequest, cancel: &CancellationToken) -> ProbeInfo {
        let request_id = Uuid::new_v4();
        let Ok(candidates) = classifier::classify_str(&request.raw_url) else {
            return ProbeInfo::unknown();
        };
        let Ok(url) = parse_validated_url(&request.raw_url) else {
            return ProbeInfo::unknown();
        };
        let Some(primary) = candidates.first() else {
            return ProbeInfo::unknown();
        };
        let Ok(provider) = self.provider(primary.provider) else {
            return ProbeInfo::unknown();
        };

        let cx = self.context(cancel, request_id);
        match provider.probe(&url, &cx).await {
            Ok(info) => info,
            Err(report) => {
                warn!(
                    %request_id,
                    provider = %primary.provider,
                    "probe failed, size unknown: {}",
                    report.message
                );
                ProbeInfo::unknown()
            }
        }
    }

    fn provider(&self, id: ProviderId) -> FetchResult<&Arc<dyn Provider>> {
        self.providers.get(&id).ok_or_else(|| {
            ErrorReport::terminal(
                ErrorKind::Unknown,
                Some(id),
                format!("provider {} is not registered", id),
            )
        })
    }

    pub fn config(&self) -> &FetcherConfig {
        &self.config
    }

    pub fn has_credential(&self) -> bool {
        self.credential.is_some()
    }
}

fn parse_validated_url(raw_url: &str) -> FetchResult<Url> {
    Url::parse(raw_url.trim())
        .map_err(|e| ErrorReport::invalid_url(format!("not an absolute URL: {}", e)))
}
