//! Media Fetcher Pro - Core Library
//!
//! This library provides the core functionality for the media fetcher,
//! including URL classification, provider fallback routing and result
//! assembly.

pub mod core;
pub mod providers;
pub mod utils;

// Re-export commonly used types
pub use crate::core::{
    classifier,
    config::{CredentialBlob, FetcherConfig},
    error_handling::{ErrorKind, ErrorReport, FetchResult},
    models::{MediaArtifact, MediaRequest, ProbeInfo, ProviderCandidate, ProviderId},
    router::MediaRouter,
};

pub use providers::{FetchContext, Provider};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Initialize the library with default settings
pub fn init() -> anyhow::Result<()> {
    utils::logging::init_tracing();
    tracing::info!("📚 {} v{} initialized", NAME, VERSION);
    Ok(())
}
