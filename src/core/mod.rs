//! Core business logic module
//!
//! This module contains the domain models, the URL classifier, the fallback
//! router and the result assembler.

pub mod assembler;
pub mod classifier;
pub mod config;
pub mod error_handling;
pub mod models;
pub mod router;

#[cfg(test)]
mod router_integration_tests;

// Re-export commonly used types
pub use config::{CredentialBlob, FetcherConfig};
pub use error_handling::{ErrorKind, ErrorReport, FetchResult};
pub use models::{MediaArtifact, MediaRequest, ProviderCandidate, ProviderId};
pub use router::MediaRouter;
