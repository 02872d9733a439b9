//! Result assembly
//!
//! Normalizes a successful [`RetrievedPayload`] into a [`MediaArtifact`]:
//! the suggested name goes through the sanitizer, the MIME type is resolved
//! from declared header → extension table → octet-stream, and the body is
//! collected under the configured size cap with cancellation observed
//! between chunks.

use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::core::error_handling::{ErrorKind, ErrorReport, FetchResult};
use crate::core::models::{MediaArtifact, PayloadBody, ProviderId, RetrievedPayload};
use crate::utils::file_utils::{get_file_extension, sanitize_filename};
use crate::utils::mime::{extension_for_mime, mime_from_extension, strip_mime_params, OCTET_STREAM};

/// Convert a payload into the normalized artifact contract.
pub async fn assemble(
    payload: RetrievedPayload,
    max_payload_bytes: Option<u64>,
    cancel: &CancellationToken,
) -> FetchResult<MediaArtifact> {
    let provider = payload.source_provider;

    // Declared-size guard fires before any byte is collected
    let declared_size = payload.size_bytes.or_else(|| payload.body.buffered_len());
    if let (Some(limit), Some(declared)) = (max_payload_bytes, declared_size) {
        if declared > limit {
            return Err(oversized(provider, declared, limit));
        }
    }

    let declared_mime = payload
        .declared_mime
        .as_deref()
        .map(strip_mime_params)
        .filter(|m| !m.is_empty() && m != OCTET_STREAM);

    let bytes = collect_body(payload.body, max_payload_bytes, cancel, provider).await?;
    let size_bytes = bytes.len() as u64;

    let mut filename = sanitize_filename(&payload.suggested_name);

    let mime_type = declared_mime
        .clone()
        .or_else(|| {
            get_file_extension(&filename)
                .and_then(mime_from_extension)
                .map(str::to_string)
        })
        .unwrap_or_else(|| OCTET_STREAM.to_string());

    // When the provider declared a concrete type, the filename extension
    // must agree with its MIME family
    if declared_mime.is_some() {
        filename = reconcile_extension(filename, &mime_type);
    }

    debug!(
        provider = %provider,
        filename = %filename,
        mime = %mime_type,
        size = size_bytes,
        "assembled artifact"
    );

    Ok(MediaArtifact {
        filename,
        mime_type,
        bytes,
        size_bytes,
    })
}

/// Collect a payload body into memory, enforcing the size cap per chunk and
/// observing cancellation between chunks.
pub async fn collect_body(
    body: PayloadBody,
    max_payload_bytes: Option<u64>,
    cancel: &CancellationToken,
    provider: ProviderId,
) -> FetchResult<Bytes> {
    match body {
        PayloadBody::Buffered(bytes) => {
            if let Some(limit) = max_payload_bytes {
                if bytes.len() as u64 > limit {
                    return Err(oversized(provider, bytes.len() as u64, limit));
                }
            }
            Ok(bytes)
        }
        PayloadBody::Streaming(mut stream) => {
            let mut collected = BytesMut::new();
            loop {
                let chunk = tokio::select! {
                    _ = cancel.cancelled() => {
                        return Err(cancelled(Some(provider)));
                    }
                    chunk = stream.next() => chunk,
                };
                let Some(chunk) = chunk else {
                    break;
                };
                let chunk = chunk?;
                collected.extend_from_slice(&chunk);
                if let Some(limit) = max_payload_bytes {
                    if collected.len() as u64 > limit {
                        return Err(oversized(provider, collected.len() as u64, limit));
                    }
                }
            }
            Ok(collected.freeze())
        }
    }
}

/// Report for a caller-initiated abort. `provider` is the strategy whose
/// transfer was interrupted, absent when no provider was invoked yet.
pub fn cancelled(provider: Option<ProviderId>) -> ErrorReport {
    ErrorReport::terminal(ErrorKind::Unknown, provider, "transfer cancelled by caller")
}

fn oversized(provider: ProviderId, size: u64, limit: u64) -> ErrorReport {
    ErrorReport::terminal(
        ErrorKind::Network,
        Some(provider),
        format!(
            "transfer aborted: payload of {} bytes exceeds the configured limit of {} bytes",
            size, limit
        ),
    )
}

/// Append the canonical extension for `mime_type` when the current one is
/// missing or belongs to a different MIME family.
fn reconcile_extension(filename: String, mime_type: &str) -> String {
    let Some(canonical_ext) = extension_for_mime(mime_type) else {
        return filename;
    };

    let family = mime_type.split('/').next().unwrap_or_default();
    let current_family = get_file_extension(&filename)
        .and_then(mime_from_extension)
        .and_then(|m| m.split('/').next());

    match current_family {
        Some(existing) if existing == family => filename,
        _ => {
            let renamed = format!("{}.{}", filename, canonical_ext);
            sanitize_filename(&renamed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;

    fn payload(name: &str, mime: Option<&str>, body: PayloadBody) -> RetrievedPayload {
        RetrievedPayload {
            source_provider: ProviderId::GenericHttp,
            suggested_name: name.to_string(),
            declared_mime: mime.map(str::to_string),
            size_bytes: None,
            body,
        }
    }

    #[tokio::test]
    async fn test_declared_mime_wins() {
        let p = payload(
            "clip.mp4",
            Some("video/webm; charset=binary"),
            PayloadBody::Buffered(Bytes::from_static(b"abc")),
        );
        let artifact = assemble(p, None, &CancellationToken::new()).await.unwrap();
        assert_eq!(artifact.mime_type, "video/webm");
    }

    #[tokio::test]
    async fn test_octet_stream_defers_to_extension_table() {
        let p = payload(
            "song.mp3",
            Some("application/octet-stream"),
            PayloadBody::Buffered(Bytes::from_static(b"abc")),
        );
        let artifact = assemble(p, None, &CancellationToken::new()).await.unwrap();
        assert_eq!(artifact.mime_type, "audio/mpeg");
    }

    #[tokio::test]
    async fn test_unknown_everything_falls_back_to_octet_stream() {
        let p = payload(
            "mystery.bin",
            None,
            PayloadBody::Buffered(Bytes::from_static(b"abc")),
        );
        let artifact = assemble(p, None, &CancellationToken::new()).await.unwrap();
        assert_eq!(artifact.mime_type, OCTET_STREAM);
    }

    #[tokio::test]
    async fn test_missing_extension_gets_appended() {
        let p = payload(
            "myvideo",
            Some("video/mp4"),
            PayloadBody::Buffered(Bytes::from_static(b"abc")),
        );
        let artifact = assemble(p, None, &CancellationToken::new()).await.unwrap();
        assert_eq!(artifact.filename, "myvideo.mp4");
    }

    #[tokio::test]
    async fn test_mismatched_family_extension_reconciled() {
        let p = payload(
            "photo.jpg",
            Some("video/mp4"),
            PayloadBody::Buffered(Bytes::from_static(b"abc")),
        );
        let artifact = assemble(p, None, &CancellationToken::new()).await.unwrap();
        assert!(artifact.filename.ends_with(".mp4"), "{}", artifact.filename);
    }

    #[tokio::test]
    async fn test_filename_is_sanitized() {
        let p = payload(
            "bad/name?.mp4",
            None,
            PayloadBody::Buffered(Bytes::from_static(b"abc")),
        );
        let artifact = assemble(p, None, &CancellationToken::new()).await.unwrap();
        assert_eq!(artifact.filename, "bad_name_.mp4");
    }

    #[tokio::test]
    async fn test_declared_size_guard_fires_before_collection() {
        let mut p = payload(
            "big.mp4",
            None,
            PayloadBody::Buffered(Bytes::from_static(b"abc")),
        );
        p.size_bytes = Some(10_000);
        let err = assemble(p, Some(100), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Network);
        assert!(!err.recoverable);
    }

    #[tokio::test]
    async fn test_streaming_collection_enforces_limit() {
        let chunks: Vec<FetchResult<Bytes>> = vec![
            Ok(Bytes::from(vec![0u8; 60])),
            Ok(Bytes::from(vec![0u8; 60])),
        ];
        let body = PayloadBody::Streaming(Box::pin(stream::iter(chunks)));
        let err = collect_body(body, Some(100), &CancellationToken::new(), ProviderId::GenericHttp)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Network);
    }

    #[tokio::test]
    async fn test_streaming_collection_succeeds_under_limit() {
        let chunks: Vec<FetchResult<Bytes>> = vec![
            Ok(Bytes::from_static(b"hello ")),
            Ok(Bytes::from_static(b"world")),
        ];
        let body = PayloadBody::Streaming(Box::pin(stream::iter(chunks)));
        let bytes = collect_body(body, Some(100), &CancellationToken::new(), ProviderId::GenericHttp)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"hello world");
    }

    #[tokio::test]
    async fn test_cancellation_interrupts_collection() {
        let body = PayloadBody::Streaming(Box::pin(stream::pending::<FetchResult<Bytes>>()));
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = collect_body(body, None, &cancel, ProviderId::GenericHttp)
            .await
            .unwrap_err();
        assert!(err.message.contains("cancelled"));
        // An interrupted transfer is attributed to its provider
        assert_eq!(err.provider, Some(ProviderId::GenericHttp));
    }

    #[tokio::test]
    async fn test_stream_error_propagates() {
        let chunks: Vec<FetchResult<Bytes>> = vec![
            Ok(Bytes::from_static(b"partial")),
            Err(ErrorReport::terminal(
                ErrorKind::Network,
                Some(ProviderId::GenericHttp),
                "connection reset",
            )),
        ];
        let body = PayloadBody::Streaming(Box::pin(stream::iter(chunks)));
        let err = collect_body(body, None, &CancellationToken::new(), ProviderId::GenericHttp)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Network);
        assert!(err.message.contains("connection reset"));
    }
}
