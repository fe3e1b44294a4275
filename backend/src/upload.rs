//! Upload pipeline policy
//!
//! Size and content-type rules for the two-part upload, and the capped
//! body stream that enforces the byte ceiling against the actual bytes
//! rather than the declared Content-Length.

use std::str::FromStr;

use axum::body::Body;
use futures::{future, StreamExt};

use crate::asset_keys::AssetKeys;
use crate::blob_store::{BlobStoreError, BodyStream};

/// Hard ceiling on a single uploaded file: 120 MiB
pub const MAX_FILE_SIZE_BYTES: u64 = 120 * 1024 * 1024;

/// Content types accepted for an original upload
///
/// Thumbnails are not type-restricted; they are client-produced previews.
pub const ALLOWED_ORIGINAL_CONTENT_TYPES: [&str; 8] = [
    "image/jpeg",
    "image/png",
    "image/webp",
    "image/gif",
    "video/mp4",
    "video/webm",
    "audio/mpeg",
    "audio/wav",
];

/// Fallback content type recorded for thumbnails uploaded without one
pub const DEFAULT_THUMB_CONTENT_TYPE: &str = "application/octet-stream";

/// Whether a declared content type is acceptable for an original upload
///
/// Parameters (`; charset=...`) are ignored; the media type itself is
/// compared case-insensitively.
#[must_use]
pub fn is_allowed_original_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    ALLOWED_ORIGINAL_CONTENT_TYPES.contains(&essence.as_str())
}

/// Which of the two per-asset objects an upload targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    /// The as-uploaded file
    Original,
    /// The derived preview
    Thumb,
}

impl UploadKind {
    /// The path segment naming this kind
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Original => "original",
            Self::Thumb => "thumb",
        }
    }

    /// Picks this kind's key out of a derived pair
    #[must_use]
    pub fn key(self, keys: &AssetKeys) -> &str {
        match self {
            Self::Original => &keys.original_key,
            Self::Thumb => &keys.thumb_key,
        }
    }
}

impl FromStr for UploadKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "original" => Ok(Self::Original),
            "thumb" => Ok(Self::Thumb),
            _ => Err(()),
        }
    }
}

/// Wraps a request body in a byte-counting stream capped at `limit`
///
/// The stream yields `BodyTooLarge` and then ends as soon as the running
/// total passes the ceiling, however the chunks are sized, so a lying
/// Content-Length header cannot bypass the true limit. Consumers abort
/// their write on the first error.
#[must_use]
pub fn capped_body_stream(body: Body, limit: u64) -> BodyStream {
    Box::pin(
        body.into_data_stream()
            .scan((0_u64, false), move |(total, done), chunk| {
                if *done {
                    return future::ready(None);
                }
                let item = match chunk {
                    Ok(bytes) => {
                        *total += bytes.len() as u64;
                        if *total > limit {
                            *done = true;
                            Err(BlobStoreError::BodyTooLarge(limit))
                        } else {
                            Ok(bytes)
                        }
                    }
                    Err(e) => {
                        *done = true;
                        Err(BlobStoreError::BodyRead(e.to_string()))
                    }
                };
                future::ready(Some(item))
            }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn chunked_body(chunks: Vec<&'static [u8]>) -> Body {
        Body::from_stream(futures::stream::iter(
            chunks
                .into_iter()
                .map(|c| Ok::<_, std::io::Error>(Bytes::from_static(c))),
        ))
    }

    #[test]
    fn allow_list_covers_media_types_only() {
        assert!(is_allowed_original_type("image/jpeg"));
        assert!(is_allowed_original_type("VIDEO/MP4"));
        assert!(is_allowed_original_type("audio/wav; some=param"));
        assert!(!is_allowed_original_type("application/octet-stream"));
        assert!(!is_allowed_original_type("image/svg+xml"));
        assert!(!is_allowed_original_type(""));
    }

    #[test]
    fn upload_kind_parses_path_segment() {
        assert_eq!("original".parse(), Ok(UploadKind::Original));
        assert_eq!("thumb".parse(), Ok(UploadKind::Thumb));
        assert!("Original".parse::<UploadKind>().is_err());
        assert!("thumbnail".parse::<UploadKind>().is_err());
    }

    #[tokio::test]
    async fn stream_under_limit_passes_through() {
        let body = chunked_body(vec![b"hello ", b"world"]);
        let chunks: Vec<_> = capped_body_stream(body, 64).collect().await;

        let total: usize = chunks.iter().map(|c| c.as_ref().unwrap().len()).sum();
        assert_eq!(total, 11);
    }

    #[tokio::test]
    async fn stream_over_limit_errors_and_ends() {
        let body = chunked_body(vec![b"aaaa", b"bbbb", b"cccc"]);
        let chunks: Vec<_> = capped_body_stream(body, 6).collect().await;

        // First chunk passes, second trips the ceiling, nothing follows
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].is_ok());
        assert!(matches!(
            chunks[1].as_ref().unwrap_err(),
            BlobStoreError::BodyTooLarge(6)
        ));
    }

    #[tokio::test]
    async fn exact_limit_is_allowed() {
        let body = chunked_body(vec![b"aaaa", b"bb"]);
        let chunks: Vec<_> = capped_body_stream(body, 6).collect().await;
        assert!(chunks.iter().all(Result::is_ok));
    }
}
