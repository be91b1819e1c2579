//! Remote drive storage backend
//!
//! Stores payloads through a Drive-style HTTP API. A put is three wire calls:
//! a multipart upload of metadata plus bytes, a permission grant that makes
//! the object publicly readable, and a metadata read that returns the share
//! link used as the locator. The object only counts as stored once all three
//! have succeeded.

use crate::traits::{ObjectStore, StorageError, StorageResult, StoredObject};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, StatusCode};
use sealdrop_core::{ObjectLocator, StorageBackend};
use std::time::Duration;
use uuid::Uuid;

const REQUEST_TIMEOUT_SECS: u64 = 60;

#[derive(serde::Deserialize)]
struct DriveFile {
    id: String,
}

#[derive(serde::Deserialize)]
struct DriveFileLink {
    #[serde(rename = "webViewLink")]
    web_view_link: Option<String>,
}

/// Remote drive storage implementation
#[derive(Clone)]
pub struct DriveStore {
    http: Client,
    api_base: String,
    folder_id: String,
    access_token: String,
}

impl std::fmt::Debug for DriveStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriveStore")
            .field("api_base", &self.api_base)
            .field("folder_id", &self.folder_id)
            .field("access_token", &"<redacted>")
            .finish()
    }
}

impl DriveStore {
    pub fn new(
        api_base: impl Into<String>,
        folder_id: impl Into<String>,
        access_token: impl Into<String>,
    ) -> StorageResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| StorageError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            folder_id: folder_id.into(),
            access_token: access_token.into(),
        })
    }

    /// Upload payload and metadata in a single `multipart/related` request.
    async fn upload_object(
        &self,
        file_name: &str,
        content_type: &str,
        data: &[u8],
    ) -> StorageResult<String> {
        let metadata = serde_json::json!({
            "name": file_name,
            "parents": [self.folder_id],
            "mimeType": content_type,
        });
        let (body, boundary) = multipart_related_body(&metadata, content_type, data);

        let url = format!(
            "{}/upload/drive/v3/files?uploadType=multipart&fields=id",
            self.api_base
        );
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.access_token)
            .header(
                "Content-Type",
                format!("multipart/related; boundary={}", boundary),
            )
            .body(body)
            .send()
            .await
            .map_err(|e| StorageError::Unreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(map_refusal(status, &error_text));
        }

        let file: DriveFile = response
            .json()
            .await
            .map_err(|e| StorageError::UploadFailed(format!("Invalid upload response: {}", e)))?;

        Ok(file.id)
    }

    /// Grant public read access to an uploaded object.
    async fn grant_public_visibility(&self, file_id: &str) -> StorageResult<()> {
        let url = format!("{}/drive/v3/files/{}/permissions", self.api_base, file_id);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&serde_json::json!({ "role": "reader", "type": "anyone" }))
            .send()
            .await
            .map_err(|e| StorageError::VisibilityNotGranted {
                key: file_id.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(StorageError::VisibilityNotGranted {
                key: file_id.to_string(),
                reason: format!("{}: {}", status, error_text),
            });
        }

        Ok(())
    }

    /// Fetch the public share link for an object.
    async fn fetch_share_link(&self, file_id: &str) -> StorageResult<ObjectLocator> {
        let url = format!(
            "{}/drive/v3/files/{}?fields=webViewLink",
            self.api_base, file_id
        );
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| StorageError::VisibilityNotGranted {
                key: file_id.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(StorageError::VisibilityNotGranted {
                key: file_id.to_string(),
                reason: format!("{}: {}", status, error_text),
            });
        }

        let link: DriveFileLink = response.json().await.map_err(|e| {
            StorageError::VisibilityNotGranted {
                key: file_id.to_string(),
                reason: format!("Invalid metadata response: {}", e),
            }
        })?;

        match link.web_view_link {
            Some(url) => Ok(ObjectLocator::new(url)),
            None => Err(StorageError::VisibilityNotGranted {
                key: file_id.to_string(),
                reason: "share link not present in metadata".to_string(),
            }),
        }
    }
}

#[async_trait]
impl ObjectStore for DriveStore {
    async fn put(
        &self,
        file_name: &str,
        content_type: &str,
        data: Bytes,
    ) -> StorageResult<StoredObject> {
        let size = data.len();
        let start = std::time::Instant::now();

        let file_id = self.upload_object(file_name, content_type, &data).await?;
        self.grant_public_visibility(&file_id).await?;
        let locator = self.fetch_share_link(&file_id).await?;

        tracing::info!(
            key = %file_id,
            file_name = %file_name,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Drive storage put successful"
        );

        Ok(StoredObject {
            key: file_id,
            locator,
        })
    }

    async fn get(&self, object_key: &str) -> StorageResult<Vec<u8>> {
        let url = format!("{}/drive/v3/files/{}?alt=media", self.api_base, object_key);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| StorageError::Unreachable(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(StorageError::NotFound(object_key.to_string()));
        }
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(StorageError::DownloadFailed(format!(
                "{}: {}",
                status, error_text
            )));
        }

        let data = response
            .bytes()
            .await
            .map_err(|e| StorageError::DownloadFailed(e.to_string()))?;

        Ok(data.to_vec())
    }

    async fn delete(&self, object_key: &str) -> StorageResult<()> {
        let url = format!("{}/drive/v3/files/{}", self.api_base, object_key);
        let response = self
            .http
            .delete(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| StorageError::Unreachable(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND || status.is_success() {
            return Ok(());
        }

        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(StorageError::DeleteFailed(format!(
            "{}: {}",
            status, error_text
        )))
    }

    async fn exists(&self, object_key: &str) -> StorageResult<bool> {
        let url = format!("{}/drive/v3/files/{}?fields=id", self.api_base, object_key);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| StorageError::Unreachable(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(StorageError::DownloadFailed(format!(
                "{}: {}",
                status, error_text
            )));
        }

        Ok(true)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Drive
    }
}

/// Map an upload refusal to the storage error taxonomy.
///
/// The drive reports quota exhaustion as 403 with a quota reason or as 429;
/// other 401/403 responses mean the token was rejected.
fn map_refusal(status: StatusCode, body: &str) -> StorageError {
    let lower = body.to_lowercase();
    match status {
        StatusCode::TOO_MANY_REQUESTS => StorageError::QuotaExceeded(body.to_string()),
        StatusCode::FORBIDDEN if lower.contains("quota") || lower.contains("ratelimit") => {
            StorageError::QuotaExceeded(body.to_string())
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            StorageError::InvalidCredentials(format!("{}: {}", status, body))
        }
        _ => StorageError::UploadFailed(format!("{}: {}", status, body)),
    }
}

/// Assemble a `multipart/related` body: a JSON metadata part followed by the
/// raw payload part. Returns the body and the boundary framing it.
///
/// The boundary is drawn fresh per request and re-drawn until it occurs in
/// neither part; the payload may contain any byte sequence, including text
/// shaped like a delimiter.
fn multipart_related_body(
    metadata: &serde_json::Value,
    content_type: &str,
    data: &[u8],
) -> (Vec<u8>, String) {
    let metadata_text = metadata.to_string();
    let boundary = loop {
        let candidate = format!("sealdrop-{}", Uuid::new_v4());
        if !metadata_text.contains(&candidate) && !contains(data, candidate.as_bytes()) {
            break candidate;
        }
    };

    let mut body = Vec::with_capacity(data.len() + 512);
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
    body.extend_from_slice(metadata_text.as_bytes());
    body.extend_from_slice(format!("\r\n--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
    (body, boundary)
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
        haystack[from..]
            .windows(needle.len())
            .position(|window| window == needle)
            .map(|pos| pos + from)
    }

    /// Extract the payload part the way a multipart consumer does: split on
    /// the delimiter line, skip the part headers, take everything up to the
    /// next delimiter.
    fn payload_part(body: &[u8], boundary: &str) -> Vec<u8> {
        let delimiter = format!("\r\n--{}", boundary).into_bytes();
        let first = find(body, &delimiter, 0).unwrap();
        let headers_end = find(body, b"\r\n\r\n", first + delimiter.len()).unwrap();
        let content_start = headers_end + 4;
        let content_end = find(body, &delimiter, content_start).unwrap();
        body[content_start..content_end].to_vec()
    }

    #[test]
    fn multipart_body_frames_both_parts() {
        let metadata = serde_json::json!({"name": "a.txt", "parents": ["folder"]});
        let (body, boundary) = multipart_related_body(&metadata, "text/plain", b"payload bytes");
        let text = String::from_utf8_lossy(&body);

        assert!(text.starts_with(&format!("--{}\r\n", boundary)));
        assert!(text.contains("Content-Type: application/json; charset=UTF-8"));
        assert!(text.contains("\"name\":\"a.txt\""));
        assert!(text.contains("Content-Type: text/plain"));
        assert!(text.contains("payload bytes"));
        assert!(text.ends_with(&format!("\r\n--{}--\r\n", boundary)));
    }

    #[test]
    fn multipart_body_keeps_binary_payloads_intact() {
        let metadata = serde_json::json!({"name": "bin"});
        let payload = [0u8, 159, 146, 150, 255];
        let (body, boundary) = multipart_related_body(&metadata, "application/octet-stream", &payload);

        assert_eq!(payload_part(&body, &boundary), payload);
    }

    #[test]
    fn boundary_is_drawn_per_request() {
        let metadata = serde_json::json!({"name": "a.bin"});
        let (_, first) = multipart_related_body(&metadata, "application/octet-stream", b"data");
        let (_, second) = multipart_related_body(&metadata, "application/octet-stream", b"data");

        assert!(first.starts_with("sealdrop-"));
        assert_ne!(first, second);
    }

    #[test]
    fn payload_embedding_a_known_boundary_is_framed_intact() {
        let metadata = serde_json::json!({"name": "tricky.bin"});
        let (_, known) = multipart_related_body(&metadata, "application/octet-stream", b"seed");

        // A payload that spells out a previously issued delimiter line must
        // reach the server byte for byte, not truncated at the lookalike.
        let mut payload = b"before".to_vec();
        payload.extend_from_slice(format!("\r\n--{}\r\n", known).as_bytes());
        payload.extend_from_slice(b"after-bytes-would-be-lost");

        let (body, boundary) =
            multipart_related_body(&metadata, "application/octet-stream", &payload);

        assert_ne!(boundary, known);
        assert!(!contains(&payload, boundary.as_bytes()));
        assert_eq!(payload_part(&body, &boundary), payload);
    }

    #[test]
    fn refusal_mapping_distinguishes_quota_from_credentials() {
        assert!(matches!(
            map_refusal(StatusCode::TOO_MANY_REQUESTS, "slow down"),
            StorageError::QuotaExceeded(_)
        ));
        assert!(matches!(
            map_refusal(StatusCode::FORBIDDEN, "storageQuotaExceeded for user"),
            StorageError::QuotaExceeded(_)
        ));
        assert!(matches!(
            map_refusal(StatusCode::FORBIDDEN, "insufficient permissions"),
            StorageError::InvalidCredentials(_)
        ));
        assert!(matches!(
            map_refusal(StatusCode::UNAUTHORIZED, "expired token"),
            StorageError::InvalidCredentials(_)
        ));
        assert!(matches!(
            map_refusal(StatusCode::INTERNAL_SERVER_ERROR, "boom"),
            StorageError::UploadFailed(_)
        ));
    }
}
