use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{StatusCode, Url};

use super::{check_key, BlobStore};
use crate::error::StorageError;

/// Retry settings for transient HTTP failures.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_backoff_ms: 120,
        }
    }
}

/// S3-compatible object store over path-style HTTP.
///
/// Objects live at `{endpoint}/{bucket}/{key}`; uploads are `PUT`, reads are
/// `GET`. This is what LocalStack and most S3 gateways accept for
/// unauthenticated or bearer-authenticated buckets.
#[derive(Debug, Clone)]
pub struct HttpBlobStore {
    endpoint: Url,
    auth_bearer: Option<String>,
    retry: RetryPolicy,
    client: reqwest::Client,
}

impl HttpBlobStore {
    pub fn new(
        endpoint: &str,
        auth_bearer: Option<String>,
        retry: RetryPolicy,
    ) -> Result<Self, StorageError> {
        let endpoint = Url::parse(endpoint.trim_end_matches('/')).map_err(|e| {
            StorageError::Http {
                url: endpoint.to_string(),
                message: format!("invalid endpoint: {e}"),
            }
        })?;
        if endpoint.cannot_be_a_base() {
            return Err(StorageError::Http {
                url: endpoint.to_string(),
                message: "endpoint cannot be used as a base url".to_string(),
            });
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| StorageError::Http {
                url: endpoint.to_string(),
                message: format!("failed to build client: {e}"),
            })?;
        Ok(Self {
            endpoint,
            auth_bearer: auth_bearer.filter(|t| !t.is_empty()),
            retry,
            client,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn object_url(&self, bucket: &str, key: &str) -> Result<Url, StorageError> {
        check_key(bucket)?;
        check_key(key)?;
        let mut url = self.endpoint.clone();
        {
            let Ok(mut segments) = url.path_segments_mut() else {
                return Err(StorageError::Http {
                    url: self.endpoint.to_string(),
                    message: "endpoint cannot be used as a base url".to_string(),
                });
            };
            segments.pop_if_empty().push(bucket);
            for part in key.split('/').filter(|p| !p.is_empty()) {
                segments.push(part);
            }
        }
        Ok(url)
    }

    fn auth_headers(&self) -> Result<HeaderMap, StorageError> {
        let mut headers = HeaderMap::new();
        if let Some(token) = &self.auth_bearer {
            let value =
                HeaderValue::from_str(&format!("Bearer {token}")).map_err(|e| {
                    StorageError::Http {
                        url: self.endpoint.to_string(),
                        message: format!("invalid auth header: {e}"),
                    }
                })?;
            headers.insert(AUTHORIZATION, value);
        }
        Ok(headers)
    }

    async fn backoff(&self, attempt: u32) {
        tokio::time::sleep(Duration::from_millis(
            self.retry.base_backoff_ms.saturating_mul(u64::from(attempt)),
        ))
        .await;
    }
}

fn http_error(url: &Url, message: impl Into<String>) -> StorageError {
    StorageError::Http {
        url: url.to_string(),
        message: message.into(),
    }
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    fn name(&self) -> &'static str {
        "http_s3"
    }

    async fn upload(&self, data: Bytes, bucket: &str, key: &str) -> Result<String, StorageError> {
        let url = self.object_url(bucket, key)?;
        let mut headers = self.auth_headers()?;
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/octet-stream"),
        );
        log::info!("Uploading {} bytes to {url}", data.len());

        let mut attempt = 0;
        loop {
            attempt += 1;
            let request = self
                .client
                .put(url.clone())
                .headers(headers.clone())
                .body(data.clone());
            match request.send().await {
                Ok(resp) if resp.status().is_success() => {
                    log::info!("Upload successful: {bucket}/{key}");
                    return Ok(key.to_string());
                }
                Ok(resp) => {
                    let status = resp.status();
                    if attempt >= self.retry.max_attempts || status.is_client_error() {
                        return Err(http_error(&url, format!("upload failed status={status}")));
                    }
                    log::warn!("Upload to {url} returned {status} (attempt {attempt})");
                }
                Err(e) => {
                    if attempt >= self.retry.max_attempts {
                        return Err(http_error(&url, format!("upload failed: {e}")));
                    }
                    log::warn!("Upload to {url} failed (attempt {attempt}): {e}");
                }
            }
            self.backoff(attempt).await;
        }
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Bytes, StorageError> {
        let url = self.object_url(bucket, key)?;
        let headers = self.auth_headers()?;

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.client.get(url.clone()).headers(headers.clone()).send().await {
                Ok(resp) if resp.status().is_success() => {
                    return resp
                        .bytes()
                        .await
                        .map_err(|e| http_error(&url, format!("read body failed: {e}")));
                }
                Ok(resp) if resp.status() == StatusCode::NOT_FOUND => {
                    return Err(StorageError::NotFound {
                        bucket: bucket.to_string(),
                        key: key.to_string(),
                    });
                }
                Ok(resp) => {
                    let status = resp.status();
                    if attempt >= self.retry.max_attempts || status.is_client_error() {
                        return Err(http_error(&url, format!("download failed status={status}")));
                    }
                    log::warn!("Download from {url} returned {status} (attempt {attempt})");
                }
                Err(e) => {
                    if attempt >= self.retry.max_attempts {
                        return Err(http_error(&url, format!("download failed: {e}")));
                    }
                    log::warn!("Download from {url} failed (attempt {attempt}): {e}");
                }
            }
            self.backoff(attempt).await;
        }
    }
}
