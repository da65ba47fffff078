use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Utc;
use reqwest::{Client, Method, Url};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use tracing::debug;

use super::signer::{authorization, canonical_query_string, sha256_hex, to_amz_date, Credentials};
use super::xml::{
    delete_request_body, parse_bucket_list, parse_delete_result, parse_error_body,
    parse_version_page,
};
use crate::{
    adapters::outbound::storage::error::StoreError,
    domain::{
        errors::{StorageError, StorageResult},
        models::{ListCursor, VersionPage, MAX_DELETE_BATCH},
        value_objects::BucketName,
    },
    ports::storage::{DeleteObjectsOutcome, ObjectIdentifier, VersionedBucketClient},
};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Connection settings for an S3-compatible endpoint
#[derive(Clone)]
pub struct S3Config {
    pub endpoint: String,
    pub region: String,
    pub access_key: String,
    pub secret_key: String,
    pub timeout: Duration,
}

impl S3Config {
    pub fn new(
        endpoint: impl Into<String>,
        region: impl Into<String>,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            region: region.into(),
            access_key: access_key.into(),
            secret_key: secret_key.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl fmt::Debug for S3Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Config")
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Versioned bucket client speaking the S3 REST API with path-style
/// addressing and Signature V4.
#[derive(Clone)]
pub struct S3VersionedClient {
    http: Client,
    base: Url,
    host: String,
    credentials: Credentials,
}

impl S3VersionedClient {
    pub fn new(config: S3Config) -> Result<Self, StoreError> {
        let invalid = |message: &str| StoreError::InvalidEndpoint {
            endpoint: config.endpoint.clone(),
            message: message.to_string(),
        };

        let base = Url::parse(&config.endpoint).map_err(|e| invalid(&e.to_string()))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(invalid("scheme must be http or https"));
        }
        let host = match (base.host_str(), base.port()) {
            (Some(host), Some(port)) => format!("{}:{}", host, port),
            (Some(host), None) => host.to_string(),
            (None, _) => return Err(invalid("missing host")),
        };

        let http = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            http,
            base,
            host,
            credentials: Credentials {
                access_key: config.access_key,
                secret_key: config.secret_key,
                region: config.region,
            },
        })
    }

    pub fn endpoint(&self) -> &str {
        self.base.as_str()
    }

    fn resource_path(&self, bucket: Option<&BucketName>) -> String {
        let root = self.base.path().trim_end_matches('/');
        match bucket {
            Some(bucket) => format!("{}/{}", root, bucket),
            None => format!("{}/", root),
        }
    }

    /// Sign and send a request, returning the status and body text
    async fn send(
        &self,
        method: Method,
        bucket: Option<&BucketName>,
        query: BTreeMap<String, String>,
        body: Vec<u8>,
    ) -> Result<(u16, String), StoreError> {
        let now = Utc::now();
        let path = self.resource_path(bucket);
        let payload_hash = sha256_hex(&body);

        let mut headers = BTreeMap::new();
        headers.insert("host".to_string(), self.host.clone());
        headers.insert("x-amz-content-sha256".to_string(), payload_hash.clone());
        headers.insert("x-amz-date".to_string(), to_amz_date(now));
        if !body.is_empty() {
            headers.insert(
                "content-md5".to_string(),
                STANDARD.encode(md5::compute(&body).0),
            );
            headers.insert("content-type".to_string(), "application/xml".to_string());
        }

        let auth = authorization(
            &self.credentials,
            method.as_str(),
            &path,
            &query,
            &headers,
            &payload_hash,
            now,
        )?;

        let mut url = self.base.clone();
        url.set_path(&path);
        let query_string = canonical_query_string(&query);
        url.set_query((!query_string.is_empty()).then_some(query_string.as_str()));

        debug!(method = %method, url = %url, "Sending S3 request");

        // reqwest derives Host from the URL
        let mut request = self.http.request(method, url).header("authorization", auth);
        for (name, value) in headers.iter().filter(|(name, _)| name.as_str() != "host") {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.body(body).send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;
        Ok((status, text))
    }
}

#[async_trait]
impl VersionedBucketClient for S3VersionedClient {
    async fn list_buckets(&self) -> StorageResult<Vec<BucketName>> {
        let (status, body) = self
            .send(Method::GET, None, BTreeMap::new(), Vec::new())
            .await?;
        if !is_success(status) {
            return Err(error_from_response(status, &body, "ListBuckets", None));
        }
        Ok(parse_bucket_list(&body)?)
    }

    async fn list_object_versions(
        &self,
        bucket: &BucketName,
        prefix: Option<&str>,
        cursor: Option<&ListCursor>,
    ) -> StorageResult<VersionPage> {
        let mut query = BTreeMap::new();
        query.insert("versions".to_string(), String::new());
        query.insert("encoding-type".to_string(), "url".to_string());
        if let Some(prefix) = prefix.filter(|p| !p.is_empty()) {
            query.insert("prefix".to_string(), prefix.to_string());
        }
        if let Some(cursor) = cursor {
            query.insert("key-marker".to_string(), cursor.key_marker.clone());
            if let Some(marker) = cursor.version_id_marker.as_ref() {
                query.insert("version-id-marker".to_string(), marker.clone());
            }
        }

        let (status, body) = self
            .send(Method::GET, Some(bucket), query, Vec::new())
            .await?;
        if !is_success(status) {
            return Err(error_from_response(
                status,
                &body,
                "ListObjectVersions",
                Some(bucket),
            ));
        }
        Ok(parse_version_page(&body)?)
    }

    async fn delete_objects(
        &self,
        bucket: &BucketName,
        objects: &[ObjectIdentifier],
        quiet: bool,
    ) -> StorageResult<DeleteObjectsOutcome> {
        if objects.is_empty() || objects.len() > MAX_DELETE_BATCH {
            return Err(StorageError::InvalidRequest {
                message: format!(
                    "delete request must carry 1 to {} objects, got {}",
                    MAX_DELETE_BATCH,
                    objects.len()
                ),
            });
        }

        let body = delete_request_body(objects, quiet)?;
        let mut query = BTreeMap::new();
        query.insert("delete".to_string(), String::new());

        let (status, response) = self
            .send(Method::POST, Some(bucket), query, body.into_bytes())
            .await?;
        if !is_success(status) {
            return Err(error_from_response(
                status,
                &response,
                "DeleteObjects",
                Some(bucket),
            ));
        }
        Ok(parse_delete_result(&response, objects)?)
    }
}

fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

/// Map an S3 error response to a storage error
fn error_from_response(
    status: u16,
    body: &str,
    operation: &str,
    bucket: Option<&BucketName>,
) -> StorageError {
    let bucket_name = || bucket.map(|b| b.to_string()).unwrap_or_default();

    match parse_error_body(body) {
        Some(err) => match err.code.as_str() {
            "InvalidAccessKeyId" | "SignatureDoesNotMatch" | "InvalidToken" | "ExpiredToken" => {
                StorageError::AuthenticationFailed {
                    message: err.message,
                }
            }
            "AccessDenied" | "AllAccessDisabled" => StorageError::AccessDenied {
                operation: operation.to_string(),
                message: err.message,
            },
            "NoSuchBucket" => StorageError::BucketNotFound {
                bucket: bucket_name(),
            },
            _ => StorageError::Backend {
                status,
                code: err.code,
                message: err.message,
            },
        },
        None => match status {
            401 => StorageError::AuthenticationFailed {
                message: format!("HTTP {} from {}", status, operation),
            },
            403 => StorageError::AccessDenied {
                operation: operation.to_string(),
                message: format!("HTTP {}", status),
            },
            404 if bucket.is_some() => StorageError::BucketNotFound {
                bucket: bucket_name(),
            },
            _ => StorageError::Backend {
                status,
                code: String::new(),
                message: body.chars().take(256).collect(),
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::{ObjectKey, VersionId};

    fn config(endpoint: &str) -> S3Config {
        S3Config::new(endpoint, "ap-southeast-1", "AKIDEXAMPLE", "secret")
    }

    #[test]
    fn test_endpoint_with_port_keeps_port_in_host() {
        let client = S3VersionedClient::new(config("http://localhost:9000")).unwrap();
        assert_eq!(client.host, "localhost:9000");
        assert_eq!(client.resource_path(None), "/");

        let bucket = BucketName::new("archive-bucket").unwrap();
        assert_eq!(client.resource_path(Some(&bucket)), "/archive-bucket");
    }

    #[test]
    fn test_default_endpoint_trailing_slash() {
        let client =
            S3VersionedClient::new(config("https://s3.ap-southeast-1.wasabisys.com/")).unwrap();
        assert_eq!(client.host, "s3.ap-southeast-1.wasabisys.com");
        let bucket = BucketName::new("archive-bucket").unwrap();
        assert_eq!(client.resource_path(Some(&bucket)), "/archive-bucket");
    }

    #[test]
    fn test_rejects_bad_endpoints() {
        assert!(matches!(
            S3VersionedClient::new(config("not a url")),
            Err(StoreError::InvalidEndpoint { .. })
        ));
        assert!(matches!(
            S3VersionedClient::new(config("ftp://files.example.com")),
            Err(StoreError::InvalidEndpoint { .. })
        ));
    }

    #[test]
    fn test_config_debug_redacts_secret() {
        let rendered = format!("{:?}", config("http://localhost:9000"));
        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains("\"secret\""));
    }

    #[test]
    fn test_error_codes_map_to_storage_errors() {
        let bucket = BucketName::new("archive-bucket").unwrap();
        let body = |code: &str| format!("<Error><Code>{}</Code><Message>m</Message></Error>", code);

        assert!(matches!(
            error_from_response(403, &body("InvalidAccessKeyId"), "ListBuckets", None),
            StorageError::AuthenticationFailed { .. }
        ));
        assert!(matches!(
            error_from_response(403, &body("SignatureDoesNotMatch"), "ListBuckets", None),
            StorageError::AuthenticationFailed { .. }
        ));
        assert!(matches!(
            error_from_response(403, &body("AccessDenied"), "DeleteObjects", Some(&bucket)),
            StorageError::AccessDenied { .. }
        ));
        assert_eq!(
            error_from_response(404, &body("NoSuchBucket"), "ListObjectVersions", Some(&bucket)),
            StorageError::BucketNotFound {
                bucket: "archive-bucket".to_string()
            }
        );
        assert!(matches!(
            error_from_response(503, &body("SlowDown"), "ListObjectVersions", Some(&bucket)),
            StorageError::Backend { status: 503, .. }
        ));
    }

    #[test]
    fn test_error_without_body_uses_status() {
        assert!(matches!(
            error_from_response(403, "", "ListBuckets", None),
            StorageError::AccessDenied { .. }
        ));
        assert!(matches!(
            error_from_response(500, "", "ListBuckets", None),
            StorageError::Backend { status: 500, .. }
        ));
    }

    #[tokio::test]
    async fn test_empty_delete_is_rejected_before_sending() {
        let client = S3VersionedClient::new(config("http://127.0.0.1:1")).unwrap();
        let bucket = BucketName::new("archive-bucket").unwrap();
        let err = client.delete_objects(&bucket, &[], true).await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidRequest { .. }));
    }

    #[tokio::test]
    async fn test_oversized_delete_is_rejected_before_sending() {
        let client = S3VersionedClient::new(config("http://127.0.0.1:1")).unwrap();
        let bucket = BucketName::new("archive-bucket").unwrap();
        let objects: Vec<ObjectIdentifier> = (0..=MAX_DELETE_BATCH)
            .map(|i| ObjectIdentifier {
                key: ObjectKey::new(format!("obj-{}", i)).unwrap(),
                version_id: Some(VersionId::new(format!("v{}", i)).unwrap()),
            })
            .collect();
        assert_eq!(objects.len(), 1001);

        let err = client.delete_objects(&bucket, &objects, true).await.unwrap_err();
        match err {
            StorageError::InvalidRequest { message } => assert!(message.contains("got 1001")),
            other => panic!("expected InvalidRequest, got {:?}", other),
        }
    }
}
