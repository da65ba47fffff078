//! AWS Signature Version 4 request signing

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

use crate::adapters::outbound::storage::error::StoreError;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";
const SERVICE: &str = "s3";

/// Credentials and region a request is signed for
#[derive(Clone)]
pub struct Credentials {
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
}

/// Hex encoded SHA256 of `data`
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

pub fn to_signer_date(time: DateTime<Utc>) -> String {
    time.format("%Y%m%d").to_string()
}

pub fn to_amz_date(time: DateTime<Utc>) -> String {
    time.format("%Y%m%dT%H%M%SZ").to_string()
}

fn hmac_hash(key: &[u8], data: &[u8]) -> Result<Vec<u8>, StoreError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(key)
        .map_err(|e| StoreError::Other(format!("HMAC key rejected: {}", e)))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

fn scope(date: DateTime<Utc>, region: &str) -> String {
    format!("{}/{}/{}/aws4_request", to_signer_date(date), region, SERVICE)
}

/// Sorted, percent-encoded query string; also used verbatim as the request query
pub fn canonical_query_string(params: &BTreeMap<String, String>) -> String {
    params
        .iter()
        .map(|(key, value)| format!("{}={}", urlencoding::encode(key), urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Returns (signed headers, canonical headers) for lowercase header names
fn canonical_headers(headers: &BTreeMap<String, String>) -> (String, String) {
    let signed = headers.keys().cloned().collect::<Vec<_>>().join(";");
    let canonical = headers
        .iter()
        .map(|(key, value)| {
            let value = value.split_whitespace().collect::<Vec<_>>().join(" ");
            format!("{}:{}", key, value)
        })
        .collect::<Vec<_>>()
        .join("\n");
    (signed, canonical)
}

pub fn signing_key(
    secret_key: &str,
    date: DateTime<Utc>,
    region: &str,
    service: &str,
) -> Result<Vec<u8>, StoreError> {
    let date_key = hmac_hash(
        format!("AWS4{}", secret_key).as_bytes(),
        to_signer_date(date).as_bytes(),
    )?;
    let region_key = hmac_hash(&date_key, region.as_bytes())?;
    let service_key = hmac_hash(&region_key, service.as_bytes())?;
    hmac_hash(&service_key, b"aws4_request")
}

/// Returns the Authorization header value for a request.
///
/// `headers` must hold every header to sign, keyed by lowercase name,
/// including `host`, `x-amz-date` and `x-amz-content-sha256`.
pub fn authorization(
    credentials: &Credentials,
    method: &str,
    uri: &str,
    query: &BTreeMap<String, String>,
    headers: &BTreeMap<String, String>,
    content_sha256: &str,
    date: DateTime<Utc>,
) -> Result<String, StoreError> {
    let (signed_headers, canonical_headers) = canonical_headers(headers);
    let canonical_request = format!(
        "{}\n{}\n{}\n{}\n\n{}\n{}",
        method,
        uri,
        canonical_query_string(query),
        canonical_headers,
        signed_headers,
        content_sha256
    );

    let scope = scope(date, &credentials.region);
    let string_to_sign = format!(
        "{}\n{}\n{}\n{}",
        ALGORITHM,
        to_amz_date(date),
        scope,
        sha256_hex(canonical_request.as_bytes())
    );

    let key = signing_key(&credentials.secret_key, date, &credentials.region, SERVICE)?;
    let signature = hex::encode(hmac_hash(&key, string_to_sign.as_bytes())?);

    Ok(format!(
        "{} Credential={}/{}, SignedHeaders={}, Signature={}",
        ALGORITHM, credentials.access_key, scope, signed_headers, signature
    ))
}
