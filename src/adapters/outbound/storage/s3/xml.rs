//! XML bodies of the S3 calls the sweeper makes

use chrono::{DateTime, Utc};
use quick_xml::de::from_str;
use serde::{Deserialize, Serialize};

use crate::{
    adapters::outbound::storage::error::StoreError,
    domain::{
        models::{DeleteMarkerRecord, ListCursor, VersionPage, VersionRecord},
        value_objects::{BucketName, ObjectKey, VersionId},
    },
    ports::storage::{DeleteObjectError, DeleteObjectsOutcome, DeletedObject, ObjectIdentifier},
};

#[derive(Deserialize)]
struct ListAllMyBucketsResult {
    #[serde(rename = "Buckets", default)]
    buckets: BucketList,
}

#[derive(Deserialize, Default)]
struct BucketList {
    #[serde(rename = "Bucket", default)]
    bucket: Vec<BucketEntry>,
}

#[derive(Deserialize)]
struct BucketEntry {
    #[serde(rename = "Name")]
    name: String,
}

#[derive(Deserialize)]
struct ListVersionsResult {
    #[serde(rename = "IsTruncated", default)]
    is_truncated: bool,
    #[serde(rename = "NextKeyMarker", default)]
    next_key_marker: Option<String>,
    #[serde(rename = "NextVersionIdMarker", default)]
    next_version_id_marker: Option<String>,
    #[serde(rename = "Version", default)]
    versions: Vec<VersionEntry>,
    #[serde(rename = "DeleteMarker", default)]
    delete_markers: Vec<VersionEntry>,
}

#[derive(Deserialize)]
struct VersionEntry {
    #[serde(rename = "Key")]
    key: String,
    #[serde(rename = "VersionId")]
    version_id: String,
    #[serde(rename = "IsLatest", default)]
    is_latest: bool,
    #[serde(rename = "LastModified")]
    last_modified: String,
}

#[derive(Serialize)]
#[serde(rename = "Delete")]
struct DeleteRequest<'a> {
    #[serde(rename = "Quiet")]
    quiet: bool,
    #[serde(rename = "Object")]
    objects: Vec<DeleteEntry<'a>>,
}

#[derive(Serialize)]
struct DeleteEntry<'a> {
    #[serde(rename = "Key")]
    key: &'a str,
    #[serde(rename = "VersionId", skip_serializing_if = "Option::is_none")]
    version_id: Option<&'a str>,
}

#[derive(Deserialize)]
struct DeleteResult {
    #[serde(rename = "Deleted", default)]
    deleted: Vec<DeletedEntry>,
    #[serde(rename = "Error", default)]
    errors: Vec<DeleteErrorEntry>,
}

#[derive(Deserialize)]
struct DeletedEntry {
    #[serde(rename = "Key")]
    key: String,
    #[serde(rename = "VersionId", default)]
    version_id: Option<String>,
}

#[derive(Deserialize)]
struct DeleteErrorEntry {
    #[serde(rename = "Key")]
    key: String,
    #[serde(rename = "VersionId", default)]
    version_id: Option<String>,
    #[serde(rename = "Code", default)]
    code: String,
    #[serde(rename = "Message", default)]
    message: String,
}

/// Body of an S3 error response
#[derive(Debug, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    #[serde(rename = "Code")]
    pub code: String,
    #[serde(rename = "Message", default)]
    pub message: String,
}

/// Bucket names from a ListBuckets response. Names this crate cannot
/// address are skipped.
pub fn parse_bucket_list(body: &str) -> Result<Vec<BucketName>, StoreError> {
    let result: ListAllMyBucketsResult = from_str(body)?;
    Ok(result
        .buckets
        .bucket
        .into_iter()
        .filter_map(|b| BucketName::new(b.name).ok())
        .collect())
}

/// Parse a ListObjectVersions page requested with `encoding-type=url`.
/// `Key` and `NextKeyMarker` arrive percent-encoded.
pub fn parse_version_page(body: &str) -> Result<VersionPage, StoreError> {
    let result: ListVersionsResult = from_str(body)?;

    let versions = result
        .versions
        .into_iter()
        .map(version_record)
        .collect::<Result<Vec<_>, _>>()?;
    let delete_markers = result
        .delete_markers
        .into_iter()
        .map(delete_marker_record)
        .collect::<Result<Vec<_>, _>>()?;

    let next_cursor = if result.is_truncated {
        let key_marker = non_empty(result.next_key_marker).ok_or_else(|| {
            StoreError::MalformedResponse("truncated listing without NextKeyMarker".to_string())
        })?;
        Some(ListCursor {
            key_marker: decode_key(&key_marker)?,
            version_id_marker: non_empty(result.next_version_id_marker),
        })
    } else {
        None
    };

    Ok(VersionPage {
        versions,
        delete_markers,
        next_cursor,
    })
}

pub fn delete_request_body(objects: &[ObjectIdentifier], quiet: bool) -> Result<String, StoreError> {
    let request = DeleteRequest {
        quiet,
        objects: objects
            .iter()
            .map(|o| DeleteEntry {
                key: o.key.as_str(),
                version_id: o.version_id.as_ref().map(|v| v.as_str()),
            })
            .collect(),
    };
    quick_xml::se::to_string(&request)
        .map_err(|e| StoreError::Other(format!("Failed to encode delete request: {}", e)))
}

/// Parse a DeleteResult. The deserializer trims text content, so each
/// returned key is mapped back to the `submitted` identifier it names.
pub fn parse_delete_result(
    body: &str,
    submitted: &[ObjectIdentifier],
) -> Result<DeleteObjectsOutcome, StoreError> {
    let result: DeleteResult = from_str(body)?;

    let deleted = result
        .deleted
        .into_iter()
        .map(|entry| deleted_object(entry, submitted))
        .collect::<Result<Vec<_>, _>>()?;
    let errors = result
        .errors
        .into_iter()
        .map(|entry| delete_error(entry, submitted))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(DeleteObjectsOutcome { deleted, errors })
}

fn version_record(entry: VersionEntry) -> Result<VersionRecord, StoreError> {
    Ok(VersionRecord {
        key: ObjectKey::new(decode_key(&entry.key)?)?,
        version_id: VersionId::new(entry.version_id)?,
        is_latest: entry.is_latest,
        last_modified: parse_timestamp(&entry.last_modified)?,
    })
}

fn delete_marker_record(entry: VersionEntry) -> Result<DeleteMarkerRecord, StoreError> {
    Ok(DeleteMarkerRecord {
        key: ObjectKey::new(decode_key(&entry.key)?)?,
        version_id: VersionId::new(entry.version_id)?,
        is_latest: entry.is_latest,
        last_modified: parse_timestamp(&entry.last_modified)?,
    })
}

fn deleted_object(
    entry: DeletedEntry,
    submitted: &[ObjectIdentifier],
) -> Result<DeletedObject, StoreError> {
    let version_id = non_empty(entry.version_id).map(VersionId::new).transpose()?;
    Ok(DeletedObject {
        key: submitted_key(submitted, &entry.key, version_id.as_ref())?,
        version_id,
    })
}

fn delete_error(
    entry: DeleteErrorEntry,
    submitted: &[ObjectIdentifier],
) -> Result<DeleteObjectError, StoreError> {
    let version_id = non_empty(entry.version_id).map(VersionId::new).transpose()?;
    Ok(DeleteObjectError {
        key: submitted_key(submitted, &entry.key, version_id.as_ref())?,
        version_id,
        code: entry.code,
        message: entry.message,
    })
}

/// The submitted key a DeleteResult entry refers to. An exact match wins,
/// otherwise keys are compared with surrounding whitespace ignored.
fn submitted_key(
    submitted: &[ObjectIdentifier],
    key: &str,
    version_id: Option<&VersionId>,
) -> Result<ObjectKey, StoreError> {
    let same_version = |o: &&ObjectIdentifier| o.version_id.as_ref() == version_id;
    let found = submitted
        .iter()
        .filter(same_version)
        .find(|o| o.key.as_str() == key)
        .or_else(|| {
            submitted
                .iter()
                .filter(same_version)
                .find(|o| o.key.as_str().trim() == key.trim())
        });
    match found {
        Some(object) => Ok(object.key.clone()),
        None => Ok(ObjectKey::new(key)?),
    }
}

/// Undo the `encoding-type=url` encoding of a listed key. Spaces may arrive as `+`.
fn decode_key(value: &str) -> Result<String, StoreError> {
    urlencoding::decode(&value.replace('+', " "))
        .map(|decoded| decoded.into_owned())
        .map_err(|e| {
            StoreError::MalformedResponse(format!("Key '{}' is not valid UTF-8: {}", value, e))
        })
}

pub fn parse_error_body(body: &str) -> Option<ErrorBody> {
    from_str(body).ok()
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StoreError::InvalidTimestamp {
            value: value.to_string(),
            message: e.to_string(),
        })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const VERSIONS_PAGE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ListVersionsResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
  <Name>archive-bucket</Name>
  <Prefix></Prefix>
  <KeyMarker></KeyMarker>
  <VersionIdMarker></VersionIdMarker>
  <NextKeyMarker>b.txt</NextKeyMarker>
  <NextVersionIdMarker>3/L4kqtJlcpXroDTDmJ+rmSpXd3dIbrHY</NextVersionIdMarker>
  <MaxKeys>3</MaxKeys>
  <IsTruncated>true</IsTruncated>
  <Version>
    <Key>a.txt</Key>
    <VersionId>QUpfdndhfd8438MNFDN93jdnJFkdmqnh893</VersionId>
    <IsLatest>true</IsLatest>
    <LastModified>2024-06-14T12:00:00.000Z</LastModified>
    <ETag>"fba9dede5f27731c9771645a39863328"</ETag>
    <Size>434234</Size>
    <StorageClass>STANDARD</StorageClass>
  </Version>
  <DeleteMarker>
    <Key>b.txt</Key>
    <VersionId>null</VersionId>
    <IsLatest>true</IsLatest>
    <LastModified>2024-06-10T08:30:00.000Z</LastModified>
  </DeleteMarker>
  <Version>
    <Key>b.txt</Key>
    <VersionId>3/L4kqtJlcpXroDTDmJ+rmSpXd3dIbrHY</VersionId>
    <IsLatest>false</IsLatest>
    <LastModified>2024-06-01T00:00:00.000Z</LastModified>
    <ETag>"396fefef536d5ce46c7537ecf978a360"</ETag>
    <Size>217</Size>
  </Version>
</ListVersionsResult>"#;

    #[test]
    fn test_parse_interleaved_versions_and_markers() {
        let page = parse_version_page(VERSIONS_PAGE).unwrap();

        assert_eq!(page.versions.len(), 2);
        assert_eq!(page.delete_markers.len(), 1);
        assert!(page.versions[0].is_latest);
        assert!(!page.versions[1].is_latest);
        assert_eq!(page.delete_markers[0].version_id.as_str(), "null");
        assert_eq!(
            page.versions[1].last_modified,
            Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(
            page.next_cursor,
            Some(ListCursor {
                key_marker: "b.txt".to_string(),
                version_id_marker: Some("3/L4kqtJlcpXroDTDmJ+rmSpXd3dIbrHY".to_string()),
            })
        );
    }

    #[test]
    fn test_listed_keys_are_percent_decoded() {
        let body = r#"<ListVersionsResult>
  <EncodingType>url</EncodingType>
  <IsTruncated>true</IsTruncated>
  <NextKeyMarker>%20%20spaced%20key.txt%20</NextKeyMarker>
  <NextVersionIdMarker>v2</NextVersionIdMarker>
  <Version>
    <Key>%20%20spaced%20key.txt%20</Key><VersionId>v2</VersionId><IsLatest>false</IsLatest>
    <LastModified>2024-06-01T00:00:00.000Z</LastModified>
  </Version>
  <DeleteMarker>
    <Key>logs/a+b%2Bc%26d.txt</Key><VersionId>v1</VersionId><IsLatest>true</IsLatest>
    <LastModified>2024-06-01T00:00:00.000Z</LastModified>
  </DeleteMarker>
</ListVersionsResult>"#;
        let page = parse_version_page(body).unwrap();

        assert_eq!(page.versions[0].key.as_str(), "  spaced key.txt ");
        assert_eq!(page.delete_markers[0].key.as_str(), "logs/a b+c&d.txt");
        assert_eq!(
            page.next_cursor.unwrap().key_marker,
            "  spaced key.txt ".to_string()
        );
    }

    #[test]
    fn test_delete_result_keeps_submitted_keys() {
        let spaced = ObjectIdentifier {
            key: ObjectKey::new("  spaced key.txt ").unwrap(),
            version_id: Some(VersionId::new("v2").unwrap()),
        };
        let plain = ObjectIdentifier {
            key: ObjectKey::new("spaced key.txt").unwrap(),
            version_id: Some(VersionId::new("v3").unwrap()),
        };
        let request = delete_request_body(&[spaced.clone(), plain.clone()], false).unwrap();
        assert!(request.contains("<Key>  spaced key.txt </Key>"));

        let body = r#"<DeleteResult>
  <Deleted><Key>  spaced key.txt </Key><VersionId>v2</VersionId></Deleted>
  <Error><Key>spaced key.txt</Key><VersionId>v3</VersionId><Code>AccessDenied</Code><Message>Access Denied</Message></Error>
</DeleteResult>"#;
        let outcome = parse_delete_result(body, &[spaced.clone(), plain.clone()]).unwrap();

        assert_eq!(outcome.deleted[0].key, spaced.key);
        assert_eq!(outcome.errors[0].key, plain.key);
    }

    #[test]
    fn test_parse_last_page() {
        let body = r#"<ListVersionsResult>
  <IsTruncated>false</IsTruncated>
</ListVersionsResult>"#;
        let page = parse_version_page(body).unwrap();
        assert_eq!(page.entry_count(), 0);
        assert!(page.is_last());
    }

    #[test]
    fn test_bad_timestamp_is_rejected() {
        let body = r#"<ListVersionsResult>
  <IsTruncated>false</IsTruncated>
  <Version>
    <Key>a</Key><VersionId>v1</VersionId><IsLatest>true</IsLatest>
    <LastModified>not-a-date</LastModified>
  </Version>
</ListVersionsResult>"#;
        assert!(matches!(
            parse_version_page(body),
            Err(StoreError::InvalidTimestamp { .. })
        ));
    }

    #[test]
    fn test_delete_request_body() {
        let objects = vec![
            ObjectIdentifier {
                key: ObjectKey::new("logs/a&b.txt").unwrap(),
                version_id: Some(VersionId::new("v1").unwrap()),
            },
            ObjectIdentifier {
                key: ObjectKey::new("c.txt").unwrap(),
                version_id: None,
            },
        ];
        let body = delete_request_body(&objects, true).unwrap();

        assert!(body.starts_with("<Delete><Quiet>true</Quiet>"));
        assert!(body.contains("<Object><Key>logs/a&amp;b.txt</Key><VersionId>v1</VersionId></Object>"));
        assert!(body.contains("<Object><Key>c.txt</Key></Object>"));
        assert!(body.ends_with("</Delete>"));
    }

    #[test]
    fn test_parse_delete_result_with_errors() {
        let body = r#"<DeleteResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
  <Deleted><Key>a.txt</Key><VersionId>v1</VersionId></Deleted>
  <Error><Key>b.txt</Key><VersionId>v2</VersionId><Code>AccessDenied</Code><Message>Access Denied</Message></Error>
</DeleteResult>"#;
        let outcome = parse_delete_result(body, &[]).unwrap();

        assert_eq!(outcome.deleted.len(), 1);
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].code, "AccessDenied");
        assert_eq!(outcome.errors[0].version_id.as_ref().unwrap().as_str(), "v2");
    }

    #[test]
    fn test_parse_quiet_delete_result() {
        let outcome = parse_delete_result("<DeleteResult></DeleteResult>", &[]).unwrap();
        assert_eq!(outcome, DeleteObjectsOutcome::default());
    }

    #[test]
    fn test_parse_bucket_list() {
        let body = r#"<ListAllMyBucketsResult>
  <Owner><ID>abc</ID><DisplayName>owner</DisplayName></Owner>
  <Buckets>
    <Bucket><Name>archive-bucket</Name><CreationDate>2024-01-01T00:00:00.000Z</CreationDate></Bucket>
    <Bucket><Name>logs-bucket</Name><CreationDate>2024-01-01T00:00:00.000Z</CreationDate></Bucket>
  </Buckets>
</ListAllMyBucketsResult>"#;
        let buckets = parse_bucket_list(body).unwrap();
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].as_str(), "archive-bucket");
    }

    #[test]
    fn test_parse_error_body() {
        let body = r#"<Error><Code>NoSuchBucket</Code><Message>The specified bucket does not exist</Message><BucketName>gone</BucketName></Error>"#;
        assert_eq!(
            parse_error_body(body),
            Some(ErrorBody {
                code: "NoSuchBucket".to_string(),
                message: "The specified bucket does not exist".to_string(),
            })
        );
        assert_eq!(parse_error_body(""), None);
    }
}
