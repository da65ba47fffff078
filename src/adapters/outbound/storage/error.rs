use crate::domain::errors::{StorageError, ValidationError};
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum StoreError {
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::DeError),

    #[error("Invalid timestamp '{value}': {message}")]
    InvalidTimestamp { value: String, message: String },

    #[error("Invalid record in response: {0}")]
    Validation(#[from] ValidationError),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Invalid endpoint '{endpoint}': {message}")]
    InvalidEndpoint { endpoint: String, message: String },

    #[error("{0}")]
    Other(String),
}

/// Convert infrastructure StoreError to domain StorageError
impl From<StoreError> for StorageError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Http(http_err) => StorageError::Transport {
                message: http_err.to_string(),
            },
            StoreError::Xml(_)
            | StoreError::InvalidTimestamp { .. }
            | StoreError::Validation(_)
            | StoreError::MalformedResponse(_) => {
                StorageError::InvalidResponse {
                    message: err.to_string(),
                }
            }
            StoreError::InvalidEndpoint { .. } | StoreError::Other(_) => {
                StorageError::InvalidRequest {
                    message: err.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_records_surface_as_invalid_response() {
        let err: StorageError = StoreError::InvalidTimestamp {
            value: "yesterday".to_string(),
            message: "input contains invalid characters".to_string(),
        }
        .into();
        assert!(matches!(err, StorageError::InvalidResponse { .. }));

        let err: StorageError = StoreError::Validation(ValidationError::EmptyObjectKey).into();
        assert!(matches!(err, StorageError::InvalidResponse { .. }));
    }

    #[test]
    fn test_endpoint_errors_surface_as_invalid_request() {
        let err: StorageError = StoreError::InvalidEndpoint {
            endpoint: "ftp://x".to_string(),
            message: "unsupported scheme".to_string(),
        }
        .into();
        assert!(matches!(err, StorageError::InvalidRequest { .. }));
    }
}
