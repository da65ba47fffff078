/// Errors reported by a storage backend through the storage port
#[derive(Debug, Clone, PartialEq)]
pub enum StorageError {
    /// Credentials were rejected (unknown access key, bad signature)
    AuthenticationFailed { message: String },

    /// Credentials are valid but lack permission for the operation
    AccessDenied { operation: String, message: String },

    /// The bucket does not exist
    BucketNotFound { bucket: String },

    /// The request never produced a response (DNS, TLS, timeout, reset)
    Transport { message: String },

    /// The backend answered with a non-success status
    Backend {
        status: u16,
        code: String,
        message: String,
    },

    /// The backend answered but the response could not be understood
    InvalidResponse { message: String },

    /// The request was rejected before being sent
    InvalidRequest { message: String },
}

impl StorageError {
    /// True when the backend rejected the caller's identity or its permissions
    pub fn is_credential_failure(&self) -> bool {
        matches!(
            self,
            StorageError::AuthenticationFailed { .. } | StorageError::AccessDenied { .. }
        )
    }
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::AuthenticationFailed { message } => {
                write!(f, "Authentication failed: {}", message)
            }
            StorageError::AccessDenied { operation, message } => {
                write!(f, "Access denied for operation '{}': {}", operation, message)
            }
            StorageError::BucketNotFound { bucket } => {
                write!(f, "Bucket not found: {}", bucket)
            }
            StorageError::Transport { message } => {
                write!(f, "Transport error: {}", message)
            }
            StorageError::Backend {
                status,
                code,
                message,
            } => {
                write!(f, "Storage backend error {} ({}): {}", status, code, message)
            }
            StorageError::InvalidResponse { message } => {
                write!(f, "Invalid response from storage backend: {}", message)
            }
            StorageError::InvalidRequest { message } => {
                write!(f, "Invalid storage request: {}", message)
            }
        }
    }
}

impl std::error::Error for StorageError {}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_failures() {
        assert!(StorageError::AuthenticationFailed {
            message: "bad key".to_string()
        }
        .is_credential_failure());
        assert!(StorageError::AccessDenied {
            operation: "ListObjectVersions".to_string(),
            message: "Access Denied".to_string()
        }
        .is_credential_failure());
        assert!(!StorageError::BucketNotFound {
            bucket: "archive-bucket".to_string()
        }
        .is_credential_failure());
        assert!(!StorageError::Transport {
            message: "reset".to_string()
        }
        .is_credential_failure());
    }
}
