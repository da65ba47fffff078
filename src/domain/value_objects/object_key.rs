use crate::domain::errors::ValidationError;
use serde::Serialize;

/// An object key as reported by the storage backend.
///
/// Keys are accepted as S3 stores them: any UTF-8 up to 1024 bytes, without
/// NUL. Leading or doubled slashes are legal S3 keys and must round-trip
/// unchanged into delete requests.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ObjectKey(String);

impl ObjectKey {
    pub const MAX_LEN: usize = 1024;

    /// Create a new ObjectKey with validation
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();

        if value.is_empty() {
            return Err(ValidationError::EmptyObjectKey);
        }

        if value.len() > Self::MAX_LEN {
            return Err(ValidationError::ObjectKeyTooLong {
                actual: value.len(),
                max: Self::MAX_LEN,
            });
        }

        if value.contains('\0') {
            return Err(ValidationError::InvalidObjectKeyCharacter('\0'));
        }

        Ok(Self(value))
    }

    /// Get the key as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check if this key has the given prefix
    pub fn has_prefix(&self, prefix: &str) -> bool {
        self.0.starts_with(prefix)
    }
}

impl std::fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_object_key() {
        assert!(ObjectKey::new("file.txt").is_ok());
        assert!(ObjectKey::new("folder/file.txt").is_ok());
        // Legal in S3 even if unusual
        assert!(ObjectKey::new("/leading-slash").is_ok());
        assert!(ObjectKey::new("double//slash").is_ok());
    }

    #[test]
    fn test_invalid_object_key() {
        assert!(ObjectKey::new("").is_err());
        assert!(ObjectKey::new("null\0byte").is_err());
        assert!(ObjectKey::new("x".repeat(1025)).is_err());
    }

    #[test]
    fn test_prefix_match() {
        let key = ObjectKey::new("logs/2024/app.log").unwrap();
        assert!(key.has_prefix("logs/"));
        assert!(key.has_prefix(""));
        assert!(!key.has_prefix("data/"));
    }
}
