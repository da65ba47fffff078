use crate::domain::errors::ValidationError;
use serde::Serialize;

/// Identifier of one stored version (or delete marker) of a key.
///
/// Backends issue opaque tokens; `"null"` is the id S3 assigns to objects
/// written before versioning was enabled.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct VersionId(String);

impl VersionId {
    pub const MAX_LEN: usize = 1024;

    /// Create a new VersionId with validation
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();

        if value.is_empty() {
            return Err(ValidationError::EmptyVersionId);
        }

        if value.len() > Self::MAX_LEN {
            return Err(ValidationError::VersionIdTooLong {
                actual: value.len(),
                max: Self::MAX_LEN,
            });
        }

        if let Some(c) = value
            .chars()
            .find(|c| c.is_whitespace() || c.is_control())
        {
            return Err(ValidationError::InvalidVersionIdCharacter(c));
        }

        Ok(Self(value))
    }

    /// Generate a fresh random version ID
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    /// Get the version ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for VersionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_version_id() {
        assert!(VersionId::new("null").is_ok());
        assert!(VersionId::new("3HL4kqtJlcpXroDTDmJ+rmSpXd3dIbrHY+MTRCxf3vjVBH40Nr8X8gdRQBpUMLUo").is_ok());
        assert!(VersionId::new("550e8400-e29b-41d4-a716-446655440000").is_ok());
    }

    #[test]
    fn test_invalid_version_id() {
        assert!(VersionId::new("").is_err());
        assert!(VersionId::new("version with spaces").is_err());
        assert!(VersionId::new("tab\tinside").is_err());
        assert!(VersionId::new("x".repeat(1025)).is_err());
    }

    #[test]
    fn test_generate_version_id() {
        let v1 = VersionId::generate();
        let v2 = VersionId::generate();

        assert_ne!(v1, v2);
        assert!(VersionId::new(v1.as_str()).is_ok());
    }
}
