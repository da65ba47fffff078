// Infrastructure error types
pub mod error;

// Storage implementations
pub mod in_memory;
pub mod s3;

// Re-export key types
pub use error::StoreError;
pub use in_memory::InMemoryVersionedBucket;
pub use s3::{S3Config, S3VersionedClient};
