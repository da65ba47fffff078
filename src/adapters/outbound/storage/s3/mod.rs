//! S3-compatible versioned bucket client over reqwest
//!
//! Requests use path-style addressing and AWS Signature V4, so any
//! S3-compatible provider (Wasabi, MinIO, AWS) can be targeted through the
//! endpoint alone.

pub mod client;
mod signer;
mod xml;

pub use client::{S3Config, S3VersionedClient};
