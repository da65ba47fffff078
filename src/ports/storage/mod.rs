mod version_store;

pub use version_store::{
    DeleteObjectError,
    DeleteObjectsOutcome,
    DeletedObject,
    ObjectIdentifier,
    VersionedBucketClient,
};
