pub mod batch_deleter;
pub mod classifier;
pub mod enumerator;
pub mod reconciler;
pub mod sweep_service_impl;

pub use batch_deleter::{batch_count, partition, BatchDeleteHalt, BatchDeleter};
pub use classifier::{Classification, Classifier};
pub use enumerator::{EnumerationError, EnumerationHalt, Enumerator};
pub use reconciler::Reconciler;
pub use sweep_service_impl::RetentionSweepService;
