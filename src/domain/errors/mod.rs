mod storage_errors;
mod sweep_errors;
mod validation_errors;

pub use storage_errors::*;
pub use sweep_errors::*;
pub use validation_errors::*;
