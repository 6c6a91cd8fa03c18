pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{BatchItem, BatchRequest, BatchResult, NormalizedError};
