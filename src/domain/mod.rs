pub mod errors;
pub mod models;
pub mod time;
pub mod value_objects;

// Re-export commonly used types
pub use errors::{GcError, GcResult, MarkerParseError, StorageError, StorageResult, ValidationError};
pub use models::*;
pub use value_objects::*;
