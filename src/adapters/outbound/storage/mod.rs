// Infrastructure error types
pub mod error;

// Storage implementations
pub mod in_memory;
pub mod s3;

// Re-export key types
pub use error::StoreError;
pub use in_memory::{Fault, InMemoryRegistryStore, StoreCall, StoreOperation};
pub use s3::{create_s3_client, S3Config, S3RegistryStore};
