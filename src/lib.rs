pub mod adapters;
pub mod app;
pub mod domain;
pub mod ports;
pub mod services;

// Re-export key types for convenience

// Domain types - policy, report, value objects and errors
pub use domain::{
    BucketName, CleanupPolicy, GcError, GcReport, GcResult, ItemFailure, MarkerParseError,
    ObjectKey, RepositoryPrefix, StorageError, StorageResult, ValidationError,
};

// Port types - interfaces for external systems
pub use ports::{Clock, FixedClock, RegistryStore, SystemClock};

// Service implementations
pub use services::{MultipartUploadReaper, RepositoryScanner, UploadFolderReaper};

// Application factory and configuration
pub use app::{
    create_in_memory_app, create_s3_app, AppBuilder, AppConfig, AppError, AppServices,
    StorageBackend,
};

// Adapter types - infrastructure implementations
pub use adapters::outbound::storage::{InMemoryRegistryStore, S3Config, S3RegistryStore};

pub mod prelude {
    pub use crate::{
        create_in_memory_app, create_s3_app, AppBuilder, AppServices, BucketName, CleanupPolicy,
        FixedClock, GcReport, InMemoryRegistryStore, RegistryStore, RepositoryScanner,
        S3RegistryStore, SystemClock,
    };
}
