use std::sync::Arc;

use crate::{
    adapters::outbound::storage::{create_s3_client, InMemoryRegistryStore, S3Config, S3RegistryStore},
    domain::{
        models::CleanupPolicy,
        value_objects::{repositories_root, BucketName},
    },
    ports::{storage::RegistryStore, Clock, SystemClock},
    services::{MultipartUploadReaper, RepositoryScanner, UploadFolderReaper},
};

/// Configuration for one garbage-collection run
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub storage_backend: StorageBackend,
    pub bucket: String,
    /// Optional path prepended to `docker/registry/v2/repositories/`
    pub root_directory: Option<String>,
    pub policy: CleanupPolicy,
}

/// Storage backend configuration
#[derive(Debug, Clone)]
pub enum StorageBackend {
    /// A shared in-memory store; clones see the same objects
    InMemory(InMemoryRegistryStore),
    S3(S3Config),
}

/// Services wired for one run
pub struct AppServices {
    pub scanner: RepositoryScanner,
    pub multipart_reaper: MultipartUploadReaper,
    pub folder_reaper: UploadFolderReaper,
}

/// Application builder for dependency injection
pub struct AppBuilder {
    config: AppConfig,
    clock: Arc<dyn Clock>,
}

impl AppBuilder {
    /// Create a new application builder
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the wall clock, e.g. with a `FixedClock`
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Build the reapers and the scanner that drives them
    pub async fn build(self) -> Result<AppServices, AppError> {
        let bucket =
            BucketName::new(self.config.bucket.as_str()).map_err(|e| AppError::Configuration {
                message: format!("invalid bucket '{}': {}", self.config.bucket, e),
            })?;

        let store = self.create_store(&bucket).await?;
        let policy = self.config.policy;

        let multipart_reaper =
            MultipartUploadReaper::new(store.clone(), self.clock.clone(), bucket.clone(), policy);
        let folder_reaper =
            UploadFolderReaper::new(store.clone(), self.clock.clone(), bucket.clone(), policy);

        let scanner = RepositoryScanner::new(
            store,
            bucket,
            repositories_root(self.config.root_directory.as_deref()),
            policy,
            multipart_reaper.clone(),
            folder_reaper.clone(),
        );

        Ok(AppServices {
            scanner,
            multipart_reaper,
            folder_reaper,
        })
    }

    /// Create the storage adapter based on configuration.
    ///
    /// An in-memory store gets the bucket created, so a fresh store scans
    /// as an empty registry.
    async fn create_store(&self, bucket: &BucketName) -> Result<Arc<dyn RegistryStore>, AppError> {
        match &self.config.storage_backend {
            StorageBackend::InMemory(store) => {
                store.create_bucket(bucket).await;
                Ok(Arc::new(store.clone()))
            }
            StorageBackend::S3(s3) => {
                if s3.endpoint.is_empty() {
                    return Err(AppError::StorageInit {
                        message: "S3 endpoint must not be empty".to_string(),
                    });
                }
                if s3.access_key.is_empty() || s3.secret_key.is_empty() {
                    return Err(AppError::StorageInit {
                        message: "S3 access key and secret key are required".to_string(),
                    });
                }
                Ok(Arc::new(S3RegistryStore::new(create_s3_client(s3))))
            }
        }
    }
}

/// Application-level errors
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Storage initialization error: {message}")]
    StorageInit { message: String },
}

/// Create an application over an in-memory store, for tests and local runs
pub async fn create_in_memory_app(
    store: InMemoryRegistryStore,
    bucket: impl Into<String>,
    policy: CleanupPolicy,
    clock: Arc<dyn Clock>,
) -> Result<AppServices, AppError> {
    AppBuilder::new(AppConfig {
        storage_backend: StorageBackend::InMemory(store),
        bucket: bucket.into(),
        root_directory: None,
        policy,
    })
    .with_clock(clock)
    .build()
    .await
}

/// Create an S3-backed application
pub async fn create_s3_app(
    s3: S3Config,
    bucket: impl Into<String>,
    root_directory: Option<String>,
    policy: CleanupPolicy,
) -> Result<AppServices, AppError> {
    AppBuilder::new(AppConfig {
        storage_backend: StorageBackend::S3(s3),
        bucket: bucket.into(),
        root_directory,
        policy,
    })
    .build()
    .await
}
