//! S3 storage adapter built on the AWS SDK
//!
//! Works against AWS S3 as well as S3-compatible stores (MinIO, Ceph RGW):
//! requests use path-style addressing and the configured endpoint.

pub mod s3_adapter;

pub use s3_adapter::S3RegistryStore;

use aws_sdk_s3::{
    config::{timeout::TimeoutConfig, BehaviorVersion, Credentials, Region},
    Client, Config,
};
use std::time::Duration;

/// Configuration for S3 storage backend
#[derive(Clone)]
pub struct S3Config {
    pub endpoint: String,
    pub region: String,
    pub access_key: String,
    pub secret_key: String,
    pub operation_timeout: Duration,
}

impl std::fmt::Debug for S3Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Config")
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("operation_timeout", &self.operation_timeout)
            .finish()
    }
}

/// Create an S3 client from configuration
pub fn create_s3_client(config: &S3Config) -> Client {
    let credentials = Credentials::new(
        config.access_key.clone(),
        config.secret_key.clone(),
        None,
        None,
        "registry-upload-gc",
    );

    let timeout = TimeoutConfig::builder()
        .operation_timeout(config.operation_timeout)
        .operation_attempt_timeout(config.operation_timeout)
        .build();

    let client_config = Config::builder()
        .behavior_version(BehaviorVersion::latest())
        .region(Region::new(config.region.clone()))
        .endpoint_url(config.endpoint.clone())
        .credentials_provider(credentials)
        .timeout_config(timeout)
        .force_path_style(true)
        .build();

    Client::from_conf(client_config)
}
