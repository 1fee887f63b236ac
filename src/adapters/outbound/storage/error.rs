use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use thiserror::Error as ThisError;

use crate::domain::errors::StorageError;

/// A failed S3 API call, before it is mapped to a domain error
#[derive(ThisError, Debug)]
#[error("{operation} failed ({}): {message}", .code.as_deref().unwrap_or("no error code"))]
pub struct StoreError {
    pub operation: &'static str,
    pub code: Option<String>,
    pub message: String,
}

impl StoreError {
    pub fn from_sdk<E, R>(operation: &'static str, err: SdkError<E, R>) -> Self
    where
        E: ProvideErrorMetadata + std::error::Error + 'static,
        R: std::fmt::Debug,
    {
        Self {
            operation,
            code: err.code().map(str::to_string),
            message: DisplayErrorContext(&err).to_string(),
        }
    }

    pub fn has_code(&self, code: &str) -> bool {
        self.code.as_deref() == Some(code)
    }

    /// Map to a domain error; `target` is the key or prefix the call was for
    pub fn into_storage_error(self, target: &str) -> StorageError {
        match self.code.as_deref() {
            Some("NoSuchKey") | Some("NotFound") => StorageError::ObjectNotFound {
                key: target.to_string(),
            },
            Some("AccessDenied") => StorageError::AccessDenied {
                operation: self.operation.to_string(),
                target: target.to_string(),
            },
            _ => StorageError::StorageBackendError {
                operation: self.operation.to_string(),
                message: self.message,
            },
        }
    }
}
