use thiserror::Error;

/// Errors that can occur while talking to the object store
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("Object not found: {key}")]
    ObjectNotFound { key: String },

    /// Already completed or aborted
    #[error("Multipart upload '{upload_id}' not found for object: {key}")]
    UploadNotFound { key: String, upload_id: String },

    #[error("Bucket not found: {bucket}")]
    BucketNotFound { bucket: String },

    #[error("Access denied for operation '{operation}' on: {target}")]
    AccessDenied { operation: String, target: String },

    #[error("Storage backend error in '{operation}': {message}")]
    StorageBackendError { operation: String, message: String },
}

impl StorageError {
    /// Whether the target of the operation no longer exists.
    ///
    /// Re-aborting an upload or re-deleting an object that a previous run
    /// already removed surfaces as one of these.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StorageError::ObjectNotFound { .. } | StorageError::UploadNotFound { .. }
        )
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
