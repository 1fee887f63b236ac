use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_smithy_types_convert::date_time::DateTimeExt;
use bytes::Bytes;
use tracing::instrument;

use crate::{
    adapters::outbound::storage::error::StoreError,
    domain::{
        errors::{StorageError, StorageResult},
        models::{
            ContinuationToken, ListMarker, MultipartUploadRecord, ObjectSummary, Page,
            UploadCursor,
        },
        value_objects::BucketName,
    },
    ports::storage::RegistryStore,
};

/// S3 storage adapter that implements the RegistryStore trait
#[derive(Clone, Debug)]
pub struct S3RegistryStore {
    client: Client,
}

impl S3RegistryStore {
    /// Create a new S3 adapter
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

fn page_size_param(page_size: usize) -> i32 {
    i32::try_from(page_size).unwrap_or(i32::MAX)
}

#[async_trait]
impl RegistryStore for S3RegistryStore {
    #[instrument(skip(self, cursor), fields(bucket = %bucket))]
    async fn list_grouped_keys(
        &self,
        bucket: &BucketName,
        prefix: &str,
        delimiter: &str,
        page_size: usize,
        cursor: Option<ListMarker>,
    ) -> StorageResult<Page<String, ListMarker>> {
        let output = self
            .client
            .list_objects()
            .bucket(bucket.as_str())
            .prefix(prefix)
            .delimiter(delimiter)
            .max_keys(page_size_param(page_size))
            .set_marker(cursor.map(|ListMarker(marker)| marker))
            .send()
            .await
            .map_err(|e| StoreError::from_sdk("ListObjects", e).into_storage_error(prefix))?;

        let items = output
            .common_prefixes()
            .iter()
            .filter_map(|common| common.prefix().map(str::to_string))
            .collect();

        Ok(Page {
            items,
            next_cursor: output.next_marker().map(|m| ListMarker(m.to_string())),
            truncated: output.is_truncated().unwrap_or(false),
        })
    }

    #[instrument(skip(self, cursor), fields(bucket = %bucket))]
    async fn list_multipart_uploads(
        &self,
        bucket: &BucketName,
        prefix: &str,
        page_size: usize,
        cursor: Option<UploadCursor>,
    ) -> StorageResult<Page<MultipartUploadRecord, UploadCursor>> {
        let (key_marker, upload_id_marker) = match cursor {
            Some(UploadCursor {
                key_marker,
                upload_id_marker,
            }) => (Some(key_marker), upload_id_marker),
            None => (None, None),
        };

        let output = self
            .client
            .list_multipart_uploads()
            .bucket(bucket.as_str())
            .prefix(prefix)
            .max_uploads(page_size_param(page_size))
            .set_key_marker(key_marker)
            .set_upload_id_marker(upload_id_marker)
            .send()
            .await
            .map_err(|e| {
                StoreError::from_sdk("ListMultipartUploads", e).into_storage_error(prefix)
            })?;

        let items = output
            .uploads()
            .iter()
            .map(|upload| MultipartUploadRecord {
                key: upload.key().map(str::to_string),
                upload_id: upload.upload_id().map(str::to_string),
                initiated_at: upload
                    .initiated()
                    .and_then(|initiated| initiated.to_chrono_utc().ok()),
            })
            .collect();

        let next_cursor = output.next_key_marker().map(|key_marker| UploadCursor {
            key_marker: key_marker.to_string(),
            upload_id_marker: output.next_upload_id_marker().map(str::to_string),
        });

        Ok(Page {
            items,
            next_cursor,
            truncated: output.is_truncated().unwrap_or(false),
        })
    }

    #[instrument(skip(self), fields(bucket = %bucket))]
    async fn abort_multipart_upload(
        &self,
        bucket: &BucketName,
        key: &str,
        upload_id: &str,
    ) -> StorageResult<()> {
        self.client
            .abort_multipart_upload()
            .bucket(bucket.as_str())
            .key(key)
            .upload_id(upload_id)
            .send()
            .await
            .map_err(|e| {
                let err = StoreError::from_sdk("AbortMultipartUpload", e);
                if err.has_code("NoSuchUpload") {
                    StorageError::UploadNotFound {
                        key: key.to_string(),
                        upload_id: upload_id.to_string(),
                    }
                } else {
                    err.into_storage_error(key)
                }
            })?;

        Ok(())
    }

    #[instrument(skip(self, cursor), fields(bucket = %bucket))]
    async fn list_objects(
        &self,
        bucket: &BucketName,
        prefix: &str,
        page_size: usize,
        cursor: Option<ContinuationToken>,
    ) -> StorageResult<Page<ObjectSummary, ContinuationToken>> {
        let output = self
            .client
            .list_objects_v2()
            .bucket(bucket.as_str())
            .prefix(prefix)
            .max_keys(page_size_param(page_size))
            .set_continuation_token(cursor.map(|ContinuationToken(token)| token))
            .send()
            .await
            .map_err(|e| StoreError::from_sdk("ListObjectsV2", e).into_storage_error(prefix))?;

        let items = output
            .contents()
            .iter()
            .filter_map(|object| object.key())
            .map(|key| ObjectSummary {
                key: key.to_string(),
            })
            .collect();

        Ok(Page {
            items,
            next_cursor: output
                .next_continuation_token()
                .map(|token| ContinuationToken(token.to_string())),
            truncated: output.is_truncated().unwrap_or(false),
        })
    }

    #[instrument(skip(self), fields(bucket = %bucket))]
    async fn get_object_bytes(&self, bucket: &BucketName, key: &str) -> StorageResult<Bytes> {
        let output = self
            .client
            .get_object()
            .bucket(bucket.as_str())
            .key(key)
            .send()
            .await
            .map_err(|e| StoreError::from_sdk("GetObject", e).into_storage_error(key))?;

        let bytes = output
            .body
            .collect()
            .await
            .map_err(|e| StorageError::StorageBackendError {
                operation: "GetObject".to_string(),
                message: format!("Failed to read body of {}: {}", key, e),
            })?
            .into_bytes();

        Ok(bytes)
    }

    #[instrument(skip(self), fields(bucket = %bucket))]
    async fn delete_object(&self, bucket: &BucketName, key: &str) -> StorageResult<()> {
        self.client
            .delete_object()
            .bucket(bucket.as_str())
            .key(key)
            .send()
            .await
            .map_err(|e| StoreError::from_sdk("DeleteObject", e).into_storage_error(key))?;

        Ok(())
    }
}
