use async_trait::async_trait;
use bytes::Bytes;

use crate::domain::{
    errors::StorageResult,
    models::{ContinuationToken, ListMarker, MultipartUploadRecord, ObjectSummary, Page, UploadCursor},
    value_objects::BucketName,
};

/// Port for the object-store calls the garbage collector needs.
/// This abstracts the actual backend (AWS S3, MinIO, Ceph RGW, ...).
///
/// Listing calls return one page at a time; callers pass back the cursor
/// from the previous page unchanged.
#[async_trait]
pub trait RegistryStore: Send + Sync + 'static {
    /// Common prefixes directly under `prefix`, grouped by `delimiter`
    async fn list_grouped_keys(
        &self,
        bucket: &BucketName,
        prefix: &str,
        delimiter: &str,
        page_size: usize,
        cursor: Option<ListMarker>,
    ) -> StorageResult<Page<String, ListMarker>>;

    /// In-progress multipart uploads whose key starts with `prefix`
    async fn list_multipart_uploads(
        &self,
        bucket: &BucketName,
        prefix: &str,
        page_size: usize,
        cursor: Option<UploadCursor>,
    ) -> StorageResult<Page<MultipartUploadRecord, UploadCursor>>;

    /// Abort a multipart upload, discarding its parts
    async fn abort_multipart_upload(
        &self,
        bucket: &BucketName,
        key: &str,
        upload_id: &str,
    ) -> StorageResult<()>;

    /// Objects whose key starts with `prefix`, no grouping
    async fn list_objects(
        &self,
        bucket: &BucketName,
        prefix: &str,
        page_size: usize,
        cursor: Option<ContinuationToken>,
    ) -> StorageResult<Page<ObjectSummary, ContinuationToken>>;

    /// Retrieve the full content of an object
    async fn get_object_bytes(&self, bucket: &BucketName, key: &str) -> StorageResult<Bytes>;

    /// Delete a single object
    async fn delete_object(&self, bucket: &BucketName, key: &str) -> StorageResult<()>;
}
