use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::{
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

/// Store calls, as recorded in the journal and targeted by fault injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    ListGroupedKeys,
    ListMultipartUploads,
    AbortMultipartUpload,
    ListObjects,
    GetObject,
    DeleteObject,
}

impl StoreOperation {
    pub fn name(&self) -> &'static str {
        match self {
            StoreOperation::ListGroupedKeys => "ListObjects",
            StoreOperation::ListMultipartUploads => "ListMultipartUploads",
            StoreOperation::AbortMultipartUpload => "AbortMultipartUpload",
            StoreOperation::ListObjects => "ListObjectsV2",
            StoreOperation::GetObject => "GetObject",
            StoreOperation::DeleteObject => "DeleteObject",
        }
    }

    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            StoreOperation::AbortMultipartUpload | StoreOperation::DeleteObject
        )
    }
}

/// How an injected fault answers the call it hits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// A generic backend error
    Backend,
    /// A not-found answer, as if the target vanished after being listed
    NotFound,
    /// A listing page marked truncated that carries no cursor
    Stall,
}

#[derive(Debug, Clone, Copy)]
struct InjectedFault {
    fault: Fault,
    // Calls that still succeed before the fault fires
    pass: usize,
}

/// One call made against the store. `target` is the prefix for listings
/// and the key for everything else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreCall {
    pub operation: StoreOperation,
    pub target: String,
}

/// In-memory implementation of RegistryStore for testing and development.
///
/// Listings honour the requested page size, optionally capped lower with
/// [`InMemoryRegistryStore::with_page_cap`] to force pagination. Every call
/// is journaled, and individual calls can be made to fail.
#[derive(Clone, Default)]
pub struct InMemoryRegistryStore {
    data: Arc<RwLock<StoreData>>,
}

impl std::fmt::Debug for InMemoryRegistryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryRegistryStore").finish_non_exhaustive()
    }
}

#[derive(Default)]
struct StoreData {
    buckets: HashMap<String, BucketData>,
    page_cap: Option<usize>,
    faults: HashMap<(StoreOperation, String), InjectedFault>,
    journal: Vec<StoreCall>,
}

#[derive(Default)]
struct BucketData {
    objects: BTreeMap<String, Bytes>,
    // (key, upload id) -> initiated
    uploads: BTreeMap<(String, String), Option<DateTime<Utc>>>,
}

impl StoreData {
    /// Journal the call, then apply injected faults and bucket lookup
    fn enter(
        &mut self,
        operation: StoreOperation,
        bucket: &BucketName,
        target: &str,
    ) -> StorageResult<&mut BucketData> {
        self.enter_listing(operation, bucket, target)
            .map(|(bucket_data, _)| bucket_data)
    }

    /// Same as `enter`; the flag is set when the page must come back
    /// truncated without a cursor
    fn enter_listing(
        &mut self,
        operation: StoreOperation,
        bucket: &BucketName,
        target: &str,
    ) -> StorageResult<(&mut BucketData, bool)> {
        self.journal.push(StoreCall {
            operation,
            target: target.to_string(),
        });

        let mut stalled = false;
        if let Some(injected) = self.faults.get_mut(&(operation, target.to_string())) {
            if injected.pass > 0 {
                injected.pass -= 1;
            } else {
                match injected.fault {
                    Fault::Backend => {
                        return Err(StorageError::StorageBackendError {
                            operation: operation.name().to_string(),
                            message: format!("injected failure for '{}'", target),
                        })
                    }
                    Fault::NotFound => {
                        return Err(StorageError::ObjectNotFound {
                            key: target.to_string(),
                        })
                    }
                    Fault::Stall => stalled = true,
                }
            }
        }

        self.buckets
            .get_mut(bucket.as_str())
            .map(|bucket_data| (bucket_data, stalled))
            .ok_or_else(|| StorageError::BucketNotFound {
                bucket: bucket.to_string(),
            })
    }

    fn effective_page_size(&self, requested: usize) -> usize {
        let capped = match self.page_cap {
            Some(cap) => requested.min(cap),
            None => requested,
        };
        capped.max(1)
    }
}

/// Take at most `limit` items, reporting whether more remained
fn take_page<T>(items: impl Iterator<Item = T>, limit: usize) -> (Vec<T>, bool) {
    let mut page: Vec<T> = items.take(limit + 1).collect();
    let truncated = page.len() > limit;
    page.truncate(limit);
    (page, truncated)
}

impl InMemoryRegistryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Never return more than `cap` entries per listing page
    pub fn with_page_cap(cap: usize) -> Self {
        Self {
            data: Arc::new(RwLock::new(StoreData {
                page_cap: Some(cap),
                ..Default::default()
            })),
        }
    }

    pub async fn create_bucket(&self, bucket: &BucketName) {
        let mut data = self.data.write().await;
        data.buckets.entry(bucket.to_string()).or_default();
    }

    pub async fn put_object(&self, bucket: &BucketName, key: &str, content: impl Into<Bytes>) {
        let mut data = self.data.write().await;
        data.buckets
            .entry(bucket.to_string())
            .or_default()
            .objects
            .insert(key.to_string(), content.into());
    }

    pub async fn create_multipart_upload(
        &self,
        bucket: &BucketName,
        key: &str,
        upload_id: &str,
        initiated_at: Option<DateTime<Utc>>,
    ) {
        let mut data = self.data.write().await;
        data.buckets
            .entry(bucket.to_string())
            .or_default()
            .uploads
            .insert((key.to_string(), upload_id.to_string()), initiated_at);
    }

    /// Make every `operation` call on `target` fail with a backend error
    pub async fn fail(&self, operation: StoreOperation, target: &str) {
        self.inject(operation, target, Fault::Backend, 0).await;
    }

    /// Let `pass` matching calls through, then answer every later one
    /// with `fault`
    pub async fn inject(&self, operation: StoreOperation, target: &str, fault: Fault, pass: usize) {
        let mut data = self.data.write().await;
        data.faults
            .insert((operation, target.to_string()), InjectedFault { fault, pass });
    }

    pub async fn object_keys(&self, bucket: &BucketName) -> Vec<String> {
        let data = self.data.read().await;
        data.buckets
            .get(bucket.as_str())
            .map(|b| b.objects.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// An upload the listing reports without an upload id
    pub async fn create_unidentified_upload(
        &self,
        bucket: &BucketName,
        key: &str,
        initiated_at: Option<DateTime<Utc>>,
    ) {
        self.create_multipart_upload(bucket, key, "", initiated_at)
            .await;
    }

    /// Remaining uploads as (key, upload id) pairs
    pub async fn uploads(&self, bucket: &BucketName) -> Vec<(String, String)> {
        let data = self.data.read().await;
        data.buckets
            .get(bucket.as_str())
            .map(|b| b.uploads.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Every call made so far, in order
    pub async fn calls(&self) -> Vec<StoreCall> {
        self.data.read().await.journal.clone()
    }

    /// Only the destructive calls (abort, delete), in order
    pub async fn mutations(&self) -> Vec<StoreCall> {
        self.data
            .read()
            .await
            .journal
            .iter()
            .filter(|call| call.operation.is_mutation())
            .cloned()
            .collect()
    }
}

#[async_trait]
impl RegistryStore for InMemoryRegistryStore {
    async fn list_grouped_keys(
        &self,
        bucket: &BucketName,
        prefix: &str,
        delimiter: &str,
        page_size: usize,
        cursor: Option<ListMarker>,
    ) -> StorageResult<Page<String, ListMarker>> {
        let mut data = self.data.write().await;
        let limit = data.effective_page_size(page_size);
        let bucket_data = data.enter(StoreOperation::ListGroupedKeys, bucket, prefix)?;

        let common_prefixes: BTreeSet<String> = bucket_data
            .objects
            .keys()
            .filter_map(|key| key.strip_prefix(prefix))
            .filter_map(|rest| {
                rest.find(delimiter)
                    .map(|idx| format!("{}{}", prefix, &rest[..idx + delimiter.len()]))
            })
            .collect();

        let after = cursor.map(|ListMarker(marker)| marker);
        let (items, truncated) = take_page(
            common_prefixes
                .into_iter()
                .filter(|p| after.as_ref().map_or(true, |marker| p > marker)),
            limit,
        );

        Ok(match (truncated, items.last()) {
            (true, Some(last)) => {
                let next = ListMarker(last.clone());
                Page::truncated(items, next)
            }
            _ => Page::last(items),
        })
    }

    async fn list_multipart_uploads(
        &self,
        bucket: &BucketName,
        prefix: &str,
        page_size: usize,
        cursor: Option<UploadCursor>,
    ) -> StorageResult<Page<MultipartUploadRecord, UploadCursor>> {
        let mut data = self.data.write().await;
        let limit = data.effective_page_size(page_size);
        let bucket_data = data.enter(StoreOperation::ListMultipartUploads, bucket, prefix)?;

        let is_after_cursor = |key: &str, upload_id: &str| match &cursor {
            None => true,
            Some(UploadCursor {
                key_marker,
                upload_id_marker: None,
            }) => key > key_marker.as_str(),
            Some(UploadCursor {
                key_marker,
                upload_id_marker: Some(id_marker),
            }) => (key, upload_id) > (key_marker.as_str(), id_marker.as_str()),
        };

        let (entries, truncated) = take_page(
            bucket_data
                .uploads
                .iter()
                .filter(|((key, upload_id), _)| {
                    key.starts_with(prefix) && is_after_cursor(key.as_str(), upload_id.as_str())
                }),
            limit,
        );

        let next = match (truncated, entries.last()) {
            (true, Some(((key, upload_id), _))) => Some(UploadCursor {
                key_marker: key.clone(),
                upload_id_marker: Some(upload_id.clone()),
            }),
            _ => None,
        };

        let items = entries
            .into_iter()
            .map(|((key, upload_id), initiated_at)| MultipartUploadRecord {
                key: Some(key.clone()),
                upload_id: (!upload_id.is_empty()).then(|| upload_id.clone()),
                initiated_at: *initiated_at,
            })
            .collect();

        Ok(match next {
            Some(next) => Page::truncated(items, next),
            None => Page::last(items),
        })
    }

    async fn abort_multipart_upload(
        &self,
        bucket: &BucketName,
        key: &str,
        upload_id: &str,
    ) -> StorageResult<()> {
        let mut data = self.data.write().await;
        let bucket_data = data
            .enter(StoreOperation::AbortMultipartUpload, bucket, key)
            .map_err(|e| match e {
                StorageError::ObjectNotFound { .. } => StorageError::UploadNotFound {
                    key: key.to_string(),
                    upload_id: upload_id.to_string(),
                },
                other => other,
            })?;

        bucket_data
            .uploads
            .remove(&(key.to_string(), upload_id.to_string()))
            .map(|_| ())
            .ok_or_else(|| StorageError::UploadNotFound {
                key: key.to_string(),
                upload_id: upload_id.to_string(),
            })
    }

    async fn list_objects(
        &self,
        bucket: &BucketName,
        prefix: &str,
        page_size: usize,
        cursor: Option<ContinuationToken>,
    ) -> StorageResult<Page<ObjectSummary, ContinuationToken>> {
        let mut data = self.data.write().await;
        let limit = data.effective_page_size(page_size);
        let (bucket_data, stalled) = data.enter_listing(StoreOperation::ListObjects, bucket, prefix)?;

        let after = cursor.map(|ContinuationToken(token)| token);
        let (items, truncated) = take_page(
            bucket_data
                .objects
                .keys()
                .filter(|key| key.starts_with(prefix))
                .filter(|key| after.as_ref().map_or(true, |token| *key > token))
                .map(|key| ObjectSummary { key: key.clone() }),
            limit,
        );

        if stalled {
            return Ok(Page {
                items,
                next_cursor: None,
                truncated: true,
            });
        }

        Ok(match (truncated, items.last()) {
            (true, Some(last)) => {
                let next = ContinuationToken(last.key.clone());
                Page::truncated(items, next)
            }
            _ => Page::last(items),
        })
    }

    async fn get_object_bytes(&self, bucket: &BucketName, key: &str) -> StorageResult<Bytes> {
        let mut data = self.data.write().await;
        let bucket_data = data.enter(StoreOperation::GetObject, bucket, key)?;

        bucket_data
            .objects
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::ObjectNotFound {
                key: key.to_string(),
            })
    }

    async fn delete_object(&self, bucket: &BucketName, key: &str) -> StorageResult<()> {
        let mut data = self.data.write().await;
        let bucket_data = data.enter(StoreOperation::DeleteObject, bucket, key)?;

        // Like S3, deleting a missing key succeeds.
        bucket_data.objects.remove(key);
        Ok(())
    }
}
