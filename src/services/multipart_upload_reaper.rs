use std::sync::Arc;

use tracing::{debug, error, info, instrument, warn};

use crate::{
    domain::{
        errors::{GcError, GcResult},
        models::{
            CleanupPolicy, Continuation, Deadline, FailureKind, ItemFailure, MultipartSweep,
            MultipartUploadRecord, MAX_PAGE_SIZE,
        },
        time::elapsed_hours,
        value_objects::{BucketName, RepositoryPrefix},
    },
    ports::{storage::RegistryStore, Clock},
};

const LIST_OPERATION: &str = "ListMultipartUploads";

/// Aborts multipart uploads that have been open for longer than the
/// cleanup threshold.
#[derive(Clone)]
pub struct MultipartUploadReaper {
    store: Arc<dyn RegistryStore>,
    clock: Arc<dyn Clock>,
    bucket: BucketName,
    policy: CleanupPolicy,
}

impl MultipartUploadReaper {
    pub fn new(
        store: Arc<dyn RegistryStore>,
        clock: Arc<dyn Clock>,
        bucket: BucketName,
        policy: CleanupPolicy,
    ) -> Self {
        Self {
            store,
            clock,
            bucket,
            policy,
        }
    }

    /// Walk every page of in-progress uploads under `prefix`.
    ///
    /// Returns an error only when a listing call fails or the run deadline
    /// passes; upload-level problems are collected on the sweep.
    #[instrument(skip(self, deadline), fields(bucket = %self.bucket, prefix = %prefix))]
    pub async fn reap(
        &self,
        prefix: &RepositoryPrefix,
        deadline: &Deadline,
    ) -> GcResult<MultipartSweep> {
        let mut sweep = MultipartSweep::default();
        let mut cursor = None;

        loop {
            deadline.check("listing multipart uploads")?;

            let page = self
                .store
                .list_multipart_uploads(&self.bucket, prefix.as_str(), MAX_PAGE_SIZE, cursor.take())
                .await
                .map_err(|source| GcError::Listing {
                    operation: LIST_OPERATION,
                    prefix: prefix.to_string(),
                    source,
                })?;

            let (records, continuation) = page.split();
            info!(found = records.len(), "multipart uploads found for prefix");

            for record in records {
                sweep.examined += 1;
                self.consider(record, deadline, &mut sweep).await?;
            }

            match continuation {
                Continuation::Next(next) => {
                    debug!("output is truncated, continuing");
                    cursor = Some(next);
                }
                Continuation::Exhausted => break,
                Continuation::Stalled => {
                    return Err(GcError::MissingCursor {
                        operation: LIST_OPERATION,
                        prefix: prefix.to_string(),
                    })
                }
            }
        }

        info!(
            examined = sweep.examined,
            removed = sweep.removed,
            dry_run = self.policy.dry_run,
            "multipart sweep finished"
        );
        Ok(sweep)
    }

    async fn consider(
        &self,
        record: MultipartUploadRecord,
        deadline: &Deadline,
        sweep: &mut MultipartSweep,
    ) -> GcResult<()> {
        let (Some(key), Some(upload_id)) = (record.key.as_deref(), record.upload_id.as_deref())
        else {
            warn!(
                bucket = %self.bucket,
                key = ?record.key,
                upload_id = ?record.upload_id,
                "multipart upload listed without key or upload id, skipping"
            );
            sweep.failures.push(ItemFailure::new(
                FailureKind::MalformedUpload,
                self.bucket.as_str(),
                record.key.as_deref().unwrap_or_default(),
                format!(
                    "upload {} listed without key or upload id",
                    record.upload_id.as_deref().unwrap_or("<none>")
                ),
            ));
            return Ok(());
        };

        let Some(initiated_at) = record.initiated_at else {
            warn!(
                bucket = %self.bucket,
                key = %key,
                upload_id = %upload_id,
                "multipart upload has no initiated timestamp, skipping"
            );
            sweep.failures.push(ItemFailure::new(
                FailureKind::MissingInitiated,
                self.bucket.as_str(),
                key,
                format!("upload {} has no initiated timestamp", upload_id),
            ));
            return Ok(());
        };

        let age_hours = elapsed_hours(initiated_at, self.clock.now());
        if !self.policy.is_expired(age_hours) {
            debug!(key = %key, age_hours, "upload is recent, keeping");
            return Ok(());
        }

        if self.policy.dry_run {
            info!(
                key = %key,
                upload_id = %upload_id,
                age_hours,
                "would abort multipart upload"
            );
            sweep.removed += 1;
            return Ok(());
        }

        deadline.check("aborting a multipart upload")?;

        match self
            .store
            .abort_multipart_upload(&self.bucket, key, upload_id)
            .await
        {
            Ok(()) => {
                info!(
                    key = %key,
                    upload_id = %upload_id,
                    age_hours,
                    "aborted multipart upload"
                );
                sweep.removed += 1;
            }
            Err(e) if e.is_not_found() => {
                debug!(
                    key = %key,
                    upload_id = %upload_id,
                    "multipart upload already gone"
                );
                sweep.already_gone += 1;
            }
            Err(e) => {
                error!(
                    bucket = %self.bucket,
                    key = %key,
                    upload_id = %upload_id,
                    error = %e,
                    "failed to abort multipart upload"
                );
                sweep.failures.push(ItemFailure::new(
                    FailureKind::AbortUpload,
                    self.bucket.as_str(),
                    key,
                    format!("upload {}: {}", upload_id, e),
                ));
            }
        }

        Ok(())
    }
}
