use std::sync::Arc;

use tracing::{debug, error, info, instrument, warn};

use crate::{
    domain::{
        errors::{GcError, GcResult},
        models::{
            is_started_at_marker, CleanupPolicy, Continuation, Deadline, FailureKind, FolderSweep,
            ItemFailure, UploadFolderMarker, MAX_PAGE_SIZE,
        },
        time::{elapsed_hours, parse_started_at},
        value_objects::{BucketName, ObjectKey, RepositoryPrefix},
    },
    ports::{storage::RegistryStore, Clock},
};

const LIST_OPERATION: &str = "ListObjectsV2";

/// Removes `_uploads/<id>/` folders whose `startedat` marker is older than
/// the cleanup threshold.
///
/// A folder is only ever deleted after its marker has been read, parsed
/// and aged. Inside a folder the marker is deleted last, so a folder that
/// could not be removed completely is found again by the next run.
#[derive(Clone)]
pub struct UploadFolderReaper {
    store: Arc<dyn RegistryStore>,
    clock: Arc<dyn Clock>,
    bucket: BucketName,
    policy: CleanupPolicy,
}

impl UploadFolderReaper {
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

    #[instrument(skip(self, deadline), fields(bucket = %self.bucket, prefix = %prefix))]
    pub async fn reap(&self, prefix: &RepositoryPrefix, deadline: &Deadline) -> GcResult<FolderSweep> {
        let mut sweep = FolderSweep::default();
        let mut cursor = None;

        loop {
            deadline.check("listing upload folders")?;

            let page = self
                .store
                .list_objects(&self.bucket, prefix.as_str(), MAX_PAGE_SIZE, cursor.take())
                .await
                .map_err(|source| GcError::Listing {
                    operation: LIST_OPERATION,
                    prefix: prefix.to_string(),
                    source,
                })?;

            let (objects, continuation) = page.split();

            for object in objects {
                if !is_started_at_marker(&object.key) {
                    continue;
                }
                sweep.markers_examined += 1;
                self.consider_marker(object.key, deadline, &mut sweep).await?;
            }

            match continuation {
                Continuation::Next(next) => cursor = Some(next),
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
            markers = sweep.markers_examined,
            folders_removed = sweep.folders_removed,
            objects_deleted = sweep.objects_deleted,
            dry_run = self.policy.dry_run,
            "upload folder sweep finished"
        );
        Ok(sweep)
    }

    async fn consider_marker(
        &self,
        key: String,
        deadline: &Deadline,
        sweep: &mut FolderSweep,
    ) -> GcResult<()> {
        let marker_key = match ObjectKey::new(key.as_str()) {
            Ok(marker_key) => marker_key,
            Err(e) => {
                warn!(key = %key, error = %e, "unusable marker key, skipping");
                sweep.failures.push(ItemFailure::new(
                    FailureKind::MarkerRead,
                    self.bucket.as_str(),
                    key,
                    e,
                ));
                return Ok(());
            }
        };

        let content = match self.store.get_object_bytes(&self.bucket, marker_key.as_str()).await {
            Ok(content) => content,
            Err(e) => {
                error!(bucket = %self.bucket, key = %marker_key, error = %e, "failed to read marker");
                sweep.failures.push(ItemFailure::new(
                    FailureKind::MarkerRead,
                    self.bucket.as_str(),
                    marker_key.as_str(),
                    e,
                ));
                return Ok(());
            }
        };

        let started_at = match parse_started_at(&content) {
            Ok(started_at) => started_at,
            Err(e) => {
                error!(bucket = %self.bucket, key = %marker_key, error = %e, "failed to parse marker");
                sweep.failures.push(ItemFailure::new(
                    FailureKind::MarkerParse,
                    self.bucket.as_str(),
                    marker_key.as_str(),
                    e,
                ));
                return Ok(());
            }
        };

        let marker = UploadFolderMarker::new(
            marker_key,
            elapsed_hours(started_at, self.clock.now()),
        );

        if !self.policy.is_expired(marker.age_hours) {
            info!(key = %marker.key, age_hours = marker.age_hours, "skipping folder");
            return Ok(());
        }

        if self.policy.dry_run {
            info!(
                folder = %marker.folder_prefix(),
                age_hours = marker.age_hours,
                "would remove folder"
            );
            sweep.folders_removed += 1;
            return Ok(());
        }

        info!(
            folder = %marker.folder_prefix(),
            age_hours = marker.age_hours,
            "removing folder"
        );
        self.remove_folder(&marker, deadline, sweep).await
    }

    async fn remove_folder(
        &self,
        marker: &UploadFolderMarker,
        deadline: &Deadline,
        sweep: &mut FolderSweep,
    ) -> GcResult<()> {
        let folder = marker.folder_prefix();

        let Some(mut keys) = self.list_folder(&folder, deadline, sweep).await? else {
            return Ok(());
        };

        // Marker goes last, whether or not the listing returned it.
        keys.retain(|key| key != marker.key.as_str());

        let mut complete = true;
        for key in &keys {
            deadline.check("deleting upload folder objects")?;
            complete &= self.delete_folder_object(key, sweep).await;
        }

        if !complete {
            warn!(folder = %folder, "keeping marker, folder was not fully removed");
            return Ok(());
        }

        deadline.check("deleting upload folder marker")?;
        if self.delete_folder_object(marker.key.as_str(), sweep).await {
            sweep.folders_removed += 1;
        }
        Ok(())
    }

    /// Every key under `folder`, or `None` when the folder could not be
    /// listed in full.
    async fn list_folder(
        &self,
        folder: &str,
        deadline: &Deadline,
        sweep: &mut FolderSweep,
    ) -> GcResult<Option<Vec<String>>> {
        let mut keys = Vec::new();
        let mut cursor = None;

        loop {
            deadline.check("listing an upload folder")?;

            let page = match self
                .store
                .list_objects(&self.bucket, folder, MAX_PAGE_SIZE, cursor.take())
                .await
            {
                Ok(page) => page,
                Err(e) => {
                    error!(bucket = %self.bucket, folder = %folder, error = %e, "failed to list folder");
                    sweep.failures.push(ItemFailure::new(
                        FailureKind::FolderList,
                        self.bucket.as_str(),
                        folder,
                        e,
                    ));
                    return Ok(None);
                }
            };

            let (objects, continuation) = page.split();
            keys.extend(objects.into_iter().map(|object| object.key));

            match continuation {
                Continuation::Next(next) => cursor = Some(next),
                Continuation::Exhausted => return Ok(Some(keys)),
                Continuation::Stalled => {
                    error!(bucket = %self.bucket, folder = %folder, "folder listing stalled");
                    sweep.failures.push(ItemFailure::new(
                        FailureKind::FolderList,
                        self.bucket.as_str(),
                        folder,
                        "truncated page without continuation token",
                    ));
                    return Ok(None);
                }
            }
        }
    }

    /// Whether `key` is gone afterwards
    async fn delete_folder_object(&self, key: &str, sweep: &mut FolderSweep) -> bool {
        match self.store.delete_object(&self.bucket, key).await {
            Ok(()) => {
                debug!(key = %key, "removed");
                sweep.objects_deleted += 1;
                true
            }
            Err(e) if e.is_not_found() => {
                debug!(key = %key, "already removed");
                true
            }
            Err(e) => {
                error!(bucket = %self.bucket, key = %key, error = %e, "failed to delete");
                sweep.failures.push(ItemFailure::new(
                    FailureKind::FolderDelete,
                    self.bucket.as_str(),
                    key,
                    e,
                ));
                false
            }
        }
    }
}
