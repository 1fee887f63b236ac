use std::sync::Arc;

use tracing::{debug, error, info, instrument, warn};

use crate::{
    domain::{
        errors::{GcError, GcResult},
        models::{CleanupPolicy, Continuation, Deadline, GcReport, MAX_PAGE_SIZE},
        value_objects::{BucketName, RepositoryPrefix},
    },
    ports::storage::RegistryStore,
    services::{MultipartUploadReaper, UploadFolderReaper},
};

const LIST_OPERATION: &str = "ListObjects";
const DELIMITER: &str = "/";

/// Top-level driver: enumerates repositories under the registry root and
/// runs both reapers on each one as soon as it is discovered.
#[derive(Clone)]
pub struct RepositoryScanner {
    store: Arc<dyn RegistryStore>,
    bucket: BucketName,
    root_prefix: String,
    policy: CleanupPolicy,
    multipart: MultipartUploadReaper,
    folders: UploadFolderReaper,
}

impl RepositoryScanner {
    pub fn new(
        store: Arc<dyn RegistryStore>,
        bucket: BucketName,
        root_prefix: String,
        policy: CleanupPolicy,
        multipart: MultipartUploadReaper,
        folders: UploadFolderReaper,
    ) -> Self {
        Self {
            store,
            bucket,
            root_prefix,
            policy,
            multipart,
            folders,
        }
    }

    pub fn root_prefix(&self) -> &str {
        &self.root_prefix
    }

    /// Run one full garbage-collection pass.
    ///
    /// Fails only when the repository listing itself fails or the deadline
    /// passes; the error is then `GcError::Aborted`, carrying the report of
    /// everything done before it. A repository whose own sweep could not
    /// finish is recorded on the report and the scan moves on.
    #[instrument(skip(self), fields(bucket = %self.bucket, root = %self.root_prefix))]
    pub async fn run(&self) -> GcResult<GcReport> {
        let deadline = Deadline::after(self.policy.max_runtime);
        let mut report = GcReport::new(self.policy.dry_run, self.policy.threshold_hours);

        if self.policy.dry_run {
            info!("running in dry-run mode, nothing will be removed");
        }
        info!(
            threshold_hours = self.policy.threshold_hours,
            "scanning repositories"
        );

        if let Err(e) = self.scan(&deadline, &mut report).await {
            error!(
                error = %e,
                repositories = report.repositories,
                multipart_removed = report.multipart_removed,
                upload_folders_removed = report.upload_folders_removed,
                "scan aborted"
            );
            return Err(GcError::Aborted {
                report: Box::new(report),
                source: Box::new(e),
            });
        }

        info!(
            repositories = report.repositories,
            multipart_removed = report.multipart_removed,
            upload_folders_removed = report.upload_folders_removed,
            failures = report.failures.len(),
            incomplete = report.incomplete.len(),
            "scan finished"
        );
        Ok(report)
    }

    async fn scan(&self, deadline: &Deadline, report: &mut GcReport) -> GcResult<()> {
        let mut cursor = None;

        loop {
            deadline.check("listing repositories")?;

            let page = self
                .store
                .list_grouped_keys(
                    &self.bucket,
                    &self.root_prefix,
                    DELIMITER,
                    MAX_PAGE_SIZE,
                    cursor.take(),
                )
                .await
                .map_err(|source| GcError::Listing {
                    operation: LIST_OPERATION,
                    prefix: self.root_prefix.clone(),
                    source,
                })?;

            let (prefixes, continuation) = page.split();

            for raw in prefixes {
                let prefix = match RepositoryPrefix::new(raw) {
                    Ok(prefix) => prefix,
                    Err(e) => {
                        warn!(error = %e, "ignoring malformed repository prefix");
                        continue;
                    }
                };
                report.repositories += 1;
                info!(index = report.repositories, prefix = %prefix, "repository");
                self.sweep_repository(&prefix, deadline, report).await?;
            }

            match continuation {
                Continuation::Next(next) => {
                    debug!("result is truncated, continuing");
                    cursor = Some(next);
                }
                Continuation::Exhausted => return Ok(()),
                Continuation::Stalled => {
                    return Err(GcError::MissingCursor {
                        operation: LIST_OPERATION,
                        prefix: self.root_prefix.clone(),
                    })
                }
            }
        }
    }

    async fn sweep_repository(
        &self,
        prefix: &RepositoryPrefix,
        deadline: &Deadline,
        report: &mut GcReport,
    ) -> GcResult<()> {
        match self.multipart.reap(prefix, deadline).await {
            Ok(sweep) => report.absorb_multipart(sweep),
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                error!(prefix = %prefix, error = %e, "multipart sweep incomplete");
                report.mark_incomplete(prefix.as_str(), e);
            }
        }

        match self.folders.reap(prefix, deadline).await {
            Ok(sweep) => report.absorb_folders(sweep),
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                error!(prefix = %prefix, error = %e, "upload folder sweep incomplete");
                report.mark_incomplete(prefix.as_str(), e);
            }
        }

        Ok(())
    }
}
