use serde::Serialize;

/// Kind of per-item failure collected during a sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    AbortUpload,
    MalformedUpload,
    MissingInitiated,
    MarkerRead,
    MarkerParse,
    FolderList,
    FolderDelete,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            FailureKind::AbortUpload => "abort multipart upload",
            FailureKind::MalformedUpload => "multipart upload without key or upload id",
            FailureKind::MissingInitiated => "missing initiated timestamp",
            FailureKind::MarkerRead => "read startedat marker",
            FailureKind::MarkerParse => "parse startedat marker",
            FailureKind::FolderList => "list upload folder",
            FailureKind::FolderDelete => "delete upload folder object",
        };
        f.write_str(label)
    }
}

/// One item that was skipped because of an error, with enough context to
/// retry it by hand
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemFailure {
    pub kind: FailureKind,
    pub bucket: String,
    pub key: String,
    pub message: String,
}

impl ItemFailure {
    pub fn new(
        kind: FailureKind,
        bucket: impl Into<String>,
        key: impl Into<String>,
        message: impl ToString,
    ) -> Self {
        Self {
            kind,
            bucket: bucket.into(),
            key: key.into(),
            message: message.to_string(),
        }
    }
}

/// Outcome of one multipart-upload sweep over one repository prefix
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MultipartSweep {
    pub examined: usize,
    /// Aborted (or, in dry-run, selected for abort)
    pub removed: usize,
    /// Selected, but the store no longer knew the upload
    pub already_gone: usize,
    pub failures: Vec<ItemFailure>,
}

/// Outcome of one upload-folder sweep over one repository prefix
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FolderSweep {
    pub markers_examined: usize,
    /// Fully removed (or, in dry-run, selected for removal)
    pub folders_removed: usize,
    pub objects_deleted: usize,
    pub failures: Vec<ItemFailure>,
}

/// A repository whose sweep could not run to completion
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IncompleteRepository {
    pub prefix: String,
    pub reason: String,
}

/// Totals for a whole run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GcReport {
    pub dry_run: bool,
    pub threshold_hours: u32,
    pub repositories: usize,
    pub multipart_examined: usize,
    pub multipart_removed: usize,
    pub multipart_already_gone: usize,
    pub markers_examined: usize,
    pub upload_folders_removed: usize,
    pub objects_deleted: usize,
    pub failures: Vec<ItemFailure>,
    pub incomplete: Vec<IncompleteRepository>,
}

impl GcReport {
    pub fn new(dry_run: bool, threshold_hours: u32) -> Self {
        Self {
            dry_run,
            threshold_hours,
            ..Default::default()
        }
    }

    pub fn absorb_multipart(&mut self, sweep: MultipartSweep) {
        self.multipart_examined += sweep.examined;
        self.multipart_removed += sweep.removed;
        self.multipart_already_gone += sweep.already_gone;
        self.failures.extend(sweep.failures);
    }

    pub fn absorb_folders(&mut self, sweep: FolderSweep) {
        self.markers_examined += sweep.markers_examined;
        self.upload_folders_removed += sweep.folders_removed;
        self.objects_deleted += sweep.objects_deleted;
        self.failures.extend(sweep.failures);
    }

    pub fn mark_incomplete(&mut self, prefix: impl Into<String>, reason: impl ToString) {
        self.incomplete.push(IncompleteRepository {
            prefix: prefix.into(),
            reason: reason.to_string(),
        });
    }

    /// Every repository was swept to the end of its listings
    pub fn is_complete(&self) -> bool {
        self.incomplete.is_empty()
    }
}

impl std::fmt::Display for GcReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let verb = if self.dry_run { "would be removed" } else { "removed" };

        writeln!(f, "Repositories scanned: {}", self.repositories)?;
        writeln!(
            f,
            "Upload folders {}: {} ({} markers examined, {} objects deleted)",
            verb, self.upload_folders_removed, self.markers_examined, self.objects_deleted
        )?;
        for failure in &self.failures {
            writeln!(
                f,
                "  FAILED {}: s3://{}/{}: {}",
                failure.kind, failure.bucket, failure.key, failure.message
            )?;
        }
        for repo in &self.incomplete {
            writeln!(f, "  INCOMPLETE {}: {}", repo.prefix, repo.reason)?;
        }
        if self.dry_run {
            writeln!(f, "  (dry run, threshold {} hours)", self.threshold_hours)?;
        }
        write!(f, "  Total MPUs removed: {}", self.multipart_removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absorb_sums_sweeps() {
        let mut report = GcReport::new(false, 3);
        report.absorb_multipart(MultipartSweep {
            examined: 4,
            removed: 2,
            already_gone: 1,
            failures: vec![ItemFailure::new(
                FailureKind::AbortUpload,
                "registry",
                "repoA/blob",
                "boom",
            )],
        });
        report.absorb_multipart(MultipartSweep {
            examined: 1,
            removed: 1,
            ..Default::default()
        });
        report.absorb_folders(FolderSweep {
            markers_examined: 2,
            folders_removed: 1,
            objects_deleted: 3,
            failures: vec![],
        });

        assert_eq!(report.multipart_examined, 5);
        assert_eq!(report.multipart_removed, 3);
        assert_eq!(report.multipart_already_gone, 1);
        assert_eq!(report.upload_folders_removed, 1);
        assert_eq!(report.objects_deleted, 3);
        assert_eq!(report.failures.len(), 1);
        assert!(report.is_complete());
    }

    #[test]
    fn test_summary_ends_with_mpu_total() {
        let mut report = GcReport::new(true, 3);
        report.multipart_removed = 7;
        report.mark_incomplete("repoB/", "listing failed");

        let text = report.to_string();
        assert!(text.ends_with("Total MPUs removed: 7"));
        assert!(text.contains("would be removed"));
        assert!(text.contains("INCOMPLETE repoB/"));
        assert!(!report.is_complete());
    }
}
