use chrono::{DateTime, Utc};

use crate::domain::value_objects::ObjectKey;

/// Path segment that introduces the registry's in-progress upload area
pub const UPLOADS_SEGMENT: &str = "/_uploads/";

/// Suffix of the marker object recording when an upload started
pub const STARTED_AT_SUFFIX: &str = "/startedat";

/// One in-progress multipart upload, as listed by the store.
///
/// Fields are kept as reported; a record missing its key or upload id
/// cannot be aborted and is surfaced as a failure by the reaper.
#[derive(Debug, Clone, PartialEq)]
pub struct MultipartUploadRecord {
    pub key: Option<String>,
    pub upload_id: Option<String>,
    /// `None` when the store omitted or garbled the `Initiated` field
    pub initiated_at: Option<DateTime<Utc>>,
}

/// One entry of a flat object listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectSummary {
    pub key: String,
}

/// Whether `key` is the `startedat` marker of an upload folder
///
/// The marker must sit one folder below `/_uploads/`, so that its folder
/// prefix never covers the whole upload area of a repository.
pub fn is_started_at_marker(key: &str) -> bool {
    let Some(folder) = key.strip_suffix(STARTED_AT_SUFFIX) else {
        return false;
    };
    folder.contains(UPLOADS_SEGMENT)
        && folder
            .rsplit_once('/')
            .is_some_and(|(_, upload_id)| !upload_id.is_empty())
}

/// A `startedat` marker whose content has been read and aged
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFolderMarker {
    pub key: ObjectKey,
    pub age_hours: i64,
}

impl UploadFolderMarker {
    pub fn new(key: ObjectKey, age_hours: i64) -> Self {
        Self { key, age_hours }
    }

    /// Prefix shared by every object of the upload folder this marker
    /// belongs to: `.../_uploads/<id>/startedat` -> `.../_uploads/<id>/`.
    ///
    /// The trailing delimiter keeps `<id>` from matching sibling folders
    /// whose id merely starts with it.
    pub fn folder_prefix(&self) -> String {
        match self.key.parent() {
            Some(parent) => format!("{}/", parent),
            None => self.key.as_str().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_detection() {
        assert!(is_started_at_marker("repoA/_uploads/abc123/startedat"));
        assert!(is_started_at_marker(
            "docker/registry/v2/repositories/library/ubuntu/_uploads/x/startedat"
        ));
        assert!(!is_started_at_marker("repoA/_uploads/abc123/data"));
        assert!(!is_started_at_marker("repoA/_layers/abc123/startedat"));
        assert!(!is_started_at_marker("repoA/_uploads/abc123/startedat.bak"));
        assert!(!is_started_at_marker("_uploads/abc123/startedat"));
        assert!(!is_started_at_marker("repoA/_uploads/startedat"));
        assert!(!is_started_at_marker("repoA/_uploads//startedat"));
    }

    #[test]
    fn test_folder_prefix() {
        let marker =
            UploadFolderMarker::new(ObjectKey::new("repoA/_uploads/abc123/startedat").unwrap(), 10);
        assert_eq!(marker.folder_prefix(), "repoA/_uploads/abc123/");
    }
}
