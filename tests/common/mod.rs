#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use registry_upload_gc::{
    create_in_memory_app,
    domain::{time::format_started_at, value_objects::REPOSITORIES_PATH},
    AppServices, BucketName, CleanupPolicy, FixedClock, InMemoryRegistryStore, RepositoryPrefix,
};

pub const BUCKET: &str = "registry";

pub fn bucket() -> BucketName {
    BucketName::new(BUCKET).unwrap()
}

pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

pub fn hours_ago(hours: i64) -> DateTime<Utc> {
    now() - Duration::hours(hours)
}

pub fn repository(repo: &str) -> RepositoryPrefix {
    RepositoryPrefix::new(format!("{}{}/", REPOSITORIES_PATH, repo)).unwrap()
}

pub fn folder(repo: &str, upload_id: &str) -> String {
    format!("{}{}/_uploads/{}/", REPOSITORIES_PATH, repo, upload_id)
}

pub fn marker(repo: &str, upload_id: &str) -> String {
    format!("{}startedat", folder(repo, upload_id))
}

pub fn policy(threshold_hours: u32, dry_run: bool) -> CleanupPolicy {
    CleanupPolicy::builder()
        .threshold_hours(threshold_hours)
        .dry_run(dry_run)
        .build()
}

pub async fn services(store: &InMemoryRegistryStore, policy: CleanupPolicy) -> AppServices {
    create_in_memory_app(store.clone(), BUCKET, policy, Arc::new(FixedClock(now())))
        .await
        .unwrap()
}

/// A repository with one layer link, so it shows up in the grouped listing
pub async fn seed_repository(store: &InMemoryRegistryStore, repo: &str) {
    store
        .put_object(
            &bucket(),
            &format!("{}{}/_layers/sha256/abc/link", REPOSITORIES_PATH, repo),
            "sha256:abc",
        )
        .await;
}

/// An upload folder with a marker, a data object and a hash state
pub async fn seed_upload_folder(
    store: &InMemoryRegistryStore,
    repo: &str,
    upload_id: &str,
    started_at: DateTime<Utc>,
) {
    let folder = folder(repo, upload_id);
    store
        .put_object(&bucket(), &marker(repo, upload_id), format_started_at(started_at))
        .await;
    store
        .put_object(&bucket(), &format!("{}data", folder), "partial blob")
        .await;
    store
        .put_object(&bucket(), &format!("{}hashstates/sha256/0", folder), "state")
        .await;
}

/// An in-progress multipart upload for the data object of an upload folder
pub async fn seed_multipart_upload(
    store: &InMemoryRegistryStore,
    repo: &str,
    upload_id: &str,
    initiated_at: Option<DateTime<Utc>>,
) -> String {
    let key = format!("{}data", folder(repo, upload_id));
    store
        .create_multipart_upload(&bucket(), &key, &format!("mpu-{}", upload_id), initiated_at)
        .await;
    key
}

pub async fn keys_under(store: &InMemoryRegistryStore, prefix: &str) -> Vec<String> {
    store
        .object_keys(&bucket())
        .await
        .into_iter()
        .filter(|key| key.starts_with(prefix))
        .collect()
}
