mod common;

use common::*;
use registry_upload_gc::{
    adapters::outbound::storage::{Fault, InMemoryRegistryStore, StoreOperation},
    domain::models::{Deadline, FailureKind},
};

#[tokio::test]
async fn removes_folder_with_old_marker() {
    let store = InMemoryRegistryStore::new();
    seed_repository(&store, "app").await;
    seed_upload_folder(&store, "app", "u1", hours_ago(10)).await;

    let services = services(&store, policy(3, false)).await;
    let sweep = services
        .folder_reaper
        .reap(&repository("app"), &Deadline::none())
        .await
        .unwrap();

    assert_eq!(sweep.markers_examined, 1);
    assert_eq!(sweep.folders_removed, 1);
    assert_eq!(sweep.objects_deleted, 3);
    assert!(sweep.failures.is_empty());
    assert!(keys_under(&store, &folder("app", "u1")).await.is_empty());

    // Repository content outside the upload folder is untouched
    assert_eq!(keys_under(&store, repository("app").as_str()).await.len(), 1);
}

#[tokio::test]
async fn keeps_folder_younger_than_threshold() {
    let store = InMemoryRegistryStore::new();
    seed_upload_folder(&store, "app", "u1", hours_ago(10)).await;

    let services = services(&store, policy(12, false)).await;
    let sweep = services
        .folder_reaper
        .reap(&repository("app"), &Deadline::none())
        .await
        .unwrap();

    assert_eq!(sweep.markers_examined, 1);
    assert_eq!(sweep.folders_removed, 0);
    assert_eq!(keys_under(&store, &folder("app", "u1")).await.len(), 3);
    assert!(store.mutations().await.is_empty());
}

#[tokio::test]
async fn marker_is_deleted_last() {
    let store = InMemoryRegistryStore::new();
    seed_upload_folder(&store, "app", "u1", hours_ago(10)).await;

    let services = services(&store, policy(3, false)).await;
    services
        .folder_reaper
        .reap(&repository("app"), &Deadline::none())
        .await
        .unwrap();

    let deletes = store.mutations().await;
    assert_eq!(deletes.len(), 3);
    assert!(deletes
        .iter()
        .all(|call| call.operation == StoreOperation::DeleteObject));
    assert_eq!(deletes[2].target, marker("app", "u1"));
}

#[tokio::test]
async fn unparseable_marker_deletes_nothing() {
    let store = InMemoryRegistryStore::new();
    seed_upload_folder(&store, "app", "u1", hours_ago(10)).await;
    store
        .put_object(&bucket(), &marker("app", "u1"), "not a timestamp")
        .await;

    let services = services(&store, policy(3, false)).await;
    let sweep = services
        .folder_reaper
        .reap(&repository("app"), &Deadline::none())
        .await
        .unwrap();

    assert_eq!(sweep.folders_removed, 0);
    assert_eq!(sweep.failures.len(), 1);
    assert_eq!(sweep.failures[0].kind, FailureKind::MarkerParse);
    assert_eq!(sweep.failures[0].key, marker("app", "u1"));
    assert!(store.mutations().await.is_empty());
}

#[tokio::test]
async fn unreadable_marker_deletes_nothing() {
    let store = InMemoryRegistryStore::new();
    seed_upload_folder(&store, "app", "u1", hours_ago(10)).await;
    store
        .fail(StoreOperation::GetObject, &marker("app", "u1"))
        .await;

    let services = services(&store, policy(3, false)).await;
    let sweep = services
        .folder_reaper
        .reap(&repository("app"), &Deadline::none())
        .await
        .unwrap();

    assert_eq!(sweep.folders_removed, 0);
    assert_eq!(sweep.failures.len(), 1);
    assert_eq!(sweep.failures[0].kind, FailureKind::MarkerRead);
    assert!(store.mutations().await.is_empty());
}

#[tokio::test]
async fn sibling_folder_sharing_an_id_prefix_is_untouched() {
    let store = InMemoryRegistryStore::new();
    seed_upload_folder(&store, "app", "abc", hours_ago(10)).await;
    seed_upload_folder(&store, "app", "abcd", hours_ago(1)).await;

    let services = services(&store, policy(3, false)).await;
    let sweep = services
        .folder_reaper
        .reap(&repository("app"), &Deadline::none())
        .await
        .unwrap();

    assert_eq!(sweep.markers_examined, 2);
    assert_eq!(sweep.folders_removed, 1);
    assert!(keys_under(&store, &folder("app", "abc")).await.is_empty());
    assert_eq!(keys_under(&store, &folder("app", "abcd")).await.len(), 3);
}

#[tokio::test]
async fn failed_delete_keeps_marker_for_next_run() {
    let store = InMemoryRegistryStore::new();
    seed_upload_folder(&store, "app", "u1", hours_ago(10)).await;
    let data = format!("{}data", folder("app", "u1"));
    store.fail(StoreOperation::DeleteObject, &data).await;

    let services = services(&store, policy(3, false)).await;
    let sweep = services
        .folder_reaper
        .reap(&repository("app"), &Deadline::none())
        .await
        .unwrap();

    assert_eq!(sweep.folders_removed, 0);
    assert_eq!(sweep.failures.len(), 1);
    assert_eq!(sweep.failures[0].kind, FailureKind::FolderDelete);
    assert_eq!(sweep.failures[0].key, data);

    let remaining = keys_under(&store, &folder("app", "u1")).await;
    assert!(remaining.contains(&marker("app", "u1")));
    assert!(remaining.contains(&data));
}

#[tokio::test]
async fn failed_folder_listing_deletes_nothing() {
    let store = InMemoryRegistryStore::new();
    seed_upload_folder(&store, "app", "u1", hours_ago(10)).await;
    store
        .fail(StoreOperation::ListObjects, &folder("app", "u1"))
        .await;

    let sweep = services(&store, policy(3, false))
        .await
        .folder_reaper
        .reap(&repository("app"), &Deadline::none())
        .await
        .unwrap();

    assert_eq!(sweep.markers_examined, 1);
    assert_eq!(sweep.folders_removed, 0);
    assert_eq!(sweep.failures.len(), 1);
    assert_eq!(sweep.failures[0].kind, FailureKind::FolderList);
    assert_eq!(sweep.failures[0].key, folder("app", "u1"));
    assert!(store.mutations().await.is_empty());
    assert!(keys_under(&store, &folder("app", "u1"))
        .await
        .contains(&marker("app", "u1")));
}

#[tokio::test]
async fn stalled_folder_listing_deletes_nothing() {
    let store = InMemoryRegistryStore::with_page_cap(1);
    seed_upload_folder(&store, "app", "u1", hours_ago(10)).await;
    store
        .inject(StoreOperation::ListObjects, &folder("app", "u1"), Fault::Stall, 0)
        .await;

    let sweep = services(&store, policy(3, false))
        .await
        .folder_reaper
        .reap(&repository("app"), &Deadline::none())
        .await
        .unwrap();

    assert_eq!(sweep.folders_removed, 0);
    assert_eq!(sweep.failures.len(), 1);
    assert_eq!(sweep.failures[0].kind, FailureKind::FolderList);
    assert!(store.mutations().await.is_empty());
    assert_eq!(keys_under(&store, &folder("app", "u1")).await.len(), 3);
}

#[tokio::test]
async fn dry_run_neither_lists_nor_deletes_folders() {
    let store = InMemoryRegistryStore::new();
    seed_upload_folder(&store, "app", "u1", hours_ago(10)).await;
    seed_upload_folder(&store, "app", "u2", hours_ago(1)).await;

    let services = services(&store, policy(3, true)).await;
    let sweep = services
        .folder_reaper
        .reap(&repository("app"), &Deadline::none())
        .await
        .unwrap();

    assert_eq!(sweep.markers_examined, 2);
    assert_eq!(sweep.folders_removed, 1);
    assert_eq!(sweep.objects_deleted, 0);
    assert!(store.mutations().await.is_empty());

    let folder_listings = store
        .calls()
        .await
        .into_iter()
        .filter(|call| call.operation == StoreOperation::ListObjects)
        .filter(|call| call.target == folder("app", "u1"))
        .count();
    assert_eq!(folder_listings, 0);
}

#[tokio::test]
async fn large_folder_is_removed_across_pages() {
    let store = InMemoryRegistryStore::with_page_cap(2);
    seed_upload_folder(&store, "app", "u1", hours_ago(10)).await;
    for part in 1..=4 {
        store
            .put_object(
                &bucket(),
                &format!("{}hashstates/sha256/{}", folder("app", "u1"), part),
                "state",
            )
            .await;
    }

    let services = services(&store, policy(3, false)).await;
    let sweep = services
        .folder_reaper
        .reap(&repository("app"), &Deadline::none())
        .await
        .unwrap();

    assert_eq!(sweep.folders_removed, 1);
    assert_eq!(sweep.objects_deleted, 7);
    assert!(keys_under(&store, &folder("app", "u1")).await.is_empty());
}

#[tokio::test]
async fn second_run_finds_nothing() {
    let store = InMemoryRegistryStore::new();
    seed_upload_folder(&store, "app", "u1", hours_ago(10)).await;

    let services = services(&store, policy(3, false)).await;
    services
        .folder_reaper
        .reap(&repository("app"), &Deadline::none())
        .await
        .unwrap();
    let before = store.mutations().await.len();

    let sweep = services
        .folder_reaper
        .reap(&repository("app"), &Deadline::none())
        .await
        .unwrap();

    assert_eq!(sweep.markers_examined, 0);
    assert_eq!(sweep.folders_removed, 0);
    assert_eq!(store.mutations().await.len(), before);
}

#[tokio::test]
async fn ten_hour_old_folder_against_two_thresholds() {
    use chrono::{TimeZone, Utc};
    use registry_upload_gc::{create_in_memory_app, FixedClock};
    use std::sync::Arc;

    let clock = Arc::new(FixedClock(Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap()));
    let marker_key = "repoA/_uploads/abc123/startedat";

    for (threshold, expect_removed) in [(3, true), (12, false)] {
        let store = InMemoryRegistryStore::new();
        store
            .put_object(&bucket(), marker_key, "2024-01-01T00:00:00Z")
            .await;
        store
            .put_object(&bucket(), "repoA/_uploads/abc123/data", "partial blob")
            .await;
        store
            .put_object(&bucket(), "repoA/_layers/sha256/abc/link", "sha256:abc")
            .await;

        let services =
            create_in_memory_app(store.clone(), BUCKET, policy(threshold, false), clock.clone())
                .await
                .unwrap();
        let sweep = services
            .folder_reaper
            .reap(
                &registry_upload_gc::RepositoryPrefix::new("repoA/").unwrap(),
                &Deadline::none(),
            )
            .await
            .unwrap();

        let remaining = keys_under(&store, "repoA/_uploads/abc123/").await;
        if expect_removed {
            assert_eq!(sweep.folders_removed, 1);
            assert!(remaining.is_empty());
        } else {
            assert_eq!(sweep.folders_removed, 0);
            assert_eq!(remaining.len(), 2);
        }
        assert_eq!(keys_under(&store, "repoA/_layers/").await.len(), 1);
    }
}
