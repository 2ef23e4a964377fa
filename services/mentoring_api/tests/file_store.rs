//! services/mentoring_api/tests/file_store.rs
//!
//! Drives the record operations against the on-disk store.

use mentoring_api_lib::adapters::FileStore;
use mentoring_core::tracker::{self, Limits};
use mentoring_core::{
    apply_import, build_export_document, parse_import, ImportPolicy, LocalStore, ProfileContext,
    MilestoneDraft, ProfileDraft, RecordKey, RecordStore, Role, SessionDraft, TrackerError,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::TempDir;

async fn open_store() -> (TempDir, FileStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::open(dir.path().join("data")).await.unwrap();
    (dir, store)
}

fn mentor(name: &str) -> ProfileDraft {
    ProfileDraft {
        name: name.to_string(),
        role: Some(Role::Mentor),
        ..Default::default()
    }
}

#[tokio::test]
async fn corrupted_record_reads_as_absent() {
    let (_dir, store) = open_store().await;
    std::fs::write(store.path_for(RecordKey::Profile), "{not json").unwrap();

    assert_eq!(store.get(RecordKey::Profile).await, None);
    assert!(store.profile().await.is_none());
    assert!(matches!(
        ProfileContext::load(&store).await,
        Err(TrackerError::ProfileRequired)
    ));
}

#[tokio::test]
async fn records_survive_reopening_the_store() {
    let (dir, store) = open_store().await;
    tracker::save_profile(&store, mentor("Ana")).await.unwrap();
    let ctx = ProfileContext::load(&store).await.unwrap();
    tracker::add_session(
        &store,
        &ctx,
        Limits::default(),
        SessionDraft {
            topics: Some("Intro".into()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    drop(store);

    let reopened = FileStore::open(dir.path().join("data")).await.unwrap();
    let ctx = ProfileContext::load(&reopened).await.unwrap();
    assert_eq!(ctx.profile().name, "Ana");
    let sessions = tracker::list_sessions(&reopened, &ctx).await.unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].session_number, 1);
}

#[tokio::test]
async fn clear_all_removes_every_record() {
    let (_dir, store) = open_store().await;
    tracker::save_profile(&store, mentor("Ana")).await.unwrap();
    store.set_privacy_dismissed(true).await.unwrap();

    store.clear_all().await.unwrap();

    for key in RecordKey::ALL {
        assert!(!store.path_for(key).exists(), "{} should be gone", key);
    }
    assert!(!store.privacy_dismissed().await);
}

#[tokio::test]
async fn replace_import_rewrites_the_directory() {
    let (_dir, store) = open_store().await;
    tracker::save_profile(&store, mentor("Ana")).await.unwrap();
    store
        .set(RecordKey::Goals, json!({ "timeline": "6 weeks" }))
        .await
        .unwrap();
    store.set_privacy_dismissed(true).await.unwrap();

    let document = json!({
        "version": "1.0",
        "exportedAt": "2025-01-01T00:00:00.000Z",
        "exportedBy": "mentee",
        "profile": { "name": "Sam", "role": "mentee" },
        "sessions": [{ "id": "s1", "sessionNumber": 1, "topics": "Resume" }]
    });
    let summary = apply_import(&store, &document, ImportPolicy::Replace)
        .await
        .unwrap();

    assert!(summary.profile_written);
    assert_eq!(summary.sessions_added, 1);
    assert_eq!(store.profile().await.unwrap().name, "Sam");
    assert!(!store.path_for(RecordKey::Goals).exists());
    assert!(!store.path_for(RecordKey::PrivacyDismissed).exists());
    assert_eq!(store.get(RecordKey::Milestones).await, Some(json!([])));
}

#[tokio::test]
async fn merge_import_keeps_the_local_profile() {
    let (_dir, store) = open_store().await;
    tracker::save_profile(&store, mentor("Ana")).await.unwrap();

    let document = json!({
        "version": "1.0",
        "profile": { "name": "Someone Else", "role": "mentee" },
        "milestones": [{ "id": "m1", "achievement": "Passed Security+" }]
    });
    let summary = apply_import(&store, &document, ImportPolicy::Merge)
        .await
        .unwrap();

    assert!(!summary.profile_written);
    assert_eq!(summary.milestones_added, 1);
    assert_eq!(store.profile().await.unwrap().name, "Ana");
    assert_eq!(store.milestones().await.unwrap()[0].achievement, "Passed Security+");
}

#[tokio::test]
async fn export_restores_into_an_empty_store() {
    let (_dir, source) = open_store().await;
    tracker::save_profile(&source, mentor("Ana")).await.unwrap();
    let ctx = ProfileContext::load(&source).await.unwrap();
    tracker::add_session(&source, &ctx, Limits::default(), SessionDraft::default())
        .await
        .unwrap();

    let text = build_export_document(&source).await.to_pretty_json().unwrap();

    let (_other_dir, target) = open_store().await;
    apply_import(&target, &parse_import(&text).unwrap(), ImportPolicy::Replace)
        .await
        .unwrap();

    assert_eq!(target.profile().await, source.profile().await);
    assert_eq!(target.sessions().await, source.sessions().await);
    assert_eq!(target.milestones().await, Some(Vec::new()));
}

#[tokio::test]
async fn entries_written_by_a_merge_survive_the_next_edit() {
    let (_dir, store) = open_store().await;
    tracker::save_profile(&store, mentor("Ana")).await.unwrap();
    std::fs::write(
        store.path_for(RecordKey::Milestones),
        r#"[{"id":"legacy","note":"kept from an older version"}]"#,
    )
    .unwrap();
    let document = json!({
        "version": "1.0",
        "milestones": [{ "achievement": "Applied to 5 roles" }]
    });
    apply_import(&store, &document, ImportPolicy::Merge)
        .await
        .unwrap();

    let ctx = ProfileContext::load(&store).await.unwrap();
    let listed = tracker::list_milestones(&store, &ctx).await.unwrap();
    let merged_id = listed[0].id.clone();
    tracker::add_milestone(
        &store,
        &ctx,
        Limits::default(),
        MilestoneDraft {
            achievement: "Passed Security+".into(),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    tracker::delete_milestone(&store, &ctx, &merged_id).await.unwrap();

    let stored = store.get(RecordKey::Milestones).await.unwrap();
    let stored = stored.as_array().unwrap();
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0]["id"], "legacy");
    assert_eq!(stored[1]["achievement"], "Passed Security+");
}
