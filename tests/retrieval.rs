//! Tests for playable-file retrieval, re-fetch after reload, and downloads

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{build_zip, stems_zip, Harness};
use stemshelf::library::MemoryStorage;
use stemshelf::{
    ArchivePayload, DownloadOutcome, FileUpload, IdentityChange, LibraryError, Session,
    StoreSettings,
};
use tempfile::TempDir;
use tokio_test::assert_ok;
use tokio_util::sync::CancellationToken;

const LINK: &str = "https://youtu.be/ccccccccccc";

fn harness_in(dir: &TempDir) -> Harness {
    let settings = StoreSettings {
        download_dir: dir.path().join("downloads"),
        ..StoreSettings::default()
    };
    let h = Harness::with_settings(Arc::new(MemoryStorage::new()), settings);
    h.backend.with_link(
        LINK,
        ArchivePayload::new(stems_zip())
            .with_title("Song")
            .with_cache_key("key-c"),
    );
    h.backend.with_cached("key-c", ArchivePayload::new(stems_zip()));
    h
}

#[tokio::test]
async fn test_retrieve_uses_live_handle() {
    let temp = TempDir::new().unwrap();
    let h = harness_in(&temp);
    let entry = h.store.add_from_link(LINK).await.unwrap();
    let calls = h.backend.calls().len();

    let handle = h
        .store
        .retrieve_playable_file(&entry.id, "vocals.wav")
        .await
        .unwrap();

    let original = entry
        .extracted_files
        .iter()
        .find(|f| f.filename == "song/vocals.wav")
        .and_then(|f| f.handle.clone())
        .unwrap();
    assert_eq!(handle, original);
    assert_eq!(h.backend.calls().len(), calls);
}

#[tokio::test]
async fn test_retrieve_after_reload_uses_cache_key() {
    let temp = TempDir::new().unwrap();
    let h = harness_in(&temp);
    let entry = h.store.add_from_link(LINK).await.unwrap();

    let reloaded = h.reload();
    let stored = reloaded.store.get(&entry.id).await.unwrap();
    assert_eq!(stored.title, "Song");
    assert!(!stored.has_handles());

    let handle = reloaded
        .store
        .retrieve_playable_file(&entry.id, "song/drums.wav")
        .await
        .unwrap();
    let blob = reloaded.blobs.resolve(&handle).unwrap();
    assert_eq!(blob.bytes.as_slice(), b"drums-bytes");
    assert!(h.backend.calls().contains(&"cache:key-c".to_string()));

    // Second retrieval reuses the attached handle
    let calls = h.backend.calls().len();
    let again = reloaded
        .store
        .retrieve_playable_file(&entry.id, "drums.wav")
        .await
        .unwrap();
    assert_eq!(again, handle);
    assert_eq!(h.backend.calls().len(), calls);
}

#[tokio::test]
async fn test_retrieve_after_reload_resubmits_link_without_cache_key() {
    let temp = TempDir::new().unwrap();
    let h = harness_in(&temp);
    let url = "https://youtu.be/ddddddddddd";
    h.backend
        .with_link(url, ArchivePayload::new(stems_zip()).with_title("No Key"));
    let entry = h.store.add_from_link(url).await.unwrap();

    let reloaded = h.reload();
    let handle = reloaded
        .store
        .retrieve_playable_file(&entry.id, "bass.wav")
        .await
        .unwrap();

    assert_eq!(reloaded.blobs.resolve(&handle).unwrap().bytes.as_slice(), b"bass-bytes");
    let submits = h
        .backend
        .calls()
        .iter()
        .filter(|c| *c == &format!("submit:{}", url))
        .count();
    assert_eq!(submits, 2);
}

#[tokio::test]
async fn test_retrieve_missing_member_is_not_found() {
    let temp = TempDir::new().unwrap();
    let h = harness_in(&temp);
    let entry = h.store.add_from_link(LINK).await.unwrap();
    let before = h.persisted();

    let reloaded = h.reload();
    let err = reloaded
        .store
        .retrieve_playable_file(&entry.id, "piano.wav")
        .await
        .unwrap_err();

    match err {
        LibraryError::NotFound { filename } => assert_eq!(filename, "piano.wav"),
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(reloaded.store.len().await, 1);
    assert_eq!(reloaded.persisted(), before);
    assert!(reloaded.blobs.is_empty());
}

#[tokio::test]
async fn test_missing_member_on_live_entry_does_not_refetch() {
    let temp = TempDir::new().unwrap();
    let h = harness_in(&temp);
    let url = "https://youtu.be/ddddddddddd";
    h.backend
        .with_link(url, ArchivePayload::new(stems_zip()).with_title("No Key"));
    let entry = h.store.add_from_link(url).await.unwrap();
    let calls = h.backend.calls();

    let err = h
        .store
        .retrieve_playable_file(&entry.id, "guitar.wav")
        .await
        .unwrap_err();

    match err {
        LibraryError::NotFound { filename } => assert_eq!(filename, "guitar.wav"),
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(h.backend.calls(), calls);
    assert_eq!(h.blobs.len(), 3);
}

#[tokio::test]
async fn test_retrieve_upload_without_cache_key_is_missing_source() {
    let temp = TempDir::new().unwrap();
    let h = harness_in(&temp);
    h.backend.with_upload(ArchivePayload::new(stems_zip()));
    let entry = h
        .store
        .add_from_file(FileUpload::new("mix.wav", b"RIFF".to_vec()))
        .await
        .unwrap();

    let reloaded = h.reload();
    let err = reloaded
        .store
        .retrieve_playable_file(&entry.id, "vocals.wav")
        .await
        .unwrap_err();
    assert!(matches!(err, LibraryError::MissingSource(_)));
}

#[tokio::test]
async fn test_retrieve_backend_failure_leaves_entry() {
    let temp = TempDir::new().unwrap();
    let h = harness_in(&temp);
    let entry = h.store.add_from_link(LINK).await.unwrap();

    let reloaded = h.reload();
    h.backend.fail_backend(500, None);
    let err = reloaded
        .store
        .retrieve_playable_file(&entry.id, "vocals.wav")
        .await
        .unwrap_err();
    assert!(matches!(err, LibraryError::Backend { status: 500, .. }));
    assert!(reloaded.store.get(&entry.id).await.is_some());

    h.backend.recover();
    assert_ok!(
        reloaded
            .store
            .retrieve_playable_file(&entry.id, "vocals.wav")
            .await
    );
}

#[tokio::test]
async fn test_retrieve_matches_nested_member() {
    let temp = TempDir::new().unwrap();
    let h = harness_in(&temp);
    h.backend.with_cached(
        "key-c",
        ArchivePayload::new(build_zip(
            &["out/", "out/htdemucs/"],
            &[("out/htdemucs/other.wav", b"other-bytes")],
        )),
    );
    let entry = h.store.add_from_link(LINK).await.unwrap();

    let reloaded = h.reload();
    let handle = reloaded
        .store
        .retrieve_playable_file(&entry.id, "htdemucs/other.wav")
        .await
        .unwrap();
    assert_eq!(reloaded.blobs.resolve(&handle).unwrap().bytes.as_slice(), b"other-bytes");

    let stored = reloaded.store.get(&entry.id).await.unwrap();
    assert!(stored
        .extracted_files
        .iter()
        .any(|f| f.filename == "out/htdemucs/other.wav" && f.handle.is_some()));
}

#[tokio::test]
async fn test_download_saves_file() {
    let temp = TempDir::new().unwrap();
    let h = harness_in(&temp);
    let entry = h.store.add_from_link(LINK).await.unwrap();

    let outcome = h
        .store
        .download_file(&entry.id, "vocals.wav", &CancellationToken::new())
        .await
        .unwrap();

    let expected = temp.path().join("downloads").join("vocals.wav");
    assert_eq!(outcome, DownloadOutcome::Saved(expected.clone()));
    assert_eq!(std::fs::read(&expected).unwrap(), b"vocals-bytes");

    let second = h
        .store
        .download_file(&entry.id, "vocals.wav", &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(
        second,
        DownloadOutcome::Saved(temp.path().join("downloads").join("vocals (1).wav"))
    );
}

#[tokio::test]
async fn test_download_precancelled() {
    let temp = TempDir::new().unwrap();
    let h = harness_in(&temp);
    let entry = h.store.add_from_link(LINK).await.unwrap();

    let cancel = CancellationToken::new();
    cancel.cancel();

    let outcome = h
        .store
        .download_file(&entry.id, "vocals.wav", &cancel)
        .await
        .unwrap();
    assert_eq!(outcome, DownloadOutcome::Cancelled);
    assert!(!temp.path().join("downloads").exists());
}

#[tokio::test(start_paused = true)]
async fn test_download_cancelled_during_fetch() {
    let temp = TempDir::new().unwrap();
    let h = harness_in(&temp);
    let entry = h.store.add_from_link(LINK).await.unwrap();

    let reloaded = h.reload();
    h.backend.set_delay(Duration::from_secs(10));

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        trigger.cancel();
    });

    let outcome = reloaded
        .store
        .download_file(&entry.id, "vocals.wav", &cancel)
        .await
        .unwrap();
    assert_eq!(outcome, DownloadOutcome::Cancelled);
    assert!(!temp.path().join("downloads").exists());
    assert!(reloaded.blobs.is_empty());
}

#[tokio::test]
async fn test_download_missing_member_fails() {
    let temp = TempDir::new().unwrap();
    let h = harness_in(&temp);
    let entry = h.store.add_from_link(LINK).await.unwrap();

    let err = h
        .reload()
        .store
        .download_file(&entry.id, "guitar.wav", &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, LibraryError::NotFound { .. }));
}

#[tokio::test]
async fn test_session_wipes_new_identity_and_releases_on_end() {
    let temp = TempDir::new().unwrap();
    let h = harness_in(&temp);
    h.store.add_from_link(LINK).await.unwrap();
    assert!(h.persisted().is_some());

    let mut session = Session::new(
        h.backend.clone(),
        h.storage.clone(),
        StoreSettings::default(),
    );

    // A returning user keeps the library
    let store = session
        .begin(IdentityChange::SignedIn { first_time: false })
        .await;
    assert_eq!(store.len().await, 1);

    // Handles created during the session go away on sign-out
    let id = store.entries().await[0].id.clone();
    let handle = store.retrieve_playable_file(&id, "vocals.wav").await.unwrap();
    assert!(store.blobs().resolve(&handle).is_some());
    session.end().await;
    assert!(store.blobs().resolve(&handle).is_none());
    assert!(session.store().is_none());

    // A new account starts empty
    let store = session.begin(IdentityChange::AccountCreated).await;
    assert!(store.is_empty().await);
    assert!(h.persisted().is_none());
}
