//! Journal and advisory lock tests

use rolloutd::errors::RolloutError;
use rolloutd::journal::{Journal, RotationPolicy};
use rolloutd::lock::LockFile;

#[tokio::test]
async fn test_lines_are_timestamped_and_ordered() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rollout.log");

    let journal = Journal::open(&path, RotationPolicy::default())
        .await
        .unwrap();
    journal.log("first entry").await.unwrap();
    journal.log("second entry").await.unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 2);
    for line in &lines {
        assert!(line.starts_with('['));
        assert!(line.contains("] "));
    }
    assert!(lines[0].ends_with("first entry"));
    assert!(lines[1].ends_with("second entry"));
}

#[tokio::test]
async fn test_appends_across_reopens() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rollout.log");

    {
        let journal = Journal::open(&path, RotationPolicy::default())
            .await
            .unwrap();
        journal.log("run one").await.unwrap();
    }
    {
        let journal = Journal::open(&path, RotationPolicy::default())
            .await
            .unwrap();
        journal.log("run two").await.unwrap();
    }

    // Reopening must append, never truncate
    let contents = std::fs::read_to_string(&path).unwrap();
    assert!(contents.contains("run one"));
    assert!(contents.contains("run two"));
}

#[tokio::test]
async fn test_rotation_keeps_one_generation() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rollout.log");

    // Each line is ~54 bytes; the second append crosses the threshold
    let journal = Journal::open(&path, RotationPolicy { max_bytes: Some(100) })
        .await
        .unwrap();
    let message = "x".repeat(30);
    journal.log(&message).await.unwrap();
    journal.log(&message).await.unwrap();

    let rotated = dir.path().join("rollout.log.1");
    assert!(rotated.exists());

    // The rotated generation holds the first line, the live file the second
    let old = std::fs::read_to_string(&rotated).unwrap();
    let new = std::fs::read_to_string(&path).unwrap();
    assert_eq!(old.lines().count(), 1);
    assert_eq!(new.lines().count(), 1);
}

#[tokio::test]
async fn test_open_fails_fast_on_unusable_path() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, b"file").unwrap();

    // Parent path is a file; the journal must refuse to open
    let result = Journal::open(blocker.join("rollout.log"), RotationPolicy::default()).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_lock_rejects_second_holder() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rollout.lock");

    let _held = LockFile::acquire(&path).await.unwrap();
    let second = LockFile::acquire(&path).await;

    assert!(matches!(second, Err(RolloutError::LockError(_))));
}

#[tokio::test]
async fn test_lock_released_on_drop() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rollout.lock");

    {
        let _held = LockFile::acquire(&path).await.unwrap();
        assert!(path.exists());
    }

    assert!(!path.exists());
    // A fresh acquire succeeds after release
    let _reacquired = LockFile::acquire(&path).await.unwrap();
}
