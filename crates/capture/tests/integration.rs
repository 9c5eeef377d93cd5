//! Integration tests for the file capture service

use pakt_capture::FileCapture;
use pakt_errors::{CaptureError, Error};
use pakt_events::{EventBus, LockedFileWarning};
use pakt_hash::Hash;
use pakt_manifest::Checksum;
use pakt_types::{PackageId, Version};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

fn package() -> PackageId {
    PackageId::new("demo", Version::new(1, 2, 3))
}

#[tokio::test]
async fn test_capture_nested_tree_in_order() {
    let dir = tempfile::TempDir::new().unwrap();
    std::fs::create_dir(dir.path().join("sub")).unwrap();
    std::fs::write(dir.path().join("zeta.txt"), b"zeta").unwrap();
    std::fs::write(dir.path().join("alpha.txt"), b"alpha").unwrap();
    std::fs::write(dir.path().join("sub/inner.txt"), b"inner").unwrap();

    let capture = FileCapture::new(EventBus::new());
    let manifest = capture.capture(dir.path(), &package()).await.unwrap();

    assert_eq!(manifest.len(), 3);
    let paths: Vec<&PathBuf> = manifest.iter().map(|entry| &entry.path).collect();
    assert_eq!(
        *paths,
        vec![
            &dir.path().join("alpha.txt"),
            &dir.path().join("sub/inner.txt"),
            &dir.path().join("zeta.txt"),
        ]
    );

    let alpha = manifest.find(&dir.path().join("alpha.txt")).unwrap();
    assert_eq!(
        alpha.checksum.as_hash(),
        Some(&Hash::from_data(b"alpha"))
    );
    assert_eq!(alpha.size, 5);
}

#[tokio::test]
async fn test_identical_content_identical_checksum() {
    let dir = tempfile::TempDir::new().unwrap();
    std::fs::write(dir.path().join("one.bin"), b"same bytes").unwrap();
    std::fs::write(dir.path().join("two.bin"), b"same bytes").unwrap();

    let capture = FileCapture::new(EventBus::new());
    let manifest = capture.capture(dir.path(), &package()).await.unwrap();

    let checksums: Vec<&Checksum> = manifest.iter().map(|entry| &entry.checksum).collect();
    assert_eq!(checksums[0], checksums[1]);
}

#[tokio::test]
async fn test_empty_root_yields_empty_manifest() {
    let dir = tempfile::TempDir::new().unwrap();
    let capture = FileCapture::new(EventBus::new());
    let manifest = capture.capture(dir.path(), &package()).await.unwrap();
    assert!(manifest.is_empty());
    assert_eq!(manifest.package, package());
}

#[tokio::test]
async fn test_missing_root_is_fatal() {
    let capture = FileCapture::new(EventBus::new());
    let err = capture
        .capture(std::path::Path::new("/nonexistent/pakt/root"), &package())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Capture(CaptureError::RootNotFound { .. })
    ));
}

#[tokio::test]
async fn test_file_root_is_fatal() {
    let dir = tempfile::TempDir::new().unwrap();
    let file = dir.path().join("not-a-dir");
    std::fs::write(&file, b"x").unwrap();

    let capture = FileCapture::new(EventBus::new());
    let err = capture.capture(&file, &package()).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Capture(CaptureError::RootNotADirectory { .. })
    ));
}

#[cfg(unix)]
#[tokio::test]
async fn test_unreadable_file_degrades_to_sentinel_with_one_warning() {
    use std::fs::File;
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::TempDir::new().unwrap();
    std::fs::write(dir.path().join("readable.txt"), b"fine").unwrap();
    let busy = dir.path().join("busy.dat");
    std::fs::write(&busy, b"locked contents").unwrap();
    std::fs::set_permissions(&busy, std::fs::Permissions::from_mode(0o000)).unwrap();

    // Permission-based lock simulation is a no-op for root; nothing to
    // observe in that case.
    if File::open(&busy).is_ok() {
        return;
    }

    let bus = EventBus::new();
    let warnings = Arc::new(Mutex::new(Vec::new()));
    {
        let warnings = Arc::clone(&warnings);
        bus.subscribe(move |warning: &LockedFileWarning| {
            warnings.lock().unwrap().push(warning.clone());
            Ok(())
        });
    }

    let capture = FileCapture::new(bus);
    let manifest = capture.capture(dir.path(), &package()).await.unwrap();

    // The locked file is never silently dropped: exactly two entries, one
    // real checksum, one sentinel.
    assert_eq!(manifest.len(), 2);
    let readable = manifest.find(&dir.path().join("readable.txt")).unwrap();
    assert!(!readable.checksum.is_locked());
    let locked = manifest.find(&busy).unwrap();
    assert!(locked.checksum.is_locked());
    assert_eq!(manifest.locked_files().count(), 1);

    let warnings = warnings.lock().unwrap();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].path, busy);
    assert!(!warnings[0].os_error.is_empty());
}

#[cfg(unix)]
#[tokio::test]
async fn test_symlinks_are_skipped() {
    let dir = tempfile::TempDir::new().unwrap();
    std::fs::write(dir.path().join("real.txt"), b"real").unwrap();
    std::os::unix::fs::symlink(
        dir.path().join("real.txt"),
        dir.path().join("link.txt"),
    )
    .unwrap();
    // A directory symlink cycle must not trap the scan.
    std::os::unix::fs::symlink(dir.path(), dir.path().join("loop")).unwrap();

    let capture = FileCapture::new(EventBus::new());
    let manifest = capture.capture(dir.path(), &package()).await.unwrap();

    assert_eq!(manifest.len(), 1);
    assert!(manifest.find(&dir.path().join("real.txt")).is_some());
}

#[tokio::test]
async fn test_manifest_is_stable_after_return() {
    let dir = tempfile::TempDir::new().unwrap();
    std::fs::write(dir.path().join("kept.txt"), b"kept").unwrap();

    let capture = FileCapture::new(EventBus::new());
    let manifest = capture.capture(dir.path(), &package()).await.unwrap();

    // Mutating the directory afterwards does not change the manifest.
    std::fs::write(dir.path().join("late.txt"), b"late").unwrap();
    std::fs::remove_file(dir.path().join("kept.txt")).unwrap();

    assert_eq!(manifest.len(), 1);
    assert!(manifest.find(&dir.path().join("kept.txt")).is_some());
}
