/*!
 * Tests for error types and conversions
 */

use std::error::Error;
use std::io;
use std::path::{Path, PathBuf};
use subfixer::errors::{HostError, ReconcileError};

/// Test that a copy failure points at the subtitle and keeps both causes
#[test]
fn test_copy_error_withBothCauses_shouldMentionBoth() {
    let err = ReconcileError::Copy {
        subtitle: PathBuf::from("/m/Foo/Subs/en.srt"),
        destination: PathBuf::from("/m/Foo/Foo.en.srt"),
        link_error: io::Error::other("cross-device link"),
        source: io::Error::new(io::ErrorKind::StorageFull, "disk full"),
    };

    assert_eq!(err.path(), Path::new("/m/Foo/Subs/en.srt"));
    assert_eq!(err.kind_label(), "copy");
    let message = err.to_string();
    assert!(message.contains("disk full"));
    assert!(message.contains("cross-device link"));
    assert!(err.source().is_some());
}

/// Test path and label for the other variants
#[test]
fn test_reconcile_error_path_withEachVariant_shouldPointAtSubject() {
    let path_error = ReconcileError::Path {
        path: PathBuf::from("Foo.mkv"),
    };
    assert_eq!(path_error.path(), Path::new("Foo.mkv"));
    assert_eq!(path_error.kind_label(), "path");

    let dir_error = ReconcileError::Directory {
        path: PathBuf::from("/m/Foo/Subs"),
        source: io::Error::from(io::ErrorKind::PermissionDenied),
    };
    assert_eq!(dir_error.path(), Path::new("/m/Foo/Subs"));
    assert_eq!(dir_error.kind_label(), "directory");

    let link_error = ReconcileError::Link {
        subtitle: PathBuf::from("/m/Foo/Subs/en.srt"),
        destination: PathBuf::from("/m/Foo/Foo.en.srt"),
        source: io::Error::from(io::ErrorKind::PermissionDenied),
    };
    assert_eq!(link_error.path(), Path::new("/m/Foo/Subs/en.srt"));
    assert_eq!(link_error.kind_label(), "link");
}

/// Test host error messages and the io conversion
#[test]
fn test_host_error_withApiErrorAndIo_shouldDescribeCause() {
    let api_error = HostError::ApiError {
        status_code: 401,
        message: "Unauthorized".to_string(),
    };
    assert_eq!(api_error.to_string(), "Host responded with error: 401 - Unauthorized");

    let io_error: HostError = io::Error::new(io::ErrorKind::NotFound, "no such library").into();
    assert!(matches!(io_error, HostError::Io(_)));
    assert!(io_error.to_string().contains("no such library"));
}
