use anyhow::{anyhow, Context, Result};
use log::warn;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use walkdir::WalkDir;

// @module: File and directory utilities

/// Common video file extensions, lowercase
pub const VIDEO_EXTENSIONS: [&str; 14] = [
    "mp4", "mkv", "avi", "mov", "wmv", "flv", "webm", "m4v",
    "mpg", "mpeg", "ogv", "ts", "mts", "m2ts",
];

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_file()
    }

    // @checks: Directory existence
    pub fn dir_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_dir()
    }

    /// Check whether anything occupies a path, without following symlinks.
    ///
    /// A dangling symlink counts as present.
    pub fn entry_exists<P: AsRef<Path>>(path: P) -> bool {
        fs::symlink_metadata(path).is_ok()
    }

    /// Create a symbolic link at `link` pointing to `target`
    pub fn create_symlink<P1: AsRef<Path>, P2: AsRef<Path>>(target: P1, link: P2) -> io::Result<()> {
        platform_symlink(target.as_ref(), link.as_ref())
    }

    /// Copy `from` to `to` without ever overwriting `to`.
    ///
    /// The bytes land in a temporary file next to the destination first and are
    /// moved into place with a no-clobber rename, so a reader never sees a
    /// half-written destination.
    pub fn copy_file_no_clobber<P1: AsRef<Path>, P2: AsRef<Path>>(from: P1, to: P2) -> io::Result<u64> {
        let from = from.as_ref();
        let to = to.as_ref();
        let dir = match to.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut source = File::open(from)?;
        let mut staged = NamedTempFile::new_in(dir)?;
        let bytes = io::copy(&mut source, staged.as_file_mut())?;
        staged.as_file().sync_all()?;

        staged.persist_noclobber(to).map_err(|e| e.error)?;
        Ok(bytes)
    }

    /// Check whether a path has a known video extension
    pub fn is_video_file<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref()
            .extension()
            .map(|ext| {
                let ext = ext.to_string_lossy();
                VIDEO_EXTENSIONS.iter().any(|known| known.eq_ignore_ascii_case(&ext))
            })
            .unwrap_or(false)
    }

    /// Find video files below a directory, recursively.
    ///
    /// Unreadable entries below the directory are logged and skipped; a missing
    /// directory is an error.
    pub fn find_video_files<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
        let dir = dir.as_ref();
        if !Self::dir_exists(dir) {
            return Err(anyhow!("Library location does not exist: {:?}", dir));
        }

        let mut result = Vec::new();
        for entry in WalkDir::new(dir).follow_links(true) {
            match entry {
                Ok(entry) => {
                    if entry.file_type().is_file() && Self::is_video_file(entry.path()) {
                        result.push(entry.into_path());
                    }
                }
                Err(e) => warn!("Skipping unreadable entry under {:?}: {}", dir, e),
            }
        }

        Ok(result)
    }

    /// Read a file to a string
    pub fn read_to_string<P: AsRef<Path>>(path: P) -> Result<String> {
        fs::read_to_string(&path)
            .with_context(|| format!("Failed to read file: {:?}", path.as_ref()))
    }

    /// Write a string to a file, creating parent directories as needed
    pub fn write_to_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        fs::write(&path, content)
            .with_context(|| format!("Failed to write to file: {:?}", path.as_ref()))?;

        Ok(())
    }
}

#[cfg(unix)]
fn platform_symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn platform_symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(target, link)
}

#[cfg(not(any(unix, windows)))]
fn platform_symlink(_target: &Path, _link: &Path) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "symbolic links are not supported on this platform",
    ))
}
