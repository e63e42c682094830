use serde::{Deserialize, Serialize};
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

/// How a subtitle's filename is turned into a sibling filename
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum NamingMode {
    /// `Movie.mkv` + `sub/track.en.srt` -> `Movie.en.srt`
    #[default]
    ReplaceBaseName,
    /// `Movie.mkv` + `sub/track.en.srt` -> `Movie.track.en.srt`
    AppendFileName,
}

impl NamingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReplaceBaseName => "replace_base_name",
            Self::AppendFileName => "append_file_name",
        }
    }
}

impl std::fmt::Display for NamingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Computes where a subtitle's sibling goes. Pure, no I/O.
#[derive(Debug, Default, Clone, Copy)]
pub struct DestinationNamer {
    mode: NamingMode,
}

impl DestinationNamer {
    pub fn new(mode: NamingMode) -> Self {
        Self { mode }
    }

    /// Sibling path for `subtitle_path`, placed in the movie's own directory
    pub fn compute_destination(&self, movie_path: &Path, subtitle_path: &Path) -> PathBuf {
        let mut destination = remove_extension(movie_path).into_os_string();
        let file_name = subtitle_path.file_name().unwrap_or_default();

        match self.mode {
            NamingMode::ReplaceBaseName => destination.push(dotted_tail(file_name)),
            NamingMode::AppendFileName => {
                destination.push(".");
                destination.push(file_name);
            }
        }

        PathBuf::from(destination)
    }

    /// Alternative destination for a subtitle whose usual one was already
    /// claimed by another subtitle of the same movie. Only the lossy
    /// `ReplaceBaseName` mode has one.
    pub fn collision_destination(&self, movie_path: &Path, subtitle_path: &Path) -> Option<PathBuf> {
        match self.mode {
            NamingMode::ReplaceBaseName => {
                Some(Self::new(NamingMode::AppendFileName).compute_destination(movie_path, subtitle_path))
            }
            NamingMode::AppendFileName => None,
        }
    }
}

/// Strip the final extension by plain suffix match; anything that does not end
/// in `.<extension>` comes back unchanged.
pub fn remove_extension(path: &Path) -> PathBuf {
    let Some(extension) = path.extension() else {
        return path.to_path_buf();
    };

    match (path.to_str(), extension.to_str()) {
        (Some(full), Some(extension)) => {
            let suffix = format!(".{}", extension);
            full.strip_suffix(suffix.as_str())
                .map(PathBuf::from)
                .unwrap_or_else(|| path.to_path_buf())
        }
        _ => path.with_extension(""),
    }
}

// Everything from the first dot on: "track.en.srt" -> ".en.srt"
fn dotted_tail(file_name: &OsStr) -> OsString {
    match file_name.to_str() {
        Some(name) => match name.find('.') {
            Some(index) => OsString::from(&name[index..]),
            None => OsString::from(format!(".{}", name)),
        },
        None => {
            // non-UTF-8 name: keep at least the extension intact
            let mut tail = OsString::from(".");
            tail.push(Path::new(file_name).extension().unwrap_or_default());
            tail
        }
    }
}
