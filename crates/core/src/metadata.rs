use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFile {
    pub path: PathBuf,
    pub kind: MediaKind,
}

impl MediaFile {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|v| v.to_string_lossy().to_string())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Result of asking a timestamp source for a file's embedded date.
///
/// `Missing` is the ordinary "no metadata" case. `Failed` means the reader
/// could not decode the file at all; both end up treated as absent, but
/// failures are worth a log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    Found(NaiveDate),
    Missing,
    Failed(String),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DateSource {
    Embedded,
    FileModified,
    Manual,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DateEvidence {
    pub path: PathBuf,
    pub date: Option<NaiveDate>,
    pub source: Option<DateSource>,
}

impl DateEvidence {
    pub fn counted(path: &Path, date: NaiveDate, source: DateSource) -> Self {
        Self {
            path: path.to_path_buf(),
            date: Some(date),
            source: Some(source),
        }
    }

    pub fn dropped(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            date: None,
            source: None,
        }
    }
}
