use crate::exif_reader::read_exif_date;
use crate::metadata::{Extraction, MediaKind};
use crate::video_reader::read_video_date;
use chrono::{DateTime, Local, NaiveDate};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("could not open {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not decode EXIF in {}: {source}", path.display())]
    Exif {
        path: PathBuf,
        #[source]
        source: exif::Error,
    },
    #[error("malformed container {}: {reason}", path.display())]
    Container { path: PathBuf, reason: String },
}

/// Where embedded capture dates come from.
///
/// Implementations must not fail: decoder errors are reported through
/// [`Extraction::Failed`]. Extraction runs on a worker pool, hence `Sync`.
pub trait TimestampSource: Sync {
    fn extract(&self, path: &Path, kind: MediaKind) -> Extraction;
}

/// EXIF for images, `mvhd` creation time for videos.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedTimestamps;

impl TimestampSource for EmbeddedTimestamps {
    fn extract(&self, path: &Path, kind: MediaKind) -> Extraction {
        let result = match kind {
            MediaKind::Image => read_exif_date(path),
            MediaKind::Video => read_video_date(path),
        };
        match result {
            Ok(Some(date)) => Extraction::Found(date),
            Ok(None) => Extraction::Missing,
            Err(err) => Extraction::Failed(err.to_string()),
        }
    }
}

pub fn file_modified_date(path: &Path) -> Option<NaiveDate> {
    let time = fs::metadata(path).ok()?.modified().ok()?;
    let local: DateTime<Local> = DateTime::from(time);
    Some(local.date_naive())
}

#[cfg(test)]
mod tests {
    use super::{file_modified_date, EmbeddedTimestamps, TimestampSource};
    use crate::metadata::{Extraction, MediaKind};
    use chrono::Local;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn corrupt_image_collapses_to_failed() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("IMG_0001.JPG");
        fs::write(&path, b"\x00\x01\x02").expect("write");

        let extraction = EmbeddedTimestamps.extract(&path, MediaKind::Image);
        assert!(matches!(extraction, Extraction::Failed(_)));
    }

    #[test]
    fn unreadable_video_collapses_to_failed() {
        let temp = tempdir().expect("tempdir");
        let extraction = EmbeddedTimestamps.extract(&temp.path().join("gone.mp4"), MediaKind::Video);
        assert!(matches!(extraction, Extraction::Failed(_)));
    }

    #[test]
    fn modified_date_of_fresh_file_is_today() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("note.jpg");
        fs::write(&path, b"x").expect("write");

        let before = Local::now().date_naive();
        let date = file_modified_date(&path).expect("statable");
        let after = Local::now().date_naive();
        assert!(date >= before && date <= after);
    }

    #[test]
    fn modified_date_of_missing_file_is_none() {
        let temp = tempdir().expect("tempdir");
        assert_eq!(file_modified_date(&temp.path().join("missing.jpg")), None);
    }
}
