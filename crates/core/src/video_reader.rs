use crate::source::ExtractError;
use chrono::{DateTime, Local, NaiveDate, Utc};
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

/// Seconds between 1904-01-01 (QuickTime epoch) and 1970-01-01.
const QT_TO_UNIX_OFFSET: i64 = 2_082_844_800;

const ISO_BMFF_EXTENSIONS: &[&str] = &["mp4", "mov", "m4v", "3gp"];

#[derive(Debug, Clone, Copy)]
struct BoxRange {
    data_start: u64,
    data_end: u64,
}

/// Reads the creation date of a video from its `moov/mvhd` box.
///
/// Containers other than ISO-BMFF/QuickTime are not decoded and report no date.
pub fn read_video_date(path: &Path) -> Result<Option<NaiveDate>, ExtractError> {
    let is_bmff = path
        .extension()
        .map(|ext| {
            let ext = ext.to_string_lossy();
            ISO_BMFF_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false);
    if !is_bmff {
        return Ok(None);
    }

    let io_err = |source| ExtractError::Io {
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path).map_err(io_err)?;
    let len = file.metadata().map_err(io_err)?.len();
    let mut reader = BufReader::new(file);

    let seconds =
        mvhd_creation_seconds(&mut reader, len).map_err(|reason| ExtractError::Container {
            path: path.to_path_buf(),
            reason,
        })?;

    Ok(seconds.and_then(qt_seconds_to_local_date))
}

fn mvhd_creation_seconds<R: Read + Seek>(
    reader: &mut R,
    len: u64,
) -> Result<Option<u64>, String> {
    let Some(moov) = find_box(reader, 0, len, *b"moov")? else {
        return Ok(None);
    };
    let Some(mvhd) = find_box(reader, moov.data_start, moov.data_end, *b"mvhd")? else {
        return Ok(None);
    };

    reader
        .seek(SeekFrom::Start(mvhd.data_start))
        .map_err(|e| e.to_string())?;
    let mut version_flags = [0u8; 4];
    reader
        .read_exact(&mut version_flags)
        .map_err(|e| format!("truncated mvhd: {e}"))?;

    let seconds = if version_flags[0] == 1 {
        let mut buf = [0u8; 8];
        reader
            .read_exact(&mut buf)
            .map_err(|e| format!("truncated mvhd: {e}"))?;
        u64::from_be_bytes(buf)
    } else {
        let mut buf = [0u8; 4];
        reader
            .read_exact(&mut buf)
            .map_err(|e| format!("truncated mvhd: {e}"))?;
        u32::from_be_bytes(buf) as u64
    };

    // Encoders that do not know the time write zero.
    Ok((seconds != 0).then_some(seconds))
}

fn find_box<R: Read + Seek>(
    reader: &mut R,
    start: u64,
    end: u64,
    kind: [u8; 4],
) -> Result<Option<BoxRange>, String> {
    let mut offset = start;
    while offset + 8 <= end {
        reader
            .seek(SeekFrom::Start(offset))
            .map_err(|e| e.to_string())?;
        let mut header = [0u8; 8];
        reader
            .read_exact(&mut header)
            .map_err(|e| format!("truncated box header at {offset}: {e}"))?;

        let mut size = u32::from_be_bytes([header[0], header[1], header[2], header[3]]) as u64;
        let box_kind = [header[4], header[5], header[6], header[7]];
        let mut header_size = 8u64;

        if size == 1 {
            let mut ext = [0u8; 8];
            reader
                .read_exact(&mut ext)
                .map_err(|e| format!("truncated large box header at {offset}: {e}"))?;
            size = u64::from_be_bytes(ext);
            header_size = 16;
        } else if size == 0 {
            size = end.saturating_sub(offset);
        }

        if size < header_size {
            return Err(format!("invalid box size {size} at {offset}"));
        }
        let box_end = offset.saturating_add(size).min(end);

        if box_kind == kind {
            return Ok(Some(BoxRange {
                data_start: offset + header_size,
                data_end: box_end,
            }));
        }
        offset = box_end;
    }
    Ok(None)
}

fn qt_seconds_to_local_date(seconds: u64) -> Option<NaiveDate> {
    let unix = i64::try_from(seconds).ok()?.checked_sub(QT_TO_UNIX_OFFSET)?;
    let utc = DateTime::<Utc>::from_timestamp(unix, 0)?;
    Some(utc.with_timezone(&Local).date_naive())
}

#[cfg(test)]
mod tests {
    use super::{mvhd_creation_seconds, read_video_date, QT_TO_UNIX_OFFSET};
    use crate::source::ExtractError;
    use std::fs;
    use std::io::Cursor;
    use tempfile::tempdir;

    fn boxed(kind: &[u8; 4], payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(payload.len() + 8);
        out.extend_from_slice(&((payload.len() + 8) as u32).to_be_bytes());
        out.extend_from_slice(kind);
        out.extend_from_slice(payload);
        out
    }

    fn movie_with_creation(seconds: u32) -> Vec<u8> {
        let mut mvhd = vec![0u8, 0, 0, 0];
        mvhd.extend_from_slice(&seconds.to_be_bytes());
        mvhd.extend_from_slice(&seconds.to_be_bytes());
        mvhd.extend_from_slice(&[0u8; 88]);

        let mut bytes = boxed(b"ftyp", b"isom\0\0\0\0isomavc1");
        bytes.extend(boxed(b"free", &[0u8; 16]));
        bytes.extend(boxed(b"moov", &boxed(b"mvhd", &mvhd)));
        bytes
    }

    #[test]
    fn reads_creation_time_from_nested_mvhd() {
        // 2023-06-15 12:00:00 UTC
        let seconds = (1_686_830_400 + QT_TO_UNIX_OFFSET) as u32;
        let bytes = movie_with_creation(seconds);
        let len = bytes.len() as u64;

        let found = mvhd_creation_seconds(&mut Cursor::new(bytes), len).expect("parse");
        assert_eq!(found, Some(seconds as u64));
    }

    #[test]
    fn zero_creation_time_means_no_date() {
        let bytes = movie_with_creation(0);
        let len = bytes.len() as u64;
        let found = mvhd_creation_seconds(&mut Cursor::new(bytes), len).expect("parse");
        assert_eq!(found, None);
    }

    #[test]
    fn file_without_moov_has_no_date() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("clip.mp4");
        fs::write(&path, boxed(b"ftyp", b"isom\0\0\0\0")).expect("write");
        assert!(matches!(read_video_date(&path), Ok(None)));
    }

    #[test]
    fn truncated_box_is_reported_as_container_failure() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("clip.mov");
        // Declares a 4-byte box, smaller than its own header.
        fs::write(&path, [0u8, 0, 0, 4, b'm', b'o', b'o', b'v', 0, 0]).expect("write");
        assert!(matches!(
            read_video_date(&path),
            Err(ExtractError::Container { .. })
        ));
    }

    #[test]
    fn non_bmff_containers_are_not_decoded() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("clip.avi");
        fs::write(&path, b"RIFF....AVI ").expect("write");
        assert!(matches!(read_video_date(&path), Ok(None)));
    }

    #[test]
    fn mid_day_utc_creation_maps_to_a_date() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("clip.MP4");
        let seconds = (1_686_830_400 + QT_TO_UNIX_OFFSET) as u32;
        fs::write(&path, movie_with_creation(seconds)).expect("write");

        let date = read_video_date(&path)
            .expect("readable")
            .expect("date present");
        // Noon UTC stays in June for every local offset.
        assert_eq!(date.format("%Y-%m").to_string(), "2023-06");
    }
}
