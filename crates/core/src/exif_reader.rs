use crate::source::ExtractError;
use chrono::NaiveDate;
use exif::{In, Reader, Tag, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

const DATE_TAGS: &[Tag] = &[Tag::DateTimeOriginal, Tag::DateTimeDigitized, Tag::DateTime];

/// Reads the capture date of an image from its EXIF block.
///
/// `Ok(None)` means the container was readable but carried no usable date.
pub fn read_exif_date(path: &Path) -> Result<Option<NaiveDate>, ExtractError> {
    let file = File::open(path).map_err(|source| ExtractError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut buf = BufReader::new(file);
    let exif = match Reader::new().read_from_container(&mut buf) {
        Ok(exif) => exif,
        Err(exif::Error::NotFound(_)) => return Ok(None),
        Err(source) => {
            return Err(ExtractError::Exif {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    Ok(DATE_TAGS.iter().find_map(|tag| {
        let field = exif.get_field(*tag, In::PRIMARY)?;
        let raw = match &field.value {
            Value::Ascii(values) if !values.is_empty() => {
                String::from_utf8_lossy(&values[0]).to_string()
            }
            _ => field.display_value().to_string(),
        };
        parse_date(&raw)
    }))
}

/// Accepts `YYYY:MM:DD hh:mm:ss` as written by cameras, and the ISO
/// `YYYY-MM-DD...` shape some tools write instead. Time of day is dropped.
pub(crate) fn parse_date(input: &str) -> Option<NaiveDate> {
    let trimmed = input.trim().trim_matches('"');
    let head: String = trimmed.chars().take(10).collect();
    if head.chars().count() < 10 {
        return None;
    }
    let normalized = head.replace(':', "-");
    NaiveDate::parse_from_str(&normalized, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::{parse_date, read_exif_date};
    use crate::source::ExtractError;
    use chrono::NaiveDate;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn parses_camera_and_iso_shapes() {
        let expected = NaiveDate::from_ymd_opt(2023, 1, 1);
        assert_eq!(parse_date("2023:01:01 10:20:30"), expected);
        assert_eq!(parse_date("2023-01-01T10:20:30+09:00"), expected);
        assert_eq!(parse_date("\"2023:01:01 00:00:00\""), expected);
    }

    #[test]
    fn rejects_blank_and_zeroed_dates() {
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("0000:00:00 00:00:00"), None);
        assert_eq!(parse_date("    :  :     :  :  "), None);
    }

    #[test]
    fn garbage_file_is_a_failure_not_a_panic() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("broken.jpg");
        fs::write(&path, b"definitely not a jpeg").expect("write");

        let result = read_exif_date(&path);
        assert!(matches!(result, Err(ExtractError::Exif { .. })));
    }

    #[test]
    fn missing_file_is_an_io_failure() {
        let temp = tempdir().expect("tempdir");
        let result = read_exif_date(&temp.path().join("absent.jpg"));
        assert!(matches!(result, Err(ExtractError::Io { .. })));
    }
}
