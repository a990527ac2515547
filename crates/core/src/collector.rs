use crate::config::AppConfig;
use crate::metadata::{DateEvidence, DateSource, Extraction, MediaFile, MediaKind};
use crate::source::{file_modified_date, TimestampSource};
use crate::tally::DateTally;
use anyhow::Result;
use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// What to do with a file that carries no embedded date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    SkipFolder,
    IgnoreFile,
    Manual(NaiveDate),
    Quit,
    UseFileModified,
}

pub trait MissingDatePolicy {
    fn resolve(&mut self, file: &MediaFile, folder: &Path) -> Result<Resolution>;
}

/// Batch mode: every undated file falls back to its modification date.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileModifiedFallback;

impl MissingDatePolicy for FileModifiedFallback {
    fn resolve(&mut self, _file: &MediaFile, _folder: &Path) -> Result<Resolution> {
        Ok(Resolution::UseFileModified)
    }
}

#[derive(Debug, Error)]
#[error("run aborted by user while reviewing {}", folder.display())]
pub struct RunAborted {
    pub folder: PathBuf,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CollectOutcome {
    Complete,
    NoMedia,
    SkippedByUser,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CollectStats {
    pub media_files: usize,
    pub embedded: usize,
    pub file_modified: usize,
    pub manual: usize,
    pub ignored: usize,
    pub failed_reads: usize,
}

#[derive(Debug, Clone)]
pub struct Collected {
    pub tally: DateTally,
    pub evidence: Vec<DateEvidence>,
    pub outcome: CollectOutcome,
    pub stats: CollectStats,
}

/// Which files count as media and which entries are skipped outright.
#[derive(Debug, Clone)]
pub struct ScanRules {
    pub image_extensions: Vec<String>,
    pub video_extensions: Vec<String>,
    pub ignored_names: Vec<String>,
    pub include_hidden: bool,
}

impl Default for ScanRules {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

impl ScanRules {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            image_extensions: config.image_extensions.clone(),
            video_extensions: config.video_extensions.clone(),
            ignored_names: config.ignored_names.clone(),
            include_hidden: config.include_hidden,
        }
    }

    pub fn classify(&self, path: &Path) -> Option<MediaKind> {
        let ext = path.extension()?.to_string_lossy();
        let matches = |set: &[String]| set.iter().any(|known| ext.eq_ignore_ascii_case(known));
        if matches(self.image_extensions.as_slice()) {
            Some(MediaKind::Image)
        } else if matches(self.video_extensions.as_slice()) {
            Some(MediaKind::Video)
        } else {
            None
        }
    }

    pub fn skips(&self, name: &OsStr) -> bool {
        let name = name.to_string_lossy();
        if !self.include_hidden && name.starts_with('.') {
            return true;
        }
        self.ignored_names
            .iter()
            .any(|ignored| ignored.eq_ignore_ascii_case(&name))
    }
}

pub fn discover_media(folder: &Path, rules: &ScanRules) -> Vec<MediaFile> {
    let mut out = Vec::new();
    let walker = WalkDir::new(folder)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !rules.skips(entry.file_name()));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!("skipping unreadable entry under {}: {err}", folder.display());
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        if let Some(kind) = rules.classify(entry.path()) {
            out.push(MediaFile {
                path: entry.into_path(),
                kind,
            });
        }
    }

    out
}

/// Gathers date evidence for every media file below `folder`.
///
/// Extraction is read-only and runs in parallel; the tally is then built in
/// walk order, and undated files are resolved one at a time through `policy`.
/// A [`Resolution::Quit`] surfaces as a [`RunAborted`] error.
pub fn collect(
    folder: &Path,
    rules: &ScanRules,
    source: &dyn TimestampSource,
    policy: &mut dyn MissingDatePolicy,
) -> Result<Collected> {
    let files = discover_media(folder, rules);
    let mut stats = CollectStats {
        media_files: files.len(),
        ..CollectStats::default()
    };
    let mut tally = DateTally::new();
    let mut evidence = Vec::with_capacity(files.len());

    if files.is_empty() {
        return Ok(Collected {
            tally,
            evidence,
            outcome: CollectOutcome::NoMedia,
            stats,
        });
    }

    let extractions: Vec<Extraction> = files
        .par_iter()
        .map(|file| source.extract(&file.path, file.kind))
        .collect();

    for (file, extraction) in files.iter().zip(extractions) {
        let reason = match extraction {
            Extraction::Found(date) => {
                debug!("{}: embedded date {date}", file.path.display());
                tally.add(date);
                stats.embedded += 1;
                evidence.push(DateEvidence::counted(&file.path, date, DateSource::Embedded));
                continue;
            }
            Extraction::Missing => None,
            Extraction::Failed(reason) => Some(reason),
        };
        if let Some(reason) = reason {
            stats.failed_reads += 1;
            warn!("metadata unreadable, treating as missing: {reason}");
        }

        match policy.resolve(file, folder)? {
            Resolution::UseFileModified => match file_modified_date(&file.path) {
                Some(date) => {
                    debug!("{}: modified date {date}", file.path.display());
                    tally.add(date);
                    stats.file_modified += 1;
                    evidence.push(DateEvidence::counted(
                        &file.path,
                        date,
                        DateSource::FileModified,
                    ));
                }
                None => {
                    warn!("could not stat {}, dropping it", file.path.display());
                    evidence.push(DateEvidence::dropped(&file.path));
                }
            },
            Resolution::Manual(date) => {
                debug!("{}: manual date {date}", file.path.display());
                tally.add(date);
                stats.manual += 1;
                evidence.push(DateEvidence::counted(&file.path, date, DateSource::Manual));
            }
            Resolution::IgnoreFile => {
                stats.ignored += 1;
                evidence.push(DateEvidence::dropped(&file.path));
            }
            Resolution::SkipFolder => {
                return Ok(Collected {
                    tally,
                    evidence,
                    outcome: CollectOutcome::SkippedByUser,
                    stats,
                });
            }
            Resolution::Quit => {
                return Err(RunAborted {
                    folder: folder.to_path_buf(),
                }
                .into());
            }
        }
    }

    Ok(Collected {
        tally,
        evidence,
        outcome: CollectOutcome::Complete,
        stats,
    })
}

/// Validates a manually typed `YYYY-MM-DD` date.
pub fn parse_manual_date(input: &str) -> Option<NaiveDate> {
    let trimmed = input.trim();
    let bytes = trimmed.as_bytes();
    let shaped = bytes.len() == 10
        && bytes[4] == b'-'
        && bytes[7] == b'-'
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit());
    if !shaped {
        return None;
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").ok()
}
