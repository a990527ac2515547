use crate::collector::{collect, CollectOutcome, Collected, MissingDatePolicy, ScanRules};
use crate::config::{validate_threshold, AppConfig};
use crate::naming::{is_dated_name, FolderNamer};
use crate::source::TimestampSource;
use crate::tally::{aggregate, DateTally};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    Rename,
    NoAction,
    SkipLowConfidence,
    SkipNoData,
    SkipUser,
    Error,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Rename => "RENAME",
            Outcome::NoAction => "NO_ACTION",
            Outcome::SkipLowConfidence => "SKIP_LOW_CONFIDENCE",
            Outcome::SkipNoData => "SKIP_NO_DATA",
            Outcome::SkipUser => "SKIP_USER",
            Outcome::Error => "ERROR",
        }
    }

    pub fn is_skip(&self) -> bool {
        matches!(
            self,
            Outcome::SkipLowConfidence | Outcome::SkipNoData | Outcome::SkipUser
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    pub folder_path: PathBuf,
    pub folder_name: String,
    pub proposed_name: Option<String>,
    pub target_path: Option<PathBuf>,
    pub chosen_date: Option<NaiveDate>,
    pub confidence: f64,
    pub total_files: usize,
    pub tally: DateTally,
    pub outcome: Outcome,
    pub error: Option<String>,
}

impl Decision {
    fn skipped(folder: &Path, folder_name: String, tally: &DateTally, outcome: Outcome) -> Self {
        Self {
            folder_path: folder.to_path_buf(),
            folder_name,
            proposed_name: None,
            target_path: None,
            chosen_date: None,
            confidence: 0.0,
            total_files: tally.total(),
            tally: tally.clone(),
            outcome,
            error: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PlanOptions {
    pub root: PathBuf,
    pub confidence_threshold: f64,
    pub include_dated: bool,
    pub rules: ScanRules,
}

impl PlanOptions {
    pub fn from_config(root: impl Into<PathBuf>, config: &AppConfig) -> Self {
        Self {
            root: root.into(),
            confidence_threshold: config.confidence_threshold,
            include_dated: config.include_dated,
            rules: ScanRules::from_config(config),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct PlanStats {
    pub folders_scanned: usize,
    pub skipped_dated: usize,
    pub media_files: usize,
    pub embedded: usize,
    pub file_modified: usize,
    pub manual: usize,
    pub ignored: usize,
    pub failed_reads: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FolderPlan {
    pub root: PathBuf,
    pub confidence_threshold: f64,
    pub decisions: Vec<Decision>,
    pub stats: PlanStats,
}

impl FolderPlan {
    pub fn count(&self, outcome: Outcome) -> usize {
        self.decisions
            .iter()
            .filter(|d| d.outcome == outcome)
            .count()
    }
}

/// Turns one folder's evidence into a decision.
///
/// `confidence == threshold` is accepted.
pub fn decide(
    folder: &Path,
    collected: &Collected,
    threshold: f64,
    namer: &mut FolderNamer<'_>,
) -> Decision {
    let folder_name = folder_name(folder);

    if collected.outcome == CollectOutcome::SkippedByUser {
        return Decision::skipped(folder, folder_name, &collected.tally, Outcome::SkipUser);
    }

    let Some(vote) = aggregate(&collected.tally) else {
        return Decision::skipped(folder, folder_name, &collected.tally, Outcome::SkipNoData);
    };

    let mut decision = Decision {
        folder_path: folder.to_path_buf(),
        folder_name,
        proposed_name: None,
        target_path: None,
        chosen_date: Some(vote.date),
        confidence: vote.confidence,
        total_files: vote.total,
        tally: collected.tally.clone(),
        outcome: Outcome::SkipLowConfidence,
        error: None,
    };

    if vote.confidence < threshold {
        return decision;
    }

    let proposed = namer.proposed_name(vote.date, &decision.folder_name);
    decision.outcome = if proposed == decision.folder_name {
        Outcome::NoAction
    } else {
        Outcome::Rename
    };
    decision.target_path = folder.parent().map(|parent| parent.join(&proposed));
    decision.proposed_name = Some(proposed);
    decision
}

/// Top-level subfolders of `root` to examine, sorted by name, plus the number
/// of already-dated folders left out.
pub fn eligible_folders(
    root: &Path,
    rules: &ScanRules,
    include_dated: bool,
) -> Result<(Vec<PathBuf>, usize)> {
    let mut folders = Vec::new();
    let mut skipped_dated = 0usize;

    for entry in
        fs::read_dir(root).with_context(|| format!("could not read folder: {}", root.display()))?
    {
        let entry = entry.with_context(|| format!("could not read entry in: {}", root.display()))?;
        let path = entry.path();
        if !path.is_dir() || rules.skips(&entry.file_name()) {
            continue;
        }
        if !include_dated && is_dated_name(&entry.file_name().to_string_lossy()) {
            skipped_dated += 1;
            continue;
        }
        folders.push(path);
    }

    folders.sort();
    Ok((folders, skipped_dated))
}

/// Reported by [`build_plan_with_progress`] while folders are examined.
#[derive(Debug, Clone, Copy)]
pub enum PlanEvent<'a> {
    Scanning {
        index: usize,
        total: usize,
        folder: &'a Path,
    },
    Decided(&'a Decision),
}

/// Collects evidence and decides for every eligible folder. Nothing on disk
/// changes here.
pub fn build_plan(
    options: &PlanOptions,
    source: &dyn TimestampSource,
    policy: &mut dyn MissingDatePolicy,
    namer: &mut FolderNamer<'_>,
) -> Result<FolderPlan> {
    build_plan_with_progress(options, source, policy, namer, &mut |_| {})
}

pub fn build_plan_with_progress(
    options: &PlanOptions,
    source: &dyn TimestampSource,
    policy: &mut dyn MissingDatePolicy,
    namer: &mut FolderNamer<'_>,
    progress: &mut dyn FnMut(PlanEvent<'_>),
) -> Result<FolderPlan> {
    if !options.root.is_dir() {
        anyhow::bail!("target folder does not exist: {}", options.root.display());
    }
    validate_threshold(options.confidence_threshold)?;

    let (folders, skipped_dated) =
        eligible_folders(&options.root, &options.rules, options.include_dated)?;
    let mut stats = PlanStats {
        skipped_dated,
        ..PlanStats::default()
    };
    let total = folders.len();
    let mut decisions = Vec::with_capacity(total);

    for (index, folder) in folders.into_iter().enumerate() {
        info!("scanning {}", folder.display());
        progress(PlanEvent::Scanning {
            index: index + 1,
            total,
            folder: &folder,
        });
        let collected = collect(&folder, &options.rules, source, policy)?;

        stats.folders_scanned += 1;
        stats.media_files += collected.stats.media_files;
        stats.embedded += collected.stats.embedded;
        stats.file_modified += collected.stats.file_modified;
        stats.manual += collected.stats.manual;
        stats.ignored += collected.stats.ignored;
        stats.failed_reads += collected.stats.failed_reads;

        let decision = decide(&folder, &collected, options.confidence_threshold, namer);
        info!(
            "{}: {} (date={}, confidence={:.2}, files={}, tally=[{}]){}",
            decision.folder_name,
            decision.outcome.as_str(),
            decision
                .chosen_date
                .map(|d| d.to_string())
                .unwrap_or_else(|| "-".to_string()),
            decision.confidence,
            decision.total_files,
            decision.tally.distribution(),
            decision
                .proposed_name
                .as_deref()
                .map(|name| format!(" -> {name}"))
                .unwrap_or_default()
        );
        progress(PlanEvent::Decided(&decision));
        decisions.push(decision);
    }

    Ok(FolderPlan {
        root: options.root.clone(),
        confidence_threshold: options.confidence_threshold,
        decisions,
        stats,
    })
}

fn folder_name(folder: &Path) -> String {
    folder
        .file_name()
        .map(|v| v.to_string_lossy().to_string())
        .unwrap_or_else(|| folder.display().to_string())
}
