use crate::planner::{Decision, Outcome};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

const CSV_HEADER: &[&str] = &[
    "folder_path",
    "folder_name",
    "proposed_name",
    "chosen_date",
    "confidence",
    "total_files",
    "date_distribution",
    "action",
];

pub fn render_csv(decisions: &[Decision]) -> String {
    let mut out = String::new();
    push_row(&mut out, CSV_HEADER.iter().map(|h| h.to_string()));
    for decision in decisions {
        push_row(
            &mut out,
            [
                decision.folder_path.display().to_string(),
                decision.folder_name.clone(),
                decision.proposed_name.clone().unwrap_or_default(),
                decision
                    .chosen_date
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_default(),
                format!("{:.2}", decision.confidence),
                decision.total_files.to_string(),
                decision.tally.distribution(),
                decision.outcome.as_str().to_string(),
            ],
        );
    }
    out
}

pub fn write_csv_report(path: &Path, decisions: &[Decision]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| {
            format!("could not create report directory: {}", parent.display())
        })?;
    }
    fs::write(path, render_csv(decisions))
        .with_context(|| format!("could not write report: {}", path.display()))?;
    Ok(())
}

fn push_row(out: &mut String, fields: impl IntoIterator<Item = String>) {
    let row = fields
        .into_iter()
        .map(|field| escape_field(&field))
        .collect::<Vec<_>>()
        .join(",");
    out.push_str(&row);
    out.push_str("\r\n");
}

fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// A folder left alone, with the reason.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SkippedFolder {
    pub folder_name: String,
    pub outcome: Outcome,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FailedFolder {
    pub folder_name: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Summary {
    pub renamed: usize,
    pub no_action: usize,
    pub skipped: Vec<SkippedFolder>,
    pub failed: Vec<FailedFolder>,
}

impl Summary {
    pub fn from_decisions(decisions: &[Decision]) -> Self {
        let mut summary = Summary::default();
        for decision in decisions {
            match decision.outcome {
                Outcome::Rename => summary.renamed += 1,
                Outcome::NoAction => summary.no_action += 1,
                Outcome::Error => summary.failed.push(FailedFolder {
                    folder_name: decision.folder_name.clone(),
                    error: decision
                        .error
                        .clone()
                        .unwrap_or_else(|| "unknown error".to_string()),
                }),
                outcome => summary.skipped.push(SkippedFolder {
                    folder_name: decision.folder_name.clone(),
                    outcome,
                }),
            }
        }
        summary
    }

    pub fn render(&self, dry_run: bool) -> String {
        let verb = if dry_run { "to rename" } else { "renamed" };
        let mut out = format!(
            "{} {verb}, {} already named, {} skipped, {} errors\n",
            self.renamed,
            self.no_action,
            self.skipped.len(),
            self.failed.len()
        );
        for skipped in &self.skipped {
            out.push_str(&format!(
                "  skipped {}: {}\n",
                skipped.folder_name,
                skipped.outcome.as_str()
            ));
        }
        for failed in &self.failed {
            out.push_str(&format!(
                "  error {}: {}\n",
                failed.folder_name, failed.error
            ));
        }
        out
    }
}
