use crate::planner::{Decision, FolderPlan, Outcome};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ApplyResult {
    pub renamed: usize,
    pub failed: usize,
    pub untouched: usize,
    pub dry_run: bool,
}

/// Returns `path` when nothing exists there, otherwise the first free
/// `path (1)`, `path (2)`, ... sibling.
pub fn unique_path(path: &Path) -> PathBuf {
    let mut claims = Claims::default();
    unique_path_with_claims(path, None, &mut claims)
}

/// Paths taken or freed by earlier decisions of the same run.
#[derive(Debug, Default)]
struct Claims {
    reserved: HashSet<PathBuf>,
    vacated: HashSet<PathBuf>,
}

fn unique_path_with_claims(
    candidate: &Path,
    source: Option<&Path>,
    claims: &mut Claims,
) -> PathBuf {
    if is_available(candidate, source, claims) {
        claims.reserved.insert(candidate.to_path_buf());
        return candidate.to_path_buf();
    }

    let mut n = 1usize;
    loop {
        let mut name = candidate.as_os_str().to_os_string();
        name.push(format!(" ({n})"));
        let next = PathBuf::from(name);
        if is_available(&next, source, claims) {
            claims.reserved.insert(next.clone());
            return next;
        }
        n += 1;
    }
}

fn is_available(candidate: &Path, source: Option<&Path>, claims: &Claims) -> bool {
    if claims.reserved.contains(candidate) {
        return false;
    }
    // A source renamed earlier in this run is gone, even when dry-run left it on disk.
    if claims.vacated.contains(candidate) || !candidate.exists() {
        return true;
    }
    // On case-insensitive filesystems a case-only rename "exists" as the source itself.
    match source {
        Some(source) => same_entry(candidate, source),
        None => false,
    }
}

fn same_entry(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Executes every RENAME decision in plan order.
///
/// A failing folder is marked ERROR and the batch carries on. In dry-run mode
/// every step runs except the rename itself, so targets match a live run.
pub fn apply_plan(plan: &mut FolderPlan, dry_run: bool) -> ApplyResult {
    let mut result = ApplyResult {
        dry_run,
        ..ApplyResult::default()
    };
    let mut claims = Claims::default();

    for decision in plan.decisions.iter_mut() {
        if decision.outcome != Outcome::Rename {
            result.untouched += 1;
            continue;
        }

        match execute(decision, dry_run, &mut claims) {
            Ok(destination) => {
                if dry_run {
                    info!(
                        "dry-run: would rename {} -> {}",
                        decision.folder_path.display(),
                        destination.display()
                    );
                } else {
                    info!(
                        "renamed {} -> {}",
                        decision.folder_path.display(),
                        destination.display()
                    );
                }
                claims.vacated.insert(decision.folder_path.clone());
                decision.target_path = Some(destination);
                result.renamed += 1;
            }
            Err(err) => {
                error!(
                    "rename failed for {}: {err:#}",
                    decision.folder_path.display()
                );
                decision.outcome = Outcome::Error;
                decision.error = Some(format!("{err:#}"));
                result.failed += 1;
            }
        }
    }

    result
}

fn execute(
    decision: &Decision,
    dry_run: bool,
    claims: &mut Claims,
) -> Result<PathBuf> {
    let proposed = decision
        .proposed_name
        .as_deref()
        .context("rename decision carries no proposed name")?;
    let parent = decision.folder_path.parent().with_context(|| {
        format!(
            "folder has no parent directory: {}",
            decision.folder_path.display()
        )
    })?;

    if !decision.folder_path.is_dir() {
        anyhow::bail!(
            "folder is no longer there: {}",
            decision.folder_path.display()
        );
    }

    let wanted = parent.join(proposed);
    let destination = unique_path_with_claims(&wanted, Some(&decision.folder_path), claims);

    if !dry_run {
        fs::rename(&decision.folder_path, &destination).with_context(|| {
            format!(
                "could not rename {} -> {}",
                decision.folder_path.display(),
                destination.display()
            )
        })?;
    }

    Ok(destination)
}

#[cfg(test)]
mod tests {
    use super::{apply_plan, unique_path};
    use crate::planner::{Decision, FolderPlan, Outcome, PlanStats};
    use crate::tally::DateTally;
    use chrono::NaiveDate;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::tempdir;

    fn rename_decision(folder: &Path, proposed: &str) -> Decision {
        let date = NaiveDate::from_ymd_opt(2023, 1, 1).expect("valid date");
        Decision {
            folder_path: folder.to_path_buf(),
            folder_name: folder
                .file_name()
                .map(|v| v.to_string_lossy().to_string())
                .unwrap_or_default(),
            proposed_name: Some(proposed.to_string()),
            target_path: folder.parent().map(|p| p.join(proposed)),
            chosen_date: Some(date),
            confidence: 1.0,
            total_files: 1,
            tally: [date].into_iter().collect::<DateTally>(),
            outcome: Outcome::Rename,
            error: None,
        }
    }

    fn plan_of(root: &Path, decisions: Vec<Decision>) -> FolderPlan {
        FolderPlan {
            root: root.to_path_buf(),
            confidence_threshold: 0.6,
            decisions,
            stats: PlanStats::default(),
        }
    }

    #[test]
    fn unique_path_keeps_free_paths() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("2023-01-01 Trip");
        assert_eq!(unique_path(&path), path);
    }

    #[test]
    fn unique_path_counts_up_past_existing_siblings() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("2023-01-01 Trip");
        fs::create_dir_all(&path).expect("create");
        assert_eq!(
            unique_path(&path),
            temp.path().join("2023-01-01 Trip (1)")
        );

        fs::create_dir_all(temp.path().join("2023-01-01 Trip (1)")).expect("create");
        let resolved = unique_path(&path);
        assert_eq!(resolved, temp.path().join("2023-01-01 Trip (2)"));
        assert!(!resolved.exists());
    }

    #[test]
    fn scenario_e_collision_gets_numbered_suffix() {
        let temp = tempdir().expect("tempdir");
        let source = temp.path().join("Trip");
        let existing = temp.path().join("2023-01-01 Trip");
        fs::create_dir_all(&source).expect("source");
        fs::create_dir_all(&existing).expect("existing");
        fs::write(existing.join("keep.txt"), b"x").expect("keep");

        let mut plan = plan_of(temp.path(), vec![rename_decision(&source, "2023-01-01 Trip")]);
        let result = apply_plan(&mut plan, false);

        let expected = temp.path().join("2023-01-01 Trip (1)");
        assert_eq!(result.renamed, 1);
        assert!(expected.is_dir());
        assert!(!source.exists());
        assert!(existing.join("keep.txt").exists(), "never overwrites");
        assert_eq!(plan.decisions[0].target_path.as_deref(), Some(expected.as_path()));
    }

    #[test]
    fn dry_run_reports_same_targets_without_touching_disk() {
        let temp = tempdir().expect("tempdir");
        let a = temp.path().join("Trip");
        let b = temp.path().join("trip_");
        fs::create_dir_all(&a).expect("a");
        fs::create_dir_all(&b).expect("b");

        let decisions = vec![
            rename_decision(&a, "2023-01-01 Trip"),
            rename_decision(&b, "2023-01-01 Trip"),
        ];

        let mut dry = plan_of(temp.path(), decisions.clone());
        let dry_result = apply_plan(&mut dry, true);
        assert!(dry_result.dry_run);
        assert_eq!(dry_result.renamed, 2);
        assert!(a.exists() && b.exists());
        assert!(!temp.path().join("2023-01-01 Trip").exists());

        let mut live = plan_of(temp.path(), decisions);
        apply_plan(&mut live, false);

        let dry_targets: Vec<Option<PathBuf>> =
            dry.decisions.iter().map(|d| d.target_path.clone()).collect();
        let live_targets: Vec<Option<PathBuf>> =
            live.decisions.iter().map(|d| d.target_path.clone()).collect();
        assert_eq!(dry_targets, live_targets);
        assert_eq!(
            live_targets,
            vec![
                Some(temp.path().join("2023-01-01 Trip")),
                Some(temp.path().join("2023-01-01 Trip (1)")),
            ]
        );
    }

    #[test]
    fn one_failure_does_not_stop_the_batch() {
        let temp = tempdir().expect("tempdir");
        let vanished = temp.path().join("Gone");
        let present = temp.path().join("Beach");
        fs::create_dir_all(&present).expect("present");

        let mut plan = plan_of(
            temp.path(),
            vec![
                rename_decision(&vanished, "2023-01-01 Gone"),
                rename_decision(&present, "2023-01-01 Beach"),
            ],
        );
        let result = apply_plan(&mut plan, false);

        assert_eq!(result.failed, 1);
        assert_eq!(result.renamed, 1);
        assert_eq!(plan.decisions[0].outcome, Outcome::Error);
        assert!(plan.decisions[0]
            .error
            .as_deref()
            .unwrap_or_default()
            .contains("no longer there"));
        assert!(temp.path().join("2023-01-01 Beach").is_dir());
    }

    #[test]
    fn only_rename_decisions_are_executed() {
        let temp = tempdir().expect("tempdir");
        let folder = temp.path().join("Docs");
        fs::create_dir_all(&folder).expect("folder");

        let mut decision = rename_decision(&folder, "2023-01-01 Docs");
        decision.outcome = Outcome::SkipLowConfidence;
        let mut plan = plan_of(temp.path(), vec![decision]);

        let result = apply_plan(&mut plan, false);
        assert_eq!(result.untouched, 1);
        assert_eq!(result.renamed, 0);
        assert!(folder.exists());
    }

    #[test]
    fn dry_run_treats_sources_renamed_earlier_as_free() {
        let temp = tempdir().expect("tempdir");
        let dated = temp.path().join("2023-01-01 Trip");
        let plain = temp.path().join("Trip");
        fs::create_dir_all(&dated).expect("dated");
        fs::create_dir_all(&plain).expect("plain");

        let decisions = vec![
            rename_decision(&dated, "2023-01-02 Trip"),
            rename_decision(&plain, "2023-01-01 Trip"),
        ];

        let mut dry = plan_of(temp.path(), decisions.clone());
        apply_plan(&mut dry, true);
        assert!(dated.is_dir() && plain.is_dir());

        let mut live = plan_of(temp.path(), decisions);
        let live_result = apply_plan(&mut live, false);
        assert_eq!(live_result.failed, 0);

        let expected = vec![
            Some(temp.path().join("2023-01-02 Trip")),
            Some(temp.path().join("2023-01-01 Trip")),
        ];
        let dry_targets: Vec<Option<PathBuf>> =
            dry.decisions.iter().map(|d| d.target_path.clone()).collect();
        let live_targets: Vec<Option<PathBuf>> =
            live.decisions.iter().map(|d| d.target_path.clone()).collect();
        assert_eq!(dry_targets, expected);
        assert_eq!(live_targets, expected);
        assert!(temp.path().join("2023-01-01 Trip").is_dir());
        assert!(!plain.exists());
    }
}
