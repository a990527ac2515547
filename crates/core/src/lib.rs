mod apply;
mod collector;
mod config;
mod exif_reader;
mod metadata;
mod naming;
mod planner;
mod report;
mod rewrite;
mod source;
mod tally;
mod video_reader;

pub use apply::{apply_plan, unique_path, ApplyResult};
pub use collector::{
    collect, discover_media, parse_manual_date, CollectOutcome, CollectStats, Collected,
    FileModifiedFallback, MissingDatePolicy, Resolution, RunAborted, ScanRules,
};
pub use config::{
    app_paths, load_config, parse_config, save_config, validate_threshold, write_config,
    AppConfig, AppPaths, ConfigError, DEFAULT_CONFIDENCE_THRESHOLD,
};
pub use metadata::{DateEvidence, DateSource, Extraction, MediaFile, MediaKind};
pub use naming::{
    apply_case, is_dated_name, sanitize_name, strip_dated_prefix, CaseStyle, FolderNamer,
    NameRewriter, Passthrough,
};
pub use planner::{
    build_plan, build_plan_with_progress, decide, eligible_folders, Decision, FolderPlan,
    Outcome, PlanEvent, PlanOptions, PlanStats,
};
pub use report::{render_csv, write_csv_report, FailedFolder, SkippedFolder, Summary};
pub use rewrite::{RemoteRewriter, RewriteError, RewriteSession, RewriteSettings};
pub use source::{file_modified_date, EmbeddedTimestamps, ExtractError, TimestampSource};
pub use tally::{aggregate, Aggregate, DateTally};
