use crate::naming::CaseStyle;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.6;

const DEFAULT_IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "tif", "tiff", "heic", "heif", "webp",
];
const DEFAULT_VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "m4v", "3gp", "avi", "mkv"];
const DEFAULT_IGNORED_NAMES: &[&str] = &[
    ".DS_Store",
    "Thumbs.db",
    "desktop.ini",
    "@eaDir",
    ".thumbnails",
    "__MACOSX",
];

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("confidence threshold must be between 0 and 1, got {0}")]
    ThresholdOutOfRange(f64),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub confidence_threshold: f64,
    pub non_interactive: bool,
    pub case_style: CaseStyle,
    pub rewrite_enabled: bool,
    pub include_hidden: bool,
    pub include_dated: bool,
    pub image_extensions: Vec<String>,
    pub video_extensions: Vec<String>,
    pub ignored_names: Vec<String>,
    pub report_file: PathBuf,
    pub log_file: PathBuf,
    pub rewrite_model: String,
    pub rewrite_retry_pause_secs: u64,
    pub rewrite_max_retries: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            non_interactive: false,
            case_style: CaseStyle::Keep,
            rewrite_enabled: true,
            include_hidden: false,
            include_dated: false,
            image_extensions: to_strings(DEFAULT_IMAGE_EXTENSIONS),
            video_extensions: to_strings(DEFAULT_VIDEO_EXTENSIONS),
            ignored_names: to_strings(DEFAULT_IGNORED_NAMES),
            report_file: PathBuf::from("rename_preview.csv"),
            log_file: PathBuf::from("rename_media_folder.log"),
            rewrite_model: "gemini-1.5-flash".to_string(),
            rewrite_retry_pause_secs: 20,
            rewrite_max_retries: 3,
        }
    }
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_threshold(self.confidence_threshold)
    }
}

pub fn validate_threshold(value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::ThresholdOutOfRange(value))
    }
}

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub config_dir: PathBuf,
    pub config_path: PathBuf,
}

pub fn app_paths() -> Result<AppPaths> {
    let proj = ProjectDirs::from("com", "folder-dater", "folder-dater")
        .context("could not determine the OS config directory")?;
    let config_dir = proj.config_dir().to_path_buf();
    Ok(AppPaths {
        config_path: config_dir.join("config.toml"),
        config_dir,
    })
}

pub fn load_config() -> Result<AppConfig> {
    let paths = app_paths()?;
    if !paths.config_path.exists() {
        return Ok(AppConfig::default());
    }

    let raw = fs::read_to_string(&paths.config_path).with_context(|| {
        format!(
            "could not read config file: {}",
            paths.config_path.display()
        )
    })?;
    parse_config(&raw)
}

pub fn parse_config(raw: &str) -> Result<AppConfig> {
    let config = toml::from_str::<AppConfig>(raw).context("could not parse config file")?;
    config.validate()?;
    Ok(config)
}

/// Writes `config` to the per-user config file and returns its path.
pub fn save_config(config: &AppConfig) -> Result<PathBuf> {
    let paths = app_paths()?;
    write_config(&paths.config_path, config)?;
    Ok(paths.config_path)
}

pub fn write_config(path: &Path, config: &AppConfig) -> Result<()> {
    config.validate()?;
    if let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| {
            format!("could not create config directory: {}", dir.display())
        })?;
    }
    let body = toml::to_string_pretty(config).context("could not serialize config")?;
    fs::write(path, body)
        .with_context(|| format!("could not write config file: {}", path.display()))?;
    Ok(())
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::{parse_config, validate_threshold, write_config, AppConfig, ConfigError};
    use crate::naming::CaseStyle;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn empty_file_yields_defaults() {
        let config = parse_config("").expect("empty config is valid");
        assert_eq!(config, AppConfig::default());
        assert!((config.confidence_threshold - 0.6).abs() < f64::EPSILON);
        assert!(config.image_extensions.iter().any(|e| e == "heic"));
        assert!(config.ignored_names.iter().any(|n| n == "Thumbs.db"));
    }

    #[test]
    fn partial_file_overrides_only_given_fields() {
        let config = parse_config(
            r#"
confidence_threshold = 0.8
case_style = "title"
non_interactive = true
"#,
        )
        .expect("valid config");
        assert!((config.confidence_threshold - 0.8).abs() < f64::EPSILON);
        assert_eq!(config.case_style, CaseStyle::Title);
        assert!(config.non_interactive);
        assert_eq!(config.rewrite_max_retries, 3);
    }

    #[test]
    fn out_of_range_threshold_is_rejected() {
        let err = parse_config("confidence_threshold = 1.5").expect_err("must reject");
        assert!(err.to_string().contains("between 0 and 1"));
        assert_eq!(
            validate_threshold(-0.1),
            Err(ConfigError::ThresholdOutOfRange(-0.1))
        );
        assert!(validate_threshold(0.0).is_ok());
        assert!(validate_threshold(1.0).is_ok());
    }

    #[test]
    fn defaults_round_trip_through_toml() {
        let body = toml::to_string_pretty(&AppConfig::default()).expect("serialize");
        let parsed = parse_config(&body).expect("parse");
        assert_eq!(parsed, AppConfig::default());
    }

    #[test]
    fn written_config_loads_back() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("nested").join("config.toml");
        let config = AppConfig {
            confidence_threshold: 0.75,
            case_style: CaseStyle::Upper,
            ..AppConfig::default()
        };

        write_config(&path, &config).expect("write");
        let raw = fs::read_to_string(&path).expect("read back");
        assert_eq!(parse_config(&raw).expect("parse"), config);
    }

    #[test]
    fn invalid_config_is_never_written() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        let config = AppConfig {
            confidence_threshold: 2.0,
            ..AppConfig::default()
        };
        assert!(write_config(&path, &config).is_err());
        assert!(!path.exists());
    }
}
