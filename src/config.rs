use std::ffi::OsString;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::data::filter::FilterSpec;

/// Optional settings file looked up in the working directory.
pub const CONFIG_FILE: &str = "churn-dash.json";

/// Environment variable overriding [`DashboardConfig::data_path`].
pub const DATA_PATH_ENV: &str = "CHURN_DASH_DATA";

/// Dashboard settings.  Every field has a default, so a partial file works.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Dataset read at start-up, relative to the working directory.
    pub data_path: PathBuf,
    /// Number of equal-width bins in the age histogram.
    pub age_bins: usize,
    /// Initial age slider selection.
    pub default_age_range: (u32, u32),
    /// Rows shown in the preview table.
    pub preview_rows: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("Churn_Modelling.csv"),
            age_bins: 20,
            default_age_range: FilterSpec::DEFAULT_AGE_RANGE,
            preview_rows: 200,
        }
    }
}

impl DashboardConfig {
    /// Read [`CONFIG_FILE`] from the working directory if present, then apply
    /// the environment override.  A broken file is logged and replaced by the
    /// defaults; the override still applies.
    pub fn load() -> Self {
        Self::resolve(Path::new(CONFIG_FILE), std::env::var_os(DATA_PATH_ENV))
    }

    fn resolve(path: &Path, data_override: Option<OsString>) -> Self {
        let mut config = Self::from_file_or_default(path).unwrap_or_else(|e| {
            log::error!("Ignoring settings file: {e:#}");
            Self::default()
        });
        if let Some(data_path) = data_override {
            log::debug!("{DATA_PATH_ENV} overrides data path");
            config.data_path = PathBuf::from(data_path);
        }
        config
    }

    fn from_file_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("parsing {}", path.display()))?;
        log::info!("Using settings from {}", path.display());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = DashboardConfig::from_file_or_default(&dir.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(config, DashboardConfig::default());
        assert_eq!(config.age_bins, 20);
        assert_eq!(config.default_age_range, (18, 60));
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, r#"{ "data_path": "data/churn.parquet", "age_bins": 10 }"#).unwrap();

        let config = DashboardConfig::from_file_or_default(&path).unwrap();
        assert_eq!(config.data_path, PathBuf::from("data/churn.parquet"));
        assert_eq!(config.age_bins, 10);
        assert_eq!(config.preview_rows, 200);
    }

    #[test]
    fn env_override_wins_over_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, r#"{ "data_path": "data/churn.parquet", "age_bins": 10 }"#).unwrap();

        let config = DashboardConfig::resolve(&path, Some("custom.parquet".into()));
        assert_eq!(config.data_path, PathBuf::from("custom.parquet"));
        assert_eq!(config.age_bins, 10);

        let config = DashboardConfig::resolve(&path, None);
        assert_eq!(config.data_path, PathBuf::from("data/churn.parquet"));
    }

    #[test]
    fn env_override_survives_an_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "{ not json").unwrap();

        let config = DashboardConfig::resolve(&path, Some("custom.parquet".into()));
        assert_eq!(config.data_path, PathBuf::from("custom.parquet"));
        assert_eq!(config.age_bins, 20);
    }

    #[test]
    fn invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "{ not json").unwrap();

        let err = DashboardConfig::from_file_or_default(&path).unwrap_err();
        assert!(format!("{err:#}").contains("parsing"));
    }
}
