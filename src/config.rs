//! Optional JSON settings file supplying defaults for the CLI.
//!
//! ```json
//! {
//!   "folder": "/data/deciles",
//!   "subfolder": "2025",
//!   "region": "Japan",
//!   "criteria": "Entering Top 2 Deciles",
//!   "period": "6m"
//! }
//! ```
//!
//! Command-line flags override anything set here.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Days, NaiveDate};
use serde::Deserialize;

use crate::data::filter::{DateRange, Period};
use crate::error::ConfigError;

/// Default settings file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "decile_tracker.json";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Root directory holding the snapshot files.
    pub folder: Option<PathBuf>,
    /// Sub-directory of `folder` to sync.
    pub subfolder: Option<String>,
    pub region: Option<String>,
    pub sector: Option<String>,
    pub criteria: Option<String>,
    pub period: Option<PeriodChoice>,
}

/// Look-back window choices as spelled in settings and on the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
pub enum PeriodChoice {
    #[serde(rename = "3m")]
    #[value(name = "3m")]
    ThreeMonths,
    #[serde(rename = "6m")]
    #[value(name = "6m")]
    SixMonths,
    #[serde(rename = "9m")]
    #[value(name = "9m")]
    NineMonths,
    #[default]
    #[serde(rename = "12m")]
    #[value(name = "12m")]
    TwelveMonths,
    #[serde(rename = "custom")]
    #[value(name = "custom")]
    Custom,
}

impl PeriodChoice {
    /// Resolve to a [`Period`]. A custom window without bounds covers the
    /// last 365 days.
    pub fn resolve(self, from: Option<NaiveDate>, to: Option<NaiveDate>, today: NaiveDate) -> Period {
        match self {
            PeriodChoice::ThreeMonths => Period::ThreeMonths,
            PeriodChoice::SixMonths => Period::SixMonths,
            PeriodChoice::NineMonths => Period::NineMonths,
            PeriodChoice::TwelveMonths => Period::TwelveMonths,
            PeriodChoice::Custom => {
                let end = to.unwrap_or(today);
                let start = from.unwrap_or_else(|| {
                    end.checked_sub_days(Days::new(365))
                        .unwrap_or(NaiveDate::MIN)
                });
                Period::Custom(DateRange::new(start, end))
            }
        }
    }
}

impl Settings {
    /// Load settings from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            log::debug!("No settings file at {}", path.display());
            return Ok(Settings::default());
        }
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }
}
