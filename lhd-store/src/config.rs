use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Result, StoreError};

const DEFAULT_MONGODB_URI: &str = "mongodb://localhost:27017/lighthouse-dashboard";
const DEFAULT_MAX_RAW_REPORTS: u64 = 100;
const DEFAULT_MAX_REPORTS_AGE_DAYS: u64 = 90;

/// Load environment variables from .env files
///
/// Priority order (highest to lowest):
/// 1. Environment variables already set
/// 2. Current directory .env
/// 3. ~/.lhd/.env
///
/// dotenvy never overwrites variables that are already set, so loading in
/// this order gives the current directory precedence over the home file.
pub fn load_dotenv() {
    let mut loaded_from = Vec::new();

    if let Ok(path) = dotenvy::dotenv() {
        debug!("Loaded .env from current directory: {}", path.display());
        loaded_from.push(path);
    }

    if let Some(env_file) = config_dir().map(|dir| dir.join(".env")) {
        if env_file.exists() {
            match dotenvy::from_path(&env_file) {
                Ok(()) => {
                    debug!("Loaded .env from ~/.lhd: {}", env_file.display());
                    loaded_from.push(env_file);
                }
                Err(e) => debug!("Failed to load {}: {}", env_file.display(), e),
            }
        }
    }

    if loaded_from.is_empty() {
        debug!("No .env files found (current dir or ~/.lhd)");
    } else {
        info!(
            "Loaded environment from: {}",
            loaded_from
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }
}

/// Get the lhd config directory path (~/.lhd)
pub fn config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".lhd"))
}

/// Whether raw audit payloads are written alongside reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RawPolicy {
    /// Serialize the raw payload into the `raw` field
    #[default]
    Store,
    /// Write `raw: null` and drop the payload
    Ignore,
}

impl RawPolicy {
    pub fn from_ignore_flag(ignore_raw: bool) -> Self {
        if ignore_raw {
            Self::Ignore
        } else {
            Self::Store
        }
    }
}

/// Store configuration, from `~/.lhd/config.toml` and `LHD_*` variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LhdConfig {
    #[serde(default = "default_mongodb_uri")]
    pub mongodb_uri: String,

    /// Skip storing raw audit payloads
    #[serde(default)]
    pub ignore_raw: bool,

    /// Number of most recent reports that keep their raw payload
    #[serde(default = "default_max_raw_reports")]
    pub max_raw_reports: u64,

    /// Reports older than this are deleted by pruning
    #[serde(default = "default_max_reports_age_days")]
    pub max_reports_age_days: u64,
}

fn default_mongodb_uri() -> String {
    DEFAULT_MONGODB_URI.to_string()
}

fn default_max_raw_reports() -> u64 {
    DEFAULT_MAX_RAW_REPORTS
}

fn default_max_reports_age_days() -> u64 {
    DEFAULT_MAX_REPORTS_AGE_DAYS
}

impl Default for LhdConfig {
    fn default() -> Self {
        Self {
            mongodb_uri: default_mongodb_uri(),
            ignore_raw: false,
            max_raw_reports: default_max_raw_reports(),
            max_reports_age_days: default_max_reports_age_days(),
        }
    }
}

impl LhdConfig {
    /// Load config: built-in defaults, then ~/.lhd/config.toml, then the
    /// process environment.
    pub fn load() -> Result<Self> {
        let mut config = match config_dir().map(|d| d.join("config.toml")) {
            Some(path) if path.exists() => Self::from_file(&path)?,
            _ => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Parse a TOML config file. Missing keys take their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            StoreError::config(format!("failed to read {}: {}", path.display(), e))
        })?;
        let config = toml::from_str::<LhdConfig>(&contents).map_err(|e| {
            warn!("Failed to parse {}: {}", path.display(), e);
            StoreError::config(format!("failed to parse {}: {}", path.display(), e))
        })?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Override fields from `LHD_*` variables looked up through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(uri) = lookup("LHD_MONGODB_URI").filter(|v| !v.trim().is_empty()) {
            self.mongodb_uri = uri;
        }
        if let Some(value) = lookup("LHD_IGNORE_RAW") {
            self.ignore_raw = parse_flag("LHD_IGNORE_RAW", &value)?;
            if !is_canonical_flag(&value) {
                // Older workers treated any non-empty value as set
                warn!(
                    value = %value,
                    ignore_raw = self.ignore_raw,
                    "LHD_IGNORE_RAW is not 1 or true; set it to 1 to ignore raw payloads"
                );
            }
        }
        if let Some(value) = lookup("LHD_MAX_RAW_REPORTS") {
            self.max_raw_reports = parse_number("LHD_MAX_RAW_REPORTS", &value)?;
        }
        if let Some(value) = lookup("LHD_MAX_REPORTS_AGE_DAYS") {
            self.max_reports_age_days = parse_number("LHD_MAX_REPORTS_AGE_DAYS", &value)?;
        }
        Ok(())
    }

    pub fn raw_policy(&self) -> RawPolicy {
        RawPolicy::from_ignore_flag(self.ignore_raw)
    }

    pub fn max_reports_age(&self) -> Duration {
        Duration::from_secs(self.max_reports_age_days.saturating_mul(86_400))
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "" | "0" | "false" | "no" | "off" => Ok(false),
        other => Err(StoreError::config(format!(
            "{key} must be a boolean, got '{other}'"
        ))),
    }
}

fn is_canonical_flag(value: &str) -> bool {
    let value = value.trim();
    value.is_empty() || value == "1" || value.eq_ignore_ascii_case("true")
}

fn parse_number(key: &str, value: &str) -> Result<u64> {
    value
        .trim()
        .parse()
        .map_err(|_| StoreError::config(format!("{key} must be a non-negative integer, got '{value}'")))
}
