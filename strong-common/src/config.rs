//! Configuration loading and resolution
//!
//! Each setting is resolved in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing or unreadable TOML file is not fatal: it is logged and the
//! remaining tiers still apply.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_FILE_ENV: &str = "STRONG_CONFIG";
/// Environment variable overriding the input delimiter
pub const DELIMITER_ENV: &str = "STRONG_DELIMITER";
/// Environment variable overriding the identifier strategy
pub const ID_STRATEGY_ENV: &str = "STRONG_ID_STRATEGY";
/// Environment variable overriding the missing-date policy
pub const MISSING_DATE_ENV: &str = "STRONG_ON_MISSING_DATE";

/// Application directory name under the platform config dir
const APP_DIR: &str = "strong-csv-to-sqlite";

/// How surface identifiers are generated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IdStrategy {
    /// 8 random symbols from [a-z0-9A-Z]; collisions are not checked
    #[default]
    Random,
    /// Zero-padded base-62 counter, unique within one run
    Sequential,
    /// Truncated SHA-256 of entity content, stable across identical runs
    ContentHash,
}

impl FromStr for IdStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "random" => Ok(IdStrategy::Random),
            "sequential" => Ok(IdStrategy::Sequential),
            "content-hash" | "content_hash" | "hash" => Ok(IdStrategy::ContentHash),
            other => Err(format!(
                "unknown id strategy '{}' (expected random, sequential or content-hash)",
                other
            )),
        }
    }
}

impl fmt::Display for IdStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IdStrategy::Random => "random",
            IdStrategy::Sequential => "sequential",
            IdStrategy::ContentHash => "content-hash",
        };
        f.write_str(name)
    }
}

/// What to do with a record whose Date is absent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MissingDatePolicy {
    /// Abort the whole run before anything is written
    #[default]
    Abort,
    /// Drop the record with a warning
    Skip,
}

impl FromStr for MissingDatePolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "abort" => Ok(MissingDatePolicy::Abort),
            "skip" => Ok(MissingDatePolicy::Skip),
            other => Err(format!(
                "unknown missing-date policy '{}' (expected abort or skip)",
                other
            )),
        }
    }
}

impl fmt::Display for MissingDatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissingDatePolicy::Abort => f.write_str("abort"),
            MissingDatePolicy::Skip => f.write_str("skip"),
        }
    }
}

/// Settings readable from the TOML config file
///
/// All keys are optional; unknown keys are rejected so typos surface as a warning.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct TomlConfig {
    pub delimiter: Option<String>,
    pub id_strategy: Option<IdStrategy>,
    pub on_missing_date: Option<MissingDatePolicy>,
    pub overwrite: Option<bool>,
}

impl TomlConfig {
    /// Parse a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }
}

/// Values supplied on the command line (already merged with clap's own env lookups)
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub config_file: Option<PathBuf>,
    pub delimiter: Option<char>,
    pub id_strategy: Option<IdStrategy>,
    pub on_missing_date: Option<MissingDatePolicy>,
    pub force: bool,
}

/// Fully resolved settings for one conversion run
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertConfig {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub delimiter: u8,
    pub id_strategy: IdStrategy,
    pub on_missing_date: MissingDatePolicy,
    pub overwrite: bool,
}

impl ConvertConfig {
    /// Config with compiled defaults for the given paths
    pub fn new(input_path: impl Into<PathBuf>, output_path: impl Into<PathBuf>) -> Self {
        Self {
            input_path: input_path.into(),
            output_path: output_path.into(),
            delimiter: b';',
            id_strategy: IdStrategy::default(),
            on_missing_date: MissingDatePolicy::default(),
            overwrite: false,
        }
    }
}

/// Resolves a [`ConvertConfig`] across CLI, environment, TOML and defaults
pub struct ConfigResolver {
    overrides: CliOverrides,
}

impl ConfigResolver {
    pub fn new(overrides: CliOverrides) -> Self {
        Self { overrides }
    }

    /// Resolve using the process environment
    pub fn resolve(&self, input_path: &Path, output_path: &Path) -> Result<ConvertConfig> {
        self.resolve_with(input_path, output_path, |k| std::env::var(k).ok())
    }

    /// Resolve using the provided environment lookup
    pub fn resolve_with<F>(
        &self,
        input_path: &Path,
        output_path: &Path,
        get_env: F,
    ) -> Result<ConvertConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file = self.load_file(&get_env);
        let mut config = ConvertConfig::new(input_path, output_path);

        let delimiter = match self.overrides.delimiter {
            Some(c) => Some(c.to_string()),
            None => get_env(DELIMITER_ENV).or(file.delimiter),
        };
        if let Some(raw) = delimiter {
            config.delimiter = parse_delimiter(&raw)?;
        }

        config.id_strategy = match self.overrides.id_strategy {
            Some(strategy) => strategy,
            None => match get_env(ID_STRATEGY_ENV) {
                Some(raw) => raw.parse().map_err(Error::Config)?,
                None => file.id_strategy.unwrap_or_default(),
            },
        };

        config.on_missing_date = match self.overrides.on_missing_date {
            Some(policy) => policy,
            None => match get_env(MISSING_DATE_ENV) {
                Some(raw) => raw.parse().map_err(Error::Config)?,
                None => file.on_missing_date.unwrap_or_default(),
            },
        };

        config.overwrite = self.overrides.force || file.overwrite.unwrap_or(false);

        debug!("Resolved configuration: {:?}", config);
        Ok(config)
    }

    /// Load the TOML tier, degrading to an empty config on any failure
    fn load_file<F>(&self, get_env: &F) -> TomlConfig
    where
        F: Fn(&str) -> Option<String>,
    {
        let explicit = self
            .overrides
            .config_file
            .clone()
            .or_else(|| get_env(CONFIG_FILE_ENV).map(PathBuf::from));

        let path = match explicit {
            Some(path) => path,
            None => match default_config_path() {
                Some(path) if path.exists() => path,
                _ => return TomlConfig::default(),
            },
        };

        match TomlConfig::load(&path) {
            Ok(config) => {
                debug!("Loaded config file: {}", path.display());
                config
            }
            Err(e) => {
                warn!("Ignoring config file {}: {}", path.display(), e);
                TomlConfig::default()
            }
        }
    }
}

/// Platform config file location: `<config_dir>/strong-csv-to-sqlite/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR).join("config.toml"))
}

/// Accept exactly one ASCII character (`\t` is understood as tab)
pub fn parse_delimiter(raw: &str) -> Result<u8> {
    if raw == "\\t" {
        return Ok(b'\t');
    }
    let mut chars = raw.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii() => Ok(c as u8),
        _ => Err(Error::Config(format!(
            "delimiter must be a single ASCII character, got {:?}",
            raw
        ))),
    }
}
