use crate::analytics::TimeBucket;
use crate::error::PulseError;
use crate::reporter::ReportFormat;
use serde::{Deserialize, Serialize};
use std::{env, path::Path, path::PathBuf};

pub const SEED_ENV_VAR: &str = "SOCIAL_PULSE_SEED";
/// Upper bound for `sample.days`, roughly a century.
pub const MAX_SAMPLE_DAYS: i64 = 36_500;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub csv: CsvConfig,
    pub analytics: AnalyticsConfig,
    pub sample: SampleConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvConfig {
    pub delimiter: char,
    pub trim: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub top_n: usize,
    pub bucket: TimeBucket,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SampleConfig {
    pub count: usize,
    pub seed: Option<u64>,
    pub days: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub directory: PathBuf,
    pub format: ReportFormat,
}

impl Default for CsvConfig {
    fn default() -> Self {
        Self {
            delimiter: ',',
            trim: true,
        }
    }
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            top_n: 5,
            bucket: TimeBucket::Day,
        }
    }
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self {
            count: 120,
            seed: None,
            days: 30,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("./pulse-output"),
            format: ReportFormat::All,
        }
    }
}

impl Config {
    /// Get the default config file path (~/.social-pulse.toml)
    pub fn default_config_path() -> crate::Result<PathBuf> {
        let home_dir = env::var("HOME")
            .or_else(|_| env::var("USERPROFILE"))
            .map_err(|_| PulseError::Config("Could not determine home directory".to_string()))?;
        Ok(PathBuf::from(home_dir).join(".social-pulse.toml"))
    }

    /// Load config from the default location, falling back to defaults if the file doesn't exist
    pub fn load() -> crate::Result<Self> {
        let config_path = Self::default_config_path()?;

        let mut config = if config_path.exists() {
            println!("📝 Loading configuration from: {}", config_path.display());
            Self::from_file(&config_path)?
        } else {
            tracing::debug!(path = %config_path.display(), "no config file, using defaults");
            Self::default()
        };

        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load config from a specific file path
    pub fn from_file(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| PulseError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml(&content)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> crate::Result<Self> {
        let config: Config =
            toml::from_str(content).map_err(|e| PulseError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to a file
    pub fn to_file(&self, path: &Path) -> crate::Result<()> {
        let io_err = |source| PulseError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }

        let content =
            toml::to_string_pretty(self).map_err(|e| PulseError::Config(e.to_string()))?;
        std::fs::write(path, content).map_err(io_err)?;
        Ok(())
    }

    fn validate(&self) -> crate::Result<()> {
        if self.analytics.top_n == 0 {
            return Err(PulseError::Config("analytics.top_n must be at least 1".to_string()));
        }
        if self.sample.days <= 0 {
            return Err(PulseError::Config("sample.days must be positive".to_string()));
        }
        if self.sample.days > MAX_SAMPLE_DAYS {
            return Err(PulseError::Config(format!(
                "sample.days must be at most {}, got {}",
                MAX_SAMPLE_DAYS, self.sample.days
            )));
        }
        if !self.csv.delimiter.is_ascii() || matches!(self.csv.delimiter, '"' | '\n' | '\r') {
            return Err(PulseError::Config(format!(
                "csv.delimiter '{}' is not a usable single-byte delimiter",
                self.csv.delimiter.escape_default()
            )));
        }
        Ok(())
    }

    fn apply_env_overrides(&mut self) -> crate::Result<()> {
        if let Ok(raw) = env::var(SEED_ENV_VAR) {
            let seed = raw.trim().parse::<u64>().map_err(|_| {
                PulseError::Config(format!(
                    "{} must be an unsigned integer, got '{}'",
                    SEED_ENV_VAR, raw
                ))
            })?;
            self.sample.seed = Some(seed);
        }
        Ok(())
    }

    /// Create a config file with all available options documented
    pub fn create_documented_config() -> String {
        r#"# Social Pulse Configuration File
# This file configures how social-pulse parses post exports and builds analytics

[csv]
# Field delimiter used by uploaded CSV files
delimiter = ","

# Strip surrounding whitespace from every field
trim = true

[analytics]
# Number of entries kept in the brand and topic rankings
top_n = 5

# Time-series granularity: "hour", "day" or "week" (UTC)
bucket = "day"

[sample]
# Number of synthetic posts produced in demo mode
count = 120

# Fixed seed for reproducible sample data (can also be set via SOCIAL_PULSE_SEED)
# seed = 42

# How many days back from now the sample posts are spread over (1 to 36500)
days = 30

[output]
# Directory that receives exported reports
directory = "./pulse-output"

# Report format: "json", "html", "markdown" or "all"
format = "all"
"#
        .to_string()
    }
}
