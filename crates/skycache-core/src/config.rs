use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use url::Url;

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Add an error
    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Add a warning
    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        if self.errors.is_empty() {
            return String::new();
        }
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application configuration directory; the config file's directory when unset
    #[serde(default)]
    pub config_dir: PathBuf,

    /// Forecast provider settings
    #[serde(default)]
    pub weather: WeatherConfig,

    /// Cache storage settings
    #[serde(default)]
    pub storage: StorageConfig,

    /// Log output settings
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Scheduled forecast feeds, one per display instance
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub feeds: Vec<FeedConfig>,
}

pub const DEFAULT_BASE_URL: &str = "https://www.yr.no/place";
pub const DEFAULT_SYMBOL_BASE_URL: &str = "https://symbol.yr.no/grafikk/sym/b38";
pub const DEFAULT_DATE_FORMAT: &str = "%-d. %B %Y %H:%M";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// Forecast endpoint; requests go to `{base_url}/{place}/forecast.xml`
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Where forecast symbol images live
    #[serde(default = "default_symbol_base_url")]
    pub symbol_base_url: String,

    /// HTTP request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,

    /// User-Agent sent with every forecast request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// chrono format string for forecast timestamps
    #[serde(default = "default_date_format")]
    pub date_format: String,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_symbol_base_url() -> String {
    DEFAULT_SYMBOL_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_user_agent() -> String {
    format!("skycache/{}", env!("CARGO_PKG_VERSION"))
}

fn default_date_format() -> String {
    DEFAULT_DATE_FORMAT.to_string()
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            symbol_base_url: default_symbol_base_url(),
            request_timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
            date_format: default_date_format(),
        }
    }
}

impl WeatherConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite file holding cached forecasts. Defaults to `<config_dir>/forecast_cache.db`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// How often a feed is refreshed.
///
/// Accepts the named recurrences `hourly`, `twicedaily` and `daily`, or an
/// explicit number of minutes written as `"45m"` or `"45"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RefreshRate {
    #[default]
    Hourly,
    TwiceDaily,
    Daily,
    Minutes(u32),
}

impl RefreshRate {
    pub fn as_duration(self) -> Duration {
        let minutes = match self {
            RefreshRate::Hourly => 60,
            RefreshRate::TwiceDaily => 12 * 60,
            RefreshRate::Daily => 24 * 60,
            RefreshRate::Minutes(m) => u64::from(m),
        };
        Duration::from_secs(minutes * 60)
    }
}

impl fmt::Display for RefreshRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefreshRate::Hourly => write!(f, "hourly"),
            RefreshRate::TwiceDaily => write!(f, "twicedaily"),
            RefreshRate::Daily => write!(f, "daily"),
            RefreshRate::Minutes(m) => write!(f, "{}m", m),
        }
    }
}

impl FromStr for RefreshRate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        match s.as_str() {
            "hourly" => return Ok(RefreshRate::Hourly),
            "twicedaily" => return Ok(RefreshRate::TwiceDaily),
            "daily" => return Ok(RefreshRate::Daily),
            _ => {}
        }

        let digits = s.strip_suffix('m').unwrap_or(&s);
        match digits.parse::<u32>() {
            Ok(0) => Err("refresh rate must be at least one minute".to_string()),
            Ok(m) => Ok(RefreshRate::Minutes(m)),
            Err(_) => Err(format!(
                "unknown refresh rate '{}' (expected hourly, twicedaily, daily or minutes like '30m')",
                s
            )),
        }
    }
}

impl TryFrom<String> for RefreshRate {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RefreshRate> for String {
    fn from(rate: RefreshRate) -> Self {
        rate.to_string()
    }
}

/// One scheduled forecast feed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Stable identifier the cached forecast is stored under
    pub source_id: String,

    /// Provider place path, e.g. `Norway/Oslo/Oslo/Oslo`
    #[serde(default)]
    pub place: String,

    #[serde(default)]
    pub refresh_rate: RefreshRate,
}

impl Default for Config {
    fn default() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("skycache");

        Self {
            config_dir,
            weather: WeatherConfig::default(),
            storage: StorageConfig::default(),
            logging: LoggingConfig::default(),
            feeds: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from the default location, creating it if it doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from an explicit path, creating a default file if missing
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            let mut config = Self::default();
            if let Some(parent) = config_path.parent() {
                config.config_dir = parent.to_path_buf();
            }
            config.save_to(config_path)?;
            tracing::info!("Created default config at {}", config_path.display());
            return Ok(config);
        }

        let contents = std::fs::read_to_string(config_path)
            .context("Failed to read config file")?;

        let mut config: Config = toml::from_str(&contents)
            .context("Failed to parse config file")?;

        if config.config_dir.as_os_str().is_empty() {
            if let Some(parent) = config_path.parent() {
                config.config_dir = parent.to_path_buf();
            }
        }

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Returns the config along with any validation warnings; logging them is
    /// left to the caller, which may not have a subscriber installed yet.
    /// Returns an error if validation fails with critical errors.
    pub fn load_validated(config_path: Option<&Path>) -> Result<(Self, ValidationResult)> {
        let config = match config_path {
            Some(path) => Self::load_from(path)?,
            None => Self::load()?,
        };
        let validation = config.validate();

        if !validation.is_valid() {
            anyhow::bail!(
                "Configuration validation failed: {}",
                validation.error_summary()
            );
        }

        Ok((config, validation))
    }

    /// Validate the configuration
    ///
    /// Returns a ValidationResult containing any errors or warnings.
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        self.validate_url(&self.weather.base_url, "weather.base_url", &mut result);
        self.validate_url(
            &self.weather.symbol_base_url,
            "weather.symbol_base_url",
            &mut result,
        );

        if self.weather.request_timeout_secs == 0 {
            result.add_error(
                "weather.request_timeout_secs",
                "Request timeout must be greater than 0",
            );
        } else if self.weather.request_timeout_secs > 300 {
            result.add_warning(
                "weather.request_timeout_secs",
                "Request timeout is unusually long (>300 seconds)",
            );
        }

        if self.weather.date_format.trim().is_empty() {
            result.add_error("weather.date_format", "Date format must not be empty");
        }

        if self.feeds.is_empty() {
            result.add_warning("feeds", "No feeds configured - nothing will be refreshed");
        }

        let mut seen = HashSet::new();
        for (i, feed) in self.feeds.iter().enumerate() {
            let field = format!("feeds[{}]", i);
            if feed.source_id.trim().is_empty() {
                result.add_error(format!("{}.source_id", field), "Source id must not be empty");
            } else if !seen.insert(feed.source_id.as_str()) {
                result.add_error(
                    format!("{}.source_id", field),
                    format!("Duplicate source id: {}", feed.source_id),
                );
            }

            // An empty place is not fatal: the feed exists but every refresh is skipped.
            if feed.place.trim_matches('/').trim().is_empty() {
                result.add_warning(
                    format!("{}.place", field),
                    format!("Feed '{}' has no place and will never refresh", feed.source_id),
                );
            }
        }

        result
    }

    /// Validate a URL field
    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }

                if let Some(port) = url.port() {
                    if port == 0 {
                        result.add_error(field_name, "Port cannot be 0");
                    }
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Feed configured under `source_id`
    pub fn feed(&self, source_id: &str) -> Option<&FeedConfig> {
        self.feeds.iter().find(|f| f.source_id == source_id)
    }

    /// Effective path of the forecast cache database
    pub fn cache_path(&self) -> PathBuf {
        self.storage
            .cache_path
            .clone()
            .unwrap_or_else(|| self.config_dir.join("forecast_cache.db"))
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;
        self.save_to(&config_path)
    }

    /// Save configuration to the given file
    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;

        std::fs::write(config_path, contents)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Get the path to the configuration file
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("skycache");

        Ok(config_dir.join("config.toml"))
    }
}
