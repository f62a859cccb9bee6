//! Configuration loading for the storesync engine.
//!
//! Loads layered `.env` files and environment variables prefixed with
//! `STORESYNC_`, producing a typed [`AppConfig`]. The destination connection
//! string and source credentials have no defaults; a missing value is a
//! [`ConfigError`] and the process stops before any task starts.

use std::{collections::BTreeMap, env, path::PathBuf, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

const ENV_PREFIX: &str = "STORESYNC_";
const REDACTED: &str = "[REDACTED]";

/// Upper bound on any configured lookback, roughly one hundred years.
pub const MAX_LOOKBACK_HOURS: u64 = 24 * 36_525;

/// Largest overlap a watermark window may reach back past the cursor.
pub const MAX_BOUNDARY_EPSILON_MS: u64 = 60 * 60 * 1000;

/// Application configuration derived from `STORESYNC_*` environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct AppConfig {
    #[serde(default = "default_profile")]
    pub profile: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_format")]
    pub log_format: String,
    #[serde(default)]
    pub database_url: String,
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,
    #[serde(default = "default_db_acquire_timeout_ms")]
    pub db_acquire_timeout_ms: u64,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub sync: SyncConfig,
}

/// Credentials and transport settings for the source API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct SourceConfig {
    /// Platform tag written into every natural key (default: `xiaoe`)
    #[serde(default = "default_platform")]
    pub platform: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default)]
    pub app_id: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub secret_key: String,
    /// Timeout applied to every data request (default: 30)
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,
    /// Timeout applied to token requests (default: 15)
    #[serde(default = "default_token_timeout_seconds")]
    pub token_timeout_seconds: u64,
    /// Refresh the cached access token this long before it expires (default: 300)
    #[serde(default = "default_token_refresh_lead_seconds")]
    pub token_refresh_lead_seconds: u64,
    /// Offset of the source's wall clock from UTC, in minutes (default: 480)
    ///
    /// Naive timestamps sent to and received from the source are in this zone.
    #[serde(default = "default_utc_offset_minutes")]
    pub utc_offset_minutes: i32,
}

/// Backoff applied around every source request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct RetryConfig {
    #[serde(default = "default_retry_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_retry_backoff_multiplier")]
    pub backoff_multiplier: f64,
    #[serde(default = "default_retry_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "default_retry_jitter_factor")]
    pub jitter_factor: f64,
}

/// Paging and windowing parameters shared by every task.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct SyncConfig {
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Safety cutoff against runaway pagination (default: 500)
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
    #[serde(default = "default_page_delay_ms")]
    pub page_delay_ms: u64,
    /// Lookback used when a task has no stored cursor (default: 24)
    #[serde(default = "default_lookback_hours")]
    pub default_lookback_hours: u64,
    #[serde(default = "default_full_sync_lookback_days")]
    pub full_sync_lookback_days: u64,
    /// Width of the rolling window rescanned by the order status refresh (default: 15)
    #[serde(default = "default_status_refresh_days")]
    pub status_refresh_days: u64,
    /// Subtracted from a stored watermark when the next window starts (default: 1000)
    #[serde(default = "default_boundary_epsilon_ms")]
    pub boundary_epsilon_ms: u64,
}

impl SourceConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.app_id.trim().is_empty() {
            return Err(ConfigError::MissingSetting { key: "SOURCE_APP_ID" });
        }
        if self.client_id.trim().is_empty() {
            return Err(ConfigError::MissingSetting {
                key: "SOURCE_CLIENT_ID",
            });
        }
        if self.secret_key.trim().is_empty() {
            return Err(ConfigError::MissingSetting {
                key: "SOURCE_SECRET_KEY",
            });
        }
        if self.platform.trim().is_empty() {
            return Err(ConfigError::MissingSetting {
                key: "SOURCE_PLATFORM",
            });
        }
        url::Url::parse(&self.api_base).map_err(|source| ConfigError::InvalidApiBase {
            value: self.api_base.clone(),
            source,
        })?;
        if self.request_timeout_seconds == 0 || self.token_timeout_seconds == 0 {
            return Err(ConfigError::InvalidTimeout);
        }
        // Offsets beyond +-18h are rejected by chrono's FixedOffset.
        if self.utc_offset_minutes.abs() >= 18 * 60 {
            return Err(ConfigError::InvalidUtcOffset {
                value: self.utc_offset_minutes,
            });
        }
        Ok(())
    }

    /// The source's wall-clock zone. Falls back to UTC for an offset that
    /// [`SourceConfig::validate`] would have rejected.
    pub fn utc_offset(&self) -> chrono::FixedOffset {
        chrono::FixedOffset::east_opt(self.utc_offset_minutes * 60)
            .unwrap_or_else(|| chrono::Offset::fix(&chrono::Utc))
    }
}

impl RetryConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 || self.max_attempts > 10 {
            return Err(ConfigError::InvalidRetryAttempts {
                value: self.max_attempts,
            });
        }
        if !(1.0..=10.0).contains(&self.backoff_multiplier) {
            return Err(ConfigError::InvalidBackoffMultiplier {
                value: self.backoff_multiplier,
            });
        }
        if self.initial_delay_ms > self.max_delay_ms {
            return Err(ConfigError::InvalidRetryBounds {
                initial: self.initial_delay_ms,
                max: self.max_delay_ms,
            });
        }
        if !(0.0..=1.0).contains(&self.jitter_factor) {
            return Err(ConfigError::InvalidRetryJitter {
                value: self.jitter_factor,
            });
        }
        Ok(())
    }
}

impl SyncConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.page_size == 0 || self.page_size > 100 {
            return Err(ConfigError::InvalidPageSize {
                value: self.page_size,
            });
        }
        if self.max_pages == 0 {
            return Err(ConfigError::InvalidMaxPages);
        }
        if self.default_lookback_hours == 0
            || self.default_lookback_hours > MAX_LOOKBACK_HOURS
            || self.full_sync_lookback_days == 0
            || self.full_sync_lookback_days > MAX_LOOKBACK_HOURS / 24
        {
            return Err(ConfigError::InvalidLookback);
        }
        if self.status_refresh_days == 0 || self.status_refresh_days > MAX_LOOKBACK_HOURS / 24 {
            return Err(ConfigError::InvalidStatusRefreshWindow);
        }
        if self.boundary_epsilon_ms > MAX_BOUNDARY_EPSILON_MS {
            return Err(ConfigError::InvalidBoundaryEpsilon {
                value: self.boundary_epsilon_ms,
            });
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            profile: default_profile(),
            log_level: default_log_level(),
            log_format: default_log_format(),
            database_url: String::new(),
            db_max_connections: default_db_max_connections(),
            db_acquire_timeout_ms: default_db_acquire_timeout_ms(),
            source: SourceConfig::default(),
            retry: RetryConfig::default(),
            sync: SyncConfig::default(),
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            platform: default_platform(),
            api_base: default_api_base(),
            app_id: String::new(),
            client_id: String::new(),
            secret_key: String::new(),
            request_timeout_seconds: default_request_timeout_seconds(),
            token_timeout_seconds: default_token_timeout_seconds(),
            token_refresh_lead_seconds: default_token_refresh_lead_seconds(),
            utc_offset_minutes: default_utc_offset_minutes(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_retry_max_attempts(),
            initial_delay_ms: default_retry_initial_delay_ms(),
            backoff_multiplier: default_retry_backoff_multiplier(),
            max_delay_ms: default_retry_max_delay_ms(),
            jitter_factor: default_retry_jitter_factor(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            max_pages: default_max_pages(),
            page_delay_ms: default_page_delay_ms(),
            default_lookback_hours: default_lookback_hours(),
            full_sync_lookback_days: default_full_sync_lookback_days(),
            status_refresh_days: default_status_refresh_days(),
            boundary_epsilon_ms: default_boundary_epsilon_ms(),
        }
    }
}

impl AppConfig {
    /// Returns a redacted JSON representation (secrets are redacted).
    pub fn redacted_json(&self) -> serde_json::Result<String> {
        let mut config = self.clone();
        if !config.database_url.is_empty() {
            config.database_url = redact_url_credentials(&config.database_url);
        }
        if !config.source.secret_key.is_empty() {
            config.source.secret_key = REDACTED.to_string();
        }
        if !config.source.client_id.is_empty() {
            config.source.client_id = REDACTED.to_string();
        }
        serde_json::to_string(&config)
    }

    /// Validate the full configuration before any task starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database_url.trim().is_empty() {
            return Err(ConfigError::MissingSetting {
                key: "DATABASE_URL",
            });
        }
        if self.db_max_connections == 0 {
            return Err(ConfigError::InvalidValue {
                key: "DB_MAX_CONNECTIONS".to_string(),
                value: "0".to_string(),
            });
        }
        match self.log_format.as_str() {
            "json" | "pretty" => {}
            other => {
                return Err(ConfigError::InvalidLogFormat {
                    value: other.to_string(),
                });
            }
        }

        self.source.validate()?;
        self.retry.validate()?;
        self.sync.validate()?;

        Ok(())
    }
}

/// Strip a password from a connection URL, leaving the rest readable.
fn redact_url_credentials(raw: &str) -> String {
    match url::Url::parse(raw) {
        Ok(mut parsed) if parsed.password().is_some() => {
            let _ = parsed.set_password(Some(REDACTED));
            parsed.to_string()
        }
        Ok(_) => raw.to_string(),
        Err(_) => REDACTED.to_string(),
    }
}

fn default_profile() -> String {
    "local".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_db_max_connections() -> u32 {
    5
}

fn default_db_acquire_timeout_ms() -> u64 {
    5000
}

fn default_platform() -> String {
    "xiaoe".to_string()
}

fn default_api_base() -> String {
    "https://api.xiaoe-tech.com".to_string()
}

fn default_request_timeout_seconds() -> u64 {
    30
}

fn default_token_timeout_seconds() -> u64 {
    15
}

fn default_token_refresh_lead_seconds() -> u64 {
    300 // 5 minutes
}

fn default_utc_offset_minutes() -> i32 {
    480 // UTC+8
}

fn default_retry_max_attempts() -> u32 {
    3
}

fn default_retry_initial_delay_ms() -> u64 {
    5000 // 5 seconds
}

fn default_retry_backoff_multiplier() -> f64 {
    2.0
}

fn default_retry_max_delay_ms() -> u64 {
    60_000 // 1 minute
}

fn default_retry_jitter_factor() -> f64 {
    0.0
}

fn default_page_size() -> u32 {
    50
}

fn default_max_pages() -> u32 {
    500
}

fn default_page_delay_ms() -> u64 {
    500
}

fn default_lookback_hours() -> u64 {
    24
}

fn default_full_sync_lookback_days() -> u64 {
    365
}

fn default_status_refresh_days() -> u64 {
    15
}

fn default_boundary_epsilon_ms() -> u64 {
    1000
}

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load environment file {path}: {source}")]
    EnvFile {
        path: PathBuf,
        source: dotenvy::Error,
    },
    #[error("{key} is required; set {prefix}{key}", prefix = ENV_PREFIX)]
    MissingSetting { key: &'static str },
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },
    #[error("invalid source api base '{value}': {source}")]
    InvalidApiBase {
        value: String,
        source: url::ParseError,
    },
    #[error("failed to build source http client: {0}")]
    HttpClient(#[source] reqwest::Error),
    #[error("log format must be 'json' or 'pretty', got '{value}'")]
    InvalidLogFormat { value: String },
    #[error("request and token timeouts must be positive")]
    InvalidTimeout,
    #[error("source utc offset must be within +-18 hours, got {value} minutes")]
    InvalidUtcOffset { value: i32 },
    #[error("retry max attempts must be between 1 and 10, got {value}")]
    InvalidRetryAttempts { value: u32 },
    #[error("retry backoff multiplier must be between 1.0 and 10.0, got {value}")]
    InvalidBackoffMultiplier { value: f64 },
    #[error("retry initial delay ({initial}ms) cannot be greater than max delay ({max}ms)")]
    InvalidRetryBounds { initial: u64, max: u64 },
    #[error("retry jitter factor must be between 0.0 and 1.0, got {value}")]
    InvalidRetryJitter { value: f64 },
    #[error("page size must be between 1 and 100, got {value}")]
    InvalidPageSize { value: u32 },
    #[error("max pages must be positive")]
    InvalidMaxPages,
    #[error("lookback windows must be positive and at most 100 years")]
    InvalidLookback,
    #[error("status refresh window must be positive and at most 100 years")]
    InvalidStatusRefreshWindow,
    #[error("boundary epsilon must be at most one hour, got {value}ms")]
    InvalidBoundaryEpsilon { value: u64 },
}

/// Loads configuration using layered `.env` files and `STORESYNC_*` env vars.
pub struct ConfigLoader {
    base_dir: PathBuf,
}

impl ConfigLoader {
    /// Creates a new loader rooted at the current working directory.
    pub fn new() -> Self {
        Self {
            base_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    /// Creates a loader rooted at the provided directory (useful for tests).
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let (mut layered, profile_hint) = self.collect_layered_env()?;

        // Overlay process environment last so it wins.
        for (key, value) in env::vars() {
            if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                layered.insert(stripped.to_string(), value);
            }
        }

        let profile = take_string(&mut layered, "PROFILE").unwrap_or(profile_hint);
        let log_level = take_string(&mut layered, "LOG_LEVEL").unwrap_or_else(default_log_level);
        let log_format =
            take_string(&mut layered, "LOG_FORMAT").unwrap_or_else(default_log_format);
        let database_url = take_string(&mut layered, "DATABASE_URL").unwrap_or_default();
        let db_max_connections =
            take_parsed(&mut layered, "DB_MAX_CONNECTIONS", default_db_max_connections)?;
        let db_acquire_timeout_ms = take_parsed(
            &mut layered,
            "DB_ACQUIRE_TIMEOUT_MS",
            default_db_acquire_timeout_ms,
        )?;

        let source = SourceConfig {
            platform: take_string(&mut layered, "SOURCE_PLATFORM")
                .unwrap_or_else(default_platform),
            api_base: take_string(&mut layered, "SOURCE_API_BASE")
                .unwrap_or_else(default_api_base),
            app_id: take_string(&mut layered, "SOURCE_APP_ID").unwrap_or_default(),
            client_id: take_string(&mut layered, "SOURCE_CLIENT_ID").unwrap_or_default(),
            secret_key: take_string(&mut layered, "SOURCE_SECRET_KEY").unwrap_or_default(),
            request_timeout_seconds: take_parsed(
                &mut layered,
                "SOURCE_REQUEST_TIMEOUT_SECONDS",
                default_request_timeout_seconds,
            )?,
            token_timeout_seconds: take_parsed(
                &mut layered,
                "SOURCE_TOKEN_TIMEOUT_SECONDS",
                default_token_timeout_seconds,
            )?,
            token_refresh_lead_seconds: take_parsed(
                &mut layered,
                "SOURCE_TOKEN_REFRESH_LEAD_SECONDS",
                default_token_refresh_lead_seconds,
            )?,
            utc_offset_minutes: take_parsed(
                &mut layered,
                "SOURCE_UTC_OFFSET_MINUTES",
                default_utc_offset_minutes,
            )?,
        };

        let retry = RetryConfig {
            max_attempts: take_parsed(
                &mut layered,
                "RETRY_MAX_ATTEMPTS",
                default_retry_max_attempts,
            )?,
            initial_delay_ms: take_parsed(
                &mut layered,
                "RETRY_INITIAL_DELAY_MS",
                default_retry_initial_delay_ms,
            )?,
            backoff_multiplier: take_parsed(
                &mut layered,
                "RETRY_BACKOFF_MULTIPLIER",
                default_retry_backoff_multiplier,
            )?,
            max_delay_ms: take_parsed(
                &mut layered,
                "RETRY_MAX_DELAY_MS",
                default_retry_max_delay_ms,
            )?,
            jitter_factor: take_parsed(
                &mut layered,
                "RETRY_JITTER_FACTOR",
                default_retry_jitter_factor,
            )?,
        };

        let sync = SyncConfig {
            page_size: take_parsed(&mut layered, "SYNC_PAGE_SIZE", default_page_size)?,
            max_pages: take_parsed(&mut layered, "SYNC_MAX_PAGES", default_max_pages)?,
            page_delay_ms: take_parsed(&mut layered, "SYNC_PAGE_DELAY_MS", default_page_delay_ms)?,
            default_lookback_hours: take_parsed(
                &mut layered,
                "SYNC_DEFAULT_LOOKBACK_HOURS",
                default_lookback_hours,
            )?,
            full_sync_lookback_days: take_parsed(
                &mut layered,
                "SYNC_FULL_SYNC_LOOKBACK_DAYS",
                default_full_sync_lookback_days,
            )?,
            status_refresh_days: take_parsed(
                &mut layered,
                "SYNC_STATUS_REFRESH_DAYS",
                default_status_refresh_days,
            )?,
            boundary_epsilon_ms: take_parsed(
                &mut layered,
                "SYNC_BOUNDARY_EPSILON_MS",
                default_boundary_epsilon_ms,
            )?,
        };

        let config = AppConfig {
            profile,
            log_level,
            log_format,
            database_url,
            db_max_connections,
            db_acquire_timeout_ms,
            source,
            retry,
            sync,
        };

        config.validate()?;
        Ok(config)
    }

    fn collect_layered_env(&self) -> Result<(BTreeMap<String, String>, String), ConfigError> {
        let mut values = BTreeMap::new();

        self.merge_dotenv(self.base_dir.join(".env"), &mut values)?;
        self.merge_dotenv(self.base_dir.join(".env.local"), &mut values)?;

        let profile = env::var(format!("{ENV_PREFIX}PROFILE"))
            .ok()
            .or_else(|| values.get("PROFILE").cloned())
            .unwrap_or_else(default_profile);

        self.merge_dotenv(
            self.base_dir.join(format!(".env.{}", &profile)),
            &mut values,
        )?;
        self.merge_dotenv(
            self.base_dir.join(format!(".env.{}.local", &profile)),
            &mut values,
        )?;

        Ok((values, profile))
    }

    fn merge_dotenv(
        &self,
        path: PathBuf,
        values: &mut BTreeMap<String, String>,
    ) -> Result<(), ConfigError> {
        match dotenvy::from_path_iter(&path) {
            Ok(iter) => {
                for item in iter {
                    let (key, value) = item.map_err(|source| ConfigError::EnvFile {
                        path: path.clone(),
                        source,
                    })?;
                    if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                        values.insert(stripped.to_string(), value);
                    }
                }
                Ok(())
            }
            Err(dotenvy::Error::Io(ref io_err))
                if io_err.kind() == std::io::ErrorKind::NotFound =>
            {
                Ok(())
            }
            Err(err) => Err(ConfigError::EnvFile { path, source: err }),
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn take_string(layered: &mut BTreeMap<String, String>, key: &str) -> Option<String> {
    layered
        .remove(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Empty values fall back to the default; unparseable ones are an error.
fn take_parsed<T: FromStr>(
    layered: &mut BTreeMap<String, String>,
    key: &str,
    default: fn() -> T,
) -> Result<T, ConfigError> {
    match take_string(layered, key) {
        None => Ok(default()),
        Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.database_url = "sqlite::memory:".to_string();
        config.source.app_id = "app".to_string();
        config.source.client_id = "client".to_string();
        config.source.secret_key = "secret".to_string();
        config
    }

    #[test]
    fn defaults_need_destination_and_credentials() {
        let err = AppConfig::default().validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingSetting {
                key: "DATABASE_URL"
            }
        ));

        let mut config = valid_config();
        config.source.secret_key = "  ".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingSetting {
                key: "SOURCE_SECRET_KEY"
            })
        ));

        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_retry_config_validation() {
        let mut retry = RetryConfig::default();
        assert!(retry.validate().is_ok());

        retry.initial_delay_ms = 120_000;
        assert!(matches!(
            retry.validate(),
            Err(ConfigError::InvalidRetryBounds { .. })
        ));

        let retry = RetryConfig {
            backoff_multiplier: 0.5,
            ..RetryConfig::default()
        };
        assert!(retry.validate().is_err());

        let retry = RetryConfig {
            max_attempts: 0,
            ..RetryConfig::default()
        };
        assert!(retry.validate().is_err());
    }

    #[test]
    fn test_sync_config_validation() {
        assert!(SyncConfig::default().validate().is_ok());

        let sync = SyncConfig {
            page_size: 0,
            ..SyncConfig::default()
        };
        assert!(matches!(
            sync.validate(),
            Err(ConfigError::InvalidPageSize { value: 0 })
        ));

        let sync = SyncConfig {
            boundary_epsilon_ms: MAX_BOUNDARY_EPSILON_MS,
            ..SyncConfig::default()
        };
        assert!(sync.validate().is_ok());

        let sync = SyncConfig {
            boundary_epsilon_ms: u64::MAX,
            ..SyncConfig::default()
        };
        assert!(matches!(
            sync.validate(),
            Err(ConfigError::InvalidBoundaryEpsilon { value: u64::MAX })
        ));
    }

    #[test]
    fn redacts_secrets_and_database_password() {
        let mut config = valid_config();
        config.database_url = "postgres://sync:hunter2@db:5432/store".to_string();
        let json = config.redacted_json().unwrap();

        assert!(!json.contains("hunter2"));
        assert!(!json.contains("\"secret\""));
        assert!(json.contains("db:5432/store"));
    }

    #[test]
    fn unparseable_numbers_are_rejected() {
        let mut layered = BTreeMap::new();
        layered.insert("SYNC_PAGE_SIZE".to_string(), "fifty".to_string());
        let err = take_parsed(&mut layered, "SYNC_PAGE_SIZE", default_page_size).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));

        let mut layered = BTreeMap::new();
        layered.insert("SYNC_PAGE_SIZE".to_string(), "".to_string());
        assert_eq!(
            take_parsed(&mut layered, "SYNC_PAGE_SIZE", default_page_size).unwrap(),
            50
        );
    }
}
