use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub ingest: IngestConfig,
    pub trend: TrendConfig,
    pub scoring: ScoringConfig,
    pub collaborators: CollaboratorsConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

/// Source dataset and the operator-chosen analysis window.
#[derive(Clone, Debug)]
pub struct IngestConfig {
    pub events_path: PathBuf,
    /// Inclusive window bounds in `YYYYMMDD` form, matching the event feed.
    pub start_date: String,
    pub end_date: String,
    /// Skus with fewer qualifying events than this are excluded from output.
    pub min_activity_events: u64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrendConfig {
    pub growing_threshold: f64,
    pub declining_threshold: f64,
}

/// Weights of the composite performance score. The constants mirror the
/// warehouse scoring query this engine replaced; they are data, not truths.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScoringConfig {
    pub conversion_weight: f64,
    pub revenue_weight: f64,
    pub reach_weight: f64,
    pub trend_bonus: f64,
    pub revenue_per_view_divisor: f64,
    pub reach_saturation: f64,
}

#[derive(Clone, Debug)]
pub struct CollaboratorsConfig {
    pub mode: CollaboratorMode,
    pub forecast_url: Option<String>,
    pub segmentation_url: Option<String>,
    pub classification_url: Option<String>,
    pub timeout_secs: u64,
    pub max_concurrent_requests: usize,
    pub batch_size: usize,
    pub forecast_horizon_days: u32,
    pub early_window_days: u32,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollaboratorMode {
    Disabled,
    Stub,
    Http,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

/// Inclusive calendar-day window the normalizer filters against.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub events_path: Option<PathBuf>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub collaborator_mode: Option<CollaboratorMode>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://retailsense.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            ingest: IngestConfig {
                events_path: PathBuf::from("events.jsonl"),
                start_date: "20210101".to_string(),
                end_date: "20210331".to_string(),
                min_activity_events: 5,
            },
            trend: TrendConfig::default(),
            scoring: ScoringConfig::default(),
            collaborators: CollaboratorsConfig {
                mode: CollaboratorMode::Disabled,
                forecast_url: None,
                segmentation_url: None,
                classification_url: None,
                timeout_secs: 30,
                max_concurrent_requests: 4,
                batch_size: 64,
                forecast_horizon_days: 30,
                early_window_days: 14,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self { growing_threshold: 0.1, declining_threshold: -0.1 }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            conversion_weight: 40.0,
            revenue_weight: 30.0,
            reach_weight: 20.0,
            trend_bonus: 10.0,
            revenue_per_view_divisor: 10.0,
            reach_saturation: 100.0,
        }
    }
}

impl std::str::FromStr for CollaboratorMode {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "disabled" => Ok(Self::Disabled),
            "stub" => Ok(Self::Stub),
            "http" => Ok(Self::Http),
            other => Err(ConfigError::Validation(format!(
                "unsupported collaborator mode `{other}` (expected disabled|stub|http)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl IngestConfig {
    /// Parses the configured window bounds. A malformed or inverted window is
    /// fatal: no aggregation may start against an undefined window.
    pub fn date_window(&self) -> Result<DateWindow, ConfigError> {
        let start = parse_window_date("ingest.start_date", &self.start_date)?;
        let end = parse_window_date("ingest.end_date", &self.end_date)?;
        if start > end {
            return Err(ConfigError::Validation(format!(
                "ingest window is inverted: start {start} is after end {end}"
            )));
        }
        Ok(DateWindow { start, end })
    }
}

fn parse_window_date(key: &str, value: &str) -> Result<NaiveDate, ConfigError> {
    NaiveDate::parse_from_str(value, "%Y%m%d").map_err(|_| {
        ConfigError::Validation(format!("{key} must be a `YYYYMMDD` date, got `{value}`"))
    })
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from("retailsense.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(ingest) = patch.ingest {
            if let Some(events_path) = ingest.events_path {
                self.ingest.events_path = PathBuf::from(events_path);
            }
            if let Some(start_date) = ingest.start_date {
                self.ingest.start_date = start_date;
            }
            if let Some(end_date) = ingest.end_date {
                self.ingest.end_date = end_date;
            }
            if let Some(min_activity_events) = ingest.min_activity_events {
                self.ingest.min_activity_events = min_activity_events;
            }
        }

        if let Some(trend) = patch.trend {
            if let Some(growing_threshold) = trend.growing_threshold {
                self.trend.growing_threshold = growing_threshold;
            }
            if let Some(declining_threshold) = trend.declining_threshold {
                self.trend.declining_threshold = declining_threshold;
            }
        }

        if let Some(scoring) = patch.scoring {
            if let Some(conversion_weight) = scoring.conversion_weight {
                self.scoring.conversion_weight = conversion_weight;
            }
            if let Some(revenue_weight) = scoring.revenue_weight {
                self.scoring.revenue_weight = revenue_weight;
            }
            if let Some(reach_weight) = scoring.reach_weight {
                self.scoring.reach_weight = reach_weight;
            }
            if let Some(trend_bonus) = scoring.trend_bonus {
                self.scoring.trend_bonus = trend_bonus;
            }
            if let Some(revenue_per_view_divisor) = scoring.revenue_per_view_divisor {
                self.scoring.revenue_per_view_divisor = revenue_per_view_divisor;
            }
            if let Some(reach_saturation) = scoring.reach_saturation {
                self.scoring.reach_saturation = reach_saturation;
            }
        }

        if let Some(collaborators) = patch.collaborators {
            if let Some(mode) = collaborators.mode {
                self.collaborators.mode = mode;
            }
            if let Some(forecast_url) = collaborators.forecast_url {
                self.collaborators.forecast_url = Some(forecast_url);
            }
            if let Some(segmentation_url) = collaborators.segmentation_url {
                self.collaborators.segmentation_url = Some(segmentation_url);
            }
            if let Some(classification_url) = collaborators.classification_url {
                self.collaborators.classification_url = Some(classification_url);
            }
            if let Some(timeout_secs) = collaborators.timeout_secs {
                self.collaborators.timeout_secs = timeout_secs;
            }
            if let Some(max_concurrent_requests) = collaborators.max_concurrent_requests {
                self.collaborators.max_concurrent_requests = max_concurrent_requests;
            }
            if let Some(batch_size) = collaborators.batch_size {
                self.collaborators.batch_size = batch_size;
            }
            if let Some(forecast_horizon_days) = collaborators.forecast_horizon_days {
                self.collaborators.forecast_horizon_days = forecast_horizon_days;
            }
            if let Some(early_window_days) = collaborators.early_window_days {
                self.collaborators.early_window_days = early_window_days;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("RETAILSENSE_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("RETAILSENSE_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_u32("RETAILSENSE_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("RETAILSENSE_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("RETAILSENSE_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("RETAILSENSE_EVENTS_PATH") {
            self.ingest.events_path = PathBuf::from(value);
        }
        if let Some(value) = read_env("RETAILSENSE_START_DATE") {
            self.ingest.start_date = value;
        }
        if let Some(value) = read_env("RETAILSENSE_END_DATE") {
            self.ingest.end_date = value;
        }
        if let Some(value) = read_env("RETAILSENSE_MIN_ACTIVITY_EVENTS") {
            self.ingest.min_activity_events =
                parse_u64("RETAILSENSE_MIN_ACTIVITY_EVENTS", &value)?;
        }

        if let Some(value) = read_env("RETAILSENSE_COLLABORATOR_MODE") {
            self.collaborators.mode = value.parse()?;
        }
        if let Some(value) = read_env("RETAILSENSE_FORECAST_URL") {
            self.collaborators.forecast_url = Some(value);
        }
        if let Some(value) = read_env("RETAILSENSE_SEGMENTATION_URL") {
            self.collaborators.segmentation_url = Some(value);
        }
        if let Some(value) = read_env("RETAILSENSE_CLASSIFICATION_URL") {
            self.collaborators.classification_url = Some(value);
        }
        if let Some(value) = read_env("RETAILSENSE_COLLABORATOR_TIMEOUT_SECS") {
            self.collaborators.timeout_secs =
                parse_u64("RETAILSENSE_COLLABORATOR_TIMEOUT_SECS", &value)?;
        }

        let log_level =
            read_env("RETAILSENSE_LOGGING_LEVEL").or_else(|| read_env("RETAILSENSE_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("RETAILSENSE_LOGGING_FORMAT").or_else(|| read_env("RETAILSENSE_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(events_path) = overrides.events_path {
            self.ingest.events_path = events_path;
        }
        if let Some(start_date) = overrides.start_date {
            self.ingest.start_date = start_date;
        }
        if let Some(end_date) = overrides.end_date {
            self.ingest.end_date = end_date;
        }
        if let Some(collaborator_mode) = overrides.collaborator_mode {
            self.collaborators.mode = collaborator_mode;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_ingest(&self.ingest)?;
        validate_trend(&self.trend)?;
        validate_collaborators(&self.collaborators)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("retailsense.toml"), PathBuf::from("config/retailsense.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_ingest(ingest: &IngestConfig) -> Result<(), ConfigError> {
    if ingest.events_path.as_os_str().is_empty() {
        return Err(ConfigError::Validation("ingest.events_path must not be empty".to_string()));
    }
    ingest.date_window()?;
    Ok(())
}

fn validate_trend(trend: &TrendConfig) -> Result<(), ConfigError> {
    for (key, value) in [
        ("trend.growing_threshold", trend.growing_threshold),
        ("trend.declining_threshold", trend.declining_threshold),
    ] {
        if !(-1.0..=1.0).contains(&value) {
            return Err(ConfigError::Validation(format!(
                "{key} must be a correlation threshold in [-1, 1], got {value}"
            )));
        }
    }
    if trend.declining_threshold > trend.growing_threshold {
        return Err(ConfigError::Validation(
            "trend.declining_threshold must not exceed trend.growing_threshold".to_string(),
        ));
    }
    Ok(())
}

fn validate_collaborators(collaborators: &CollaboratorsConfig) -> Result<(), ConfigError> {
    if collaborators.timeout_secs == 0 || collaborators.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "collaborators.timeout_secs must be in range 1..=300".to_string(),
        ));
    }
    if collaborators.max_concurrent_requests == 0 {
        return Err(ConfigError::Validation(
            "collaborators.max_concurrent_requests must be greater than zero".to_string(),
        ));
    }
    if collaborators.batch_size == 0 {
        return Err(ConfigError::Validation(
            "collaborators.batch_size must be greater than zero".to_string(),
        ));
    }

    if collaborators.mode == CollaboratorMode::Http {
        for (key, url) in [
            ("collaborators.forecast_url", &collaborators.forecast_url),
            ("collaborators.segmentation_url", &collaborators.segmentation_url),
            ("collaborators.classification_url", &collaborators.classification_url),
        ] {
            match url {
                Some(value) if value.starts_with("http://") || value.starts_with("https://") => {}
                Some(value) => {
                    return Err(ConfigError::Validation(format!(
                        "{key} must be an http(s) URL, got `{value}`"
                    )))
                }
                None => {
                    return Err(ConfigError::Validation(format!(
                        "{key} is required when collaborators.mode = \"http\""
                    )))
                }
            }
        }
    }

    Ok(())
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    ingest: Option<IngestPatch>,
    trend: Option<TrendPatch>,
    scoring: Option<ScoringPatch>,
    collaborators: Option<CollaboratorsPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct IngestPatch {
    events_path: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
    min_activity_events: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct TrendPatch {
    growing_threshold: Option<f64>,
    declining_threshold: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct ScoringPatch {
    conversion_weight: Option<f64>,
    revenue_weight: Option<f64>,
    reach_weight: Option<f64>,
    trend_bonus: Option<f64>,
    revenue_per_view_divisor: Option<f64>,
    reach_saturation: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct CollaboratorsPatch {
    mode: Option<CollaboratorMode>,
    forecast_url: Option<String>,
    segmentation_url: Option<String>,
    classification_url: Option<String>,
    timeout_secs: Option<u64>,
    max_concurrent_requests: Option<usize>,
    batch_size: Option<usize>,
    forecast_horizon_days: Option<u32>,
    early_window_days: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use chrono::NaiveDate;

    use super::{AppConfig, CollaboratorMode, ConfigError, ConfigOverrides, LoadOptions};

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("create temp config file");
        file.write_all(contents.as_bytes()).expect("write temp config file");
        file
    }

    #[test]
    fn defaults_validate() {
        let config = AppConfig::default();
        config.validate().expect("default config should be valid");
        assert_eq!(config.scoring.conversion_weight, 40.0);
        assert_eq!(config.trend.growing_threshold, 0.1);
    }

    #[test]
    fn file_patch_overrides_defaults() {
        let file = write_config(
            r#"
[ingest]
start_date = "20210201"
end_date = "20210228"
min_activity_events = 10

[trend]
growing_threshold = 0.25
"#,
        );

        let config = AppConfig::load(LoadOptions {
            config_path: Some(file.path().to_path_buf()),
            require_file: true,
            overrides: ConfigOverrides::default(),
        })
        .expect("patched config should load");

        assert_eq!(config.ingest.min_activity_events, 10);
        assert_eq!(config.trend.growing_threshold, 0.25);
        let window = config.ingest.date_window().expect("window parses");
        assert_eq!(window.start, NaiveDate::from_ymd_opt(2021, 2, 1).expect("date"));
    }

    #[test]
    fn inverted_window_fails_validation() {
        let mut config = AppConfig::default();
        config.ingest.start_date = "20210401".to_string();
        config.ingest.end_date = "20210101".to_string();

        let error = config.validate().expect_err("inverted window must be rejected");
        assert!(matches!(error, ConfigError::Validation(_)));
    }

    #[test]
    fn malformed_window_date_fails_validation() {
        let mut config = AppConfig::default();
        config.ingest.start_date = "2021-01-01".to_string();

        let error = config.validate().expect_err("non-YYYYMMDD date must be rejected");
        assert!(matches!(error, ConfigError::Validation(_)));
    }

    #[test]
    fn http_mode_requires_collaborator_urls() {
        let mut config = AppConfig::default();
        config.collaborators.mode = CollaboratorMode::Http;

        let error = config.validate().expect_err("http mode without urls must be rejected");
        assert!(matches!(error, ConfigError::Validation(_)));

        config.collaborators.forecast_url = Some("https://models.internal/forecast".to_string());
        config.collaborators.segmentation_url = Some("https://models.internal/segment".to_string());
        config.collaborators.classification_url =
            Some("https://models.internal/classify".to_string());
        config.validate().expect("fully-specified http mode should validate");
    }

    #[test]
    fn missing_required_file_is_reported() {
        let error = AppConfig::load(LoadOptions {
            config_path: Some(std::path::PathBuf::from("/nonexistent/retailsense.toml")),
            require_file: true,
            overrides: ConfigOverrides::default(),
        })
        .expect_err("missing required config file must fail");

        assert!(matches!(error, ConfigError::MissingConfigFile(_)));
    }
}
