use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::errors::EngineError;
use crate::optimizer::WinStrategy;
use crate::policy::EnginePolicy;

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct AppConfig {
    pub policy: EnginePolicy,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: LogFormat::Compact }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
    pub strategy: Option<WinStrategy>,
    pub bid_threshold: Option<f64>,
    pub review_threshold: Option<f64>,
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
    #[error(transparent)]
    Policy(#[from] EngineError),
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

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let file = read_file(&path)?;
            config.policy = file.policy;
            config.apply_logging_patch(file.logging);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("bidwise.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_logging_patch(&mut self, patch: Option<LoggingPatch>) {
        let Some(logging) = patch else {
            return;
        };
        if let Some(level) = logging.level {
            self.logging.level = level;
        }
        if let Some(format) = logging.format {
            self.logging.format = format;
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        let log_level =
            read_env("BIDWISE_LOGGING_LEVEL").or_else(|| read_env("BIDWISE_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("BIDWISE_LOGGING_FORMAT").or_else(|| read_env("BIDWISE_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        if let Some(value) = read_env("BIDWISE_ENGINE_STRATEGY") {
            self.policy.engine.strategy = WinStrategy::from_name(&value).ok_or_else(|| {
                ConfigError::InvalidEnvOverride {
                    key: "BIDWISE_ENGINE_STRATEGY".to_string(),
                    value: value.clone(),
                }
            })?;
        }
        if let Some(value) = read_env("BIDWISE_OPTIMIZER_GRID_STEP") {
            self.policy.optimizer.grid_step = parse_f64("BIDWISE_OPTIMIZER_GRID_STEP", &value)?;
        }
        if let Some(value) = read_env("BIDWISE_OPTIMIZER_MAX_RATIO") {
            self.policy.optimizer.max_ratio = parse_f64("BIDWISE_OPTIMIZER_MAX_RATIO", &value)?;
        }
        if let Some(value) = read_env("BIDWISE_ASSESSMENT_HIGH_CONFIDENCE_SAMPLES") {
            self.policy.assessment.high_confidence_samples =
                parse_usize("BIDWISE_ASSESSMENT_HIGH_CONFIDENCE_SAMPLES", &value)?;
        }
        if let Some(value) = read_env("BIDWISE_MATCHER_BID_THRESHOLD") {
            self.policy.matcher.bid_threshold =
                parse_f64("BIDWISE_MATCHER_BID_THRESHOLD", &value)?;
        }
        if let Some(value) = read_env("BIDWISE_MATCHER_REVIEW_THRESHOLD") {
            self.policy.matcher.review_threshold =
                parse_f64("BIDWISE_MATCHER_REVIEW_THRESHOLD", &value)?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
        if let Some(strategy) = overrides.strategy {
            self.policy.engine.strategy = strategy;
        }
        if let Some(bid_threshold) = overrides.bid_threshold {
            self.policy.matcher.bid_threshold = bid_threshold;
        }
        if let Some(review_threshold) = overrides.review_threshold {
            self.policy.matcher.review_threshold = review_threshold;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_logging(&self.logging)?;
        self.policy.validate()?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("bidwise.toml"), PathBuf::from("config/bidwise.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_file(path: &Path) -> Result<ConfigFile, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigFile>(&interpolated)
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

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_f64(key: &str, value: &str) -> Result<f64, ConfigError> {
    value.trim().parse::<f64>().ok().filter(|parsed| parsed.is_finite()).ok_or_else(|| {
        ConfigError::InvalidEnvOverride { key: key.to_string(), value: value.to_string() }
    })
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.trim().parse::<usize>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

/// On-disk layout: policy sections at the top level next to `[logging]`.
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    logging: Option<LoggingPatch>,
    #[serde(flatten)]
    policy: EnginePolicy,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
