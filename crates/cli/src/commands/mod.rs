pub mod backtest;
pub mod config;
pub mod doctor;
pub mod matching;
pub mod predict;

use std::fs;
use std::path::Path;

use anyhow::Context;
use bidwise_core::config::{AppConfig, LoadOptions};
use bidwise_core::errors::{EngineError, InterfaceError};
use serde::de::DeserializeOwned;
use serde::Serialize;

pub const EXIT_CONFIG: u8 = 2;
pub const EXIT_INPUT: u8 = 3;
pub const EXIT_ENGINE: u8 = 4;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    /// Successful run whose stdout is the serialized result itself.
    pub fn report(command: &str, value: &impl Serialize) -> Self {
        match serde_json::to_string_pretty(value) {
            Ok(output) => Self { exit_code: 0, output },
            Err(error) => Self::failure(command, "serialization", error.to_string(), EXIT_ENGINE),
        }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    pub fn input_failure(command: &str, error: &anyhow::Error) -> Self {
        Self::failure(command, "invalid_input", format!("{error:#}"), EXIT_INPUT)
    }

    pub fn engine_failure(command: &str, error: &EngineError) -> Self {
        let exit_code = match error {
            EngineError::InvalidInput(_) => EXIT_INPUT,
            EngineError::Configuration(_) => EXIT_CONFIG,
            EngineError::Transition(_) => EXIT_ENGINE,
        };
        let interface = InterfaceError::from(error.clone());
        Self::failure(
            command,
            error.error_class(),
            format!("{} ({error})", interface.user_message()),
            exit_code,
        )
    }
}

/// Loads and validates configuration, mapping failure to the config exit code.
pub fn load_config(command: &str, options: LoadOptions) -> Result<AppConfig, CommandResult> {
    AppConfig::load(options).map_err(|error| {
        CommandResult::failure(
            command,
            "config_validation",
            format!("configuration issue: {error}"),
            EXIT_CONFIG,
        )
    })
}

pub fn read_json<T: DeserializeOwned>(path: &Path, what: &str) -> anyhow::Result<T> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("could not read {what} file `{}`", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("could not parse {what} file `{}`", path.display()))
}

pub fn read_optional_json<T: DeserializeOwned + Default>(
    path: Option<&Path>,
    what: &str,
) -> anyhow::Result<T> {
    match path {
        Some(path) => read_json(path, what),
        None => Ok(T::default()),
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\
             \"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}
