use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use bidwise_core::config::{AppConfig, LoadOptions};
use toml::Value;

struct Field {
    key_path: &'static str,
    env_keys: &'static [&'static str],
    value: String,
}

pub fn run(options: LoadOptions) -> String {
    let config_file_path = detect_config_path(options.config_path.as_deref());
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let policy = &config.policy;
    let fields = [
        Field {
            key_path: "logging.level",
            env_keys: &["BIDWISE_LOGGING_LEVEL", "BIDWISE_LOG_LEVEL"],
            value: config.logging.level.clone(),
        },
        Field {
            key_path: "logging.format",
            env_keys: &["BIDWISE_LOGGING_FORMAT", "BIDWISE_LOG_FORMAT"],
            value: format!("{:?}", config.logging.format).to_lowercase(),
        },
        Field {
            key_path: "engine.strategy",
            env_keys: &["BIDWISE_ENGINE_STRATEGY"],
            value: policy.engine.strategy.name().to_string(),
        },
        Field {
            key_path: "matcher.bid_threshold",
            env_keys: &["BIDWISE_MATCHER_BID_THRESHOLD"],
            value: policy.matcher.bid_threshold.to_string(),
        },
        Field {
            key_path: "matcher.review_threshold",
            env_keys: &["BIDWISE_MATCHER_REVIEW_THRESHOLD"],
            value: policy.matcher.review_threshold.to_string(),
        },
        Field {
            key_path: "assessment.high_confidence_samples",
            env_keys: &["BIDWISE_ASSESSMENT_HIGH_CONFIDENCE_SAMPLES"],
            value: policy.assessment.high_confidence_samples.to_string(),
        },
        Field {
            key_path: "optimizer.grid_step",
            env_keys: &["BIDWISE_OPTIMIZER_GRID_STEP"],
            value: policy.optimizer.grid_step.to_string(),
        },
        Field {
            key_path: "optimizer.max_ratio",
            env_keys: &["BIDWISE_OPTIMIZER_MAX_RATIO"],
            value: policy.optimizer.max_ratio.to_string(),
        },
        Field {
            key_path: "optimizer.cost_ratio",
            env_keys: &[],
            value: policy.optimizer.cost_ratio.to_string(),
        },
        Field {
            key_path: "optimizer.participation_cost",
            env_keys: &[],
            value: policy.optimizer.participation_cost.to_string(),
        },
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for field in &fields {
        let source = field_source(
            field.key_path,
            field.env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(field.key_path, &field.value, source));
    }

    lines.join("\n")
}

fn detect_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return path.exists().then(|| path.to_path_buf());
    }

    [PathBuf::from("bidwise.toml"), PathBuf::from("config/bidwise.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
