use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use caseworth_core::config::{AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let api_key =
        redact_key(config.valuation_service.api_key.as_ref().map(|key| key.expose_secret()));

    let source = |key_path: &str, env_keys: &[&str]| {
        field_source(key_path, env_keys, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    lines.push(render_line(
        "database.url",
        &config.database.url,
        source("database.url", &["CASEWORTH_DATABASE_URL"]),
    ));
    lines.push(render_line(
        "database.max_connections",
        &config.database.max_connections.to_string(),
        source("database.max_connections", &["CASEWORTH_DATABASE_MAX_CONNECTIONS"]),
    ));
    lines.push(render_line(
        "database.timeout_secs",
        &config.database.timeout_secs.to_string(),
        source("database.timeout_secs", &["CASEWORTH_DATABASE_TIMEOUT_SECS"]),
    ));
    lines.push(render_line(
        "valuation_service.enabled",
        &config.valuation_service.enabled.to_string(),
        source("valuation_service.enabled", &["CASEWORTH_VALUATION_SERVICE_ENABLED"]),
    ));
    lines.push(render_line(
        "valuation_service.base_url",
        config.valuation_service.base_url.as_deref().unwrap_or("<unset>"),
        source("valuation_service.base_url", &["CASEWORTH_VALUATION_SERVICE_BASE_URL"]),
    ));
    lines.push(render_line(
        "valuation_service.api_key",
        &api_key,
        source("valuation_service.api_key", &["CASEWORTH_VALUATION_SERVICE_API_KEY"]),
    ));
    lines.push(render_line(
        "valuation_service.timeout_secs",
        &config.valuation_service.timeout_secs.to_string(),
        source("valuation_service.timeout_secs", &["CASEWORTH_VALUATION_SERVICE_TIMEOUT_SECS"]),
    ));
    lines.push(render_line(
        "logging.level",
        &config.logging.level,
        source("logging.level", &["CASEWORTH_LOGGING_LEVEL", "CASEWORTH_LOG_LEVEL"]),
    ));
    lines.push(render_line(
        "logging.format",
        &format!("{:?}", config.logging.format).to_lowercase(),
        source("logging.format", &["CASEWORTH_LOGGING_FORMAT", "CASEWORTH_LOG_FORMAT"]),
    ));

    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    ["caseworth.toml", "config/caseworth.toml"]
        .into_iter()
        .map(PathBuf::from)
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

/// Keeps at most a short prefix of the key visible.
fn redact_key(key: Option<&str>) -> String {
    let Some(key) = key.map(str::trim) else {
        return "<unset>".to_string();
    };
    if key.is_empty() {
        return "<empty>".to_string();
    }

    match key.split_once('-') {
        Some((prefix, _)) if prefix.len() <= 4 => format!("{prefix}-***"),
        _ => "<redacted>".to_string(),
    }
}
