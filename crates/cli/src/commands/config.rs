use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use breezy_core::config::{AppConfig, LoadOptions, DEFAULT_CONFIG_FILES};
use secrecy::ExposeSecret;
use toml::Value;

use super::CommandResult;

/// One displayed config key and the env vars that can set it, highest
/// precedence first.
struct Field {
    key: &'static str,
    env_keys: &'static [&'static str],
    value: String,
}

impl Field {
    fn new(key: &'static str, env_keys: &'static [&'static str], value: impl Into<String>) -> Self {
        Self { key, env_keys, value: value.into() }
    }
}

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return CommandResult::failed(2, format!("config validation failed: {error}")),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for field in fields(&config) {
        let source = field_source(
            field.key,
            field.env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(field.key, &field.value, source));
    }

    CommandResult::ok(lines.join("\n"))
}

fn fields(config: &AppConfig) -> Vec<Field> {
    let llm_api_key = match &config.llm.api_key {
        Some(key) => redact_token(key.expose_secret()),
        None => "<unset>".to_string(),
    };
    let catalog = &config.catalog;

    vec![
        Field::new(
            "server.bind_address",
            &["BREEZY_SERVER_BIND_ADDRESS"],
            &config.server.bind_address,
        ),
        Field::new("server.port", &["BREEZY_SERVER_PORT"], config.server.port.to_string()),
        Field::new(
            "server.static_dir",
            &["BREEZY_SERVER_STATIC_DIR"],
            config.server.static_dir.display().to_string(),
        ),
        Field::new(
            "crm.access_token",
            &["BREEZY_CRM_ACCESS_TOKEN", "HUBSPOT_ACCESS_TOKEN"],
            redact_token(config.crm.access_token.expose_secret()),
        ),
        Field::new("crm.base_url", &["BREEZY_CRM_BASE_URL"], &config.crm.base_url),
        Field::new(
            "crm.timeout_secs",
            &["BREEZY_CRM_TIMEOUT_SECS"],
            config.crm.timeout_secs.to_string(),
        ),
        Field::new(
            "crm.compensate_on_failure",
            &["BREEZY_CRM_COMPENSATE_ON_FAILURE"],
            config.crm.compensate_on_failure.to_string(),
        ),
        Field::new("llm.api_key", &["BREEZY_LLM_API_KEY", "GEMINI_API_KEY"], llm_api_key),
        Field::new("llm.base_url", &["BREEZY_LLM_BASE_URL"], &config.llm.base_url),
        Field::new("llm.model", &["BREEZY_LLM_MODEL"], &config.llm.model),
        Field::new(
            "llm.timeout_secs",
            &["BREEZY_LLM_TIMEOUT_SECS"],
            config.llm.timeout_secs.to_string(),
        ),
        Field::new("catalog.hardware_pipeline_id", &[], &catalog.hardware.id),
        Field::new("catalog.subscription_pipeline_id", &[], &catalog.subscription.id),
        Field::new("catalog.device_type_id", &[], &catalog.device.type_id),
        Field::new(
            "logging.level",
            &["BREEZY_LOGGING_LEVEL", "BREEZY_LOG_LEVEL"],
            &config.logging.level,
        ),
        Field::new(
            "logging.format",
            &["BREEZY_LOGGING_FORMAT", "BREEZY_LOG_FORMAT"],
            format!("{:?}", config.logging.format),
        ),
    ]
}

fn detect_config_path() -> Option<PathBuf> {
    DEFAULT_CONFIG_FILES.into_iter().map(PathBuf::from).find(|path| path.exists())
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
    let set_by_env = env_keys
        .iter()
        .find(|key| env::var(key).map(|value| !value.trim().is_empty()).unwrap_or(false));
    if let Some(env_key) = set_by_env {
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

const TOKEN_FAMILIES: [&str; 2] = ["pat-", "AIza"];

/// Keeps a known token family prefix (`pat-`, `AIza`) and hides the rest.
fn redact_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    TOKEN_FAMILIES
        .iter()
        .find(|family| trimmed.starts_with(*family))
        .map(|family| format!("{family}***"))
        .unwrap_or_else(|| "<redacted>".to_string())
}
