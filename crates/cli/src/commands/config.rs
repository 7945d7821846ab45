use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use toml::Value;

use crate::commands::{load_config, CommandResult};
use cartage_core::config::LoadOptions;

#[derive(Debug, Serialize)]
struct ConfigReport {
    precedence: &'static str,
    config_file: Option<String>,
    entries: Vec<ConfigEntry>,
}

#[derive(Debug, Serialize)]
struct ConfigEntry {
    key: &'static str,
    value: String,
    source: String,
}

/// Effective configuration with the source each value came from.
pub fn run(options: &LoadOptions) -> CommandResult {
    let config = match load_config(options) {
        Ok(config) => config,
        Err(failure) => return failure.into_result("config"),
    };

    let config_file_path = detect_config_path(options.config_path.as_deref());
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let overrides = &options.overrides;

    let sources = SourceLookup { doc: config_file_doc.as_ref(), path: config_file_path.as_deref() };
    let operator_ids = if config.dispatch.operator_ids.is_empty() {
        "<none>".to_string()
    } else {
        config.dispatch.operator_ids.join(",")
    };
    let rate_table_path = config
        .pricing
        .rate_table_path
        .as_ref()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "<unset>".to_string());

    let entries = vec![
        sources.entry(
            "database.url",
            config.database.url.clone(),
            &["CARTAGE_DATABASE_URL"],
            overrides.database_url.is_some(),
        ),
        sources.entry(
            "database.max_connections",
            config.database.max_connections.to_string(),
            &["CARTAGE_DATABASE_MAX_CONNECTIONS"],
            false,
        ),
        sources.entry(
            "database.timeout_secs",
            config.database.timeout_secs.to_string(),
            &["CARTAGE_DATABASE_TIMEOUT_SECS"],
            false,
        ),
        sources.entry(
            "pricing.currency",
            config.pricing.currency.clone(),
            &["CARTAGE_PRICING_CURRENCY"],
            overrides.currency.is_some(),
        ),
        sources.entry(
            "pricing.rate_table_path",
            rate_table_path,
            &["CARTAGE_PRICING_RATE_TABLE_PATH"],
            overrides.rate_table_path.is_some(),
        ),
        sources.entry(
            "dispatch.operator_ids",
            operator_ids,
            &["CARTAGE_DISPATCH_OPERATOR_IDS"],
            false,
        ),
        sources.entry(
            "logging.level",
            config.logging.level.clone(),
            &["CARTAGE_LOGGING_LEVEL", "CARTAGE_LOG_LEVEL"],
            overrides.log_level.is_some(),
        ),
        sources.entry(
            "logging.format",
            format!("{:?}", config.logging.format).to_lowercase(),
            &["CARTAGE_LOGGING_FORMAT", "CARTAGE_LOG_FORMAT"],
            overrides.log_format.is_some(),
        ),
    ];

    CommandResult::report(
        "config",
        &ConfigReport {
            precedence: "override > env > file > default",
            config_file: config_file_path.map(|path| path.display().to_string()),
            entries,
        },
    )
}

struct SourceLookup<'a> {
    doc: Option<&'a Value>,
    path: Option<&'a Path>,
}

impl SourceLookup<'_> {
    fn entry(
        &self,
        key: &'static str,
        value: String,
        env_keys: &[&str],
        overridden: bool,
    ) -> ConfigEntry {
        let source = if overridden {
            "override".to_string()
        } else {
            field_source(key, env_keys, self.doc, self.path)
        };
        ConfigEntry { key, value, source }
    }
}

fn detect_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return path.exists().then(|| path.to_path_buf());
    }

    let root = PathBuf::from("cartage.toml");
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/cartage.toml");
    if nested.exists() {
        return Some(nested);
    }

    None
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

#[cfg(test)]
mod tests {
    use toml::Value;

    use super::contains_path;

    #[test]
    fn contains_path_walks_nested_tables() {
        let doc = "[pricing]\ncurrency = \"PHP\"\n".parse::<Value>().expect("toml");
        assert!(contains_path(&doc, "pricing.currency"));
        assert!(!contains_path(&doc, "pricing.rate_table_path"));
        assert!(!contains_path(&doc, "dispatch.operator_ids"));
    }
}
