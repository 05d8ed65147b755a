use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use markovrec_core::config::{resolve_config_path, AppConfig, LoadOptions};
use toml::Value;

use crate::commands::{CommandResult, EXIT_CONFIG};

pub fn run(config_path: Option<PathBuf>) -> CommandResult {
    let config = match AppConfig::load(LoadOptions {
        config_path: config_path.clone(),
        ..LoadOptions::default()
    }) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "config",
                "config_validation",
                format!("configuration issue: {error}"),
                EXIT_CONFIG,
            );
        }
    };

    let file_path = resolve_config_path(config_path.as_deref());
    let file_doc = load_config_file_doc(file_path.as_deref());
    let source = |key_path: &str, env_keys: &[&str]| {
        field_source(key_path, env_keys, file_doc.as_ref(), file_path.as_deref())
    };

    let seed = config.recommend.seed.map_or_else(|| "<unset>".to_string(), |seed| seed.to_string());
    let entries = [
        ("chain.order", config.chain.order.to_string(), &["MARKOVREC_MARKOV_ORDER"][..]),
        (
            "chain.session_threshold",
            config.chain.session_threshold.to_string(),
            &["MARKOVREC_SESSION_THRESHOLD"][..],
        ),
        (
            "recommend.num_steps",
            config.recommend.num_steps.to_string(),
            &["MARKOVREC_NUM_STEPS"][..],
        ),
        (
            "recommend.pseudocount",
            config.recommend.pseudocount.to_string(),
            &["MARKOVREC_PSEUDOCOUNT"][..],
        ),
        ("recommend.seed", seed, &["MARKOVREC_SEED"][..]),
        ("columns.user", config.columns.user.clone(), &["MARKOVREC_COLUMN_USER"][..]),
        ("columns.item", config.columns.item.clone(), &["MARKOVREC_COLUMN_ITEM"][..]),
        ("columns.time", config.columns.time.clone(), &["MARKOVREC_COLUMN_TIME"][..]),
        (
            "logging.level",
            config.logging.level.clone(),
            &["MARKOVREC_LOGGING_LEVEL", "MARKOVREC_LOG_LEVEL"][..],
        ),
        (
            "logging.format",
            format!("{:?}", config.logging.format).to_ascii_lowercase(),
            &["MARKOVREC_LOGGING_FORMAT", "MARKOVREC_LOG_FORMAT"][..],
        ),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for (key, value, env_keys) in entries {
        lines.push(render_line(key, &value, source(key, env_keys)));
    }

    CommandResult { exit_code: 0, output: lines.join("\n") }
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
    let set = |key: &&str| env::var(key).is_ok_and(|value| !value.trim().is_empty());
    if let Some(env_key) = env_keys.iter().find(|key| set(key)) {
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
