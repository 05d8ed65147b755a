use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::chain::DEFAULT_NUM_STEPS;
use crate::session::NO_SESSION_SPLIT;
use crate::training::BuildOptions;

pub const DEFAULT_CONFIG_FILE: &str = "markovrec.toml";
pub const NESTED_CONFIG_FILE: &str = "config/markovrec.toml";

#[derive(Clone, Debug, PartialEq)]
pub struct AppConfig {
    pub chain: ChainConfig,
    pub recommend: RecommendConfig,
    pub columns: ColumnConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ChainConfig {
    pub order: usize,
    pub session_threshold: f64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecommendConfig {
    pub num_steps: usize,
    pub pseudocount: bool,
    pub seed: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnConfig {
    pub user: String,
    pub item: String,
    pub time: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
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
    pub order: Option<usize>,
    pub session_threshold: Option<f64>,
    pub num_steps: Option<usize>,
    pub pseudocount: Option<bool>,
    pub seed: Option<u64>,
    pub column_user: Option<String>,
    pub column_item: Option<String>,
    pub column_time: Option<String>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
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
            chain: ChainConfig { order: 1, session_threshold: NO_SESSION_SPLIT },
            recommend: RecommendConfig {
                num_steps: DEFAULT_NUM_STEPS,
                pseudocount: true,
                seed: None,
            },
            columns: ColumnConfig {
                user: "user".to_string(),
                item: "item".to_string(),
                time: "time".to_string(),
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
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

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file || options.config_path.is_some() {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.trim_columns();
        config.validate()?;

        Ok(config)
    }

    pub fn build_options(&self) -> BuildOptions {
        BuildOptions { order: self.chain.order, session_threshold: self.chain.session_threshold }
    }

    fn trim_columns(&mut self) {
        for column in [&mut self.columns.user, &mut self.columns.item, &mut self.columns.time] {
            *column = column.trim().to_string();
        }
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(chain) = patch.chain {
            if let Some(order) = chain.order {
                self.chain.order = order;
            }
            if let Some(session_threshold) = chain.session_threshold {
                self.chain.session_threshold = session_threshold;
            }
        }

        if let Some(recommend) = patch.recommend {
            if let Some(num_steps) = recommend.num_steps {
                self.recommend.num_steps = num_steps;
            }
            if let Some(pseudocount) = recommend.pseudocount {
                self.recommend.pseudocount = pseudocount;
            }
            if let Some(seed) = recommend.seed {
                self.recommend.seed = Some(seed);
            }
        }

        if let Some(columns) = patch.columns {
            if let Some(user) = columns.user {
                self.columns.user = user;
            }
            if let Some(item) = columns.item {
                self.columns.item = item;
            }
            if let Some(time) = columns.time {
                self.columns.time = time;
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
        if let Some(value) = read_env("MARKOVREC_MARKOV_ORDER") {
            self.chain.order = parse_usize("MARKOVREC_MARKOV_ORDER", &value)?;
        }
        if let Some(value) = read_env("MARKOVREC_SESSION_THRESHOLD") {
            self.chain.session_threshold = parse_f64("MARKOVREC_SESSION_THRESHOLD", &value)?;
        }

        if let Some(value) = read_env("MARKOVREC_NUM_STEPS") {
            self.recommend.num_steps = parse_usize("MARKOVREC_NUM_STEPS", &value)?;
        }
        if let Some(value) = read_env("MARKOVREC_PSEUDOCOUNT") {
            self.recommend.pseudocount = parse_bool("MARKOVREC_PSEUDOCOUNT", &value)?;
        }
        if let Some(value) = read_env("MARKOVREC_SEED") {
            self.recommend.seed = Some(parse_u64("MARKOVREC_SEED", &value)?);
        }

        if let Some(value) = read_env("MARKOVREC_COLUMN_USER") {
            self.columns.user = value;
        }
        if let Some(value) = read_env("MARKOVREC_COLUMN_ITEM") {
            self.columns.item = value;
        }
        if let Some(value) = read_env("MARKOVREC_COLUMN_TIME") {
            self.columns.time = value;
        }

        let log_level =
            read_env("MARKOVREC_LOGGING_LEVEL").or_else(|| read_env("MARKOVREC_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("MARKOVREC_LOGGING_FORMAT").or_else(|| read_env("MARKOVREC_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(order) = overrides.order {
            self.chain.order = order;
        }
        if let Some(session_threshold) = overrides.session_threshold {
            self.chain.session_threshold = session_threshold;
        }
        if let Some(num_steps) = overrides.num_steps {
            self.recommend.num_steps = num_steps;
        }
        if let Some(pseudocount) = overrides.pseudocount {
            self.recommend.pseudocount = pseudocount;
        }
        if let Some(seed) = overrides.seed {
            self.recommend.seed = Some(seed);
        }
        if let Some(user) = overrides.column_user {
            self.columns.user = user;
        }
        if let Some(item) = overrides.column_item {
            self.columns.item = item;
        }
        if let Some(time) = overrides.column_time {
            self.columns.time = time;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_chain(&self.chain)?;
        validate_recommend(&self.recommend)?;
        validate_columns(&self.columns)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

/// The config file a load without an explicit path would read, if any.
pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from(NESTED_CONFIG_FILE)]
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

fn validate_chain(chain: &ChainConfig) -> Result<(), ConfigError> {
    if chain.order == 0 {
        return Err(ConfigError::Validation("chain.order must be greater than zero".to_string()));
    }

    if chain.session_threshold.is_nan() || chain.session_threshold <= 0.0 {
        return Err(ConfigError::Validation(
            "chain.session_threshold must be a positive number (use `inf` to never split)"
                .to_string(),
        ));
    }

    Ok(())
}

fn validate_recommend(recommend: &RecommendConfig) -> Result<(), ConfigError> {
    if recommend.num_steps == 0 {
        return Err(ConfigError::Validation(
            "recommend.num_steps must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_columns(columns: &ColumnConfig) -> Result<(), ConfigError> {
    let named = [
        ("columns.user", &columns.user),
        ("columns.item", &columns.item),
        ("columns.time", &columns.time),
    ];
    for (key, value) in named {
        if value.trim().is_empty() {
            return Err(ConfigError::Validation(format!("{key} cannot be empty")));
        }
    }

    Ok(())
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

fn invalid_override(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidEnvOverride { key: key.to_string(), value: value.to_string() }
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.trim().parse::<usize>().map_err(|_| invalid_override(key, value))
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse::<u64>().map_err(|_| invalid_override(key, value))
}

fn parse_f64(key: &str, value: &str) -> Result<f64, ConfigError> {
    value.trim().parse::<f64>().map_err(|_| invalid_override(key, value))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(invalid_override(key, value)),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigPatch {
    chain: Option<ChainPatch>,
    recommend: Option<RecommendPatch>,
    columns: Option<ColumnPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ChainPatch {
    order: Option<usize>,
    session_threshold: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RecommendPatch {
    num_steps: Option<usize>,
    pseudocount: Option<bool>,
    seed: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ColumnPatch {
    user: Option<String>,
    item: Option<String>,
    time: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
