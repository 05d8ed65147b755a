pub mod build;
pub mod config;
pub mod evaluate;
pub mod recommend;

use std::path::PathBuf;

use clap::Args;
use markovrec_core::config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions};
use markovrec_core::errors::{DomainError, PersistenceError};
use markovrec_core::report::{NullReporter, Reporter};
use markovrec_data::DataError;
use serde::Serialize;
use serde_json::Value;

use crate::logging::{init_logging, TracingReporter};

pub const EXIT_CONFIG: u8 = 2;
pub const EXIT_INPUT: u8 = 3;
pub const EXIT_MODEL: u8 = 4;
pub const EXIT_OUTPUT: u8 = 5;

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
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
}

impl CommandResult {
    pub fn success_with_details(
        command: &str,
        message: impl Into<String>,
        details: Option<Value>,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            details,
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
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
            details: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    fn from_outcome(command: &str, outcome: Result<Completed, CommandError>) -> Self {
        match outcome {
            Ok(completed) => {
                Self::success_with_details(command, completed.message, completed.details)
            }
            Err(error) => Self::failure(command, error.class, error.message, error.exit_code),
        }
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

pub(crate) struct Completed {
    message: String,
    details: Option<Value>,
}

impl Completed {
    pub(crate) fn new(message: impl Into<String>, details: impl Serialize) -> Self {
        Self { message: message.into(), details: serde_json::to_value(details).ok() }
    }
}

/// A failed command step, already classified for the outcome payload.
#[derive(Debug)]
pub(crate) struct CommandError {
    class: &'static str,
    message: String,
    exit_code: u8,
}

impl CommandError {
    /// Reclassifies a failure that happened while writing results.
    pub(crate) fn output(error: impl Into<CommandError>) -> Self {
        Self { exit_code: EXIT_OUTPUT, ..error.into() }
    }
}

impl From<ConfigError> for CommandError {
    fn from(error: ConfigError) -> Self {
        Self {
            class: "config_validation",
            message: format!("configuration issue: {error}"),
            exit_code: EXIT_CONFIG,
        }
    }
}

impl From<DomainError> for CommandError {
    fn from(error: DomainError) -> Self {
        let exit_code = match error {
            DomainError::InvalidConfig(_) => EXIT_CONFIG,
            DomainError::MalformedTime { .. } => EXIT_INPUT,
            DomainError::UnknownState(_)
            | DomainError::NoKnownStates
            | DomainError::InvariantViolation(_) => EXIT_MODEL,
        };
        Self { class: error.class(), message: error.to_string(), exit_code }
    }
}

impl From<DataError> for CommandError {
    fn from(error: DataError) -> Self {
        match error {
            DataError::Domain(domain) => domain.into(),
            DataError::AlreadyExists(_) => {
                Self { class: error.class(), message: error.to_string(), exit_code: EXIT_OUTPUT }
            }
            other => {
                Self { class: other.class(), message: other.to_string(), exit_code: EXIT_INPUT }
            }
        }
    }
}

impl From<PersistenceError> for CommandError {
    fn from(error: PersistenceError) -> Self {
        let (class, exit_code) = match &error {
            PersistenceError::NotFound(_) => ("not_found", EXIT_INPUT),
            PersistenceError::AlreadyExists(_) => ("already_exists", EXIT_OUTPUT),
            PersistenceError::Io { .. } => ("io", EXIT_INPUT),
            PersistenceError::Format { .. } => ("malformed_chain", EXIT_INPUT),
            PersistenceError::Domain(domain) => (domain.class(), EXIT_MODEL),
        };
        Self { class, message: error.to_string(), exit_code }
    }
}

/// Column and config flags shared by every data command.
#[derive(Debug, Clone, Default, Args)]
pub struct CommonArgs {
    #[arg(long = "column-user", value_name = "NAME", help = "Header of the user column")]
    pub column_user: Option<String>,
    #[arg(long = "column-item", value_name = "NAME", help = "Header of the item column")]
    pub column_item: Option<String>,
    #[arg(
        short,
        long,
        help = "Suppress progress events (the JSON outcome is still printed)"
    )]
    pub quiet: bool,
}

pub(crate) fn load_config(
    config_path: Option<PathBuf>,
    overrides: ConfigOverrides,
) -> Result<AppConfig, CommandError> {
    let config = AppConfig::load(LoadOptions { config_path, overrides, ..LoadOptions::default() })?;
    init_logging(&config.logging);
    Ok(config)
}

pub(crate) fn reporter(quiet: bool) -> Box<dyn Reporter> {
    if quiet {
        Box::new(NullReporter)
    } else {
        Box::new(TracingReporter)
    }
}
