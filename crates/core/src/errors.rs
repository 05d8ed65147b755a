use std::path::PathBuf;

use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("time must be a number: `{value}`")]
    MalformedTime { value: String },
    #[error("state has no recorded transitions: {0}")]
    UnknownState(String),
    #[error("markov chain has no states with outgoing transitions")]
    NoKnownStates,
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("file not found: `{0}`")]
    NotFound(PathBuf),
    #[error("file exists: `{0}`")]
    AlreadyExists(PathBuf),
    #[error("could not access `{path}`: {source}")]
    Io { path: PathBuf, source: std::io::Error },
    #[error("could not decode chain file `{path}`: {source}")]
    Format { path: PathBuf, source: serde_json::Error },
    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl PersistenceError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(path),
            std::io::ErrorKind::AlreadyExists => Self::AlreadyExists(path),
            _ => Self::Io { path, source },
        }
    }
}

impl DomainError {
    /// Stable machine-readable class used in command outcomes.
    pub fn class(&self) -> &'static str {
        match self {
            Self::InvalidConfig(_) => "invalid_config",
            Self::MalformedTime { .. } => "malformed_time",
            Self::UnknownState(_) => "unknown_state",
            Self::NoKnownStates => "no_known_states",
            Self::InvariantViolation(_) => "invariant_violation",
        }
    }
}
