use std::path::PathBuf;

use markovrec_core::errors::DomainError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DataError {
    #[error("file not found: `{0}`")]
    NotFound(PathBuf),
    #[error("file exists: `{0}`")]
    AlreadyExists(PathBuf),
    #[error("could not access `{path}`: {source}")]
    Io { path: PathBuf, source: std::io::Error },
    #[error("malformed delimited data in `{path}`: {source}")]
    Csv { path: PathBuf, source: csv::Error },
    #[error("malformed JSON in `{path}`: {source}")]
    Json { path: PathBuf, source: serde_json::Error },
    #[error("column `{column}` not found in `{path}` (available: {})", available.join(", "))]
    MissingColumn { path: PathBuf, column: String, available: Vec<String> },
    #[error("`{0}` has no header row")]
    EmptyInput(PathBuf),
    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl DataError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(path),
            std::io::ErrorKind::AlreadyExists => Self::AlreadyExists(path),
            _ => Self::Io { path, source },
        }
    }

    pub(crate) fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        Self::Csv { path: path.into(), source }
    }

    pub fn class(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::AlreadyExists(_) => "already_exists",
            Self::Io { .. } => "io",
            Self::Csv { .. } => "malformed_table",
            Self::Json { .. } => "malformed_json",
            Self::MissingColumn { .. } => "missing_column",
            Self::EmptyInput(_) => "empty_input",
            Self::Domain(error) => error.class(),
        }
    }
}
