use std::path::PathBuf;

use thiserror::Error;

/// Problems with the desired-schema file or the connection settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read schema file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse schema file {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    #[error("unknown fields in schema file {}: {fields:?}", .path.display())]
    UnknownFields { path: PathBuf, fields: Vec<String> },

    #[error("unsupported schema version {found} (supported: {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("invalid schema: {0}")]
    Invalid(String),

    #[error("missing {0}: pass it as a flag or set the environment variable")]
    MissingCredential(&'static str),

    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failure of a single call against the remote schema API.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Transport(e) => e.status().map(|s| s.as_u16()),
            ApiError::Decode(_) => None,
        }
    }
}

/// Reconciliation failures.
///
/// Only [`ReconcileError::FetchFailure`] and [`ReconcileError::EmptySchema`]
/// abort a run. Everything else is scoped to one task (not-found, type
/// mismatch) or one mutation (mutation failure) and is recorded in the
/// run report.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("failed to fetch schema: {0}")]
    FetchFailure(#[source] ApiError),

    #[error("schema fetch returned no tables")]
    EmptySchema,

    #[error("table '{0}' not found")]
    TableNotFound(String),

    #[error("field '{field}' not found in table '{table}'")]
    FieldNotFound { table: String, field: String },

    #[error("linked table '{linked_table}' for field '{field}' not found")]
    LinkTargetNotFound { field: String, linked_table: String },

    #[error("field '{field}' in table '{table}' has type '{actual}', expected singleSelect")]
    TypeMismatch {
        table: String,
        field: String,
        actual: String,
    },

    #[error("{action} failed: {source}")]
    MutationFailure {
        action: String,
        #[source]
        source: ApiError,
    },
}

impl ReconcileError {
    /// Stable snake_case tag used in reports and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ReconcileError::FetchFailure(_) | ReconcileError::EmptySchema => "fetch_failure",
            ReconcileError::TableNotFound(_)
            | ReconcileError::FieldNotFound { .. }
            | ReconcileError::LinkTargetNotFound { .. } => "not_found",
            ReconcileError::TypeMismatch { .. } => "type_mismatch",
            ReconcileError::MutationFailure { .. } => "mutation_failure",
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ReconcileError::FetchFailure(_) | ReconcileError::EmptySchema
        )
    }
}
