//! Error taxonomy for the report engine.
//!
//! Every error here is recoverable: validation errors block the triggering
//! action, fetch and persistence errors are surfaced as notifications and
//! the builder stays where it was. An empty result is not an error at all.

use thiserror::Error;

/// A user edit or action that cannot proceed as requested.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("report name is required")]
    MissingName,

    #[error("select at least one field")]
    EmptyFieldSelection,

    #[error("unknown field: {0}")]
    UnknownField(String),

    #[error("filter value for '{field}' does not match its type (expected {expected})")]
    FilterTypeMismatch { field: String, expected: &'static str },

    #[error("invalid column order: {0}")]
    InvalidColumnOrder(String),
}

/// Failure talking to a report endpoint.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    #[error("network error: {0}")]
    Transport(String),

    #[error("{endpoint} answered with status {status}")]
    Status { endpoint: String, status: u16 },

    #[error("could not decode response from {endpoint}: {message}")]
    Decode { endpoint: String, message: String },
}

impl From<ureq::Error> for FetchError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::Status(status, response) => {
                FetchError::Status { endpoint: response.get_url().to_string(), status }
            }
            ureq::Error::Transport(transport) => FetchError::Transport(transport.to_string()),
        }
    }
}

/// Failure saving, listing or deleting report definitions.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("report store request failed: {0}")]
    Backend(#[from] FetchError),

    #[error("report store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("report store data is invalid: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("saved report {0} not found")]
    NotFound(u64),

    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// Errors surfaced by the builder state machine.
#[derive(Error, Debug)]
pub enum BuilderError {
    #[error("cannot {action} while {state}")]
    InvalidTransition { action: &'static str, state: &'static str },

    #[error("a report is already being generated")]
    FetchInProgress,

    #[error("nothing is waiting for confirmation")]
    NothingToConfirm,

    #[error("unknown saved report {0}")]
    UnknownReport(u64),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error("export failed: {0}")]
    Export(#[from] std::io::Error),
}

/// Errors loading `relatorios.toml` and its environment overrides.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("unknown role '{0}' (expected admin, gestor or responsavel)")]
    InvalidRole(String),

    #[error("invalid filter argument '{0}' (expected field=value)")]
    InvalidFilterArg(String),
}
