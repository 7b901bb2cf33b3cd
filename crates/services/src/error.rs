//! Shared error types for the services crate.

use std::time::Duration;

use thiserror::Error;

use exam_core::auth::AuthError;
use exam_core::model::DefinitionError;
use exam_core::session::SessionError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by a `NotificationRelay`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum NotifyError {
    #[error(
        "relay rejected the message with status {status}: {}",
        .message.as_deref().unwrap_or("no details")
    )]
    HttpStatus {
        status: reqwest::StatusCode,
        message: Option<String>,
    },
    #[error("relay did not answer within {0:?}")]
    TimedOut(Duration),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Errors emitted while reading configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?} ({reason})")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
    #[error("unknown test definition: {0}")]
    UnknownDefinition(String),
    #[error(transparent)]
    Definition(#[from] DefinitionError),
}

/// Errors emitted by `ExamRunner`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RunnerError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Errors emitted while bootstrapping the result store.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BootstrapError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
}
