#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod exam_runner;
pub mod history;
pub mod notify;

pub use exam_core::Clock;

pub use config::ExamConfig;
pub use error::{BootstrapError, ConfigError, NotifyError, RunnerError};
pub use exam_runner::{ExamRunner, ExamSnapshot, Finishing};
pub use history::{HistoryEntry, HistoryService};
pub use notify::{HttpRelay, NotificationRelay};

use storage::repository::Storage;

/// Open the result store named by `db_url`, or an in-memory one.
///
/// # Errors
///
/// Returns `BootstrapError` if the `SQLite` database cannot be opened or
/// migrated.
pub async fn open_storage(db_url: Option<&str>) -> Result<Storage, BootstrapError> {
    match db_url {
        Some(url) => {
            tracing::info!(url, "opening result store");
            Ok(Storage::sqlite(url).await?)
        }
        None => {
            tracing::info!("no database configured; results kept in memory");
            Ok(Storage::in_memory())
        }
    }
}
