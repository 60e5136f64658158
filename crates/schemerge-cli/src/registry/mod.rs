//! Per-invocation run directory: `config.json`, `logs.ndjson` and the
//! report written when the pipeline stops.

mod logging;
mod run;

pub use logging::init_run_logging;
pub use run::{RunContext, RunSettings, start_run, write_report, write_table_set};

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("cannot write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("json serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("logging error: {0}")]
    Logging(String),
}

impl RegistryError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| RegistryError::Io { path, source }
    }
}

pub type RegistryResult<T> = std::result::Result<T, RegistryError>;
