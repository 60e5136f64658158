use std::fmt;

use thiserror::Error;

use schemerge_core::Error as CoreError;

use crate::engine::PipelineState;
use crate::report::MergeReport;

/// Which database a failure concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Source,
    Target,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Source => write!(f, "source"),
            Side::Target => write!(f, "target"),
        }
    }
}

/// Fatal pipeline errors. Anything here aborts the run.
#[derive(Debug, Error)]
pub enum MergeError {
    #[error("invalid configuration: {0}")]
    Config(#[source] CoreError),
    #[error("cannot connect to {side} database: {message}")]
    Connect { side: Side, message: String },
    #[error("structural dump failed: {0}")]
    Dump(String),
    #[error("artifact write failed: {0}")]
    Artifact(#[from] std::io::Error),
}

/// A run that ended in the `Aborted` state.
#[derive(Debug, Error)]
#[error("pipeline aborted during {state}: {error}")]
pub struct AbortedRun {
    /// State the pipeline was in when it failed.
    pub state: PipelineState,
    #[source]
    pub error: MergeError,
    /// Progress up to the failure. The artifact must be discarded.
    pub report: Box<MergeReport>,
}
