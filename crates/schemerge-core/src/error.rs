use thiserror::Error;

/// Core error type shared across schemerge crates.
#[derive(Debug, Error)]
pub enum Error {
    /// Database error or catalog adapter failure.
    #[error("database error: {0}")]
    Db(String),
    /// Configuration is incomplete or contradictory.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Merge statements could not be produced for a table.
    #[error("emit error: {0}")]
    Emit(String),
}

/// Convenience alias for results returned by schemerge crates.
pub type Result<T> = std::result::Result<T, Error>;
