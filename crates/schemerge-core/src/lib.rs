//! Core reconciliation logic for schemerge.
//!
//! Everything in this crate is free of I/O: identifier normalization, column
//! reconciliation, exclusion-set phases, and merge statement generation.
//! Catalog access and process orchestration live in the sibling crates.

pub mod columns;
pub mod emit;
pub mod error;
pub mod naming;
pub mod redaction;
pub mod table_set;
pub mod value;

pub use columns::{ColumnReconciliation, reconcile};
pub use emit::{
    DEFAULT_BATCH_SIZE, EmitOptions, MergeUnit, describe, emit, emit_failure, section_postamble,
    section_preamble,
};
pub use error::{Error, Result};
pub use naming::{NamingMode, normalize};
pub use redaction::{RedactedConnection, redact_connection_string};
pub use table_set::{LookupFailure, Presence, TableSet, TableSetDraft, build_table_set};
pub use value::{SqlValue, ValueKind, qualified_name, quote_ident, quote_literal};
