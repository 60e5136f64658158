//! Merge pipeline for schemerge.
//!
//! [`MergeEngine`] builds the exclusion set over two catalogs, runs the
//! structural dump with row data excluded for that set, and appends one merge
//! section per validated table to a single artifact.

pub mod artifact;
pub mod config;
pub mod connector;
pub mod dump;
pub mod engine;
pub mod errors;
pub mod merge;
pub mod report;
pub mod table_set;

pub use artifact::{ArtifactHeader, ArtifactWriter};
pub use config::{DumpConfig, EmitConfig, Endpoint, MergeConfig};
pub use connector::{Connector, PostgresConnector};
pub use dump::{DumpRequest, PgDump, StructureDump};
pub use engine::{MergeEngine, PipelineState};
pub use errors::{AbortedRun, MergeError, Side};
pub use merge::merge_table;
pub use report::{MergeReport, TableOutcome, TableStatus};
pub use table_set::{discover_junction_tables, table_presence, validate_exclusions};
