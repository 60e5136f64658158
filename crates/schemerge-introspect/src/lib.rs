//! Catalog access for schemerge.
//!
//! The [`Catalog`] trait is the seam between the merge pipeline and a live
//! database; [`PostgresCatalog`] implements it over `sqlx`.

pub mod adapter;
pub mod options;
pub mod postgres;
pub mod relationships;

pub use adapter::{Catalog, ColumnInfo, RelationField};
pub use options::{CatalogOptions, RelationshipMetadata};
pub use postgres::PostgresCatalog;
pub use relationships::{
    JunctionLink, collect_links, discover_junctions, linked_tables, parse_association,
};
