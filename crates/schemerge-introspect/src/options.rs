use serde::{Deserialize, Serialize};

/// Options that control how a catalog is read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogOptions {
    /// Postgres schema holding the application tables.
    pub schema: String,
    pub relationships: RelationshipMetadata,
}

impl Default for CatalogOptions {
    fn default() -> Self {
        Self {
            schema: "public".to_string(),
            relationships: RelationshipMetadata::default(),
        }
    }
}

/// Where field definitions live and how many-to-many links are tagged.
///
/// Defaults match a field registry table of the shape
/// `fields(collection_name, name, interface, options jsonb)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelationshipMetadata {
    pub table: String,
    pub owner_column: String,
    pub field_column: String,
    pub interface_column: String,
    pub options_column: String,
    /// Interface tag marking many-to-many fields.
    pub many_to_many_kind: String,
    /// Options attribute naming the association table.
    pub association_key: String,
}

impl Default for RelationshipMetadata {
    fn default() -> Self {
        Self {
            table: "fields".to_string(),
            owner_column: "collection_name".to_string(),
            field_column: "name".to_string(),
            interface_column: "interface".to_string(),
            options_column: "options".to_string(),
            many_to_many_kind: "m2m".to_string(),
            association_key: "through".to_string(),
        }
    }
}
