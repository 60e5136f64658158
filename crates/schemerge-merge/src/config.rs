use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use schemerge_core::{DEFAULT_BATCH_SIZE, EmitOptions, Error, NamingMode, Result};
use schemerge_introspect::{CatalogOptions, RelationshipMetadata};

/// One database endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoint {
    pub url: String,
    pub schema: String,
}

impl Default for Endpoint {
    fn default() -> Self {
        Self {
            url: String::new(),
            schema: "public".to_string(),
        }
    }
}

/// Options for the external structural dump.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DumpConfig {
    pub program: String,
    /// Dump table definitions only, no row data at all.
    pub structure_only: bool,
    pub extra_args: Vec<String>,
}

impl Default for DumpConfig {
    fn default() -> Self {
        Self {
            program: "pg_dump".to_string(),
            structure_only: false,
            extra_args: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmitConfig {
    pub batch_size: usize,
    /// Wrap merge data in `session_replication_role = replica`.
    pub disable_triggers: bool,
    pub reset_sequences: bool,
}

impl Default for EmitConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            disable_triggers: true,
            reset_sequences: true,
        }
    }
}

impl EmitConfig {
    pub fn options(&self) -> EmitOptions {
        EmitOptions {
            batch_size: self.batch_size,
            reset_sequences: self.reset_sequences,
        }
    }
}

/// Immutable configuration for one merge run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    pub source: Endpoint,
    pub target: Endpoint,
    pub naming: NamingMode,
    /// Tables whose data comes from Target.
    pub tables: Vec<String>,
    /// Named entry of `presets` prepended to `tables`.
    pub preset: Option<String>,
    pub presets: BTreeMap<String, Vec<String>>,
    pub relationships: RelationshipMetadata,
    /// Rounds of junction discovery; 1 covers the requested tables only.
    pub discovery_depth: usize,
    pub dump: DumpConfig,
    pub emit: EmitConfig,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            source: Endpoint::default(),
            target: Endpoint::default(),
            naming: NamingMode::None,
            tables: Vec::new(),
            preset: None,
            presets: BTreeMap::new(),
            relationships: RelationshipMetadata::default(),
            discovery_depth: 1,
            dump: DumpConfig::default(),
            emit: EmitConfig::default(),
        }
    }
}

impl MergeConfig {
    pub fn validate(&self) -> Result<()> {
        if self.source.url.trim().is_empty() {
            return Err(Error::InvalidConfig("source url is required".to_string()));
        }
        if self.target.url.trim().is_empty() {
            return Err(Error::InvalidConfig("target url is required".to_string()));
        }
        if self.emit.batch_size == 0 {
            return Err(Error::InvalidConfig(
                "emit.batch_size must be at least 1".to_string(),
            ));
        }
        if self.dump.program.trim().is_empty() {
            return Err(Error::InvalidConfig("dump.program is required".to_string()));
        }
        self.initial_tables().map(|_| ())
    }

    /// Preset entries followed by the explicit list, duplicates kept.
    pub fn initial_tables(&self) -> Result<Vec<String>> {
        let mut tables = Vec::new();
        if let Some(name) = &self.preset {
            let preset = self
                .presets
                .get(name)
                .ok_or_else(|| Error::InvalidConfig(format!("unknown preset: {name}")))?;
            tables.extend(preset.iter().cloned());
        }
        tables.extend(self.tables.iter().cloned());
        Ok(tables)
    }

    pub fn catalog_options(&self, endpoint: &Endpoint) -> CatalogOptions {
        CatalogOptions {
            schema: endpoint.schema.clone(),
            relationships: self.relationships.clone(),
        }
    }
}
