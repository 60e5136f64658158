use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use schemerge_merge::MergeConfig;

use crate::CliError;

/// Default configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "schemerge.toml";

/// Where run output goes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Merge artifact path.
    pub path: PathBuf,
    /// Parent directory for run registries.
    pub run_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("merge.sql"),
            run_dir: PathBuf::from("runs"),
        }
    }
}

/// Contents of `schemerge.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    #[serde(flatten)]
    pub merge: MergeConfig,
    pub output: OutputConfig,
}

/// Load the configuration file.
///
/// A missing file is only an error when the path was given explicitly.
pub fn load_file_config(path: &Path, explicit: bool) -> Result<FileConfig, CliError> {
    if !path.exists() {
        if explicit {
            return Err(CliError::InvalidConfig(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        return Ok(FileConfig::default());
    }

    let content = std::fs::read_to_string(path)?;
    parse_file_config(&content)
}

pub fn parse_file_config(content: &str) -> Result<FileConfig, CliError> {
    Ok(toml::from_str(content)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemerge_core::NamingMode;

    #[test]
    fn reads_merge_settings_and_output_section() {
        let config = parse_file_config(
            r#"
            naming = "to_compact"
            tables = ["users", "teams"]
            preset = "identity"
            discovery_depth = 2

            [presets]
            identity = ["users", "roles"]

            [source]
            url = "postgres://app@src/crm"

            [target]
            url = "postgres://app@dst/crm"

            [relationships]
            table = "directus_fields"
            owner_column = "collection"
            field_column = "field"

            [emit]
            disable_triggers = false

            [output]
            path = "out/merge.sql"
            "#,
        )
        .unwrap();

        assert_eq!(config.merge.naming, NamingMode::ToCompact);
        assert_eq!(config.merge.tables, vec!["users", "teams"]);
        assert_eq!(config.merge.discovery_depth, 2);
        assert_eq!(config.merge.relationships.table, "directus_fields");
        assert_eq!(config.merge.relationships.interface_column, "interface");
        assert!(!config.merge.emit.disable_triggers);
        assert_eq!(config.output.path, PathBuf::from("out/merge.sql"));
        assert_eq!(config.output.run_dir, PathBuf::from("runs"));
        assert_eq!(
            config.merge.initial_tables().unwrap(),
            vec!["users", "roles", "users", "teams"]
        );
    }

    #[test]
    fn missing_default_file_yields_defaults() {
        let path = std::env::temp_dir().join(format!("schemerge_{}.toml", uuid::Uuid::new_v4()));
        let config = load_file_config(&path, false).unwrap();
        assert_eq!(config, FileConfig::default());
        assert!(load_file_config(&path, true).is_err());
    }

    #[test]
    fn unknown_naming_mode_is_rejected() {
        assert!(parse_file_config("naming = \"kebab\"").is_err());
    }
}
