use std::fs::{OpenOptions, create_dir_all};
use std::path::{Path, PathBuf};
use std::process::Command;

use chrono::{DateTime, Utc};
use serde::Serialize;

use schemerge_core::{NamingMode, RedactedConnection, TableSet, redact_connection_string};
use schemerge_merge::{Endpoint, MergeConfig, MergeReport};

use super::{RegistryError, RegistryResult};

/// Endpoint as recorded in `config.json`. The raw URL is never stored.
#[derive(Debug, Clone, Serialize)]
pub struct EndpointRecord {
    pub connection: RedactedConnection,
    pub schema: String,
}

impl EndpointRecord {
    fn from_endpoint(endpoint: &Endpoint) -> Self {
        Self {
            connection: redact_connection_string(&endpoint.url),
            schema: endpoint.schema.clone(),
        }
    }
}

/// Effective settings after file and flag overrides.
#[derive(Debug, Clone, Serialize)]
pub struct RunSettings {
    pub source: EndpointRecord,
    pub target: EndpointRecord,
    pub naming: NamingMode,
    pub tables: Vec<String>,
    pub preset: Option<String>,
    pub discovery_depth: usize,
    pub dump_program: String,
    pub structure_only: bool,
    pub batch_size: usize,
    pub disable_triggers: bool,
    pub reset_sequences: bool,
    pub artifact: Option<PathBuf>,
}

impl RunSettings {
    pub fn from_config(config: &MergeConfig, artifact: Option<&Path>) -> Self {
        Self {
            source: EndpointRecord::from_endpoint(&config.source),
            target: EndpointRecord::from_endpoint(&config.target),
            naming: config.naming,
            tables: config.tables.clone(),
            preset: config.preset.clone(),
            discovery_depth: config.discovery_depth,
            dump_program: config.dump.program.clone(),
            structure_only: config.dump.structure_only,
            batch_size: config.emit.batch_size,
            disable_triggers: config.emit.disable_triggers,
            reset_sequences: config.emit.reset_sequences,
            artifact: artifact.map(Path::to_path_buf),
        }
    }
}

/// Metadata captured at run start.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    /// Subcommand that created the run.
    pub command: &'static str,
    pub run_dir: PathBuf,
    pub settings: RunSettings,
}

#[derive(Debug, Serialize)]
struct RunConfig<'a> {
    run_id: &'a str,
    started_at: String,
    command: &'a str,
    settings: &'a RunSettings,
    git: GitInfo,
}

#[derive(Debug, Serialize)]
struct GitInfo {
    commit: Option<String>,
    dirty: Option<bool>,
}

/// Files inside one run directory.
#[derive(Debug, Clone)]
pub struct RunPaths {
    pub root: PathBuf,
    pub config_path: PathBuf,
    pub logs_path: PathBuf,
    pub report_path: PathBuf,
    pub table_set_path: PathBuf,
}

pub fn start_run(ctx: &RunContext) -> RegistryResult<RunPaths> {
    let timestamp = ctx.started_at.format("%Y-%m-%dT%H-%M-%SZ").to_string();
    let root = ctx.run_dir.join(format!("{timestamp}__run_{}", ctx.run_id));
    create_dir_all(&root).map_err(RegistryError::io(&root))?;

    let paths = RunPaths {
        config_path: root.join("config.json"),
        logs_path: root.join("logs.ndjson"),
        report_path: root.join("report.json"),
        table_set_path: root.join("table_set.json"),
        root,
    };

    let config = RunConfig {
        run_id: &ctx.run_id,
        started_at: ctx.started_at.to_rfc3339(),
        command: ctx.command,
        settings: &ctx.settings,
        git: collect_git_info(),
    };
    write_json(&paths.config_path, &config)?;

    OpenOptions::new()
        .create(true)
        .append(true)
        .open(&paths.logs_path)
        .map_err(RegistryError::io(&paths.logs_path))?;

    Ok(paths)
}

/// Write the final pipeline report, whether the run finished or aborted.
pub fn write_report(paths: &RunPaths, report: &MergeReport) -> RegistryResult<()> {
    write_json(&paths.report_path, report)
}

pub fn write_table_set(paths: &RunPaths, set: &TableSet) -> RegistryResult<()> {
    write_json(&paths.table_set_path, set)
}

fn collect_git_info() -> GitInfo {
    let commit = Command::new("git")
        .args(["rev-parse", "HEAD"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .map(|output| String::from_utf8_lossy(&output.stdout).trim().to_string())
        .filter(|value| !value.is_empty());

    let dirty = Command::new("git")
        .args(["status", "--porcelain"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .map(|output| !output.stdout.is_empty());

    GitInfo { commit, dirty }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> RegistryResult<()> {
    let file = OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .open(path)
        .map_err(RegistryError::io(path))?;
    serde_json::to_writer_pretty(file, value).map_err(RegistryError::from)
}
