mod config;
mod output;
mod registry;

use std::path::PathBuf;
use std::time::Instant;

use clap::{Args, Parser, Subcommand};
use schemerge_core::NamingMode;
use schemerge_merge::{AbortedRun, MergeEngine, PgDump, PostgresConnector};
use thiserror::Error;
use uuid::Uuid;

use config::{DEFAULT_CONFIG_PATH, FileConfig, load_file_config};
use output::PendingArtifact;
use registry::{
    RegistryError, RunContext, RunSettings, init_run_logging, start_run, write_report,
    write_table_set,
};

#[derive(Debug, Error)]
enum CliError {
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse error: {0}")]
    TomlDecode(#[from] toml::de::Error),
    #[error("json serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error(transparent)]
    Aborted(#[from] AbortedRun),
}

#[derive(Parser, Debug)]
#[command(
    name = "schemerge",
    version,
    about = "Merge Target row data into a Source structural dump"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Dump Source and append merge data from Target for the exclusion set.
    Run(RunArgs),
    /// Resolve and validate the exclusion set without dumping.
    Plan(ConfigArgs),
}

/// Settings shared by every subcommand. Flags override `schemerge.toml`.
#[derive(Args, Debug)]
struct ConfigArgs {
    /// Configuration file (defaults to ./schemerge.toml when present).
    #[arg(long, short)]
    config: Option<PathBuf>,
    /// Source connection string (authoritative structure).
    #[arg(long, value_name = "CONNECTION_STRING")]
    source: Option<String>,
    /// Target connection string (authoritative data for excluded tables).
    #[arg(long, value_name = "CONNECTION_STRING")]
    target: Option<String>,
    #[arg(long, value_name = "SCHEMA")]
    source_schema: Option<String>,
    #[arg(long, value_name = "SCHEMA")]
    target_schema: Option<String>,
    /// Naming mode: none, to_separated or to_compact.
    #[arg(long)]
    naming: Option<NamingMode>,
    /// Table whose data comes from Target; replaces the configured list.
    #[arg(long = "table", value_name = "TABLE")]
    tables: Vec<String>,
    /// Named table list from the `[presets]` section.
    #[arg(long)]
    preset: Option<String>,
    /// Rounds of junction discovery; 0 disables it.
    #[arg(long)]
    discovery_depth: Option<usize>,
    /// Output directory for runs.
    #[arg(long)]
    run_dir: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct RunArgs {
    #[command(flatten)]
    config: ConfigArgs,
    /// Output path for the merge artifact.
    #[arg(long)]
    out: Option<PathBuf>,
    /// Dump table definitions only, without Source row data.
    #[arg(long, default_value_t = false)]
    structure_only: bool,
    /// Rows per INSERT statement.
    #[arg(long)]
    batch_size: Option<usize>,
    /// Leave triggers and foreign keys active while loading.
    #[arg(long, default_value_t = false)]
    keep_triggers: bool,
    /// Skip sequence resets after loading.
    #[arg(long, default_value_t = false)]
    no_sequence_reset: bool,
    /// Dump program to invoke instead of `pg_dump`.
    #[arg(long, value_name = "PROGRAM")]
    dump_program: Option<String>,
}

impl ConfigArgs {
    fn load(&self) -> Result<FileConfig, CliError> {
        let mut file = match &self.config {
            Some(path) => load_file_config(path, true)?,
            None => load_file_config(&PathBuf::from(DEFAULT_CONFIG_PATH), false)?,
        };
        self.apply(&mut file);
        Ok(file)
    }

    fn apply(&self, file: &mut FileConfig) {
        let merge = &mut file.merge;
        if let Some(url) = &self.source {
            merge.source.url = url.clone();
        }
        if let Some(url) = &self.target {
            merge.target.url = url.clone();
        }
        if let Some(schema) = &self.source_schema {
            merge.source.schema = schema.clone();
        }
        if let Some(schema) = &self.target_schema {
            merge.target.schema = schema.clone();
        }
        if let Some(naming) = self.naming {
            merge.naming = naming;
        }
        if !self.tables.is_empty() {
            merge.tables = self.tables.clone();
        }
        if let Some(preset) = &self.preset {
            merge.preset = Some(preset.clone());
        }
        if let Some(depth) = self.discovery_depth {
            merge.discovery_depth = depth;
        }
        if let Some(run_dir) = &self.run_dir {
            file.output.run_dir = run_dir.clone();
        }
    }
}

impl RunArgs {
    fn apply(&self, file: &mut FileConfig) {
        if let Some(out) = &self.out {
            file.output.path = out.clone();
        }
        if self.structure_only {
            file.merge.dump.structure_only = true;
        }
        if let Some(batch_size) = self.batch_size {
            file.merge.emit.batch_size = batch_size;
        }
        if self.keep_triggers {
            file.merge.emit.disable_triggers = false;
        }
        if self.no_sequence_reset {
            file.merge.emit.reset_sequences = false;
        }
        if let Some(program) = &self.dump_program {
            file.merge.dump.program = program.clone();
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();

    match cli.command {
        Command::Run(args) => run_merge(args).await,
        Command::Plan(args) => run_plan(args).await,
    }
}

async fn run_merge(args: RunArgs) -> Result<(), CliError> {
    let mut file = args.config.load()?;
    args.apply(&mut file);
    file.merge
        .validate()
        .map_err(|err| CliError::InvalidConfig(err.to_string()))?;

    let out = file.output.path.clone();
    let run_ctx = RunContext {
        run_id: Uuid::new_v4().to_string(),
        started_at: chrono::Utc::now(),
        command: "run",
        run_dir: file.output.run_dir.clone(),
        settings: RunSettings::from_config(&file.merge, Some(&out)),
    };
    let run_paths = start_run(&run_ctx)?;
    init_run_logging(&run_paths.logs_path)?;

    tracing::info!(event = "run_started", run_id = %run_ctx.run_id, command = "run");
    let timer = Instant::now();

    let dump = PgDump::new(&file.merge.dump);
    let engine = MergeEngine::new(file.merge, PostgresConnector, dump);
    let mut artifact = PendingArtifact::create(&out)?;

    match engine.run(artifact.writer()).await {
        Ok(report) => {
            let path = artifact.commit()?;
            write_report(&run_paths, &report)?;
            if let Some(set) = &report.table_set {
                write_table_set(&run_paths, set)?;
            }
            tracing::info!(
                event = "artifact_written",
                path = %path.display(),
                bytes = report.artifact_bytes
            );
            tracing::info!(
                event = "run_finished",
                status = "success",
                merged = report.merged_count(),
                duration_ms = timer.elapsed().as_millis() as u64
            );
            println!("{}", path.display());
            Ok(())
        }
        Err(aborted) => {
            artifact.discard()?;
            write_report(&run_paths, &aborted.report)?;
            tracing::error!(
                event = "run_finished",
                status = "aborted",
                state = %aborted.state,
                error = %aborted.error,
                duration_ms = timer.elapsed().as_millis() as u64
            );
            Err(CliError::Aborted(aborted))
        }
    }
}

async fn run_plan(args: ConfigArgs) -> Result<(), CliError> {
    let file = args.load()?;
    file.merge
        .validate()
        .map_err(|err| CliError::InvalidConfig(err.to_string()))?;

    let run_ctx = RunContext {
        run_id: Uuid::new_v4().to_string(),
        started_at: chrono::Utc::now(),
        command: "plan",
        run_dir: file.output.run_dir.clone(),
        settings: RunSettings::from_config(&file.merge, None),
    };
    let run_paths = start_run(&run_ctx)?;
    init_run_logging(&run_paths.logs_path)?;

    tracing::info!(event = "run_started", run_id = %run_ctx.run_id, command = "plan");

    let dump = PgDump::new(&file.merge.dump);
    let engine = MergeEngine::new(file.merge, PostgresConnector, dump);
    let set = match engine.plan().await {
        Ok(set) => set,
        Err(aborted) => {
            write_report(&run_paths, &aborted.report)?;
            return Err(CliError::Aborted(aborted));
        }
    };

    write_table_set(&run_paths, &set)?;
    println!("{}", serde_json::to_string_pretty(&set)?);
    tracing::info!(
        event = "run_finished",
        status = "success",
        validated = set.validated.len()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_override_file_settings() {
        let mut file = config::parse_file_config(
            r#"
            tables = ["users"]
            naming = "to_compact"

            [source]
            url = "postgres://app@src/crm"
            "#,
        )
        .unwrap();

        let cli = Cli::try_parse_from([
            "schemerge",
            "run",
            "--target",
            "postgres://app@dst/crm",
            "--naming",
            "to-separated",
            "--table",
            "orders",
            "--table",
            "order_items",
            "--batch-size",
            "25",
            "--keep-triggers",
            "--out",
            "out/merge.sql",
        ])
        .unwrap();
        let Command::Run(args) = cli.command else {
            panic!("expected run subcommand");
        };
        args.config.apply(&mut file);
        args.apply(&mut file);

        assert_eq!(file.merge.source.url, "postgres://app@src/crm");
        assert_eq!(file.merge.target.url, "postgres://app@dst/crm");
        assert_eq!(file.merge.naming, NamingMode::ToSeparated);
        assert_eq!(file.merge.tables, vec!["orders", "order_items"]);
        assert_eq!(file.merge.emit.batch_size, 25);
        assert!(!file.merge.emit.disable_triggers);
        assert!(file.merge.emit.reset_sequences);
        assert_eq!(file.output.path, PathBuf::from("out/merge.sql"));
        assert!(file.merge.validate().is_ok());
    }

    #[test]
    fn rejects_unknown_naming_mode() {
        assert!(Cli::try_parse_from(["schemerge", "plan", "--naming", "kebab"]).is_err());
    }
}
