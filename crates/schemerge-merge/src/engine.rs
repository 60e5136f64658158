//! Pipeline orchestration.
//!
//! A run walks `Init -> DiscoverJunctions -> BuildTableSet -> DumpStructure ->
//! ValidateExclusions -> EmitMergeData -> Done`. Any fatal error moves it to
//! `Aborted`, and the artifact written so far must be discarded.
//!
//! Existence checks run at the end of `BuildTableSet`, over the Source and
//! Target connections that stay open until emission ends. The dump then
//! skips row data only for validated tables.

use std::fmt;
use std::io::Write;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use schemerge_core::{
    TableSet, TableSetDraft, emit_failure, redact_connection_string, section_postamble,
    section_preamble,
};
use schemerge_introspect::Catalog;

use crate::artifact::{ArtifactHeader, ArtifactWriter};
use crate::config::{Endpoint, MergeConfig};
use crate::connector::Connector;
use crate::dump::{DumpRequest, StructureDump};
use crate::errors::{AbortedRun, MergeError, Side};
use crate::merge::merge_table;
use crate::report::{MergeReport, TableOutcome};
use crate::table_set::{discover_junction_tables, validate_exclusions};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    #[default]
    Init,
    DiscoverJunctions,
    BuildTableSet,
    DumpStructure,
    ValidateExclusions,
    EmitMergeData,
    Done,
    Aborted,
}

impl PipelineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineState::Init => "init",
            PipelineState::DiscoverJunctions => "discover_junctions",
            PipelineState::BuildTableSet => "build_table_set",
            PipelineState::DumpStructure => "dump_structure",
            PipelineState::ValidateExclusions => "validate_exclusions",
            PipelineState::EmitMergeData => "emit_merge_data",
            PipelineState::Done => "done",
            PipelineState::Aborted => "aborted",
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Report under construction, tagged with the current state.
#[derive(Default)]
struct Progress {
    report: MergeReport,
}

impl Progress {
    fn enter(&mut self, state: PipelineState) {
        self.report.state = state;
        info!(event = "state_entered", state = %state);
    }

    fn state(&self) -> PipelineState {
        self.report.state
    }

    fn abort(mut self, error: MergeError) -> AbortedRun {
        let state = self.state();
        self.report.state = PipelineState::Aborted;
        warn!(event = "pipeline_aborted", state = %state, error = %error);
        AbortedRun {
            state,
            error,
            report: Box::new(self.report),
        }
    }
}

/// Drives one merge run against two databases.
pub struct MergeEngine<C, D> {
    config: MergeConfig,
    connector: C,
    dump: D,
}

impl<C: Connector, D: StructureDump> MergeEngine<C, D> {
    pub fn new(config: MergeConfig, connector: C, dump: D) -> Self {
        Self {
            config,
            connector,
            dump,
        }
    }

    pub fn config(&self) -> &MergeConfig {
        &self.config
    }

    /// Run the full pipeline, writing the artifact to `artifact`.
    pub async fn run<W: Write>(&self, artifact: W) -> Result<MergeReport, AbortedRun> {
        let mut progress = Progress::default();
        match self.execute(&mut progress, artifact).await {
            Ok(()) => {
                progress.enter(PipelineState::Done);
                info!(
                    event = "pipeline_finished",
                    merged = progress.report.merged_count(),
                    tables = progress.report.tables.len(),
                    bytes = progress.report.artifact_bytes
                );
                Ok(progress.report)
            }
            Err(error) => Err(progress.abort(error)),
        }
    }

    /// Build and validate the exclusion set without dumping or emitting.
    pub async fn plan(&self) -> Result<TableSet, AbortedRun> {
        let mut progress = Progress::default();
        match self.plan_table_set(&mut progress).await {
            Ok(set) => {
                progress.enter(PipelineState::Done);
                Ok(set)
            }
            Err(error) => Err(progress.abort(error)),
        }
    }

    async fn execute<W: Write>(
        &self,
        progress: &mut Progress,
        artifact: W,
    ) -> Result<(), MergeError> {
        self.config.validate().map_err(MergeError::Config)?;
        let draft = self.build_draft(progress).await?;

        let (source, target) = self.open_both().await?;
        let merged = self
            .dump_and_merge(progress, &*source, &*target, draft, artifact)
            .await;
        source.close().await;
        target.close().await;
        merged
    }

    async fn plan_table_set(&self, progress: &mut Progress) -> Result<TableSet, MergeError> {
        self.config.validate().map_err(MergeError::Config)?;
        let draft = self.build_draft(progress).await?;

        let (source, target) = self.open_both().await?;
        let set = validate_exclusions(draft, &*source, &*target).await;
        source.close().await;
        target.close().await;

        progress.enter(PipelineState::ValidateExclusions);
        progress.report.table_set = Some(set.clone());
        Ok(set)
    }

    async fn dump_and_merge<W: Write>(
        &self,
        progress: &mut Progress,
        source: &dyn Catalog,
        target: &dyn Catalog,
        draft: TableSetDraft,
        artifact: W,
    ) -> Result<(), MergeError> {
        let set = validate_exclusions(draft, source, target).await;

        progress.enter(PipelineState::DumpStructure);
        let excluded = set.validated.clone();
        progress.report.excluded_from_dump = excluded.clone();
        let request = DumpRequest {
            url: self.config.source.url.clone(),
            schema: self.config.source.schema.clone(),
            exclude_data: excluded.clone(),
            structure_only: self.config.dump.structure_only,
        };
        let dump_text = self.dump.dump(&request).await?;
        info!(event = "dump_finished", bytes = dump_text.len());

        let mut writer = ArtifactWriter::new(artifact);
        writer.append(&self.header(excluded).render())?;
        writer.append(&dump_text)?;
        if !dump_text.is_empty() && !dump_text.ends_with('\n') {
            writer.append("\n")?;
        }
        writer.append("\n")?;

        progress.enter(PipelineState::ValidateExclusions);
        progress.report.table_set = Some(set.clone());

        self.emit_merge_data(progress, source, target, &set, &mut writer)
            .await?;

        progress.report.artifact_bytes = writer.bytes_written();
        writer.finish()?;
        Ok(())
    }

    /// DiscoverJunctions and BuildTableSet. Discovery reads the Source
    /// relationship metadata over a connection held for this phase only.
    async fn build_draft(&self, progress: &mut Progress) -> Result<TableSetDraft, MergeError> {
        let initial = self.config.initial_tables().map_err(MergeError::Config)?;
        let mut draft = TableSetDraft::new(&initial, self.config.naming);
        if draft.duplicates_removed() > 0 {
            info!(event = "duplicates_removed", count = draft.duplicates_removed());
        }

        progress.enter(PipelineState::DiscoverJunctions);
        let depth = self.config.discovery_depth;
        let discovered = if depth == 0 || draft.discovery_input().is_empty() {
            Vec::new()
        } else {
            let source = self.open(Side::Source).await?;
            let found = discover_junction_tables(
                &*source,
                draft.discovery_input(),
                &self.config.relationships.association_key,
                depth,
            )
            .await;
            source.close().await;
            found
        };

        progress.enter(PipelineState::BuildTableSet);
        let added = draft.expand(discovered);
        for table in &added {
            info!(event = "junction_table_added", table = %table);
        }
        info!(
            event = "table_set_built",
            candidates = draft.candidates().len(),
            discovered = added.len(),
            duplicates_removed = draft.duplicates_removed()
        );
        Ok(draft)
    }

    async fn emit_merge_data<W: Write>(
        &self,
        progress: &mut Progress,
        source: &dyn Catalog,
        target: &dyn Catalog,
        set: &TableSet,
        writer: &mut ArtifactWriter<W>,
    ) -> Result<(), MergeError> {
        progress.enter(PipelineState::EmitMergeData);
        let emit = &self.config.emit;
        let opts = emit.options();
        writer.append(&section_preamble(emit.disable_triggers))?;

        for table in &set.validated {
            match merge_table(source, target, table, &opts).await {
                Ok((text, outcome)) => {
                    writer.append(&text)?;
                    progress.report.tables.push(outcome);
                }
                Err(err) => {
                    let message = err.to_string();
                    warn!(event = "table_merge_failed", table = %table, error = %message);
                    writer.append(&emit_failure(source.schema(), table, &message))?;
                    progress.report.tables.push(TableOutcome::failed(table, message));
                }
            }
        }

        writer.append(&section_postamble(emit.disable_triggers))?;
        Ok(())
    }

    fn header(&self, excluded: Vec<String>) -> ArtifactHeader {
        ArtifactHeader {
            generated_at: Utc::now(),
            source: redact_connection_string(&self.config.source.url).identity(),
            target: redact_connection_string(&self.config.target.url).identity(),
            naming: self.config.naming,
            excluded,
        }
    }

    fn endpoint(&self, side: Side) -> &Endpoint {
        match side {
            Side::Source => &self.config.source,
            Side::Target => &self.config.target,
        }
    }

    async fn open(&self, side: Side) -> Result<Box<dyn Catalog>, MergeError> {
        let endpoint = self.endpoint(side);
        let options = self.config.catalog_options(endpoint);
        let catalog = self
            .connector
            .connect(endpoint, options)
            .await
            .map_err(|err| MergeError::Connect {
                side,
                message: err.to_string(),
            })?;
        info!(
            event = "connected",
            side = %side,
            engine = catalog.engine(),
            endpoint = %redact_connection_string(&endpoint.url).identity(),
            schema = %endpoint.schema
        );
        Ok(catalog)
    }

    async fn open_both(&self) -> Result<(Box<dyn Catalog>, Box<dyn Catalog>), MergeError> {
        let source = self.open(Side::Source).await?;
        match self.open(Side::Target).await {
            Ok(target) => Ok((source, target)),
            Err(err) => {
                source.close().await;
                Err(err)
            }
        }
    }
}
