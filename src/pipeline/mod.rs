//! Pipeline coordination
//!
//! Four stages (load, summarize, train, report) run in fixed order over a
//! shared context. Each stage reads fields written by earlier stages and
//! writes exactly one output field. Failures propagate immediately: no stage
//! is retried, later stages never run, and the context is abandoned rather
//! than rolled back.

use crate::eda::{self, EdaSummary};
use crate::error::{DatasageError, Result};
use crate::ingest::TabularIngestor;
use crate::report::ReportGenerator;
use crate::training::{AutomlResult, AutomlRunner};
use polars::prelude::DataFrame;
use std::path::PathBuf;

/// Where the loader stage gets its table from when none was pre-loaded
#[derive(Debug, Clone)]
pub enum DataSource {
    /// A file on disk
    Path(PathBuf),
    /// Raw uploaded bytes
    Bytes(Vec<u8>),
}

/// Shared context passed through the pipeline.
///
/// One named optional field per stage output, so a missing value is an
/// explicit `None` rather than an absent dynamic key.
#[derive(Debug, Default)]
pub struct PipelineContext {
    /// Input: where to load the table from (unless `dataframe` is set)
    pub source: Option<DataSource>,
    /// Input: optional target column name
    pub target: Option<String>,
    /// Written by the load stage (or provided directly by the caller)
    pub dataframe: Option<DataFrame>,
    /// Written by the summarize stage
    pub eda: Option<EdaSummary>,
    /// Written by the train stage
    pub automl: Option<AutomlResult>,
    /// Written by the report stage
    pub report: Option<String>,
}

impl PipelineContext {
    /// Context starting from an already-loaded table
    pub fn from_dataframe(df: DataFrame) -> Self {
        Self {
            dataframe: Some(df),
            ..Default::default()
        }
    }

    /// Context starting from a file path
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            source: Some(DataSource::Path(path.into())),
            ..Default::default()
        }
    }

    /// Context starting from raw uploaded bytes
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            source: Some(DataSource::Bytes(bytes)),
            ..Default::default()
        }
    }

    /// Builder method to set the target column
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }
}

/// One pipeline stage. Reads earlier fields, writes its own output field.
pub trait PipelineStage {
    /// Stage name used in logs
    fn name(&self) -> &'static str;

    /// Execute the stage against the shared context
    fn run(&self, ctx: &mut PipelineContext) -> Result<()>;
}

/// Load stage: resolve the context's table
pub struct LoadStage {
    ingestor: TabularIngestor,
}

impl PipelineStage for LoadStage {
    fn name(&self) -> &'static str {
        "load"
    }

    fn run(&self, ctx: &mut PipelineContext) -> Result<()> {
        if ctx.dataframe.is_some() {
            return Ok(());
        }
        let df = match &ctx.source {
            Some(DataSource::Path(path)) => self.ingestor.load_path(path)?,
            Some(DataSource::Bytes(bytes)) => self.ingestor.load(bytes)?,
            None => {
                return Err(DatasageError::DataError(
                    "no dataframe or data source provided".to_string(),
                ))
            }
        };
        ctx.dataframe = Some(df);
        Ok(())
    }
}

/// Summarize stage: structural EDA of the loaded table
pub struct SummarizeStage;

impl PipelineStage for SummarizeStage {
    fn name(&self) -> &'static str {
        "summarize"
    }

    fn run(&self, ctx: &mut PipelineContext) -> Result<()> {
        let df = ctx
            .dataframe
            .as_ref()
            .ok_or_else(|| DatasageError::DataError("no dataframe loaded".to_string()))?;
        ctx.eda = Some(eda::summarize(df, ctx.target.as_deref())?);
        Ok(())
    }
}

/// Train stage: run the model comparison. Unlike the summarizer, this stage
/// is strict about the target: missing or unknown names are an error here.
pub struct TrainStage {
    runner: AutomlRunner,
}

impl PipelineStage for TrainStage {
    fn name(&self) -> &'static str {
        "train"
    }

    fn run(&self, ctx: &mut PipelineContext) -> Result<()> {
        let df = ctx
            .dataframe
            .as_ref()
            .ok_or_else(|| DatasageError::DataError("no dataframe loaded".to_string()))?;
        let target = ctx.target.as_deref().ok_or_else(|| {
            let available: Vec<String> = df
                .get_column_names()
                .into_iter()
                .map(|s| s.to_string())
                .collect();
            DatasageError::ConfigError(format!(
                "no target column provided; available columns: {available:?}"
            ))
        })?;
        ctx.automl = Some(self.runner.run(df, target)?);
        Ok(())
    }
}

/// Report stage: explain the run. Reads the EDA summary leniently (the
/// generator tolerates its absence) but requires the comparison result.
pub struct ReportStage {
    generator: ReportGenerator,
}

impl PipelineStage for ReportStage {
    fn name(&self) -> &'static str {
        "report"
    }

    fn run(&self, ctx: &mut PipelineContext) -> Result<()> {
        let automl = ctx
            .automl
            .as_ref()
            .ok_or_else(|| DatasageError::ReportError("no comparison result in context".to_string()))?;
        ctx.report = Some(
            self.generator
                .generate(ctx.eda.as_ref(), &automl.comparison),
        );
        Ok(())
    }
}

/// Sequences the four stages over a shared context
pub struct Coordinator {
    stages: Vec<Box<dyn PipelineStage>>,
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl Coordinator {
    /// Coordinator with default components
    pub fn new() -> Self {
        Self::with_components(
            TabularIngestor::new(),
            AutomlRunner::default(),
            ReportGenerator::new(),
        )
    }

    /// Coordinator with explicit components (tests substitute stubs here)
    pub fn with_components(
        ingestor: TabularIngestor,
        runner: AutomlRunner,
        generator: ReportGenerator,
    ) -> Self {
        Self {
            stages: vec![
                Box::new(LoadStage { ingestor }),
                Box::new(SummarizeStage),
                Box::new(TrainStage { runner }),
                Box::new(ReportStage { generator }),
            ],
        }
    }

    /// Run all stages in order, fail-fast.
    ///
    /// On success every output field of the returned context is populated;
    /// on failure the error of the first failing stage is returned and the
    /// partially filled context is dropped.
    pub fn run_pipeline(&self, mut ctx: PipelineContext) -> Result<PipelineContext> {
        for stage in &self.stages {
            tracing::info!(stage = stage.name(), "running pipeline stage");
            stage.run(&mut ctx)?;
        }
        Ok(ctx)
    }
}
