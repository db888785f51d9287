// crates/workprogram-core/src/pipeline.rs

//! The batch job: fetch → clean → report → save.

use crate::clean::{clean, CleanStats};
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::gpkg::write_geopackage;
use crate::loader::{fetch_all, HttpPageSource};
use crate::report::Report;
use crate::traits::PageSource;
use std::path::PathBuf;
use tracing::info;

/// What one run did.
#[derive(Debug, Clone)]
pub struct PipelineSummary {
    /// Records returned by the service, before cleaning.
    pub fetched: usize,
    pub stats: CleanStats,
    pub report: Report,
    pub output_path: PathBuf,
    pub layer: String,
}

/// Runs the job against the configured FeatureServer.
///
/// `on_report` sees the report of the cleaned table before anything is
/// written, so it is shown even when the write fails.
pub fn run<F>(config: &PipelineConfig, on_report: F) -> Result<PipelineSummary>
where
    F: FnOnce(&Report),
{
    let source = HttpPageSource::from_config(&config.fetch)?;
    run_with(&source, config, on_report)
}

/// [`run`] with an explicit page source.
pub fn run_with<S, F>(source: &S, config: &PipelineConfig, on_report: F) -> Result<PipelineSummary>
where
    S: PageSource + ?Sized,
    F: FnOnce(&Report),
{
    // checked before the network is touched
    let layer = config.layer_name()?;

    info!(
        where_clause = %config.fetch.where_clause,
        page_size = config.fetch.page_size,
        "fetching"
    );
    let table = fetch_all(source, config.fetch.page_size, &config.fetch.where_clause)?;
    let fetched = table.len();

    info!(rows = fetched, "cleaning");
    let (table, stats) = clean(table, &config.rule);

    let report = Report::from_table(&table, &config.rule.field);
    on_report(&report);

    write_geopackage(&table, &config.output_path, &layer)?;

    Ok(PipelineSummary {
        fetched,
        stats,
        report,
        output_path: config.output_path.clone(),
        layer,
    })
}
