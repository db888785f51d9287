//! fdot-work-program: batch job for the FDOT construction work program
//!
//! Pulls every Miami-Dade record from the FDOT `Work_Program_Current`
//! FeatureServer, drops rows with a missing/empty geometry or a location
//! error, prints a short validation report and saves the result as a
//! GeoPackage.
//!
//! Usage
//! -----
//!
//!   $ fdot-work-program
//!   $ RUST_LOG=debug fdot-work-program     # log every page request
//!
//! Output
//! ------
//!
//! `data/processed/fdot_work_program_construction.gpkg`, relative to the
//! working directory. One layer, EPSG:4326. An existing file is replaced.
//!
//! There are no flags: the county, page size and output path are fixed in
//! [`PipelineConfig::default`].

use tracing_subscriber::EnvFilter;
use workprogram_core::config::PipelineConfig;
use workprogram_core::pipeline;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = PipelineConfig::default();

    println!("Fetching data from FDOT ArcGIS API...");
    let summary = pipeline::run(&config, |report| {
        println!();
        print!("{report}");
    })?;

    tracing::info!(
        fetched = summary.fetched,
        kept = summary.stats.kept,
        dropped = summary.stats.dropped(),
        "run complete"
    );
    println!();
    println!("Data saved to: {}", summary.output_path.display());

    Ok(())
}
