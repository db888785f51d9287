// crates/workprogram-core/src/lib.rs

//! # workprogram-core
//!
//! Pulls the FDOT construction work program layer from the ArcGIS
//! FeatureServer, drops records that cannot be mapped, and saves the rest to
//! a GeoPackage.
//!
//! The pieces are usable on their own:
//!
//! - [`loader`]: paginated fetch into a [`FeatureTable`]
//! - [`clean`]: geometry + `LOC_ERROR` filter
//! - [`report`]: console summary of a table
//! - [`gpkg`]: GeoPackage writer and reader
//! - [`pipeline`]: the whole fetch → clean → report → save run

pub mod clean;
pub mod common;
pub mod config;
pub mod error;
pub mod gpkg;
pub mod loader; // Pagination + page decoding
pub mod model;
pub mod pipeline;
pub mod report;
pub mod traits;

// Re-exports
pub use crate::clean::{clean, CleanStats, CleaningRule};
pub use crate::common::{Crs, COUNTY_FIELD, LOC_ERROR_FIELD, NO_ERROR};
pub use crate::config::FetchConfig;
pub use crate::error::{Result, WorkProgramError};
pub use crate::loader::{fetch_all, parse_page, FeaturePage, HttpPageSource, PageQuery};
pub use crate::model::{FeatureRow, FeatureTable, GeometryState};
pub use crate::report::Report;
pub use crate::traits::PageSource;
