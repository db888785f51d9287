// crates/workprogram-core/src/config.rs

//! Run parameters.
//!
//! There is no config file and no command line: the defaults below are the
//! call-site values of the batch job, and callers who need something else
//! build the structs directly.

use crate::clean::CleaningRule;
use crate::common::COUNTY_FIELD;
use crate::error::{Result, WorkProgramError};
use std::path::PathBuf;
use std::time::Duration;

pub const FEATURE_SERVICE_URL: &str =
    "https://gis.fdot.gov/arcgis/rest/services/Work_Program_Current/FeatureServer/2/query";

pub const DEFAULT_PAGE_SIZE: usize = 2000;

/// `where` clause that matches every record.
pub const MATCH_ALL: &str = "1=1";

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

pub const DEFAULT_COUNTY: &str = "MIAMI-DADE";

pub const DEFAULT_OUTPUT_PATH: &str = "data/processed/fdot_work_program_construction.gpkg";

/// Where and how to query the feature service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchConfig {
    pub endpoint: String,
    pub page_size: usize,
    pub where_clause: String,
    pub timeout: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            endpoint: FEATURE_SERVICE_URL.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            where_clause: MATCH_ALL.to_string(),
            timeout: REQUEST_TIMEOUT,
        }
    }
}

impl FetchConfig {
    /// Restrict the query to one county, e.g. `CONTYNAM = 'MIAMI-DADE'`.
    pub fn for_county(county: &str) -> Self {
        Self {
            where_clause: county_clause(county),
            ..Self::default()
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }
}

/// Builds the server-side predicate for a single county.
///
/// Single quotes in the name are doubled, as SQL string literals require.
pub fn county_clause(county: &str) -> String {
    format!("{COUNTY_FIELD} = '{}'", county.replace('\'', "''"))
}

/// Full batch job configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub fetch: FetchConfig,
    pub rule: CleaningRule,
    pub output_path: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fetch: FetchConfig::for_county(DEFAULT_COUNTY),
            rule: CleaningRule::default(),
            output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
        }
    }
}

impl PipelineConfig {
    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = path.into();
        self
    }

    /// Layer name inside the GeoPackage: the output file stem.
    pub fn layer_name(&self) -> Result<String> {
        self.output_path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .filter(|stem| !stem.is_empty())
            .ok_or_else(|| {
                WorkProgramError::InvalidData(format!(
                    "output path {} has no file name",
                    self.output_path.display()
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_pipeline_targets_miami_dade() {
        let config = PipelineConfig::default();
        assert_eq!(config.fetch.where_clause, "CONTYNAM = 'MIAMI-DADE'");
        assert_eq!(config.fetch.page_size, 2000);
        assert_eq!(config.fetch.timeout, Duration::from_secs(60));
        assert_eq!(
            config.layer_name().unwrap(),
            "fdot_work_program_construction"
        );
    }

    #[test]
    fn county_names_are_quoted() {
        assert_eq!(county_clause("ST. JOHN'S"), "CONTYNAM = 'ST. JOHN''S'");
    }

    #[test]
    fn bare_directory_has_no_layer_name() {
        let config = PipelineConfig::default().with_output_path("/");
        assert!(matches!(
            config.layer_name(),
            Err(WorkProgramError::InvalidData(_))
        ));
    }
}
