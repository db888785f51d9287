// crates/workprogram-core/src/clean.rs

//! Post-fetch cleaning: one boolean mask, applied once.

use crate::common::{LOC_ERROR_FIELD, NO_ERROR};
use crate::model::{FeatureRow, FeatureTable, GeometryState};
use tracing::{info, warn};

/// Which attribute must hold which value for a row to survive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleaningRule {
    pub field: String,
    pub sentinel: String,
}

impl Default for CleaningRule {
    fn default() -> Self {
        Self::new(LOC_ERROR_FIELD, NO_ERROR)
    }
}

impl CleaningRule {
    pub fn new(field: impl Into<String>, sentinel: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            sentinel: sentinel.into(),
        }
    }

    fn verdict(&self, row: &FeatureRow) -> Verdict {
        if row.geometry_state() != GeometryState::Present {
            return Verdict::BadGeometry;
        }
        // Absent or non-string values never equal the sentinel.
        match row.attribute_str(&self.field) {
            Some(value) if value == self.sentinel => Verdict::Keep,
            _ => Verdict::LocationError,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    Keep,
    BadGeometry,
    LocationError,
}

/// What [`clean`] kept and why the rest went.
///
/// A row failing both checks is counted under `dropped_geometry`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanStats {
    pub kept: usize,
    pub dropped_geometry: usize,
    pub dropped_location: usize,
}

impl CleanStats {
    pub fn dropped(&self) -> usize {
        self.dropped_geometry + self.dropped_location
    }
}

/// Keeps rows with a non-empty geometry whose rule field equals the
/// sentinel. Order and the column schema are preserved; cleaning a clean
/// table is a no-op.
pub fn clean(mut table: FeatureTable, rule: &CleaningRule) -> (FeatureTable, CleanStats) {
    if !table.is_empty() && !table.has_column(&rule.field) {
        warn!(field = %rule.field, "column missing from every record; all rows will be dropped");
    }

    let mut stats = CleanStats::default();
    table.retain(|row| match rule.verdict(row) {
        Verdict::Keep => {
            stats.kept += 1;
            true
        }
        Verdict::BadGeometry => {
            stats.dropped_geometry += 1;
            false
        }
        Verdict::LocationError => {
            stats.dropped_location += 1;
            false
        }
    });

    info!(
        kept = stats.kept,
        dropped_geometry = stats.dropped_geometry,
        dropped_location = stats.dropped_location,
        "cleaned"
    );
    (table, stats)
}
