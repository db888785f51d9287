// crates/workprogram-core/src/report.rs

//! Console summary of a table: shape, geometry health, and the value
//! distribution of the location-error attribute.

use crate::model::{geometry_type_name, FeatureRow, FeatureTable, GeometryState};
use geojson::JsonValue;
use std::collections::HashMap;
use std::fmt;

/// How many distinct values the breakdown lists.
pub const BREAKDOWN_LIMIT: usize = 10;

/// Label for records where the attribute is absent or null.
pub const MISSING_LABEL: &str = "<missing>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub rows: usize,
    /// Attribute columns plus the geometry column.
    pub columns: usize,
    pub empty_geometries: usize,
    pub null_geometries: usize,
    pub breakdown_field: String,
    /// `(value, count)`, most frequent first, at most [`BREAKDOWN_LIMIT`].
    pub breakdown: Vec<(String, usize)>,
    /// First record as `(column, rendered value)`, geometry last.
    pub sample: Vec<(String, String)>,
}

impl Report {
    pub fn from_table(table: &FeatureTable, breakdown_field: &str) -> Self {
        let (rows, columns) = table.shape();
        Self {
            rows,
            columns,
            empty_geometries: table.count_geometry(GeometryState::Empty),
            null_geometries: table.count_geometry(GeometryState::Null),
            breakdown_field: breakdown_field.to_string(),
            breakdown: value_counts(table, breakdown_field, BREAKDOWN_LIMIT),
            sample: table
                .head(1)
                .first()
                .map(|row| sample_record(table.columns(), row))
                .unwrap_or_default(),
        }
    }
}

/// Counts per distinct value, missing values included. Sorted by count
/// descending; equal counts keep first-seen order.
pub fn value_counts(table: &FeatureTable, field: &str, limit: usize) -> Vec<(String, usize)> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut counts: Vec<(String, usize)> = Vec::new();

    for row in table {
        let label = render_value(row.attribute(field));
        match index.get(&label) {
            Some(&i) => counts[i].1 += 1,
            None => {
                index.insert(label.clone(), counts.len());
                counts.push((label, 1));
            }
        }
    }

    // stable sort keeps first-seen order among ties
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.truncate(limit);
    counts
}

fn render_value(value: Option<&JsonValue>) -> String {
    match value {
        None | Some(JsonValue::Null) => MISSING_LABEL.to_string(),
        Some(JsonValue::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn sample_record(columns: &[String], row: &FeatureRow) -> Vec<(String, String)> {
    let mut sample: Vec<(String, String)> = columns
        .iter()
        .map(|c| (c.clone(), render_value(row.attribute(c))))
        .collect();

    let geometry = match (&row.geometry, row.geometry_state()) {
        (Some(g), GeometryState::Empty) => format!("{} EMPTY", geometry_type_name(&g.value)),
        (Some(g), _) => geometry_type_name(&g.value).to_string(),
        (None, _) => MISSING_LABEL.to_string(),
    };
    sample.push(("geometry".to_string(), geometry));
    sample
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Data shape: ({}, {})", self.rows, self.columns)?;
        writeln!(f, "Total rows: {}", self.rows)?;
        writeln!(f, "Empty geometries: {}", self.empty_geometries)?;
        writeln!(f, "Null geometries: {}", self.null_geometries)?;

        writeln!(f)?;
        writeln!(f, "{} breakdown:", self.breakdown_field)?;
        let width = self
            .breakdown
            .iter()
            .map(|(label, _)| label.len())
            .max()
            .unwrap_or(0);
        for (label, count) in &self.breakdown {
            writeln!(f, "  {label:<width$}  {count}")?;
        }

        if !self.sample.is_empty() {
            writeln!(f)?;
            writeln!(f, "Sample record:")?;
            let width = self.sample.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
            for (column, value) in &self.sample {
                writeln!(f, "  {column:<width$}  {value}")?;
            }
        }
        Ok(())
    }
}
