// crates/workprogram-core/src/model.rs

//! In-memory geospatial table.
//!
//! A [`FeatureTable`] is the materialized accumulator of a fetch: one
//! [`FeatureRow`] per GeoJSON feature, in server order, plus the union of
//! attribute keys seen across all rows. Nothing is deduplicated.

use crate::common::Crs;
use geojson::feature::Id;
use geojson::{Feature, Geometry, JsonObject, JsonValue, Value};
use std::collections::HashSet;

/// Whether a row carries a usable geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeometryState {
    /// `"geometry": null`
    Null,
    /// Present, but without a single coordinate.
    Empty,
    Present,
}

impl GeometryState {
    pub fn of(geometry: Option<&Geometry>) -> Self {
        match geometry {
            None => GeometryState::Null,
            Some(g) if is_empty_value(&g.value) => GeometryState::Empty,
            Some(_) => GeometryState::Present,
        }
    }
}

/// True when the geometry holds no positions at all.
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Point(position) => position.is_empty(),
        Value::MultiPoint(points) => points.iter().all(|p| p.is_empty()),
        Value::LineString(line) => line.is_empty(),
        Value::MultiLineString(lines) => lines.iter().all(|l| l.is_empty()),
        Value::Polygon(rings) => rings.iter().all(|r| r.is_empty()),
        Value::MultiPolygon(polygons) => polygons
            .iter()
            .all(|rings| rings.iter().all(|r| r.is_empty())),
        Value::GeometryCollection(members) => members.iter().all(|g| is_empty_value(&g.value)),
    }
}

/// GeoPackage / OGC name of a geometry type.
pub fn geometry_type_name(value: &Value) -> &'static str {
    match value {
        Value::Point(_) => "POINT",
        Value::MultiPoint(_) => "MULTIPOINT",
        Value::LineString(_) => "LINESTRING",
        Value::MultiLineString(_) => "MULTILINESTRING",
        Value::Polygon(_) => "POLYGON",
        Value::MultiPolygon(_) => "MULTIPOLYGON",
        Value::GeometryCollection(_) => "GEOMETRYCOLLECTION",
    }
}

/// One work program record.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub id: Option<Id>,
    pub geometry: Option<Geometry>,
    pub properties: JsonObject,
}

impl FeatureRow {
    pub fn new(geometry: Option<Geometry>, properties: JsonObject) -> Self {
        Self {
            id: None,
            geometry,
            properties,
        }
    }

    pub fn geometry_state(&self) -> GeometryState {
        GeometryState::of(self.geometry.as_ref())
    }

    pub fn attribute(&self, key: &str) -> Option<&JsonValue> {
        self.properties.get(key)
    }

    /// The attribute as a string, `None` when absent or not a string.
    pub fn attribute_str(&self, key: &str) -> Option<&str> {
        self.attribute(key).and_then(JsonValue::as_str)
    }
}

impl From<Feature> for FeatureRow {
    fn from(feature: Feature) -> Self {
        Self {
            id: feature.id,
            geometry: feature.geometry,
            properties: feature.properties.unwrap_or_default(),
        }
    }
}

/// Rows + attribute schema + CRS tag.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    crs: Crs,
    columns: Vec<String>,
    rows: Vec<FeatureRow>,
}

impl FeatureTable {
    /// Materializes the accumulator. Row count == `features.len()`.
    pub fn from_features(features: Vec<Feature>, crs: Crs) -> Self {
        Self::from_rows(features.into_iter().map(FeatureRow::from).collect(), crs)
    }

    /// Columns are the attribute keys of all rows, in first-seen order.
    pub fn from_rows(rows: Vec<FeatureRow>, crs: Crs) -> Self {
        let mut seen = HashSet::new();
        let mut columns = Vec::new();
        for row in &rows {
            for key in row.properties.keys() {
                if seen.insert(key.as_str()) {
                    columns.push(key.clone());
                }
            }
        }
        Self { crs, columns, rows }
    }

    /// Explicit schema, for sources that know their columns up front (a
    /// GeoPackage layer can have columns and zero rows).
    pub fn with_schema(columns: Vec<String>, rows: Vec<FeatureRow>, crs: Crs) -> Self {
        Self { crs, columns, rows }
    }

    pub fn crs(&self) -> Crs {
        self.crs
    }

    /// Attribute columns only; the geometry column is implicit.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn rows(&self) -> &[FeatureRow] {
        &self.rows
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FeatureRow> {
        self.rows.iter()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// `(rows, attribute columns + geometry)`
    pub fn shape(&self) -> (usize, usize) {
        (self.rows.len(), self.columns.len() + 1)
    }

    pub fn head(&self, n: usize) -> &[FeatureRow] {
        &self.rows[..n.min(self.rows.len())]
    }

    pub fn count_geometry(&self, state: GeometryState) -> usize {
        self.rows
            .iter()
            .filter(|row| row.geometry_state() == state)
            .count()
    }

    /// Keeps matching rows in order. The schema is left untouched.
    pub fn retain<F>(&mut self, keep: F)
    where
        F: FnMut(&FeatureRow) -> bool,
    {
        self.rows.retain(keep);
    }
}

impl<'a> IntoIterator for &'a FeatureTable {
    type Item = &'a FeatureRow;
    type IntoIter = std::slice::Iter<'a, FeatureRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}
