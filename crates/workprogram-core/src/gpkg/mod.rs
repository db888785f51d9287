// crates/workprogram-core/src/gpkg/mod.rs

//! # GeoPackage I/O
//!
//! Writes a [`FeatureTable`] as a single-layer OGC GeoPackage (SQLite) and
//! reads one back. Only what a feature layer needs is created: the three
//! mandatory metadata tables and the layer itself.

use crate::common::Crs;
use crate::error::{Result, WorkProgramError};
use crate::model::{geometry_type_name, FeatureRow, FeatureTable, GeometryState};
use geojson::feature::Id;
use geojson::{Geometry, JsonObject, JsonValue};
use geozero::CoordDimensions;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OpenFlags, OptionalExtension, Transaction};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

pub mod wkb;

pub const GEOMETRY_COLUMN: &str = "geometry";
pub const FID_COLUMN: &str = "fid";

/// `PRAGMA application_id`: ASCII "GPKG".
const APPLICATION_ID: i32 = 0x4750_4B47;
/// `PRAGMA user_version` for GeoPackage 1.3.0.
const USER_VERSION: i32 = 10300;

const METADATA_DDL: &str = "
CREATE TABLE gpkg_spatial_ref_sys (
    srs_name TEXT NOT NULL,
    srs_id INTEGER NOT NULL PRIMARY KEY,
    organization TEXT NOT NULL,
    organization_coordsys_id INTEGER NOT NULL,
    definition TEXT NOT NULL,
    description TEXT
);
CREATE TABLE gpkg_contents (
    table_name TEXT NOT NULL PRIMARY KEY,
    data_type TEXT NOT NULL,
    identifier TEXT UNIQUE,
    description TEXT DEFAULT '',
    last_change DATETIME NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now')),
    min_x DOUBLE,
    min_y DOUBLE,
    max_x DOUBLE,
    max_y DOUBLE,
    srs_id INTEGER,
    CONSTRAINT fk_gc_r_srs_id FOREIGN KEY (srs_id) REFERENCES gpkg_spatial_ref_sys(srs_id)
);
CREATE TABLE gpkg_geometry_columns (
    table_name TEXT NOT NULL,
    column_name TEXT NOT NULL,
    geometry_type_name TEXT NOT NULL,
    srs_id INTEGER NOT NULL,
    z TINYINT NOT NULL,
    m TINYINT NOT NULL,
    CONSTRAINT pk_geom_cols PRIMARY KEY (table_name, column_name),
    CONSTRAINT uk_gc_table_name UNIQUE (table_name),
    CONSTRAINT fk_gc_tn FOREIGN KEY (table_name) REFERENCES gpkg_contents(table_name),
    CONSTRAINT fk_gc_srs FOREIGN KEY (srs_id) REFERENCES gpkg_spatial_ref_sys (srs_id)
);
";

// -----------------------------------------------------------------------------
// COLUMN TYPES
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Real,
    Boolean,
    Text,
}

impl ColumnType {
    pub fn sql(&self) -> &'static str {
        match self {
            ColumnType::Integer => "INTEGER",
            ColumnType::Real => "REAL",
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::Text => "TEXT",
        }
    }

    /// Maps a declared SQLite column type back; anything unknown is text.
    pub fn from_declared(declared: &str) -> Self {
        let upper = declared.to_ascii_uppercase();
        if upper == "BOOLEAN" {
            ColumnType::Boolean
        } else if upper.contains("INT") {
            ColumnType::Integer
        } else if upper.contains("REAL") || upper.contains("DOUBLE") || upper.contains("FLOAT") {
            ColumnType::Real
        } else {
            ColumnType::Text
        }
    }

    /// `None` for null: it says nothing about the column type.
    fn of(value: &JsonValue) -> Option<Self> {
        match value {
            JsonValue::Null => None,
            JsonValue::Bool(_) => Some(ColumnType::Boolean),
            JsonValue::Number(n) if n.is_i64() => Some(ColumnType::Integer),
            JsonValue::Number(_) => Some(ColumnType::Real),
            _ => Some(ColumnType::Text),
        }
    }

    fn merge(self, other: ColumnType) -> Self {
        use ColumnType::*;
        match (self, other) {
            (a, b) if a == b => a,
            (Integer, Real) | (Real, Integer) => Real,
            _ => Text,
        }
    }

    fn to_sql(self, value: Option<&JsonValue>) -> SqlValue {
        let value = match value {
            None | Some(JsonValue::Null) => return SqlValue::Null,
            Some(v) => v,
        };
        match (self, value) {
            (ColumnType::Boolean, JsonValue::Bool(b)) => SqlValue::Integer(i64::from(*b)),
            (ColumnType::Integer, JsonValue::Number(n)) => match n.as_i64() {
                Some(i) => SqlValue::Integer(i),
                None => n.as_f64().map_or(SqlValue::Null, SqlValue::Real),
            },
            (ColumnType::Real, JsonValue::Number(n)) => {
                n.as_f64().map_or(SqlValue::Null, SqlValue::Real)
            }
            (_, JsonValue::String(s)) => SqlValue::Text(s.clone()),
            (_, other) => SqlValue::Text(other.to_string()),
        }
    }

    fn to_json(self, value: SqlValue) -> JsonValue {
        match value {
            SqlValue::Null => JsonValue::Null,
            SqlValue::Integer(i) if self == ColumnType::Boolean => JsonValue::Bool(i != 0),
            SqlValue::Integer(i) => JsonValue::from(i),
            SqlValue::Real(f) => serde_json::Number::from_f64(f)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            SqlValue::Text(s) => JsonValue::String(s),
            SqlValue::Blob(_) => JsonValue::Null,
        }
    }
}

// -----------------------------------------------------------------------------
// LAYER SCHEMA
// -----------------------------------------------------------------------------

/// Everything the DDL and metadata rows need, inferred from the table.
#[derive(Clone)]
struct LayerSchema {
    columns: Vec<(String, ColumnType)>,
    geometry_type: &'static str,
    dims: CoordDimensions,
    bounds: Option<wkb::Envelope>,
}

impl LayerSchema {
    fn infer(table: &FeatureTable) -> Result<Self> {
        let mut seen = HashSet::new();
        seen.insert(FID_COLUMN.to_string());
        seen.insert(GEOMETRY_COLUMN.to_string());

        let mut columns = Vec::with_capacity(table.columns().len());
        for name in table.columns() {
            // SQLite column names are case-insensitive
            if !seen.insert(name.to_ascii_lowercase()) {
                return Err(WorkProgramError::InvalidData(format!(
                    "attribute '{name}' clashes with another column"
                )));
            }
            let ty = table
                .iter()
                .filter_map(|row| row.attribute(name).and_then(ColumnType::of))
                .reduce(ColumnType::merge)
                .unwrap_or(ColumnType::Text);
            columns.push((name.clone(), ty));
        }

        let mut geometry_type: Option<&'static str> = None;
        let mut mixed = false;
        let mut dims = CoordDimensions::xy();
        let mut bounds: Option<wkb::Envelope> = None;
        for geometry in table.iter().filter_map(stored_geometry) {
            let name = geometry_type_name(&geometry.value);
            match geometry_type {
                None => geometry_type = Some(name),
                Some(current) if current != name => mixed = true,
                Some(_) => {}
            }
            if wkb::dimensions(&geometry.value)?.z {
                dims = CoordDimensions::xyz();
            }
            if let Some(env) = wkb::envelope(&geometry.value) {
                bounds = Some(bounds.map_or(env, |b| b.merge(env)));
            }
        }

        Ok(Self {
            columns,
            geometry_type: match geometry_type {
                Some(name) if !mixed => name,
                _ => "GEOMETRY",
            },
            dims,
            bounds,
        })
    }
}

/// Empty geometries are stored as NULL.
fn stored_geometry(row: &FeatureRow) -> Option<&Geometry> {
    match row.geometry_state() {
        GeometryState::Present => row.geometry.as_ref(),
        GeometryState::Null | GeometryState::Empty => None,
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

// -----------------------------------------------------------------------------
// WRITER
// -----------------------------------------------------------------------------

/// Writes `table` as layer `layer` of a new GeoPackage at `path`.
///
/// Parent directories are created; an existing file is replaced, so writing
/// the same table twice yields the same contents. All inserts run in one
/// transaction, but a failure can still leave a partial file behind.
pub fn write_geopackage(table: &FeatureTable, path: impl AsRef<Path>, layer: &str) -> Result<()> {
    let path = path.as_ref();
    if layer.is_empty() {
        return Err(WorkProgramError::InvalidData("layer name is empty".into()));
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    if path.exists() {
        debug!(path = %path.display(), "replacing existing GeoPackage");
        fs::remove_file(path)?;
    }

    let schema = LayerSchema::infer(table)?;

    let mut conn = Connection::open(path)?;
    conn.pragma_update(None, "application_id", APPLICATION_ID)?;
    conn.pragma_update(None, "user_version", USER_VERSION)?;

    let tx = conn.transaction()?;
    tx.execute_batch(METADATA_DDL)?;
    register_srs(&tx, table.crs())?;
    create_layer(&tx, layer, &schema)?;
    let inserted = insert_rows(&tx, layer, table, &schema)?;
    register_layer(&tx, layer, table.crs(), &schema)?;
    tx.commit()?;

    info!(
        path = %path.display(),
        layer,
        rows = inserted,
        geometry_type = schema.geometry_type,
        "GeoPackage written"
    );
    Ok(())
}

fn register_srs(tx: &Transaction<'_>, crs: Crs) -> Result<()> {
    let mut stmt = tx.prepare(
        "INSERT INTO gpkg_spatial_ref_sys
            (srs_name, srs_id, organization, organization_coordsys_id, definition, description)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;
    stmt.execute(params![
        "Undefined cartesian SRS",
        -1,
        "NONE",
        -1,
        "undefined",
        "undefined cartesian coordinate reference system"
    ])?;
    stmt.execute(params![
        "Undefined geographic SRS",
        0,
        "NONE",
        0,
        "undefined",
        "undefined geographic coordinate reference system"
    ])?;
    stmt.execute(params![
        crs.srs_name(),
        crs.epsg(),
        "EPSG",
        crs.epsg(),
        crs.definition(),
        "longitude/latitude coordinates in decimal degrees on the WGS 84 spheroid"
    ])?;
    Ok(())
}

fn create_layer(tx: &Transaction<'_>, layer: &str, schema: &LayerSchema) -> Result<()> {
    let mut ddl = format!(
        "CREATE TABLE {} ({} INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL, {} {}",
        quote_ident(layer),
        quote_ident(FID_COLUMN),
        quote_ident(GEOMETRY_COLUMN),
        schema.geometry_type,
    );
    for (name, ty) in &schema.columns {
        ddl.push_str(&format!(", {} {}", quote_ident(name), ty.sql()));
    }
    ddl.push(')');
    tx.execute_batch(&ddl)?;
    Ok(())
}

fn insert_rows(
    tx: &Transaction<'_>,
    layer: &str,
    table: &FeatureTable,
    schema: &LayerSchema,
) -> Result<usize> {
    let names: Vec<String> = std::iter::once(quote_ident(GEOMETRY_COLUMN))
        .chain(schema.columns.iter().map(|(name, _)| quote_ident(name)))
        .collect();
    let placeholders: Vec<String> = (1..=names.len()).map(|i| format!("?{i}")).collect();
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(layer),
        names.join(", "),
        placeholders.join(", ")
    );

    let srs_id = table.crs().epsg();
    let mut stmt = tx.prepare(&sql)?;
    for row in table {
        let mut values = Vec::with_capacity(names.len());
        values.push(match stored_geometry(row) {
            Some(g) => SqlValue::Blob(wkb::encode(g, srs_id, schema.dims)?),
            None => SqlValue::Null,
        });
        for (name, ty) in &schema.columns {
            values.push(ty.to_sql(row.attribute(name)));
        }
        stmt.execute(params_from_iter(values))?;
    }
    Ok(table.len())
}

fn register_layer(tx: &Transaction<'_>, layer: &str, crs: Crs, schema: &LayerSchema) -> Result<()> {
    let (min_x, min_y, max_x, max_y) = match schema.bounds {
        Some(b) => (Some(b.min_x), Some(b.min_y), Some(b.max_x), Some(b.max_y)),
        None => (None, None, None, None),
    };
    tx.execute(
        "INSERT INTO gpkg_contents
            (table_name, data_type, identifier, description, min_x, min_y, max_x, max_y, srs_id)
         VALUES (?1, 'features', ?1, '', ?2, ?3, ?4, ?5, ?6)",
        params![layer, min_x, min_y, max_x, max_y, crs.epsg()],
    )?;
    tx.execute(
        "INSERT INTO gpkg_geometry_columns
            (table_name, column_name, geometry_type_name, srs_id, z, m)
         VALUES (?1, ?2, ?3, ?4, ?5, 0)",
        params![
            layer,
            GEOMETRY_COLUMN,
            schema.geometry_type,
            crs.epsg(),
            i32::from(schema.dims.z)
        ],
    )?;
    Ok(())
}

// -----------------------------------------------------------------------------
// READER
// -----------------------------------------------------------------------------

/// Reads a feature layer back into a [`FeatureTable`].
///
/// With `layer == None` the first registered feature layer is used. Row ids
/// come back as feature ids; every attribute column is present on every row
/// (null where the value is missing).
pub fn read_geopackage(path: impl AsRef<Path>, layer: Option<&str>) -> Result<FeatureTable> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(WorkProgramError::NotFound(format!(
            "GeoPackage not found at {}",
            path.display()
        )));
    }
    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;

    let registered: Option<(String, String, i32)> = match layer {
        Some(name) => conn
            .query_row(
                "SELECT table_name, column_name, srs_id FROM gpkg_geometry_columns
                 WHERE table_name = ?1",
                params![name],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?,
        None => conn
            .query_row(
                "SELECT table_name, column_name, srs_id FROM gpkg_geometry_columns
                 ORDER BY table_name LIMIT 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?,
    };
    let (table_name, geometry_column, srs_id) = registered.ok_or_else(|| {
        WorkProgramError::NotFound(format!(
            "feature layer {} in {}",
            layer.unwrap_or("<any>"),
            path.display()
        ))
    })?;
    let crs = Crs::from_epsg(srs_id).ok_or_else(|| {
        WorkProgramError::InvalidData(format!("unsupported srs_id {srs_id} in {table_name}"))
    })?;

    // (name, declared type, is primary key)
    let mut info = conn.prepare(&format!("PRAGMA table_info({})", quote_ident(&table_name)))?;
    let table_info = info
        .query_map([], |row| {
            let name: String = row.get(1)?;
            let declared: String = row.get(2)?;
            let pk: i64 = row.get(5)?;
            Ok((name, declared, pk > 0))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let fid = table_info
        .iter()
        .find(|(_, _, pk)| *pk)
        .map(|(name, _, _)| name.clone());
    let columns: Vec<(String, ColumnType)> = table_info
        .iter()
        .filter(|(name, _, pk)| !*pk && *name != geometry_column)
        .map(|(name, declared, _)| (name.clone(), ColumnType::from_declared(declared)))
        .collect();

    let id_expr = fid.as_deref().map(quote_ident).unwrap_or_else(|| "rowid".into());
    let selected: Vec<String> = [id_expr.clone(), quote_ident(&geometry_column)]
        .into_iter()
        .chain(columns.iter().map(|(name, _)| quote_ident(name)))
        .collect();
    let sql = format!(
        "SELECT {} FROM {} ORDER BY {}",
        selected.join(", "),
        quote_ident(&table_name),
        id_expr
    );

    let mut stmt = conn.prepare(&sql)?;
    let raw_rows = stmt
        .query_map([], |row| {
            let id: i64 = row.get(0)?;
            let blob: Option<Vec<u8>> = row.get(1)?;
            let values = (0..columns.len())
                .map(|i| row.get::<_, SqlValue>(i + 2))
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok((id, blob, values))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut rows = Vec::with_capacity(raw_rows.len());
    for (id, blob, values) in raw_rows {
        let geometry = match blob {
            Some(bytes) => Some(wkb::decode(&bytes)?),
            None => None,
        };
        let mut properties = JsonObject::new();
        for ((name, ty), value) in columns.iter().zip(values) {
            properties.insert(name.clone(), ty.to_json(value));
        }
        rows.push(FeatureRow {
            id: Some(Id::Number(id.into())),
            geometry,
            properties,
        });
    }

    debug!(path = %path.display(), layer = %table_name, rows = rows.len(), "GeoPackage read");
    let names = columns.into_iter().map(|(name, _)| name).collect();
    Ok(FeatureTable::with_schema(names, rows, crs))
}
