// crates/workprogram-core/src/gpkg/wkb.rs

//! GeoPackage geometry blobs: the `GP` binary header followed by ISO WKB.
//! Encoding and decoding go through `geozero`; envelopes come from `geo`.

use crate::error::{Result, WorkProgramError};
use geo::BoundingRect;
use geojson::{Geometry, Position, Value};
use geozero::geojson::GeoJson;
use geozero::wkb::GpkgWkb;
use geozero::{CoordDimensions, ToJson, ToWkb};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Envelope {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl Envelope {
    pub fn merge(self, other: Envelope) -> Self {
        Self {
            min_x: self.min_x.min(other.min_x),
            max_x: self.max_x.max(other.max_x),
            min_y: self.min_y.min(other.min_y),
            max_y: self.max_y.max(other.max_y),
        }
    }

    /// Header order: `[min_x, max_x, min_y, max_y]`.
    fn to_header(self) -> Vec<f64> {
        vec![self.min_x, self.max_x, self.min_y, self.max_y]
    }
}

/// XY, or XYZ when any position carries a third ordinate.
///
/// Fails on a position with fewer than two ordinates; nothing downstream can
/// encode one.
pub fn dimensions(value: &Value) -> Result<CoordDimensions> {
    let mut has_z = false;
    for_each_position(value, &mut |p| {
        if p.len() < 2 {
            return Err(WorkProgramError::InvalidData(format!(
                "position {p:?} has fewer than two ordinates"
            )));
        }
        has_z |= p.len() >= 3;
        Ok(())
    })?;
    Ok(if has_z {
        CoordDimensions::xyz()
    } else {
        CoordDimensions::xy()
    })
}

fn for_each_position(value: &Value, f: &mut dyn FnMut(&Position) -> Result<()>) -> Result<()> {
    match value {
        Value::Point(p) => f(p),
        Value::MultiPoint(points) | Value::LineString(points) => {
            points.iter().try_for_each(|p| f(p))
        }
        Value::MultiLineString(lines) | Value::Polygon(lines) => {
            lines.iter().flatten().try_for_each(|p| f(p))
        }
        Value::MultiPolygon(polygons) => polygons
            .iter()
            .flatten()
            .flatten()
            .try_for_each(|p| f(p)),
        Value::GeometryCollection(members) => members
            .iter()
            .try_for_each(|g| for_each_position(&g.value, &mut *f)),
    }
}

/// Bounding box of a non-empty geometry whose positions passed
/// [`dimensions`].
pub fn envelope(value: &Value) -> Option<Envelope> {
    let geometry = geo::Geometry::<f64>::try_from(value).ok()?;
    geometry.bounding_rect().map(|rect| Envelope {
        min_x: rect.min().x,
        max_x: rect.max().x,
        min_y: rect.min().y,
        max_y: rect.max().y,
    })
}

/// Standard GeoPackage blob with an XY envelope.
pub fn encode(geometry: &Geometry, srs_id: i32, dims: CoordDimensions) -> Result<Vec<u8>> {
    let envelope = envelope(&geometry.value)
        .map(Envelope::to_header)
        .unwrap_or_default();
    let json = geometry.to_string();
    Ok(GeoJson(&json).to_gpkg_wkb(dims, Some(srs_id), envelope)?)
}

pub fn decode(blob: &[u8]) -> Result<Geometry> {
    let json = GpkgWkb(blob.to_vec()).to_json()?;
    Ok(serde_json::from_str(&json)?)
}
