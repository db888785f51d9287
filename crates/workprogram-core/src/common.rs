// crates/workprogram-core/src/common.rs

use std::fmt;

/// Attribute holding the geolocation outcome of a work program record.
pub const LOC_ERROR_FIELD: &str = "LOC_ERROR";

/// The only `LOC_ERROR` value that marks a usable record.
pub const NO_ERROR: &str = "NO ERROR";

/// County name attribute, used in the server-side `where` clause.
pub const COUNTY_FIELD: &str = "CONTYNAM";

/// Coordinate reference system of a table.
///
/// Only WGS84 geographic coordinates are produced: every request asks the
/// server for `outSR=4326`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Crs {
    #[default]
    Wgs84,
}

impl Crs {
    pub fn epsg(&self) -> i32 {
        match self {
            Crs::Wgs84 => 4326,
        }
    }

    pub fn srs_name(&self) -> &'static str {
        match self {
            Crs::Wgs84 => "WGS 84 geodetic",
        }
    }

    /// OGC WKT definition, as stored in `gpkg_spatial_ref_sys`.
    pub fn definition(&self) -> &'static str {
        match self {
            Crs::Wgs84 => concat!(
                r#"GEOGCS["WGS 84",DATUM["WGS_1984",SPHEROID["WGS 84",6378137,298.257223563,"#,
                r#"AUTHORITY["EPSG","7030"]],AUTHORITY["EPSG","6326"]],"#,
                r#"PRIMEM["Greenwich",0,AUTHORITY["EPSG","8901"]],"#,
                r#"UNIT["degree",0.0174532925199433,AUTHORITY["EPSG","9122"]],"#,
                r#"AUTHORITY["EPSG","4326"]]"#
            ),
        }
    }

    pub fn from_epsg(code: i32) -> Option<Self> {
        match code {
            4326 => Some(Crs::Wgs84),
            _ => None,
        }
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg())
    }
}
