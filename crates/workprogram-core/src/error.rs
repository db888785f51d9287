// crates/workprogram-core/src/error.rs

use thiserror::Error;

/// Everything that can abort a run.
///
/// There is no retry or partial-result salvage anywhere in the crate: the
/// first error propagates to the caller.
#[derive(Debug, Error)]
pub enum WorkProgramError {
    /// Transport failure (DNS, TLS, connection reset, ...).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("request timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("server returned {status} for {url}")]
    Status { status: u16, url: String },

    /// ArcGIS reports query errors inside a 200 response.
    #[error("feature service error {code}: {message}")]
    Service { code: i64, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("GeoPackage error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("geometry encoding error: {0}")]
    Geometry(#[from] geozero::error::GeozeroError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("not found: {0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, WorkProgramError>;
