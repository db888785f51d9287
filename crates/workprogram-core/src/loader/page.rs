// crates/workprogram-core/src/loader/page.rs

use crate::error::{Result, WorkProgramError};
use geojson::{Feature, JsonValue};
use serde::Deserialize;

/// One page request against the feature service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageQuery {
    pub where_clause: String,
    pub page_size: usize,
    pub offset: usize,
}

impl PageQuery {
    pub fn new(where_clause: impl Into<String>, page_size: usize, offset: usize) -> Self {
        Self {
            where_clause: where_clause.into(),
            page_size,
            offset,
        }
    }

    /// Query-string parameters: all fields, GeoJSON, WGS84 output.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("where", self.where_clause.clone()),
            ("outFields", "*".to_string()),
            ("f", "geojson".to_string()),
            ("outSR", "4326".to_string()),
            ("resultRecordCount", self.page_size.to_string()),
            ("resultOffset", self.offset.to_string()),
        ]
    }
}

/// Decoded response body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeaturePage {
    pub features: Vec<Feature>,
    /// ArcGIS sets this when more records match than were returned.
    pub exceeded_transfer_limit: Option<bool>,
}

impl FeaturePage {
    pub fn new(features: Vec<Feature>) -> Self {
        Self {
            features,
            exceeded_transfer_limit: None,
        }
    }

    pub fn with_transfer_limit(mut self, exceeded: bool) -> Self {
        self.exceeded_transfer_limit = Some(exceeded);
        self
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Whether another request is needed after this page.
    ///
    /// The server's `exceededTransferLimit` flag wins when present. Without
    /// it, a page shorter than requested is taken as the last one.
    pub fn has_more(&self, page_size: usize) -> bool {
        if self.features.is_empty() {
            return false;
        }
        match self.exceeded_transfer_limit {
            Some(exceeded) => exceeded,
            None => self.features.len() >= page_size,
        }
    }
}

/// `{"error": {...}}` payload of a failed ArcGIS query.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ServiceErrorBody {
    code: i64,
    message: Option<String>,
    details: Vec<String>,
}

/// Decodes a `f=geojson` query response.
///
/// A body without `features` is an empty page. ArcGIS query errors arrive as
/// `{"error": {"code": .., "message": ..}}` with a 200 status and are turned
/// into [`WorkProgramError::Service`].
pub fn parse_page(body: &str) -> Result<FeaturePage> {
    let value: JsonValue = serde_json::from_str(body)?;
    let JsonValue::Object(mut object) = value else {
        return Err(WorkProgramError::InvalidData(
            "feature service response is not a JSON object".into(),
        ));
    };

    if let Some(error) = object.remove("error") {
        return Err(service_error(error));
    }

    let exceeded_transfer_limit = object
        .get("exceededTransferLimit")
        .or_else(|| {
            object
                .get("properties")
                .and_then(|p| p.get("exceededTransferLimit"))
        })
        .and_then(JsonValue::as_bool);

    let features = match object.remove("features") {
        None | Some(JsonValue::Null) => Vec::new(),
        Some(features) => serde_json::from_value::<Vec<Feature>>(features)?,
    };

    Ok(FeaturePage {
        features,
        exceeded_transfer_limit,
    })
}

/// An `error` member that does not decode keeps its raw JSON as the message
/// and code 0.
fn service_error(error: JsonValue) -> WorkProgramError {
    match ServiceErrorBody::deserialize(&error) {
        Ok(body) => {
            let mut message = body.message.unwrap_or_else(|| "unknown error".into());
            if !body.details.is_empty() {
                message = format!("{message} ({})", body.details.join("; "));
            }
            WorkProgramError::Service {
                code: body.code,
                message,
            }
        }
        Err(_) => WorkProgramError::Service {
            code: 0,
            message: error.to_string(),
        },
    }
}
