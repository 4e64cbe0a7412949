use serde::{Deserialize, Serialize};

/// Name of the multipart field carrying the photo.
pub const IMAGE_FIELD: &str = "image";

/// `live` or `fallback`; tells clients and logs whether the external services answered.
pub const ANALYSIS_SOURCE_HEADER: &str = "x-analysis-source";

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}
