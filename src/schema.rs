//! JSON payloads returned by the HTTP surface.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

pub const SERVICE_NAME: &str = "OCR Text Extraction API";
pub const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Current time as fractional seconds since the Unix epoch.
pub fn unix_timestamp() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

/// Facts about the uploaded file, independent of what was recognized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub filename: String,
    pub file_size_bytes: usize,
    pub content_type: String,
}

/// Successful extraction. "No text found" is also a success.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuccessPayload {
    pub success: bool,
    pub text: String,
    /// Heuristic estimate, not a score reported by the recognition engine.
    pub confidence: f64,
    pub processing_time_ms: u64,
    pub metadata: FileMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub success: bool,
    pub error: String,
    pub detail: String,
    pub processing_time_ms: u64,
}

/// Response for `GET /`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiInfo {
    pub service: String,
    pub status: String,
    pub version: String,
    pub endpoints: BTreeMap<String, String>,
}

impl ApiInfo {
    pub fn current() -> Self {
        let endpoints = BTreeMap::from([
            (
                "extract_text".to_string(),
                "/extract-text (POST)".to_string(),
            ),
            ("health".to_string(), "/health (GET)".to_string()),
        ]);

        Self {
            service: SERVICE_NAME.to_string(),
            status: "running".to_string(),
            version: SERVICE_VERSION.to_string(),
            endpoints,
        }
    }
}

/// Response for `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub recognition_engine: String,
    pub timestamp: f64,
}
