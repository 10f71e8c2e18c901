//! HTTP routes: service info, health, and text extraction.

use std::any::Any;
use std::time::Instant;

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        DefaultBodyLimit, Multipart, State,
    },
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::{ApiError, ExtractError};
use crate::ocr::{self, EngineStatus};
use crate::schema::{unix_timestamp, ApiInfo, FileMetadata, HealthResponse, SuccessPayload};
use crate::validation::{check_size, validate_upload, MAX_FILE_SIZE};

/// Name of the multipart field carrying the image.
pub const IMAGE_FIELD: &str = "image";

/// Application state shared across handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    pub engine: EngineStatus,
}

impl AppState {
    pub fn new(engine: EngineStatus) -> Self {
        Self { engine }
    }
}

/// An upload that passed header validation. Lives for one request.
struct UploadedImage {
    content_type: String,
    filename: String,
    bytes: Vec<u8>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/extract-text", post(extract_text))
        // Headroom above MAX_FILE_SIZE so the size gate, not the transport,
        // rejects moderately oversized files.
        .layer(DefaultBodyLimit::max(2 * MAX_FILE_SIZE))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ============================================================================
// Handlers
// ============================================================================

async fn root() -> Json<ApiInfo> {
    Json(ApiInfo::current())
}

/// Reports engine readiness. Never fails.
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        recognition_engine: state.engine.label().to_string(),
        timestamp: unix_timestamp(),
    })
}

/// Upload a JPEG and extract its text.
async fn extract_text(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<SuccessPayload>, ApiError> {
    let started = Instant::now();

    let result = async {
        let mut multipart = multipart.map_err(|e| ExtractError::MissingField(e.body_text()))?;
        let upload = read_image(&mut multipart).await?;
        check_size(upload.bytes.len())?;
        let recognized = ocr::recognize(&state.engine, &upload.bytes).await?;
        Ok::<_, ExtractError>((upload, recognized))
    }
    .await;

    let processing_time_ms = elapsed_ms(started);
    let (upload, recognized) = result.map_err(|e| ApiError::new(e, processing_time_ms))?;

    info!(
        "Successfully processed {} ({} bytes, {} chars) in {} ms",
        upload.filename,
        upload.bytes.len(),
        recognized.text.len(),
        processing_time_ms
    );

    Ok(Json(SuccessPayload {
        success: true,
        text: recognized.text,
        confidence: recognized.confidence,
        processing_time_ms,
        metadata: FileMetadata {
            filename: upload.filename,
            file_size_bytes: upload.bytes.len(),
            content_type: upload.content_type,
        },
    }))
}

// ============================================================================
// Helper functions
// ============================================================================

/// Find the `image` field, validate its headers, then read its bytes.
async fn read_image(multipart: &mut Multipart) -> Result<UploadedImage, ExtractError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let content_type = field.content_type().unwrap_or_default().to_string();
        let filename = field.file_name().unwrap_or_default().to_string();
        validate_upload(&content_type, &filename)?;

        let bytes = field.bytes().await.map_err(multipart_error)?.to_vec();

        return Ok(UploadedImage {
            content_type,
            filename,
            bytes,
        });
    }

    Err(ExtractError::MissingField(format!(
        "no '{}' field in form",
        IMAGE_FIELD
    )))
}

/// Multipart read failures are the client's: too large, or unparseable.
fn multipart_error(e: MultipartError) -> ExtractError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ExtractError::PayloadTooLarge
    } else {
        ExtractError::MalformedBody(e.body_text())
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Last-resort conversion of a handler panic into the generic error payload.
fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };

    ApiError::from(ExtractError::Internal(format!("handler panicked: {}", detail)))
        .into_response()
}
