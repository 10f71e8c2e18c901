//! Error taxonomy for the extraction pipeline and its JSON rendering.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::{error, warn};

use crate::schema::ErrorPayload;

/// Every way an `/extract-text` request can fail.
///
/// `Display` is the internal, log-facing message. What the client sees comes
/// from [`ExtractError::detail`], which is deliberately generic for the
/// 500-class variants.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Invalid file format. Only JPG/JPEG images are supported. Received: {0}")]
    InvalidFormat(String),

    #[error("Filename is required")]
    MissingFilename,

    #[error("Invalid file extension. Only .jpg and .jpeg are supported. Received: {0}")]
    InvalidExtension(String),

    #[error("Empty file uploaded")]
    EmptyFile,

    #[error("Empty image content")]
    EmptyContent,

    #[error("File too large. Maximum size is 10MB")]
    PayloadTooLarge,

    #[error("Vision API service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Vision API error: {0}")]
    RecognitionFailure(String),

    #[error("Internal error: {0}")]
    Internal(String),

    /// The client sent a multipart body that could not be parsed.
    #[error("Malformed multipart body: {0}")]
    MalformedBody(String),

    /// The `image` multipart field was absent or the body was not multipart.
    #[error("Missing multipart field 'image': {0}")]
    MissingField(String),
}

impl ExtractError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidFormat(_)
            | Self::MissingFilename
            | Self::InvalidExtension(_)
            | Self::EmptyFile
            | Self::EmptyContent
            | Self::MalformedBody(_) => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::RecognitionFailure(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::MissingField(_) => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }

    /// Short human-readable category, sent as the `error` field.
    pub fn title(&self) -> &'static str {
        match self {
            Self::InvalidFormat(_) => "Invalid file format",
            Self::MissingFilename => "Missing filename",
            Self::InvalidExtension(_) => "Invalid file extension",
            Self::EmptyFile => "Empty file",
            Self::EmptyContent => "Empty content",
            Self::PayloadTooLarge => "Payload too large",
            Self::ServiceUnavailable(_) => "Service unavailable",
            Self::RecognitionFailure(_) => "Recognition failed",
            Self::Internal(_) => "Internal server error",
            Self::MalformedBody(_) => "Malformed request",
            Self::MissingField(_) => "Missing field",
        }
    }

    /// Client-visible detail. 400-class variants echo the offending value;
    /// 5xx variants never carry internal causes.
    pub fn detail(&self) -> String {
        match self {
            Self::PayloadTooLarge => "File size exceeds 10MB limit".to_string(),
            Self::ServiceUnavailable(_) => "Vision API service unavailable".to_string(),
            Self::RecognitionFailure(_) => "Failed to process image with Vision API".to_string(),
            Self::Internal(_) => {
                "An unexpected error occurred while processing the image".to_string()
            }
            Self::MalformedBody(_) => "Malformed multipart body".to_string(),
            Self::MissingField(_) => "Multipart field 'image' is required".to_string(),
            other => other.to_string(),
        }
    }
}

/// An [`ExtractError`] stamped with how long the request ran before failing.
#[derive(Debug)]
pub struct ApiError {
    pub error: ExtractError,
    pub processing_time_ms: u64,
}

impl ApiError {
    pub fn new(error: ExtractError, processing_time_ms: u64) -> Self {
        Self {
            error,
            processing_time_ms,
        }
    }
}

impl From<ExtractError> for ApiError {
    fn from(error: ExtractError) -> Self {
        Self::new(error, 0)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.error.status();

        if status.is_server_error() {
            error!(
                "Request failed ({}): {} [{} ms]",
                status.as_u16(),
                self.error,
                self.processing_time_ms
            );
        } else {
            warn!(
                "Request rejected ({}): {} [{} ms]",
                status.as_u16(),
                self.error,
                self.processing_time_ms
            );
        }

        let body = ErrorPayload {
            success: false,
            error: self.error.title().to_string(),
            detail: self.error.detail(),
            processing_time_ms: self.processing_time_ms,
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ExtractError::InvalidFormat("image/png".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ExtractError::MissingFilename.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ExtractError::InvalidExtension(".png".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ExtractError::EmptyFile.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ExtractError::EmptyContent.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ExtractError::PayloadTooLarge.status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            ExtractError::ServiceUnavailable("no credentials".into()).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ExtractError::RecognitionFailure("quota".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ExtractError::Internal("boom".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ExtractError::MalformedBody("incomplete stream".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ExtractError::MissingField("no body".into()).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn test_client_errors_echo_offending_value() {
        let detail = ExtractError::InvalidFormat("image/png".into()).detail();
        assert!(detail.contains("Invalid file format"));
        assert!(detail.contains("image/png"));

        let detail = ExtractError::InvalidExtension(".gif".into()).detail();
        assert!(detail.contains("Invalid file extension"));
        assert!(detail.contains(".gif"));
    }

    #[test]
    fn test_server_errors_do_not_leak_internals() {
        let secret = "PERMISSION_DENIED: project 1234 billing disabled";

        let detail = ExtractError::RecognitionFailure(secret.into()).detail();
        assert!(!detail.contains("1234"));
        assert_eq!(detail, "Failed to process image with Vision API");

        let detail = ExtractError::Internal(secret.into()).detail();
        assert!(!detail.contains("billing"));

        let detail = ExtractError::ServiceUnavailable(secret.into()).detail();
        assert!(detail.to_lowercase().contains("unavailable"));
        assert!(!detail.contains("PERMISSION_DENIED"));
    }

    #[tokio::test]
    async fn test_api_error_renders_error_payload() {
        let response = ApiError::new(ExtractError::EmptyFile, 7).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "Empty file");
        assert_eq!(json["detail"], "Empty file uploaded");
        assert_eq!(json["processing_time_ms"], 7);
    }
}
