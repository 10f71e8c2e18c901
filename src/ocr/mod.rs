//! Text recognition capability and the orchestration around it.
//!
//! Defines the [`TextDetector`] trait so the Vision backend can be swapped for
//! a stub in tests, and [`EngineStatus`], the once-computed readiness value
//! that request handlers receive instead of consulting a global.

pub mod vision;

use std::sync::Arc;

use tracing::{debug, error};

use crate::error::ExtractError;

/// Confidence reported whenever text was found.
///
/// The single-pass text detection call exposes no usable score, so this is a
/// fixed placeholder rather than a measured value.
pub const ESTIMATED_CONFIDENCE: f64 = 0.95;

/// One text annotation returned by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextAnnotation {
    pub description: String,
}

/// Structured error indicator returned inside an otherwise successful call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectionError {
    pub message: String,
}

/// Raw outcome of a text detection call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextDetection {
    pub annotations: Vec<TextAnnotation>,
    pub error: Option<DetectionError>,
}

/// Extracted text plus its confidence estimate.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionResult {
    pub text: String,
    pub confidence: f64,
}

impl RecognitionResult {
    pub fn empty() -> Self {
        Self {
            text: String::new(),
            confidence: 0.0,
        }
    }
}

/// Async trait implemented by each text detection backend.
///
/// Implementations must be safe to call concurrently from many requests.
#[async_trait::async_trait]
pub trait TextDetector: Send + Sync {
    fn name(&self) -> &str;

    /// Flat, best-effort text detection (not layout-aware document OCR).
    /// `Err` means the call itself failed in transport or processing.
    async fn detect_text(&self, image: &[u8]) -> anyhow::Result<TextDetection>;
}

/// Readiness of the recognition engine, decided once at startup.
#[derive(Clone)]
pub enum EngineStatus {
    Ready(Arc<dyn TextDetector>),
    Unavailable { reason: String },
}

impl EngineStatus {
    /// Turn the outcome of engine construction into a status.
    pub fn from_init<D>(result: anyhow::Result<D>) -> Self
    where
        D: TextDetector + 'static,
    {
        match result {
            Ok(detector) => Self::Ready(Arc::new(detector)),
            Err(e) => Self::Unavailable {
                reason: format!("{:#}", e),
            },
        }
    }

    /// Label used by the health endpoint.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Ready(_) => "healthy",
            Self::Unavailable { .. } => "unavailable",
        }
    }
}

impl std::fmt::Debug for EngineStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ready(detector) => f.debug_tuple("Ready").field(&detector.name()).finish(),
            Self::Unavailable { reason } => f
                .debug_struct("Unavailable")
                .field("reason", reason)
                .finish(),
        }
    }
}

/// Run text detection over `image` and interpret the engine's answer.
pub async fn recognize(
    engine: &EngineStatus,
    image: &[u8],
) -> Result<RecognitionResult, ExtractError> {
    let detector = match engine {
        EngineStatus::Ready(detector) => detector,
        EngineStatus::Unavailable { reason } => {
            error!("Recognition engine not initialized: {}", reason);
            return Err(ExtractError::ServiceUnavailable(reason.clone()));
        }
    };

    // Callers are expected to have rejected empty uploads already.
    if image.is_empty() {
        return Err(ExtractError::EmptyContent);
    }

    debug!(
        "Submitting {} bytes to {} for text detection",
        image.len(),
        detector.name()
    );

    let detection = detector.detect_text(image).await.map_err(|e| {
        error!("{} text detection failed: {:#}", detector.name(), e);
        ExtractError::RecognitionFailure(format!("{:#}", e))
    })?;

    if let Some(err) = detection.error.filter(|err| !err.message.is_empty()) {
        error!("{} returned an error: {}", detector.name(), err.message);
        return Err(ExtractError::RecognitionFailure(err.message));
    }

    let Some(first) = detection.annotations.into_iter().next() else {
        debug!("No text annotations found");
        return Ok(RecognitionResult::empty());
    };

    // The first annotation holds the full detected text.
    let confidence = if first.description.is_empty() {
        0.0
    } else {
        ESTIMATED_CONFIDENCE
    };

    Ok(RecognitionResult {
        text: first.description,
        confidence,
    })
}


#[cfg(test)]
mod tests {
    use super::testing::StubDetector;
    use super::*;

    const IMAGE: &[u8] = b"\xff\xd8\xff\xe0fake-jpeg\xff\xd9";

    fn ready(detector: StubDetector) -> (EngineStatus, Arc<StubDetector>) {
        let detector = Arc::new(detector);
        (EngineStatus::Ready(detector.clone()), detector)
    }

    #[tokio::test]
    async fn test_returns_first_annotation_with_estimate() {
        let (engine, _) = ready(StubDetector::with_text(&["Hello World", "Hello", "World"]));
        let result = recognize(&engine, IMAGE).await.unwrap();
        assert_eq!(result.text, "Hello World");
        assert_eq!(result.confidence, ESTIMATED_CONFIDENCE);
    }

    #[tokio::test]
    async fn test_no_annotations_is_success() {
        let (engine, _) = ready(StubDetector::with_text(&[]));
        let result = recognize(&engine, IMAGE).await.unwrap();
        assert_eq!(result, RecognitionResult::empty());
    }

    #[tokio::test]
    async fn test_empty_first_annotation_has_zero_confidence() {
        let (engine, _) = ready(StubDetector::with_text(&[""]));
        let result = recognize(&engine, IMAGE).await.unwrap();
        assert_eq!(result.text, "");
        assert_eq!(result.confidence, 0.0);
    }

    #[tokio::test]
    async fn test_unavailable_engine_is_not_called() {
        let engine = EngineStatus::Unavailable {
            reason: "no credentials".to_string(),
        };
        let err = recognize(&engine, IMAGE).await.unwrap_err();
        assert!(matches!(err, ExtractError::ServiceUnavailable(_)));
        assert_eq!(engine.label(), "unavailable");
    }

    #[tokio::test]
    async fn test_empty_bytes_rejected_before_call() {
        let (engine, detector) = ready(StubDetector::with_text(&["unused"]));
        let err = recognize(&engine, b"").await.unwrap_err();
        assert!(matches!(err, ExtractError::EmptyContent));
        assert_eq!(detector.call_count(), 0);
    }

    #[tokio::test]
    async fn test_transport_failure_maps_to_recognition_failure() {
        let (engine, _) = ready(StubDetector::failing("connection reset"));
        match recognize(&engine, IMAGE).await {
            Err(ExtractError::RecognitionFailure(detail)) => {
                assert!(detail.contains("connection reset"))
            }
            other => panic!("expected RecognitionFailure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_error_indicator_maps_to_recognition_failure() {
        let (engine, _) = ready(StubDetector::with_detection(TextDetection {
            annotations: vec![TextAnnotation {
                description: "ignored".to_string(),
            }],
            error: Some(DetectionError {
                message: "Bad image data.".to_string(),
            }),
        }));
        let err = recognize(&engine, IMAGE).await.unwrap_err();
        assert!(matches!(err, ExtractError::RecognitionFailure(m) if m == "Bad image data."));
    }

    #[tokio::test]
    async fn test_blank_error_message_is_ignored() {
        let (engine, _) = ready(StubDetector::with_detection(TextDetection {
            annotations: vec![TextAnnotation {
                description: "Receipt".to_string(),
            }],
            error: Some(DetectionError {
                message: String::new(),
            }),
        }));
        let result = recognize(&engine, IMAGE).await.unwrap();
        assert_eq!(result.text, "Receipt");
    }

    #[test]
    fn test_from_init() {
        let status = EngineStatus::from_init(Ok(StubDetector::with_text(&[])));
        assert!(matches!(status, EngineStatus::Ready(_)));
        assert_eq!(status.label(), "healthy");

        let status =
            EngineStatus::from_init::<StubDetector>(Err(anyhow::anyhow!("missing key")));
        match status {
            EngineStatus::Unavailable { reason } => assert!(reason.contains("missing key")),
            other => panic!("expected Unavailable, got {:?}", other),
        }
    }
}
