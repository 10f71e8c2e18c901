//! Google Cloud Vision text detection over the REST `images:annotate` API.

use super::{DetectionError, TextAnnotation, TextDetection, TextDetector};
use crate::config::{VisionAuth, VisionConfig};
use crate::credentials::ServiceAccount;
use anyhow::Context;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

enum Auth {
    ApiKey(String),
    ServiceAccount(ServiceAccount),
}

pub struct VisionClient {
    base_url: String,
    auth: Auth,
    client: reqwest::Client,
}

impl VisionClient {
    /// Build the client from configuration. Fails when no usable credentials
    /// are configured, which leaves the engine unavailable.
    pub fn from_config(config: &VisionConfig) -> anyhow::Result<Self> {
        let auth = match &config.auth {
            VisionAuth::ApiKey(key) => Auth::ApiKey(key.clone()),
            VisionAuth::ServiceAccount(path) => {
                Auth::ServiceAccount(ServiceAccount::from_file(path)?)
            }
            VisionAuth::Missing => anyhow::bail!(
                "No Vision credentials: set GOOGLE_VISION_API_KEY or GOOGLE_APPLICATION_CREDENTIALS"
            ),
        };

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .context("Failed to build HTTP client")?;

        info!(
            "VisionClient: using {} at {}",
            match &auth {
                Auth::ApiKey(_) => "API key".to_string(),
                Auth::ServiceAccount(sa) => format!("service account {}", sa.client_email()),
            },
            config.base_url
        );

        Ok(Self {
            base_url: config.base_url.clone(),
            auth,
            client,
        })
    }
}

// ── Vision API request/response types ───────────────────────────────────────

#[derive(Serialize)]
struct AnnotateRequest<'a> {
    requests: Vec<AnnotateImageRequest<'a>>,
}

#[derive(Serialize)]
struct AnnotateImageRequest<'a> {
    image: ImageContent,
    features: Vec<Feature<'a>>,
}

#[derive(Serialize)]
struct ImageContent {
    content: String,
}

#[derive(Serialize)]
struct Feature<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
}

#[derive(Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<AnnotateImageResponse>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct AnnotateImageResponse {
    #[serde(default)]
    text_annotations: Vec<EntityAnnotation>,
    #[serde(default)]
    error: Option<Status>,
}

#[derive(Deserialize)]
struct EntityAnnotation {
    #[serde(default)]
    description: String,
}

#[derive(Deserialize)]
struct Status {
    #[serde(default)]
    message: String,
}

impl From<AnnotateImageResponse> for TextDetection {
    fn from(resp: AnnotateImageResponse) -> Self {
        Self {
            annotations: resp
                .text_annotations
                .into_iter()
                .map(|a| TextAnnotation {
                    description: a.description,
                })
                .collect(),
            error: resp.error.map(|s| DetectionError { message: s.message }),
        }
    }
}

// ── Detector implementation ─────────────────────────────────────────────────

#[async_trait::async_trait]
impl TextDetector for VisionClient {
    fn name(&self) -> &str {
        "google_vision"
    }

    async fn detect_text(&self, image: &[u8]) -> anyhow::Result<TextDetection> {
        let body = AnnotateRequest {
            requests: vec![AnnotateImageRequest {
                image: ImageContent {
                    content: BASE64.encode(image),
                },
                features: vec![Feature {
                    kind: "TEXT_DETECTION",
                }],
            }],
        };

        let url = format!("{}/v1/images:annotate", self.base_url);
        let request = match &self.auth {
            Auth::ApiKey(key) => self.client.post(&url).query(&[("key", key)]),
            Auth::ServiceAccount(sa) => {
                let token = sa.access_token(&self.client).await?;
                self.client.post(&url).bearer_auth(token)
            }
        };

        debug!("VisionClient: annotating {} bytes", image.len());

        let resp = request
            .json(&body)
            .send()
            .await
            .context("Failed to send request to Vision API")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            anyhow::bail!("Vision API error ({}): {}", status, text);
        }

        let annotated: AnnotateResponse = resp
            .json()
            .await
            .context("Failed to parse Vision API response")?;

        let first = annotated.responses.into_iter().next().unwrap_or_default();
        let detection = TextDetection::from(first);

        debug!(
            "VisionClient: {} annotations, error={}",
            detection.annotations.len(),
            detection.error.is_some()
        );

        Ok(detection)
    }
}
