use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::color::Rgb;
use crate::config::Config;
use crate::data_models::{DominantColor, Label, RawVisionOutput, WebEntity};
use crate::error::{AppError, ServiceError};

const MAX_LABELS: u32 = 15;
const MAX_COLORS: u32 = 5;
const MAX_WEB_ENTITIES: u32 = 10;

/// Something that can look at an image and describe it.
#[async_trait]
pub trait VisionService: Send + Sync {
    /// Fails with [`AppError::VisionUnavailable`].
    async fn analyze(&self, image: &[u8]) -> Result<RawVisionOutput, AppError>;
}

/// Google Cloud Vision `images:annotate` over REST with an API key.
#[derive(Clone)]
pub struct GoogleVisionClient {
    http_client: Client,
    endpoint: String,
    api_key: Option<String>,
}

#[derive(Serialize)]
struct AnnotateRequest<'a> {
    requests: [ImageRequest<'a>; 1],
}

#[derive(Serialize)]
struct ImageRequest<'a> {
    image: ImageContent,
    features: &'a [Feature],
}

#[derive(Serialize)]
struct ImageContent {
    content: String,
}

#[derive(Serialize)]
struct Feature {
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(rename = "maxResults")]
    max_results: u32,
}

const FEATURES: &[Feature] = &[
    Feature { kind: "LABEL_DETECTION", max_results: MAX_LABELS },
    Feature { kind: "IMAGE_PROPERTIES", max_results: MAX_COLORS },
    Feature { kind: "WEB_DETECTION", max_results: MAX_WEB_ENTITIES },
];

#[derive(Deserialize, Default)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<ImageResponse>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ImageResponse {
    #[serde(default)]
    label_annotations: Vec<LabelAnnotation>,
    #[serde(default)]
    image_properties_annotation: Option<ImageProperties>,
    #[serde(default)]
    web_detection: Option<WebDetection>,
    #[serde(default)]
    error: Option<RemoteStatus>,
}

#[derive(Deserialize)]
struct LabelAnnotation {
    #[serde(default)]
    description: String,
    #[serde(default)]
    score: f32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageProperties {
    #[serde(default)]
    dominant_colors: Option<ColorsAnnotation>,
}

#[derive(Deserialize)]
struct ColorsAnnotation {
    #[serde(default)]
    colors: Vec<ColorInfo>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ColorInfo {
    #[serde(default)]
    color: ColorValue,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    pixel_fraction: f32,
}

/// The API leaves out channels that are zero.
#[derive(Deserialize, Default)]
struct ColorValue {
    #[serde(default)]
    red: f32,
    #[serde(default)]
    green: f32,
    #[serde(default)]
    blue: f32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WebDetection {
    #[serde(default)]
    web_entities: Vec<WebEntityAnnotation>,
}

#[derive(Deserialize)]
struct WebEntityAnnotation {
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    score: f32,
}

#[derive(Deserialize)]
struct RemoteStatus {
    #[serde(default)]
    code: i32,
    #[serde(default)]
    message: String,
}

fn channel(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

impl From<ImageResponse> for RawVisionOutput {
    fn from(response: ImageResponse) -> Self {
        let colors = response
            .image_properties_annotation
            .and_then(|p| p.dominant_colors)
            .map(|d| d.colors)
            .unwrap_or_default();

        RawVisionOutput {
            labels: response
                .label_annotations
                .into_iter()
                .map(|l| Label {
                    description: l.description.to_lowercase(),
                    confidence: l.score,
                })
                .collect(),
            colors: colors
                .into_iter()
                .map(|c| DominantColor {
                    rgb: Rgb::new(
                        channel(c.color.red),
                        channel(c.color.green),
                        channel(c.color.blue),
                    ),
                    score: c.score,
                    pixel_fraction: c.pixel_fraction,
                })
                .collect(),
            web_entities: response
                .web_detection
                .map(|w| w.web_entities)
                .unwrap_or_default()
                .into_iter()
                .filter_map(|e| {
                    Some(WebEntity {
                        description: e.description.filter(|d| !d.is_empty())?,
                        score: e.score,
                    })
                })
                .collect(),
        }
    }
}

impl GoogleVisionClient {
    pub fn new(http_client: Client, config: &Config) -> Self {
        Self {
            http_client,
            endpoint: config.vision_endpoint.clone(),
            api_key: config.vision_api_key.clone(),
        }
    }

    async fn annotate(&self, image: &[u8]) -> Result<RawVisionOutput, ServiceError> {
        let api_key = self.api_key.as_deref().ok_or(ServiceError::NotConfigured)?;

        let body = AnnotateRequest {
            requests: [ImageRequest {
                image: ImageContent {
                    content: STANDARD.encode(image),
                },
                features: FEATURES,
            }],
        };

        let response = self
            .http_client
            .post(&self.endpoint)
            .query(&[("key", api_key)])
            .json(&body)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => {
                let parsed: AnnotateResponse = response.json().await?;
                let first = parsed.responses.into_iter().next().unwrap_or_default();
                if let Some(err) = &first.error {
                    return Err(ServiceError::Remote(format!(
                        "vision error {}: {}",
                        err.code, err.message
                    )));
                }
                Ok(first.into())
            }
            status => {
                let text = response.text().await.unwrap_or_default();
                Err(ServiceError::UnexpectedStatus { status, text })
            }
        }
    }
}

#[async_trait]
impl VisionService for GoogleVisionClient {
    async fn analyze(&self, image: &[u8]) -> Result<RawVisionOutput, AppError> {
        let output = self
            .annotate(image)
            .await
            .map_err(AppError::VisionUnavailable)?;
        log::info!(
            "vision returned {} labels, {} colors, {} web entities",
            output.labels.len(),
            output.colors.len(),
            output.web_entities.len()
        );
        Ok(output)
    }
}
