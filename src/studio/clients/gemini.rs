//! Google Gemini image generation over the native `generateContent` REST endpoint.
//!
//! The photo travels as an `inlineData` part next to the wrapped instruction text; the first
//! candidate's first inline-data part is the generated portrait.

use crate::studio::config::{StudioConfig, DEFAULT_BASE_URL, DEFAULT_MODEL, DEFAULT_REQUEST_TIMEOUT};
use crate::studio::http_client_pool::get_or_create_client;
use crate::studio::image_generation::{
    image_format_from_base64, strip_data_uri_prefix, to_png_data_uri, wrap_instruction,
    GenerationError, ImageGenerationClient,
};
use async_trait::async_trait;
use log::{debug, error, warn};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Serialize)]
pub struct GenerateContentRequest {
    pub contents: Vec<RequestContent>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
pub struct RequestContent {
    pub role: String,
    pub parts: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum RequestPart {
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
    Text {
        text: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub data: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub image_config: ImageConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageConfig {
    pub aspect_ratio: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Option<Vec<ResponsePart>>,
}

#[derive(Debug, Deserialize)]
pub struct ResponsePart {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default, rename = "inlineData")]
    pub inline_data: Option<InlineData>,
}

/// Build the `generateContent` body: the photo first, then the wrapped instruction.
pub fn build_request_body(
    image_data: &str,
    mime_type: &str,
    prompt: &str,
    aspect_ratio: Option<&str>,
) -> GenerateContentRequest {
    let generation_config = aspect_ratio
        .map(str::trim)
        .filter(|ratio| !ratio.is_empty())
        .map(|ratio| GenerationConfig {
            image_config: ImageConfig {
                aspect_ratio: ratio.to_string(),
            },
        });

    GenerateContentRequest {
        contents: vec![RequestContent {
            role: "user".to_string(),
            parts: vec![
                RequestPart::InlineData {
                    inline_data: InlineData {
                        mime_type: Some(mime_type.to_string()),
                        data: Some(strip_data_uri_prefix(image_data).to_string()),
                    },
                },
                RequestPart::Text {
                    text: wrap_instruction(prompt),
                },
            ],
        }],
        generation_config,
    }
}

/// First non-empty inline image payload of the first candidate, if any.
pub fn extract_image_data(response: &GenerateContentResponse) -> Option<&str> {
    response
        .candidates
        .as_ref()?
        .first()?
        .content
        .as_ref()?
        .parts
        .as_ref()?
        .iter()
        .filter_map(|part| part.inline_data.as_ref())
        .filter_map(|inline| inline.data.as_deref())
        .find(|data| !data.is_empty())
}

/// Pull a readable message out of an error response body.
///
/// Prefers the API's `error.message`, then a top-level `message`, then the trimmed body.
pub fn summarize_error_body(body: &str) -> String {
    let trimmed = body.trim();
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        if let Some(message) = value
            .pointer("/error/message")
            .or_else(|| value.get("message"))
            .and_then(|v| v.as_str())
        {
            return message.to_string();
        }
    }
    truncate_for_log(trimmed, 500)
}

fn truncate_for_log(value: &str, limit: usize) -> String {
    if value.chars().count() <= limit {
        return value.to_string();
    }
    let truncated: String = value.chars().take(limit).collect();
    format!("{}... (truncated)", truncated)
}

/// [`ImageGenerationClient`] backed by the Gemini API.
///
/// ```rust,no_run
/// use portrait_studio::clients::gemini::GeminiImageClient;
/// use portrait_studio::image_generation::ImageGenerationClient;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = GeminiImageClient::new(&std::env::var("GEMINI_API_KEY")?);
///     let uri = client
///         .generate("iVBORw0KGgo...", "image/png", "Paint me as a renaissance noble")
///         .await?;
///     println!("{} bytes of data URI", uri.len());
///     Ok(())
/// }
/// ```
pub struct GeminiImageClient {
    http: reqwest::Client,
    api_key: String,
    pub model: String,
    base_url: String,
    request_timeout: Duration,
    aspect_ratio: Option<String>,
}

impl GeminiImageClient {
    /// Client for the default `gemini-2.5-flash-image` model.
    pub fn new(api_key: &str) -> Self {
        Self::new_with_model_string(api_key, DEFAULT_MODEL)
    }

    pub fn new_with_model_string(api_key: &str, model_name: &str) -> Self {
        Self::new_with_base_url(api_key, model_name, DEFAULT_BASE_URL)
    }

    /// Point the client at a custom API root, e.g. a proxy or a local stub server.
    /// The default root is `https://generativelanguage.googleapis.com/v1beta`.
    pub fn new_with_base_url(api_key: &str, model_name: &str, base_url: &str) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        GeminiImageClient {
            http: get_or_create_client(&base_url),
            api_key: api_key.to_string(),
            model: model_name.to_string(),
            base_url,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            aspect_ratio: None,
        }
    }

    pub fn from_config(config: &StudioConfig) -> Self {
        Self::new_with_base_url(&config.api_key, &config.model, &config.base_url)
            .with_request_timeout(config.request_timeout)
            .with_aspect_ratio(config.aspect_ratio.clone())
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_aspect_ratio(mut self, aspect_ratio: Option<String>) -> Self {
        self.aspect_ratio = aspect_ratio;
        self
    }

    pub fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    async fn send(&self, body: &GenerateContentRequest) -> Result<GenerateContentResponse, GenerationError> {
        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .timeout(self.request_timeout)
            .json(body)
            .send()
            .await
            .map_err(|err| GenerationError::Network(err.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let mut message = summarize_error_body(&body);
            if message.is_empty() {
                message = format!("HTTP {}", status);
            }
            warn!(
                "GeminiImageClient: {} returned status {}: {}",
                self.model, status, message
            );
            return Err(GenerationError::Remote(message));
        }

        let body = response
            .text()
            .await
            .map_err(|err| GenerationError::Network(err.without_url().to_string()))?;
        serde_json::from_str::<GenerateContentResponse>(&body).map_err(|err| {
            warn!(
                "GeminiImageClient: unreadable response from {}: {} (body: {})",
                self.model,
                err,
                truncate_for_log(&body, 200)
            );
            GenerationError::Remote(format!("Unreadable response from {}: {}", self.model, err))
        })
    }
}

#[async_trait]
impl ImageGenerationClient for GeminiImageClient {
    async fn generate(
        &self,
        image_data: &str,
        mime_type: &str,
        prompt: &str,
    ) -> Result<String, GenerationError> {
        if !mime_type.starts_with("image/") {
            return Err(GenerationError::InvalidInput(format!(
                "Unsupported MIME type {:?}, expected an image/* type",
                mime_type
            )));
        }
        // A bare `data:...,` header comes back unstripped.
        let payload = strip_data_uri_prefix(image_data);
        if payload.trim().is_empty() || payload.starts_with("data:") {
            return Err(GenerationError::InvalidInput(
                "Image data is empty".to_string(),
            ));
        }

        let body = build_request_body(payload, mime_type, prompt, self.aspect_ratio.as_deref());
        debug!(
            "GeminiImageClient: requesting {} ({} chars of {} input)",
            self.model,
            payload.len(),
            mime_type
        );

        let result = self.send(&body).await.and_then(|response| {
            extract_image_data(&response)
                .map(|data| {
                    let format = image_format_from_base64(data);
                    if format != "png" {
                        debug!(
                            "GeminiImageClient: model returned {} data, wrapping as PNG URI",
                            format
                        );
                    }
                    to_png_data_uri(data)
                })
                .ok_or(GenerationError::NoImageReturned)
        });

        if let Err(err) = &result {
            if log::log_enabled!(log::Level::Error) {
                error!("GeminiImageClient::generate error: {}", err);
            }
        }
        result
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
