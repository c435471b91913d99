//! Image generation contract shared by every provider.
//!
//! This module defines the [`ImageGenerationClient`] trait: one call that takes a source
//! photo plus a text instruction and returns a generated image as a PNG data URI. The trait
//! is the seam between the [`GenerationOrchestrator`](crate::orchestrator::GenerationOrchestrator)
//! and the network; tests plug in scripted clients, production code uses
//! [`GeminiImageClient`](crate::clients::gemini::GeminiImageClient).
//!
//! # Error normalization
//!
//! Every failure is reported as a [`GenerationError`] carrying a non-empty, human-readable
//! message. Callers never have to inspect transport errors themselves.
//!
//! # Example
//!
//! ```rust,no_run
//! use portrait_studio::image_generation::ImageGenerationClient;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client: Arc<dyn ImageGenerationClient> = /* ... */
//! #       unimplemented!();
//!     let photo_b64 = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNk+M9QDwADhgGAWjR9awAAAABJRU5ErkJggg==";
//!     let data_uri = client
//!         .generate(photo_b64, "image/png", "Make it a watercolor portrait")
//!         .await?;
//!     assert!(data_uri.starts_with("data:image/png;base64,"));
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use std::error::Error;
use std::fmt;

/// Fallback message used whenever a failure carries no usable text.
pub const FALLBACK_ERROR_MESSAGE: &str = "Failed to generate image";

/// Message reported when the provider answered but produced no image part.
pub const NO_IMAGE_MESSAGE: &str = "No image data returned from Gemini.";

const DATA_URI_PNG_PREFIX: &str = "data:image/png;base64,";

/// Typed failure of a single generation.
///
/// ```
/// use portrait_studio::image_generation::GenerationError;
///
/// let err = GenerationError::Remote("quota exceeded".into());
/// assert_eq!(err.to_string(), "quota exceeded");
///
/// let blank = GenerationError::Network(String::new());
/// assert_eq!(blank.message(), "Failed to generate image");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    /// The request never produced an HTTP response (DNS, TLS, timeout, connection reset).
    Network(String),
    /// The provider answered with an error status (auth, quota, content policy, ...).
    Remote(String),
    /// The provider answered successfully but no part carried inline image data.
    NoImageReturned,
    /// The inputs were rejected before any request was made.
    InvalidInput(String),
}

impl GenerationError {
    /// Normalized, never-empty message suitable for showing next to a style.
    pub fn message(&self) -> &str {
        let raw = match self {
            GenerationError::Network(msg)
            | GenerationError::Remote(msg)
            | GenerationError::InvalidInput(msg) => msg.as_str(),
            GenerationError::NoImageReturned => NO_IMAGE_MESSAGE,
        };
        if raw.trim().is_empty() {
            FALLBACK_ERROR_MESSAGE
        } else {
            raw
        }
    }
}

impl fmt::Display for GenerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl Error for GenerationError {}

/// Provider that turns a photo plus an instruction into a generated image.
///
/// Implementations must be `Send + Sync`: the orchestrator shares a single client across
/// all concurrently running generations.
#[async_trait]
pub trait ImageGenerationClient: Send + Sync {
    /// Generate one image from `image_data` (base64, with or without a `data:` prefix).
    ///
    /// Returns a `data:image/png;base64,...` URI on success. Failures are never retried
    /// internally.
    async fn generate(
        &self,
        image_data: &str,
        mime_type: &str,
        prompt: &str,
    ) -> Result<String, GenerationError>;

    /// Provider model identifier, e.g. `"gemini-2.5-flash-image"`.
    fn model_name(&self) -> &str;
}

/// Drop a `data:<mime>;base64,` style prefix, keeping only the raw base64 payload.
///
/// Anything up to and including the first comma is removed when the remainder is non-empty;
/// otherwise the input is returned untouched.
///
/// ```
/// use portrait_studio::image_generation::strip_data_uri_prefix;
///
/// assert_eq!(strip_data_uri_prefix("data:image/jpeg;base64,/9j/4AAQ"), "/9j/4AAQ");
/// assert_eq!(strip_data_uri_prefix("/9j/4AAQ"), "/9j/4AAQ");
/// ```
pub fn strip_data_uri_prefix(image_data: &str) -> &str {
    match image_data.split_once(',') {
        Some((_, rest)) if !rest.is_empty() => rest,
        _ => image_data,
    }
}

/// Wrap a style prompt in the fixed instruction template sent to the model.
pub fn wrap_instruction(prompt: &str) -> String {
    format!(
        "Follow this strict visual instruction to transform the attached image: {}",
        prompt
    )
}

/// Re-wrap raw base64 image data as a PNG data URI.
pub fn to_png_data_uri(base64_data: &str) -> String {
    format!("{}{}", DATA_URI_PNG_PREFIX, base64_data)
}

/// Determine an image format from base64 data by inspecting the encoded magic bytes.
///
/// ```
/// use portrait_studio::image_generation::image_format_from_base64;
///
/// assert_eq!(image_format_from_base64("iVBORw0KGgoAAAANSUhEUg"), "png");
/// assert_eq!(image_format_from_base64("/9j/4AAQSkZJRg"), "jpg");
/// assert_eq!(image_format_from_base64("aW52YWxpZA=="), "bin");
/// ```
pub fn image_format_from_base64(b64_data: &str) -> &'static str {
    if b64_data.starts_with("iVBORw0KG") {
        "png"
    } else if b64_data.starts_with("/9j/") {
        "jpg"
    } else if b64_data.starts_with("UklGRi") {
        "webp"
    } else {
        "bin"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_prefix_edge_cases() {
        assert_eq!(strip_data_uri_prefix("data:image/png;base64,"), "data:image/png;base64,");
        assert_eq!(strip_data_uri_prefix(""), "");
        assert_eq!(strip_data_uri_prefix("a,b"), "b");
    }

    #[test]
    fn test_wrap_instruction_template() {
        assert_eq!(
            wrap_instruction("make it pop"),
            "Follow this strict visual instruction to transform the attached image: make it pop"
        );
    }

    #[test]
    fn test_error_messages_are_never_empty() {
        assert_eq!(GenerationError::NoImageReturned.message(), NO_IMAGE_MESSAGE);
        assert_eq!(GenerationError::Remote("  ".into()).message(), FALLBACK_ERROR_MESSAGE);
        assert_eq!(
            GenerationError::InvalidInput("bad mime".into()).to_string(),
            "bad mime"
        );
    }

    #[test]
    fn test_png_data_uri() {
        assert_eq!(to_png_data_uri("X"), "data:image/png;base64,X");
    }
}
