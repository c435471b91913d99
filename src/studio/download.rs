//! Save-to-disk for finished portraits.

use crate::studio::image_generation::{image_format_from_base64, strip_data_uri_prefix};
use crate::studio::orchestrator::{GenerationResult, GenerationStatus};
use base64::{engine::general_purpose, Engine as _};
use std::error::Error;
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum DownloadError {
    /// The style has no Success result to save.
    NotReady { style_id: String, status: GenerationStatus },
    /// The style id is not part of the catalog.
    UnknownStyle(String),
    /// The stored data URI did not decode as base64.
    Decode(base64::DecodeError),
    Io(std::io::Error),
}

impl fmt::Display for DownloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DownloadError::NotReady { style_id, status } => write!(
                f,
                "Portrait '{}' is not ready for download (status: {})",
                style_id, status
            ),
            DownloadError::UnknownStyle(id) => write!(f, "Unknown style: {}", id),
            DownloadError::Decode(err) => write!(f, "Invalid image data: {}", err),
            DownloadError::Io(err) => write!(f, "Failed to write portrait: {}", err),
        }
    }
}

impl Error for DownloadError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DownloadError::Decode(err) => Some(err),
            DownloadError::Io(err) => Some(err),
            _ => None,
        }
    }
}

/// `portrait-{style_id}.png`
pub fn portrait_file_name(style_id: &str) -> String {
    format!("portrait-{}.png", style_id)
}

/// Decode the base64 payload of a data URI into raw bytes.
pub fn decode_data_uri(data_uri: &str) -> Result<Vec<u8>, DownloadError> {
    general_purpose::STANDARD
        .decode(strip_data_uri_prefix(data_uri))
        .map_err(DownloadError::Decode)
}

/// Write a Success result into `dir` and return the written path.
pub fn save_portrait(result: &GenerationResult, dir: impl AsRef<Path>) -> Result<PathBuf, DownloadError> {
    let image_url = match (&result.status, &result.image_url) {
        (GenerationStatus::Success, Some(url)) => url,
        _ => {
            return Err(DownloadError::NotReady {
                style_id: result.style_id.clone(),
                status: result.status,
            })
        }
    };

    let payload = strip_data_uri_prefix(image_url);
    if image_format_from_base64(payload) != "png" {
        log::warn!(
            "Portrait '{}' does not look like PNG data ({}), saving as .png anyway",
            result.style_id,
            image_format_from_base64(payload)
        );
    }

    let bytes = decode_data_uri(image_url)?;
    let path = dir.as_ref().join(portrait_file_name(&result.style_id));
    std::fs::write(&path, &bytes).map_err(DownloadError::Io)?;
    log::info!("Saved {} ({} bytes)", path.display(), bytes.len());
    Ok(path)
}
