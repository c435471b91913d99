//! The uploaded photo and the checks a selection must pass before it replaces the current one.

use base64::{engine::general_purpose, Engine as _};
use std::error::Error;
use std::fmt;
use std::path::Path;

/// Photo held in memory as base64 text plus its declared MIME type.
///
/// `data` may keep a `data:<mime>;base64,` prefix; the generation client strips it before
/// transmission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadedImage {
    pub data: String,
    pub mime_type: String,
}

/// Reasons a selected file is rejected. A rejected upload never changes orchestrator state.
#[derive(Debug)]
pub enum UploadError {
    /// The declared type does not begin with `image/`.
    NotAnImage(String),
    /// A data URI was missing its `data:<mime>;base64,` header.
    MalformedDataUri,
    /// The file could not be read.
    Io(std::io::Error),
}

impl fmt::Display for UploadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadError::NotAnImage(mime) => {
                write!(f, "Please upload an image file (got {:?})", mime)
            }
            UploadError::MalformedDataUri => write!(f, "Malformed image data URI"),
            UploadError::Io(err) => write!(f, "Failed to read image file: {}", err),
        }
    }
}

impl Error for UploadError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            UploadError::Io(err) => Some(err),
            _ => None,
        }
    }
}

/// Reject any declared type that does not begin with `image/`.
pub fn validate_mime_type(mime_type: &str) -> Result<(), UploadError> {
    if mime_type.starts_with("image/") {
        Ok(())
    } else {
        Err(UploadError::NotAnImage(mime_type.to_string()))
    }
}

impl UploadedImage {
    /// Wrap already-encoded base64 (or data URI) text.
    pub fn new(data: impl Into<String>, mime_type: impl Into<String>) -> Result<Self, UploadError> {
        let mime_type = mime_type.into();
        validate_mime_type(&mime_type)?;
        Ok(Self {
            data: data.into(),
            mime_type,
        })
    }

    /// Encode raw file bytes.
    ///
    /// ```
    /// use portrait_studio::upload::UploadedImage;
    ///
    /// let image = UploadedImage::from_bytes(b"ABC", "image/png").unwrap();
    /// assert_eq!(image.data, "QUJD");
    /// assert!(UploadedImage::from_bytes(b"%PDF", "application/pdf").is_err());
    /// ```
    pub fn from_bytes(bytes: &[u8], mime_type: impl Into<String>) -> Result<Self, UploadError> {
        Self::new(general_purpose::STANDARD.encode(bytes), mime_type)
    }

    /// Parse a `data:<mime>;base64,<payload>` URI, taking the MIME type from its header.
    pub fn from_data_uri(uri: &str) -> Result<Self, UploadError> {
        let (header, _) = uri.split_once(',').ok_or(UploadError::MalformedDataUri)?;
        let mime_type = header
            .strip_prefix("data:")
            .and_then(|rest| rest.strip_suffix(";base64"))
            .ok_or(UploadError::MalformedDataUri)?;
        Self::new(uri, mime_type)
    }
}

/// Guess a declared MIME type from a file extension.
pub fn mime_type_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "heic" => "image/heic",
        "heif" => "image/heif",
        "bmp" => "image/bmp",
        "txt" => "text/plain",
        "pdf" => "application/pdf",
        _ => return None,
    };
    Some(mime)
}

/// Read a photo from disk. The MIME type comes from the extension, like a browser file input.
pub fn load_image_file(path: impl AsRef<Path>) -> Result<UploadedImage, UploadError> {
    let path = path.as_ref();
    let mime_type = mime_type_for_path(path).unwrap_or("application/octet-stream");
    validate_mime_type(mime_type)?;
    let bytes = std::fs::read(path).map_err(UploadError::Io)?;
    log::info!(
        "Loaded {} ({} bytes, {})",
        path.display(),
        bytes.len(),
        mime_type
    );
    UploadedImage::from_bytes(&bytes, mime_type)
}
