//! The ordered set of portrait styles a photo is rendered into.
//!
//! A [`StyleCatalog`] is fixed for the lifetime of an
//! [`GenerationOrchestrator`](crate::orchestrator::GenerationOrchestrator): one
//! [`GenerationResult`](crate::orchestrator::GenerationResult) exists per entry, in catalog
//! order. The compiled-in catalog carries six styles; a catalog can also be loaded from a JSON
//! file holding an array of `{ "id", "title", "description", "prompt" }` objects.
//!
//! ```rust
//! use portrait_studio::style_catalog::StyleCatalog;
//!
//! let catalog = StyleCatalog::default_catalog();
//! assert_eq!(catalog.len(), 6);
//! assert!(catalog.get("corporate").is_some());
//! ```

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::error::Error;
use std::fmt;
use std::path::Path;

/// A named visual transformation recipe applied to an uploaded photo.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortraitStyle {
    /// Stable identifier, also used in the downloaded file name (`portrait-{id}.png`).
    pub id: String,
    /// Short display title.
    pub title: String,
    /// One-line description shown next to the result.
    pub description: String,
    /// Instruction sent to the image model.
    pub prompt: String,
}

impl PortraitStyle {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
        prompt: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: description.into(),
            prompt: prompt.into(),
        }
    }
}

/// Errors raised while building or loading a [`StyleCatalog`].
#[derive(Debug)]
pub enum CatalogError {
    /// The catalog contained no styles.
    Empty,
    /// A style had a blank id.
    BlankId,
    /// Two styles shared the same id.
    DuplicateId(String),
    /// The catalog file could not be read.
    Io(std::io::Error),
    /// The catalog file was not a JSON array of styles.
    Parse(serde_json::Error),
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogError::Empty => write!(f, "Style catalog is empty"),
            CatalogError::BlankId => write!(f, "Style catalog contains a style with a blank id"),
            CatalogError::DuplicateId(id) => write!(f, "Duplicate style id: {}", id),
            CatalogError::Io(err) => write!(f, "Failed to read style catalog: {}", err),
            CatalogError::Parse(err) => write!(f, "Invalid style catalog: {}", err),
        }
    }
}

impl Error for CatalogError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            CatalogError::Io(err) => Some(err),
            CatalogError::Parse(err) => Some(err),
            _ => None,
        }
    }
}

lazy_static! {
    static ref DEFAULT_STYLES: Vec<PortraitStyle> = vec![
        PortraitStyle::new(
            "corporate",
            "Corporate Headshot",
            "Clean, confident and LinkedIn-ready.",
            "Turn this photo into a professional corporate headshot. Dress the subject in a \
             tailored dark business suit, use soft even studio lighting and a neutral light-grey \
             seamless backdrop. Keep the person's face, features and identity unchanged.",
        ),
        PortraitStyle::new(
            "noir",
            "Film Noir",
            "High-contrast black and white drama.",
            "Restyle this photo as a 1940s film noir still: black and white, hard key light \
             from one side, deep shadows, venetian-blind light stripes across the background \
             and a light haze. Preserve the subject's facial identity exactly.",
        ),
        PortraitStyle::new(
            "renaissance",
            "Renaissance Oil",
            "Old-master painting with rich glazes.",
            "Repaint this photo as a Renaissance oil portrait in the manner of the Italian \
             masters: warm chiaroscuro, visible canvas texture, period clothing in deep velvet \
             and a dark landscape background. Keep the subject recognisable.",
        ),
        PortraitStyle::new(
            "cyberpunk",
            "Neon Cyberpunk",
            "Rain-soaked city glow in magenta and teal.",
            "Transform this photo into a cinematic cyberpunk portrait at night: magenta and \
             teal neon rim lighting, rain droplets, a blurred futuristic city with holographic \
             signs behind the subject. Do not alter the subject's face shape or identity.",
        ),
        PortraitStyle::new(
            "editorial",
            "Fashion Editorial",
            "Glossy magazine cover energy.",
            "Recreate this photo as a high-fashion magazine editorial portrait: bold styling, \
             beauty-dish lighting, a saturated colour-block backdrop and crisp retouched skin \
             that still keeps natural texture. Keep the subject's likeness intact.",
        ),
        PortraitStyle::new(
            "watercolor",
            "Watercolor Sketch",
            "Loose washes over confident ink lines.",
            "Render this photo as a hand-painted watercolor portrait: loose translucent \
             washes, soft bleeding edges, fine ink linework on textured cold-press paper and \
             plenty of white space. The subject must remain clearly recognisable.",
        ),
    ];
}

/// Fixed, ordered list of [`PortraitStyle`]s with unique ids.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StyleCatalog {
    styles: Vec<PortraitStyle>,
}

impl StyleCatalog {
    /// Build a catalog, checking that it is non-empty and that every id is present and unique.
    ///
    /// ```rust
    /// use portrait_studio::style_catalog::{PortraitStyle, StyleCatalog};
    ///
    /// let dup = vec![
    ///     PortraitStyle::new("a", "A", "", "p"),
    ///     PortraitStyle::new("a", "A again", "", "p"),
    /// ];
    /// assert!(StyleCatalog::new(dup).is_err());
    /// ```
    pub fn new(styles: Vec<PortraitStyle>) -> Result<Self, CatalogError> {
        if styles.is_empty() {
            return Err(CatalogError::Empty);
        }
        let mut seen = HashSet::with_capacity(styles.len());
        for style in &styles {
            if style.id.trim().is_empty() {
                return Err(CatalogError::BlankId);
            }
            if !seen.insert(style.id.as_str()) {
                return Err(CatalogError::DuplicateId(style.id.clone()));
            }
        }
        Ok(Self { styles })
    }

    /// The six compiled-in studio styles.
    pub fn default_catalog() -> Self {
        Self {
            styles: DEFAULT_STYLES.clone(),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
        let styles: Vec<PortraitStyle> = serde_json::from_str(json).map_err(CatalogError::Parse)?;
        Self::new(styles)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(CatalogError::Io)?;
        let catalog = Self::from_json_str(&json)?;
        log::info!(
            "Loaded {} portrait styles from {}",
            catalog.len(),
            path.display()
        );
        Ok(catalog)
    }

    pub fn get(&self, id: &str) -> Option<&PortraitStyle> {
        self.styles.iter().find(|style| style.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PortraitStyle> {
        self.styles.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.styles.iter().map(|style| style.id.as_str())
    }

    pub fn len(&self) -> usize {
        self.styles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }

    pub fn styles(&self) -> &[PortraitStyle] {
        &self.styles
    }
}

impl Default for StyleCatalog {
    fn default() -> Self {
        Self::default_catalog()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog_has_six_unique_styles() {
        let catalog = StyleCatalog::default_catalog();
        assert_eq!(catalog.len(), 6);
        let ids: HashSet<&str> = catalog.ids().collect();
        assert_eq!(ids.len(), 6);
        assert!(catalog.iter().all(|s| !s.prompt.is_empty()));
    }

    #[test]
    fn test_catalog_rejects_empty_and_blank_ids() {
        assert!(matches!(StyleCatalog::new(vec![]), Err(CatalogError::Empty)));
        let blank = vec![PortraitStyle::new("  ", "t", "d", "p")];
        assert!(matches!(StyleCatalog::new(blank), Err(CatalogError::BlankId)));
    }

    #[test]
    fn test_catalog_rejects_duplicate_ids() {
        let styles = vec![
            PortraitStyle::new("noir", "Noir", "", "p1"),
            PortraitStyle::new("pop", "Pop", "", "p2"),
            PortraitStyle::new("noir", "Noir 2", "", "p3"),
        ];
        match StyleCatalog::new(styles) {
            Err(CatalogError::DuplicateId(id)) => assert_eq!(id, "noir"),
            other => panic!("expected duplicate id error, got {:?}", other),
        }
    }

    #[test]
    fn test_catalog_from_json_keeps_order() {
        let json = r#"[
            {"id": "b", "title": "B", "description": "second", "prompt": "pb"},
            {"id": "a", "title": "A", "description": "first", "prompt": "pa"}
        ]"#;
        let catalog = StyleCatalog::from_json_str(json).unwrap();
        assert_eq!(catalog.ids().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(catalog.get("a").unwrap().prompt, "pa");
        assert!(catalog.get("c").is_none());
    }

    #[test]
    fn test_catalog_from_malformed_json() {
        let err = StyleCatalog::from_json_str("{\"id\": 1}").unwrap_err();
        assert!(matches!(err, CatalogError::Parse(_)));
    }
}
