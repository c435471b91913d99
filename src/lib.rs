//! # Portrait Studio
//!
//! Portrait Studio turns one uploaded photo into a set of stylistically distinct AI portraits
//! (corporate headshot, film noir, renaissance oil, ...) by sending one image-generation
//! request per style to Google Gemini and tracking each request's status independently.
//!
//! The crate is layered leaf-first:
//!
//! * **Style catalog**: [`style_catalog::StyleCatalog`], a fixed ordered list of
//!   [`style_catalog::PortraitStyle`]s; six are compiled in, or load your own from JSON
//! * **Image generation**: the [`image_generation::ImageGenerationClient`] trait and its
//!   Gemini implementation [`clients::gemini::GeminiImageClient`], with failures normalized
//!   into [`image_generation::GenerationError`]
//! * **Orchestration**: [`GenerationOrchestrator`] keeps one
//!   [`orchestrator::GenerationResult`] per style (Idle, Loading, Success, Error), triggers
//!   single styles or every style at once, and supports per-style retry
//! * **Events**: implement [`event::EventHandler`] to re-render a style as soon as its
//!   status changes
//! * **Upload / download**: [`upload::UploadedImage`] validation and
//!   `portrait-{style}.png` export via [`download`]
//!
//! ## Getting Started
//!
//! ```rust,no_run
//! use portrait_studio::clients::gemini::GeminiImageClient;
//! use portrait_studio::upload::load_image_file;
//! use portrait_studio::{GenerationOrchestrator, StudioConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     portrait_studio::init_logger();
//!
//!     let config = StudioConfig::from_env()?;
//!     let client = Arc::new(GeminiImageClient::from_config(&config));
//!     let studio = GenerationOrchestrator::new(config.load_catalog()?, client);
//!
//!     studio.on_upload(load_image_file("selfie.png")?).await?;
//!     studio.generate_all().await;
//!
//!     for result in studio.results() {
//!         if result.error.is_some() {
//!             studio.retry(&result.style_id).await;
//!         }
//!     }
//!     for style in studio.catalog().iter() {
//!         if let Ok(path) = studio.save_portrait(&style.id, ".") {
//!             println!("{} -> {}", style.title, path.display());
//!         }
//!     }
//!     Ok(())
//! }
//! ```

use std::sync::Once;

static INIT_LOGGER: Once = Once::new();

/// Initialise the global [`env_logger`] subscriber exactly once.
///
/// Applications embedding Portrait Studio can opt in to `RUST_LOG` driven diagnostics
/// without choosing a logging backend upfront.
///
/// ```rust
/// portrait_studio::init_logger();
/// log::info!("Logger is ready");
/// ```
pub fn init_logger() {
    INIT_LOGGER.call_once(|| {
        env_logger::init();
    });
}

pub mod studio;

pub use studio::clients;
pub use studio::config;
pub use studio::config::{ConfigError, StudioConfig};
pub use studio::download;
pub use studio::event;
pub use studio::event::{EventHandler, StudioEvent};
pub use studio::http_client_pool;
pub use studio::image_generation;
pub use studio::image_generation::{GenerationError, ImageGenerationClient};
pub use studio::orchestrator;
pub use studio::orchestrator::{
    GenerateAllReport, GenerationOrchestrator, GenerationResult, GenerationStatus,
    TriggerOutcome, UploadSession,
};
pub use studio::style_catalog;
pub use studio::style_catalog::{PortraitStyle, StyleCatalog};
pub use studio::upload;
pub use studio::upload::{UploadError, UploadedImage};
