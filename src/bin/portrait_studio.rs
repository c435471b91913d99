//! Terminal front end: upload one photo, generate every style, save the portraits.
//!
//! ```bash
//! GEMINI_API_KEY="your-key" RUST_LOG=info \
//! cargo run --bin portrait-studio -- selfie.jpg --out portraits --retries 1
//! ```
//!
//! Configuration beyond the API key is read from the `PORTRAIT_STUDIO_*` variables described
//! in `portrait_studio::config`.

use async_trait::async_trait;
use clap::Parser;
use portrait_studio::clients::gemini::GeminiImageClient;
use portrait_studio::event::{EventHandler, StudioEvent};
use portrait_studio::upload::load_image_file;
use portrait_studio::{GenerationOrchestrator, GenerationStatus, StudioConfig};
use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Parser)]
#[command(
    name = "portrait-studio",
    version,
    about = "Turn one photo into a set of AI studio portraits"
)]
struct CliArgs {
    /// Photo to transform (png, jpg, webp, ...).
    photo: PathBuf,
    /// Directory the portrait-<style>.png files are written to.
    #[arg(long = "out", default_value = ".")]
    out_dir: PathBuf,
    /// Extra rounds of retries for styles that failed.
    #[arg(long, default_value_t = 0)]
    retries: usize,
    /// Print a JSON status summary at the end.
    #[arg(long)]
    json: bool,
}

/// Prints one line per style as it settles.
struct ProgressPrinter;

#[async_trait]
impl EventHandler for ProgressPrinter {
    async fn on_studio_event(&self, event: &StudioEvent) {
        match event {
            StudioEvent::GenerationStarted { style_id, .. } => {
                println!("  … {:<12} creating", style_id);
            }
            StudioEvent::GenerationSucceeded {
                style_id,
                elapsed_ms,
                ..
            } => {
                println!("  ✓ {:<12} ready in {:.1}s", style_id, *elapsed_ms as f64 / 1000.0);
            }
            StudioEvent::GenerationFailed {
                style_id, error, ..
            } => {
                println!("  ✗ {:<12} {}", style_id, error);
            }
            _ => {}
        }
    }
}

/// Writes every successful portrait into `out_dir`; a style that fails to save is reported
/// and skipped. Returns how many files were written.
fn save_portraits(studio: &GenerationOrchestrator, out_dir: &Path) -> usize {
    let mut saved = 0;
    for result in studio.results() {
        if result.status != GenerationStatus::Success {
            continue;
        }
        match studio.save_portrait(&result.style_id, out_dir) {
            Ok(path) => {
                println!("Saved {}", path.display());
                saved += 1;
            }
            Err(err) => {
                log::error!("Could not save '{}': {}", result.style_id, err);
                eprintln!("  ✗ {:<12} not saved: {}", result.style_id, err);
            }
        }
    }
    saved
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    portrait_studio::init_logger();

    let args = CliArgs::parse();

    let config = StudioConfig::from_env()?;
    let catalog = config.load_catalog()?;
    let client = Arc::new(GeminiImageClient::from_config(&config));
    let studio = GenerationOrchestrator::new(catalog, client)
        .with_event_handler(Arc::new(ProgressPrinter));

    studio.on_upload(load_image_file(&args.photo)?).await?;

    println!(
        "Generating {} styles with {}...",
        studio.catalog().len(),
        studio.model_name()
    );
    studio.generate_all().await;

    for attempt in 1..=args.retries {
        let failed: Vec<String> = studio
            .results()
            .into_iter()
            .filter(|r| r.status == GenerationStatus::Error)
            .map(|r| r.style_id)
            .collect();
        if failed.is_empty() {
            break;
        }
        println!("Retry {} for {} style(s)...", attempt, failed.len());
        for style_id in failed {
            studio.retry(&style_id).await;
        }
    }

    std::fs::create_dir_all(&args.out_dir)?;
    let saved = save_portraits(&studio, &args.out_dir);

    if args.json {
        let summary: Vec<serde_json::Value> = studio
            .results()
            .into_iter()
            .map(|r| {
                serde_json::json!({
                    "styleId": r.style_id,
                    "status": r.status,
                    "error": r.error,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }

    println!("{} of {} portraits saved", saved, studio.catalog().len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use portrait_studio::image_generation::{GenerationError, ImageGenerationClient};
    use portrait_studio::{PortraitStyle, StyleCatalog, UploadedImage};

    /// Returns the prompt itself as the image payload.
    struct PromptAsImageClient;

    #[async_trait]
    impl ImageGenerationClient for PromptAsImageClient {
        async fn generate(
            &self,
            _image_data: &str,
            _mime_type: &str,
            prompt: &str,
        ) -> Result<String, GenerationError> {
            Ok(format!("data:image/png;base64,{}", prompt))
        }

        fn model_name(&self) -> &str {
            "prompt-as-image"
        }
    }

    #[tokio::test]
    async fn test_save_portraits_skips_undecodable_style() {
        let catalog = StyleCatalog::new(vec![
            PortraitStyle::new("broken", "Broken", "", "not base64!"),
            PortraitStyle::new("fine", "Fine", "", "iVBORw0KGgo="),
        ])
        .unwrap();
        let studio = GenerationOrchestrator::new(catalog, Arc::new(PromptAsImageClient));
        studio
            .on_upload(UploadedImage::new("QUJD", "image/png").unwrap())
            .await
            .unwrap();
        studio.generate_all().await.unwrap();

        let dir = tempfile::tempdir().unwrap();
        assert_eq!(save_portraits(&studio, dir.path()), 1);
        assert!(dir.path().join("portrait-fine.png").exists());
        assert!(!dir.path().join("portrait-broken.png").exists());
    }

    #[test]
    fn test_parse_args() {
        let parsed = CliArgs::try_parse_from([
            "portrait-studio", "me.png", "--out", "dir", "--retries", "2", "--json",
        ])
        .unwrap();
        assert_eq!(parsed.photo, PathBuf::from("me.png"));
        assert_eq!(parsed.out_dir, PathBuf::from("dir"));
        assert_eq!(parsed.retries, 2);
        assert!(parsed.json);
    }

    #[test]
    fn test_parse_args_defaults_and_errors() {
        let parsed = CliArgs::try_parse_from(["portrait-studio", "me.png"]).unwrap();
        assert_eq!(parsed.out_dir, PathBuf::from("."));
        assert_eq!(parsed.retries, 0);
        assert!(!parsed.json);

        assert!(CliArgs::try_parse_from(["portrait-studio", "--json"]).is_err());
        assert!(CliArgs::try_parse_from(["portrait-studio", "a.png", "b.png"]).is_err());
        assert!(CliArgs::try_parse_from(["portrait-studio", "a.png", "--retries", "many"]).is_err());
    }
}
