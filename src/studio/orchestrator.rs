//! Per-style generation state machine and the generate-all coordinator.
//!
//! A [`GenerationOrchestrator`] owns one [`GenerationResult`] per catalog style and moves each
//! through its lifecycle independently:
//!
//! ```text
//!            trigger / retry              settle
//!   Idle ───────────────────▶ Loading ─────────────▶ Success | Error
//!                               ▲                        │
//!                               └──────── retry ─────────┘
//!
//!   any state ──── on_upload ────▶ Idle
//! ```
//!
//! # Concurrency
//!
//! [`generate_all`](GenerationOrchestrator::generate_all) drives one generation per style
//! concurrently and returns once every one of them has settled; individual failures are
//! recorded on their own style and never abort the others. Each settlement touches only its
//! own style's entry, and the state lock is never held across an `.await`.
//!
//! Every upload bumps an epoch counter. A settlement that belongs to an older epoch is
//! discarded instead of overwriting the freshly reset result.
//!
//! # Example
//!
//! ```rust,no_run
//! use portrait_studio::clients::gemini::GeminiImageClient;
//! use portrait_studio::orchestrator::GenerationOrchestrator;
//! use portrait_studio::style_catalog::StyleCatalog;
//! use portrait_studio::upload::load_image_file;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Arc::new(GeminiImageClient::new(&std::env::var("GEMINI_API_KEY")?));
//!     let studio = GenerationOrchestrator::new(StyleCatalog::default_catalog(), client);
//!
//!     studio.on_upload(load_image_file("selfie.jpg")?).await?;
//!     if let Some(report) = studio.generate_all().await {
//!         println!("{} portraits ready, {} failed", report.succeeded, report.failed);
//!     }
//!     for result in studio.results() {
//!         println!("{}: {}", result.style_id, result.status);
//!     }
//!     Ok(())
//! }
//! ```

use crate::studio::download::{self, DownloadError};
use crate::studio::event::{EventHandler, StudioEvent};
use crate::studio::image_generation::ImageGenerationClient;
use crate::studio::style_catalog::StyleCatalog;
use crate::studio::upload::{validate_mime_type, UploadError, UploadedImage};
use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

/// Lifecycle state of one style's generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GenerationStatus {
    Idle,
    Loading,
    Success,
    Error,
}

impl fmt::Display for GenerationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            GenerationStatus::Idle => "Idle",
            GenerationStatus::Loading => "Loading",
            GenerationStatus::Success => "Success",
            GenerationStatus::Error => "Error",
        };
        f.write_str(label)
    }
}

/// Snapshot of one style's generation.
///
/// `image_url` is present only for [`GenerationStatus::Success`] and `error` only for
/// [`GenerationStatus::Error`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResult {
    pub style_id: String,
    pub status: GenerationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Internal per-style state; the payloads make the image/error exclusivity structural.
#[derive(Debug, Clone)]
enum StyleState {
    Idle,
    Loading,
    Success(String),
    Error(String),
}

impl StyleState {
    fn to_result(&self, style_id: &str) -> GenerationResult {
        let (status, image_url, error) = match self {
            StyleState::Idle => (GenerationStatus::Idle, None, None),
            StyleState::Loading => (GenerationStatus::Loading, None, None),
            StyleState::Success(url) => (GenerationStatus::Success, Some(url.clone()), None),
            StyleState::Error(msg) => (GenerationStatus::Error, None, Some(msg.clone())),
        };
        GenerationResult {
            style_id: style_id.to_string(),
            status,
            image_url,
            error,
        }
    }
}

/// Identity of the current upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSession {
    /// Random identifier, handy for correlating log lines and events.
    pub id: String,
    /// Increases by one on every accepted upload.
    pub epoch: u64,
    pub mime_type: String,
    pub uploaded_at: DateTime<Utc>,
}

/// How a single [`trigger_generation`](GenerationOrchestrator::trigger_generation) ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// No upload yet or unknown style; nothing changed and no request was made.
    Skipped,
    Succeeded,
    Failed,
    /// The photo was replaced while the request was in flight; its result was dropped.
    Discarded,
}

/// Tally of a finished generate-all run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerateAllReport {
    pub succeeded: usize,
    pub failed: usize,
    pub discarded: usize,
}

impl GenerateAllReport {
    pub fn settled(&self) -> usize {
        self.succeeded + self.failed + self.discarded
    }
}

struct SessionState {
    upload: Option<Arc<UploadedImage>>,
    session: Option<UploadSession>,
    results: HashMap<String, StyleState>,
}

/// Clears the processing flag when a generate-all run ends, even if its future is dropped.
struct ProcessingGuard<'a>(&'a AtomicBool);

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Owns the uploaded photo and the per-style results for one studio session.
pub struct GenerationOrchestrator {
    catalog: StyleCatalog,
    client: Arc<dyn ImageGenerationClient>,
    state: Mutex<SessionState>,
    processing: AtomicBool,
    event_handler: Option<Arc<dyn EventHandler>>,
}

impl GenerationOrchestrator {
    /// Create an orchestrator with every style Idle and no upload.
    pub fn new(catalog: StyleCatalog, client: Arc<dyn ImageGenerationClient>) -> Self {
        let results = catalog
            .ids()
            .map(|id| (id.to_string(), StyleState::Idle))
            .collect();
        Self {
            catalog,
            client,
            state: Mutex::new(SessionState {
                upload: None,
                session: None,
                results,
            }),
            processing: AtomicBool::new(false),
            event_handler: None,
        }
    }

    /// Attach an [`EventHandler`] that is notified after every state change (builder pattern).
    pub fn with_event_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.event_handler = Some(handler);
        self
    }

    async fn emit(&self, event: StudioEvent) {
        if let Some(handler) = &self.event_handler {
            handler.on_studio_event(&event).await;
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn catalog(&self) -> &StyleCatalog {
        &self.catalog
    }

    pub fn model_name(&self) -> &str {
        self.client.model_name()
    }

    /// `true` while a generate-all run is in flight.
    pub fn is_processing(&self) -> bool {
        self.processing.load(Ordering::SeqCst)
    }

    pub fn session(&self) -> Option<UploadSession> {
        self.lock_state().session.clone()
    }

    pub fn has_upload(&self) -> bool {
        self.lock_state().upload.is_some()
    }

    /// All results, in catalog order.
    pub fn results(&self) -> Vec<GenerationResult> {
        let state = self.lock_state();
        self.catalog
            .ids()
            .map(|id| {
                state
                    .results
                    .get(id)
                    .unwrap_or(&StyleState::Idle)
                    .to_result(id)
            })
            .collect()
    }

    pub fn result(&self, style_id: &str) -> Option<GenerationResult> {
        self.lock_state()
            .results
            .get(style_id)
            .map(|state| state.to_result(style_id))
    }

    pub fn status(&self, style_id: &str) -> Option<GenerationStatus> {
        self.result(style_id).map(|result| result.status)
    }

    /// Replace the photo and reset every style to Idle.
    ///
    /// Requests already in flight keep running; whatever they return is discarded because
    /// it belongs to the previous epoch. A non-image MIME type is rejected with no state change.
    pub async fn on_upload(&self, image: UploadedImage) -> Result<UploadSession, UploadError> {
        validate_mime_type(&image.mime_type)?;

        let session = {
            let mut state = self.lock_state();
            let epoch = state.session.as_ref().map_or(0, |s| s.epoch) + 1;
            let session = UploadSession {
                id: uuid::Uuid::new_v4().to_string(),
                epoch,
                mime_type: image.mime_type.clone(),
                uploaded_at: Utc::now(),
            };
            state.upload = Some(Arc::new(image));
            state.session = Some(session.clone());
            for result in state.results.values_mut() {
                *result = StyleState::Idle;
            }
            session
        };

        log::info!(
            "Upload accepted (session {}, epoch {}, {}); {} styles reset",
            session.id,
            session.epoch,
            session.mime_type,
            self.catalog.len()
        );
        self.emit(StudioEvent::UploadAccepted {
            session_id: session.id.clone(),
            epoch: session.epoch,
            mime_type: session.mime_type.clone(),
            style_count: self.catalog.len(),
        })
        .await;

        Ok(session)
    }

    /// Generate one style from the current photo.
    ///
    /// The style is Loading before the request is sent and moves to Success or Error once it
    /// settles. Without an upload, or for an unknown style, this does nothing and returns
    /// [`TriggerOutcome::Skipped`]. Calling it again for a style that is already Loading
    /// starts a second request; whichever settles last wins.
    pub async fn trigger_generation(&self, style_id: &str) -> TriggerOutcome {
        let Some(style) = self.catalog.get(style_id) else {
            log::debug!("trigger_generation: unknown style '{}'", style_id);
            return TriggerOutcome::Skipped;
        };

        let (image, session_id, epoch) = {
            let mut state = self.lock_state();
            let (Some(image), Some(session)) = (state.upload.clone(), state.session.clone()) else {
                log::debug!("trigger_generation: no upload yet, ignoring '{}'", style_id);
                return TriggerOutcome::Skipped;
            };
            state.results.insert(style.id.clone(), StyleState::Loading);
            (image, session.id, session.epoch)
        };

        log::info!("Generating '{}' with {}", style.id, self.client.model_name());
        self.emit(StudioEvent::GenerationStarted {
            session_id: session_id.clone(),
            epoch,
            style_id: style.id.clone(),
        })
        .await;

        let started = Instant::now();
        let outcome = self
            .client
            .generate(&image.data, &image.mime_type, &style.prompt)
            .await;
        let elapsed_ms = started.elapsed().as_millis();

        let current_epoch = {
            let mut state = self.lock_state();
            let current_epoch = state.session.as_ref().map_or(0, |s| s.epoch);
            if current_epoch == epoch {
                let next = match &outcome {
                    Ok(url) => StyleState::Success(url.clone()),
                    Err(err) => StyleState::Error(err.message().to_string()),
                };
                state.results.insert(style.id.clone(), next);
            }
            current_epoch
        };

        if current_epoch != epoch {
            log::info!(
                "Discarding '{}' result from epoch {} (current epoch {})",
                style.id,
                epoch,
                current_epoch
            );
            self.emit(StudioEvent::StaleResultDiscarded {
                session_id,
                epoch,
                current_epoch,
                style_id: style.id.clone(),
            })
            .await;
            return TriggerOutcome::Discarded;
        }

        match outcome {
            Ok(url) => {
                log::info!("'{}' succeeded in {} ms", style.id, elapsed_ms);
                self.emit(StudioEvent::GenerationSucceeded {
                    session_id,
                    epoch,
                    style_id: style.id.clone(),
                    image_url_length: url.len(),
                    elapsed_ms,
                })
                .await;
                TriggerOutcome::Succeeded
            }
            Err(err) => {
                log::warn!("'{}' failed after {} ms: {}", style.id, elapsed_ms, err);
                self.emit(StudioEvent::GenerationFailed {
                    session_id,
                    epoch,
                    style_id: style.id.clone(),
                    error: err.message().to_string(),
                    elapsed_ms,
                })
                .await;
                TriggerOutcome::Failed
            }
        }
    }

    /// Re-run a single style, typically one that ended in Error.
    pub async fn retry(&self, style_id: &str) -> TriggerOutcome {
        self.trigger_generation(style_id).await
    }

    /// Generate every catalog style concurrently and wait for all of them to settle.
    ///
    /// Returns `None` without doing anything when there is no upload or another run is
    /// already in flight. Otherwise the processing flag stays set until the last style
    /// settles, and the returned report never reflects a failure of the run itself.
    pub async fn generate_all(&self) -> Option<GenerateAllReport> {
        let session = match self.session() {
            Some(session) => session,
            None => {
                log::debug!("generate_all: no upload yet, ignoring");
                return None;
            }
        };

        if self
            .processing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            log::info!("generate_all: a run is already in flight, ignoring");
            return None;
        }
        let _processing = ProcessingGuard(&self.processing);

        log::info!(
            "Generating {} styles for session {}",
            self.catalog.len(),
            session.id
        );
        self.emit(StudioEvent::GenerateAllStarted {
            session_id: session.id.clone(),
            epoch: session.epoch,
            style_count: self.catalog.len(),
        })
        .await;

        let started = Instant::now();
        let outcomes = join_all(self.catalog.ids().map(|id| self.trigger_generation(id))).await;

        let mut report = GenerateAllReport::default();
        for outcome in outcomes {
            match outcome {
                TriggerOutcome::Succeeded => report.succeeded += 1,
                TriggerOutcome::Failed => report.failed += 1,
                TriggerOutcome::Discarded => report.discarded += 1,
                TriggerOutcome::Skipped => {}
            }
        }
        drop(_processing);

        let elapsed_ms = started.elapsed().as_millis();
        log::info!(
            "generate_all finished in {} ms: {} succeeded, {} failed, {} discarded",
            elapsed_ms,
            report.succeeded,
            report.failed,
            report.discarded
        );
        self.emit(StudioEvent::GenerateAllCompleted {
            session_id: session.id,
            epoch: session.epoch,
            succeeded: report.succeeded,
            failed: report.failed,
            discarded: report.discarded,
            elapsed_ms,
        })
        .await;

        Some(report)
    }

    /// Save a finished portrait as `portrait-{style_id}.png` inside `dir`.
    pub fn save_portrait(
        &self,
        style_id: &str,
        dir: impl AsRef<Path>,
    ) -> Result<PathBuf, DownloadError> {
        let result = self
            .result(style_id)
            .ok_or_else(|| DownloadError::UnknownStyle(style_id.to_string()))?;
        download::save_portrait(&result, dir)
    }
}
