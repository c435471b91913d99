//! Generation event system.
//!
//! The [`GenerationOrchestrator`](crate::orchestrator::GenerationOrchestrator) reports every
//! state change through a single [`EventHandler`] so a presentation layer can re-render the
//! affected style card without polling:
//!
//! - **Upload lifecycle**: a new photo was accepted and all styles were reset
//! - **Per-style lifecycle**: a generation started, succeeded, failed, or settled too late
//! - **Generate-all lifecycle**: the aggregate run started and finished
//!
//! The handler method has a default no-op implementation. The handler is shared as
//! `Arc<dyn EventHandler>` across every concurrent generation.
//!
//! # Event Flow (generate-all with two styles)
//!
//! ```text
//! UploadAccepted { epoch: 1 }
//! GenerateAllStarted { style_count: 2 }
//!   ├─ GenerationStarted { style_id: "a" }
//!   ├─ GenerationStarted { style_id: "b" }
//!   ├─ GenerationFailed { style_id: "b", error: "quota exceeded" }
//!   └─ GenerationSucceeded { style_id: "a" }
//! GenerateAllCompleted { succeeded: 1, failed: 1, discarded: 0 }
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use portrait_studio::event::{EventHandler, StudioEvent};
//! use async_trait::async_trait;
//!
//! struct CardRenderer;
//!
//! #[async_trait]
//! impl EventHandler for CardRenderer {
//!     async fn on_studio_event(&self, event: &StudioEvent) {
//!         match event {
//!             StudioEvent::GenerationSucceeded { style_id, .. } => println!("{} ready", style_id),
//!             StudioEvent::GenerationFailed { style_id, error, .. } => {
//!                 println!("{} failed: {}", style_id, error)
//!             }
//!             _ => {}
//!         }
//!     }
//! }
//! ```

use async_trait::async_trait;
use std::sync::Mutex;

/// Events emitted by a [`GenerationOrchestrator`](crate::orchestrator::GenerationOrchestrator).
///
/// Every per-upload variant carries the `session_id` and `epoch` of the upload it belongs
/// to, so handlers can ignore anything that predates the photo they are showing.
#[derive(Debug, Clone, PartialEq)]
pub enum StudioEvent {
    /// A new photo replaced the previous one; every style is Idle again.
    UploadAccepted {
        session_id: String,
        epoch: u64,
        mime_type: String,
        style_count: usize,
    },

    /// A style entered Loading and its request is about to be sent.
    GenerationStarted {
        session_id: String,
        epoch: u64,
        style_id: String,
    },

    /// A style settled with an image.
    GenerationSucceeded {
        session_id: String,
        epoch: u64,
        style_id: String,
        /// Length of the returned data URI, useful for logging.
        image_url_length: usize,
        elapsed_ms: u128,
    },

    /// A style settled with an error. `error` is the normalized message stored on the result.
    GenerationFailed {
        session_id: String,
        epoch: u64,
        style_id: String,
        error: String,
        elapsed_ms: u128,
    },

    /// A settlement arrived for an upload that has since been replaced and was dropped.
    StaleResultDiscarded {
        session_id: String,
        epoch: u64,
        current_epoch: u64,
        style_id: String,
    },

    /// A generate-all run began.
    GenerateAllStarted {
        session_id: String,
        epoch: u64,
        style_count: usize,
    },

    /// Every generation of a generate-all run has settled; the processing flag is clear.
    GenerateAllCompleted {
        session_id: String,
        epoch: u64,
        succeeded: usize,
        failed: usize,
        discarded: usize,
        elapsed_ms: u128,
    },
}

impl StudioEvent {
    /// Style the event refers to, for per-style variants.
    pub fn style_id(&self) -> Option<&str> {
        match self {
            StudioEvent::GenerationStarted { style_id, .. }
            | StudioEvent::GenerationSucceeded { style_id, .. }
            | StudioEvent::GenerationFailed { style_id, .. }
            | StudioEvent::StaleResultDiscarded { style_id, .. } => Some(style_id),
            _ => None,
        }
    }
}

/// Receiver for [`StudioEvent`]s.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Called after the orchestrator has applied the state change the event describes.
    async fn on_studio_event(&self, _event: &StudioEvent) {}
}

/// Handler that keeps every event in memory, in arrival order.
///
/// Handy for tests and for front ends that replay state on reconnect.
#[derive(Default)]
pub struct RecordingEventHandler {
    events: Mutex<Vec<StudioEvent>>,
}

impl RecordingEventHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<StudioEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }
}

#[async_trait]
impl EventHandler for RecordingEventHandler {
    async fn on_studio_event(&self, event: &StudioEvent) {
        let mut events = self
            .events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        events.push(event.clone());
    }
}
