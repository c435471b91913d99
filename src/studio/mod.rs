// src/studio/mod.rs

pub mod clients;
pub mod config;
pub mod download;
pub mod event;
pub mod http_client_pool;
pub mod image_generation;
pub mod orchestrator;
pub mod style_catalog;
pub mod upload;

// Re-export the orchestrator so it reads as studio::GenerationOrchestrator.
pub use orchestrator::GenerationOrchestrator;
