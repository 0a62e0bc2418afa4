//! Core orchestration logic.
//!
//! - PipelineOrchestrator: validate, cipher round-trip, render, report

pub mod orchestrator;

// Re-export commonly used types
pub use orchestrator::{CipherStage, PipelineError, PipelineOrchestrator, PipelineState};
