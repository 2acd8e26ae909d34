//! facematch-engine: runs main-photo vs. gallery comparisons.
//!
//! Owns the models on a dedicated thread behind a readiness gate, scores
//! gallery photos concurrently and renders the results.

pub mod compare;
pub mod config;
pub mod engine;
pub mod gate;
pub mod view;

#[cfg(test)]
mod test_support;

pub use compare::{Comparator, MatchSettings, RunOutcome};
pub use config::Config;
pub use engine::{spawn_engine, spawn_onnx_engine, EngineError, EngineHandle};
pub use gate::{ModelGate, ModelState};
pub use view::GalleryView;
