//! facematch-core: find the gallery photos that show the face in a main photo.
//!
//! Uses SCRFD for face detection and ArcFace for face descriptors, both
//! running via ONNX Runtime, plus the match policies and the evaluator that
//! turns per-image scores into a matched set.

pub mod alignment;
pub mod analyzer;
pub mod detector;
pub mod evaluator;
pub mod matcher;
pub mod recognizer;
pub mod types;

pub use analyzer::{
    default_model_dir, AnalyzerError, Capability, CapabilityReport, FaceAnalyzer, OnnxAnalyzer,
};
pub use evaluator::{assemble, FALLBACK_CEILING};
pub use matcher::{GalleryScorer, LabeledMatcher, MatchPolicy};
pub use types::{BoundingBox, Descriptor, ImageScore, MatchResult, MatchedSet};
