//! The face-analysis capability the rest of the workspace depends on.
//!
//! [`FaceAnalyzer`] turns a decoded image into one descriptor per detected
//! face. [`OnnxAnalyzer`] implements it with three capabilities: the SCRFD
//! detector, its landmark head (consumed by alignment) and the ArcFace
//! descriptor network.

use crate::detector::{DetectorError, FaceDetector};
use crate::recognizer::{FaceRecognizer, RecognizerError};
use crate::types::Descriptor;
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DETECTOR_MODEL_FILE: &str = "det_10g.onnx";
pub const DESCRIPTOR_MODEL_FILE: &str = "w600k_r50.onnx";

#[derive(Error, Debug)]
pub enum AnalyzerError {
    #[error("detector: {0}")]
    Detector(#[from] DetectorError),
    #[error("recognizer: {0}")]
    Recognizer(#[from] RecognizerError),
    #[error("capability not ready: {0}")]
    NotReady(Capability),
}

/// The three model capabilities a comparison needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Detector,
    Landmarks,
    Descriptor,
}

impl Capability {
    pub const ALL: [Capability; 3] = [
        Capability::Detector,
        Capability::Landmarks,
        Capability::Descriptor,
    ];
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Capability::Detector => "face detector",
            Capability::Landmarks => "landmark predictor",
            Capability::Descriptor => "descriptor extractor",
        };
        f.write_str(name)
    }
}

/// Readiness of each capability after loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CapabilityReport {
    pub detector: bool,
    pub landmarks: bool,
    pub descriptor: bool,
}

impl CapabilityReport {
    pub fn all_ready() -> Self {
        Self {
            detector: true,
            landmarks: true,
            descriptor: true,
        }
    }

    pub fn is_ready(&self, capability: Capability) -> bool {
        match capability {
            Capability::Detector => self.detector,
            Capability::Landmarks => self.landmarks,
            Capability::Descriptor => self.descriptor,
        }
    }

    /// First capability that failed to come up, if any.
    pub fn missing(&self) -> Option<Capability> {
        Capability::ALL.into_iter().find(|c| !self.is_ready(*c))
    }
}

/// Detect, align and describe every face in an image.
pub trait FaceAnalyzer {
    /// Descriptors in detector order (highest confidence first for SCRFD).
    fn describe(&mut self, image: &RgbImage) -> Result<Vec<Descriptor>, AnalyzerError>;

    fn capabilities(&self) -> CapabilityReport;
}

/// Default model directory: `$XDG_DATA_HOME/facematch/models`.
pub fn default_model_dir() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local/share")
        })
        .join("facematch/models")
}

/// ONNX-backed analyzer: SCRFD detection + ArcFace descriptors.
pub struct OnnxAnalyzer {
    detector: FaceDetector,
    recognizer: FaceRecognizer,
}

impl OnnxAnalyzer {
    /// Load both models from `model_dir`. Fails if either file is missing or
    /// the detector does not export landmarks.
    pub fn load(model_dir: &Path) -> Result<Self, AnalyzerError> {
        let detector = FaceDetector::load(&model_dir.join(DETECTOR_MODEL_FILE))?;
        if !detector.has_landmarks() {
            return Err(AnalyzerError::NotReady(Capability::Landmarks));
        }
        let recognizer = FaceRecognizer::load(&model_dir.join(DESCRIPTOR_MODEL_FILE))?;
        Ok(Self { detector, recognizer })
    }
}

impl FaceAnalyzer for OnnxAnalyzer {
    fn describe(&mut self, image: &RgbImage) -> Result<Vec<Descriptor>, AnalyzerError> {
        let faces = self.detector.detect(image)?;
        tracing::debug!(faces = faces.len(), "detected faces");

        let mut descriptors = Vec::with_capacity(faces.len());
        for face in &faces {
            if face.landmarks.is_none() {
                tracing::warn!(confidence = face.confidence, "face without landmarks skipped");
                continue;
            }
            descriptors.push(self.recognizer.extract(image, face)?);
        }
        Ok(descriptors)
    }

    fn capabilities(&self) -> CapabilityReport {
        CapabilityReport {
            detector: true,
            landmarks: self.detector.has_landmarks(),
            descriptor: true,
        }
    }
}
