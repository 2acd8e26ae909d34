use serde::{Deserialize, Serialize};

/// Bounding box for a detected face, with optional facial landmarks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub confidence: f32,
    /// Five-point facial landmarks: [left_eye, right_eye, nose, left_mouth, right_mouth].
    pub landmarks: Option<[(f32, f32); 5]>,
}

/// Identity signature of one detected face (512-dimensional for ArcFace).
///
/// Produced once by the descriptor network and only ever compared by distance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Descriptor {
    pub values: Vec<f32>,
    /// Model version that produced this descriptor (e.g., "w600k_r50").
    pub model_version: Option<String>,
}

impl Descriptor {
    pub fn new(values: Vec<f32>) -> Self {
        Self {
            values,
            model_version: None,
        }
    }

    /// Euclidean distance between two descriptors. Smaller = more similar.
    ///
    /// Descriptors of different lengths are not comparable and yield NaN,
    /// which the match policies skip.
    pub fn euclidean_distance(&self, other: &Descriptor) -> f32 {
        if self.values.len() != other.values.len() {
            tracing::warn!(
                left = self.values.len(),
                right = other.values.len(),
                "descriptor length mismatch"
            );
            return f32::NAN;
        }
        if let (Some(a), Some(b)) = (&self.model_version, &other.model_version) {
            if a != b {
                tracing::warn!(left = %a, right = %b, "comparing descriptors of different models");
            }
        }
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f32>()
            .sqrt()
    }
}

/// How one gallery image scored against the anchor descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImageScore {
    /// Closest distance reported for any face in the image.
    pub distance: f32,
    /// False when the matcher labeled every face in the image "unknown".
    pub accepted: bool,
}

/// A gallery image that made it into the matched set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub image: String,
    pub distance: f32,
    /// Added by the best-match fallback rather than by passing the threshold.
    pub fallback: bool,
}

/// Outcome of one comparison run, in gallery order (a fallback entry comes last).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchedSet {
    pub matches: Vec<MatchResult>,
}

impl MatchedSet {
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    /// Image references of the matched gallery entries.
    pub fn images(&self) -> Vec<&str> {
        self.matches.iter().map(|m| m.image.as_str()).collect()
    }
}
