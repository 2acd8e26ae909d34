//! Match policies: how a gallery image's faces are scored against the anchor.
//!
//! Two policies exist and are selected, never mixed:
//! - [`PairwiseScorer`]: minimum Euclidean distance, threshold 0.45.
//! - [`MatcherScorer`]: a labeled matcher object with an acceptance
//!   threshold of 0.5; faces labeled "unknown" are not accepted.

use crate::types::{Descriptor, ImageScore};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const PAIRWISE_THRESHOLD: f32 = 0.45;
pub const MATCHER_THRESHOLD: f32 = 0.5;

const UNKNOWN_LABEL: &str = "unknown";
const ANCHOR_LABEL: &str = "main";

/// Strategy for scoring one gallery image's descriptors against the anchor.
pub trait GalleryScorer: Send + Sync {
    /// Inclusion threshold. An image is included only if its distance is strictly below it.
    fn threshold(&self) -> f32;

    /// Score the faces found in one gallery image. `None` if there are none.
    fn score(&self, candidates: &[Descriptor]) -> Option<ImageScore>;
}

/// Which scorer a comparison run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchPolicy {
    #[default]
    Pairwise,
    Matcher,
}

impl MatchPolicy {
    pub fn default_threshold(self) -> f32 {
        match self {
            MatchPolicy::Pairwise => PAIRWISE_THRESHOLD,
            MatchPolicy::Matcher => MATCHER_THRESHOLD,
        }
    }

    /// Build the scorer for this policy around the anchor descriptor.
    pub fn scorer(self, anchor: Descriptor, threshold: f32) -> Box<dyn GalleryScorer> {
        match self {
            MatchPolicy::Pairwise => Box::new(PairwiseScorer::new(anchor, threshold)),
            MatchPolicy::Matcher => Box::new(MatcherScorer::new(anchor, threshold)),
        }
    }
}

impl fmt::Display for MatchPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchPolicy::Pairwise => f.write_str("pairwise"),
            MatchPolicy::Matcher => f.write_str("matcher"),
        }
    }
}

impl FromStr for MatchPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pairwise" => Ok(MatchPolicy::Pairwise),
            "matcher" => Ok(MatchPolicy::Matcher),
            other => Err(format!("unknown match policy '{other}' (expected pairwise or matcher)")),
        }
    }
}

/// Closest-face policy: distance of the nearest candidate to the anchor.
pub struct PairwiseScorer {
    anchor: Descriptor,
    threshold: f32,
}

impl PairwiseScorer {
    pub fn new(anchor: Descriptor, threshold: f32) -> Self {
        Self { anchor, threshold }
    }
}

impl GalleryScorer for PairwiseScorer {
    fn threshold(&self) -> f32 {
        self.threshold
    }

    fn score(&self, candidates: &[Descriptor]) -> Option<ImageScore> {
        candidates
            .iter()
            .map(|d| self.anchor.euclidean_distance(d))
            .filter(|dist| !dist.is_nan())
            .reduce(f32::min)
            .map(|distance| ImageScore {
                distance,
                accepted: true,
            })
    }
}

/// Label attached to a matcher result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Label {
    Known(String),
    Unknown,
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Known(name) => f.write_str(name),
            Label::Unknown => f.write_str(UNKNOWN_LABEL),
        }
    }
}

/// Best label for one query descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct BestMatch {
    pub label: Label,
    pub distance: f32,
}

/// A set of reference descriptors sharing one label.
#[derive(Debug, Clone)]
pub struct LabeledDescriptors {
    pub label: String,
    pub descriptors: Vec<Descriptor>,
}

/// Matcher object keyed on labeled reference descriptors.
///
/// The distance to a label is the mean distance to all of its descriptors.
/// The closest label wins; if that distance is not below the threshold the
/// result is labeled [`Label::Unknown`].
#[derive(Debug, Clone)]
pub struct LabeledMatcher {
    references: Vec<LabeledDescriptors>,
    threshold: f32,
}

impl LabeledMatcher {
    pub fn new(references: Vec<LabeledDescriptors>, threshold: f32) -> Self {
        Self {
            references,
            threshold,
        }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn find_best_match(&self, query: &Descriptor) -> BestMatch {
        let mut best: Option<(&str, f32)> = None;

        for reference in &self.references {
            if reference.descriptors.is_empty() {
                continue;
            }
            let mean = reference
                .descriptors
                .iter()
                .map(|d| d.euclidean_distance(query))
                .sum::<f32>()
                / reference.descriptors.len() as f32;
            if mean.is_nan() {
                continue;
            }

            if best.map_or(true, |(_, d)| mean < d) {
                best = Some((reference.label.as_str(), mean));
            }
        }

        match best {
            Some((label, distance)) if distance < self.threshold => BestMatch {
                label: Label::Known(label.to_string()),
                distance,
            },
            Some((_, distance)) => BestMatch {
                label: Label::Unknown,
                distance,
            },
            None => BestMatch {
                label: Label::Unknown,
                distance: f32::INFINITY,
            },
        }
    }
}

/// Matcher-object policy keyed on the single anchor descriptor.
pub struct MatcherScorer {
    matcher: LabeledMatcher,
}

impl MatcherScorer {
    pub fn new(anchor: Descriptor, threshold: f32) -> Self {
        let references = vec![LabeledDescriptors {
            label: ANCHOR_LABEL.to_string(),
            descriptors: vec![anchor],
        }];
        Self {
            matcher: LabeledMatcher::new(references, threshold),
        }
    }
}

impl GalleryScorer for MatcherScorer {
    fn threshold(&self) -> f32 {
        self.matcher.threshold()
    }

    fn score(&self, candidates: &[Descriptor]) -> Option<ImageScore> {
        let mut best_known: Option<f32> = None;
        let mut best_unknown: Option<f32> = None;

        for candidate in candidates {
            let result = self.matcher.find_best_match(candidate);
            if result.distance.is_nan() {
                continue;
            }
            let slot = match result.label {
                Label::Known(_) => &mut best_known,
                Label::Unknown => &mut best_unknown,
            };
            if slot.map_or(true, |d| result.distance < d) {
                *slot = Some(result.distance);
            }
        }

        match (best_known, best_unknown) {
            (Some(distance), _) => Some(ImageScore {
                distance,
                accepted: true,
            }),
            (None, Some(distance)) => Some(ImageScore {
                distance,
                accepted: false,
            }),
            (None, None) => None,
        }
    }
}
