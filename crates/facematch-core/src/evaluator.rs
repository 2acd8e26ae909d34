//! Match evaluation: threshold filtering plus the best-match fallback.

use crate::types::{ImageScore, MatchResult, MatchedSet};

/// Starting value of the best-match tracker. Distances at or above it never
/// become a fallback candidate.
///
/// Descriptors are unit length, so 2.0 is the largest distance two faces can
/// be apart.
pub const FALLBACK_CEILING: f32 = 2.0;

/// Build the matched set from per-image scores given in gallery order.
///
/// An image is included when its score is accepted and its distance is
/// strictly below `threshold`. Independently, the lowest distance below
/// `fallback_ceiling` is tracked (earliest image wins ties). If nothing passed
/// the threshold, that tracked image is appended as a fallback match.
pub fn assemble(
    scored: &[(String, Option<ImageScore>)],
    threshold: f32,
    fallback_ceiling: f32,
) -> MatchedSet {
    let mut matches = Vec::new();
    let mut best: Option<(&str, f32)> = None;
    let mut best_distance = fallback_ceiling;

    for (image, score) in scored {
        let Some(score) = score else {
            continue;
        };

        if score.distance < best_distance {
            best_distance = score.distance;
            best = Some((image.as_str(), score.distance));
        }

        if score.accepted && score.distance < threshold {
            matches.push(MatchResult {
                image: image.clone(),
                distance: score.distance,
                fallback: false,
            });
        }
    }

    if matches.is_empty() {
        if let Some((image, distance)) = best {
            tracing::debug!(image, distance, "no image passed the threshold; using best match");
            matches.push(MatchResult {
                image: image.to_string(),
                distance,
                fallback: true,
            });
        }
    }

    MatchedSet { matches }
}
