//! Comparison runs: main photo → anchor descriptor → concurrent gallery scoring.
//!
//! Every gallery image is scored in its own task (load, describe, score).
//! The matched set is assembled only after all tasks have been joined.
//! Each run takes a generation number; a run that finishes after a newer one
//! has started is reported as superseded and its result is dropped.

use crate::engine::EngineHandle;
use crate::gate::ModelState;
use facematch_core::{
    assemble, GalleryScorer, ImageScore, MatchPolicy, MatchedSet, FALLBACK_CEILING,
};
use facematch_io::ImageLoader;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinSet;

/// Policy knobs for a comparison run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchSettings {
    pub policy: MatchPolicy,
    /// Inclusion threshold (strict `<`).
    pub threshold: f32,
    /// Start value of the best-match tracker.
    pub fallback_ceiling: f32,
}

impl MatchSettings {
    pub fn for_policy(policy: MatchPolicy) -> Self {
        Self {
            policy,
            threshold: policy.default_threshold(),
            fallback_ceiling: FALLBACK_CEILING,
        }
    }
}

impl Default for MatchSettings {
    fn default() -> Self {
        Self::for_policy(MatchPolicy::default())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// Models were not ready; nothing was attempted.
    Skipped,
    Completed(MatchedSet),
    /// A newer run started before this one finished.
    Superseded,
}

/// Runs comparisons for one main-photo/gallery widget.
#[derive(Clone)]
pub struct Comparator {
    engine: EngineHandle,
    loader: ImageLoader,
    settings: MatchSettings,
    generation: Arc<AtomicU64>,
    latest: Arc<watch::Sender<MatchedSet>>,
}

impl Comparator {
    pub fn new(engine: EngineHandle, loader: ImageLoader, settings: MatchSettings) -> Self {
        let (latest, _) = watch::channel(MatchedSet::default());
        Self {
            engine,
            loader,
            settings,
            generation: Arc::new(AtomicU64::new(0)),
            latest: Arc::new(latest),
        }
    }

    pub fn settings(&self) -> &MatchSettings {
        &self.settings
    }

    /// Wait until the engine's models have finished loading.
    pub async fn wait_ready(&self) -> ModelState {
        self.engine.gate().wait().await
    }

    /// The most recent non-superseded matched set.
    pub fn subscribe(&self) -> watch::Receiver<MatchedSet> {
        self.latest.subscribe()
    }

    pub async fn compare(&self, main: &str, gallery: &[String]) -> RunOutcome {
        if !self.engine.gate().is_ready() {
            tracing::warn!(main, "models not ready; comparison skipped");
            return RunOutcome::Skipped;
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::info!(generation, main, gallery = gallery.len(), "comparison started");

        let set = self.run(main, gallery).await;

        let current = self.generation.load(Ordering::SeqCst);
        if current != generation {
            tracing::debug!(generation, current, "comparison superseded; result dropped");
            return RunOutcome::Superseded;
        }

        tracing::info!(generation, matched = set.len(), "comparison finished");
        self.latest.send_replace(set.clone());
        RunOutcome::Completed(set)
    }

    async fn run(&self, main: &str, gallery: &[String]) -> MatchedSet {
        let main_image = match self.loader.load(main).await {
            Ok(image) => image,
            Err(e) => {
                tracing::error!(main, error = %e, "main image failed to load");
                return MatchedSet::default();
            }
        };

        // The first face the detector reports anchors the whole run.
        let Some(anchor) = self.engine.describe(main_image).await.into_iter().next() else {
            tracing::warn!(main, "no face found in main image");
            return MatchedSet::default();
        };

        let scorer: Arc<dyn GalleryScorer> =
            Arc::from(self.settings.policy.scorer(anchor, self.settings.threshold));

        let mut tasks = JoinSet::new();
        for (slot, reference) in gallery.iter().enumerate() {
            let loader = self.loader.clone();
            let engine = self.engine.clone();
            let scorer = Arc::clone(&scorer);
            let reference = reference.clone();
            tasks.spawn(async move {
                let score = score_image(&loader, &engine, scorer.as_ref(), &reference).await;
                (slot, score)
            });
        }

        let mut scores: Vec<Option<ImageScore>> = vec![None; gallery.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((slot, score)) => scores[slot] = score,
                Err(e) => tracing::error!(error = %e, "gallery task failed"),
            }
        }

        let scored: Vec<(String, Option<ImageScore>)> =
            gallery.iter().cloned().zip(scores).collect();
        assemble(&scored, scorer.threshold(), self.settings.fallback_ceiling)
    }
}

async fn score_image(
    loader: &ImageLoader,
    engine: &EngineHandle,
    scorer: &dyn GalleryScorer,
    reference: &str,
) -> Option<ImageScore> {
    let image = match loader.load(reference).await {
        Ok(image) => image,
        Err(e) => {
            tracing::error!(image = reference, error = %e, "gallery image failed to load");
            return None;
        }
    };

    let descriptors = engine.describe(image).await;
    let score = scorer.score(&descriptors)?;
    tracing::info!(
        image = reference,
        faces = descriptors.len(),
        distance = score.distance,
        accepted = score.accepted,
        "best match for gallery image"
    );
    Some(score)
}
