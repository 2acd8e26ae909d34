use crate::gate::{ModelGate, ModelState};
use facematch_core::{AnalyzerError, Descriptor, FaceAnalyzer, OnnxAnalyzer};
use image::RgbImage;
use std::path::PathBuf;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("analyzer error: {0}")]
    Analyzer(#[from] AnalyzerError),
    #[error("models are not ready")]
    NotReady,
    #[error("failed to spawn engine thread: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("engine thread exited")]
    ChannelClosed,
}

/// Messages sent from async callers to the engine thread.
enum EngineRequest {
    Describe {
        image: RgbImage,
        reply: oneshot::Sender<Result<Vec<Descriptor>, AnalyzerError>>,
    },
}

/// Clone-safe handle to the engine thread.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<EngineRequest>,
    gate: ModelGate,
}

impl EngineHandle {
    pub fn gate(&self) -> &ModelGate {
        &self.gate
    }

    /// Request descriptors for every face in `image`, surfacing failures.
    pub async fn try_describe(&self, image: RgbImage) -> Result<Vec<Descriptor>, EngineError> {
        if !self.gate.is_ready() {
            return Err(EngineError::NotReady);
        }

        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EngineRequest::Describe {
                image,
                reply: reply_tx,
            })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        Ok(reply_rx.await.map_err(|_| EngineError::ChannelClosed)??)
    }

    /// Request descriptors for every face in `image`.
    ///
    /// Never fails: when the models are not ready, or extraction fails, the
    /// problem is logged and the image counts as having no faces.
    pub async fn describe(&self, image: RgbImage) -> Vec<Descriptor> {
        match self.try_describe(image).await {
            Ok(descriptors) => descriptors,
            Err(EngineError::NotReady) => {
                tracing::warn!("models not ready; skipping descriptor extraction");
                Vec::new()
            }
            Err(e) => {
                tracing::error!(error = %e, "descriptor extraction failed");
                Vec::new()
            }
        }
    }
}

/// Spawn the engine on a dedicated OS thread.
///
/// The thread first runs `load` to bring up the models, publishing the
/// outcome through the handle's [`ModelGate`], then serves requests one at a
/// time. A failed load is logged and final; the thread exits and requests are
/// refused by the gate.
pub fn spawn_engine<A, F>(load: F) -> Result<EngineHandle, EngineError>
where
    A: FaceAnalyzer + 'static,
    F: FnOnce() -> Result<A, AnalyzerError> + Send + 'static,
{
    let (state_tx, gate) = ModelGate::channel();
    let (tx, mut rx) = mpsc::channel::<EngineRequest>(16);

    std::thread::Builder::new()
        .name("facematch-engine".into())
        .spawn(move || {
            tracing::info!("engine thread started; loading models");
            let mut analyzer = match load() {
                Ok(analyzer) => analyzer,
                Err(e) => {
                    tracing::error!(error = %e, "model loading failed");
                    state_tx.send_replace(ModelState::Failed(e.to_string()));
                    return;
                }
            };

            let report = analyzer.capabilities();
            if let Some(missing) = report.missing() {
                tracing::error!(capability = %missing, "model capability unavailable");
                state_tx.send_replace(ModelState::Failed(format!("{missing} unavailable")));
                return;
            }
            tracing::info!("models ready");
            state_tx.send_replace(ModelState::Ready(report));

            while let Some(req) = rx.blocking_recv() {
                match req {
                    EngineRequest::Describe { image, reply } => {
                        let result = analyzer.describe(&image);
                        if let Ok(descriptors) = &result {
                            tracing::debug!(
                                width = image.width(),
                                height = image.height(),
                                faces = descriptors.len(),
                                "describe: done"
                            );
                        }
                        let _ = reply.send(result);
                    }
                }
            }
            tracing::info!("engine thread exiting");
        })
        .map_err(EngineError::Spawn)?;

    Ok(EngineHandle { tx, gate })
}

/// Spawn an engine backed by the ONNX models in `model_dir`.
pub fn spawn_onnx_engine(model_dir: PathBuf) -> Result<EngineHandle, EngineError> {
    spawn_engine(move || {
        tracing::info!(dir = %model_dir.display(), "loading ONNX models");
        OnnxAnalyzer::load(&model_dir)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{swatch, FakeAnalyzer};
    use facematch_core::{Capability, CapabilityReport};

    #[tokio::test]
    async fn test_describe_after_ready() {
        let handle = spawn_engine(|| Ok(FakeAnalyzer::new().face([1, 0, 0], &[0.1, 0.2]))).unwrap();
        assert!(matches!(handle.gate().wait().await, ModelState::Ready(_)));

        let descriptors = handle.describe(swatch([1, 0, 0])).await;
        assert_eq!(descriptors, vec![Descriptor::new(vec![0.1, 0.2])]);
        assert!(handle.describe(swatch([2, 0, 0])).await.is_empty());
    }

    #[tokio::test]
    async fn test_describe_before_ready_is_skipped() {
        let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();
        let handle = spawn_engine(move || {
            let _ = release_rx.recv();
            Ok(FakeAnalyzer::new().face([1, 0, 0], &[0.5]))
        })
        .unwrap();

        assert!(matches!(handle.try_describe(swatch([1, 0, 0])).await, Err(EngineError::NotReady)));
        assert!(handle.describe(swatch([1, 0, 0])).await.is_empty());

        release_tx.send(()).unwrap();
        handle.gate().wait().await;
        assert_eq!(handle.describe(swatch([1, 0, 0])).await.len(), 1);
    }

    #[tokio::test]
    async fn test_load_failure_is_final() {
        let handle = spawn_engine(|| -> Result<FakeAnalyzer, AnalyzerError> {
            Err(AnalyzerError::NotReady(Capability::Descriptor))
        })
        .unwrap();

        match handle.gate().wait().await {
            ModelState::Failed(msg) => assert!(msg.contains("descriptor extractor")),
            other => panic!("expected failure, got {other:?}"),
        }
        assert!(handle.describe(swatch([1, 0, 0])).await.is_empty());
    }

    #[tokio::test]
    async fn test_missing_capability_fails_gate() {
        let handle = spawn_engine(|| {
            Ok(FakeAnalyzer::new().with_capabilities(CapabilityReport {
                detector: true,
                landmarks: false,
                descriptor: true,
            }))
        })
        .unwrap();
        assert!(matches!(handle.gate().wait().await, ModelState::Failed(_)));
    }

    #[tokio::test]
    async fn test_extraction_error_yields_empty() {
        let handle = spawn_engine(|| Ok(FakeAnalyzer::new().failing([9, 9, 9]))).unwrap();
        handle.gate().wait().await;
        assert!(matches!(
            handle.try_describe(swatch([9, 9, 9])).await,
            Err(EngineError::Analyzer(_))
        ));
        assert!(handle.describe(swatch([9, 9, 9])).await.is_empty());
    }
}
