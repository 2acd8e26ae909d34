//! Model readiness, owned by one engine instance.

use facematch_core::CapabilityReport;
use tokio::sync::watch;

/// Lifecycle of the models behind an engine.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelState {
    Loading,
    Ready(CapabilityReport),
    /// Loading failed; there is no retry.
    Failed(String),
}

/// Read side of an engine's model state.
#[derive(Clone)]
pub struct ModelGate {
    rx: watch::Receiver<ModelState>,
}

impl ModelGate {
    pub(crate) fn channel() -> (watch::Sender<ModelState>, ModelGate) {
        let (tx, rx) = watch::channel(ModelState::Loading);
        (tx, ModelGate { rx })
    }

    pub fn state(&self) -> ModelState {
        self.rx.borrow().clone()
    }

    pub fn is_ready(&self) -> bool {
        matches!(*self.rx.borrow(), ModelState::Ready(_))
    }

    /// Resolve once loading has finished, successfully or not.
    pub async fn wait(&self) -> ModelState {
        let mut rx = self.rx.clone();
        let state = match rx.wait_for(|s| !matches!(s, ModelState::Loading)).await {
            Ok(state) => state.clone(),
            Err(_) => ModelState::Failed("engine stopped before models loaded".into()),
        };
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_gate_transitions() {
        let (tx, gate) = ModelGate::channel();
        assert_eq!(gate.state(), ModelState::Loading);
        assert!(!gate.is_ready());

        tx.send_replace(ModelState::Ready(CapabilityReport::all_ready()));
        assert!(gate.is_ready());
        assert_eq!(gate.wait().await, ModelState::Ready(CapabilityReport::all_ready()));
    }

    #[tokio::test]
    async fn test_wait_sees_failure() {
        let (tx, gate) = ModelGate::channel();
        let waiter = tokio::spawn({
            let gate = gate.clone();
            async move { gate.wait().await }
        });
        tx.send_replace(ModelState::Failed("boom".into()));
        assert_eq!(waiter.await.unwrap(), ModelState::Failed("boom".into()));
        assert!(!gate.is_ready());
    }

    #[tokio::test]
    async fn test_wait_when_sender_dropped() {
        let (tx, gate) = ModelGate::channel();
        drop(tx);
        assert!(matches!(gate.wait().await, ModelState::Failed(_)));
    }

    #[tokio::test]
    async fn test_gates_are_independent() {
        let (tx_a, gate_a) = ModelGate::channel();
        let (_tx_b, gate_b) = ModelGate::channel();
        tx_a.send_replace(ModelState::Ready(CapabilityReport::all_ready()));
        assert!(gate_a.is_ready());
        assert!(!gate_b.is_ready());
    }
}
