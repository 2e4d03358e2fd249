// ABOUTME: Per-pod exclusive sections so operations on one pod never interleave.
// ABOUTME: Turnstiles are created lazily per pod ID and retired when the pod is removed.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::types::PodId;

/// Index from pod ID to that pod's turnstile.
///
/// Operations on different pods never contend; operations on the same pod are
/// admitted one at a time, in arrival order (tokio's mutex is fair).
#[derive(Default)]
pub struct Turnstiles {
    gates: Mutex<HashMap<PodId, Arc<AsyncMutex<()>>>>,
}

/// Held while an operation owns a pod. Releases on drop.
pub struct PodGuard {
    pod: PodId,
    _guard: OwnedMutexGuard<()>,
}

impl std::fmt::Debug for PodGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PodGuard").field("pod", &self.pod).finish()
    }
}

impl PodGuard {
    pub fn pod(&self) -> &PodId {
        &self.pod
    }
}

impl Turnstiles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `pod`.
    pub async fn enter(&self, pod: &PodId) -> PodGuard {
        let gate = {
            let mut gates = self.gates.lock();
            gates
                .entry(pod.clone())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };

        let guard = gate.lock_owned().await;
        tracing::trace!(pod = %pod, "entered pod section");

        PodGuard {
            pod: pod.clone(),
            _guard: guard,
        }
    }

    /// Drop the turnstile of a removed pod.
    ///
    /// Tasks already queued on it still get admitted and must re-check that
    /// the pod exists.
    pub fn retire(&self, pod: &PodId) {
        self.gates.lock().remove(pod);
    }

    /// Number of live turnstiles.
    pub fn len(&self) -> usize {
        self.gates.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
