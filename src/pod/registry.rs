// ABOUTME: Index of pods by ID and name with membership lists.
// ABOUTME: Resolves identifiers and prefixes, owns per-pod turnstiles, persists on change.

use parking_lot::RwLock;
use std::collections::HashSet;

use crate::types::{ContainerId, PodId};

use super::error::{AmbiguousSnafu, LookupError, NoMatchSnafu, PodError};
use super::lock::{PodGuard, Turnstiles};
use super::ordering;
use super::record::{Member, MemberSpec, Pod, PodSpec};
use super::state::{MemberState, PodState};
use super::state_lock::StateLock;
use super::store::{RegistryStore, StoreError};

/// Pod index, in insertion order.
///
/// Reads return clones, so callers never hold the index lock across an await.
/// Mutations of an existing pod must happen while holding its [`PodGuard`].
/// A mutation is published in memory only after it has been saved.
pub struct PodRegistry {
    pods: RwLock<Vec<Pod>>,
    turnstiles: Turnstiles,
    store: Option<RegistryStore>,
    _state_lock: Option<StateLock>,
}

impl Default for PodRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PodRegistry {
    /// An empty, memory-only registry.
    pub fn new() -> Self {
        Self {
            pods: RwLock::new(Vec::new()),
            turnstiles: Turnstiles::new(),
            store: None,
            _state_lock: None,
        }
    }

    /// A registry backed by a state file, loading whatever it already holds.
    ///
    /// The file stays locked against other processes until the registry is
    /// dropped.
    pub fn open(store: RegistryStore) -> Result<Self, StoreError> {
        let state_lock = store.lock()?;
        let pods = store.load()?;
        tracing::debug!(path = %store.path().display(), pods = pods.len(), "loaded pod state");
        Ok(Self {
            pods: RwLock::new(pods),
            turnstiles: Turnstiles::new(),
            store: Some(store),
            _state_lock: Some(state_lock),
        })
    }

    pub fn len(&self) -> usize {
        self.pods.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pods.read().is_empty()
    }

    /// Resolve a full ID, an exact name, or an unambiguous ID/name prefix.
    pub fn resolve(&self, identifier: &str) -> Result<Pod, LookupError> {
        if identifier.is_empty() {
            return NoMatchSnafu { identifier }.fail();
        }

        let pods = self.pods.read();

        if let Some(pod) = pods.iter().find(|p| p.id.as_str() == identifier) {
            return Ok(pod.clone());
        }
        if let Some(pod) = pods.iter().find(|p| p.name.as_str() == identifier) {
            return Ok(pod.clone());
        }

        let candidates: Vec<&Pod> = pods
            .iter()
            .filter(|p| {
                p.id.as_str().starts_with(identifier) || p.name.as_str().starts_with(identifier)
            })
            .collect();

        match candidates.as_slice() {
            [] => NoMatchSnafu { identifier }.fail(),
            [pod] => Ok((*pod).clone()),
            many => AmbiguousSnafu {
                identifier,
                candidates: many.iter().map(|p| p.id.clone()).collect::<Vec<_>>(),
            }
            .fail(),
        }
    }

    pub fn get(&self, id: &PodId) -> Option<Pod> {
        self.pods.read().iter().find(|p| &p.id == id).cloned()
    }

    /// Snapshot of every pod matching `predicate`, in insertion order.
    pub fn list<F>(&self, predicate: F) -> Vec<Pod>
    where
        F: Fn(&Pod) -> bool,
    {
        self.pods
            .read()
            .iter()
            .filter(|p| predicate(p))
            .cloned()
            .collect()
    }

    /// Register a new pod. Members start as `Created` until refreshed.
    pub fn create(&self, spec: PodSpec) -> Result<Pod, PodError> {
        let members: Vec<Member> = spec
            .members
            .into_iter()
            .map(|m| Member {
                id: m.id,
                state: MemberState::Created,
                depends_on: m.depends_on,
            })
            .collect();

        ordering::validate(&members).map_err(|e| PodError::BadParameter(e.to_string()))?;

        let pod = {
            let mut pods = self.pods.write();

            if pods.iter().any(|p| p.name == spec.name) {
                return Err(PodError::conflict(&spec.name, "pod already exists"));
            }
            if let Some(taken) = first_claimed(&pods, members.iter().map(|m| &m.id)) {
                return Err(PodError::conflict(
                    &spec.name,
                    format!("container {taken} already belongs to a pod"),
                ));
            }

            let mut pod = Pod::new(spec.name, spec.labels);
            pod.members = members;

            let mut next = pods.clone();
            next.push(pod.clone());
            self.persist(&next)?;
            *pods = next;
            pod
        };

        tracing::info!(
            pod = %pod.id,
            name = %pod.name,
            members = pod.members.len(),
            "created pod"
        );
        Ok(pod)
    }

    /// Add a member to an existing pod. Caller holds the pod's guard.
    pub fn attach(
        &self,
        _guard: &PodGuard,
        id: &PodId,
        spec: MemberSpec,
    ) -> Result<Pod, PodError> {
        let mut pods = self.pods.write();

        if let Some(taken) = first_claimed(&pods, std::iter::once(&spec.id)) {
            return Err(PodError::conflict(
                id,
                format!("container {taken} already belongs to a pod"),
            ));
        }

        let idx = pods
            .iter()
            .position(|p| &p.id == id)
            .ok_or_else(|| PodError::no_match(id.as_str()))?;

        let mut next = pods.clone();
        let pod = &mut next[idx];
        pod.members.push(Member {
            id: spec.id,
            state: MemberState::Created,
            depends_on: spec.depends_on,
        });
        ordering::validate(&pod.members).map_err(|e| PodError::BadParameter(e.to_string()))?;
        let pod = pod.clone();

        self.persist(&next)?;
        *pods = next;
        Ok(pod)
    }

    /// Store the updated pod and return its recomputed aggregate state.
    pub fn commit(&self, _guard: &PodGuard, pod: Pod) -> Result<PodState, PodError> {
        let state = pod.state();
        let mut pods = self.pods.write();
        let idx = pods
            .iter()
            .position(|p| p.id == pod.id)
            .ok_or_else(|| PodError::Internal(format!("pod {} vanished during commit", pod.id)))?;

        let mut next = pods.clone();
        next[idx] = pod;
        self.persist(&next)?;
        *pods = next;
        Ok(state)
    }

    /// Delete a pod and retire its turnstile. Irreversible.
    pub fn remove(&self, _guard: &PodGuard, id: &PodId) -> Result<Option<Pod>, PodError> {
        let removed = {
            let mut pods = self.pods.write();
            match pods.iter().position(|p| &p.id == id) {
                Some(idx) => {
                    let mut next = pods.clone();
                    let removed = next.remove(idx);
                    self.persist(&next)?;
                    *pods = next;
                    Some(removed)
                }
                None => None,
            }
        };
        self.turnstiles.retire(id);

        if removed.is_some() {
            tracing::info!(pod = %id, "removed pod");
        }
        Ok(removed)
    }

    /// Wait for exclusive access to a pod.
    ///
    /// Returns the guard plus the pod's current record, or `NotFound` if the
    /// pod was removed while waiting.
    pub async fn lock(&self, id: &PodId) -> Result<(PodGuard, Pod), PodError> {
        let guard = self.turnstiles.enter(id).await;
        match self.get(id) {
            Some(pod) => Ok((guard, pod)),
            None => {
                drop(guard);
                self.turnstiles.retire(id);
                Err(PodError::no_match(id.as_str()))
            }
        }
    }

    /// Number of live per-pod turnstiles.
    pub fn turnstile_count(&self) -> usize {
        self.turnstiles.len()
    }

    /// Save `pods` as the next registry contents. Callers hold the index
    /// write lock, which also orders concurrent saves.
    fn persist(&self, pods: &[Pod]) -> Result<(), PodError> {
        let Some(store) = &self.store else {
            return Ok(());
        };

        store.save(pods).map_err(|e| {
            tracing::error!(error = %e, "failed to persist pod state");
            PodError::from(e)
        })
    }
}

/// First container in `ids` that is already a member of some pod.
fn first_claimed<'a>(
    pods: &[Pod],
    ids: impl Iterator<Item = &'a ContainerId>,
) -> Option<&'a ContainerId> {
    let claimed: HashSet<&ContainerId> = pods
        .iter()
        .flat_map(|p| p.members.iter().map(|m| &m.id))
        .collect();
    ids.into_iter().find(|id| claimed.contains(*id))
}
