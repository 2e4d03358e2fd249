// ABOUTME: Shared helpers for pod integration tests.
// ABOUTME: Builds a PodService over the in-memory runtime and seeds pods.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use podvisor::pod::{
    MemberSpec, Outcome, Payload, PodRegistry, PodService, PodSpec, RegistryStore,
    ServiceOptions,
};
use podvisor::runtime::{ContainerState, MemoryRuntime};
use podvisor::types::{ContainerId, PodId, PodName};

pub struct Harness {
    pub runtime: Arc<MemoryRuntime>,
    pub service: Arc<PodService<MemoryRuntime>>,
}

pub fn harness() -> Harness {
    harness_with(ServiceOptions::default())
}

pub fn harness_with(options: ServiceOptions) -> Harness {
    let runtime = Arc::new(MemoryRuntime::new());
    let registry = Arc::new(PodRegistry::new());
    let service = Arc::new(PodService::new(Arc::clone(&runtime), registry, options));
    Harness { runtime, service }
}

/// Harness whose registry is saved to `state_file`.
pub fn harness_at(state_file: &Path) -> Harness {
    let runtime = Arc::new(MemoryRuntime::new());
    let registry = Arc::new(PodRegistry::open(RegistryStore::new(state_file)).unwrap());
    let service = Arc::new(PodService::new(
        Arc::clone(&runtime),
        registry,
        ServiceOptions::default(),
    ));
    Harness { runtime, service }
}

/// Options with short deadlines, for tests that exercise timeouts.
pub fn fast_options(member_timeout: Duration, parallel: usize) -> ServiceOptions {
    let mut options = ServiceOptions::default();
    options.limits.member_timeout = member_timeout;
    options.limits.max_parallel_members = parallel;
    options
}

impl Harness {
    /// Register containers with the runtime and group them into a pod.
    ///
    /// Container IDs are prefixed with the pod name so pods never share one.
    pub async fn pod(&self, name: &str, members: &[(&str, ContainerState)]) -> PodId {
        let mut spec = PodSpec::new(PodName::new(name).unwrap());
        for (id, state) in members {
            let id = self.runtime.add_container(&format!("{name}-{id}"), *state);
            spec = spec.member(MemberSpec::new(id.as_str()));
        }
        self.create(spec).await
    }

    pub async fn create(&self, spec: PodSpec) -> PodId {
        match self.service.create(spec).await.unwrap() {
            Outcome::Success {
                payload: Payload::Id(id),
            } => id,
            other => panic!("unexpected create outcome: {other:?}"),
        }
    }

    pub fn container(&self, pod: &str, member: &str) -> ContainerId {
        ContainerId::new(format!("{pod}-{member}"))
    }
}
