// ABOUTME: Typed predicate for listing pods.
// ABOUTME: Every set criterion must match; an empty filter matches everything.

use super::record::Pod;
use super::state::PodState;

/// Criteria for selecting pods.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PodFilter {
    /// Substring of the pod name.
    pub name: Option<String>,
    /// Prefix of the pod ID.
    pub id: Option<String>,
    pub state: Option<PodState>,
    /// Label key, optionally with a required value.
    pub labels: Vec<(String, Option<String>)>,
}

impl PodFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn id(mut self, prefix: impl Into<String>) -> Self {
        self.id = Some(prefix.into());
        self
    }

    pub fn state(mut self, state: PodState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn label(mut self, key: impl Into<String>, value: Option<String>) -> Self {
        self.labels.push((key.into(), value));
        self
    }

    pub fn matches(&self, pod: &Pod) -> bool {
        if let Some(name) = &self.name {
            if !pod.name().as_str().contains(name.as_str()) {
                return false;
            }
        }
        if let Some(prefix) = &self.id {
            if !pod.id().as_str().starts_with(prefix.as_str()) {
                return false;
            }
        }
        if let Some(state) = self.state {
            if pod.state() != state {
                return false;
            }
        }
        self.labels.iter().all(|(key, value)| match (pod.labels().get(key), value) {
            (Some(actual), Some(wanted)) => actual == wanted,
            (Some(_), None) => true,
            (None, _) => false,
        })
    }
}
