// ABOUTME: Pod and member records held by the registry.
// ABOUTME: Includes the pod creation request and the serializable inspect snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::{ContainerId, PodId, PodName};

use super::state::{MemberState, PodState};

/// A container attached to a pod.
///
/// The pod only records membership and ordering; it does not own the
/// container's runtime resources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: ContainerId,
    pub state: MemberState,
    /// Sibling members that must start before this one and stop after it.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<ContainerId>,
}

/// A named group of containers managed as one lifecycle unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pod {
    pub(crate) id: PodId,
    pub(crate) name: PodName,
    pub(crate) members: Vec<Member>,
    #[serde(default)]
    pub(crate) labels: BTreeMap<String, String>,
    pub(crate) created_at: DateTime<Utc>,
}

impl Pod {
    pub(crate) fn new(name: PodName, labels: BTreeMap<String, String>) -> Self {
        Self {
            id: PodId::generate(),
            name,
            members: Vec::new(),
            labels,
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> &PodId {
        &self.id
    }

    pub fn name(&self) -> &PodName {
        &self.name
    }

    /// Members in insertion order.
    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn member(&self, id: &ContainerId) -> Option<&Member> {
        self.members.iter().find(|m| &m.id == id)
    }

    pub(crate) fn member_mut(&mut self, id: &ContainerId) -> Option<&mut Member> {
        self.members.iter_mut().find(|m| &m.id == id)
    }

    pub fn labels(&self) -> &BTreeMap<String, String> {
        &self.labels
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Aggregate state computed from the members.
    pub fn state(&self) -> PodState {
        PodState::aggregate(self.members.iter().map(|m| m.state))
    }

    /// Whether any member is running or paused.
    pub fn has_active_members(&self) -> bool {
        self.members.iter().any(|m| m.state.is_active())
    }

    /// Drop `ids` from membership along with any ordering edges onto them.
    pub(crate) fn drop_members(&mut self, ids: &[ContainerId]) {
        self.members.retain(|m| !ids.contains(&m.id));
        for member in &mut self.members {
            member.depends_on.retain(|dep| !ids.contains(dep));
        }
    }

    pub fn snapshot(&self) -> PodSnapshot {
        PodSnapshot {
            id: self.id.clone(),
            name: self.name.clone(),
            state: self.state(),
            members: self
                .members
                .iter()
                .map(|m| MemberSnapshot {
                    id: m.id.clone(),
                    state: m.state,
                    depends_on: m.depends_on.clone(),
                })
                .collect(),
            labels: self.labels.clone(),
            created_at: self.created_at,
        }
    }
}

/// Attributes for creating a pod.
#[derive(Debug, Clone)]
pub struct PodSpec {
    pub name: PodName,
    pub labels: BTreeMap<String, String>,
    pub members: Vec<MemberSpec>,
}

impl PodSpec {
    pub fn new(name: PodName) -> Self {
        Self {
            name,
            labels: BTreeMap::new(),
            members: Vec::new(),
        }
    }

    pub fn member(mut self, member: MemberSpec) -> Self {
        self.members.push(member);
        self
    }

    pub fn label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }
}

/// A container to attach to a pod, with its ordering constraints.
#[derive(Debug, Clone)]
pub struct MemberSpec {
    pub id: ContainerId,
    pub depends_on: Vec<ContainerId>,
}

impl MemberSpec {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: ContainerId::new(id),
            depends_on: Vec::new(),
        }
    }

    pub fn depends_on(mut self, id: impl Into<String>) -> Self {
        self.depends_on.push(ContainerId::new(id));
        self
    }
}

/// Point-in-time view of a pod, returned by inspect and list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PodSnapshot {
    pub id: PodId,
    pub name: PodName,
    pub state: PodState,
    pub members: Vec<MemberSnapshot>,
    pub labels: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemberSnapshot {
    pub id: ContainerId,
    pub state: MemberState,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<ContainerId>,
}
