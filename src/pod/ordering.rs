// ABOUTME: Start/stop ordering between members of one pod.
// ABOUTME: Validates declared dependencies and splits members into sequential tiers.

use std::collections::{HashMap, HashSet};

use crate::types::ContainerId;

use super::record::Member;

/// Invalid ordering declared at pod creation.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum OrderingError {
    #[error("container {0} is listed more than once")]
    DuplicateMember(ContainerId),

    #[error("container {member} depends on {dependency}, which is not a member of the pod")]
    UnknownDependency {
        member: ContainerId,
        dependency: ContainerId,
    },

    #[error("container {0} depends on itself")]
    SelfDependency(ContainerId),

    #[error("dependency cycle between containers: {}", format_ids(.0))]
    Cycle(Vec<ContainerId>),
}

fn format_ids(ids: &[ContainerId]) -> String {
    ids.iter()
        .map(|id| id.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Which end of the dependency graph goes first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Start, unpause: a member runs after everything it depends on.
    DependenciesFirst,
    /// Stop, kill, pause, remove: a member runs before everything it depends on.
    DependentsFirst,
}

/// Check that member IDs are unique and dependencies form a DAG over members.
pub fn validate(members: &[Member]) -> Result<(), OrderingError> {
    let mut seen = HashSet::new();
    for member in members {
        if !seen.insert(&member.id) {
            return Err(OrderingError::DuplicateMember(member.id.clone()));
        }
    }

    for member in members {
        for dependency in &member.depends_on {
            if dependency == &member.id {
                return Err(OrderingError::SelfDependency(member.id.clone()));
            }
            if !seen.contains(dependency) {
                return Err(OrderingError::UnknownDependency {
                    member: member.id.clone(),
                    dependency: dependency.clone(),
                });
            }
        }
    }

    levels(members).map(|_| ()).map_err(OrderingError::Cycle)
}

/// Depth of each member in the dependency graph (0 = depends on nothing).
///
/// Dependencies on non-members are ignored. On a cycle, returns the members
/// that could not be placed.
fn levels(members: &[Member]) -> Result<HashMap<&ContainerId, usize>, Vec<ContainerId>> {
    let ids: HashSet<&ContainerId> = members.iter().map(|m| &m.id).collect();
    let mut level: HashMap<&ContainerId, usize> = HashMap::with_capacity(members.len());
    let mut remaining: Vec<&Member> = members.iter().collect();

    while !remaining.is_empty() {
        let before = remaining.len();
        remaining.retain(|member| {
            let mut depth = 0;
            for dependency in member.depends_on.iter().filter(|d| ids.contains(d)) {
                match level.get(dependency) {
                    Some(l) => depth = depth.max(l + 1),
                    None => return true,
                }
            }
            level.insert(&member.id, depth);
            false
        });

        if remaining.len() == before {
            return Err(remaining.iter().map(|m| m.id.clone()).collect());
        }
    }

    Ok(level)
}

/// Split `subset` into tiers that must run one after another.
///
/// Members inside a tier have no ordering constraint between them. Tiers are
/// computed over the whole pod, so ordering holds through members that are not
/// in `subset`. Within a tier, members keep pod insertion order.
pub fn tiers(
    members: &[Member],
    subset: &[ContainerId],
    direction: Direction,
) -> Vec<Vec<ContainerId>> {
    let level = match levels(members) {
        Ok(level) => level,
        // Validated at creation; fall back to a single unordered tier.
        Err(_) => return vec![subset.to_vec()],
    };

    let wanted: HashSet<&ContainerId> = subset.iter().collect();
    let depth = level.values().copied().max().unwrap_or(0);
    let mut out: Vec<Vec<ContainerId>> = vec![Vec::new(); depth + 1];

    for member in members.iter().filter(|m| wanted.contains(&m.id)) {
        let l = level.get(&member.id).copied().unwrap_or(0);
        out[l].push(member.id.clone());
    }

    if direction == Direction::DependentsFirst {
        out.reverse();
    }
    out.retain(|tier| !tier.is_empty());
    out
}
