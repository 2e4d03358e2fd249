// ABOUTME: Concurrency and deadline settings for pod operations.
// ABOUTME: Bounds member fan-out, prune fan-out, and single member calls.

use serde::Deserialize;
use std::time::Duration;

use super::deserialize::deserialize_parallelism;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OperationsConfig {
    #[serde(default = "default_member_timeout", with = "humantime_serde")]
    pub member_timeout: Duration,

    #[serde(
        default = "default_parallelism",
        deserialize_with = "deserialize_parallelism"
    )]
    pub max_parallel_members: usize,

    #[serde(
        default = "default_parallelism",
        deserialize_with = "deserialize_parallelism"
    )]
    pub max_parallel_pods: usize,
}

fn default_member_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_parallelism() -> usize {
    4
}

impl Default for OperationsConfig {
    fn default() -> Self {
        OperationsConfig {
            member_timeout: default_member_timeout(),
            max_parallel_members: default_parallelism(),
            max_parallel_pods: default_parallelism(),
        }
    }
}
