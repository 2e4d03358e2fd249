// ABOUTME: Defaults for stopping and killing pod members.
// ABOUTME: Grace period before a stop escalates, and the signal kill sends.

use serde::Deserialize;
use std::time::Duration;

use crate::types::Signal;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StopConfig {
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,

    #[serde(default, deserialize_with = "super::deserialize::deserialize_signal")]
    pub kill_signal: Signal,
}

fn default_timeout() -> Duration {
    Duration::from_secs(10)
}

impl Default for StopConfig {
    fn default() -> Self {
        StopConfig {
            timeout: default_timeout(),
            kill_signal: Signal::default(),
        }
    }
}
