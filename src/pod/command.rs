// ABOUTME: Lifecycle commands as received from dispatch, and their validated form.
// ABOUTME: Parameter validation happens here, before any lookup or member call.

use std::time::Duration;

use crate::types::Signal;

use super::error::PodError;

/// A lifecycle command targeting one pod, with raw parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PodCommand {
    Start,
    /// `timeout` is the grace period in seconds before members are killed.
    Stop { timeout: Option<i64> },
    /// `signal` is a name (`SIGTERM`, `term`) or number.
    Kill { signal: Option<String> },
    Pause,
    Unpause,
    Restart { timeout: Option<i64> },
    /// With `force`, running members are stopped first.
    Remove { force: bool, timeout: Option<i64> },
}

impl PodCommand {
    pub fn name(&self) -> &'static str {
        match self {
            PodCommand::Start => "start",
            PodCommand::Stop { .. } => "stop",
            PodCommand::Kill { .. } => "kill",
            PodCommand::Pause => "pause",
            PodCommand::Unpause => "unpause",
            PodCommand::Restart { .. } => "restart",
            PodCommand::Remove { .. } => "remove",
        }
    }

    /// Check parameters and fill in defaults.
    pub fn validate(&self, defaults: &Defaults) -> Result<Transition, PodError> {
        let transition = match self {
            PodCommand::Start => Transition::Start,
            PodCommand::Stop { timeout } => Transition::Stop {
                timeout: grace_period(*timeout, defaults)?,
            },
            PodCommand::Kill { signal } => Transition::Kill {
                signal: match signal {
                    Some(s) => s
                        .parse()
                        .map_err(|e| PodError::BadParameter(format!("{e}")))?,
                    None => defaults.kill_signal,
                },
            },
            PodCommand::Pause => Transition::Pause,
            PodCommand::Unpause => Transition::Unpause,
            PodCommand::Restart { timeout } => Transition::Restart {
                timeout: grace_period(*timeout, defaults)?,
            },
            PodCommand::Remove { force, timeout } => Transition::Remove {
                force: *force,
                timeout: grace_period(*timeout, defaults)?,
            },
        };
        Ok(transition)
    }
}

fn grace_period(seconds: Option<i64>, defaults: &Defaults) -> Result<Duration, PodError> {
    match seconds {
        None => Ok(defaults.stop_timeout),
        Some(s) if s < 0 => Err(PodError::BadParameter(format!(
            "timeout must be non-negative, got {s}"
        ))),
        Some(s) => Ok(Duration::from_secs(s as u64)),
    }
}

/// Values used when a command leaves a parameter out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Defaults {
    pub stop_timeout: Duration,
    pub kill_signal: Signal,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            stop_timeout: Duration::from_secs(10),
            kill_signal: Signal::KILL,
        }
    }
}

/// A validated lifecycle command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Start,
    Stop { timeout: Duration },
    Kill { signal: Signal },
    Pause,
    Unpause,
    Restart { timeout: Duration },
    Remove { force: bool, timeout: Duration },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_parameters() {
        let defaults = Defaults::default();
        assert_eq!(
            PodCommand::Stop { timeout: None }.validate(&defaults).unwrap(),
            Transition::Stop {
                timeout: Duration::from_secs(10)
            }
        );
        assert_eq!(
            PodCommand::Kill { signal: None }.validate(&defaults).unwrap(),
            Transition::Kill {
                signal: Signal::KILL
            }
        );
    }

    #[test]
    fn explicit_parameters_win() {
        let defaults = Defaults::default();
        assert_eq!(
            PodCommand::Restart { timeout: Some(0) }
                .validate(&defaults)
                .unwrap(),
            Transition::Restart {
                timeout: Duration::ZERO
            }
        );
        assert_eq!(
            PodCommand::Kill {
                signal: Some("term".into())
            }
            .validate(&defaults)
            .unwrap(),
            Transition::Kill {
                signal: Signal::TERM
            }
        );
    }

    #[test]
    fn malformed_parameters_are_bad_parameter() {
        let defaults = Defaults::default();
        assert!(matches!(
            PodCommand::Stop { timeout: Some(-1) }.validate(&defaults),
            Err(PodError::BadParameter(_))
        ));
        assert!(matches!(
            PodCommand::Kill {
                signal: Some("SIGBOGUS".into())
            }
            .validate(&defaults),
            Err(PodError::BadParameter(_))
        ));
    }
}
