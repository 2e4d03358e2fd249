// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands, their arguments, and the list filter grammar.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use podvisor::pod::{MemberSpec, PodError, PodFilter, PodState};

#[derive(Parser)]
#[command(name = "podvisor")]
#[command(about = "Lifecycle control for groups of Docker and Podman containers")]
#[command(version)]
pub struct Cli {
    /// Path to a config file (default: discover podvisor.yml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit JSON lines
    #[arg(long, global = true, conflicts_with = "quiet")]
    pub json: bool,

    /// Print only IDs
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new podvisor.yml configuration file
    Init {
        /// Runtime socket to write into the config
        #[arg(long)]
        socket: Option<String>,

        /// Overwrite an existing config file
        #[arg(short, long)]
        force: bool,
    },

    /// Create a pod from existing containers
    Create {
        name: String,

        /// Member container, as ID or ID:DEP1,DEP2 to start after DEP1 and DEP2
        #[arg(short, long = "member", value_parser = parse_member)]
        members: Vec<MemberSpec>,

        /// Label as KEY=VALUE
        #[arg(short, long = "label", value_parser = parse_label)]
        labels: Vec<(String, String)>,
    },

    /// Add a container to an existing pod
    Attach {
        pod: String,
        container: String,

        /// Start the container after this member
        #[arg(long = "after")]
        after: Vec<String>,
    },

    /// List pods
    #[command(alias = "ls")]
    List {
        /// Filter as KEY=VALUE (name, id, state, label)
        #[arg(short, long = "filter")]
        filters: Vec<String>,
    },

    /// Show a pod and its members
    Inspect { pod: String },

    /// Exit successfully if the pod exists
    Exists { pod: String },

    /// Start every member of a pod
    Start { pod: String },

    /// Stop every running member of a pod
    Stop {
        pod: String,
        #[command(flatten)]
        timeout: TimeoutArg,
    },

    /// Send a signal to every running member of a pod
    Kill {
        pod: String,

        /// Signal name or number (default from config, normally SIGKILL)
        #[arg(short, long)]
        signal: Option<String>,
    },

    /// Pause every running member of a pod
    Pause { pod: String },

    /// Unpause every paused member of a pod
    Unpause { pod: String },

    /// Stop then start every member of a pod
    Restart {
        pod: String,
        #[command(flatten)]
        timeout: TimeoutArg,
    },

    /// Remove a pod and its member containers
    #[command(alias = "remove")]
    Rm {
        pod: String,

        /// Stop running members first
        #[arg(short, long)]
        force: bool,

        #[command(flatten)]
        timeout: TimeoutArg,
    },

    /// Remove every pod with no running or paused member
    Prune,
}

#[derive(Args)]
pub struct TimeoutArg {
    /// Seconds to wait for members to stop before killing them
    #[arg(short = 't', long = "time", allow_negative_numbers = true)]
    pub seconds: Option<i64>,
}

fn parse_member(s: &str) -> Result<MemberSpec, String> {
    let (id, deps) = match s.split_once(':') {
        Some((id, deps)) => (id, Some(deps)),
        None => (s, None),
    };
    if id.is_empty() {
        return Err("container ID cannot be empty".to_string());
    }

    let mut member = MemberSpec::new(id);
    for dep in deps.into_iter().flat_map(|d| d.split(',')) {
        if dep.is_empty() {
            return Err(format!("empty dependency in {s}"));
        }
        member = member.depends_on(dep);
    }
    Ok(member)
}

fn parse_label(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got {s}")),
    }
}

/// Translate `--filter` arguments into a typed filter.
pub fn parse_filters(filters: &[String]) -> Result<PodFilter, PodError> {
    let mut filter = PodFilter::new();
    for raw in filters {
        let (key, value) = raw
            .split_once('=')
            .ok_or_else(|| PodError::BadParameter(format!("filter must be KEY=VALUE: {raw}")))?;

        filter = match key {
            "name" => filter.name(value),
            "id" => filter.id(value),
            "state" | "status" => filter.state(parse_state(value)?),
            "label" => match value.split_once('=') {
                Some((k, v)) => filter.label(k, Some(v.to_string())),
                None => filter.label(value, None),
            },
            other => {
                return Err(PodError::BadParameter(format!("unknown filter: {other}")));
            }
        };
    }
    Ok(filter)
}

fn parse_state(s: &str) -> Result<PodState, PodError> {
    match s.to_ascii_lowercase().as_str() {
        "created" => Ok(PodState::Created),
        "running" => Ok(PodState::Running),
        "paused" => Ok(PodState::Paused),
        "stopped" | "exited" => Ok(PodState::Stopped),
        "degraded" => Ok(PodState::Degraded),
        _ => Err(PodError::BadParameter(format!("unknown pod state: {s}"))),
    }
}
