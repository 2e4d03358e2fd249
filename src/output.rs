// ABOUTME: Output formatting for CLI feedback.
// ABOUTME: Renders pod outcomes and errors in normal, quiet (scripts), and JSON modes.

use serde::Serialize;
use std::time::Instant;

use crate::error::Error;
use crate::pod::{MemberFailure, Outcome, OutcomeKind, Payload, PodSnapshot, PruneReport};

/// Output mode for CLI feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-friendly output with progress messages
    Normal,
    /// Bare IDs only, for piping into other commands
    Quiet,
    /// JSON lines for scripting
    Json,
}

/// Handles CLI output based on the configured mode.
pub struct Output {
    mode: OutputMode,
    start_time: Option<Instant>,
}

impl Output {
    pub fn new(mode: OutputMode) -> Self {
        Self {
            mode,
            start_time: None,
        }
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    /// Start timing an operation.
    pub fn start_timer(&mut self) {
        self.start_time = Some(Instant::now());
    }

    /// Get elapsed time since timer started.
    pub fn elapsed_secs(&self) -> f64 {
        self.start_time
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    fn duration(&self) -> Option<f64> {
        self.start_time.map(|_| self.elapsed_secs())
    }

    /// Print a progress message (suppressed in quiet/json mode).
    pub fn progress(&self, message: &str) {
        if self.mode == OutputMode::Normal {
            println!("{message}");
        }
    }

    /// Print the result of a pod command.
    pub fn outcome(&self, outcome: &Outcome) {
        match self.mode {
            OutputMode::Json => {
                let event = JsonEvent {
                    event: event_name(outcome.kind()),
                    kind: outcome.kind(),
                    result: outcome,
                    duration_secs: self.duration(),
                };
                if let Ok(json) = serde_json::to_string(&event) {
                    println!("{json}");
                }
            }
            mode => {
                for line in render(outcome, mode) {
                    println!("{line}");
                }
                if let Some(report) = outcome.report() {
                    for failure in report.failures.iter() {
                        eprintln!("  {failure}");
                    }
                }
            }
        }
    }

    /// Print an error, including any member failures it carries.
    pub fn error(&self, error: &Error) {
        let failures: Vec<&MemberFailure> = match error {
            Error::Pod(e) => e.failures(),
            _ => Vec::new(),
        };

        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => {
                eprintln!("Error: {error}");
                for failure in failures {
                    eprintln!("  {failure}");
                }
            }
            OutputMode::Json => {
                let message = error.to_string();
                let event = JsonErrorEvent {
                    event: "error",
                    kind: error.kind(),
                    message: &message,
                    failures,
                    duration_secs: self.duration(),
                };
                if let Ok(json) = serde_json::to_string(&event) {
                    eprintln!("{json}");
                }
            }
        }
    }
}

fn event_name(kind: OutcomeKind) -> &'static str {
    match kind {
        OutcomeKind::PartialFailure => "partial_failure",
        OutcomeKind::NotModified => "not_modified",
        _ => "success",
    }
}

/// Text lines for an outcome in normal or quiet mode.
pub fn render(outcome: &Outcome, mode: OutputMode) -> Vec<String> {
    let quiet = mode == OutputMode::Quiet;
    match outcome {
        Outcome::NoOp { pod, .. } if quiet => vec![pod.to_string()],
        Outcome::NoOp { pod, state } => vec![format!("pod {} already {state}", pod.short())],
        Outcome::PartialFailure { report } if quiet => vec![report.pod.to_string()],
        Outcome::PartialFailure { report } => vec![format!("warning: {report}")],
        Outcome::Success { payload } => match payload {
            Payload::None => Vec::new(),
            Payload::Id(id) => vec![id.to_string()],
            Payload::Snapshot(snapshot) if quiet => vec![snapshot.id.to_string()],
            Payload::Snapshot(snapshot) => render_snapshot(snapshot),
            Payload::Pods(pods) if quiet => pods.iter().map(|p| p.id.to_string()).collect(),
            Payload::Pods(pods) => render_table(pods),
            Payload::Pruned(report) => render_prune(report, quiet),
        },
    }
}

fn render_snapshot(pod: &PodSnapshot) -> Vec<String> {
    let mut lines = vec![
        format!("ID:       {}", pod.id),
        format!("Name:     {}", pod.name),
        format!("State:    {}", pod.state),
        format!("Created:  {}", pod.created_at.to_rfc3339()),
    ];
    for (key, value) in &pod.labels {
        lines.push(format!("Label:    {key}={value}"));
    }
    lines.push(format!("Members:  {}", pod.members.len()));
    for member in &pod.members {
        let mut line = format!("  {:<14} {}", member.id.short(), member.state);
        if !member.depends_on.is_empty() {
            let deps: Vec<&str> = member.depends_on.iter().map(|d| d.short()).collect();
            line.push_str(&format!(" (after {})", deps.join(", ")));
        }
        lines.push(line);
    }
    lines
}

fn render_table(pods: &[PodSnapshot]) -> Vec<String> {
    let mut lines = vec![format!(
        "{:<14} {:<24} {:<10} {}",
        "POD ID", "NAME", "STATE", "MEMBERS"
    )];
    for pod in pods {
        lines.push(format!(
            "{:<14} {:<24} {:<10} {}",
            pod.id.short(),
            pod.name.as_str(),
            pod.state.to_string(),
            pod.members.len()
        ));
    }
    lines
}

fn render_prune(report: &PruneReport, quiet: bool) -> Vec<String> {
    let mut lines: Vec<String> = report.removed.iter().map(|id| id.to_string()).collect();
    if !quiet {
        for failure in &report.failures {
            lines.push(format!(
                "failed to prune {}: {} ({})",
                failure.pod.short(),
                failure.message,
                failure.kind
            ));
        }
    }
    lines
}

#[derive(Serialize)]
struct JsonEvent<'a> {
    event: &'a str,
    kind: OutcomeKind,
    result: &'a Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_secs: Option<f64>,
}

#[derive(Serialize)]
struct JsonErrorEvent<'a> {
    event: &'a str,
    kind: OutcomeKind,
    message: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    failures: Vec<&'a MemberFailure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_secs: Option<f64>,
}
