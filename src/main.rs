// ABOUTME: Entry point for the podvisor CLI application.
// ABOUTME: Parses arguments, wires config, registry and runtime, and maps outcomes to exit codes.

mod cli;

use clap::Parser;
use cli::{Cli, Commands};
use podvisor::config::{self, Config};
use podvisor::error::Result;
use podvisor::output::{Output, OutputMode};
use podvisor::pod::{
    Command, MemberSpec, Outcome, OutcomeKind, PodCommand, PodError, PodRegistry, PodService,
    PodSpec, RegistryStore,
};
use podvisor::runtime::BollardRuntime;
use podvisor::types::PodName;
use std::env;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing subscriber based on verbose flag
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let mode = if cli.json {
        OutputMode::Json
    } else if cli.quiet {
        OutputMode::Quiet
    } else {
        OutputMode::Normal
    };
    let mut output = Output::new(mode);
    output.start_timer();

    let code = match run(cli, &output).await {
        Ok(Some(outcome)) => {
            output.outcome(&outcome);
            exit_code(outcome.kind())
        }
        Ok(None) => 0,
        Err(e) => {
            output.error(&e);
            exit_code(e.kind())
        }
    };
    std::process::exit(code);
}

fn exit_code(kind: OutcomeKind) -> i32 {
    match kind {
        OutcomeKind::Success | OutcomeKind::NotModified => 0,
        OutcomeKind::PartialFailure => 2,
        _ => 1,
    }
}

async fn run(cli: Cli, output: &Output) -> Result<Option<Outcome>> {
    let cwd = env::current_dir()?;

    let command = match cli.command {
        Commands::Init { socket, force } => {
            config::init_config(&cwd, socket.as_deref(), force)?;
            output.progress(&format!("Created {}", config::CONFIG_FILENAME));
            return Ok(None);
        }
        Commands::Create {
            name,
            members,
            labels,
        } => {
            let name = PodName::new(&name)
                .map_err(|e| PodError::BadParameter(format!("invalid pod name: {e}")))?;
            let mut spec = PodSpec::new(name);
            spec.members = members;
            spec.labels = labels.into_iter().collect();
            Command::Create(spec)
        }
        Commands::Attach {
            pod,
            container,
            after,
        } => {
            let member = after
                .into_iter()
                .fold(MemberSpec::new(container), |m, dep| m.depends_on(dep));
            Command::Attach { pod, member }
        }
        Commands::List { filters } => Command::List(cli::parse_filters(&filters)?),
        Commands::Inspect { pod } => Command::Inspect { pod },
        Commands::Exists { pod } => Command::Exists { pod },
        Commands::Start { pod } => lifecycle(pod, PodCommand::Start),
        Commands::Stop { pod, timeout } => lifecycle(
            pod,
            PodCommand::Stop {
                timeout: timeout.seconds,
            },
        ),
        Commands::Kill { pod, signal } => lifecycle(pod, PodCommand::Kill { signal }),
        Commands::Pause { pod } => lifecycle(pod, PodCommand::Pause),
        Commands::Unpause { pod } => lifecycle(pod, PodCommand::Unpause),
        Commands::Restart { pod, timeout } => lifecycle(
            pod,
            PodCommand::Restart {
                timeout: timeout.seconds,
            },
        ),
        Commands::Rm {
            pod,
            force,
            timeout,
        } => lifecycle(
            pod,
            PodCommand::Remove {
                force,
                timeout: timeout.seconds,
            },
        ),
        Commands::Prune => Command::Prune,
    };

    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::discover_or_default(&cwd)?,
    };

    // The service owns the state file lock; it is released when `run` returns.
    let service = connect(&config)?;

    let cancel = service.cancellation().clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, cancelling pod operations");
            cancel.cancel();
        }
    });

    let outcome = service.dispatch(command).await?;
    Ok(Some(outcome))
}

fn lifecycle(pod: String, command: PodCommand) -> Command {
    Command::Lifecycle { pod, command }
}

/// Open the registry and the runtime described by `config`.
fn connect(config: &Config) -> Result<PodService<BollardRuntime>> {
    let state_file = config.state_file()?;
    let registry = PodRegistry::open(RegistryStore::new(state_file))?;

    let runtime = match &config.runtime.socket {
        Some(socket) => BollardRuntime::connect(socket)?,
        None => BollardRuntime::connect_local()?,
    };

    Ok(PodService::new(
        Arc::new(runtime),
        Arc::new(registry),
        config.service_options(),
    ))
}
