// ABOUTME: Config scaffolding for new setups.
// ABOUTME: Creates a podvisor.yml template listing every key with its default.

use std::path::Path;

use crate::error::{Error, Result};

use super::{CONFIG_FILENAME, Config};

pub fn init_config(dir: &Path, socket: Option<&str>, force: bool) -> Result<()> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    let yaml = generate_template_yaml(&Config::default(), socket);
    std::fs::write(&config_path, yaml)?;

    Ok(())
}

fn generate_template_yaml(config: &Config, socket: Option<&str>) -> String {
    let runtime = match socket {
        Some(s) => format!("runtime:\n  socket: {s}"),
        None => "# runtime:\n#   socket: /run/user/1000/podman/podman.sock".to_string(),
    };
    format!(
        r#"# state_file: ~/.local/state/podvisor/pods.json

{}

stop:
  timeout: {}s
  kill_signal: {}

operations:
  member_timeout: {}s
  max_parallel_members: {}
  max_parallel_pods: {}
"#,
        runtime,
        config.stop.timeout.as_secs(),
        config.stop.kill_signal,
        config.operations.member_timeout.as_secs(),
        config.operations.max_parallel_members,
        config.operations.max_parallel_pods,
    )
}
