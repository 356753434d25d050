//! Lock actuation

use std::process::Command;

#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    #[error("failed to run {command}: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },
    #[error("{command} exited with {status}")]
    Failed {
        command: String,
        status: std::process::ExitStatus,
    },
    #[error("bluetooth: {0}")]
    Bluetooth(String),
}

/// Physical side effects of authorized commands
pub trait Hardware {
    /// Release the bolt
    fn unlock(&mut self) -> Result<(), HardwareError>;

    /// Install the latest lock software
    fn update(&mut self) -> Result<(), HardwareError>;

    fn set_homekit(&mut self, enabled: bool) -> Result<(), HardwareError>;
}

/// Runs a configured command for each action
///
/// An empty command line means the action only logs. The HomeKit command
/// gets `on` or `off` appended.
#[derive(Debug, Clone, Default)]
pub struct ProcessHardware {
    pub unlock: Vec<String>,
    pub update: Vec<String>,
    pub homekit: Vec<String>,
}

impl ProcessHardware {
    pub fn from_config(config: &crate::Configuration) -> Self {
        Self {
            unlock: config.unlock_command.clone(),
            update: config.update_command.clone(),
            homekit: config.homekit_command.clone(),
        }
    }
}

fn run(argv: &[String], extra: Option<&str>) -> Result<(), HardwareError> {
    let Some((program, args)) = argv.split_first() else {
        log::debug!("no command configured");
        return Ok(());
    };
    let command = argv.join(" ");
    log::debug!("running {command}");

    let mut cmd = Command::new(program);
    cmd.args(args);
    if let Some(extra) = extra {
        cmd.arg(extra);
    }
    let status = cmd.status().map_err(|source| HardwareError::Spawn {
        command: command.clone(),
        source,
    })?;
    if !status.success() {
        return Err(HardwareError::Failed { command, status });
    }
    Ok(())
}

impl Hardware for ProcessHardware {
    fn unlock(&mut self) -> Result<(), HardwareError> {
        log::info!("unlocking");
        run(&self.unlock, None)
    }

    fn update(&mut self) -> Result<(), HardwareError> {
        log::info!("updating lock software");
        run(&self.update, None)
    }

    fn set_homekit(&mut self, enabled: bool) -> Result<(), HardwareError> {
        log::info!("homekit {}", if enabled { "enabled" } else { "disabled" });
        run(&self.homekit, Some(if enabled { "on" } else { "off" }))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn empty_commands_succeed() {
        let mut hw = ProcessHardware::default();
        hw.unlock().unwrap();
        hw.update().unwrap();
        hw.set_homekit(true).unwrap();
    }

    #[test]
    fn exit_status_is_checked() {
        let mut hw = ProcessHardware {
            unlock: argv(&["true"]),
            update: argv(&["sh", "-c", "exit 3"]),
            homekit: argv(&["sh", "-c", "test \"$0\" = on"]),
        };
        hw.unlock().unwrap();
        assert!(matches!(hw.update(), Err(HardwareError::Failed { .. })));
        hw.set_homekit(true).unwrap();
        assert!(hw.set_homekit(false).is_err());
    }

    #[test]
    fn missing_program_is_a_spawn_error() {
        let mut hw = ProcessHardware {
            unlock: argv(&["/nonexistent/bolt-actuator"]),
            ..Default::default()
        };
        assert!(matches!(hw.unlock(), Err(HardwareError::Spawn { .. })));
    }
}
