use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{PanSecError, Result};
use crate::process::{CommandOutput, CommandRunner, CommandSpec};

const WEB_SCAN_TIMEOUT: Duration = Duration::from_secs(300);

/// Operator session: the host that target operations act on.
///
/// Passed explicitly to every operation instead of living in a global.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    target: String,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            target: "127.0.0.1".into(),
        }
    }
}

impl Session {
    pub fn new(target: impl Into<String>) -> Result<Self> {
        let mut session = Self::default();
        session.set_target(target)?;
        Ok(session)
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Change the target. Rejects values that could be read as a flag or
    /// split into several arguments.
    pub fn set_target(&mut self, target: impl Into<String>) -> Result<()> {
        let target = target.into().trim().to_string();
        if target.is_empty() {
            return Err(PanSecError::Config("target must not be empty".into()));
        }
        if target.starts_with('-') || target.chars().any(char::is_whitespace) {
            return Err(PanSecError::Config(format!("invalid target '{target}'")));
        }
        self.target = target;
        Ok(())
    }

    /// Run `op` against the current target.
    pub fn run(
        &self,
        op: TargetOperation,
        runner: &dyn CommandRunner,
        config: &Config,
    ) -> Result<CommandOutput> {
        if let Some(required) = op.required_tool() {
            if runner.which(required).is_none() {
                return Err(PanSecError::Process {
                    command: required.into(),
                    message: format!("{required} is not installed"),
                });
            }
        }

        let spec = op.command(&self.target);
        tracing::info!(command = %spec, target = %self.target, "running target operation");
        Ok(runner.run(&spec, op.timeout(config)))
    }
}

/// Ad-hoc operations against the session target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetOperation {
    /// `nmap -F`
    QuickScan,
    /// `nmap -A -T4`
    FullScan,
    /// `nikto -h`
    WebScan,
    /// `ping -c 4`
    Ping,
}

impl TargetOperation {
    pub fn command(&self, target: &str) -> CommandSpec {
        match self {
            Self::QuickScan => CommandSpec::argv("nmap", ["-F", target]),
            Self::FullScan => CommandSpec::argv("nmap", ["-A", "-T4", target]),
            Self::WebScan => CommandSpec::argv("nikto", ["-h", target]),
            Self::Ping => CommandSpec::argv("ping", ["-c", "4", target]),
        }
    }

    fn required_tool(&self) -> Option<&'static str> {
        match self {
            Self::WebScan => Some("nikto"),
            _ => None,
        }
    }

    fn timeout(&self, config: &Config) -> Duration {
        match self {
            Self::QuickScan | Self::FullScan => config.scan.port_scan_timeout(),
            Self::WebScan => WEB_SCAN_TIMEOUT,
            Self::Ping => config.scan.command_timeout(),
        }
    }
}
