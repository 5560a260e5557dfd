use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::collectors::tools::ToolDef;
use crate::collectors::Platform;
use crate::process::{CommandRunner, CommandSpec};

/// Package installs can be slow (index refresh, large downloads).
const INSTALL_TIMEOUT: Duration = Duration::from_secs(600);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageManager {
    Brew,
    Apt,
    Yum,
    Dnf,
    Pacman,
}

impl PackageManager {
    /// Probe for a supported manager, in priority order for the platform.
    pub fn detect(platform: Platform, runner: &dyn CommandRunner) -> Option<Self> {
        let candidates: &[(&str, PackageManager)] = match platform {
            Platform::MacOs => &[("brew", Self::Brew)],
            Platform::Linux => &[
                ("apt-get", Self::Apt),
                ("yum", Self::Yum),
                ("dnf", Self::Dnf),
                ("pacman", Self::Pacman),
            ],
            Platform::Other => &[],
        };
        candidates
            .iter()
            .find(|(exe, _)| runner.which(exe).is_some())
            .map(|&(_, pm)| pm)
    }

    pub fn install_command(&self, package: &str) -> CommandSpec {
        match self {
            Self::Brew => CommandSpec::argv("brew", ["install", package]),
            Self::Apt => CommandSpec::argv("sudo", ["apt-get", "install", "-y", package]),
            Self::Yum => CommandSpec::argv("sudo", ["yum", "install", "-y", package]),
            Self::Dnf => CommandSpec::argv("sudo", ["dnf", "install", "-y", package]),
            Self::Pacman => CommandSpec::argv("sudo", ["pacman", "-S", "--noconfirm", package]),
        }
    }

    pub fn uninstall_command(&self, package: &str) -> CommandSpec {
        match self {
            Self::Brew => CommandSpec::argv("brew", ["uninstall", package]),
            Self::Apt => CommandSpec::argv("sudo", ["apt-get", "remove", "-y", package]),
            Self::Yum => CommandSpec::argv("sudo", ["yum", "remove", "-y", package]),
            Self::Dnf => CommandSpec::argv("sudo", ["dnf", "remove", "-y", package]),
            Self::Pacman => CommandSpec::argv("sudo", ["pacman", "-Rs", "--noconfirm", package]),
        }
    }
}

impl std::fmt::Display for PackageManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Brew => write!(f, "brew"),
            Self::Apt => write!(f, "apt"),
            Self::Yum => write!(f, "yum"),
            Self::Dnf => write!(f, "dnf"),
            Self::Pacman => write!(f, "pacman"),
        }
    }
}

/// Installs and removes catalog tools through the host package manager.
pub struct Installer<'a> {
    runner: &'a dyn CommandRunner,
    manager: Option<PackageManager>,
}

impl<'a> Installer<'a> {
    pub fn new(platform: Platform, runner: &'a dyn CommandRunner) -> Self {
        Self {
            runner,
            manager: PackageManager::detect(platform, runner),
        }
    }

    pub fn manager(&self) -> Option<PackageManager> {
        self.manager
    }

    pub fn install(&self, tool: &ToolDef) -> bool {
        self.apply(tool, "install", PackageManager::install_command)
    }

    pub fn uninstall(&self, tool: &ToolDef) -> bool {
        self.apply(tool, "uninstall", PackageManager::uninstall_command)
    }

    fn apply(
        &self,
        tool: &ToolDef,
        action: &str,
        command: fn(&PackageManager, &str) -> CommandSpec,
    ) -> bool {
        let Some(manager) = self.manager else {
            tracing::error!("no supported package manager found");
            return false;
        };
        let package = tool.package_name();
        tracing::info!(%package, %manager, action, "running package manager");

        let out = self.runner.run(&command(&manager, package), INSTALL_TIMEOUT);
        if out.success() {
            tracing::info!(%package, action, "package manager succeeded");
            true
        } else {
            tracing::error!(
                %package,
                action,
                exit_code = out.exit_code,
                stderr = %out.stderr,
                "package manager failed"
            );
            false
        }
    }
}
