use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{PanSecError, Result};
use crate::findings::RiskConfig;

/// Prefix for environment variable overrides.
pub const ENV_PREFIX: &str = "PAN_SEC_";

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "pansec.toml";

/// Top-level configuration from `pansec.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub risk: RiskConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Where rendered reports are written. Created on demand.
    pub reports_dir: PathBuf,
    /// Where `--log-file` output goes.
    pub logs_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            reports_dir: PathBuf::from("reports"),
            logs_dir: PathBuf::from("logs"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Budget for nmap host discovery.
    pub network_timeout_secs: u64,
    /// Budget for nmap target operations.
    pub port_scan_timeout_secs: u64,
    /// Budget for a single localhost TCP connect.
    pub port_probe_timeout_ms: u64,
    /// Budget for every other external command.
    pub command_timeout_secs: u64,
    /// nmap timing template, e.g. `-T4`.
    pub nmap_timing: String,
    pub max_listening_services: usize,
    pub max_failed_logins: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            network_timeout_secs: 60,
            port_scan_timeout_secs: 30,
            port_probe_timeout_ms: 500,
            command_timeout_secs: 30,
            nmap_timing: "-T4".into(),
            max_listening_services: 25,
            max_failed_logins: 20,
        }
    }
}

impl ScanConfig {
    pub fn network_timeout(&self) -> Duration {
        Duration::from_secs(self.network_timeout_secs)
    }

    pub fn port_scan_timeout(&self) -> Duration {
        Duration::from_secs(self.port_scan_timeout_secs)
    }

    pub fn port_probe_timeout(&self) -> Duration {
        Duration::from_millis(self.port_probe_timeout_ms)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }
}

impl Config {
    /// Load config from a TOML file. Returns defaults if the file doesn't exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load from file, apply `PAN_SEC_*` overrides, then validate.
    pub fn resolve(path: &Path) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides using `lookup` to read variables.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

        if let Some(v) = get("REPORTS_DIR") {
            self.paths.reports_dir = PathBuf::from(v);
        }
        if let Some(v) = get("LOGS_DIR") {
            self.paths.logs_dir = PathBuf::from(v);
        }
        if let Some(v) = get("NMAP_TIMING") {
            self.scan.nmap_timing = v;
        }

        let numeric: [(&str, &mut u64); 9] = [
            ("NETWORK_TIMEOUT", &mut self.scan.network_timeout_secs),
            ("PORT_SCAN_TIMEOUT", &mut self.scan.port_scan_timeout_secs),
            ("WEIGHT_CRITICAL", &mut self.risk.weights.critical),
            ("WEIGHT_HIGH", &mut self.risk.weights.high),
            ("WEIGHT_MEDIUM", &mut self.risk.weights.medium),
            ("WEIGHT_LOW", &mut self.risk.weights.low),
            ("THRESHOLD_CRITICAL", &mut self.risk.thresholds.critical),
            ("THRESHOLD_HIGH", &mut self.risk.thresholds.high),
            ("THRESHOLD_MEDIUM", &mut self.risk.thresholds.medium),
        ];
        for (name, slot) in numeric {
            if let Some(raw) = get(name) {
                *slot = raw.trim().parse().map_err(|_| {
                    PanSecError::Config(format!(
                        "{ENV_PREFIX}{name} must be a non-negative integer, got '{raw}'"
                    ))
                })?;
            }
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.risk.validate()?;
        if self.scan.nmap_timing.split_whitespace().count() != 1 {
            return Err(PanSecError::Config(format!(
                "nmap_timing must be a single flag, got '{}'",
                self.scan.nmap_timing
            )));
        }
        Ok(())
    }

    /// Generate a starter config file.
    pub fn starter_toml() -> &'static str {
        r#"# pansec configuration
# Every key is optional; PAN_SEC_* environment variables override this file.

[paths]
reports_dir = "reports"
logs_dir = "logs"

[scan]
# Seconds allowed for nmap host discovery.
network_timeout_secs = 60
# Seconds allowed for `pansec op` nmap scans.
port_scan_timeout_secs = 30
# Milliseconds allowed per localhost database port probe.
port_probe_timeout_ms = 500
command_timeout_secs = 30
nmap_timing = "-T4"
max_listening_services = 25
max_failed_logins = 20

# Points added to the risk score per finding (info findings add nothing).
[risk.weights]
critical = 10
high = 5
medium = 2
low = 1

# Minimum score for each risk level; must satisfy critical > high > medium.
[risk.thresholds]
critical = 50
high = 30
medium = 15
"#
    }
}
