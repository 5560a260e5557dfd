use serde::{Deserialize, Serialize};

use super::{Collector, CollectorOutput, Platform, ScanContext};
use crate::findings::{Finding, Severity};
use crate::process::CommandSpec;

const MACOS_SOCKETFILTERFW: &str = "/usr/libexec/ApplicationFirewall/socketfilterfw";

/// Result of the platform firewall probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FirewallStatus {
    Active,
    Inactive,
    /// No probe could be run or none gave a readable answer.
    Unknown,
}

impl std::fmt::Display for FirewallStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "Active"),
            Self::Inactive => write!(f, "Inactive"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Emits a single HIGH finding unless an active firewall is detected.
pub struct FirewallCollector;

impl Collector for FirewallCollector {
    fn name(&self) -> &'static str {
        "firewall"
    }

    fn collect(&self, ctx: &ScanContext<'_>) -> CollectorOutput {
        let status = probe(ctx);
        tracing::debug!(%status, "firewall probe");

        if status == FirewallStatus::Active {
            return CollectorOutput::default();
        }

        CollectorOutput::findings(vec![Finding::new(
            "Firewall Disabled",
            "No active firewall detected.",
            Severity::High,
        )
        .with_remediation("Enable UFW (Linux) or Application Firewall (macOS).")
        .with_evidence(format!("firewall status: {status}"))])
    }
}

/// Ask the platform's firewall front-ends whether filtering is on.
pub fn probe(ctx: &ScanContext<'_>) -> FirewallStatus {
    match ctx.platform {
        Platform::Linux => {
            let ufw = probe_ufw(ctx);
            if ufw == FirewallStatus::Active {
                return ufw;
            }
            match probe_firewalld(ctx) {
                FirewallStatus::Unknown => ufw,
                firewalld => firewalld,
            }
        }
        Platform::MacOs => probe_socketfilterfw(ctx),
        Platform::Other => FirewallStatus::Unknown,
    }
}

fn probe_ufw(ctx: &ScanContext<'_>) -> FirewallStatus {
    let out = ctx.runner.run(
        &CommandSpec::argv("ufw", ["status"]),
        ctx.config.scan.command_timeout(),
    );
    if !out.success() {
        return FirewallStatus::Unknown;
    }
    parse_ufw_status(&out.stdout)
}

fn probe_firewalld(ctx: &ScanContext<'_>) -> FirewallStatus {
    let out = ctx.runner.run(
        &CommandSpec::argv("firewall-cmd", ["--state"]),
        ctx.config.scan.command_timeout(),
    );
    match out.stdout.trim() {
        "running" => FirewallStatus::Active,
        "not running" => FirewallStatus::Inactive,
        _ => FirewallStatus::Unknown,
    }
}

fn probe_socketfilterfw(ctx: &ScanContext<'_>) -> FirewallStatus {
    let out = ctx.runner.run(
        &CommandSpec::argv(MACOS_SOCKETFILTERFW, ["--getglobalstate"]),
        ctx.config.scan.command_timeout(),
    );
    if !out.success() {
        return FirewallStatus::Unknown;
    }
    if out.stdout.to_lowercase().contains("enabled") {
        FirewallStatus::Active
    } else {
        FirewallStatus::Inactive
    }
}

/// `ufw status` prints `Status: active` or `Status: inactive`.
pub fn parse_ufw_status(stdout: &str) -> FirewallStatus {
    let lowered = stdout.to_lowercase();
    if lowered.contains("inactive") {
        FirewallStatus::Inactive
    } else if lowered.contains("active") {
        FirewallStatus::Active
    } else {
        FirewallStatus::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collectors::testing::FakeRunner;
    use crate::config::Config;

    fn run(platform: Platform, runner: &FakeRunner) -> CollectorOutput {
        let config = Config::default();
        let ctx = ScanContext::new(&config, runner).with_platform(platform);
        FirewallCollector.collect(&ctx)
    }

    #[test]
    fn active_ufw_yields_nothing() {
        let runner = FakeRunner::default().with("ufw status", 0, "Status: active\n\nTo Action From");
        assert!(run(Platform::Linux, &runner).findings.is_empty());
    }

    #[test]
    fn inactive_ufw_is_high() {
        let runner = FakeRunner::default().with("ufw status", 0, "Status: inactive");
        let out = run(Platform::Linux, &runner);
        assert_eq!(out.findings.len(), 1);
        assert_eq!(out.findings[0].title, "Firewall Disabled");
        assert_eq!(out.findings[0].severity, Severity::High);
    }

    #[test]
    fn firewalld_counts_as_active() {
        let runner = FakeRunner::default().with("firewall-cmd --state", 0, "running");
        assert!(run(Platform::Linux, &runner).findings.is_empty());
    }

    #[test]
    fn no_firewall_tooling_is_one_finding() {
        let out = run(Platform::Linux, &FakeRunner::default());
        assert_eq!(out.findings.len(), 1);
        assert_eq!(
            out.findings[0].evidence.as_deref(),
            Some("firewall status: Unknown")
        );
    }

    #[test]
    fn macos_application_firewall() {
        let cmd = format!("{MACOS_SOCKETFILTERFW} --getglobalstate");
        let on = FakeRunner::default().with(&cmd, 0, "Firewall is enabled. (State = 1)");
        assert!(run(Platform::MacOs, &on).findings.is_empty());

        let off = FakeRunner::default().with(&cmd, 0, "Firewall is disabled. (State = 0)");
        assert_eq!(run(Platform::MacOs, &off).findings.len(), 1);
    }

    #[test]
    fn ufw_status_parsing() {
        assert_eq!(parse_ufw_status("Status: active"), FirewallStatus::Active);
        assert_eq!(parse_ufw_status("Status: inactive"), FirewallStatus::Inactive);
        assert_eq!(parse_ufw_status("ERROR: need root"), FirewallStatus::Unknown);
    }
}
