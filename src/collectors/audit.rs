use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::firewall;
use super::{Collector, CollectorOutput, Fact, Platform, ScanContext};
use crate::process::CommandSpec;

static FAILED_LOGIN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)failed password|authentication failure").unwrap());

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemInfo {
    pub hostname: String,
    pub os: String,
    pub kernel: String,
    pub uptime: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditResult {
    pub system_info: SystemInfo,
    pub security_updates_count: usize,
    pub security_updates_details: Vec<String>,
    pub listening_services: Vec<String>,
    /// Matching lines across the whole log, not just the sample below.
    pub failed_logins_count: usize,
    /// Most recent matching lines, oldest first.
    pub failed_logins_details: Vec<String>,
    pub firewall_status: String,
    pub users_with_shell: Vec<String>,
}

/// Host facts: OS, pending security updates, listeners, failed logins,
/// interactive accounts. Produces no findings.
pub struct AuditCollector;

impl Collector for AuditCollector {
    fn name(&self) -> &'static str {
        "audit"
    }

    fn collect(&self, ctx: &ScanContext<'_>) -> CollectorOutput {
        let (security_updates_count, security_updates_details) = security_updates(ctx);
        let failed = failed_logins(&ctx.paths.auth_logs, ctx.config.scan.max_failed_logins);

        let result = AuditResult {
            system_info: system_info(ctx),
            security_updates_count,
            security_updates_details,
            listening_services: listening_services(ctx),
            failed_logins_count: failed.count,
            failed_logins_details: failed.recent,
            firewall_status: firewall::probe(ctx).to_string(),
            users_with_shell: shell_users(&ctx.paths.passwd),
        };

        CollectorOutput::fact(Fact::Audit(result))
    }
}

/// Hostname of this machine, or `"unknown"`.
pub fn local_hostname() -> String {
    hostname::get()
        .map(|h| h.to_string_lossy().into_owned())
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "could not read hostname");
            "unknown".into()
        })
}

fn system_info(ctx: &ScanContext<'_>) -> SystemInfo {
    let uname = |flag: &str| {
        let out = ctx.runner.run(
            &CommandSpec::argv("uname", [flag]),
            ctx.config.scan.command_timeout(),
        );
        out.success().then_some(out.stdout)
    };

    let family = uname("-s").unwrap_or_else(|| ctx.platform.to_string());
    let os = match uname("-r") {
        Some(release) => format!("{family} {release}"),
        None => family,
    };

    let uptime_spec = match ctx.platform {
        Platform::Linux => CommandSpec::argv("uptime", ["-p"]),
        _ => CommandSpec::argv("uptime", Vec::<String>::new()),
    };
    let uptime = ctx
        .runner
        .run(&uptime_spec, ctx.config.scan.command_timeout());

    SystemInfo {
        hostname: local_hostname(),
        os,
        kernel: uname("-v").unwrap_or_else(|| "Unknown".into()),
        uptime: if uptime.success() {
            uptime.stdout
        } else {
            "Unknown".into()
        },
    }
}

fn security_updates(ctx: &ScanContext<'_>) -> (usize, Vec<String>) {
    if ctx.platform != Platform::Linux || ctx.runner.which("apt").is_none() {
        return (0, Vec::new());
    }
    let out = ctx.runner.run(
        &CommandSpec::argv("apt", ["list", "--upgradable"]),
        ctx.config.scan.command_timeout(),
    );
    if !out.success() {
        tracing::error!(exit_code = out.exit_code, "apt list --upgradable failed");
        return (0, Vec::new());
    }
    let lines = parse_security_updates(&out.stdout);
    (lines.len(), lines)
}

/// Upgradable package lines that come from a security pocket.
pub fn parse_security_updates(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .filter(|l| l.to_lowercase().contains("security"))
        .map(String::from)
        .collect()
}

fn listening_services(ctx: &ScanContext<'_>) -> Vec<String> {
    let spec = match ctx.platform {
        Platform::Linux => CommandSpec::argv("ss", ["-tulnp"]),
        Platform::MacOs => CommandSpec::shell("lsof -i -P -n | grep LISTEN"),
        Platform::Other => return Vec::new(),
    };
    let out = ctx.runner.run(&spec, ctx.config.scan.command_timeout());
    if !out.success() {
        tracing::error!(command = %spec, exit_code = out.exit_code, "listing listeners failed");
        return Vec::new();
    }
    out.stdout
        .lines()
        .take(ctx.config.scan.max_listening_services)
        .map(String::from)
        .collect()
}

/// Failed authentication attempts found in one log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FailedLogins {
    pub count: usize,
    pub recent: Vec<String>,
}

/// Scan the first readable log with matches, keeping the last `keep` lines.
pub fn failed_logins(logs: &[PathBuf], keep: usize) -> FailedLogins {
    for path in logs.iter().filter(|p| p.exists()) {
        match scan_auth_log(path, keep) {
            Ok(found) if found.count > 0 => return found,
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "cannot read auth log");
            }
        }
    }
    FailedLogins::default()
}

fn scan_auth_log(path: &Path, keep: usize) -> std::io::Result<FailedLogins> {
    let reader = BufReader::new(File::open(path)?);
    let mut count = 0;
    let mut recent = VecDeque::with_capacity(keep);

    for line in reader.split(b'\n') {
        let line = String::from_utf8_lossy(&line?).into_owned();
        if !FAILED_LOGIN_RE.is_match(&line) {
            continue;
        }
        count += 1;
        if keep == 0 {
            continue;
        }
        if recent.len() == keep {
            recent.pop_front();
        }
        recent.push_back(line.trim_end().to_string());
    }

    Ok(FailedLogins {
        count,
        recent: recent.into(),
    })
}

fn shell_users(passwd: &Path) -> Vec<String> {
    match std::fs::read_to_string(passwd) {
        Ok(content) => parse_shell_users(&content),
        Err(e) => {
            tracing::debug!(path = %passwd.display(), error = %e, "cannot read passwd");
            Vec::new()
        }
    }
}

/// Accounts whose login shell is a real shell (`*sh`, not `nologin`).
pub fn parse_shell_users(content: &str) -> Vec<String> {
    content
        .lines()
        .filter_map(|line| {
            let fields: Vec<&str> = line.trim().split(':').collect();
            if fields.len() < 7 {
                return None;
            }
            let shell = fields[6];
            (shell.contains("sh") && !shell.contains("nologin")).then(|| fields[0].to_string())
        })
        .collect()
}
