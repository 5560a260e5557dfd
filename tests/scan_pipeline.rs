use std::collections::HashMap;
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::time::Duration;

use pretty_assertions::assert_eq;

use pansec::collectors::db_ports::DatabasePortCollector;
use pansec::collectors::{
    audit::AuditCollector, firewall::FirewallCollector, network::NetworkCollector,
    ssh::SshConfigCollector, tools::ToolInventoryCollector, Collector, Platform, ScanContext,
    SystemPaths,
};
use pansec::config::Config;
use pansec::findings::{RiskLevel, Severity};
use pansec::output::OutputFormat;
use pansec::process::{CommandOutput, CommandRunner, CommandSpec, EXIT_NOT_FOUND};
use pansec::{scan_with_context, write_report};

/// Canned command outputs keyed by the rendered command line.
#[derive(Default)]
struct FakeRunner {
    responses: HashMap<String, CommandOutput>,
    executables: Vec<&'static str>,
}

impl FakeRunner {
    fn with(mut self, command: &str, stdout: &str) -> Self {
        self.responses.insert(
            command.to_string(),
            CommandOutput {
                exit_code: 0,
                stdout: stdout.to_string(),
                stderr: String::new(),
            },
        );
        self
    }
}

impl CommandRunner for FakeRunner {
    fn run(&self, spec: &CommandSpec, _timeout: Duration) -> CommandOutput {
        self.responses
            .get(&spec.to_string())
            .cloned()
            .unwrap_or(CommandOutput {
                exit_code: EXIT_NOT_FOUND,
                stdout: String::new(),
                stderr: "not found".into(),
            })
    }

    fn which(&self, program: &str) -> Option<PathBuf> {
        self.executables
            .contains(&program)
            .then(|| PathBuf::from("/usr/bin").join(program))
    }
}

struct Fixture {
    _dir: tempfile::TempDir,
    paths: SystemPaths,
    reports: PathBuf,
}

fn fixture(sshd_config: &str) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    std::fs::write(root.join("sshd_config"), sshd_config).unwrap();
    std::fs::write(
        root.join("passwd"),
        "root:x:0:0:root:/root:/bin/bash\nnobody:x:65534:65534::/:/usr/sbin/nologin\n",
    )
    .unwrap();
    std::fs::write(
        root.join("auth.log"),
        "sshd[1]: Failed password for <script>x</script> from 10.0.0.9\n",
    )
    .unwrap();

    Fixture {
        paths: SystemPaths {
            sshd_config: root.join("sshd_config"),
            passwd: root.join("passwd"),
            auth_logs: vec![root.join("auth.log")],
        },
        reports: root.join("out").join("reports"),
        _dir: dir,
    }
}

fn linux_runner() -> FakeRunner {
    FakeRunner::default()
        .with("uname -s", "Linux")
        .with("uname -r", "6.8.0")
        .with("uname -v", "#1 SMP")
        .with("uptime -p", "up 1 hour")
        .with("ufw status", "Status: inactive")
        .with("ip -br addr show", "eth0 UP 192.168.1.50/24")
}

fn collectors(db_port: u16) -> Vec<Box<dyn Collector>> {
    vec![
        Box::new(NetworkCollector),
        Box::new(AuditCollector),
        Box::new(SshConfigCollector),
        Box::new(FirewallCollector),
        Box::new(DatabasePortCollector::with_ports([(db_port, "PostgreSQL")])),
        Box::new(ToolInventoryCollector),
    ]
}

fn read(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap()
}

#[test]
fn full_pipeline_produces_scored_sorted_report() {
    let fx = fixture("PasswordAuthentication yes\nPermitRootLogin yes\n");
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let config = Config::default();
    let runner = linux_runner();
    let ctx = ScanContext::new(&config, &runner)
        .with_platform(Platform::Linux)
        .with_paths(fx.paths.clone());

    let report = scan_with_context(&ctx, &collectors(port));

    let titles: Vec<&str> = report.findings.iter().map(|f| f.title.as_str()).collect();
    assert_eq!(
        titles,
        vec![
            "SSH Root Login Enabled",
            "Firewall Disabled",
            "SSH Password Authentication Enabled",
            "PostgreSQL Port Open",
        ]
    );
    assert_eq!(report.summary.total, 4);
    assert_eq!(report.summary.critical, 1);
    assert_eq!(report.summary.high, 1);
    assert_eq!(report.summary.medium, 2);
    assert_eq!(report.risk.score, 19);
    assert_eq!(report.risk.level, RiskLevel::Medium);

    let net = report.network_scan.as_ref().unwrap();
    assert_eq!(net.interfaces, vec!["eth0"]);
    assert_eq!(net.active_hosts.len(), 1);
    assert_eq!(net.active_hosts[0].ip, "127.0.0.1");

    let audit = report.audit_result.as_ref().unwrap();
    assert_eq!(audit.system_info.os, "Linux 6.8.0");
    assert_eq!(audit.firewall_status, "Inactive");
    assert_eq!(audit.users_with_shell, vec!["root"]);
    assert_eq!(audit.failed_logins_count, 1);

    let tools = report.tool_assessment.as_ref().unwrap();
    assert_eq!(tools.missing_count(), tools.tools.len());
}

#[test]
fn html_report_is_written_and_escaped() {
    let fx = fixture("PermitRootLogin yes\n");
    let config = Config::default();
    let runner = linux_runner().with("ufw status", "Status: active");
    let ctx = ScanContext::new(&config, &runner)
        .with_platform(Platform::Linux)
        .with_paths(fx.paths.clone());

    let report = scan_with_context(
        &ctx,
        &[
            Box::new(AuditCollector) as Box<dyn Collector>,
            Box::new(SshConfigCollector),
            Box::new(FirewallCollector),
        ],
    );
    assert_eq!(report.findings.len(), 1);
    assert_eq!(report.findings[0].severity, Severity::Critical);

    let path = write_report(&report, OutputFormat::Html, &fx.reports).unwrap();
    assert_eq!(path.parent().unwrap(), fx.reports.as_path());
    let name = path.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("security_report_"));
    assert!(name.ends_with(".html"));

    let html = read(&path);
    assert!(html.contains("SSH Root Login Enabled"));
    assert!(html.contains("Failed Logins (1)"));
    assert!(!html.contains("<script>"));
    assert!(html.contains("&lt;script&gt;x&lt;/script&gt;"));
}

#[test]
fn json_report_round_trips() {
    let fx = fixture("");
    let config = Config::default();
    let runner = linux_runner();
    let ctx = ScanContext::new(&config, &runner)
        .with_platform(Platform::Linux)
        .with_paths(fx.paths.clone());

    let report = scan_with_context(&ctx, &[Box::new(FirewallCollector) as Box<dyn Collector>]);
    let path = write_report(&report, OutputFormat::Json, &fx.reports).unwrap();

    let parsed: pansec::report::Report = serde_json::from_str(&read(&path)).unwrap();
    assert_eq!(parsed.scan_id, report.scan_id);
    assert_eq!(parsed.findings, report.findings);
    assert_eq!(parsed.summary, report.summary);
    assert_eq!(parsed.risk, report.risk);
}

#[test]
fn configured_weights_change_classification() {
    let fx = fixture("PermitRootLogin yes\n");
    let mut config = Config::default();
    config.risk.weights.critical = 60;
    config.validate().unwrap();

    let runner = linux_runner().with("ufw status", "Status: active");
    let ctx = ScanContext::new(&config, &runner)
        .with_platform(Platform::Linux)
        .with_paths(fx.paths.clone());

    let report = scan_with_context(&ctx, &[Box::new(SshConfigCollector) as Box<dyn Collector>]);
    assert_eq!(report.risk.score, 60);
    assert_eq!(report.risk.level, RiskLevel::Critical);
}

#[test]
fn missing_sshd_config_is_not_an_error() {
    let fx = fixture("");
    std::fs::remove_file(&fx.paths.sshd_config).unwrap();
    let config = Config::default();
    let runner = linux_runner();
    let ctx = ScanContext::new(&config, &runner)
        .with_platform(Platform::Linux)
        .with_paths(fx.paths.clone());

    let report = scan_with_context(&ctx, &[Box::new(SshConfigCollector) as Box<dyn Collector>]);
    assert!(report.findings.is_empty());
    assert_eq!(report.risk.level, RiskLevel::Low);
}
