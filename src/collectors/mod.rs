pub mod audit;
pub mod db_ports;
pub mod firewall;
pub mod network;
pub mod ssh;
pub mod tools;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::findings::Finding;
use crate::process::CommandRunner;

use audit::AuditResult;
use network::NetworkScanResult;
use tools::ToolAssessment;

/// Host operating system family, which decides the probe commands used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Linux,
    MacOs,
    Other,
}

impl Platform {
    pub fn current() -> Self {
        match std::env::consts::OS {
            "linux" => Self::Linux,
            "macos" => Self::MacOs,
            _ => Self::Other,
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Linux => write!(f, "Linux"),
            Self::MacOs => write!(f, "Darwin"),
            Self::Other => write!(f, "{}", std::env::consts::OS),
        }
    }
}

/// Well-known files the collectors read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemPaths {
    pub sshd_config: PathBuf,
    pub passwd: PathBuf,
    /// Authentication logs, tried in order; the first with matches wins.
    pub auth_logs: Vec<PathBuf>,
}

impl Default for SystemPaths {
    fn default() -> Self {
        Self {
            sshd_config: PathBuf::from("/etc/ssh/sshd_config"),
            passwd: PathBuf::from("/etc/passwd"),
            auth_logs: vec![
                PathBuf::from("/var/log/auth.log"),
                PathBuf::from("/var/log/secure"),
                PathBuf::from("/var/log/system.log"),
            ],
        }
    }
}

/// Everything a collector may consult. Collectors only read from it.
pub struct ScanContext<'a> {
    pub config: &'a Config,
    pub runner: &'a dyn CommandRunner,
    pub platform: Platform,
    pub paths: SystemPaths,
}

impl<'a> ScanContext<'a> {
    pub fn new(config: &'a Config, runner: &'a dyn CommandRunner) -> Self {
        Self {
            config,
            runner,
            platform: Platform::current(),
            paths: SystemPaths::default(),
        }
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    pub fn with_paths(mut self, paths: SystemPaths) -> Self {
        self.paths = paths;
        self
    }
}

/// Informational facts a collector may produce alongside findings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Fact {
    Network(NetworkScanResult),
    Audit(AuditResult),
    Tools(ToolAssessment),
}

/// What one collector run returns: fresh values, never shared state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectorOutput {
    pub findings: Vec<Finding>,
    pub fact: Option<Fact>,
}

impl CollectorOutput {
    pub fn findings(findings: Vec<Finding>) -> Self {
        Self {
            findings,
            fact: None,
        }
    }

    pub fn fact(fact: Fact) -> Self {
        Self {
            findings: Vec::new(),
            fact: Some(fact),
        }
    }
}

/// A collector probes one aspect of the local machine.
///
/// Missing files, missing binaries and failed commands are not errors:
/// the collector logs and returns whatever it could gather.
pub trait Collector: Send + Sync {
    /// Short name used in logs and `--skip` handling.
    fn name(&self) -> &'static str;

    fn collect(&self, ctx: &ScanContext<'_>) -> CollectorOutput;
}

/// Returns all built-in collectors in display order.
pub fn all_collectors() -> Vec<Box<dyn Collector>> {
    vec![
        Box::new(network::NetworkCollector),
        Box::new(audit::AuditCollector),
        Box::new(ssh::SshConfigCollector),
        Box::new(firewall::FirewallCollector),
        Box::new(db_ports::DatabasePortCollector::default()),
        Box::new(tools::ToolInventoryCollector),
    ]
}

/// Findings and facts gathered from a set of collectors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Collected {
    pub findings: Vec<Finding>,
    pub network: Option<NetworkScanResult>,
    pub audit: Option<AuditResult>,
    pub tools: Option<ToolAssessment>,
}

/// Run collectors one after another, keeping findings in collection order.
pub fn run_all(collectors: &[Box<dyn Collector>], ctx: &ScanContext<'_>) -> Collected {
    let mut collected = Collected::default();

    for collector in collectors {
        tracing::info!(collector = collector.name(), "running collector");
        let output = collector.collect(ctx);
        tracing::info!(
            collector = collector.name(),
            findings = output.findings.len(),
            "collector finished"
        );

        collected.findings.extend(output.findings);
        match output.fact {
            Some(Fact::Network(n)) => collected.network = Some(n),
            Some(Fact::Audit(a)) => collected.audit = Some(a),
            Some(Fact::Tools(t)) => collected.tools = Some(t),
            None => {}
        }
    }

    collected
}


#[cfg(test)]
mod tests {
    use super::testing::FakeRunner;
    use super::*;
    use crate::findings::Severity;

    struct Fixed(Vec<Finding>);

    impl Collector for Fixed {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn collect(&self, _ctx: &ScanContext<'_>) -> CollectorOutput {
            CollectorOutput::findings(self.0.clone())
        }
    }

    #[test]
    fn run_all_preserves_collection_order() {
        let config = Config::default();
        let runner = FakeRunner::default();
        let ctx = ScanContext::new(&config, &runner);
        let collectors: Vec<Box<dyn Collector>> = vec![
            Box::new(Fixed(vec![Finding::new("first", "", Severity::Low)])),
            Box::new(Fixed(vec![
                Finding::new("second", "", Severity::Critical),
                Finding::new("third", "", Severity::Low),
            ])),
        ];
        let collected = run_all(&collectors, &ctx);
        let titles: Vec<&str> = collected.findings.iter().map(|f| f.title.as_str()).collect();
        assert_eq!(titles, vec!["first", "second", "third"]);
        assert!(collected.network.is_none());
    }

    #[test]
    fn registry_has_every_collector_once() {
        let names: Vec<&str> = all_collectors().iter().map(|c| c.name()).collect();
        assert_eq!(
            names,
            vec!["network", "audit", "ssh", "firewall", "db_ports", "tools"]
        );
    }
}
