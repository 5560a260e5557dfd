//! pansec: localhost/LAN security posture checker.
//!
//! Runs a handful of local probes (host discovery, SSH configuration,
//! firewall state, exposed database ports, system audit facts, security
//! tool inventory), scores the findings and renders an HTML report.
//!
//! # Quick Start
//!
//! ```no_run
//! use pansec::config::Config;
//! use pansec::output::OutputFormat;
//! use pansec::{scan, write_report, ScanOptions};
//!
//! let config = Config::default();
//! let report = scan(&config, &ScanOptions::default());
//! let path = write_report(&report, OutputFormat::Html, &config.paths.reports_dir).unwrap();
//! println!("{} ({}): {}", report.risk.score, report.risk.level, path.display());
//! ```

pub mod collectors;
pub mod config;
pub mod error;
pub mod findings;
pub mod installer;
pub mod output;
pub mod process;
pub mod report;
pub mod session;

use std::path::{Path, PathBuf};

use chrono::Local;

use collectors::{Collector, ScanContext};
use config::Config;
use error::{PanSecError, Result};
use output::OutputFormat;
use process::SystemRunner;
use report::{Report, ReportInputs};

/// Options for a scan invocation.
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Skip nmap host discovery.
    pub skip_network: bool,
    /// Skip the security tool inventory.
    pub skip_tools: bool,
}

impl ScanOptions {
    /// The built-in collectors this scan should run, in display order.
    pub fn collectors(&self) -> Vec<Box<dyn Collector>> {
        collectors::all_collectors()
            .into_iter()
            .filter(|c| !(self.skip_network && c.name() == "network"))
            .filter(|c| !(self.skip_tools && c.name() == "tools"))
            .collect()
    }
}

/// Run a complete scan of the local machine.
///
/// `config` is expected to be validated already (see [`Config::resolve`]).
/// Individual probe failures never fail the scan.
pub fn scan(config: &Config, options: &ScanOptions) -> Report {
    let runner = SystemRunner;
    let ctx = ScanContext::new(config, &runner);
    scan_with_context(&ctx, &options.collectors())
}

/// Run `collectors` against `ctx`, score the findings and assemble a report.
pub fn scan_with_context(ctx: &ScanContext<'_>, collectors: &[Box<dyn Collector>]) -> Report {
    let scan_id = report::new_scan_id();
    tracing::info!(%scan_id, "starting security scan");

    let collected = collectors::run_all(collectors, ctx);
    let (summary, risk) = ctx.config.risk.aggregate(&collected.findings);
    tracing::info!(score = risk.score, level = %risk.level, findings = summary.total, "scan scored");

    let hostname = collected
        .audit
        .as_ref()
        .map(|a| a.system_info.hostname.clone())
        .unwrap_or_else(collectors::audit::local_hostname);

    report::assemble(ReportInputs {
        scan_id,
        timestamp: Local::now(),
        hostname,
        risk,
        summary,
        findings: collected.findings,
        network_scan: collected.network,
        audit_result: collected.audit,
        tool_assessment: collected.tools,
    })
}

/// Render a report in the specified format.
pub fn render_report(report: &Report, format: OutputFormat) -> Result<String> {
    output::render(report, format)
}

/// Render `report` and write it into `dir` (created if absent). Returns the
/// written path.
pub fn write_report(report: &Report, format: OutputFormat, dir: &Path) -> Result<PathBuf> {
    let rendered = render_report(report, format)?;

    std::fs::create_dir_all(dir).map_err(|e| {
        PanSecError::Output(format!("cannot create reports directory {}: {e}", dir.display()))
    })?;

    let path = dir.join(report.file_name(format.extension()));
    std::fs::write(&path, rendered)
        .map_err(|e| PanSecError::Output(format!("cannot write {}: {e}", path.display())))?;

    tracing::info!(path = %path.display(), "report written");
    Ok(path)
}
