use std::path::Path;

use crate::findings::Severity;
use crate::report::Report;

/// Render the end-of-scan summary printed to stdout: findings grouped by
/// severity, per-severity counts, score and level, and the report path.
pub fn render(report: &Report, report_path: Option<&Path>) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "\n  Scan {} on {} ({})\n",
        report.scan_id,
        report.hostname,
        report.timestamp.format("%Y-%m-%d %H:%M:%S")
    ));

    if let Some(net) = &report.network_scan {
        output.push_str(&format!(
            "  Network scan: {} host(s) found\n",
            net.active_hosts.len()
        ));
    }
    if let Some(tools) = &report.tool_assessment {
        output.push_str(&format!(
            "  Tool assessment: {} missing tool(s) recommended\n",
            tools.missing_count()
        ));
    }

    if report.findings.is_empty() {
        output.push_str("\n  No security findings detected.\n");
    } else {
        output.push_str(&format!("\n  {} finding(s) detected:\n\n", report.findings.len()));
        for finding in &report.findings {
            let severity_tag = match finding.severity {
                Severity::Critical => "[CRITICAL]",
                Severity::High => "[HIGH]    ",
                Severity::Medium => "[MEDIUM]  ",
                Severity::Low => "[LOW]     ",
                Severity::Info => "[INFO]    ",
            };
            output.push_str(&format!("  {} {}\n", severity_tag, finding.title));
            if let Some(remediation) = &finding.remediation {
                output.push_str(&format!("             fix: {}\n", remediation));
            }
        }
    }

    let s = &report.summary;
    output.push_str(&format!(
        "\n  Critical: {}  High: {}  Medium: {}  Low: {}  Info: {}  (total {})\n",
        s.critical, s.high, s.medium, s.low, s.info, s.total
    ));
    output.push_str(&format!(
        "  Risk score: {} ({})\n",
        report.risk.score, report.risk.level
    ));
    if let Some(path) = report_path {
        output.push_str(&format!("  Report: {}\n", path.display()));
    }
    output.push('\n');

    output
}
