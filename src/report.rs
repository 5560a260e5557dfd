use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::collectors::audit::AuditResult;
use crate::collectors::network::NetworkScanResult;
use crate::collectors::tools::ToolAssessment;
use crate::findings::{sort_by_severity, Finding, RiskAssessment, ScanSummary};

/// Complete, read-only result of one scan run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub scan_id: String,
    pub timestamp: DateTime<Local>,
    pub hostname: String,
    pub risk: RiskAssessment,
    pub summary: ScanSummary,
    /// Most severe first; collection order within a severity.
    pub findings: Vec<Finding>,
    pub network_scan: Option<NetworkScanResult>,
    pub audit_result: Option<AuditResult>,
    pub tool_assessment: Option<ToolAssessment>,
}

/// Everything the assembler needs. Supplying a fixed `scan_id` and
/// `timestamp` makes assembly fully deterministic.
#[derive(Debug, Clone)]
pub struct ReportInputs {
    pub scan_id: String,
    pub timestamp: DateTime<Local>,
    pub hostname: String,
    pub risk: RiskAssessment,
    pub summary: ScanSummary,
    pub findings: Vec<Finding>,
    pub network_scan: Option<NetworkScanResult>,
    pub audit_result: Option<AuditResult>,
    pub tool_assessment: Option<ToolAssessment>,
}

/// A fresh random scan identifier.
pub fn new_scan_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Build the report. Pure: no I/O, no clock reads.
pub fn assemble(inputs: ReportInputs) -> Report {
    Report {
        scan_id: inputs.scan_id,
        timestamp: inputs.timestamp,
        hostname: inputs.hostname,
        risk: inputs.risk,
        summary: inputs.summary,
        findings: sort_by_severity(inputs.findings),
        network_scan: inputs.network_scan,
        audit_result: inputs.audit_result,
        tool_assessment: inputs.tool_assessment,
    }
}

impl Report {
    /// File name derived from the scan timestamp, e.g.
    /// `security_report_20240501_101500.html`.
    pub fn file_name(&self, extension: &str) -> String {
        format!(
            "security_report_{}.{}",
            self.timestamp.format("%Y%m%d_%H%M%S"),
            extension
        )
    }
}
