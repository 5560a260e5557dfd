use crate::error::Result;
use crate::report::Report;

/// Render a report as pretty-printed JSON.
pub fn render(report: &Report) -> Result<String> {
    let json = serde_json::to_string_pretty(report)?;
    Ok(json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::findings::{Finding, RiskConfig, Severity};
    use crate::report::{assemble, ReportInputs};

    #[test]
    fn round_trips_key_fields() {
        let findings = vec![Finding::new("Firewall Disabled", "No active firewall detected.", Severity::High)];
        let (summary, risk) = RiskConfig::default().aggregate(&findings);
        let report = assemble(ReportInputs {
            scan_id: "abc".into(),
            timestamp: chrono::Local::now(),
            hostname: "box".into(),
            risk,
            summary,
            findings,
            network_scan: None,
            audit_result: None,
            tool_assessment: None,
        });

        let value: serde_json::Value = serde_json::from_str(&render(&report).unwrap()).unwrap();
        assert_eq!(value["scan_id"], "abc");
        assert_eq!(value["risk"]["level"], "LOW");
        assert_eq!(value["risk"]["score"], 5);
        assert_eq!(value["findings"][0]["severity"], "HIGH");
        assert_eq!(value["summary"]["high"], 1);
        assert!(value["network_scan"].is_null());
    }
}
