use serde::{Deserialize, Serialize};

/// A security finding produced by a collector.
///
/// Findings are built once by a collector and then only moved: into the
/// risk aggregator, then into the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    /// Short human-readable title (e.g., "Firewall Disabled").
    pub title: String,
    /// What was detected.
    pub description: String,
    /// Severity level.
    pub severity: Severity,
    /// Suggested remediation.
    pub remediation: Option<String>,
    /// Raw evidence supporting the finding (config line, probe result).
    pub evidence: Option<String>,
}

impl Finding {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        severity: Severity,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            severity,
            remediation: None,
            evidence: None,
        }
    }

    pub fn with_remediation(mut self, remediation: impl Into<String>) -> Self {
        self.remediation = Some(remediation.into());
        self
    }

    pub fn with_evidence(mut self, evidence: impl Into<String>) -> Self {
        self.evidence = Some(evidence.into());
        self
    }
}

/// Severity, ordered by urgency: `Info < Low < Medium < High < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// All severities, most urgent first.
    pub const ALL: [Severity; 5] = [
        Self::Critical,
        Self::High,
        Self::Medium,
        Self::Low,
        Self::Info,
    ];

    pub fn from_str_lenient(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "info" => Some(Self::Info),
            "low" => Some(Self::Low),
            "medium" | "med" => Some(Self::Medium),
            "high" => Some(Self::High),
            "critical" | "crit" => Some(Self::Critical),
            _ => None,
        }
    }

    /// Lower-case name, used for CSS classes.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Low => write!(f, "LOW"),
            Self::Medium => write!(f, "MEDIUM"),
            Self::High => write!(f, "HIGH"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Sort findings most severe first. The sort is stable, so findings of
/// equal severity keep their collection order.
pub fn sort_by_severity(mut findings: Vec<Finding>) -> Vec<Finding> {
    findings.sort_by(|a, b| b.severity.cmp(&a.severity));
    findings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_total_order() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
        assert!(Severity::Low > Severity::Info);
    }

    #[test]
    fn lenient_parse() {
        assert_eq!(Severity::from_str_lenient("CRIT"), Some(Severity::Critical));
        assert_eq!(Severity::from_str_lenient("Medium"), Some(Severity::Medium));
        assert_eq!(Severity::from_str_lenient("urgent"), None);
    }

    #[test]
    fn serializes_upper_case() {
        let json = serde_json::to_string(&Severity::High).unwrap();
        assert_eq!(json, "\"HIGH\"");
    }

    #[test]
    fn sort_is_stable_on_ties() {
        let findings = vec![
            Finding::new("a", "", Severity::Medium),
            Finding::new("b", "", Severity::Critical),
            Finding::new("c", "", Severity::Medium),
            Finding::new("d", "", Severity::Info),
            Finding::new("e", "", Severity::Critical),
        ];
        let titles: Vec<String> = sort_by_severity(findings)
            .into_iter()
            .map(|f| f.title)
            .collect();
        assert_eq!(titles, vec!["b", "e", "a", "c", "d"]);
    }
}
