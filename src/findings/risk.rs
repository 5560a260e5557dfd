use serde::{Deserialize, Serialize};

use super::{Finding, Severity};
use crate::error::{PanSecError, Result};

/// Per-severity finding counts. Only ever derived from a finding collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSummary {
    pub total: usize,
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub info: usize,
}

impl ScanSummary {
    pub fn from_findings(findings: &[Finding]) -> Self {
        let mut summary = Self::default();
        for f in findings {
            summary.record(f.severity);
        }
        summary
    }

    fn record(&mut self, severity: Severity) {
        self.total += 1;
        match severity {
            Severity::Critical => self.critical += 1,
            Severity::High => self.high += 1,
            Severity::Medium => self.medium += 1,
            Severity::Low => self.low += 1,
            Severity::Info => self.info += 1,
        }
    }

    pub fn count(&self, severity: Severity) -> usize {
        match severity {
            Severity::Critical => self.critical,
            Severity::High => self.high,
            Severity::Medium => self.medium,
            Severity::Low => self.low,
            Severity::Info => self.info,
        }
    }
}

/// Coarse classification of a weighted score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "LOW"),
            Self::Medium => write!(f, "MEDIUM"),
            Self::High => write!(f, "HIGH"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Weighted score plus its classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// Sum of per-finding weights. Not capped.
    pub score: u64,
    pub level: RiskLevel,
}

/// Points contributed by one finding of each severity. Info findings
/// always contribute zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskWeights {
    pub critical: u64,
    pub high: u64,
    pub medium: u64,
    pub low: u64,
}

impl Default for RiskWeights {
    fn default() -> Self {
        Self {
            critical: 10,
            high: 5,
            medium: 2,
            low: 1,
        }
    }
}

impl RiskWeights {
    pub fn weight(&self, severity: Severity) -> u64 {
        match severity {
            Severity::Critical => self.critical,
            Severity::High => self.high,
            Severity::Medium => self.medium,
            Severity::Low => self.low,
            Severity::Info => 0,
        }
    }
}

/// Minimum scores for each level above LOW. Must be strictly decreasing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskThresholds {
    pub critical: u64,
    pub high: u64,
    pub medium: u64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            critical: 50,
            high: 30,
            medium: 15,
        }
    }
}

impl RiskThresholds {
    pub fn classify(&self, score: u64) -> RiskLevel {
        if score >= self.critical {
            RiskLevel::Critical
        } else if score >= self.high {
            RiskLevel::High
        } else if score >= self.medium {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

/// Risk configuration from the `[risk]` table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskConfig {
    #[serde(default)]
    pub weights: RiskWeights,
    #[serde(default)]
    pub thresholds: RiskThresholds,
}

impl RiskConfig {
    /// Check `critical > high > medium`.
    pub fn validate(&self) -> Result<()> {
        let t = &self.thresholds;
        if t.critical <= t.high {
            return Err(PanSecError::InvalidRiskConfig(format!(
                "critical threshold ({}) must be greater than high threshold ({})",
                t.critical, t.high
            )));
        }
        if t.high <= t.medium {
            return Err(PanSecError::InvalidRiskConfig(format!(
                "high threshold ({}) must be greater than medium threshold ({})",
                t.high, t.medium
            )));
        }
        Ok(())
    }

    /// Tally and score findings in a single pass.
    pub fn aggregate(&self, findings: &[Finding]) -> (ScanSummary, RiskAssessment) {
        let mut summary = ScanSummary::default();
        let mut score: u64 = 0;

        for f in findings {
            summary.record(f.severity);
            score = score.saturating_add(self.weights.weight(f.severity));
        }

        let assessment = RiskAssessment {
            score,
            level: self.thresholds.classify(score),
        };
        (summary, assessment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn findings_of(severity: Severity, n: usize) -> Vec<Finding> {
        (0..n)
            .map(|i| Finding::new(format!("f{i}"), "test", severity))
            .collect()
    }

    #[test]
    fn five_criticals_is_critical() {
        let (summary, risk) = RiskConfig::default().aggregate(&findings_of(Severity::Critical, 5));
        assert_eq!(risk.score, 50);
        assert_eq!(risk.level, RiskLevel::Critical);
        assert_eq!(summary.critical, 5);
    }

    #[test]
    fn six_highs_is_high() {
        let (_, risk) = RiskConfig::default().aggregate(&findings_of(Severity::High, 6));
        assert_eq!(risk.score, 30);
        assert_eq!(risk.level, RiskLevel::High);
    }

    #[test]
    fn no_findings_is_low() {
        let (summary, risk) = RiskConfig::default().aggregate(&[]);
        assert_eq!(risk.score, 0);
        assert_eq!(risk.level, RiskLevel::Low);
        assert_eq!(summary, ScanSummary::default());
    }

    #[test]
    fn info_findings_score_zero() {
        let (summary, risk) = RiskConfig::default().aggregate(&findings_of(Severity::Info, 40));
        assert_eq!(risk.score, 0);
        assert_eq!(summary.info, 40);
    }

    #[test]
    fn score_is_not_capped() {
        let (_, risk) = RiskConfig::default().aggregate(&findings_of(Severity::Critical, 25));
        assert_eq!(risk.score, 250);
        assert_eq!(risk.level, RiskLevel::Critical);
    }

    #[test]
    fn medium_boundary() {
        let (_, below) = RiskConfig::default().aggregate(&findings_of(Severity::Medium, 7));
        assert_eq!(below.score, 14);
        assert_eq!(below.level, RiskLevel::Low);
        let (_, at) = RiskConfig::default().aggregate(&findings_of(Severity::Low, 15));
        assert_eq!(at.level, RiskLevel::Medium);
    }

    #[test]
    fn rejects_non_decreasing_thresholds() {
        let mut config = RiskConfig::default();
        config.thresholds.high = 50;
        assert!(matches!(
            config.validate(),
            Err(PanSecError::InvalidRiskConfig(_))
        ));

        let mut config = RiskConfig::default();
        config.thresholds.medium = 30;
        assert!(config.validate().is_err());

        assert!(RiskConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_medium_threshold_is_valid() {
        let mut config = RiskConfig::default();
        config.thresholds.medium = 0;
        assert!(config.validate().is_ok());
        let (_, risk) = config.aggregate(&[]);
        assert_eq!(risk.level, RiskLevel::Medium);
    }

    fn arb_severity() -> impl Strategy<Value = Severity> {
        prop_oneof![
            Just(Severity::Critical),
            Just(Severity::High),
            Just(Severity::Medium),
            Just(Severity::Low),
            Just(Severity::Info),
        ]
    }

    fn arb_findings() -> impl Strategy<Value = Vec<Finding>> {
        prop::collection::vec(arb_severity(), 0..64).prop_map(|sevs| {
            sevs.into_iter()
                .map(|s| Finding::new("t", "d", s))
                .collect()
        })
    }

    proptest! {
        #[test]
        fn summary_total_matches_buckets(findings in arb_findings()) {
            let summary = ScanSummary::from_findings(&findings);
            prop_assert_eq!(summary.total, findings.len());
            prop_assert_eq!(
                summary.critical + summary.high + summary.medium + summary.low + summary.info,
                summary.total
            );
            for sev in Severity::ALL {
                let expected = findings.iter().filter(|f| f.severity == sev).count();
                prop_assert_eq!(summary.count(sev), expected);
            }
        }

        #[test]
        fn score_is_weighted_count(findings in arb_findings()) {
            let config = RiskConfig::default();
            let (summary, risk) = config.aggregate(&findings);
            let expected: u64 = Severity::ALL
                .iter()
                .map(|&s| config.weights.weight(s) * summary.count(s) as u64)
                .sum();
            prop_assert_eq!(risk.score, expected);
        }

        #[test]
        fn raising_a_weight_never_lowers_score(
            findings in arb_findings(),
            sev in arb_severity(),
            bump in 0u64..20,
        ) {
            let base = RiskConfig::default();
            let mut raised = base;
            match sev {
                Severity::Critical => raised.weights.critical += bump,
                Severity::High => raised.weights.high += bump,
                Severity::Medium => raised.weights.medium += bump,
                Severity::Low => raised.weights.low += bump,
                Severity::Info => {}
            }
            let (_, before) = base.aggregate(&findings);
            let (_, after) = raised.aggregate(&findings);
            prop_assert!(after.score >= before.score);
            prop_assert!(after.level >= before.level);
        }
    }
}
