pub mod finding;
pub mod risk;

pub use finding::{sort_by_severity, Finding, Severity};
pub use risk::{RiskAssessment, RiskConfig, RiskLevel, RiskThresholds, RiskWeights, ScanSummary};
