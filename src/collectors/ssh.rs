use std::path::Path;

use super::{Collector, CollectorOutput, ScanContext};
use crate::findings::{Finding, Severity};

/// Flags SSH daemon settings that weaken authentication.
///
/// - `PermitRootLogin yes` → CRITICAL
/// - `PasswordAuthentication yes` → MEDIUM
///
/// A missing `sshd_config` produces no findings.
pub struct SshConfigCollector;

impl Collector for SshConfigCollector {
    fn name(&self) -> &'static str {
        "ssh"
    }

    fn collect(&self, ctx: &ScanContext<'_>) -> CollectorOutput {
        CollectorOutput::findings(check_sshd_config(&ctx.paths.sshd_config))
    }
}

/// Read and evaluate an sshd config file.
pub fn check_sshd_config(path: &Path) -> Vec<Finding> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "sshd_config not present, skipping");
        return Vec::new();
    }
    match std::fs::read_to_string(path) {
        Ok(content) => evaluate(&SshdConfig::parse(&content), path),
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "failed to read sshd_config");
            Vec::new()
        }
    }
}

fn evaluate(config: &SshdConfig, path: &Path) -> Vec<Finding> {
    let mut findings = Vec::new();

    if let Some(d) = config.enabled("PermitRootLogin") {
        findings.push(
            Finding::new(
                "SSH Root Login Enabled",
                "SSH allows direct root login.",
                Severity::Critical,
            )
            .with_remediation(format!("Set 'PermitRootLogin no' in {}", path.display()))
            .with_evidence(d.evidence()),
        );
    }

    if let Some(d) = config.enabled("PasswordAuthentication") {
        findings.push(
            Finding::new(
                "SSH Password Authentication Enabled",
                "Password auth is enabled. Key-based auth is recommended.",
                Severity::Medium,
            )
            .with_remediation(format!(
                "Set 'PasswordAuthentication no' in {}",
                path.display()
            ))
            .with_evidence(d.evidence()),
        );
    }

    findings
}

/// One `Keyword value` line from sshd_config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    /// Keyword, lower-cased.
    pub key: String,
    pub value: String,
    pub line: usize,
    /// Whether the line sits inside a `Match` block.
    pub conditional: bool,
}

impl Directive {
    fn evidence(&self) -> String {
        let scope = if self.conditional { " (Match block)" } else { "" };
        format!("line {}: {} {}{}", self.line, self.key, self.value, scope)
    }
}

/// Line-based sshd_config reader.
///
/// Accepts `Key value`, `Key=value` and `Key = "value"`, ignores comments
/// and blank lines, and matches keywords case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SshdConfig {
    pub directives: Vec<Directive>,
}

impl SshdConfig {
    pub fn parse(content: &str) -> Self {
        let mut directives = Vec::new();
        let mut in_match = false;

        for (idx, raw) in content.lines().enumerate() {
            let line = strip_comment(raw).trim();
            if line.is_empty() {
                continue;
            }

            let Some((key, value)) = split_directive(line) else {
                continue;
            };
            let key = key.to_lowercase();
            if key == "match" {
                in_match = true;
                continue;
            }

            directives.push(Directive {
                key,
                value: unquote(value).to_string(),
                line: idx + 1,
                conditional: in_match,
            });
        }

        Self { directives }
    }

    /// Effective global value: sshd keeps the first occurrence.
    pub fn get(&self, key: &str) -> Option<&Directive> {
        let key = key.to_lowercase();
        self.directives
            .iter()
            .find(|d| !d.conditional && d.key == key)
    }

    /// The first line that sets `key` to `yes`. Global lines are preferred
    /// over `Match` block overrides; a later duplicate still counts.
    pub fn enabled(&self, key: &str) -> Option<&Directive> {
        let key = key.to_lowercase();
        let mut matching = self
            .directives
            .iter()
            .filter(|d| d.key == key && is_yes(&d.value));
        let first = matching.next()?;
        if !first.conditional {
            return Some(first);
        }
        matching.find(|d| !d.conditional).or(Some(first))
    }
}

fn is_yes(value: &str) -> bool {
    value.eq_ignore_ascii_case("yes")
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(pos) => &line[..pos],
        None => line,
    }
}

fn split_directive(line: &str) -> Option<(&str, &str)> {
    let end = line.find(|c: char| c.is_whitespace() || c == '=')?;
    let key = &line[..end];
    let rest = line[end..].trim_start();
    let value = rest.strip_prefix('=').unwrap_or(rest).trim();
    if key.is_empty() || value.is_empty() {
        return None;
    }
    Some((key, value))
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn findings_for(content: &str) -> Vec<Finding> {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        check_sshd_config(file.path())
    }

    #[test]
    fn root_login_only() {
        let findings = findings_for("PermitRootLogin yes\n");
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Critical);
        assert_eq!(findings[0].title, "SSH Root Login Enabled");
        assert!(!findings.iter().any(|f| f.severity == Severity::Medium));
    }

    #[test]
    fn password_auth_is_medium() {
        let findings = findings_for("PasswordAuthentication yes\n");
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Medium);
    }

    #[test]
    fn both_directives() {
        let findings = findings_for("PermitRootLogin yes\nPasswordAuthentication yes\n");
        let severities: Vec<Severity> = findings.iter().map(|f| f.severity).collect();
        assert_eq!(severities, vec![Severity::Critical, Severity::Medium]);
    }

    #[test]
    fn missing_file_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(check_sshd_config(&dir.path().join("sshd_config")).is_empty());
    }

    #[test]
    fn hardened_config_yields_nothing() {
        let findings = findings_for(
            "# PermitRootLogin yes\nPermitRootLogin no\nPasswordAuthentication no\n",
        );
        assert!(findings.is_empty());
    }

    #[test]
    fn tolerates_formatting_variance() {
        let findings = findings_for("  permitrootlogin   \"YES\"  # legacy\nPasswordAuthentication=yes\n");
        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].evidence.as_deref(), Some("line 1: permitrootlogin YES"));
    }

    #[test]
    fn later_duplicate_directive_is_flagged() {
        let findings = findings_for("PermitRootLogin no\nPermitRootLogin yes\n");
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Critical);
        assert_eq!(findings[0].evidence.as_deref(), Some("line 2: permitrootlogin yes"));
    }

    #[test]
    fn match_block_override_is_flagged() {
        let findings = findings_for(
            "PasswordAuthentication no\nMatch Address 10.0.0.0/8\n    PasswordAuthentication yes\n",
        );
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Medium);
        assert!(findings[0].evidence.as_deref().unwrap().contains("Match block"));
    }

    #[test]
    fn parse_skips_keyword_without_value() {
        let config = SshdConfig::parse("PermitRootLogin\nPort 22\n");
        assert_eq!(config.directives.len(), 1);
        assert_eq!(config.get("port").map(|d| d.value.as_str()), Some("22"));
    }
}
