use crate::collectors::audit::AuditResult;
use crate::collectors::network::NetworkScanResult;
use crate::collectors::tools::{ToolAssessment, ToolStatus};
use crate::findings::Finding;
use crate::report::Report;

/// Render a report as a self-contained HTML page.
///
/// Every system- or user-derived string is escaped; free-text fields keep
/// their line breaks as `<br>`.
pub fn render(report: &Report) -> String {
    let s = &report.summary;

    format!(
        r##"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>Security Assessment Report - {hostname}</title>
<style>
  :root {{
    --bg: #0d1117; --fg: #c9d1d9; --border: #30363d;
    --card: #161b22; --badge-crit: #f85149; --badge-high: #f0883e;
    --badge-med: #d29922; --badge-low: #58a6ff; --badge-info: #8b949e;
    --ok: #3fb950;
  }}
  * {{ margin: 0; padding: 0; box-sizing: border-box; }}
  body {{ font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Helvetica, Arial, sans-serif;
    background: var(--bg); color: var(--fg); line-height: 1.5; padding: 2rem; }}
  .container {{ max-width: 1200px; margin: 0 auto; }}
  header {{ display: flex; align-items: center; justify-content: space-between;
    padding: 1.5rem; background: var(--card); border: 1px solid var(--border);
    border-radius: 8px; margin-bottom: 1.5rem; }}
  header h1 {{ font-size: 1.4rem; }}
  header p {{ font-size: 0.85rem; color: var(--badge-info); }}
  .level {{ font-size: 1.2rem; font-weight: 700; padding: 0.4rem 1.2rem;
    border-radius: 6px; color: #000; }}
  .level.critical {{ background: var(--badge-crit); color: #fff; }}
  .level.high {{ background: var(--badge-high); }}
  .level.medium {{ background: var(--badge-med); }}
  .level.low {{ background: var(--ok); }}
  .summary {{ display: grid; grid-template-columns: repeat(auto-fit, minmax(140px, 1fr));
    gap: 1rem; margin-bottom: 1.5rem; }}
  .stat {{ background: var(--card); border: 1px solid var(--border);
    border-radius: 8px; padding: 1rem; text-align: center; }}
  .stat .count {{ font-size: 2rem; font-weight: 700; }}
  .stat .label {{ font-size: 0.85rem; color: var(--badge-info); }}
  .stat.critical .count {{ color: var(--badge-crit); }}
  .stat.high .count {{ color: var(--badge-high); }}
  .stat.medium .count {{ color: var(--badge-med); }}
  .stat.low .count {{ color: var(--badge-low); }}
  .stat.info .count {{ color: var(--badge-info); }}
  section {{ background: var(--card); border: 1px solid var(--border);
    border-radius: 8px; padding: 1.25rem; margin-bottom: 1.5rem; }}
  section h2 {{ font-size: 1.1rem; margin-bottom: 0.75rem; }}
  section h3 {{ font-size: 0.95rem; margin: 0.75rem 0 0.4rem; }}
  section p, section li {{ font-size: 0.9rem; }}
  section ul {{ margin-left: 1.5rem; }}
  pre {{ background: var(--bg); padding: 0.5rem; border-radius: 4px;
    overflow-x: auto; font-size: 0.8rem; }}
  table {{ width: 100%; border-collapse: collapse; }}
  th {{ text-align: left; padding: 0.6rem 0.8rem; border-bottom: 2px solid var(--border);
    font-size: 0.8rem; text-transform: uppercase; color: var(--badge-info); }}
  td {{ padding: 0.5rem 0.8rem; border-bottom: 1px solid var(--border);
    font-size: 0.9rem; vertical-align: top; }}
  .installed {{ color: var(--ok); }}
  .missing {{ color: var(--badge-high); }}
  .warn {{ color: var(--badge-high); font-weight: 700; }}
  .finding {{ border-left: 4px solid var(--border); padding: 0.5rem 0 0.5rem 1rem;
    margin-bottom: 1rem; }}
  .finding.critical {{ border-left-color: var(--badge-crit); }}
  .finding.high {{ border-left-color: var(--badge-high); }}
  .finding.medium {{ border-left-color: var(--badge-med); }}
  .finding.low {{ border-left-color: var(--badge-low); }}
  .finding.info {{ border-left-color: var(--badge-info); }}
  .badge {{ display: inline-block; padding: 0.15rem 0.5rem; border-radius: 4px;
    font-size: 0.75rem; font-weight: 700; color: #fff; margin-right: 0.5rem; }}
  .badge.critical {{ background: var(--badge-crit); }}
  .badge.high {{ background: var(--badge-high); }}
  .badge.medium {{ background: var(--badge-med); color: #000; }}
  .badge.low {{ background: var(--badge-low); color: #000; }}
  .badge.info {{ background: var(--badge-info); color: #000; }}
  .empty {{ text-align: center; padding: 2rem; color: var(--ok); }}
  footer {{ margin-top: 1.5rem; text-align: center; font-size: 0.8rem;
    color: var(--badge-info); }}
</style>
</head>
<body>
<div class="container">
  <header>
    <div>
      <h1>Security Assessment Report</h1>
      <p>Hostname: {hostname} | Date: {date} | Scan ID: {scan_id}</p>
    </div>
    <div class="level {level_class}">{level}</div>
  </header>

  <div class="summary">
    <div class="stat"><div class="count">{score}</div><div class="label">Weighted risk score</div></div>
    <div class="stat"><div class="count">{total}</div><div class="label">Total findings</div></div>
    <div class="stat critical"><div class="count">{critical}</div><div class="label">Critical</div></div>
    <div class="stat high"><div class="count">{high}</div><div class="label">High</div></div>
    <div class="stat medium"><div class="count">{medium}</div><div class="label">Medium</div></div>
    <div class="stat low"><div class="count">{low}</div><div class="label">Low</div></div>
    <div class="stat info"><div class="count">{info}</div><div class="label">Info</div></div>
  </div>

  <section>
    <h2>Network Discovery</h2>
    {network}
  </section>

  <section>
    <h2>System Audit</h2>
    {audit}
  </section>

  <section>
    <h2>Tool Configuration &amp; Recommendations</h2>
    {tools}
  </section>

  <section>
    <h2>Detailed Findings</h2>
    {findings}
  </section>

  <footer>
    Generated by pansec {version}
  </footer>
</div>
</body>
</html>"##,
        hostname = html_escape(&report.hostname),
        date = report.timestamp.format("%Y-%m-%d %H:%M:%S"),
        scan_id = html_escape(&report.scan_id),
        level_class = report.risk.level.as_str(),
        level = report.risk.level,
        score = report.risk.score,
        total = s.total,
        critical = s.critical,
        high = s.high,
        medium = s.medium,
        low = s.low,
        info = s.info,
        network = network_section(report.network_scan.as_ref()),
        audit = audit_section(report.audit_result.as_ref()),
        tools = tools_section(report.tool_assessment.as_ref()),
        findings = findings_section(&report.findings),
        version = env!("CARGO_PKG_VERSION"),
    )
}

fn network_section(net: Option<&NetworkScanResult>) -> String {
    let Some(net) = net else {
        return "<p>No network scan data available.</p>".into();
    };

    let hosts: String = net
        .active_hosts
        .iter()
        .map(|h| {
            let mut line = html_escape(&h.ip);
            if let Some(name) = &h.hostname {
                line.push_str(&format!(" ({})", html_escape(name)));
            }
            if let Some(mac) = &h.mac_address {
                line.push_str(&format!(" - {}", html_escape(mac)));
                if let Some(vendor) = &h.vendor {
                    line.push_str(&format!(" {}", html_escape(vendor)));
                }
            }
            format!("<li>{line}</li>")
        })
        .collect();

    format!(
        r#"<p><strong>Primary IP:</strong> {primary}</p>
    <p><strong>Network range:</strong> {range}</p>
    <p><strong>Interfaces:</strong> {interfaces}</p>
    <h3>Active Hosts ({count})</h3>
    <ul>{hosts}</ul>"#,
        primary = html_escape(net.primary_ip.as_deref().unwrap_or("-")),
        range = html_escape(net.network_range.as_deref().unwrap_or("-")),
        interfaces = html_escape(&net.interfaces.join(", ")),
        count = net.active_hosts.len(),
        hosts = hosts,
    )
}

fn audit_section(audit: Option<&AuditResult>) -> String {
    let Some(audit) = audit else {
        return "<p>No audit data available.</p>".into();
    };

    let updates = if audit.security_updates_count > 0 {
        format!(
            r#"<p class="warn"><strong>Security Updates:</strong> {} pending!</p>
    <pre>{}</pre>"#,
            audit.security_updates_count,
            html_escape(&audit.security_updates_details.join("\n"))
        )
    } else {
        "<p>System is up to date.</p>".to_string()
    };

    let failed = if audit.failed_logins_count > 0 {
        format!(
            r#"<h3>Failed Logins ({})</h3>
    <pre>{}</pre>"#,
            audit.failed_logins_count,
            html_escape(&audit.failed_logins_details.join("\n"))
        )
    } else {
        "<h3>Failed Logins</h3>\n    <p>None recorded.</p>".to_string()
    };

    format!(
        r#"<p><strong>OS:</strong> {os}</p>
    <p><strong>Kernel:</strong> {kernel}</p>
    <p><strong>Uptime:</strong> {uptime}</p>
    <p><strong>Firewall:</strong> {firewall}</p>
    {updates}
    <h3>Open Ports</h3>
    <pre>{listening}</pre>
    {failed}
    <h3>Users with Login Shell</h3>
    <p>{users}</p>"#,
        os = html_escape(&audit.system_info.os),
        kernel = html_escape(&audit.system_info.kernel),
        uptime = html_escape(&audit.system_info.uptime),
        firewall = html_escape(&audit.firewall_status),
        updates = updates,
        listening = html_escape(&audit.listening_services.join("\n")),
        failed = failed,
        users = html_escape(&audit.users_with_shell.join(", ")),
    )
}

fn tools_section(tools: Option<&ToolAssessment>) -> String {
    let Some(tools) = tools else {
        return "<p>Tool assessment was skipped.</p>".into();
    };

    let rows: String = tools
        .tools
        .iter()
        .map(|t| {
            let status = match t.status {
                ToolStatus::Installed => {
                    let version = t
                        .version
                        .as_deref()
                        .map(|v| format!("<br><small>{}</small>", html_escape(v)))
                        .unwrap_or_default();
                    format!(r#"<span class="installed">✔ Installed</span>{version}"#)
                }
                ToolStatus::Missing => r#"<span class="missing">⚠ Missing</span>"#.to_string(),
            };
            format!(
                r#"<tr>
  <td><strong>{name}</strong></td>
  <td>{category}</td>
  <td>{status}</td>
  <td>{description}</td>
</tr>"#,
                name = html_escape(&t.name),
                category = t.category,
                status = status,
                description = html_escape(&t.description),
            )
        })
        .collect();

    format!(
        r#"<table>
  <thead>
    <tr><th>Tool</th><th>Category</th><th>Status</th><th>Description</th></tr>
  </thead>
  <tbody>
    {rows}
  </tbody>
</table>"#
    )
}

fn findings_section(findings: &[Finding]) -> String {
    if findings.is_empty() {
        return "<div class=\"empty\">No vulnerabilities detected.</div>".into();
    }

    findings
        .iter()
        .map(|f| {
            let class = f.severity.as_str();
            let remediation = f
                .remediation
                .as_deref()
                .map(|r| format!("<p><strong>Remediation:</strong> {}</p>", text_block(r)))
                .unwrap_or_default();
            let evidence = f
                .evidence
                .as_deref()
                .map(|e| format!("<pre>{}</pre>", html_escape(e)))
                .unwrap_or_default();
            format!(
                r#"<div class="finding {class}">
      <h3><span class="badge {class}">{severity}</span>{title}</h3>
      <p>{description}</p>
      {remediation}
      {evidence}
    </div>
    "#,
                class = class,
                severity = f.severity,
                title = html_escape(&f.title),
                description = text_block(&f.description),
                remediation = remediation,
                evidence = evidence,
            )
        })
        .collect()
}

/// Escape, then turn newlines into `<br>`.
fn text_block(s: &str) -> String {
    html_escape(s).replace("\r\n", "\n").replace('\n', "<br>\n")
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
