use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{Collector, CollectorOutput, Fact, ScanContext};
use crate::process::{CommandOutput, CommandSpec, EXIT_NOT_FOUND};

/// Upper bound on any single version probe.
const VERSION_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ToolCategory {
    Scanning,
    Network,
    Cracking,
    Spoofing,
    Host,
}

impl std::fmt::Display for ToolCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Scanning => write!(f, "Scanning"),
            Self::Network => write!(f, "Network"),
            Self::Cracking => write!(f, "Cracking"),
            Self::Spoofing => write!(f, "Spoofing"),
            Self::Host => write!(f, "Host"),
        }
    }
}

/// One entry in the tool catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolDef {
    /// Executable name looked up on `PATH`.
    pub name: &'static str,
    pub category: ToolCategory,
    pub description: &'static str,
    /// Package name when it differs from the executable.
    pub package: Option<&'static str>,
    /// Arguments that make the tool print its version, if it has any.
    pub version_args: Option<&'static [&'static str]>,
}

impl ToolDef {
    pub fn package_name(&self) -> &'static str {
        self.package.unwrap_or(self.name)
    }
}

const fn tool(
    name: &'static str,
    category: ToolCategory,
    description: &'static str,
    package: Option<&'static str>,
    version_args: Option<&'static [&'static str]>,
) -> ToolDef {
    ToolDef {
        name,
        category,
        description,
        package,
        version_args,
    }
}

use ToolCategory::*;

/// Security tools the inventory looks for.
#[rustfmt::skip]
pub static CATALOG: [ToolDef; 23] = [
    tool("nmap", Scanning, "Network discovery and security auditing.", None, Some(&["--version"])),
    tool("masscan", Scanning, "Fastest Internet port scanner.", None, Some(&["--version"])),
    tool("nikto", Scanning, "Web server scanner.", None, Some(&["-Version"])),
    tool("sqlmap", Scanning, "Automatic SQL injection tool.", None, Some(&["--version"])),
    tool("nuclei", Scanning, "Template based vulnerability scanner.", None, Some(&["-version"])),
    tool("gobuster", Scanning, "Directory/File, DNS and VHost busting tool.", None, Some(&["version"])),
    tool("tcpdump", Network, "Command-line packet analyzer.", None, Some(&["--version"])),
    tool("tshark", Network, "Dump and analyze network traffic.", Some("wireshark"), Some(&["--version"])),
    tool("nc", Network, "Netcat - TCP/IP swiss army knife.", Some("netcat"), None),
    tool("socat", Network, "Multipurpose relay (SOcket CAT).", None, Some(&["-V"])),
    tool("hping3", Network, "Packet assembler/analyzer.", None, Some(&["--version"])),
    tool("hydra", Cracking, "Parallelized login cracker.", None, Some(&["-h"])),
    tool("john", Cracking, "John the Ripper password cracker.", Some("john-jumbo"), Some(&[])),
    tool("hashcat", Cracking, "World's fastest password cracker.", None, Some(&["--version"])),
    tool("medusa", Cracking, "Parallel network login auditor.", None, Some(&["-V"])),
    tool("ettercap", Spoofing, "Comprehensive suite for MITM attacks.", None, Some(&["--version"])),
    tool("bettercap", Spoofing, "Network reconnaissance and MITM attacks.", None, Some(&["-version"])),
    tool("mitmproxy", Spoofing, "Interactive TLS-capable intercepting HTTP proxy.", None, Some(&["--version"])),
    tool("arpspoof", Spoofing, "Intercept packets on a switched LAN (part of dsniff).", Some("dsniff"), None),
    tool("chkrootkit", Host, "Locally checks for signs of a rootkit.", None, Some(&["-V"])),
    tool("rkhunter", Host, "Rootkit Hunter.", None, Some(&["--version"])),
    tool("lynis", Host, "Security auditing tool for systems.", None, Some(&["show", "version"])),
    tool("enum4linux", Host, "Enumerating information from Windows/Samba.", None, None),
];

/// Look up a catalog entry by executable name.
pub fn find_tool(name: &str) -> Option<&'static ToolDef> {
    CATALOG.iter().find(|t| t.name == name)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ToolStatus {
    Installed,
    Missing,
}

impl std::fmt::Display for ToolStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Installed => write!(f, "Installed"),
            Self::Missing => write!(f, "Missing"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    pub status: ToolStatus,
    pub version: Option<String>,
    pub description: String,
    pub category: ToolCategory,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolAssessment {
    pub tools: Vec<ToolInfo>,
}

impl ToolAssessment {
    pub fn missing_count(&self) -> usize {
        self.tools
            .iter()
            .filter(|t| t.status == ToolStatus::Missing)
            .count()
    }
}

/// Records which catalog tools are on `PATH` and their versions.
pub struct ToolInventoryCollector;

impl Collector for ToolInventoryCollector {
    fn name(&self) -> &'static str {
        "tools"
    }

    fn collect(&self, ctx: &ScanContext<'_>) -> CollectorOutput {
        CollectorOutput::fact(Fact::Tools(assess(ctx)))
    }
}

/// Check every catalog entry.
pub fn assess(ctx: &ScanContext<'_>) -> ToolAssessment {
    let tools = CATALOG
        .iter()
        .map(|def| {
            if ctx.runner.which(def.name).is_some() {
                ToolInfo {
                    name: def.name.to_string(),
                    status: ToolStatus::Installed,
                    version: tool_version(ctx, def),
                    description: def.description.to_string(),
                    category: def.category,
                }
            } else {
                ToolInfo {
                    name: def.name.to_string(),
                    status: ToolStatus::Missing,
                    version: None,
                    description: format!("{} (Recommended)", def.description),
                    category: def.category,
                }
            }
        })
        .collect();
    ToolAssessment { tools }
}

/// Tools without a version flag report `"Unknown"`; a failed probe
/// reports nothing.
fn tool_version(ctx: &ScanContext<'_>, def: &ToolDef) -> Option<String> {
    let Some(args) = def.version_args else {
        return Some("Unknown".into());
    };
    let timeout = VERSION_PROBE_TIMEOUT.min(ctx.config.scan.command_timeout());
    let out = ctx
        .runner
        .run(&CommandSpec::argv(def.name, args.iter().copied()), timeout);
    version_line(&out)
}

/// First non-empty output line. Many tools print their banner to stderr
/// or exit non-zero on `-h`, so both streams and any exit code count.
fn version_line(out: &CommandOutput) -> Option<String> {
    if out.timed_out() || out.exit_code == EXIT_NOT_FOUND {
        return None;
    }
    [&out.stdout, &out.stderr]
        .into_iter()
        .flat_map(|s| s.lines())
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collectors::testing::FakeRunner;
    use crate::process::EXIT_TIMEOUT;
    use crate::config::Config;

    #[test]
    fn catalog_names_are_unique() {
        let mut names: Vec<&str> = CATALOG.iter().map(|t| t.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), CATALOG.len());
    }

    #[test]
    fn package_name_mapping() {
        assert_eq!(find_tool("tshark").unwrap().package_name(), "wireshark");
        assert_eq!(find_tool("nmap").unwrap().package_name(), "nmap");
        assert!(find_tool("metasploit").is_none());
    }

    #[test]
    fn installed_and_missing() {
        let config = Config::default();
        let runner = FakeRunner::default()
            .with_executable("nmap")
            .with_executable("nc")
            .with("nmap --version", 0, "Nmap version 7.94 ( https://nmap.org )\nPlatform: x86_64");
        let ctx = ScanContext::new(&config, &runner);
        let assessment = assess(&ctx);

        assert_eq!(assessment.tools.len(), CATALOG.len());
        let nmap = &assessment.tools[0];
        assert_eq!(nmap.status, ToolStatus::Installed);
        assert_eq!(nmap.version.as_deref(), Some("Nmap version 7.94 ( https://nmap.org )"));
        assert_eq!(nmap.description, "Network discovery and security auditing.");

        let nc = assessment.tools.iter().find(|t| t.name == "nc").unwrap();
        assert_eq!(nc.version.as_deref(), Some("Unknown"));

        let masscan = &assessment.tools[1];
        assert_eq!(masscan.status, ToolStatus::Missing);
        assert!(masscan.description.ends_with("(Recommended)"));
        assert_eq!(masscan.version, None);

        assert_eq!(assessment.missing_count(), CATALOG.len() - 2);
    }

    #[test]
    fn failed_version_probe_leaves_version_empty() {
        let config = Config::default();
        let runner = FakeRunner::default()
            .with_executable("nmap")
            .with_executable("masscan")
            .with("nmap --version", EXIT_TIMEOUT, "");
        let ctx = ScanContext::new(&config, &runner);
        let assessment = assess(&ctx);

        let nmap = &assessment.tools[0];
        assert_eq!(nmap.status, ToolStatus::Installed);
        assert_eq!(nmap.version, None);

        // `masscan --version` is not scripted, so the runner answers 127.
        let masscan = &assessment.tools[1];
        assert_eq!(masscan.status, ToolStatus::Installed);
        assert_eq!(masscan.version, None);
    }

    #[test]
    fn version_from_stderr_when_stdout_empty() {
        let out = CommandOutput {
            exit_code: 1,
            stdout: String::new(),
            stderr: "\ntcpdump version 4.99.4".into(),
        };
        assert_eq!(version_line(&out).as_deref(), Some("tcpdump version 4.99.4"));
    }
}
