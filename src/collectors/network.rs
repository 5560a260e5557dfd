use std::net::{IpAddr, Ipv4Addr, UdpSocket};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{Collector, CollectorOutput, Fact, Platform, ScanContext};
use crate::process::CommandSpec;

/// Well-known external address used to pick the outbound interface.
/// Nothing is sent to it.
const ROUTE_PROBE_ADDR: &str = "1.1.1.1:80";

static REPORT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^Nmap scan report for (?:(\S+) \(([^)]+)\)|(\S+))\s*$").unwrap()
});

static MAC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^MAC Address: ([0-9A-Fa-f:]{17})(?: \((.+)\))?").unwrap());

/// A reachable host on the local network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Host {
    pub ip: String,
    pub hostname: Option<String>,
    pub mac_address: Option<String>,
    pub vendor: Option<String>,
    #[serde(default)]
    pub open_ports: Vec<u16>,
}

impl Host {
    pub fn new(ip: impl Into<String>, hostname: Option<String>) -> Self {
        Self {
            ip: ip.into(),
            hostname,
            mac_address: None,
            vendor: None,
            open_ports: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkScanResult {
    pub interfaces: Vec<String>,
    pub active_hosts: Vec<Host>,
    pub primary_ip: Option<String>,
    pub network_range: Option<String>,
}

/// Interfaces, primary address and (with nmap) live hosts on the /24.
pub struct NetworkCollector;

impl Collector for NetworkCollector {
    fn name(&self) -> &'static str {
        "network"
    }

    fn collect(&self, ctx: &ScanContext<'_>) -> CollectorOutput {
        let primary = primary_ip();
        let network_range = network_range(primary);
        let mut result = NetworkScanResult {
            interfaces: interfaces(ctx),
            active_hosts: Vec::new(),
            primary_ip: Some(primary.to_string()),
            network_range: network_range.clone(),
        };

        match (ctx.runner.which("nmap"), network_range) {
            (Some(_), Some(range)) => {
                result.active_hosts = discover_hosts(ctx, &range);
            }
            (Some(_), None) => {
                tracing::warn!(%primary, "primary address is not IPv4, skipping host discovery");
            }
            (None, _) => {
                tracing::warn!("nmap not found, skipping host discovery");
                result
                    .active_hosts
                    .push(Host::new("127.0.0.1", Some("localhost".into())));
            }
        }

        CollectorOutput::fact(Fact::Network(result))
    }
}

fn interfaces(ctx: &ScanContext<'_>) -> Vec<String> {
    let timeout = ctx.config.scan.command_timeout();
    match ctx.platform {
        Platform::Linux => {
            let out = ctx
                .runner
                .run(&CommandSpec::argv("ip", ["-br", "addr", "show"]), timeout);
            if out.success() {
                parse_ip_brief(&out.stdout)
            } else {
                Vec::new()
            }
        }
        Platform::MacOs => {
            let out = ctx.runner.run(&CommandSpec::argv("ifconfig", ["-l"]), timeout);
            if out.success() {
                out.stdout.split_whitespace().map(String::from).collect()
            } else {
                Vec::new()
            }
        }
        Platform::Other => Vec::new(),
    }
}

/// Names of interfaces reported `UP` by `ip -br addr show`.
pub fn parse_ip_brief(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .filter(|line| line.contains("UP"))
        .filter_map(|line| line.split_whitespace().next())
        .map(String::from)
        .collect()
}

/// Local address the kernel would use to reach the internet, found by
/// connecting a UDP socket without sending anything. Falls back to loopback.
pub fn primary_ip() -> IpAddr {
    let probe = || -> std::io::Result<IpAddr> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.connect(ROUTE_PROBE_ADDR)?;
        Ok(socket.local_addr()?.ip())
    };
    probe().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "could not determine primary address");
        IpAddr::V4(Ipv4Addr::LOCALHOST)
    })
}

/// The /24 containing `ip`. Only IPv4 is supported.
pub fn network_range(ip: IpAddr) -> Option<String> {
    match ip {
        IpAddr::V4(v4) => {
            let [a, b, c, _] = v4.octets();
            Some(format!("{a}.{b}.{c}.0/24"))
        }
        IpAddr::V6(_) => None,
    }
}

fn discover_hosts(ctx: &ScanContext<'_>, range: &str) -> Vec<Host> {
    tracing::info!(range, "scanning range");
    let spec = CommandSpec::argv(
        "nmap",
        ["-sn", ctx.config.scan.nmap_timing.as_str(), range],
    );
    let out = ctx.runner.run(&spec, ctx.config.scan.network_timeout());
    if !out.success() {
        tracing::error!(
            exit_code = out.exit_code,
            stderr = %out.stderr,
            "nmap host discovery failed"
        );
        return Vec::new();
    }
    parse_nmap_hosts(&out.stdout)
}

/// Parse `nmap -sn` output into hosts.
///
/// Handles both `Nmap scan report for 10.0.0.1` and
/// `Nmap scan report for name (10.0.0.1)`, and attaches any following
/// `MAC Address:` line to the preceding host.
pub fn parse_nmap_hosts(stdout: &str) -> Vec<Host> {
    let mut hosts: Vec<Host> = Vec::new();

    for line in stdout.lines().map(str::trim) {
        if let Some(caps) = REPORT_RE.captures(line) {
            let host = match (caps.get(1), caps.get(2), caps.get(3)) {
                (Some(name), Some(ip), _) => {
                    Host::new(ip.as_str(), Some(name.as_str().to_string()))
                }
                (_, _, Some(ip)) => Host::new(ip.as_str(), None),
                _ => continue,
            };
            hosts.push(host);
        } else if let Some(caps) = MAC_RE.captures(line) {
            if let Some(host) = hosts.last_mut() {
                host.mac_address = caps.get(1).map(|m| m.as_str().to_string());
                host.vendor = caps
                    .get(2)
                    .map(|m| m.as_str().to_string())
                    .filter(|v| v != "Unknown");
            }
        }
    }

    hosts
}
