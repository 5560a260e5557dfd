use std::net::{Ipv4Addr, SocketAddr, TcpStream};
use std::time::Duration;

use super::{Collector, CollectorOutput, ScanContext};
use crate::findings::{Finding, Severity};

/// Database ports probed on localhost, in probe order.
pub const DB_PORTS: [(u16, &str); 4] = [
    (3306, "MySQL"),
    (5432, "PostgreSQL"),
    (27017, "MongoDB"),
    (6379, "Redis"),
];

/// Flags database services accepting connections on 127.0.0.1.
///
/// Any accepted connection is reported, whatever address the service is
/// actually bound to; the remediation asks the operator to check.
pub struct DatabasePortCollector {
    ports: Vec<(u16, String)>,
}

impl Default for DatabasePortCollector {
    fn default() -> Self {
        Self::with_ports(DB_PORTS.iter().map(|&(p, n)| (p, n.to_string())))
    }
}

impl DatabasePortCollector {
    pub fn with_ports<I, S>(ports: I) -> Self
    where
        I: IntoIterator<Item = (u16, S)>,
        S: Into<String>,
    {
        Self {
            ports: ports.into_iter().map(|(p, n)| (p, n.into())).collect(),
        }
    }
}

impl Collector for DatabasePortCollector {
    fn name(&self) -> &'static str {
        "db_ports"
    }

    fn collect(&self, ctx: &ScanContext<'_>) -> CollectorOutput {
        let timeout = ctx.config.scan.port_probe_timeout();
        let findings = self
            .ports
            .iter()
            .filter(|(port, _)| is_port_open(*port, timeout))
            .map(|(port, service)| open_port_finding(*port, service))
            .collect();
        CollectorOutput::findings(findings)
    }
}

fn is_port_open(port: u16, timeout: Duration) -> bool {
    let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, port));
    match TcpStream::connect_timeout(&addr, timeout) {
        Ok(_) => true,
        Err(e) => {
            tracing::trace!(port, error = %e, "port closed");
            false
        }
    }
}

fn open_port_finding(port: u16, service: &str) -> Finding {
    Finding::new(
        format!("{service} Port Open"),
        format!(
            "{service} is listening on port {port}. Ensure it is not exposed to public network."
        ),
        Severity::Medium,
    )
    .with_remediation(format!("Check binding for {service}. Should be 127.0.0.1."))
    .with_evidence(format!("127.0.0.1:{port} accepted a TCP connection"))
}
