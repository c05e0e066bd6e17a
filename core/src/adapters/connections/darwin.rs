//! macOS connection source implementation using lsof.

use std::process::Stdio;

use tokio::process::Command;
use tracing::debug;

use crate::error::{Error, Result};
use crate::ports::{ConnectionRecord, Scope, AF_INET, AF_INET6, SOCK_DGRAM, SOCK_STREAM};

use super::utils::Utils;
use super::Lister;

/// macOS-specific connection source using lsof.
pub struct DarwinConnections;

impl DarwinConnections {
    pub fn new() -> Self {
        Self
    }

    fn lsof_selector(scope: Scope) -> &'static str {
        match scope {
            Scope::All => "-i",
            Scope::Tcp => "-iTCP",
            Scope::Udp => "-iUDP",
            Scope::Tcp4 => "-i4TCP",
            Scope::Tcp6 => "-i6TCP",
            Scope::Udp4 => "-i4UDP",
            Scope::Udp6 => "-i6UDP",
        }
    }

    /// Parse lsof output into connection records.
    ///
    /// Expected lsof output format:
    /// ```text
    /// COMMAND    PID  USER   FD   TYPE             DEVICE SIZE/OFF NODE NAME
    /// node     34805  code   19u  IPv6 0x3d8015e195af1f3f      0t0  TCP [::1]:3000 (LISTEN)
    /// Safari     812  code   41u  IPv4 0x9a1f0c2b33d4e5f6      0t0  TCP 10.0.0.4:50122->17.1.2.3:443 (ESTABLISHED)
    /// mDNSRespo  301  root    9u  IPv4 0x1234567890abcdef      0t0  UDP *:5353
    /// ```
    fn parse_lsof_output(&self, output: &str) -> Vec<ConnectionRecord> {
        let mut records = Vec::new();

        for line in output.lines().skip(1) {
            let components: Vec<&str> = line.split_whitespace().collect();
            if components.len() < 9 {
                continue;
            }

            let pid: u32 = match components[1].parse() {
                Ok(p) => p,
                Err(_) => continue,
            };

            let family = match components[4] {
                "IPv4" => AF_INET,
                "IPv6" => AF_INET6,
                _ => 0,
            };
            let socket_type = match components[7] {
                "TCP" => SOCK_STREAM,
                "UDP" => SOCK_DGRAM,
                _ => 0,
            };

            let name = components[8];
            let (local, peer) = match name.split_once("->") {
                Some((local, peer)) => (local, Some(peer)),
                None => (name, None),
            };

            let Some((local_ip, local_port)) = Utils::parse_address(local) else {
                debug!(line, "Skipping lsof line with unparsable address");
                continue;
            };
            let (remote_ip, remote_port) = peer.map(Utils::parse_peer).unwrap_or_default();

            let status = components
                .get(9)
                .map(|s| s.trim_start_matches('(').trim_end_matches(')').to_string())
                .unwrap_or_default();

            records.push(ConnectionRecord {
                pid,
                family,
                socket_type,
                local_ip,
                local_port,
                remote_ip,
                remote_port,
                status,
            });
        }

        records
    }
}

impl Default for DarwinConnections {
    fn default() -> Self {
        Self::new()
    }
}

impl Lister for DarwinConnections {
    async fn list(&self, scope: Scope) -> Result<Vec<ConnectionRecord>> {
        let output = Command::new("/usr/sbin/lsof")
            .args([Self::lsof_selector(scope), "-P", "-n", "+c", "0"])
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .output()
            .await
            .map_err(|e| Error::CommandFailed(format!("Failed to run lsof: {}", e)))?;

        let stdout = String::from_utf8(output.stdout)
            .map_err(|e| Error::ParseError(format!("Invalid UTF-8 in lsof output: {}", e)))?;

        Ok(self.parse_lsof_output(&stdout))
    }
}
