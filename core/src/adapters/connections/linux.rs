//! Linux connection source implementation using ss.

use std::path::Path;
use std::process::Stdio;
use std::sync::OnceLock;

use regex::Regex;
use tokio::process::Command;
use tracing::debug;

use crate::error::{Error, Result};
use crate::ports::{ConnectionRecord, Scope, AF_INET, AF_INET6, SOCK_DGRAM, SOCK_STREAM};

use super::utils::Utils;
use super::Lister;

const SS_CANDIDATES: &[&str] = &["/usr/sbin/ss", "/usr/bin/ss", "/sbin/ss", "/bin/ss"];

fn users_regex() -> Option<&'static Regex> {
    static USERS: OnceLock<Option<Regex>> = OnceLock::new();
    USERS
        .get_or_init(|| Regex::new(r#"users:\(\("(.+?)",pid=(\d+),fd=(\d+)\)"#).ok())
        .as_ref()
}

fn ss_args(scope: Scope, family: u32) -> Vec<&'static str> {
    let mut args = vec!["-Hanp"];
    match scope {
        Scope::Tcp | Scope::Tcp4 | Scope::Tcp6 => args.push("-t"),
        Scope::Udp | Scope::Udp4 | Scope::Udp6 => args.push("-u"),
        Scope::All => args.extend(["-t", "-u"]),
    }
    args.push(if family == AF_INET6 { "-6" } else { "-4" });
    args
}

/// Address families ss has to be run for.
fn families(scope: Scope) -> Vec<u32> {
    match scope {
        Scope::Tcp4 | Scope::Udp4 => vec![AF_INET],
        Scope::Tcp6 | Scope::Udp6 => vec![AF_INET6],
        Scope::All | Scope::Tcp | Scope::Udp => vec![AF_INET, AF_INET6],
    }
}

/// Linux-specific connection source.
pub struct LinuxConnections {
    ss_path: String,
}

impl LinuxConnections {
    pub fn new() -> Self {
        let ss_path = SS_CANDIDATES
            .iter()
            .find(|candidate| Path::new(candidate).exists())
            .map(|p| p.to_string())
            .unwrap_or_else(|| "ss".to_string());
        Self { ss_path }
    }

    /// Run ss for one address family.
    ///
    /// Executes: `ss -Hanp -t -u -4` (or `-6`)
    ///
    /// -H, --no-header     Suppress header line
    /// -a, --all           listening and non-listening sockets
    /// -n, --numeric       don't resolve service names
    /// -p, --processes     show process using socket
    async fn run_ss(&self, scope: Scope, family: u32) -> Result<String> {
        let output = Command::new(&self.ss_path)
            .args(ss_args(scope, family))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| Error::CommandFailed(format!("Failed to run ss: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::CommandFailed(format!("ss exited with {}: {}", output.status, stderr.trim())));
        }

        String::from_utf8(output.stdout)
            .map_err(|e| Error::ParseError(format!("Invalid UTF-8 in ss output: {}", e)))
    }

    /// Parse ss output into connection records.
    ///
    /// Expected ss output format:
    /// ```text
    /// tcp   LISTEN 0      4096       127.0.0.1:631        0.0.0.0:*     users:(("cupsd",pid=812,fd=7))
    /// udp   UNCONN 0      0            0.0.0.0:5353       0.0.0.0:*     users:(("avahi-daemon",pid=640,fd=12))
    /// ```
    ///
    /// Sockets without a `users:` column (owned by other users when not
    /// running as root) are reported with pid 0.
    fn parse_ss_output(&self, output: &str, family: u32) -> Vec<ConnectionRecord> {
        let mut records = Vec::new();

        for line in output.lines() {
            let components: Vec<&str> = line.split_whitespace().collect();
            if components.len() < 6 {
                continue;
            }

            let socket_type = match components[0] {
                "tcp" => SOCK_STREAM,
                "udp" => SOCK_DGRAM,
                // Kept so the engine can drop it as an unknown shape.
                _ => 0,
            };

            let Some((local_ip, local_port)) = Utils::parse_address(components[4]) else {
                debug!(line, "Skipping ss line with unparsable local address");
                continue;
            };
            let (remote_ip, remote_port) = Utils::parse_peer(components[5]);

            let pid = users_regex()
                .and_then(|re| re.captures(line))
                .and_then(|caps| caps[2].parse().ok())
                .unwrap_or(0);

            let status = match (socket_type, components[1]) {
                (SOCK_DGRAM, "UNCONN") => String::new(),
                (_, state) => state.to_string(),
            };

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

impl Default for LinuxConnections {
    fn default() -> Self {
        Self::new()
    }
}

impl Lister for LinuxConnections {
    async fn list(&self, scope: Scope) -> Result<Vec<ConnectionRecord>> {
        let mut records = Vec::new();
        for family in families(scope) {
            let stdout = self.run_ss(scope, family).await?;
            records.extend(self.parse_ss_output(&stdout, family));
        }
        debug!(?scope, records = records.len(), "Listed sockets with ss");
        Ok(records)
    }
}
