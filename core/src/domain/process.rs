//! Socket-owning process domain models.

use serde::{Deserialize, Serialize};

// ============================================================================
// Protocol
// ============================================================================

/// Transport protocol of a socket, split by address family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Protocol {
    #[serde(rename = "TCP")]
    Tcp,
    #[serde(rename = "TCP6")]
    Tcp6,
    #[serde(rename = "UDP")]
    Udp,
    #[serde(rename = "UDP6")]
    Udp6,
}

impl Protocol {
    /// Get the display name for this protocol.
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Tcp => "TCP",
            Protocol::Tcp6 => "TCP6",
            Protocol::Udp => "UDP",
            Protocol::Udp6 => "UDP6",
        }
    }

    /// Whether this is a stream (TCP) protocol of either family.
    pub fn is_tcp(&self) -> bool {
        matches!(self, Protocol::Tcp | Protocol::Tcp6)
    }

    /// Whether this is a datagram (UDP) protocol of either family.
    pub fn is_udp(&self) -> bool {
        matches!(self, Protocol::Udp | Protocol::Udp6)
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// ConnectionStatus
// ============================================================================

/// Connection state of a socket.
///
/// `Active` does not exist at the OS level: it is synthesized for
/// connectionless sockets that report no state of their own.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum ConnectionStatus {
    Listen,
    Established,
    Active,
    Closed,
    SynSent,
    SynRecv,
    FinWait1,
    FinWait2,
    TimeWait,
    CloseWait,
    LastAck,
    Closing,
    /// A state name the parser does not know about, kept verbatim.
    Other(String),
}

impl ConnectionStatus {
    /// Get the canonical upper-case name of this status.
    pub fn as_str(&self) -> &str {
        match self {
            ConnectionStatus::Listen => "LISTEN",
            ConnectionStatus::Established => "ESTABLISHED",
            ConnectionStatus::Active => "ACTIVE",
            ConnectionStatus::Closed => "CLOSED",
            ConnectionStatus::SynSent => "SYN_SENT",
            ConnectionStatus::SynRecv => "SYN_RECV",
            ConnectionStatus::FinWait1 => "FIN_WAIT1",
            ConnectionStatus::FinWait2 => "FIN_WAIT2",
            ConnectionStatus::TimeWait => "TIME_WAIT",
            ConnectionStatus::CloseWait => "CLOSE_WAIT",
            ConnectionStatus::LastAck => "LAST_ACK",
            ConnectionStatus::Closing => "CLOSING",
            ConnectionStatus::Other(s) => s,
        }
    }

    /// Parse a state name as reported by `ss`, `lsof` or `netstat`.
    ///
    /// Matching is case-insensitive and accepts `-` as well as `_`
    /// separators (`TIME-WAIT`, `time_wait`). Returns `None` for an empty
    /// string, which callers treat as "no native state".
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }

        let normalized = trimmed.to_uppercase().replace('-', "_");
        let status = match normalized.as_str() {
            "LISTEN" => ConnectionStatus::Listen,
            "ESTABLISHED" | "ESTAB" => ConnectionStatus::Established,
            "ACTIVE" => ConnectionStatus::Active,
            "CLOSED" | "CLOSE" => ConnectionStatus::Closed,
            "SYN_SENT" => ConnectionStatus::SynSent,
            "SYN_RECV" | "SYN_RECEIVED" => ConnectionStatus::SynRecv,
            "FIN_WAIT1" | "FIN_WAIT_1" => ConnectionStatus::FinWait1,
            "FIN_WAIT2" | "FIN_WAIT_2" => ConnectionStatus::FinWait2,
            "TIME_WAIT" => ConnectionStatus::TimeWait,
            "CLOSE_WAIT" => ConnectionStatus::CloseWait,
            "LAST_ACK" => ConnectionStatus::LastAck,
            "CLOSING" => ConnectionStatus::Closing,
            _ => ConnectionStatus::Other(normalized),
        };
        Some(status)
    }

    /// Case-insensitive comparison against a status name.
    pub fn eq_ignore_case(&self, name: &str) -> bool {
        self.as_str().eq_ignore_ascii_case(name)
    }
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<ConnectionStatus> for String {
    fn from(status: ConnectionStatus) -> Self {
        status.as_str().to_string()
    }
}

impl From<String> for ConnectionStatus {
    fn from(raw: String) -> Self {
        ConnectionStatus::parse(&raw).unwrap_or(ConnectionStatus::Other(raw))
    }
}

// ============================================================================
// Process
// ============================================================================

/// A socket together with the process that owns it.
///
/// One record per socket: a process with several sockets appears once per
/// socket within a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Process {
    /// Process ID of the socket owner.
    pub pid: u32,
    /// Display name of the process. Empty when unknown.
    pub name: String,
    /// Local port number.
    pub port: u16,
    /// Transport protocol.
    pub protocol: Protocol,
    /// Connection state.
    pub status: ConnectionStatus,
    /// Local endpoint as `ip:port`.
    pub local_addr: String,
    /// Remote endpoint as `ip:port`, `*:*` when there is no peer.
    pub remote_addr: String,
}

impl Process {
    /// Name to show to a user, falling back to a generic label.
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            "process"
        } else {
            &self.name
        }
    }

    /// Whether the socket is in the LISTEN state.
    pub fn is_listening(&self) -> bool {
        self.status == ConnectionStatus::Listen
    }
}

impl std::fmt::Display for Process {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} (PID: {}, Process: {}, {})",
            self.protocol,
            self.local_addr,
            self.pid,
            self.display_name(),
            self.status
        )
    }
}

/// Format an `ip:port` endpoint, bracketing bare IPv6 addresses.
pub fn format_endpoint(ip: &str, port: u16) -> String {
    if ip.contains(':') && !ip.starts_with('[') {
        format!("[{}]:{}", ip, port)
    } else {
        format!("{}:{}", ip, port)
    }
}

// ============================================================================
// Tests
// ============================================================================
