//! Structural filters, free-text search, and read-time scope options.
//!
//! Everything in this module is pure: it takes a slice of [`Process`]
//! records and returns the matching subset in the original order.

use serde::{Deserialize, Serialize};

use super::{Process, Protocol};

// ============================================================================
// FilterState
// ============================================================================

/// The four structural filter toggles of the interactive view.
///
/// Toggles are not independent: turning one criterion on switches off the
/// criteria it contradicts, so the combined predicate is always satisfiable.
/// UDP sockets are never in LISTEN state, so switching UDP-only on also
/// drops LISTEN-only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterState {
    tcp_only: bool,
    udp_only: bool,
    listen_only: bool,
    established_only: bool,
}

impl FilterState {
    /// Create a filter with every criterion off.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tcp_only(&self) -> bool {
        self.tcp_only
    }

    pub fn udp_only(&self) -> bool {
        self.udp_only
    }

    pub fn listen_only(&self) -> bool {
        self.listen_only
    }

    pub fn established_only(&self) -> bool {
        self.established_only
    }

    /// Toggle TCP-only. Turning it on clears UDP-only.
    pub fn toggle_tcp(&mut self) {
        self.tcp_only = !self.tcp_only;
        if self.tcp_only {
            self.udp_only = false;
        }
    }

    /// Toggle UDP-only. Turning it on clears TCP-only and LISTEN-only.
    pub fn toggle_udp(&mut self) {
        self.udp_only = !self.udp_only;
        if self.udp_only {
            self.tcp_only = false;
            self.listen_only = false;
        }
    }

    /// Toggle LISTEN-only. Turning it on clears ESTABLISHED-only.
    pub fn toggle_listen(&mut self) {
        self.listen_only = !self.listen_only;
        if self.listen_only {
            self.established_only = false;
        }
    }

    /// Toggle ESTABLISHED-only. Turning it on clears LISTEN-only.
    pub fn toggle_established(&mut self) {
        self.established_only = !self.established_only;
        if self.established_only {
            self.listen_only = false;
        }
    }

    /// Turn every criterion off.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Check if any criterion is on.
    pub fn is_active(&self) -> bool {
        self.tcp_only || self.udp_only || self.listen_only || self.established_only
    }

    /// Short labels of the active criteria, in a stable order.
    pub fn active_labels(&self) -> Vec<&'static str> {
        let mut labels = Vec::new();
        if self.tcp_only {
            labels.push("TCP");
        }
        if self.udp_only {
            labels.push("UDP");
        }
        if self.listen_only {
            labels.push("LISTEN");
        }
        if self.established_only {
            labels.push("ESTABLISHED");
        }
        labels
    }

    /// Check if a record satisfies every active criterion.
    pub fn allows(&self, process: &Process) -> bool {
        if self.tcp_only && !process.protocol.as_str().starts_with("TCP") {
            return false;
        }
        if self.udp_only && !process.protocol.as_str().starts_with("UDP") {
            return false;
        }
        if self.listen_only && !process.status.eq_ignore_case("LISTEN") {
            return false;
        }
        if self.established_only && !process.status.eq_ignore_case("ESTABLISHED") {
            return false;
        }
        true
    }
}

// ============================================================================
// SearchQuery
// ============================================================================

/// A whitespace-tokenized, lower-cased search query.
///
/// A record matches when every token is a substring of at least one of its
/// searchable fields. The empty query matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    tokens: Vec<String>,
}

impl SearchQuery {
    /// Tokenize raw user input.
    pub fn parse(raw: &str) -> Self {
        let tokens = raw
            .trim()
            .to_lowercase()
            .split_whitespace()
            .map(str::to_string)
            .collect();
        Self { tokens }
    }

    /// The parsed tokens.
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Check if a record matches every token.
    pub fn matches(&self, process: &Process) -> bool {
        if self.is_empty() {
            return true;
        }

        let fields = [
            process.name.to_lowercase(),
            process.pid.to_string(),
            process.protocol.as_str().to_lowercase(),
            process.port.to_string(),
            process.status.as_str().to_lowercase(),
            process.local_addr.to_lowercase(),
        ];

        self.tokens
            .iter()
            .all(|token| fields.iter().any(|field| field.contains(token.as_str())))
    }
}

/// Apply the structural filter and then the search query.
///
/// The result preserves the input order.
pub fn filter_processes(
    processes: &[Process],
    filter: &FilterState,
    query: &SearchQuery,
) -> Vec<Process> {
    processes
        .iter()
        .filter(|p| filter.allows(p) && query.matches(p))
        .cloned()
        .collect()
}

// ============================================================================
// ReadOptions
// ============================================================================

/// Protocol universe requested by a caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolScope {
    #[default]
    All,
    Tcp,
    Udp,
    Tcp4,
    Tcp6,
    Udp4,
    Udp6,
}

impl ProtocolScope {
    /// Check if a protocol falls inside this scope.
    pub fn includes(&self, protocol: Protocol) -> bool {
        match self {
            ProtocolScope::All => true,
            ProtocolScope::Tcp => protocol.is_tcp(),
            ProtocolScope::Udp => protocol.is_udp(),
            ProtocolScope::Tcp4 => protocol == Protocol::Tcp,
            ProtocolScope::Tcp6 => protocol == Protocol::Tcp6,
            ProtocolScope::Udp4 => protocol == Protocol::Udp,
            ProtocolScope::Udp6 => protocol == Protocol::Udp6,
        }
    }
}

impl std::str::FromStr for ProtocolScope {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" => Ok(ProtocolScope::All),
            "tcp" => Ok(ProtocolScope::Tcp),
            "udp" => Ok(ProtocolScope::Udp),
            "tcp4" => Ok(ProtocolScope::Tcp4),
            "tcp6" => Ok(ProtocolScope::Tcp6),
            "udp4" => Ok(ProtocolScope::Udp4),
            "udp6" => Ok(ProtocolScope::Udp6),
            other => Err(format!("invalid protocol: {}", other)),
        }
    }
}

/// Scope predicates applied when reading from the snapshot engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadOptions {
    /// Protocols to include.
    #[serde(default)]
    pub protocol: ProtocolScope,
    /// Only this local port.
    #[serde(default)]
    pub port: Option<u16>,
    /// Case-insensitive substring of the process name.
    #[serde(default)]
    pub name: Option<String>,
    /// Only sockets in LISTEN state.
    #[serde(default)]
    pub listen_only: bool,
}

impl ReadOptions {
    /// Options that keep every record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if any predicate is set.
    pub fn is_active(&self) -> bool {
        self.protocol != ProtocolScope::All
            || self.port.is_some()
            || self.name.as_deref().is_some_and(|n| !n.is_empty())
            || self.listen_only
    }

    /// Check if a record passes every set predicate.
    pub fn matches(&self, process: &Process) -> bool {
        if !self.protocol.includes(process.protocol) {
            return false;
        }
        if let Some(port) = self.port {
            if process.port != port {
                return false;
            }
        }
        if self.listen_only && !process.is_listening() {
            return false;
        }
        if let Some(ref name) = self.name {
            if !process.name.to_lowercase().contains(&name.to_lowercase()) {
                return false;
            }
        }
        true
    }

    /// Restrict to a protocol scope.
    pub fn with_protocol(mut self, protocol: ProtocolScope) -> Self {
        self.protocol = protocol;
        self
    }

    /// Restrict to a local port.
    pub fn with_port(mut self, port: Option<u16>) -> Self {
        self.port = port;
        self
    }

    /// Restrict to process names containing `name`.
    pub fn with_name(mut self, name: Option<String>) -> Self {
        self.name = name;
        self
    }

    /// Enable/disable listen-only mode.
    pub fn with_listen_only(mut self, enabled: bool) -> Self {
        self.listen_only = enabled;
        self
    }
}

// ============================================================================
// Tests
// ============================================================================
