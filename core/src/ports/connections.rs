//! Connection source port (interface).

use crate::domain::ProtocolScope;
use crate::error::Result;

/// Protocol universe requested from a connection source.
pub type Scope = ProtocolScope;

/// IPv4 address family, as normalised by the adapters.
pub const AF_INET: u32 = 2;
/// IPv6 address family, as normalised by the adapters.
pub const AF_INET6: u32 = 10;
/// Stream socket type.
pub const SOCK_STREAM: u32 = 1;
/// Datagram socket type.
pub const SOCK_DGRAM: u32 = 2;

/// One open socket as reported by the operating system.
///
/// `family` and `socket_type` carry raw numeric codes; the snapshot engine
/// decides which combinations it understands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionRecord {
    /// Owning process, 0 when the OS did not report one.
    pub pid: u32,
    pub family: u32,
    pub socket_type: u32,
    pub local_ip: String,
    pub local_port: u16,
    /// Empty when the socket has no peer.
    pub remote_ip: String,
    pub remote_port: u16,
    /// Native state name, empty for connectionless sockets.
    pub status: String,
}

/// Port for enumerating open sockets.
///
/// Implementations handle platform-specific details (ss, lsof, ...).
pub trait ConnectionSource: Send + Sync {
    /// List all sockets inside `scope`.
    fn list_connections(
        &self,
        scope: Scope,
    ) -> impl std::future::Future<Output = Result<Vec<ConnectionRecord>>> + Send;
}
