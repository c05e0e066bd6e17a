//! Connection source adapters.
//!
//! Platform-specific implementations of socket enumeration.

#[cfg(target_os = "macos")]
mod darwin;

#[cfg(target_os = "linux")]
mod linux;

#[cfg(target_os = "windows")]
mod windows;

#[cfg(unix)]
mod utils;

use crate::error::Result;
use crate::ports::{ConnectionRecord, ConnectionSource, Scope};

/// The connection source backed by the host's socket tools.
pub struct SystemConnections {
    #[cfg(target_os = "macos")]
    inner: darwin::DarwinConnections,

    #[cfg(target_os = "linux")]
    inner: linux::LinuxConnections,

    #[cfg(target_os = "windows")]
    inner: windows::WindowsConnections,
}

impl SystemConnections {
    /// Create a connection source for the current platform.
    pub fn new() -> Self {
        Self {
            #[cfg(target_os = "macos")]
            inner: darwin::DarwinConnections::new(),

            #[cfg(target_os = "linux")]
            inner: linux::LinuxConnections::new(),

            #[cfg(target_os = "windows")]
            inner: windows::WindowsConnections::new(),
        }
    }
}

impl Default for SystemConnections {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionSource for SystemConnections {
    async fn list_connections(&self, scope: Scope) -> Result<Vec<ConnectionRecord>> {
        self.inner.list(scope).await
    }
}

/// Internal trait for platform-specific implementations.
trait Lister: Send + Sync {
    fn list(
        &self,
        scope: Scope,
    ) -> impl std::future::Future<Output = Result<Vec<ConnectionRecord>>> + Send;
}
