//! Windows connection source placeholder.

use crate::error::{Error, Result};
use crate::ports::{ConnectionRecord, Scope};

use super::Lister;

/// Windows-specific connection source.
pub struct WindowsConnections;

impl WindowsConnections {
    pub fn new() -> Self {
        Self
    }
}

impl Default for WindowsConnections {
    fn default() -> Self {
        Self::new()
    }
}

impl Lister for WindowsConnections {
    async fn list(&self, _scope: Scope) -> Result<Vec<ConnectionRecord>> {
        Err(Error::UnsupportedPlatform(
            "socket enumeration is not available on Windows".to_string(),
        ))
    }
}
