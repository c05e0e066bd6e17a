//! Process resolver port (interface).

use crate::error::Result;

/// Metadata about a running process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessMeta {
    pub name: String,
}

/// Port for looking up process metadata by PID.
pub trait ProcessResolver: Send + Sync {
    /// Resolve `pid` to its metadata.
    ///
    /// Fails when the process no longer exists or its metadata is not
    /// readable by the current user.
    fn resolve(&self, pid: u32) -> impl std::future::Future<Output = Result<ProcessMeta>> + Send;
}
