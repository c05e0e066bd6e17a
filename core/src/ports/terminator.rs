//! Process terminator port (interface).

use crate::error::Result;

/// Port for terminating processes.
///
/// Implementations handle platform-specific signal handling. Both
/// operations fail with [`Error::ProcessNotFound`](crate::Error::ProcessNotFound)
/// or [`Error::PermissionDenied`](crate::Error::PermissionDenied).
pub trait ProcessTerminator: Send + Sync {
    /// Ask the process to exit (SIGTERM).
    fn terminate(&self, pid: u32) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Kill the process immediately (SIGKILL).
    fn force_kill(&self, pid: u32) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Check if a process is still running.
    fn is_running(&self, pid: u32) -> bool;
}
