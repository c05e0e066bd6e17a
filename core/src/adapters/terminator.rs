//! Signal-based process terminator.

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::ports::ProcessTerminator;

/// Terminates processes by sending Unix signals.
#[derive(Debug, Default, Clone, Copy)]
pub struct SignalTerminator;

impl SignalTerminator {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(unix)]
mod imp {
    use nix::errno::Errno;
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    use super::*;

    fn to_pid(pid: u32) -> Result<Pid> {
        // pid 0 and negative pids address process groups, never a single process.
        match i32::try_from(pid) {
            Ok(raw) if raw > 0 => Ok(Pid::from_raw(raw)),
            _ => Err(Error::ProcessNotFound(pid)),
        }
    }

    pub(super) fn send(pid: u32, signal: Signal) -> Result<()> {
        debug!(pid, ?signal, "Sending signal to process");
        match kill(to_pid(pid)?, signal) {
            Ok(()) => Ok(()),
            Err(Errno::ESRCH) => Err(Error::ProcessNotFound(pid)),
            Err(Errno::EPERM) => {
                warn!(pid, "Permission denied to signal process");
                Err(Error::PermissionDenied(format!(
                    "not allowed to signal process {}",
                    pid
                )))
            }
            Err(errno) => Err(Error::KillFailed {
                pid,
                reason: errno.desc().to_string(),
            }),
        }
    }

    pub(super) fn alive(pid: u32) -> bool {
        match to_pid(pid) {
            // Signal 0 only performs the existence and permission checks.
            Ok(target) => matches!(kill(target, None), Ok(()) | Err(Errno::EPERM)),
            Err(_) => false,
        }
    }
}

#[cfg(unix)]
impl ProcessTerminator for SignalTerminator {
    async fn terminate(&self, pid: u32) -> Result<()> {
        imp::send(pid, nix::sys::signal::Signal::SIGTERM)
    }

    async fn force_kill(&self, pid: u32) -> Result<()> {
        imp::send(pid, nix::sys::signal::Signal::SIGKILL)
    }

    fn is_running(&self, pid: u32) -> bool {
        imp::alive(pid)
    }
}

#[cfg(not(unix))]
impl ProcessTerminator for SignalTerminator {
    async fn terminate(&self, _pid: u32) -> Result<()> {
        Err(Error::UnsupportedPlatform(
            "signals are only available on Unix".to_string(),
        ))
    }

    async fn force_kill(&self, _pid: u32) -> Result<()> {
        Err(Error::UnsupportedPlatform(
            "signals are only available on Unix".to_string(),
        ))
    }

    fn is_running(&self, _pid: u32) -> bool {
        false
    }
}
