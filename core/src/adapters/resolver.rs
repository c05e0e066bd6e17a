//! Process name resolution.

use crate::error::{Error, Result};
use crate::ports::{ProcessMeta, ProcessResolver};

/// Resolves process names from the operating system.
///
/// On Linux the name is read from `/proc/<pid>/comm`; elsewhere it falls
/// back to `ps -o comm= -p <pid>`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemResolver;

impl SystemResolver {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(target_os = "linux")]
async fn read_name(pid: u32) -> Result<String> {
    let path = format!("/proc/{}/comm", pid);
    match tokio::fs::read_to_string(&path).await {
        Ok(raw) => Ok(raw.trim_end().to_string()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(Error::ProcessNotFound(pid)),
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            Err(Error::PermissionDenied(format!("cannot read {}", path)))
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(not(target_os = "linux"))]
async fn read_name(pid: u32) -> Result<String> {
    use std::process::Stdio;
    use tokio::process::Command;

    let output = Command::new("ps")
        .args(["-o", "comm=", "-p", &pid.to_string()])
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .output()
        .await
        .map_err(|e| Error::CommandFailed(format!("Failed to run ps: {}", e)))?;

    if !output.status.success() {
        return Err(Error::ProcessNotFound(pid));
    }

    let raw = String::from_utf8_lossy(&output.stdout);
    // ps prints the full executable path on macOS.
    let name = raw.trim().rsplit('/').next().unwrap_or_default().to_string();
    Ok(name)
}

impl ProcessResolver for SystemResolver {
    async fn resolve(&self, pid: u32) -> Result<ProcessMeta> {
        if pid == 0 {
            return Err(Error::ProcessNotFound(pid));
        }
        let name = read_name(pid).await?;
        Ok(ProcessMeta { name })
    }
}
