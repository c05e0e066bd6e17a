//! Kill command - terminate a process by PID.

use std::time::Duration;

use anyhow::{bail, Result};
use portman_core::adapters::SystemResolver;
use portman_core::ports::ProcessResolver;
use portman_core::SystemEngine;
use serde::Serialize;
use tracing::info;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct KillReport {
    pid: u32,
    name: Option<String>,
    forced: bool,
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

pub async fn run(pid: u32, force: bool, json: bool, timeout: Duration) -> Result<()> {
    let name = SystemResolver::new().resolve(pid).await.ok().map(|m| m.name);
    let engine = SystemEngine::system().with_kill_timeout(timeout);

    info!(pid, force, "Killing process");
    let result = if force {
        engine.force_kill(pid).await
    } else {
        engine.kill(pid).await
    };

    let label = match &name {
        Some(name) => format!("{} (PID {})", name, pid),
        None => format!("PID {}", pid),
    };

    if json {
        let report = KillReport {
            pid,
            name,
            forced: force,
            success: result.is_ok(),
            error: result.as_ref().err().map(|e| e.to_string()),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        if result.is_err() {
            std::process::exit(1);
        }
        return Ok(());
    }

    match result {
        Ok(()) => {
            println!("Killed {}", label);
            Ok(())
        }
        Err(e) => bail!("Failed to kill {}: {}", label, e),
    }
}
