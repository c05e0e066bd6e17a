//! Portman CLI - see which processes own which sockets
//!
//! Interactive table of TCP/UDP sockets with search, filters and a
//! confirm-then-kill action, plus one-shot `list` and `kill` commands.

mod commands;
mod tui;

use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;

use clap::{Parser, Subcommand};
use portman_core::{ConfigStore, ProtocolScope, ReadOptions};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use commands::list::OutputFormat;

/// Environment variable holding the log filter.
const LOG_ENV: &str = "PORTMAN_LOG";

#[derive(Parser)]
#[command(name = "portman")]
#[command(author, version, about = "Discover which processes are using which ports")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Filter by specific port number
    #[arg(long, global = true)]
    port: Option<u16>,

    /// Filter by process name (case-insensitive partial match)
    #[arg(long, global = true)]
    process: Option<String>,

    /// Show only listening ports
    #[arg(long, global = true)]
    listen: bool,

    /// Limit to one protocol (tcp, udp, tcp4, tcp6, udp4, udp6)
    #[arg(long, global = true, default_value = "all")]
    protocol: ProtocolScope,

    /// Hide table borders for cleaner output
    #[arg(long, global = true)]
    no_borders: bool,

    /// Seconds between socket polls
    #[arg(long, global = true)]
    interval: Option<u64>,

    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Disable interactive TUI mode
    #[arg(long, global = true)]
    no_tui: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the current sockets and exit
    #[command(alias = "ls")]
    List,

    /// Kill a process by PID
    Kill {
        /// Process ID to kill
        pid: u32,

        /// Force kill (SIGKILL) without graceful shutdown
        #[arg(short, long)]
        force: bool,
    },

    /// Show current configuration
    Config {
        /// Write the effective settings (including flag overrides) to the config file
        #[arg(long)]
        save: bool,
    },
}

impl Cli {
    fn read_options(&self) -> ReadOptions {
        ReadOptions::new()
            .with_protocol(self.protocol)
            .with_port(self.port)
            .with_name(self.process.clone())
            .with_listen_only(self.listen)
    }

    fn wants_tui(&self) -> bool {
        self.command.is_none() && !self.no_tui && !self.json && atty::is(atty::Stream::Stdout)
    }
}

// ============================================================================
// Logging Setup
// ============================================================================

fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default))
}

/// Log directory, following the XDG base directory layout.
fn log_dir() -> Option<PathBuf> {
    if let Ok(xdg_state) = std::env::var("XDG_STATE_HOME") {
        return Some(PathBuf::from(xdg_state).join("portman"));
    }
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".local/state/portman"))
}

/// The TUI owns the terminal, so it logs to a file instead of stderr.
fn init_file_logging() {
    let file = log_dir().and_then(|dir| {
        if let Err(e) = fs::create_dir_all(&dir) {
            eprintln!("Warning: Failed to create log directory {}: {}", dir.display(), e);
            return None;
        }
        let path = dir.join("portman.log");
        match OpenOptions::new().create(true).append(true).open(&path) {
            Ok(file) => Some(file),
            Err(e) => {
                eprintln!("Warning: Failed to open log file {}: {}", path.display(), e);
                None
            }
        }
    });

    match file {
        Some(file) => tracing_subscriber::fmt()
            .with_env_filter(env_filter("portman=info,portman_core=info"))
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .init(),
        None => tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new("off"))
            .init(),
    }
}

fn init_stderr_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter("portman=warn,portman_core=warn"))
        .with_writer(std::io::stderr)
        .init();
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let interactive = cli.wants_tui();

    if interactive {
        init_file_logging();
    } else {
        init_stderr_logging();
    }

    let store = ConfigStore::new()?;
    let mut config = match store.load().await {
        Ok(config) => config,
        Err(e) => {
            warn!(error = %e, "Ignoring unreadable config, using defaults");
            Default::default()
        }
    };
    if let Some(interval) = cli.interval {
        config.refresh_interval = interval;
    }
    config.hide_borders |= cli.no_borders;

    let format = if cli.json {
        OutputFormat::Json
    } else if config.hide_borders {
        OutputFormat::Plain
    } else {
        OutputFormat::Markdown
    };

    match cli.command {
        Some(Commands::List) => {
            commands::list::run(&cli.read_options(), format).await?;
        }
        Some(Commands::Kill { pid, force }) => {
            commands::kill::run(pid, force, cli.json, config.kill_timeout()).await?;
        }
        Some(Commands::Config { save }) => {
            if save {
                commands::config::save(&store, &config).await?;
            }
            commands::config::show(&store, &config, cli.json)?;
        }
        None if interactive => {
            info!(interval = config.refresh_interval, "Portman TUI starting");
            let options = tui::TuiOptions {
                scope: cli.read_options(),
                poll_interval: config.refresh_interval(),
                hide_borders: config.hide_borders,
            };
            tui::run(&config, options).await?;
        }
        None => {
            commands::list::run(&cli.read_options(), format).await?;
        }
    }

    Ok(())
}
