//! Portman Core Library
//!
//! Socket inspection engine behind the `portman` command.
//! Provides functionality to:
//! - Enumerate TCP/UDP sockets and attribute them to processes
//! - Keep a periodically refreshed, atomically published snapshot
//! - Filter and search the snapshot
//! - Terminate processes (gracefully, escalating to SIGKILL)
//!
//! # Architecture
//! This library follows hexagonal architecture (ports & adapters):
//! - `domain`: Pure data model, filters and search
//! - `ports`: Trait definitions (interfaces)
//! - `adapters`: External system implementations
//! - `engine`: The snapshot engine driving the ports
//!
//! # Platform Support
//! - Linux: Uses `ss` and `/proc`
//! - macOS: Uses `lsof` and `ps`
//! - Windows: not supported

// Hexagonal architecture layers
pub mod adapters;
pub mod domain;
pub mod ports;

pub mod config;
pub mod engine;
pub mod error;

// Re-export domain types (primary API)
pub use domain::{
    filter_processes, ConnectionStatus, FilterState, Process, Protocol, ProtocolScope,
    ReadOptions, SearchQuery, Snapshot,
};

// Re-export other commonly used types
pub use config::{Config, ConfigStore};
pub use engine::{EngineStats, SnapshotEngine, SystemEngine, DEFAULT_KILL_TIMEOUT};
pub use error::{Error, Result};
