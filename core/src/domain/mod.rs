//! Domain layer - Pure business logic and data models.
//!
//! This module contains domain entities that represent core business concepts.
//! These types have no I/O dependencies and can be tested in isolation.

mod filter;
mod process;
mod snapshot;

// Re-export all domain types
pub use filter::{filter_processes, FilterState, ProtocolScope, ReadOptions, SearchQuery};
pub use process::{format_endpoint, ConnectionStatus, Process, Protocol};
pub use snapshot::Snapshot;
