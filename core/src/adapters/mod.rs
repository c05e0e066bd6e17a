//! Adapters layer - Implementations of ports.
//!
//! This module contains the concrete implementations that talk to the
//! operating system.

pub mod connections;
mod resolver;
mod terminator;

pub use connections::SystemConnections;
pub use resolver::SystemResolver;
pub use terminator::SignalTerminator;
