//! Ports layer - Trait definitions (interfaces).
//!
//! This module defines the interfaces the snapshot engine uses to talk
//! to the operating system. Implementations live in `adapters`.

mod connections;
mod resolver;
mod terminator;

pub use connections::{
    ConnectionRecord, ConnectionSource, Scope, AF_INET, AF_INET6, SOCK_DGRAM, SOCK_STREAM,
};
pub use resolver::{ProcessMeta, ProcessResolver};
pub use terminator::ProcessTerminator;
