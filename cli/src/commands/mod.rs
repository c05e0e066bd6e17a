//! Non-interactive commands.

pub mod config;
pub mod kill;
pub mod list;
