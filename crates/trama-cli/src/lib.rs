//! Trama command-line driver
//!
//! Subcommands live in [`commands`]; `main.rs` only parses arguments and
//! installs logging.

pub mod commands;
