//! Subcommand implementations.

pub mod common;
pub mod config;
pub mod init;
pub mod locate;
pub mod run;
