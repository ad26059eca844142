//! Sewing-line metrics CLI library.
//!
//! This crate provides the CLI interface over `sm-core` and `sm-db`.

mod cli;
pub mod commands;
mod config;

pub use cli::{Cli, Commands, IdKind, OperatorsAction, RangeArgs, ReportOptions, ReportTarget};
pub use config::Config;
