//! CLI subcommand implementations.

pub mod efficiency;
pub mod ids;
pub mod import;
pub mod logs;
pub mod operators;
pub mod report;
pub mod stats;
mod util;
