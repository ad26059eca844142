//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use sm_core::EntityKind;

/// Sewing-line productivity metrics.
///
/// Stores machine logs posted by sewing-line devices and reports production
/// and non-productive time per operator, machine and line.
#[derive(Debug, Parser)]
#[command(name = "sm", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Build a productivity report.
    Report {
        #[command(subcommand)]
        target: ReportTarget,
    },

    /// Ingest device submissions (JSONL) from stdin.
    Import,

    /// Maintain the operator directory.
    #[command(subcommand)]
    Operators(OperatorsAction),

    /// List stored machine logs with hours per mode.
    ///
    /// Each filter can be repeated; logs must match one value of every
    /// filter that is given.
    Logs {
        /// Only logs from this machine.
        #[arg(long = "machine", value_name = "ID")]
        machines: Vec<String>,

        /// Only logs from this line.
        #[arg(long = "line", value_name = "NUMBER")]
        lines: Vec<String>,

        /// Only logs from this operator, by display name or card number.
        #[arg(long = "operator", value_name = "NAME")]
        operators: Vec<String>,

        #[command(flatten)]
        range: RangeArgs,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List the machines, lines or operators active in a date range.
    Ids {
        /// Which kind of id to list.
        #[arg(value_enum)]
        kind: IdKind,

        #[command(flatten)]
        range: RangeArgs,
    },

    /// Show fleet counts and needle efficiency per line.
    Stats {
        #[command(flatten)]
        range: RangeArgs,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show each log's length as a share of a standard shift.
    Efficiency {
        #[command(flatten)]
        range: RangeArgs,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
}

/// Inclusive `YYYY-MM-DD` bounds shared by the read commands.
#[derive(Debug, Clone, Default, Args)]
pub struct RangeArgs {
    /// First date to include (YYYY-MM-DD).
    #[arg(long)]
    pub from: Option<String>,

    /// Last date to include (YYYY-MM-DD).
    #[arg(long)]
    pub to: Option<String>,
}

/// Options shared by every report.
#[derive(Debug, Clone, Default, Args)]
pub struct ReportOptions {
    #[command(flatten)]
    pub range: RangeArgs,

    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}

/// What to report on.
#[derive(Debug, Subcommand)]
pub enum ReportTarget {
    /// One operator by display name, or `All`.
    Operator {
        name: String,
        #[command(flatten)]
        options: ReportOptions,
    },

    /// One machine, or `all`.
    Machine {
        id: String,
        #[command(flatten)]
        options: ReportOptions,
    },

    /// One production line, or `all`.
    Line {
        number: String,
        #[command(flatten)]
        options: ReportOptions,
    },

    /// Production versus non-production for every operator.
    Operators {
        #[command(flatten)]
        options: ReportOptions,
    },
}

/// Operator directory actions.
#[derive(Debug, Subcommand)]
pub enum OperatorsAction {
    /// Add an operator, or rename an existing one.
    Add {
        /// RFID card number.
        id: String,
        /// Display name.
        name: String,
    },

    /// List every operator.
    List {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
}

/// Entity kinds accepted by `sm ids`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum IdKind {
    Machines,
    Lines,
    Operators,
}

impl From<IdKind> for EntityKind {
    fn from(kind: IdKind) -> Self {
        match kind {
            IdKind::Machines => Self::Machine,
            IdKind::Lines => Self::Line,
            IdKind::Operators => Self::Operator,
        }
    }
}
