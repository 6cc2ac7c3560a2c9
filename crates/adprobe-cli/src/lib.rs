//! adprobe CLI library
//!
//! Command parsing, logging setup and the subcommand handlers behind the
//! `adprobe` binary.

#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::format_push_string)]
#![allow(clippy::missing_errors_doc)]

mod commands;
mod config;
mod error;
pub mod handlers;
pub mod logging;

pub use commands::{
    Cli, Commands, InitArgs, LogFormatArg, ReportFormat, RunArgs, ValidateArgs, VariantsArgs,
};
pub use config::{CliConfig, LogFormat, Verbosity};
pub use error::{CliError, CliResult};
