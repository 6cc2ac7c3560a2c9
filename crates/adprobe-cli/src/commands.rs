//! CLI command definitions using clap

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// adprobe: shape concurrent GET traffic across every filter combination of an endpoint
#[derive(Parser, Debug)]
#[command(name = "adprobe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log line format
    #[arg(long, value_enum, default_value = "text", global = true)]
    pub log_format: LogFormatArg,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a load scenario and print the report
    Run(RunArgs),

    /// Validate a scenario file and summarize the plan
    Validate(ValidateArgs),

    /// Print one random draw and every request variant it produces
    Variants(VariantsArgs),

    /// Write the default ad-filter scenario
    Init(InitArgs),
}

/// Arguments for the run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Scenario file (YAML)
    #[arg(short, long)]
    pub config: PathBuf,

    /// Override the scenario's base URL
    #[arg(long)]
    pub base_url: Option<String>,

    /// Replace the profile with a flat one of N virtual users (needs --duration)
    #[arg(long, requires = "duration")]
    pub vus: Option<u32>,

    /// Duration of the flat override profile, e.g. 30s or 1m30s
    #[arg(long, requires = "vus")]
    pub duration: Option<String>,

    /// Report format
    #[arg(long, value_enum, default_value = "text")]
    pub format: ReportFormat,

    /// Also write the report to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Exit non-zero when any completed iteration failed
    #[arg(long)]
    pub fail_on_check: bool,
}

/// Arguments for the validate command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Scenario file (YAML)
    #[arg(short, long)]
    pub config: PathBuf,
}

/// Arguments for the variants command
#[derive(Parser, Debug)]
pub struct VariantsArgs {
    /// Scenario file (YAML)
    #[arg(short, long)]
    pub config: PathBuf,

    /// Seed for the draw (defaults to the scenario seed, then random)
    #[arg(long)]
    pub seed: Option<u64>,
}

/// Arguments for the init command
#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Where to write the scenario
    #[arg(short, long, default_value = "adprobe.yaml")]
    pub output: PathBuf,

    /// Base URL written into the scenario
    #[arg(long, default_value = "http://localhost:3000/api/v1/ad")]
    pub base_url: String,

    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

/// Report format
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    /// Terminal table
    #[default]
    Text,
    /// Pretty-printed JSON
    Json,
}

/// Log format argument
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormatArg {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

impl From<LogFormatArg> for crate::config::LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Text => Self::Text,
            LogFormatArg::Json => Self::Json,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run() {
        let cli = Cli::try_parse_from([
            "adprobe",
            "-v",
            "run",
            "-c",
            "scenario.yaml",
            "--vus",
            "10",
            "--duration",
            "5s",
            "--format",
            "json",
            "--fail-on-check",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 1);
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.config, PathBuf::from("scenario.yaml"));
                assert_eq!(args.vus, Some(10));
                assert_eq!(args.duration.as_deref(), Some("5s"));
                assert_eq!(args.format, ReportFormat::Json);
                assert!(args.fail_on_check);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_vus_requires_duration() {
        let result = Cli::try_parse_from(["adprobe", "run", "-c", "s.yaml", "--vus", "10"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        let result = Cli::try_parse_from(["adprobe", "-q", "-v", "validate", "-c", "s.yaml"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_init_defaults() {
        let cli = Cli::try_parse_from(["adprobe", "init"]).unwrap();
        match cli.command {
            Commands::Init(args) => {
                assert_eq!(args.output, PathBuf::from("adprobe.yaml"));
                assert!(!args.force);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_global_log_format() {
        let cli =
            Cli::try_parse_from(["adprobe", "variants", "-c", "s.yaml", "--log-format", "json"])
                .unwrap();
        assert_eq!(cli.log_format, LogFormatArg::Json);
    }
}
