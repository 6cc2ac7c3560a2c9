//! adprobe CLI: traffic-shaping load runs against filtered GET endpoints
//!
//! ## Usage
//!
//! ```bash
//! adprobe init                              # Write adprobe.yaml
//! adprobe validate -c adprobe.yaml          # Check a scenario
//! adprobe variants -c adprobe.yaml          # Preview one iteration's URLs
//! adprobe run -c adprobe.yaml               # Run and print the report
//! adprobe run -c adprobe.yaml --vus 50 --duration 1m --format json
//! ```

use adprobe_cli::{
    handlers, logging, Cli, CliConfig, CliError, CliResult, Commands, LogFormat, Verbosity,
};
use clap::Parser;
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> CliResult<()> {
    let cli = Cli::parse();
    let config = build_config(&cli);
    logging::init_tracing(&config)?;

    match cli.command {
        Commands::Run(args) => {
            let rt = tokio::runtime::Runtime::new()
                .map_err(|e| CliError::setup(format!("Failed to create async runtime: {e}")))?;
            rt.block_on(handlers::execute_run(&config, &args))
        }
        Commands::Validate(args) => handlers::execute_validate(&config, &args),
        Commands::Variants(args) => handlers::execute_variants(&config, &args),
        Commands::Init(args) => handlers::execute_init(&config, &args),
    }
}

fn build_config(cli: &Cli) -> CliConfig {
    CliConfig::new()
        .with_verbosity(Verbosity::from_flags(cli.quiet, cli.verbose))
        .with_log_format(LogFormat::from(cli.log_format))
}
