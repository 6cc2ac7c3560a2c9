//! Init command handler

use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::InitArgs;
use adprobe::LoadConfig;

/// Write the default ad-filter scenario
pub fn execute_init(config: &CliConfig, args: &InitArgs) -> CliResult<()> {
    if args.output.exists() && !args.force {
        return Err(CliError::invalid_argument(format!(
            "{} already exists (use --force to overwrite)",
            args.output.display()
        )));
    }

    let scenario = LoadConfig::ad_filters(&args.base_url);
    // Catch a bad --base-url before writing a file that cannot run
    scenario.validate()?;
    scenario.save(&args.output)?;

    if !config.verbosity.is_quiet() {
        println!("Created: {}", args.output.display());
    }
    Ok(())
}
