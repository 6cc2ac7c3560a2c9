//! Run command handler

use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::{ReportFormat, RunArgs};
use adprobe::config::format_duration;
use adprobe::{parse_duration, render_json, render_text, ExecutionProfile, LoadConfig, RunReport};

/// Apply command-line overrides to a scenario
pub fn apply_overrides(mut scenario: LoadConfig, args: &RunArgs) -> CliResult<LoadConfig> {
    if let Some(ref base_url) = args.base_url {
        scenario.base_url.clone_from(base_url);
    }
    match (args.vus, args.duration.as_deref()) {
        (Some(vus), Some(duration)) => {
            scenario.profile = ExecutionProfile::flat(vus, parse_duration(duration)?);
        }
        (None, None) => {}
        _ => {
            return Err(CliError::invalid_argument(
                "--vus and --duration must be given together",
            ))
        }
    }
    Ok(scenario)
}

/// Render a report in the requested format
pub fn render_report(report: &RunReport, format: ReportFormat) -> CliResult<String> {
    Ok(match format {
        ReportFormat::Text => render_text(report),
        ReportFormat::Json => render_json(report)?,
    })
}

/// Execute the run command
pub async fn execute_run(config: &CliConfig, args: &RunArgs) -> CliResult<()> {
    tracing::debug!(path = %args.config.display(), "loading scenario");
    let scenario = apply_overrides(LoadConfig::load(&args.config)?, args)?;
    let plan = scenario.validate()?;

    if !config.verbosity.is_quiet() && args.format == ReportFormat::Text {
        println!(
            "Load testing {} (scenario={}, peak vus={}, duration={})\n",
            plan.base_url(),
            plan.name(),
            plan.profile().peak_target(),
            format_duration(plan.profile().total_duration()),
        );
    }

    let report = adprobe::execute(plan).await?;
    let rendered = render_report(&report, args.format)?;
    println!("{rendered}");

    if let Some(ref output_path) = args.output {
        std::fs::write(output_path, &rendered)?;
        if !config.verbosity.is_quiet() && args.format == ReportFormat::Text {
            println!("Results written to {}", output_path.display());
        }
    }

    if args.fail_on_check && report.has_failures() {
        tracing::warn!(failed = report.totals.failed(), "checks failed");
        return Err(CliError::ChecksFailed {
            failed: report.totals.failed(),
            completed: report.totals.completed(),
        });
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::Duration;

    fn args() -> RunArgs {
        RunArgs {
            config: PathBuf::from("scenario.yaml"),
            base_url: None,
            vus: None,
            duration: None,
            format: ReportFormat::Text,
            output: None,
            fail_on_check: false,
        }
    }

    fn scenario() -> LoadConfig {
        LoadConfig::ad_filters("http://localhost:3000/api/v1/ad")
    }

    #[test]
    fn test_no_overrides_keeps_scenario() {
        let out = apply_overrides(scenario(), &args()).unwrap();
        assert_eq!(out, scenario());
    }

    #[test]
    fn test_base_url_override() {
        let mut args = args();
        args.base_url = Some("http://staging:8080/api/v1/ad".to_string());
        let out = apply_overrides(scenario(), &args).unwrap();
        assert_eq!(out.base_url, "http://staging:8080/api/v1/ad");
    }

    #[test]
    fn test_flat_override() {
        let mut args = args();
        args.vus = Some(25);
        args.duration = Some("1m30s".to_string());
        let out = apply_overrides(scenario(), &args).unwrap();
        assert_eq!(
            out.profile,
            ExecutionProfile::flat(25, Duration::from_secs(90))
        );
    }

    #[test]
    fn test_bad_duration_is_config_error() {
        let mut args = args();
        args.vus = Some(5);
        args.duration = Some("soon".to_string());
        let err = apply_overrides(scenario(), &args).unwrap_err();
        assert!(err.to_string().contains("Configuration error"));
    }

    #[test]
    fn test_vus_without_duration_rejected() {
        let mut args = args();
        args.vus = Some(5);
        assert!(apply_overrides(scenario(), &args).is_err());
    }
}
