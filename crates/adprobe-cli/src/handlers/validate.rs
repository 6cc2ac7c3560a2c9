//! Validate command handler

use crate::config::CliConfig;
use crate::error::CliResult;
use crate::ValidateArgs;
use adprobe::config::format_duration;
use adprobe::{variant_count, ExecutionProfile, LoadConfig, LoadPlan, ResultChecker};

/// Human-readable summary of a validated plan
pub fn describe_plan(plan: &LoadPlan) -> String {
    let mut output = String::new();

    output.push_str(&format!("Scenario: {}\n", plan.name()));
    output.push_str(&format!("Target:   {}\n", plan.base_url()));
    output.push_str(&format!("Check:    {}\n\n", plan.expect().description()));

    output.push_str("Dimensions:\n");
    for dimension in plan.dimensions() {
        output.push_str(&format!(
            "  {:<12} {} ({} values)\n",
            dimension.name(),
            dimension.domain(),
            dimension.domain().cardinality()
        ));
    }
    output.push_str(&format!(
        "Variants per iteration: {}{}\n\n",
        variant_count(plan.dimensions().len(), plan.include_bare_url()),
        if plan.include_bare_url() {
            " (bare URL included)"
        } else {
            ""
        }
    ));

    match plan.profile() {
        ExecutionProfile::Flat { vus, duration } => {
            output.push_str(&format!(
                "Profile: flat, {} vus for {}\n",
                vus,
                format_duration(*duration)
            ));
        }
        ExecutionProfile::Staged { start_vus, stages } => {
            output.push_str(&format!(
                "Profile: staged from {} vus, {} total, peak {}\n",
                start_vus,
                format_duration(plan.profile().total_duration()),
                plan.profile().peak_target()
            ));
            for (i, stage) in stages.iter().enumerate() {
                output.push_str(&format!(
                    "  stage {}: {} -> {} vus ({:?})\n",
                    i,
                    format_duration(stage.duration),
                    stage.target,
                    stage.transition
                ));
            }
        }
    }

    output.push_str(&format!(
        "Timing: think {} │ drain {} │ request timeout {} │ tick {}\n",
        format_duration(plan.think_time()),
        format_duration(plan.drain_timeout()),
        format_duration(plan.request_timeout()),
        format_duration(plan.tick())
    ));
    if let Some(seed) = plan.seed() {
        output.push_str(&format!("Seed: {}\n", seed));
    }
    output
}

/// Execute the validate command
pub fn execute_validate(config: &CliConfig, args: &ValidateArgs) -> CliResult<()> {
    tracing::debug!(path = %args.config.display(), "validating scenario");
    let plan = LoadConfig::load(&args.config)?.validate()?;
    if config.verbosity.is_quiet() {
        return Ok(());
    }
    println!("{} is valid\n", args.config.display());
    print!("{}", describe_plan(&plan));
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use adprobe::Stage;
    use std::time::Duration;

    #[test]
    fn test_describe_flat_plan() {
        let plan = LoadConfig::ad_filters("http://localhost:3000/api/v1/ad")
            .validate()
            .unwrap();
        let text = describe_plan(&plan);
        assert!(text.contains("Scenario: ad-filters"));
        assert!(text.contains("Check:    status == 200"));
        assert!(text.contains("age          1..=100 (100 values)"));
        assert!(text.contains("Variants per iteration: 15\n"));
        assert!(text.contains("Profile: flat, 200 vus for 30s"));
        assert!(text.contains("drain 30s"));
        assert!(!text.contains("Seed"));
    }

    #[test]
    fn test_describe_full_integer_range() {
        let plan = LoadConfig::new(
            "http://localhost:3000/api/v1/ad",
            vec![adprobe::DimensionConfig::new(
                "id",
                adprobe::Domain::range(i64::MIN, i64::MAX),
            )],
            ExecutionProfile::flat(1, Duration::from_secs(1)),
        )
        .validate()
        .unwrap();
        let text = describe_plan(&plan);
        assert!(text.contains(&format!("({} values)", u64::MAX)));
    }

    #[test]
    fn test_describe_staged_plan() {
        let plan = LoadConfig::ad_filters("http://localhost:3000/api/v1/ad")
            .with_bare_url(true)
            .with_seed(42)
            .with_profile(ExecutionProfile::staged(vec![
                Stage::ramp(Duration::from_secs(10), 50),
                Stage::step(Duration::from_secs(60), 80),
            ]))
            .validate()
            .unwrap();
        let text = describe_plan(&plan);
        assert!(text.contains("Variants per iteration: 16 (bare URL included)"));
        assert!(text.contains("Profile: staged from 0 vus, 70s total, peak 80"));
        assert!(text.contains("stage 1: 1m -> 80 vus (Step)"));
        assert!(text.contains("Seed: 42"));
    }
}
