//! Variants command handler: preview one iteration's request set

use crate::config::CliConfig;
use crate::error::CliResult;
use crate::VariantsArgs;
use adprobe::{build_variants, LoadConfig, LoadPlan};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Draw once and list every variant the draw produces
pub fn render_variants(plan: &LoadPlan, seed: Option<u64>) -> String {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let draw = plan.dimensions().draw(&mut rng);
    let variants = build_variants(plan.base_url(), &draw, plan.include_bare_url());

    let mut output = String::from("Draw:");
    for entry in draw.entries() {
        output.push_str(&format!(" {}={}", entry.name, entry.value));
    }
    output.push_str(&format!("\n\n{} variants:\n", variants.len()));
    for (i, variant) in variants.variants().iter().enumerate() {
        output.push_str(&format!("  {:>3}  {}\n", i + 1, variant.url()));
    }
    output
}

/// Execute the variants command
pub fn execute_variants(_config: &CliConfig, args: &VariantsArgs) -> CliResult<()> {
    let plan = LoadConfig::load(&args.config)?.validate()?;
    print!("{}", render_variants(&plan, args.seed.or(plan.seed())));
    Ok(())
}
