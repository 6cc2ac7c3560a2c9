//! Run reports.
//!
//! A [`RunReport`] is the only thing a run hands to the outside world. It is
//! rendered as a terminal table or as JSON.

use crate::aggregate::AggregateSnapshot;
use crate::check::ResultChecker;
use crate::config::LoadPlan;
use crate::scheduler::{ConcurrencySample, ScheduleResult};
use serde::{Deserialize, Serialize};

/// Final summary of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Scenario name
    pub name: String,
    /// Target base URL
    pub base_url: String,
    /// RFC 3339 time the report was produced
    pub timestamp: String,
    /// Run length including drain, seconds
    pub elapsed_secs: f64,
    /// Check applied to every response
    pub expectation: String,
    /// Highest profile target
    pub peak_target: u32,
    /// Highest active worker count observed
    pub peak_active: usize,
    /// Outcome counters
    pub totals: AggregateSnapshot,
    /// Passed share of completed iterations, percent
    pub pass_rate: f64,
    /// Completed iterations per second
    pub throughput_rps: f64,
    /// Concurrency per controller tick
    pub timeline: Vec<ConcurrencySample>,
}

impl RunReport {
    /// Assemble a report from a finished run
    pub fn new(
        plan: &LoadPlan,
        checker: &dyn ResultChecker,
        totals: AggregateSnapshot,
        schedule: ScheduleResult,
    ) -> Self {
        let elapsed_secs = schedule.elapsed.as_secs_f64();
        let throughput_rps = if elapsed_secs > 0.0 {
            totals.completed() as f64 / elapsed_secs
        } else {
            0.0
        };
        Self {
            name: plan.name().to_string(),
            base_url: plan.base_url().to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            elapsed_secs,
            expectation: checker.description(),
            peak_target: plan.profile().peak_target(),
            peak_active: schedule.peak_active,
            pass_rate: totals.pass_rate(),
            throughput_rps,
            totals,
            timeline: schedule.timeline,
        }
    }

    /// Any completed iteration failed its check or its request
    pub fn has_failures(&self) -> bool {
        self.totals.failed() > 0
    }
}

/// Render a report as a terminal table
pub fn render_text(report: &RunReport) -> String {
    let totals = &report.totals;
    let mut output = String::new();

    output.push_str(&format!("LOAD TEST RESULTS: {}\n", report.name));
    output.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");

    output.push_str(&format!(
        "Target: {} │ Check: {}\n",
        report.base_url, report.expectation
    ));
    output.push_str(&format!(
        "Duration: {:.1}s │ Iterations: {} │ Passed: {} ({:.2}%) │ Failed: {} │ Aborted: {}\n",
        report.elapsed_secs,
        totals.total,
        totals.passed,
        report.pass_rate,
        totals.failed(),
        totals.aborted
    ));
    output.push_str(&format!(
        "Throughput: {:.1} req/s │ Peak VUs: {} (target {})\n\n",
        report.throughput_rps, report.peak_active, report.peak_target
    ));

    let latency = &totals.latency;
    output.push_str("Latency:\n");
    output.push_str(&format!(
        "  min {}ms │ mean {}ms │ p50 {}ms │ p95 {}ms │ p99 {}ms │ max {}ms\n\n",
        latency.min_ms,
        latency.mean_ms,
        latency.p50_ms,
        latency.p95_ms,
        latency.p99_ms,
        latency.max_ms
    ));

    if totals.failed() > 0 {
        output.push_str("Failures:\n");
        for (label, count) in [
            ("unexpected status", totals.failed_status),
            ("connection", totals.failed_connection),
            ("timeout", totals.failed_timeout),
            ("other", totals.failed_other),
        ] {
            if count > 0 {
                output.push_str(&format!("  {:<18} {}\n", label, count));
            }
        }
        output.push('\n');
    }

    output.push_str("Variant Shapes:\n");
    output.push_str("┌──────────────────────────────┬─────────┬─────────┐\n");
    output.push_str("│ Shape                        │ Count   │ Failed  │\n");
    output.push_str("├──────────────────────────────┼─────────┼─────────┤\n");
    for (shape, stats) in &totals.shapes {
        output.push_str(&format!(
            "│ {:<28} │ {:>7} │ {:>7} │\n",
            truncate(shape, 28),
            stats.count,
            stats.failed
        ));
    }
    output.push_str("└──────────────────────────────┴─────────┴─────────┘\n\n");

    let symbol = if report.has_failures() { "✗" } else { "✓" };
    output.push_str(&format!(
        "{} {} ({} of {} completed iterations passed)\n",
        symbol,
        report.expectation,
        totals.passed,
        totals.completed()
    ));

    output
}

/// Render a report as pretty-printed JSON
pub fn render_json(report: &RunReport) -> serde_json::Result<String> {
    serde_json::to_string_pretty(report)
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_chars - 1).collect();
        format!("{}…", head)
    }
}
