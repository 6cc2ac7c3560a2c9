//! Adprobe: traffic-shaping load engine for parameterized GET endpoints
//!
//! Virtual users hit a single endpoint whose query string combines a set of
//! filter dimensions. Each iteration draws fresh values, enumerates every
//! non-empty combination of dimensions, picks one uniformly, and checks the
//! response.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    ADPROBE Architecture                          │
//! ├─────────────────────────────────────────────────────────────────┤
//! │   ┌────────────┐    ┌────────────┐    ┌────────────┐            │
//! │   │ LoadConfig │    │ Scheduler  │    │ Iteration  │            │
//! │   │ (YAML)     │───►│ (workers,  │───►│ Runner     │──► GET     │
//! │   │            │    │  ramp)     │    │            │            │
//! │   └────────────┘    └────────────┘    └─────┬──────┘            │
//! │                                             ▼                   │
//! │                     ┌────────────┐    ┌────────────┐            │
//! │                     │ RunReport  │◄───│ Aggregate  │            │
//! │                     └────────────┘    └────────────┘            │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]
#![cfg_attr(test, allow(clippy::large_stack_arrays, clippy::large_stack_frames))]

pub mod aggregate;
pub mod check;
pub mod config;
pub mod domain;
pub mod error;
pub mod profile;
pub mod report;
pub mod runner;
pub mod scheduler;
pub mod transport;
pub mod variant;

pub use aggregate::{
    Aggregate, AggregateSnapshot, FailureReason, LatencyHistogram, LatencySummary, Outcome,
    OutcomeKind, ShapeStats,
};
pub use check::{Expectation, ResultChecker};
pub use config::{parse_duration, DimensionConfig, LoadConfig, LoadPlan, MAX_DURATION};
pub use domain::{Dimension, DimensionSet, Domain, Draw, DrawEntry, MAX_DIMENSIONS};
pub use error::{AdprobeError, AdprobeResult, ConfigError};
pub use profile::{ExecutionProfile, SchedulerState, Stage, Transition};
pub use report::{render_json, render_text, RunReport};
pub use runner::IterationRunner;
pub use scheduler::{ConcurrencySample, ScheduleResult, Scheduler};
pub use transport::{HttpResponse, ReqwestTransport, Transport, TransportError, TransportErrorKind};
pub use variant::{build_variants, choose_variant, variant_count, Variant, VariantSet, BARE_SHAPE};

use std::sync::Arc;

/// Run a plan against its target over HTTP and return the report.
///
/// # Errors
///
/// Fails only if the HTTP client cannot be built; request failures are
/// counted in the report.
pub async fn execute(plan: LoadPlan) -> AdprobeResult<RunReport> {
    let transport = ReqwestTransport::new(plan.request_timeout())?;
    let checker = Arc::new(plan.expect().clone());
    Ok(execute_with(plan, Arc::new(transport), checker).await)
}

/// Run a plan with a caller-supplied transport and checker
pub async fn execute_with(
    plan: LoadPlan,
    transport: Arc<dyn Transport>,
    checker: Arc<dyn ResultChecker>,
) -> RunReport {
    let plan = Arc::new(plan);
    let runner = IterationRunner::new(Arc::clone(&plan), transport, Arc::clone(&checker));
    let scheduler = Scheduler::new(runner, Arc::new(Aggregate::new()));
    let schedule = scheduler.run().await;
    RunReport::new(
        &plan,
        checker.as_ref(),
        scheduler.aggregate().snapshot(),
        schedule,
    )
}
