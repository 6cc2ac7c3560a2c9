//! One iteration: draw, enumerate, pick, request, check.

use crate::aggregate::{FailureReason, Outcome, OutcomeKind};
use crate::check::ResultChecker;
use crate::config::LoadPlan;
use crate::transport::Transport;
use crate::variant::build_variants;
use rand::Rng;
use std::sync::Arc;
use tokio::time::Instant;

/// Executes single iterations against the target.
///
/// Cheap to clone; every worker holds its own copy.
#[derive(Debug, Clone)]
pub struct IterationRunner {
    plan: Arc<LoadPlan>,
    transport: Arc<dyn Transport>,
    checker: Arc<dyn ResultChecker>,
}

impl IterationRunner {
    /// Create a runner
    pub fn new(
        plan: Arc<LoadPlan>,
        transport: Arc<dyn Transport>,
        checker: Arc<dyn ResultChecker>,
    ) -> Self {
        Self {
            plan,
            transport,
            checker,
        }
    }

    /// Plan this runner executes
    pub fn plan(&self) -> &LoadPlan {
        &self.plan
    }

    /// Run one iteration.
    ///
    /// Never fails: transport errors and rejected responses become failed
    /// outcomes.
    pub async fn run_iteration<R: Rng + ?Sized>(&self, rng: &mut R) -> Outcome {
        let draw = self.plan.dimensions().draw(rng);
        let variants = build_variants(self.plan.base_url(), &draw, self.plan.include_bare_url());
        let variant = variants.choose(rng);

        let start = Instant::now();
        let result = self.transport.get(variant.url()).await;
        let latency = start.elapsed();

        let (status, kind) = match result {
            Ok(response) if self.checker.is_expected_status(&response) => {
                (Some(response.status), OutcomeKind::Passed)
            }
            Ok(response) => (
                Some(response.status),
                OutcomeKind::Failed {
                    reason: FailureReason::UnexpectedStatus {
                        status: response.status,
                    },
                },
            ),
            Err(err) => {
                tracing::debug!(url = %err.url, kind = %err.kind, "request failed: {}", err.message);
                (
                    None,
                    OutcomeKind::Failed {
                        reason: FailureReason::Transport { kind: err.kind },
                    },
                )
            }
        };

        tracing::trace!(
            url = variant.url(),
            shape = variant.shape(),
            ?status,
            latency_ms = latency.as_millis() as u64,
            "iteration complete"
        );

        Outcome {
            shape: variant.shape().to_string(),
            url: variant.url().to_string(),
            status,
            latency,
            kind,
        }
    }
}
