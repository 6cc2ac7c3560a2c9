//! Virtual-user scheduler.
//!
//! A controller loop samples the [`ExecutionProfile`] every tick and grows or
//! shrinks the worker pool to match. Workers loop the [`IterationRunner`]
//! until retired. Retired workers finish their current iteration; only the
//! drain deadline cancels a request mid-flight.

use crate::aggregate::Aggregate;
use crate::config::MAX_DURATION;
use crate::profile::SchedulerState;
use crate::runner::IterationRunner;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, timeout_at, Instant, MissedTickBehavior};

/// Concurrency at one controller tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConcurrencySample {
    /// Time since the run started, in ms
    pub elapsed_ms: u64,
    /// Workers the profile asked for
    pub target: u32,
    /// Workers running and not retired
    pub active: usize,
    /// Scheduler state
    pub state: SchedulerState,
}

/// What the scheduler observed over a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleResult {
    /// Wall time from start until every worker exited
    pub elapsed: Duration,
    /// One sample per tick
    pub timeline: Vec<ConcurrencySample>,
    /// Highest active worker count
    pub peak_active: usize,
    /// Iterations cancelled at the drain deadline
    pub aborted: u64,
}

/// Flags shared between a worker and the controller
#[derive(Debug, Default)]
struct WorkerSlot {
    retire: AtomicBool,
    /// Set while an iteration is running; whoever clears it records the outcome
    in_flight: AtomicBool,
}

#[derive(Debug)]
struct Worker {
    id: u64,
    slot: Arc<WorkerSlot>,
    handle: JoinHandle<()>,
}

/// Runs a plan's execution profile to completion
#[derive(Debug)]
pub struct Scheduler {
    runner: IterationRunner,
    aggregate: Arc<Aggregate>,
    state: watch::Sender<SchedulerState>,
}

impl Scheduler {
    /// Create a scheduler recording into `aggregate`
    pub fn new(runner: IterationRunner, aggregate: Arc<Aggregate>) -> Self {
        let (state, _) = watch::channel(SchedulerState::NotStarted);
        Self {
            runner,
            aggregate,
            state,
        }
    }

    /// Watch state transitions
    pub fn subscribe(&self) -> watch::Receiver<SchedulerState> {
        self.state.subscribe()
    }

    /// Current state
    pub fn state(&self) -> SchedulerState {
        *self.state.borrow()
    }

    /// Shared outcome counters
    pub fn aggregate(&self) -> &Arc<Aggregate> {
        &self.aggregate
    }

    /// Run the whole schedule, drain, and stop.
    pub async fn run(&self) -> ScheduleResult {
        let plan = self.runner.plan();
        let profile = plan.profile();
        tracing::info!(
            name = plan.name(),
            base_url = plan.base_url(),
            duration = ?profile.total_duration(),
            peak_vus = profile.peak_target(),
            "run starting"
        );

        let start = Instant::now();
        let mut ticker = interval(plan.tick());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut active: Vec<Worker> = Vec::new();
        let mut retiring: Vec<Worker> = Vec::new();
        let mut timeline = Vec::new();
        let mut peak_active = 0;
        let mut next_id = 0u64;

        loop {
            ticker.tick().await;
            let elapsed = start.elapsed();
            let Some(phase) = profile.phase_at(elapsed) else {
                break;
            };
            self.transition(phase);

            let target = profile.target_at(elapsed);
            let wanted = target as usize;
            while active.len() < wanted {
                active.push(self.spawn_worker(next_id));
                next_id += 1;
            }
            while active.len() > wanted {
                // LIFO: newest worker retires first
                let Some(worker) = active.pop() else { break };
                tracing::debug!(worker = worker.id, "retiring worker");
                worker.slot.retire.store(true, Ordering::Release);
                retiring.push(worker);
            }
            retiring.retain(|w| !w.handle.is_finished());

            peak_active = peak_active.max(active.len());
            timeline.push(ConcurrencySample {
                elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                target,
                active: active.len(),
                state: phase,
            });
        }

        self.transition(SchedulerState::Draining);
        let workers: Vec<Worker> = active.into_iter().chain(retiring).collect();
        let aborted = self.drain(workers).await;
        self.transition(SchedulerState::Stopped);

        let elapsed = start.elapsed();
        tracing::info!(
            elapsed = ?elapsed,
            iterations = self.aggregate.total(),
            aborted,
            "run finished"
        );

        ScheduleResult {
            elapsed,
            timeline,
            peak_active,
            aborted,
        }
    }

    fn transition(&self, next: SchedulerState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            tracing::info!(from = %previous, to = %next, "scheduler state");
        }
    }

    fn spawn_worker(&self, id: u64) -> Worker {
        let plan = self.runner.plan();
        let rng = match plan.seed() {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(id)),
            None => StdRng::from_os_rng(),
        };
        let slot = Arc::new(WorkerSlot::default());
        let handle = tokio::spawn(worker_loop(
            self.runner.clone(),
            Arc::clone(&self.aggregate),
            Arc::clone(&slot),
            rng,
            plan.think_time(),
        ));
        tracing::debug!(worker = id, "spawned worker");
        Worker { id, slot, handle }
    }

    /// Retire everyone, wait until the drain deadline, abort the rest.
    async fn drain(&self, workers: Vec<Worker>) -> u64 {
        for worker in &workers {
            worker.slot.retire.store(true, Ordering::Release);
        }

        let drain_timeout = self.runner.plan().drain_timeout().min(MAX_DURATION);
        let deadline = Instant::now() + drain_timeout;
        let mut aborted = 0;

        for mut worker in workers {
            if timeout_at(deadline, &mut worker.handle).await.is_ok() {
                continue;
            }
            if worker.slot.in_flight.swap(false, Ordering::AcqRel) {
                self.aggregate.record_aborted();
                aborted += 1;
            }
            worker.handle.abort();
            // Cancelled tasks resolve with a JoinError
            let _ = worker.handle.await;
        }

        if aborted > 0 {
            tracing::warn!(
                aborted,
                drain_timeout = ?drain_timeout,
                "drain timeout reached, in-flight iterations aborted"
            );
        }
        aborted
    }
}

async fn worker_loop(
    runner: IterationRunner,
    aggregate: Arc<Aggregate>,
    slot: Arc<WorkerSlot>,
    mut rng: StdRng,
    think_time: Duration,
) {
    while !slot.retire.load(Ordering::Acquire) {
        slot.in_flight.store(true, Ordering::Release);
        let outcome = runner.run_iteration(&mut rng).await;
        if slot.in_flight.swap(false, Ordering::AcqRel) {
            aggregate.record(&outcome);
        }

        if think_time.is_zero() {
            // A transport that never suspends would starve the controller
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(think_time).await;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::check::Expectation;
    use crate::config::{DimensionConfig, LoadConfig, LoadPlan};
    use crate::domain::Domain;
    use crate::profile::{ExecutionProfile, Stage};
    use crate::transport::{HttpResponse, Transport, TransportError};
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    /// Responds after a fixed delay, tracking peak concurrency
    #[derive(Debug)]
    struct DelayTransport {
        status: u16,
        delay: Duration,
        current: AtomicUsize,
        peak: AtomicUsize,
    }

    impl DelayTransport {
        fn new(status: u16, delay: Duration) -> Self {
            Self {
                status,
                delay,
                current: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Transport for DelayTransport {
        async fn get(&self, _url: &str) -> Result<HttpResponse, TransportError> {
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.current.fetch_sub(1, Ordering::SeqCst);
            Ok(HttpResponse::with_status(self.status))
        }
    }

    fn config(profile: ExecutionProfile) -> LoadConfig {
        LoadConfig::new(
            "http://ads.test/api/v1/ad",
            vec![
                DimensionConfig::new("age", Domain::range(1, 100)),
                DimensionConfig::new("country", Domain::choice(["TW", "US"])),
            ],
            profile,
        )
        .with_seed(7)
    }

    fn scheduler(plan: LoadPlan, transport: Arc<dyn Transport>) -> Scheduler {
        let runner = IterationRunner::new(
            Arc::new(plan),
            transport,
            Arc::new(Expectation::default()),
        );
        Scheduler::new(runner, Arc::new(Aggregate::new()))
    }

    #[tokio::test(start_paused = true)]
    async fn test_flat_keeps_exact_worker_count() {
        let plan = config(ExecutionProfile::flat(5, Duration::from_secs(2)))
            .validate()
            .unwrap();
        let transport = Arc::new(DelayTransport::new(200, Duration::from_millis(20)));
        let scheduler = scheduler(plan, transport.clone());

        let result = scheduler.run().await;

        assert!(!result.timeline.is_empty());
        assert!(result.timeline.iter().all(|s| s.active == 5 && s.target == 5));
        assert!(result
            .timeline
            .iter()
            .all(|s| s.state == SchedulerState::Sustaining(0)));
        assert_eq!(result.peak_active, 5);
        assert_eq!(transport.peak.load(Ordering::SeqCst), 5);

        let snap = scheduler.aggregate().snapshot();
        assert!(snap.passed > 5);
        assert_eq!(snap.failed(), 0);
        assert_eq!(snap.aborted, 0);
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_staged_tracks_interpolated_target() {
        let profile = ExecutionProfile::staged(vec![
            Stage::ramp(Duration::from_secs(5), 10),
            Stage::ramp(Duration::from_secs(5), 10),
            Stage::ramp(Duration::from_secs(5), 0),
        ]);
        let plan = config(profile.clone()).validate().unwrap();
        let transport = Arc::new(DelayTransport::new(200, Duration::from_millis(30)));
        let scheduler = scheduler(plan, transport.clone());

        let result = scheduler.run().await;

        for sample in &result.timeline {
            let expected = profile.target_at(Duration::from_millis(sample.elapsed_ms));
            assert!(
                (sample.active as i64 - i64::from(expected)).abs() <= 1,
                "at {}ms active {} target {}",
                sample.elapsed_ms,
                sample.active,
                expected
            );
        }
        assert_eq!(result.peak_active, 10);
        // Retired workers may still be finishing their last request
        assert!(transport.peak.load(Ordering::SeqCst) <= 12);

        let states: Vec<SchedulerState> = result.timeline.iter().map(|s| s.state).collect();
        assert!(states.contains(&SchedulerState::Ramping(0)));
        assert!(states.contains(&SchedulerState::Sustaining(1)));
        assert!(states.contains(&SchedulerState::Ramping(2)));
        assert_eq!(scheduler.aggregate().snapshot().aborted, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unexpected_status_does_not_stop_run() {
        let plan = config(ExecutionProfile::flat(3, Duration::from_secs(1)))
            .validate()
            .unwrap();
        let scheduler = scheduler(
            plan,
            Arc::new(DelayTransport::new(503, Duration::from_millis(10))),
        );

        let result = scheduler.run().await;

        let snap = scheduler.aggregate().snapshot();
        assert_eq!(snap.passed, 0);
        assert!(snap.failed_status > 3, "workers kept iterating after failures");
        assert_eq!(snap.failed_status, snap.total);
        assert!(result.elapsed >= Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stuck_request_is_aborted_at_drain_deadline() {
        let plan = config(ExecutionProfile::flat(2, Duration::from_secs(1)))
            .with_drain_timeout(Duration::from_secs(2))
            .validate()
            .unwrap();
        let scheduler = scheduler(
            plan,
            Arc::new(DelayTransport::new(200, Duration::from_secs(3600))),
        );

        let result = scheduler.run().await;

        let snap = scheduler.aggregate().snapshot();
        assert_eq!(result.aborted, 2);
        assert_eq!(snap.aborted, 2);
        assert_eq!(snap.completed(), 0);
        assert_eq!(snap.total, 2);
        assert!(result.elapsed < Duration::from_millis(3_200), "{:?}", result.elapsed);
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_flight_request_finishes_within_drain() {
        let plan = config(ExecutionProfile::flat(2, Duration::from_secs(1)))
            .with_drain_timeout(Duration::from_secs(5))
            .validate()
            .unwrap();
        let scheduler = scheduler(
            plan,
            Arc::new(DelayTransport::new(200, Duration::from_millis(1_500))),
        );

        scheduler.run().await;

        let snap = scheduler.aggregate().snapshot();
        assert_eq!(snap.aborted, 0);
        assert_eq!(snap.passed, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_drain_timeout_aborts_immediately() {
        let plan = config(ExecutionProfile::flat(1, Duration::from_secs(1)))
            .with_drain_timeout(Duration::ZERO)
            .validate()
            .unwrap();
        let scheduler = scheduler(
            plan,
            Arc::new(DelayTransport::new(200, Duration::from_secs(60))),
        );

        let result = scheduler.run().await;
        assert_eq!(result.aborted, 1);
        assert!(result.elapsed < Duration::from_millis(1_200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_think_time_spaces_iterations() {
        let plan = config(ExecutionProfile::flat(1, Duration::from_secs(1)))
            .with_think_time(Duration::from_millis(200))
            .validate()
            .unwrap();
        let scheduler = scheduler(
            plan,
            Arc::new(DelayTransport::new(200, Duration::from_millis(50))),
        );

        scheduler.run().await;

        // 250ms per iteration over one second
        let total = scheduler.aggregate().snapshot().total;
        assert!((4..=5).contains(&total), "total = {total}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_state_channel_ends_stopped() {
        let plan = config(ExecutionProfile::flat(1, Duration::from_millis(300)))
            .validate()
            .unwrap();
        let scheduler = scheduler(
            plan,
            Arc::new(DelayTransport::new(200, Duration::from_millis(10))),
        );
        let rx = scheduler.subscribe();
        assert_eq!(*rx.borrow(), SchedulerState::NotStarted);

        scheduler.run().await;
        assert_eq!(*rx.borrow(), SchedulerState::Stopped);
    }
}
