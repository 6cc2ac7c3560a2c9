//! Execution profiles: how many virtual users should be running, and when.
//!
//! A profile is a pure function of elapsed time. The scheduler samples it on
//! every tick; nothing here touches the clock.

use crate::config::{check_max_duration, duration_format};
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How a stage moves from the previous level to its own target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    /// Interpolate linearly over the stage duration
    #[default]
    Linear,
    /// Jump to the target when the stage begins
    Step,
}

/// One segment of a staged profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    /// Stage length
    #[serde(with = "duration_format")]
    pub duration: Duration,
    /// Virtual users at the end of the stage
    pub target: u32,
    /// Interpolation from the previous level
    #[serde(default)]
    pub transition: Transition,
}

impl Stage {
    /// Linear ramp toward `target`
    pub fn ramp(duration: Duration, target: u32) -> Self {
        Self {
            duration,
            target,
            transition: Transition::Linear,
        }
    }

    /// Immediate jump to `target`, held for `duration`
    pub fn step(duration: Duration, target: u32) -> Self {
        Self {
            duration,
            target,
            transition: Transition::Step,
        }
    }

    /// Users at `offset` into this stage, starting from `from`
    pub fn level_at(&self, from: u32, offset: Duration) -> u32 {
        if self.transition == Transition::Step || from == self.target || self.duration.is_zero() {
            return self.target;
        }
        let progress = (offset.as_secs_f64() / self.duration.as_secs_f64()).min(1.0);
        let range = (i64::from(self.target) - i64::from(from)) as f64;
        (f64::from(from) + range * progress) as u32
    }

    /// Whether the stage changes the level gradually
    pub fn is_ramp(&self, from: u32) -> bool {
        self.transition == Transition::Linear && from != self.target
    }
}

/// Lifecycle of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "stage", rename_all = "snake_case")]
pub enum SchedulerState {
    /// Not yet running
    NotStarted,
    /// Moving linearly toward stage `i`'s target
    Ramping(usize),
    /// Holding stage `i`'s level
    Sustaining(usize),
    /// Schedule elapsed, waiting for in-flight iterations
    Draining,
    /// Every worker has exited
    Stopped,
}

impl std::fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotStarted => write!(f, "not-started"),
            Self::Ramping(i) => write!(f, "ramping(stage {})", i),
            Self::Sustaining(i) => write!(f, "sustaining(stage {})", i),
            Self::Draining => write!(f, "draining"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

/// Virtual-user profile over the whole run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExecutionProfile {
    /// Constant concurrency for a fixed duration
    Flat {
        /// Concurrent virtual users
        vus: u32,
        /// Run length
        #[serde(with = "duration_format")]
        duration: Duration,
    },
    /// Ordered stages (ramp-up, plateau, ramp-down)
    Staged {
        /// Level before the first stage
        #[serde(default)]
        start_vus: u32,
        /// Stages in order
        stages: Vec<Stage>,
    },
}

impl ExecutionProfile {
    /// Constant `vus` for `duration`
    pub fn flat(vus: u32, duration: Duration) -> Self {
        Self::Flat { vus, duration }
    }

    /// Staged profile starting from zero users
    pub fn staged(stages: Vec<Stage>) -> Self {
        Self::Staged {
            start_vus: 0,
            stages,
        }
    }

    /// Reject profiles that cannot run
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            Self::Flat { vus, duration } => {
                if *vus == 0 {
                    return Err(ConfigError::ZeroVirtualUsers);
                }
                if duration.is_zero() {
                    return Err(ConfigError::ZeroDuration);
                }
                check_max_duration("duration", *duration)
            }
            Self::Staged { start_vus, stages } => {
                if stages.is_empty() {
                    return Err(ConfigError::NoStages);
                }
                if let Some(index) = stages.iter().position(|s| s.duration.is_zero()) {
                    return Err(ConfigError::NonMonotonicStage { index });
                }
                if *start_vus == 0 && stages.iter().all(|s| s.target == 0) {
                    return Err(ConfigError::NoActiveStage);
                }
                let total = stages
                    .iter()
                    .try_fold(Duration::ZERO, |acc, s| acc.checked_add(s.duration))
                    .unwrap_or(Duration::MAX);
                check_max_duration("stages", total)
            }
        }
    }

    /// Length of the whole schedule
    pub fn total_duration(&self) -> Duration {
        match self {
            Self::Flat { duration, .. } => *duration,
            Self::Staged { stages, .. } => stages
                .iter()
                .fold(Duration::ZERO, |acc, s| acc.saturating_add(s.duration)),
        }
    }

    /// Highest target reached at any point
    pub fn peak_target(&self) -> u32 {
        match self {
            Self::Flat { vus, .. } => *vus,
            Self::Staged { start_vus, stages } => stages
                .iter()
                .map(|s| s.target)
                .fold(*start_vus, u32::max),
        }
    }

    /// Target virtual users at `elapsed`; zero once the schedule is over
    pub fn target_at(&self, elapsed: Duration) -> u32 {
        match self {
            Self::Flat { vus, duration } => {
                if elapsed < *duration {
                    *vus
                } else {
                    0
                }
            }
            Self::Staged { start_vus, stages } => {
                let mut stage_start = Duration::ZERO;
                let mut level = *start_vus;
                for stage in stages {
                    if elapsed < stage_start.saturating_add(stage.duration) {
                        return stage.level_at(level, elapsed - stage_start);
                    }
                    stage_start = stage_start.saturating_add(stage.duration);
                    level = stage.target;
                }
                0
            }
        }
    }

    /// Scheduler state at `elapsed`, or `None` once the schedule is over
    pub fn phase_at(&self, elapsed: Duration) -> Option<SchedulerState> {
        match self {
            Self::Flat { duration, .. } => {
                (elapsed < *duration).then_some(SchedulerState::Sustaining(0))
            }
            Self::Staged { start_vus, stages } => {
                let mut stage_start = Duration::ZERO;
                let mut level = *start_vus;
                for (index, stage) in stages.iter().enumerate() {
                    if elapsed < stage_start.saturating_add(stage.duration) {
                        return Some(if stage.is_ramp(level) {
                            SchedulerState::Ramping(index)
                        } else {
                            SchedulerState::Sustaining(index)
                        });
                    }
                    stage_start = stage_start.saturating_add(stage.duration);
                    level = stage.target;
                }
                None
            }
        }
    }
}
