//! Scheduler sizing and timing configuration.

use std::time::Duration;

use crate::error::{Result, SchedError};

/// Hard upper bound on priority levels; levels are stored as `u8`.
pub const MAX_PRIORITY_LEVELS: usize = 256;

/// Configuration for the scheduler.
///
/// The quantum is kept inside `[min_quantum, max_quantum]`; the builder
/// clamps it and [`SchedulerConfig::validate`] rejects inconsistent bounds.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SchedulerConfig {
    pub name: &'static str,
    pub priority_levels: usize,
    pub capacity: usize,
    pub quantum: Duration,
    pub min_quantum: Duration,
    pub max_quantum: Duration,
    pub preemption: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            name: "qsched",
            priority_levels: 32,
            capacity: 64,
            quantum: Duration::from_millis(10),
            min_quantum: Duration::from_millis(1),
            max_quantum: Duration::from_millis(100),
            preemption: true,
        }
    }
}

impl SchedulerConfig {
    /// Creates a new scheduler configuration builder.
    pub fn builder() -> SchedulerConfigBuilder {
        SchedulerConfigBuilder::default()
    }

    /// Lowest-urgency priority level, `L - 1`.
    pub fn lowest_priority(&self) -> u8 {
        (self.priority_levels.saturating_sub(1)).min(u8::MAX as usize) as u8
    }

    /// Resolves a caller-supplied priority into `[0, L - 1]`.
    pub fn clamp_priority(&self, priority: i32) -> u8 {
        priority.clamp(0, i32::from(self.lowest_priority())) as u8
    }

    /// Clamps `quantum` into the configured bounds.
    pub fn clamp_quantum(&self, quantum: Duration) -> Duration {
        quantum.clamp(self.min_quantum, self.max_quantum)
    }

    /// Time slice granted to a task dispatched at `priority`:
    /// `quantum * (1 + priority / 10)`, integer division, saturating at
    /// `Duration::MAX`.
    ///
    /// Less urgent levels get longer slices, trading responsiveness for fewer
    /// switches on background work.
    pub fn time_slice(quantum: Duration, priority: u8) -> Duration {
        quantum
            .checked_mul(1 + u32::from(priority) / 10)
            .unwrap_or(Duration::MAX)
    }

    /// Checks that the configuration can back a scheduler.
    pub fn validate(&self) -> Result<()> {
        if self.priority_levels == 0 {
            return Err(SchedError::InvalidConfig {
                reason: "at least one priority level is required",
            });
        }
        if self.priority_levels > MAX_PRIORITY_LEVELS {
            return Err(SchedError::InvalidConfig {
                reason: "priority levels exceed supported range 1..256",
            });
        }
        if self.capacity == 0 {
            return Err(SchedError::InvalidConfig {
                reason: "task capacity must be non-zero",
            });
        }
        if self.min_quantum.is_zero() {
            return Err(SchedError::InvalidConfig {
                reason: "minimum quantum must be non-zero",
            });
        }
        if self.min_quantum > self.max_quantum {
            return Err(SchedError::InvalidConfig {
                reason: "minimum quantum exceeds maximum quantum",
            });
        }
        if self.quantum < self.min_quantum || self.quantum > self.max_quantum {
            return Err(SchedError::InvalidConfig {
                reason: "quantum outside configured bounds",
            });
        }
        Ok(())
    }
}

/// Builder for ergonomic scheduler configuration construction.
#[derive(Debug, Clone, Default)]
pub struct SchedulerConfigBuilder {
    config: SchedulerConfig,
}

impl SchedulerConfigBuilder {
    /// Sets the scheduler name, used for the dispatch thread name.
    pub fn name(mut self, name: &'static str) -> Self {
        self.config.name = name;
        self
    }

    /// Sets the number of priority levels `L`.
    pub fn priority_levels(mut self, levels: usize) -> Self {
        self.config.priority_levels = levels;
        self
    }

    /// Sets the maximum number of registered tasks.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.config.capacity = capacity;
        self
    }

    /// Sets the dispatch quantum. Clamped into the bounds at `build()`.
    pub fn quantum(mut self, quantum: Duration) -> Self {
        self.config.quantum = quantum;
        self
    }

    /// Sets the inclusive range the quantum is kept in.
    pub fn quantum_bounds(mut self, min: Duration, max: Duration) -> Self {
        self.config.min_quantum = min;
        self.config.max_quantum = max;
        self
    }

    /// Enables or disables demotion of the RUNNING task.
    pub fn preemption(mut self, enabled: bool) -> Self {
        self.config.preemption = enabled;
        self
    }

    /// Builds the scheduler configuration.
    pub fn build(mut self) -> SchedulerConfig {
        if self.config.min_quantum <= self.config.max_quantum {
            self.config.quantum = self.config.clamp_quantum(self.config.quantum);
        }
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = SchedulerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.priority_levels, 32);
        assert_eq!(config.quantum, Duration::from_millis(10));
        assert!(config.preemption);
    }

    #[test]
    fn builder_clamps_quantum() {
        let config = SchedulerConfig::builder()
            .quantum_bounds(Duration::from_millis(2), Duration::from_millis(20))
            .quantum(Duration::from_millis(500))
            .build();
        assert_eq!(config.quantum, Duration::from_millis(20));

        let config = SchedulerConfig::builder()
            .quantum(Duration::from_micros(10))
            .build();
        assert_eq!(config.quantum, Duration::from_millis(1));
    }

    #[test]
    fn time_slice_saturates_on_huge_quantum() {
        let quantum = Duration::from_secs(u64::MAX / 2);
        assert_eq!(SchedulerConfig::time_slice(quantum, 9), quantum);
        assert_eq!(SchedulerConfig::time_slice(quantum, 20), Duration::MAX);
        assert_eq!(
            SchedulerConfig::time_slice(Duration::from_millis(10), 25),
            Duration::from_millis(30)
        );
    }

    #[test]
    fn inverted_bounds_are_rejected() {
        let config = SchedulerConfig::builder()
            .quantum_bounds(Duration::from_millis(50), Duration::from_millis(5))
            .build();
        assert!(matches!(
            config.validate(),
            Err(SchedError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn priority_is_clamped_into_range() {
        let config = SchedulerConfig::builder().priority_levels(8).build();
        assert_eq!(config.clamp_priority(-4), 0);
        assert_eq!(config.clamp_priority(3), 3);
        assert_eq!(config.clamp_priority(7), 7);
        assert_eq!(config.clamp_priority(1_000), 7);
    }

    #[test]
    fn time_slice_grows_every_ten_levels() {
        let q = Duration::from_millis(10);
        assert_eq!(SchedulerConfig::time_slice(q, 0), q);
        assert_eq!(SchedulerConfig::time_slice(q, 9), q);
        assert_eq!(SchedulerConfig::time_slice(q, 10), q * 2);
        assert_eq!(SchedulerConfig::time_slice(q, 25), q * 3);
    }
}
