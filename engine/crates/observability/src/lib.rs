use tracing_subscriber::{fmt, EnvFilter};

pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(true)
        .init();
}

/// Timing of one service execution.
#[derive(Debug, Clone)]
pub struct ServiceMetrics {
    pub service: &'static str,
    pub pulse: u64,
    pub duration_us: u128,
    /// Declared interval of the service.
    pub interval_us: u128,
    pub failed: bool,
}

impl ServiceMetrics {
    pub fn overloaded(&self) -> bool {
        self.duration_us > self.interval_us
    }

    pub fn log(&self) {
        if self.overloaded() {
            tracing::warn!(
                service = self.service,
                pulse = self.pulse,
                duration_us = self.duration_us,
                "service overloaded ({}us > {}us)",
                self.duration_us,
                self.interval_us
            );
        } else {
            tracing::debug!(
                service = self.service,
                pulse = self.pulse,
                duration_us = self.duration_us,
                failed = self.failed,
                "service executed"
            );
        }
    }
}

/// Outcome of one phase of the player update pipeline.
#[derive(Debug, Clone)]
pub struct PhaseMetrics {
    pub phase: &'static str,
    pub units: usize,
    pub failures: usize,
    pub duration_us: u128,
}

impl PhaseMetrics {
    pub fn log(&self) {
        if self.failures > 0 {
            tracing::warn!(
                phase = self.phase,
                units = self.units,
                failures = self.failures,
                duration_us = self.duration_us,
                "update phase had failures"
            );
        } else {
            tracing::trace!(
                phase = self.phase,
                units = self.units,
                duration_us = self.duration_us,
                "update phase completed"
            );
        }
    }
}

/// Timing of one base tick of the service scheduler.
#[derive(Debug, Clone)]
pub struct SchedulerMetrics {
    pub pulse: u64,
    pub duration_us: u128,
    pub budget_us: u128,
    pub executed: usize,
}

impl SchedulerMetrics {
    pub fn drifted(&self) -> bool {
        self.duration_us > self.budget_us
    }

    pub fn log(&self) {
        if self.drifted() {
            tracing::warn!(
                pulse = self.pulse,
                duration_us = self.duration_us,
                executed = self.executed,
                "scheduler pulse exceeded base tick ({}us > {}us)",
                self.duration_us,
                self.budget_us
            );
        } else {
            tracing::trace!(
                pulse = self.pulse,
                duration_us = self.duration_us,
                executed = self.executed,
                "scheduler pulse completed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overload_compares_against_interval() {
        let mut metrics = ServiceMetrics {
            service: "game",
            pulse: 1,
            duration_us: 600_000,
            interval_us: 600_000,
            failed: false,
        };
        assert!(!metrics.overloaded());
        metrics.duration_us += 1;
        assert!(metrics.overloaded());
    }

    #[test]
    fn drift_compares_against_budget() {
        let metrics = SchedulerMetrics {
            pulse: 3,
            duration_us: 120_000,
            budget_us: 100_000,
            executed: 2,
        };
        assert!(metrics.drifted());
    }
}
