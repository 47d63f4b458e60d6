use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};

use observability::{SchedulerMetrics, ServiceMetrics};

use crate::service::{Service, ServiceError};

/// Scheduler configuration.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Period of the shared timer every service interval is counted in.
    pub base_tick: Duration,
    /// Maximum pulses to run (0 = unlimited).
    pub max_pulses: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            base_tick: Duration::from_millis(100),
            max_pulses: 0,
        }
    }
}

struct ScheduledService {
    service: Box<dyn Service>,
    delay: u32,
    countdown: u32,
}

/// Runs every registered service from one timer on the calling thread.
///
/// A service's interval is converted to a number of base ticks (at least
/// one). Each pulse decrements its countdown and executes it when the
/// countdown reaches zero. Services never run concurrently with each other.
pub struct ServiceScheduler {
    config: SchedulerConfig,
    services: Vec<ScheduledService>,
    current_pulse: u64,
}

impl ServiceScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            services: Vec::new(),
            current_pulse: 0,
        }
    }

    pub fn register(&mut self, service: impl Service + 'static) {
        self.register_boxed(Box::new(service));
    }

    pub fn register_boxed(&mut self, service: Box<dyn Service>) {
        let base = self.config.base_tick.as_millis().max(1);
        let delay = (service.interval().as_millis() / base).clamp(1, u32::MAX as u128) as u32;
        tracing::info!(
            service = service.name(),
            interval_ms = service.interval().as_millis() as u64,
            ticks = delay,
            "service registered"
        );
        self.services.push(ScheduledService {
            service,
            delay,
            countdown: delay,
        });
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    pub fn current_pulse(&self) -> u64 {
        self.current_pulse
    }

    /// Advances every countdown by one base tick, executing the services that are due.
    pub fn pulse(&mut self) -> Vec<ServiceMetrics> {
        self.current_pulse += 1;
        let mut executed = Vec::new();

        for scheduled in &mut self.services {
            scheduled.countdown -= 1;
            if scheduled.countdown > 0 {
                continue;
            }
            scheduled.countdown = scheduled.delay;

            let service = &mut scheduled.service;
            let name = service.name();
            let start = Instant::now();
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| service.execute()))
                .unwrap_or_else(|payload| {
                    Err(ServiceError::Panicked {
                        service: name,
                        message: panic_message(payload.as_ref()),
                    })
                });
            let duration = start.elapsed();

            if let Err(e) = &outcome {
                tracing::error!(service = name, error = %e, "service execution failed");
            }

            executed.push(ServiceMetrics {
                service: name,
                pulse: self.current_pulse,
                duration_us: duration.as_micros(),
                interval_us: service.interval().as_micros(),
                failed: outcome.is_err(),
            });
        }
        executed
    }

    /// Pulses every base tick until `should_stop` returns true or `max_pulses` is reached.
    pub fn run(&mut self, should_stop: impl Fn() -> bool) -> u64 {
        let base_tick = self.config.base_tick;
        loop {
            if should_stop() {
                break;
            }
            if self.config.max_pulses > 0 && self.current_pulse >= self.config.max_pulses {
                break;
            }

            let pulse_start = Instant::now();
            let services = self.pulse();
            for metrics in &services {
                metrics.log();
            }
            let elapsed = pulse_start.elapsed();
            SchedulerMetrics {
                pulse: self.current_pulse,
                duration_us: elapsed.as_micros(),
                budget_us: base_tick.as_micros(),
                executed: services.len(),
            }
            .log();

            // Sleep until next tick
            if elapsed < base_tick {
                std::thread::sleep(base_tick - elapsed);
            }
        }
        self.current_pulse
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}
