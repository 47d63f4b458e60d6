use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use observability::PhaseMetrics;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};
use repository::Indexed;

use crate::error::UpdateError;
use crate::model::Player;

/// Work applied to every player in one phase.
pub type UpdateTask<'a> = &'a (dyn Fn(&mut Player) -> Result<(), UpdateError> + Sync);

/// Runs one phase of the update pipeline over every player.
///
/// `run` returns only after every unit has finished. A unit that fails or
/// panics is logged and counted; the other units are unaffected.
pub trait Updater: Send {
    fn run(&self, phase: &'static str, units: Vec<&mut Player>, task: UpdateTask<'_>) -> PhaseMetrics;
}

/// Fans each phase out over a dedicated rayon pool.
pub struct ParallelUpdater {
    pool: ThreadPool,
}

impl ParallelUpdater {
    pub fn new(threads: usize) -> Result<Self, ThreadPoolBuildError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("update-{i}"))
            .build()?;
        tracing::info!(threads = pool.current_num_threads(), "parallel updater started");
        Ok(Self { pool })
    }

    /// One thread per available core.
    pub fn with_available_parallelism() -> Result<Self, ThreadPoolBuildError> {
        let threads = std::thread::available_parallelism().map_or(1, |n| n.get());
        Self::new(threads)
    }
}

impl Updater for ParallelUpdater {
    fn run(&self, phase: &'static str, units: Vec<&mut Player>, task: UpdateTask<'_>) -> PhaseMetrics {
        let start = Instant::now();
        let count = units.len();
        let failures = self.pool.install(|| {
            units
                .into_par_iter()
                .map(|player| !run_unit(phase, player, task))
                .filter(|&failed| failed)
                .count()
        });
        PhaseMetrics {
            phase,
            units: count,
            failures,
            duration_us: start.elapsed().as_micros(),
        }
    }
}

/// Runs each phase on the calling thread.
#[derive(Debug, Default)]
pub struct SequentialUpdater;

impl Updater for SequentialUpdater {
    fn run(&self, phase: &'static str, units: Vec<&mut Player>, task: UpdateTask<'_>) -> PhaseMetrics {
        let start = Instant::now();
        let count = units.len();
        let failures = units
            .into_iter()
            .map(|player| !run_unit(phase, player, task))
            .filter(|&failed| failed)
            .count();
        PhaseMetrics {
            phase,
            units: count,
            failures,
            duration_us: start.elapsed().as_micros(),
        }
    }
}

fn run_unit(phase: &'static str, player: &mut Player, task: UpdateTask<'_>) -> bool {
    let index = player.index();
    match panic::catch_unwind(AssertUnwindSafe(|| task(player))) {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            tracing::error!(phase, index, error = %e, "player update failed");
            false
        }
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| (*s).to_owned())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "non-string panic payload".to_owned());
            tracing::error!(phase, index, panic = %message, "player update panicked");
            false
        }
    }
}
