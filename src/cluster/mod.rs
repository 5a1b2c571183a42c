//! The distributed layer: partition planning, wire protocol, transports,
//! and the coordinator/worker run loops.

pub mod comm;
#[cfg(feature = "distributed")]
pub mod comm_mpi;
pub mod coordinator;
pub mod partition;
pub mod protocol;
pub mod worker;

use crate::detector::CycleReport;
use crate::error::{LifebandError, Result};
use crate::grid::{Grid, InitPattern};
use comm::ChannelTransport;
use protocol::WireSchema;
use std::path::PathBuf;
use std::thread;

/// Everything the coordinator needs to drive one run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub height: usize,
    pub width: usize,
    pub total_iterations: u32,
    pub pattern: InitPattern,
    pub density: f32,
    pub seed: Option<u64>,
    /// Gather and emit output every N generations; 0 disables.
    pub output_step: u32,
    pub console: bool,
    pub images: bool,
    pub image_dir: PathBuf,
    pub detect_cycles: bool,
    pub min_cycle_generation: u32,
    pub timing: bool,
}

impl RunConfig {
    /// A quiet config suitable for tests: no console, images or timing.
    pub fn quiet(height: usize, width: usize, total_iterations: u32) -> Self {
        Self {
            height,
            width,
            total_iterations,
            pattern: InitPattern::Random,
            density: 0.3,
            seed: None,
            output_step: 0,
            console: false,
            images: false,
            image_dir: PathBuf::from("output_images"),
            detect_cycles: false,
            min_cycle_generation: 100,
            timing: false,
        }
    }
}

/// What a finished run hands back on the coordinator.
#[derive(Debug)]
pub struct RunOutcome {
    /// The authoritative grid after the last completed generation.
    pub grid: Grid,
    /// Generations actually run (less than requested on an early halt).
    pub generations: u32,
    /// The repeat that ended the run early, if any.
    pub cycle: Option<CycleReport>,
}

/// Run a full cluster in-process: the coordinator on the calling thread,
/// one thread per worker rank, channels in between.
///
/// This is the default execution mode of the binary and the harness the
/// integration tests drive; the `distributed` build runs the identical
/// coordinator/worker code over MPI instead.
pub fn run_threaded(config: &RunConfig, worker_count: usize) -> Result<RunOutcome> {
    if worker_count == 0 {
        return Err(LifebandError::Topology(
            "at least one worker rank is required".into(),
        ));
    }

    let mut transports = ChannelTransport::cluster(worker_count + 1, WireSchema::new());
    let coordinator = transports.remove(0);

    let handles: Vec<_> = transports
        .into_iter()
        .map(|transport| thread::spawn(move || worker::run(&transport)))
        .collect();

    let outcome = coordinator::run(&coordinator, config);
    // Hang up before joining so workers blocked on a receive see a
    // transport error instead of waiting forever if the run failed early.
    drop(coordinator);

    let worker_results: Vec<Result<()>> = handles
        .into_iter()
        .map(|handle| {
            handle
                .join()
                .map_err(|_| LifebandError::Transport("worker thread panicked".into()))?
        })
        .collect();

    let outcome = outcome?;
    for result in worker_results {
        result?;
    }
    Ok(outcome)
}
