//! Worker (rank >= 1): receives its band, then loops
//! { local update -> halo exchange -> snapshot/verdict } until told to
//! stop.

use super::comm::{GridTransport, HaloLinks};
use super::protocol::{is_snapshot_generation, Verdict};
use crate::engine;
use crate::error::Result;
use crate::grid::Grid;

const COORDINATOR: usize = 0;

/// Run the worker side of one simulation.
pub fn run(transport: &dyn GridTransport) -> Result<()> {
    let settings = transport.recv_settings(COORDINATOR)?;
    let band = transport.recv_descriptor(COORDINATOR)?;
    let _span = tracing::debug_span!("worker", rank = band.world_rank).entered();

    let mut local = Grid::new(band.local_row_count(), band.width as usize);
    for i in 0..band.local_row_count() {
        transport.recv_row_into(COORDINATOR, local.row_mut(i))?;
    }
    tracing::debug!(
        rows = band.local_rows,
        ghosts = band.ghost_row_count(),
        "band received"
    );

    // No worker starts computing before every worker has its band.
    transport.worker_barrier()?;

    let links = HaloLinks::for_band(&band);
    let total_iterations = band.total_iterations as u32;
    for generation in 1..=total_iterations {
        engine::advance_rows(
            &mut local,
            band.update_start as usize,
            band.update_end as usize,
        );
        // Ghost rows must hold the neighbors' new boundary rows before the
        // next generation's update reads them.
        transport.exchange_halo(&links, &mut local)?;

        if is_snapshot_generation(generation, total_iterations, &settings) {
            for i in band.update_start..=band.update_end {
                transport.send_row(COORDINATOR, local.row(i as usize))?;
            }
            if transport.recv_verdict(COORDINATOR)? == Verdict::Halt {
                tracing::debug!(generation, "halt");
                break;
            }
        }
    }
    Ok(())
}
