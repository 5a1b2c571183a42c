//! Row-band partitioning: which rows of the global grid each worker owns,
//! updates, and mirrors.
//!
//! Rows are split as evenly as possible across workers; the first
//! `rows % workers` workers take one extra row. Each band is then expanded
//! by one ghost row per interior boundary, clamped at the global edges.
//! Within a worker's local buffer, ghost rows sit at index 0 and/or
//! `local_rows - 1` and are excluded from its update range.

use crate::error::{LifebandError, Result};

/// Per-worker band description, computed once by the coordinator before
/// the run and immutable after transmission.
///
/// All fields are `i32` to match the wire layout (see
/// [`crate::cluster::protocol::WireSchema`]); only the first nine travel
/// on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BandDescriptor {
    /// Total ranks including the coordinator.
    pub world_size: i32,
    /// This worker's rank (1-based; rank 0 is the coordinator).
    pub world_rank: i32,
    pub total_iterations: i32,
    /// Global index of this worker's first owned row.
    pub global_row_start: i32,
    /// Rows in the local buffer, ghosts included.
    pub local_rows: i32,
    /// Row width in cells.
    pub width: i32,
    /// First local row this worker updates (0 for the first worker, else 1).
    pub update_start: i32,
    /// Last local row this worker updates, inclusive.
    pub update_end: i32,
    /// Owned row count: `update_end - update_start + 1`.
    pub update_rows: i32,
    /// Global index of the first row shipped to this worker (owned start
    /// minus the upper ghost, clamped at 0). Coordinator-side only; not
    /// transmitted, derivable from `global_row_start`.
    pub send_row_start: i32,
}

impl BandDescriptor {
    pub fn is_first_worker(&self) -> bool {
        self.world_rank == 1
    }

    pub fn is_last_worker(&self) -> bool {
        self.world_rank == self.world_size - 1
    }

    /// Rank of the row-neighbor above, if any.
    pub fn prev_rank(&self) -> Option<usize> {
        (!self.is_first_worker()).then(|| self.world_rank as usize - 1)
    }

    /// Rank of the row-neighbor below, if any.
    pub fn next_rank(&self) -> Option<usize> {
        (!self.is_last_worker()).then(|| self.world_rank as usize + 1)
    }

    pub fn local_row_count(&self) -> usize {
        self.local_rows as usize
    }

    pub fn ghost_row_count(&self) -> usize {
        (self.local_rows - self.update_rows) as usize
    }
}

/// Compute one band per worker for a `total_rows x width` grid.
///
/// `world_size` counts the coordinator, so `world_size - 1` workers share
/// the grid. Every worker must end up owning at least one row.
pub fn plan_bands(
    total_rows: usize,
    width: usize,
    world_size: usize,
    total_iterations: u32,
) -> Result<Vec<BandDescriptor>> {
    if world_size < 2 {
        return Err(LifebandError::Topology(format!(
            "need a coordinator and at least one worker, got world size {world_size}"
        )));
    }
    let workers = world_size - 1;
    if total_rows < workers {
        return Err(LifebandError::Config(format!(
            "{total_rows} rows cannot be split across {workers} workers"
        )));
    }

    let base = total_rows / workers;
    let remainder = total_rows % workers;

    let mut bands = Vec::with_capacity(workers);
    for idx in 0..workers {
        let owned_start = idx * base + idx.min(remainder);
        let owned_end = owned_start + base - 1 + usize::from(idx < remainder);

        // One ghost row per interior boundary; the global edges have none.
        let send_start = owned_start.saturating_sub(1);
        let send_end = (owned_end + 1).min(total_rows - 1);
        let local_rows = send_end - send_start + 1;

        let world_rank = idx + 1;
        let update_start = if world_rank == 1 { 0 } else { 1 };
        let update_end = if world_rank == world_size - 1 {
            local_rows - 1
        } else {
            local_rows - 2
        };

        bands.push(BandDescriptor {
            world_size: world_size as i32,
            world_rank: world_rank as i32,
            total_iterations: total_iterations as i32,
            global_row_start: owned_start as i32,
            local_rows: local_rows as i32,
            width: width as i32,
            update_start: update_start as i32,
            update_end: update_end as i32,
            update_rows: (update_end - update_start + 1) as i32,
            send_row_start: send_start as i32,
        });
    }
    Ok(bands)
}
