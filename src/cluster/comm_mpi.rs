//! MPI transport for multi-process clusters.
//!
//! Requires the `distributed` feature flag and an MPI installation. Run
//! with e.g. `mpiexec -n 4 lifeband 200 100`.
//!
//! The caller initializes MPI and keeps the `Universe` alive for the
//! transport's lifetime:
//!
//! ```ignore
//! let universe = mpi::initialize().expect("MPI init failed");
//! let transport = MpiTransport::new(&universe, WireSchema::new())?;
//! ```
//!
//! Short control messages use blocking send/receive. Halo exchange and
//! snapshot gathering post non-blocking operations and wait on all of
//! them before returning, so mutually dependent neighbor sends can never
//! deadlock. Failed MPI calls abort the whole process group through MPI's
//! default error handler; a lost row would desynchronize every later
//! generation, so there is nothing to recover.

use super::comm::{GridTransport, HaloLinks, RowBlock};
use super::partition::BandDescriptor;
use super::protocol::{RunSettings, Verdict, WireSchema, DESCRIPTOR_WORDS, SETTINGS_WORDS};
use crate::error::{LifebandError, Result};
use crate::grid::Grid;
use mpi::environment::Universe;
use mpi::topology::{Color, SimpleCommunicator};
use mpi::traits::*;

/// MPI-backed transport over the world communicator.
pub struct MpiTransport {
    world: SimpleCommunicator,
    /// Sub-communicator holding only the workers, for their barrier.
    workers: Option<SimpleCommunicator>,
    schema: WireSchema,
}

impl MpiTransport {
    pub fn new(universe: &Universe, schema: WireSchema) -> Result<Self> {
        let world = universe.world();
        if world.size() < 2 {
            return Err(LifebandError::Topology(format!(
                "world size {} is too small: need a coordinator and at least one worker",
                world.size()
            )));
        }
        // The coordinator sits out of the split and gets no communicator.
        let color = if world.rank() == 0 {
            Color::undefined()
        } else {
            Color::with_value(0)
        };
        let workers = world.split_by_color(color);
        Ok(Self {
            world,
            workers,
            schema,
        })
    }

}

impl GridTransport for MpiTransport {
    fn rank(&self) -> usize {
        self.world.rank() as usize
    }

    fn world_size(&self) -> usize {
        self.world.size() as usize
    }

    fn worker_barrier(&self) -> Result<()> {
        if let Some(workers) = &self.workers {
            workers.barrier();
        }
        Ok(())
    }

    fn send_settings(&self, to: usize, settings: &RunSettings) -> Result<()> {
        let words = self.schema.encode_settings(settings);
        self.world.process_at_rank(to as i32).send(&words[..]);
        Ok(())
    }

    fn recv_settings(&self, from: usize) -> Result<RunSettings> {
        let mut words = [0i32; SETTINGS_WORDS];
        self.world.process_at_rank(from as i32).receive_into(&mut words[..]);
        self.schema.decode_settings(&words)
    }

    fn send_descriptor(&self, to: usize, band: &BandDescriptor) -> Result<()> {
        let words = self.schema.encode_descriptor(band);
        self.world.process_at_rank(to as i32).send(&words[..]);
        Ok(())
    }

    fn recv_descriptor(&self, from: usize) -> Result<BandDescriptor> {
        let mut words = [0i32; DESCRIPTOR_WORDS];
        self.world.process_at_rank(from as i32).receive_into(&mut words[..]);
        self.schema.decode_descriptor(&words)
    }

    fn send_row(&self, to: usize, row: &[u8]) -> Result<()> {
        self.world.process_at_rank(to as i32).send(row);
        Ok(())
    }

    fn recv_row_into(&self, from: usize, row: &mut [u8]) -> Result<()> {
        self.world.process_at_rank(from as i32).receive_into(row);
        Ok(())
    }

    fn send_verdict(&self, to: usize, verdict: Verdict) -> Result<()> {
        self.world.process_at_rank(to as i32).send(&verdict.to_word());
        Ok(())
    }

    fn recv_verdict(&self, from: usize) -> Result<Verdict> {
        let (word, _status) = self.world.process_at_rank(from as i32).receive::<i32>();
        Verdict::from_word(word)
    }

    fn exchange_halo(&self, links: &HaloLinks, local: &mut Grid) -> Result<()> {
        // Stage the outgoing boundary rows so the grid stays free for the
        // ghost-row receives.
        let top = local.row(links.send_top).to_vec();
        let bottom = local.row(links.send_bottom).to_vec();
        let (first_row, last_row) = local.edge_rows_mut();

        mpi::request::scope(|scope| {
            let mut pending = Vec::with_capacity(4);
            if let Some(prev) = links.prev {
                pending.push(self.world.process_at_rank(prev as i32).immediate_send(scope, &top[..]));
            }
            if let Some(next) = links.next {
                pending.push(self.world.process_at_rank(next as i32).immediate_send(scope, &bottom[..]));
            }
            if let Some(prev) = links.prev {
                pending.push(self.world.process_at_rank(prev as i32).immediate_receive_into(scope, first_row));
            }
            if let Some(next) = links.next {
                pending.push(self.world.process_at_rank(next as i32).immediate_receive_into(scope, last_row));
            }
            // Everything issued this generation completes before the next
            // update pass may start.
            for request in pending {
                request.wait_without_status();
            }
        });
        Ok(())
    }

    fn collect_rows(&self, blocks: &[RowBlock], grid: &mut Grid) -> Result<()> {
        let width = grid.width();
        let mut owner_of = vec![None; grid.height()];
        for block in blocks {
            for i in 0..block.rows {
                owner_of[block.first_row + i] = Some(block.source);
            }
        }

        // Receives are posted per source in increasing row order, so each
        // worker's rows land in place in the order it sent them; arrival
        // order across workers is free.
        let mut targets: Vec<(usize, &mut [u8])> = Vec::new();
        for (row, slice) in grid.cells_mut().chunks_mut(width).enumerate() {
            if let Some(source) = owner_of[row] {
                targets.push((source, slice));
            }
        }

        mpi::request::scope(|scope| {
            let mut pending = Vec::with_capacity(targets.len());
            for (source, slice) in targets {
                pending.push(self.world.process_at_rank(source as i32).immediate_receive_into(scope, slice));
            }
            for request in pending {
                request.wait_without_status();
            }
        });
        Ok(())
    }
}
