//! Coordinator (rank 0): owns the authoritative grid, distributes bands,
//! gathers snapshots, and decides when the cluster stops.

use super::comm::{GridTransport, RowBlock};
use super::partition::{plan_bands, BandDescriptor};
use super::protocol::{is_snapshot_generation, RunSettings, Verdict};
use super::{RunConfig, RunOutcome};
use crate::detector::CycleDetector;
use crate::error::{LifebandError, Result};
use crate::grid::{Grid, InitPattern, SPACECRAFT_COLS, SPACECRAFT_ROWS};
use crate::output;
use crate::stats::Stats;
use std::time::Instant;

/// Drive one full run from the coordinator's side.
///
/// Returns the final grid and how many generations actually ran. Every
/// worker follows the same snapshot schedule, so each gather here pairs
/// with exactly one send-and-verdict round on every worker.
pub fn run(transport: &dyn GridTransport, config: &RunConfig) -> Result<RunOutcome> {
    if transport.world_size() < 2 {
        return Err(LifebandError::Topology(format!(
            "world size {} is too small: need a coordinator and at least one worker",
            transport.world_size()
        )));
    }

    let mut stats = config
        .timing
        .then(|| Stats::new(config.height, config.width));

    let phase_start = Instant::now();
    let mut grid = build_grid(config)?;
    let bands = plan_bands(
        config.height,
        config.width,
        transport.world_size(),
        config.total_iterations,
    )?;
    if let Some(stats) = stats.as_mut() {
        stats.add_phase("plan", phase_start.elapsed());
    }

    let settings = RunSettings {
        output_step: config.output_step,
        detect_cycles: config.detect_cycles,
        min_cycle_generation: config.min_cycle_generation,
    };

    let phase_start = Instant::now();
    distribute(transport, &bands, &settings, &grid)?;
    if let Some(stats) = stats.as_mut() {
        stats.add_phase("distribute", phase_start.elapsed());
        stats.rows_distributed = bands.iter().map(|b| b.local_rows as u64).sum();
    }

    emit_output(&grid, 0, config)?;

    let initial = (config.detect_cycles && config.images).then(|| grid.clone());
    let mut detector = config.detect_cycles.then(CycleDetector::new);
    let blocks: Vec<RowBlock> = bands
        .iter()
        .map(|band| RowBlock {
            source: band.world_rank as usize,
            first_row: band.global_row_start as usize,
            rows: band.update_rows as usize,
        })
        .collect();

    let phase_start = Instant::now();
    let mut cycle = None;
    let mut completed = 0;
    for generation in 1..=config.total_iterations {
        if !is_snapshot_generation(generation, config.total_iterations, &settings) {
            continue;
        }

        let _span = tracing::debug_span!("gather", generation).entered();
        transport.collect_rows(&blocks, &mut grid)?;
        if let Some(stats) = stats.as_mut() {
            stats.snapshots += 1;
            stats.rows_collected += config.height as u64;
        }

        if settings.output_step > 0 && generation % settings.output_step == 0 {
            emit_output(&grid, generation, config)?;
        }

        let mut verdict = if generation == config.total_iterations {
            Verdict::Halt
        } else {
            Verdict::Continue
        };

        if let Some(detector) = detector.as_mut() {
            if let Some(report) = detector.record(generation as u64, &grid) {
                tracing::info!(
                    first = report.first_generation,
                    second = report.second_generation,
                    "repeating configuration, halting"
                );
                if report.stabilized_at() > config.min_cycle_generation as u64 {
                    persist_stable_pair(initial.as_ref(), &grid, generation, config)?;
                }
                cycle = Some(report);
                verdict = Verdict::Halt;
            }
        }

        for band in &bands {
            transport.send_verdict(band.world_rank as usize, verdict)?;
        }
        if verdict == Verdict::Halt {
            completed = generation;
            break;
        }
    }

    if let Some(stats) = stats.as_mut() {
        stats.add_phase("simulate", phase_start.elapsed());
        stats.generations = completed as u64;
        stats.display();
    }

    Ok(RunOutcome {
        grid,
        generations: completed,
        cycle,
    })
}

/// Allocate and seed the authoritative grid.
fn build_grid(config: &RunConfig) -> Result<Grid> {
    if let InitPattern::Spacecraft { offset_y, offset_x } = config.pattern {
        if offset_y + SPACECRAFT_ROWS > config.height || offset_x + SPACECRAFT_COLS > config.width {
            return Err(LifebandError::Config(format!(
                "seed pattern at ({offset_y}, {offset_x}) does not fit a {}x{} grid",
                config.height, config.width
            )));
        }
    }
    let mut grid = Grid::new(config.height, config.width);
    grid.fill(&config.pattern, config.density, config.seed);
    Ok(grid)
}

/// Ship settings, descriptor and initial rows to every worker, in
/// increasing row order per worker.
fn distribute(
    transport: &dyn GridTransport,
    bands: &[BandDescriptor],
    settings: &RunSettings,
    grid: &Grid,
) -> Result<()> {
    let _span = tracing::info_span!("distribute").entered();
    for band in bands {
        let to = band.world_rank as usize;
        transport.send_settings(to, settings)?;
        transport.send_descriptor(to, band)?;
        for i in 0..band.local_row_count() {
            transport.send_row(to, grid.row(band.send_row_start as usize + i))?;
        }
        tracing::debug!(rank = to, rows = band.local_rows, "band sent");
    }
    Ok(())
}

/// Write the configured sinks for one gathered generation.
fn emit_output(grid: &Grid, generation: u32, config: &RunConfig) -> Result<()> {
    if config.output_step == 0 {
        return Ok(());
    }
    if config.console {
        let mut stdout = std::io::stdout();
        output::render_console(grid, generation as u64, &mut stdout)?;
    }
    if config.images {
        std::fs::create_dir_all(&config.image_dir)?;
        let path = config.image_dir.join(format!("life-{generation}.jpg"));
        tracing::info!(path = %path.display(), "writing image");
        output::write_image(grid, path)?;
    }
    Ok(())
}

/// Persist the initial and stabilized grids once a repeat past the
/// interest threshold is found.
fn persist_stable_pair(
    initial: Option<&Grid>,
    stabilized: &Grid,
    generation: u32,
    config: &RunConfig,
) -> Result<()> {
    if !config.images {
        return Ok(());
    }
    std::fs::create_dir_all(&config.image_dir)?;
    if let Some(initial) = initial {
        output::write_image(initial, config.image_dir.join("life-initial.jpg"))?;
    }
    output::write_image(
        stabilized,
        config.image_dir.join(format!("life-stable-{generation}.jpg")),
    )?;
    Ok(())
}
