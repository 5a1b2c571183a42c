//! Run timing collection for `--timing` output.

use std::time::{Duration, Instant};

/// Collects phase timings and protocol counters for one run.
///
/// Created when `--timing` is passed, threaded as `Option<&mut Stats>`.
pub struct Stats {
    total_start: Instant,
    phases: Vec<(&'static str, Duration)>,
    pub generations: u64,
    pub snapshots: u64,
    pub rows_distributed: u64,
    pub rows_collected: u64,
    cells: u64,
}

impl Stats {
    pub fn new(height: usize, width: usize) -> Self {
        Self {
            total_start: Instant::now(),
            phases: Vec::new(),
            generations: 0,
            snapshots: 0,
            rows_distributed: 0,
            rows_collected: 0,
            cells: (height * width) as u64,
        }
    }

    /// Record a completed phase with its duration.
    pub fn add_phase(&mut self, name: &'static str, duration: Duration) {
        self.phases.push((name, duration));
    }

    /// Print the stats table to stderr.
    pub fn display(&self) {
        let total = self.total_start.elapsed();
        eprintln!();
        eprintln!("=== Lifeband Run Stats ===");
        for (name, dur) in &self.phases {
            eprintln!("  {:<22} {:>9.3}s", name, dur.as_secs_f64());
        }
        eprintln!("  Generations:           {}", self.generations);
        eprintln!("  Snapshots gathered:    {}", self.snapshots);
        eprintln!("  Rows distributed:      {}", self.rows_distributed);
        eprintln!("  Rows collected:        {}", self.rows_collected);
        if self.generations > 0 {
            let per_gen = total.as_secs_f64() * 1e3 / self.generations as f64;
            eprintln!("  Per generation:        {per_gen:>9.3}ms");
            let cell_updates = self.cells as f64 * self.generations as f64;
            eprintln!(
                "  Cell updates/s:        {:>9.3}M",
                cell_updates / total.as_secs_f64() / 1e6
            );
        }
        eprintln!("  ────────────────────────────────");
        eprintln!("  Total:                 {:>9.3}s", total.as_secs_f64());
    }
}
