//! Cycle/termination detection over rotating grid snapshots.
//!
//! Four snapshots are kept, taken at the 10th, 11th, 12th and 13th
//! generation of every block of ten. Once all four slots are populated the
//! six unordered pairs are compared; any pixel-identical pair means the
//! simulation has gone static or entered a short cycle and can halt early.
//!
//! The cadence is a sampling heuristic: a cycle whose period never lines
//! up with the four offsets goes undetected. That is accepted, not fixed.

use crate::grid::Grid;

const SLOTS: usize = 4;

/// A detected repeat: the grid at `first_generation` was pixel-identical
/// to the grid at `second_generation`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub first_generation: u64,
    pub second_generation: u64,
}

impl CycleReport {
    /// The generation the configuration had demonstrably stabilized by.
    pub fn stabilized_at(&self) -> u64 {
        self.first_generation
    }
}

/// Rotating four-slot snapshot comparator.
#[derive(Debug, Default)]
pub struct CycleDetector {
    slots: [Option<(u64, Grid)>; SLOTS],
}

impl CycleDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `generation` is on the snapshot cadence.
    pub fn wants(generation: u64) -> bool {
        generation >= 10 && generation % 10 < SLOTS as u64
    }

    /// Record a snapshot and compare once all four slots are populated.
    ///
    /// Off-cadence generations are ignored. Returns the first identical
    /// pair found, oldest generations first.
    pub fn record(&mut self, generation: u64, grid: &Grid) -> Option<CycleReport> {
        if !Self::wants(generation) {
            return None;
        }
        self.slots[(generation % 10) as usize] = Some((generation, grid.clone()));

        if self.slots.iter().any(Option::is_none) {
            return None;
        }
        for a in 0..SLOTS {
            for b in a + 1..SLOTS {
                if let (Some((gen_a, grid_a)), Some((gen_b, grid_b))) =
                    (&self.slots[a], &self.slots[b])
                {
                    if grid_a == grid_b {
                        let (first, second) = if gen_a < gen_b {
                            (*gen_a, *gen_b)
                        } else {
                            (*gen_b, *gen_a)
                        };
                        return Some(CycleReport {
                            first_generation: first,
                            second_generation: second,
                        });
                    }
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine;
    use crate::grid::Grid;

    #[test]
    fn cadence_covers_four_offsets_per_block() {
        for g in [10, 11, 12, 13, 20, 21, 22, 23, 110, 113] {
            assert!(CycleDetector::wants(g), "generation {g}");
        }
        for g in [0, 1, 3, 9, 14, 19, 25, 109] {
            assert!(!CycleDetector::wants(g), "generation {g}");
        }
    }

    #[test]
    fn static_grid_is_detected_once_slots_fill() {
        let grid = Grid::new(12, 12); // all dead, a terminal fixed point
        let mut detector = CycleDetector::new();
        assert_eq!(detector.record(10, &grid), None);
        assert_eq!(detector.record(11, &grid), None);
        assert_eq!(detector.record(12, &grid), None);
        let report = detector.record(13, &grid).expect("repeat not found");
        assert_eq!(report.first_generation, 10);
        assert_eq!(report.stabilized_at(), 10);
    }

    #[test]
    fn snapshots_of_a_still_life_compare_equal_across_blocks() {
        let mut grid = Grid::new(6, 6);
        grid.set(2, 2, 1);
        grid.set(2, 3, 1);
        grid.set(3, 2, 1);
        grid.set(3, 3, 1);

        let mut detector = CycleDetector::new();
        let at_10 = grid.clone();
        detector.record(10, &at_10);
        // Ten more generations of a block still-life change nothing.
        for _ in 0..10 {
            engine::step(&mut grid);
        }
        assert_eq!(at_10, grid);
        detector.record(11, &grid);
        detector.record(12, &grid);
        assert!(detector.record(13, &grid).is_some());
    }

    #[test]
    fn period_two_oscillator_matches_alternate_slots() {
        let mut grid = Grid::new(5, 5);
        grid.set(1, 2, 1);
        grid.set(2, 2, 1);
        grid.set(3, 2, 1);

        let mut detector = CycleDetector::new();
        let mut report = None;
        for g in 10..=13u64 {
            report = detector.record(g, &grid);
            engine::step(&mut grid);
        }
        let report = report.expect("period-2 repeat not found");
        assert_eq!(
            (report.first_generation, report.second_generation),
            (10, 12)
        );
    }

    #[test]
    fn changing_grid_is_not_flagged() {
        // A glider-like shape still evolving at every sampled generation.
        let mut grid = Grid::new(16, 16);
        grid.set(1, 2, 1);
        grid.set(2, 3, 1);
        grid.set(3, 1, 1);
        grid.set(3, 2, 1);
        grid.set(3, 3, 1);

        let mut detector = CycleDetector::new();
        for g in 10..=13u64 {
            assert_eq!(detector.record(g, &grid), None, "generation {g}");
            engine::step(&mut grid);
        }
    }

    #[test]
    fn off_cadence_periods_are_missed() {
        // A period-5 pattern would realign only at generations the sampler
        // never pairs up; this documents the known false-negative window
        // rather than asserting the sampler catches everything.
        assert!(!CycleDetector::wants(15));
        assert!(!CycleDetector::wants(18));
    }
}
