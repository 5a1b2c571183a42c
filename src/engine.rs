//! Local update engine: B3/S23 applied in place over a row range.
//!
//! The next state is staged in bit 1 of each cell while bit 0 still holds
//! the current state, so no scratch grid is needed. That requires two full
//! passes over the range: a fused pass would shift some cells before their
//! neighbors had read them.

use crate::grid::Grid;

/// Bit 0: current live/dead state.
const CURRENT: u8 = 0b01;
/// Bit 1: staged next state, only set between the two passes.
const PENDING: u8 = 0b10;

/// Advance rows `row_start..=row_end` one generation.
///
/// Neighbor counts read bit 0 only and are clipped at the grid edges; rows
/// outside the range (ghost rows) contribute neighbors but are never
/// written. Both bounds are inclusive and a single-row range at index 0 is
/// accepted.
pub fn advance_rows(grid: &mut Grid, row_start: usize, row_end: usize) {
    assert!(
        row_start <= row_end && row_end < grid.height(),
        "update range {row_start}..={row_end} outside grid of {} rows",
        grid.height(),
    );

    let height = grid.height();
    let width = grid.width();

    // First pass: stage each cell's next state in bit 1.
    for i in row_start..=row_end {
        for j in 0..width {
            let mut live_neighbors = 0u32;
            for dy in -1i64..=1 {
                for dx in -1i64..=1 {
                    if dy == 0 && dx == 0 {
                        continue;
                    }
                    let ni = i as i64 + dy;
                    let nj = j as i64 + dx;
                    if ni >= 0 && ni < height as i64 && nj >= 0 && nj < width as i64 {
                        live_neighbors += (grid.get(ni as usize, nj as usize) & CURRENT) as u32;
                    }
                }
            }

            let cell = grid.get(i, j);
            let survives = cell & CURRENT == 1 && (live_neighbors == 2 || live_neighbors == 3);
            let born = cell & CURRENT == 0 && live_neighbors == 3;
            if survives || born {
                grid.set(i, j, cell | PENDING);
            }
        }
    }

    // Second pass: shift the staged state into bit 0.
    for i in row_start..=row_end {
        for cell in grid.row_mut(i) {
            *cell >>= 1;
        }
    }
}

/// Advance the whole grid one generation.
pub fn step(grid: &mut Grid) {
    let last = grid.height() - 1;
    advance_rows(grid, 0, last);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid;

    fn grid_from(rows: &[&[u8]]) -> Grid {
        let height = rows.len();
        let width = rows[0].len();
        let cells = rows.concat();
        Grid::from_cells(height, width, cells)
    }

    #[test]
    fn blinker_oscillates() {
        let mut grid = grid_from(&[
            &[0, 0, 0, 0, 0],
            &[0, 0, 1, 0, 0],
            &[0, 0, 1, 0, 0],
            &[0, 0, 1, 0, 0],
            &[0, 0, 0, 0, 0],
        ]);
        let vertical = grid.clone();
        step(&mut grid);
        let horizontal = grid_from(&[
            &[0, 0, 0, 0, 0],
            &[0, 0, 0, 0, 0],
            &[0, 1, 1, 1, 0],
            &[0, 0, 0, 0, 0],
            &[0, 0, 0, 0, 0],
        ]);
        assert_eq!(grid, horizontal);
        step(&mut grid);
        assert_eq!(grid, vertical);
    }

    #[test]
    fn block_is_a_still_life() {
        let mut grid = grid_from(&[
            &[0, 0, 0, 0],
            &[0, 1, 1, 0],
            &[0, 1, 1, 0],
            &[0, 0, 0, 0],
        ]);
        let before = grid.clone();
        for _ in 0..5 {
            step(&mut grid);
        }
        assert_eq!(grid, before);
    }

    #[test]
    fn dead_grid_stays_dead() {
        let mut grid = Grid::new(10, 10);
        for _ in 0..20 {
            step(&mut grid);
        }
        assert_eq!(grid.count_alive(), 0);
    }

    #[test]
    fn birth_requires_exactly_three_neighbors() {
        // Lone pair: both cells die, nothing is born.
        let mut grid = grid_from(&[&[0, 0, 0], &[1, 1, 0], &[0, 0, 0]]);
        step(&mut grid);
        assert_eq!(grid.count_alive(), 0);

        // Three in an L: the corner cell survives and a fourth is born.
        let mut grid = grid_from(&[&[1, 1, 0], &[1, 0, 0], &[0, 0, 0]]);
        step(&mut grid);
        assert_eq!(
            grid,
            grid_from(&[&[1, 1, 0], &[1, 1, 0], &[0, 0, 0]]),
        );
    }

    #[test]
    fn overcrowded_cell_dies() {
        let mut grid = grid_from(&[&[1, 1, 1], &[1, 1, 1], &[0, 0, 0]]);
        step(&mut grid);
        // The center of the top edge has 5 live neighbors and dies.
        assert_eq!(grid.get(0, 1), 0);
    }

    #[test]
    fn ranged_update_leaves_other_rows_untouched() {
        let mut grid = grid_from(&[
            &[1, 1, 1, 1],
            &[0, 0, 0, 0],
            &[0, 0, 0, 0],
            &[1, 1, 1, 1],
        ]);
        advance_rows(&mut grid, 1, 2);
        // Rows 0 and 3 keep their old state verbatim.
        assert_eq!(grid.row(0), &[1, 1, 1, 1]);
        assert_eq!(grid.row(3), &[1, 1, 1, 1]);
        // Rows 1 and 2 were computed against the untouched boundary rows.
        assert_eq!(grid.row(1), &[0, 1, 1, 0]);
        assert_eq!(grid.row(2), &[0, 1, 1, 0]);
    }

    #[test]
    fn single_row_range_at_index_zero_is_accepted() {
        let mut grid = grid_from(&[&[1, 1, 1], &[1, 1, 1]]);
        advance_rows(&mut grid, 0, 0);
        // Row 0 updates against row 1's old state; row 1 is untouched.
        assert_eq!(grid.row(0), &[1, 0, 1]);
        assert_eq!(grid.row(1), &[1, 1, 1]);
    }

    #[test]
    fn staged_state_does_not_leak_into_neighbor_counts() {
        // A blinker straddling the range start: if pass one mutated bit 0,
        // the second cell would see a wrong neighbor count.
        let mut grid = grid_from(&[
            &[0, 1, 0],
            &[0, 1, 0],
            &[0, 1, 0],
            &[0, 0, 0],
        ]);
        step(&mut grid);
        assert_eq!(grid.row(1), &[1, 1, 1]);
        assert_eq!(grid.count_alive(), 3);
    }
}
