//! Grid output sinks: console rendering, text dumps, JPEG images.

use crate::error::Result;
use crate::grid::Grid;
use std::io::{BufRead, Write};
use std::path::Path;

/// Render the grid to a writer with a border, `O` for live and `.` for
/// dead cells.
pub fn render_console<W: Write>(grid: &Grid, generation: u64, out: &mut W) -> Result<()> {
    let border: String = "-".repeat(grid.width() + 2);
    writeln!(out, "{border}")?;
    for i in 0..grid.height() {
        write!(out, "|")?;
        for &cell in grid.row(i) {
            write!(out, "{}", if cell & 1 == 1 { 'O' } else { '.' })?;
        }
        writeln!(out, "|")?;
    }
    writeln!(out, "{border}")?;
    writeln!(out, "generation: {generation}")?;
    Ok(())
}

/// Write the grid as text: one line per row, `1`/`0` per cell, and a
/// trailing blank line.
pub fn write_text<W: Write>(grid: &Grid, out: &mut W) -> Result<()> {
    for i in 0..grid.height() {
        for &cell in grid.row(i) {
            write!(out, "{}", if cell & 1 == 1 { '1' } else { '0' })?;
        }
        writeln!(out)?;
    }
    writeln!(out)?;
    Ok(())
}

/// Read a grid back from the text dump format.
pub fn read_text<R: BufRead>(height: usize, width: usize, input: &mut R) -> Result<Grid> {
    let mut grid = Grid::new(height, width);
    let mut line = String::new();
    for i in 0..height {
        line.clear();
        input.read_line(&mut line)?;
        for (j, ch) in line.trim_end().chars().take(width).enumerate() {
            if ch == '1' {
                grid.set(i, j, 1);
            }
        }
    }
    Ok(grid)
}

/// Write the grid as a grayscale JPEG: live cells black (0), dead cells
/// white (255).
pub fn write_image<P: AsRef<Path>>(grid: &Grid, path: P) -> Result<()> {
    let pixels: Vec<u8> = grid
        .cells()
        .iter()
        .map(|&cell| if cell & 1 == 1 { 0 } else { 255 })
        .collect();
    image::save_buffer_with_format(
        path.as_ref(),
        &pixels,
        grid.width() as u32,
        grid.height() as u32,
        image::ColorType::L8,
        image::ImageFormat::Jpeg,
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_dump_reloads_identically() {
        let mut grid = Grid::new(4, 5);
        grid.set(0, 0, 1);
        grid.set(1, 3, 1);
        grid.set(3, 4, 1);

        let mut buffer = Vec::new();
        write_text(&grid, &mut buffer).unwrap();
        // One line per row plus the trailing blank line.
        let text = String::from_utf8(buffer.clone()).unwrap();
        assert_eq!(text.lines().count(), 4);
        assert!(text.ends_with("\n\n"));

        let reloaded = read_text(4, 5, &mut buffer.as_slice()).unwrap();
        assert_eq!(grid, reloaded);
    }

    #[test]
    fn console_render_marks_live_cells() {
        let mut grid = Grid::new(2, 3);
        grid.set(0, 1, 1);
        let mut buffer = Vec::new();
        render_console(&grid, 7, &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.contains("|.O.|"));
        assert!(text.contains("generation: 7"));
    }
}
