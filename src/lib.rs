//! Distributed Conway's Game of Life.
//!
//! The grid is split into horizontal row bands, one per worker rank. Each
//! generation a worker updates its owned rows in place (two-bit encoding,
//! no scratch grid) and swaps boundary rows with its row-neighbors. The
//! coordinator (rank 0) owns the authoritative grid: it distributes the
//! initial bands, gathers owned rows back at snapshot generations, and can
//! halt the run early when snapshot comparison finds a repeating
//! configuration.

pub mod cluster;
pub mod detector;
pub mod engine;
pub mod error;
pub mod grid;
pub mod output;
pub mod stats;
