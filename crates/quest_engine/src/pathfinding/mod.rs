//! Grid pathfinding
//!
//! The map is a grid of per-cell flag sets. A query passes the flags that
//! should block it; a cell is walkable when it carries none of them. The
//! [`Pathfinder`] keeps the grid up to date as entities occupy and vacate
//! cells and runs A* over it.

pub mod astar;
pub mod grid;

pub use astar::{find_path, PathMode};
pub use grid::{PathGrid, Pathfinder, PathingFlags};

use std::fmt;

/// Cell coordinate on the tile grid
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridPos {
    /// Column
    pub x: usize,
    /// Row
    pub y: usize,
}

impl GridPos {
    /// Create a grid position
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }

    /// Manhattan distance to another cell
    pub const fn manhattan(self, other: Self) -> usize {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// True if `other` is one of the eight surrounding cells
    pub const fn is_adjacent(self, other: Self) -> bool {
        let dx = self.x.abs_diff(other.x);
        let dy = self.y.abs_diff(other.y);
        dx <= 1 && dy <= 1 && dx + dy > 0
    }
}

impl fmt::Display for GridPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}
