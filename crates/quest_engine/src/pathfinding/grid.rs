//! Pathing grid and the pathfinder wrapper around it

use bitflags::bitflags;

use super::astar::{find_path, PathMode};
use super::GridPos;

bitflags! {
    /// Per-cell occupancy flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PathingFlags: u8 {
        /// Cell occupied by a blocking entity
        const COLLIDABLES = 1 << 0;
        /// Cell reserved as some walker's destination
        const DESTINATIONS = 1 << 1;
        /// Static map obstacle
        const OBSTACLES = 1 << 2;
        /// Collidable that searches carrying this flag may pass through
        const IGNORE = 1 << 3;
    }
}

/// Rectangular grid of cell flags, indexed `x + y * cols`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathGrid {
    cols: usize,
    rows: usize,
    cells: Vec<PathingFlags>,
}

impl PathGrid {
    /// Create an empty grid
    pub fn new(cols: usize, rows: usize) -> Self {
        Self {
            cols,
            rows,
            cells: vec![PathingFlags::empty(); cols * rows],
        }
    }

    /// Build a grid from rows of 0 / nonzero values, nonzero cells become obstacles
    ///
    /// Rows shorter than the longest row are padded with obstacles.
    pub fn from_rows(rows: &[Vec<u8>]) -> Self {
        let cols = rows.iter().map(Vec::len).max().unwrap_or(0);
        let mut grid = Self::new(cols, rows.len());
        for (y, row) in rows.iter().enumerate() {
            for x in 0..cols {
                if row.get(x).map_or(true, |value| *value != 0) {
                    grid.cells[x + y * cols] = PathingFlags::OBSTACLES;
                }
            }
        }
        grid
    }

    /// Number of columns
    pub const fn cols(&self) -> usize {
        self.cols
    }

    /// Number of rows
    pub const fn rows(&self) -> usize {
        self.rows
    }

    /// Linear index of a cell, `None` out of bounds
    pub const fn index(&self, x: usize, y: usize) -> Option<usize> {
        if x < self.cols && y < self.rows {
            Some(x + y * self.cols)
        } else {
            None
        }
    }

    /// True if the cell is on the grid
    pub const fn in_bounds(&self, pos: GridPos) -> bool {
        pos.x < self.cols && pos.y < self.rows
    }

    /// Flags of a cell
    pub fn get(&self, x: usize, y: usize) -> Option<PathingFlags> {
        self.index(x, y).map(|index| self.cells[index])
    }

    /// Set or clear flags on a cell, false out of bounds
    pub fn set(&mut self, x: usize, y: usize, flags: PathingFlags, on: bool) -> bool {
        let Some(index) = self.index(x, y) else {
            return false;
        };
        self.cells[index].set(flags, on);
        true
    }

    /// True if a walker blocked by `query` may enter the cell
    ///
    /// When both the query and the cell carry [`PathingFlags::IGNORE`], the
    /// cell's collidable and ignore bits are disregarded for this test.
    pub fn is_passable(&self, x: usize, y: usize, query: PathingFlags) -> bool {
        let Some(mut cell) = self.get(x, y) else {
            return false;
        };
        if query.contains(PathingFlags::IGNORE) && cell.contains(PathingFlags::IGNORE) {
            cell.remove(PathingFlags::COLLIDABLES | PathingFlags::IGNORE);
        }
        !cell.intersects(query)
    }
}

/// Owns the pathing grid, keeps it in sync with the world and answers path queries
#[derive(Debug, Clone, Default)]
pub struct Pathfinder {
    grid: PathGrid,
    default_mode: PathMode,
}

impl Pathfinder {
    /// Create a pathfinder over an empty grid
    pub fn new(cols: usize, rows: usize) -> Self {
        Self {
            grid: PathGrid::new(cols, rows),
            default_mode: PathMode::default(),
        }
    }

    /// Create a pathfinder from a collision map
    pub fn from_rows(rows: &[Vec<u8>]) -> Self {
        Self {
            grid: PathGrid::from_rows(rows),
            default_mode: PathMode::default(),
        }
    }

    /// Rebuild the grid from a collision map, dropping all runtime flags
    pub fn rebuild(&mut self, rows: &[Vec<u8>]) {
        self.grid = PathGrid::from_rows(rows);
        log::debug!("Pathing grid rebuilt at {}x{}", self.grid.cols(), self.grid.rows());
    }

    /// Underlying grid
    pub const fn grid(&self) -> &PathGrid {
        &self.grid
    }

    /// Mode used for walkers that do not name one
    pub const fn default_mode(&self) -> PathMode {
        self.default_mode
    }

    /// Change the mode used for walkers that do not name one
    pub fn set_default_mode(&mut self, mode: PathMode) {
        self.default_mode = mode;
    }

    /// Mark a cell as a walker's destination
    pub fn set_destination(&mut self, x: usize, y: usize) -> bool {
        self.grid.set(x, y, PathingFlags::DESTINATIONS, true)
    }

    /// Release a destination cell
    pub fn clear_destination(&mut self, x: usize, y: usize) -> bool {
        self.grid.set(x, y, PathingFlags::DESTINATIONS, false)
    }

    /// Mark a cell as occupied
    pub fn set_collidable(&mut self, x: usize, y: usize) -> bool {
        self.grid.set(x, y, PathingFlags::COLLIDABLES, true)
    }

    /// Mark a cell as vacated
    pub fn clear_collidable(&mut self, x: usize, y: usize) -> bool {
        self.grid.set(x, y, PathingFlags::COLLIDABLES, false)
    }

    /// Mark a cell as see-through for ignoring searches
    pub fn set_ignore(&mut self, x: usize, y: usize) -> bool {
        self.grid.set(x, y, PathingFlags::IGNORE, true)
    }

    /// Remove the see-through mark
    pub fn clear_ignore(&mut self, x: usize, y: usize) -> bool {
        self.grid.set(x, y, PathingFlags::IGNORE, false)
    }

    /// True if the cell carries any of `flags`
    pub fn has(&self, x: usize, y: usize, flags: PathingFlags) -> bool {
        self.grid.get(x, y).is_some_and(|cell| cell.intersects(flags))
    }

    /// Shortest path from `start` to `goal`, both included
    ///
    /// Empty when no path exists; `[start]` when start and goal coincide.
    pub fn find_path(&self, start: GridPos, goal: GridPos, mode: PathMode, flags: PathingFlags) -> Vec<GridPos> {
        find_path(&self.grid, start, goal, mode, flags)
    }
}
