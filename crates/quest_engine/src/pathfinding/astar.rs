//! A* search over a [`PathGrid`]

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use super::grid::{PathGrid, PathingFlags};
use super::GridPos;

/// Neighbour rule and distance metric for a search
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum PathMode {
    /// Four neighbours, Manhattan distance
    #[default]
    Manhattan,
    /// Eight neighbours, diagonals only when both adjacent orthogonals are open
    Diagonal,
    /// Eight neighbours, diagonals allowed through corners
    DiagonalFree,
    /// Like [`PathMode::Diagonal`] with Euclidean distance
    Euclidean,
    /// Like [`PathMode::DiagonalFree`] with Euclidean distance
    EuclideanFree,
}

impl PathMode {
    /// All modes
    pub const ALL: [Self; 5] = [
        Self::Manhattan,
        Self::Diagonal,
        Self::DiagonalFree,
        Self::Euclidean,
        Self::EuclideanFree,
    ];

    /// Mode from its name, falling back to Manhattan for unknown names
    pub fn from_name(name: &str) -> Self {
        name.parse().unwrap_or_else(|_| {
            log::warn!("Unknown path mode '{}', using Manhattan", name);
            Self::Manhattan
        })
    }

    /// Name used in prefabs and configuration
    pub const fn name(self) -> &'static str {
        match self {
            Self::Manhattan => "Manhattan",
            Self::Diagonal => "Diagonal",
            Self::DiagonalFree => "DiagonalFree",
            Self::Euclidean => "Euclidean",
            Self::EuclideanFree => "EuclideanFree",
        }
    }

    const fn allows_diagonals(self) -> bool {
        !matches!(self, Self::Manhattan)
    }

    const fn cuts_corners(self) -> bool {
        matches!(self, Self::DiagonalFree | Self::EuclideanFree)
    }

    /// Distance between two cells under this mode's metric
    pub fn distance(self, a: GridPos, b: GridPos) -> f32 {
        let dx = a.x.abs_diff(b.x) as f32;
        let dy = a.y.abs_diff(b.y) as f32;
        match self {
            Self::Manhattan => dx + dy,
            Self::Diagonal | Self::DiagonalFree => dx.max(dy),
            Self::Euclidean | Self::EuclideanFree => (dx * dx + dy * dy).sqrt(),
        }
    }
}

impl fmt::Display for PathMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PathMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown path mode '{s}'"))
    }
}

#[derive(Debug)]
struct Node {
    pos: GridPos,
    parent: Option<usize>,
    g: f32,
    f: f32,
    closed: bool,
}

/// Shortest path from `start` to `goal` over cells not blocked by `flags`
///
/// The returned path includes both ends. It is `[start]` when the two
/// coincide and empty when either end is off the grid or no path exists.
/// The start cell itself is never tested for passability.
pub fn find_path(grid: &PathGrid, start: GridPos, goal: GridPos, mode: PathMode, flags: PathingFlags) -> Vec<GridPos> {
    if !grid.in_bounds(start) || !grid.in_bounds(goal) {
        return Vec::new();
    }
    if start == goal {
        return vec![start];
    }

    let key = |pos: GridPos| pos.x + pos.y * grid.cols();

    let mut nodes = vec![Node {
        pos: start,
        parent: None,
        g: 0.0,
        f: mode.distance(start, goal),
        closed: false,
    }];
    let mut visited: HashMap<usize, usize> = HashMap::new();
    visited.insert(key(start), 0);
    let mut open: Vec<usize> = vec![0];

    while !open.is_empty() {
        // First node with the lowest f wins ties
        let mut best = 0;
        for (i, &slot) in open.iter().enumerate().skip(1) {
            if nodes[slot].f < nodes[open[best]].f {
                best = i;
            }
        }
        let current = open.remove(best);
        let pos = nodes[current].pos;

        if pos == goal {
            return reconstruct(&nodes, current);
        }
        nodes[current].closed = true;

        for next in successors(grid, pos, mode, flags) {
            let g = nodes[current].g + mode.distance(pos, next);
            match visited.get(&key(next)) {
                Some(&slot) => {
                    let node = &mut nodes[slot];
                    if !node.closed && g < node.g {
                        node.g = g;
                        node.f = g + mode.distance(next, goal);
                        node.parent = Some(current);
                    }
                }
                None => {
                    let slot = nodes.len();
                    nodes.push(Node {
                        pos: next,
                        parent: Some(current),
                        g,
                        f: g + mode.distance(next, goal),
                        closed: false,
                    });
                    visited.insert(key(next), slot);
                    open.push(slot);
                }
            }
        }
    }

    Vec::new()
}

fn reconstruct(nodes: &[Node], mut slot: usize) -> Vec<GridPos> {
    let mut path = vec![nodes[slot].pos];
    while let Some(parent) = nodes[slot].parent {
        path.push(nodes[parent].pos);
        slot = parent;
    }
    path.reverse();
    path
}

/// Walkable neighbours of `pos`: north, east, south, west, then the diagonals
fn successors(grid: &PathGrid, pos: GridPos, mode: PathMode, flags: PathingFlags) -> Vec<GridPos> {
    let open = |dx: isize, dy: isize| -> Option<GridPos> {
        let x = pos.x.checked_add_signed(dx)?;
        let y = pos.y.checked_add_signed(dy)?;
        grid.is_passable(x, y, flags).then_some(GridPos::new(x, y))
    };

    let north = open(0, -1);
    let east = open(1, 0);
    let south = open(0, 1);
    let west = open(-1, 0);

    let mut result: Vec<GridPos> = [north, east, south, west].into_iter().flatten().collect();
    if !mode.allows_diagonals() {
        return result;
    }

    let corners = [
        (1, -1, north, east),
        (1, 1, south, east),
        (-1, 1, south, west),
        (-1, -1, north, west),
    ];
    for (dx, dy, a, b) in corners {
        let reachable = if mode.cuts_corners() {
            true
        } else {
            a.is_some() && b.is_some()
        };
        if reachable {
            if let Some(cell) = open(dx, dy) {
                result.push(cell);
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLOCK: PathingFlags = PathingFlags::OBSTACLES.union(PathingFlags::COLLIDABLES);

    fn is_connected(path: &[GridPos], diagonal: bool) -> bool {
        path.windows(2).all(|pair| {
            if diagonal {
                pair[0].is_adjacent(pair[1])
            } else {
                pair[0].manhattan(pair[1]) == 1
            }
        })
    }

    #[test]
    fn test_open_grid_manhattan_path_length() {
        let grid = PathGrid::new(5, 5);
        let path = find_path(&grid, GridPos::new(0, 0), GridPos::new(4, 4), PathMode::Manhattan, BLOCK);
        assert_eq!(path.len(), 9);
        assert_eq!(path.first(), Some(&GridPos::new(0, 0)));
        assert_eq!(path.last(), Some(&GridPos::new(4, 4)));
        assert!(is_connected(&path, false));
    }

    #[test]
    fn test_open_grid_diagonal_path_is_shorter() {
        let grid = PathGrid::new(5, 5);
        let path = find_path(&grid, GridPos::new(0, 0), GridPos::new(4, 4), PathMode::Diagonal, BLOCK);
        assert_eq!(path.len(), 5);
        assert!(is_connected(&path, true));
    }

    #[test]
    fn test_same_start_and_goal() {
        let grid = PathGrid::new(3, 3);
        let path = find_path(&grid, GridPos::new(1, 1), GridPos::new(1, 1), PathMode::Manhattan, BLOCK);
        assert_eq!(path, vec![GridPos::new(1, 1)]);
    }

    #[test]
    fn test_out_of_bounds_is_empty() {
        let grid = PathGrid::new(3, 3);
        assert!(find_path(&grid, GridPos::new(0, 0), GridPos::new(3, 0), PathMode::Manhattan, BLOCK).is_empty());
        assert!(find_path(&grid, GridPos::new(9, 9), GridPos::new(0, 0), PathMode::Manhattan, BLOCK).is_empty());
    }

    #[test]
    fn test_enclosed_goal_is_unreachable() {
        let map = vec![
            vec![0, 0, 0, 0, 0],
            vec![0, 1, 1, 1, 0],
            vec![0, 1, 0, 1, 0],
            vec![0, 1, 1, 1, 0],
            vec![0, 0, 0, 0, 0],
        ];
        let grid = PathGrid::from_rows(&map);
        for mode in PathMode::ALL {
            let path = find_path(&grid, GridPos::new(0, 0), GridPos::new(2, 2), mode, BLOCK);
            assert!(path.is_empty(), "{mode} reached an enclosed cell");
        }
    }

    #[test]
    fn test_goal_blocked_by_flag() {
        let mut grid = PathGrid::new(3, 1);
        grid.set(2, 0, PathingFlags::COLLIDABLES, true);
        let goal = GridPos::new(2, 0);
        assert!(find_path(&grid, GridPos::new(0, 0), goal, PathMode::Manhattan, BLOCK).is_empty());
        // Same cell is fine when the query does not include collidables
        let path = find_path(&grid, GridPos::new(0, 0), goal, PathMode::Manhattan, PathingFlags::OBSTACLES);
        assert_eq!(path.len(), 3);
    }

    #[test]
    fn test_corner_cutting_depends_on_mode() {
        // Wall cells at (1, 0) and (0, 1) seal the corner
        let map = vec![vec![0, 1], vec![1, 0]];
        let grid = PathGrid::from_rows(&map);
        let start = GridPos::new(0, 0);
        let goal = GridPos::new(1, 1);

        assert!(find_path(&grid, start, goal, PathMode::Diagonal, BLOCK).is_empty());
        assert!(find_path(&grid, start, goal, PathMode::Euclidean, BLOCK).is_empty());
        assert_eq!(find_path(&grid, start, goal, PathMode::DiagonalFree, BLOCK), vec![start, goal]);
        assert_eq!(find_path(&grid, start, goal, PathMode::EuclideanFree, BLOCK), vec![start, goal]);
    }

    #[test]
    fn test_path_routes_around_wall() {
        let map = vec![
            vec![0, 0, 0, 0],
            vec![1, 1, 1, 0],
            vec![0, 0, 0, 0],
        ];
        let grid = PathGrid::from_rows(&map);
        let path = find_path(&grid, GridPos::new(0, 0), GridPos::new(0, 2), PathMode::Manhattan, BLOCK);
        assert_eq!(path.len(), 9);
        assert!(path.iter().all(|pos| grid.is_passable(pos.x, pos.y, BLOCK)));
        assert!(is_connected(&path, false));
    }

    #[test]
    fn test_start_cell_is_not_tested() {
        let mut grid = PathGrid::new(3, 1);
        grid.set(0, 0, PathingFlags::COLLIDABLES, true);
        let path = find_path(&grid, GridPos::new(0, 0), GridPos::new(2, 0), PathMode::Manhattan, BLOCK);
        assert_eq!(path.len(), 3);
    }

    #[test]
    fn test_euclidean_prefers_straight_lines() {
        let grid = PathGrid::new(5, 1);
        let path = find_path(&grid, GridPos::new(0, 0), GridPos::new(4, 0), PathMode::Euclidean, BLOCK);
        assert!(path.iter().all(|pos| pos.y == 0));
        assert_eq!(path.len(), 5);
    }

    #[test]
    fn test_mode_names() {
        assert_eq!(PathMode::from_name("diagonalfree"), PathMode::DiagonalFree);
        assert_eq!(PathMode::from_name("Euclidean"), PathMode::Euclidean);
        assert_eq!(PathMode::from_name("teleport"), PathMode::Manhattan);
        assert!("teleport".parse::<PathMode>().is_err());
        assert_eq!(PathMode::EuclideanFree.to_string(), "EuclideanFree");
    }
}
