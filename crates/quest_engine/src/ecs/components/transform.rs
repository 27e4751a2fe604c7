//! Transform component
//!
//! Position of an entity on the tile map, in cell units. Prefabs may place
//! entities at fractional positions; the occupied cell is the nearest one.

use crate::pathfinding::GridPos;

crate::component! {
    /// Position and facing of an entity
    pub struct Transform("Transform") {
        /// Column, in cells
        x: f32 = 0.0,
        /// Row, in cells
        y: f32 = 0.0,
        /// Facing: "up", "down", "left" or "right"
        orientation: String = String::from("down"),
    }
}

impl Transform {
    /// Create a transform at a position
    pub fn at(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            ..Self::default()
        }
    }

    /// Cell the entity currently stands on, `None` off the map's positive quadrant
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn cell(&self) -> Option<GridPos> {
        let (x, y) = (self.x.round(), self.y.round());
        if x < 0.0 || y < 0.0 {
            return None;
        }
        Some(GridPos::new(x as usize, y as usize))
    }

    /// Snap onto a cell
    #[allow(clippy::cast_precision_loss)]
    pub fn set_cell(&mut self, cell: GridPos) {
        self.x = cell.x as f32;
        self.y = cell.y as f32;
    }

    /// Turn to face a neighbouring cell
    #[allow(clippy::cast_precision_loss)]
    pub fn face(&mut self, target: GridPos) {
        let dx = target.x as f32 - self.x;
        let dy = target.y as f32 - self.y;
        let orientation = if dx.abs() >= dy.abs() {
            if dx >= 0.0 { "right" } else { "left" }
        } else if dy >= 0.0 {
            "down"
        } else {
            "up"
        };
        self.orientation = orientation.to_string();
    }
}
