//! Movement component for entities walking on the tile grid
//!
//! Setting a target asks the movement system to plan a path there; the
//! system clears `moving` once the entity arrives or no path exists.

use crate::pathfinding::{GridPos, PathMode};

crate::component! {
    /// Grid walking state
    pub struct Movement("Movement") {
        /// Cells per second
        speed: f32 = 4.0,
        /// Target column, negative when idle
        target_x: f32 = -1.0,
        /// Target row, negative when idle
        target_y: f32 = -1.0,
        /// True while following a path
        moving: bool = false,
        /// Path mode name, see [`PathMode`]; empty uses the pathfinder's default
        mode: String = String::new(),
    }
}

impl Movement {
    /// Request a walk to a cell
    #[allow(clippy::cast_precision_loss)]
    pub fn go_to(&mut self, target: GridPos) {
        self.target_x = target.x as f32;
        self.target_y = target.y as f32;
        self.moving = true;
    }

    /// Drop the current target
    pub fn stop(&mut self) {
        self.target_x = -1.0;
        self.target_y = -1.0;
        self.moving = false;
    }

    /// Requested target cell, if any
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn target(&self) -> Option<GridPos> {
        if self.target_x < 0.0 || self.target_y < 0.0 {
            return None;
        }
        Some(GridPos::new(self.target_x as usize, self.target_y as usize))
    }

    /// Parsed path mode, `None` when the entity does not name one
    pub fn path_mode(&self) -> Option<PathMode> {
        if self.mode.is_empty() {
            None
        } else {
            Some(PathMode::from_name(&self.mode))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_go_to_and_stop() {
        let mut movement = Movement::default();
        assert_eq!(movement.target(), None);

        movement.go_to(GridPos::new(3, 7));
        assert!(movement.moving);
        assert_eq!(movement.target(), Some(GridPos::new(3, 7)));

        movement.stop();
        assert!(!movement.moving);
        assert_eq!(movement.target(), None);
    }

    #[test]
    fn test_mode_parsing() {
        let movement = Movement {
            mode: "DiagonalFree".into(),
            ..Movement::default()
        };
        assert_eq!(movement.path_mode(), Some(PathMode::DiagonalFree));
        assert_eq!(Movement::default().path_mode(), None);
    }
}
