//! Grid occupancy component
//!
//! Entities with a blocking collider mark the cell they stand on as
//! collidable in the pathing grid, so other walkers route around them.

crate::component! {
    /// Occupies a grid cell while standing on it
    pub struct Collidable("Collidable") {
        /// Whether the occupied cell blocks other walkers
        blocking: bool = true,
    }
}
