//! Identity component
//!
//! Carries the identity the server assigned to an entity. Prefabs supply a
//! default that is overwritten when the server spawns the entity.

crate::component! {
    /// Server-facing identity
    pub struct Identifiable("Identifiable") {
        /// Server id, negative until assigned
        id: i32 = -1,
        /// Entity kind, e.g. "rat" or "warrior"
        kind: String = String::new(),
        /// Display name
        name: String = String::new(),
    }
}

impl Identifiable {
    /// True once the server has assigned an id
    pub const fn is_assigned(&self) -> bool {
        self.id >= 0
    }
}
