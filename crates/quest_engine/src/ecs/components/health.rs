//! Health component

crate::component! {
    /// Hit points of a creature or player
    pub struct Health("Health") {
        /// Current hit points
        hp: f32 = 1.0,
        /// Maximum hit points
        max_hp: f32 = 1.0,
        /// Ignores incoming damage
        invulnerable: bool = false,
    }
}

impl Health {
    /// Full health with the given maximum
    pub fn full(max_hp: f32) -> Self {
        Self {
            hp: max_hp,
            max_hp,
            invulnerable: false,
        }
    }

    /// Apply damage, returns the hit points left
    pub fn take_damage(&mut self, amount: f32) -> f32 {
        if !self.invulnerable {
            self.hp = (self.hp - amount.max(0.0)).max(0.0);
        }
        self.hp
    }

    /// Restore hit points up to the maximum
    pub fn heal(&mut self, amount: f32) {
        self.hp = (self.hp + amount.max(0.0)).min(self.max_hp);
    }

    /// True once hit points reach zero
    pub fn is_dead(&self) -> bool {
        self.hp <= 0.0
    }
}
