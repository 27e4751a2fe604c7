//! Loot component

crate::component! {
    /// Item lying on the ground, picked up by walking onto its cell
    pub struct Loot("Loot") {
        /// Item kind
        item: String = String::new(),
        /// Stack size
        amount: f32 = 1.0,
    }
}
