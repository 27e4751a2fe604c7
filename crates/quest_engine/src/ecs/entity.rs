//! Entity implementation
//!
//! An entity is a node in the scene tree: it has an id, a name, an optional
//! tag, a parent, ordered children and a set of components keyed by name.
//! Tree edges and index membership are maintained by the
//! [`EntityManager`](super::manager::EntityManager); the entity itself only
//! stores them.

use std::collections::HashMap;
use std::fmt;

use super::component::{Component, ComponentInfo, ComponentRegistry, ComponentSlot};
use super::error::EcsError;
use super::prefab::ComponentValues;
use super::query::ComponentSet;
use crate::foundation::bitfield::Bitfield;

/// Entity identifier, assigned in increasing order by the entity manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(u32);

impl EntityId {
    /// Wrap a raw id
    pub const fn from_raw(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw id
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A game object: identity, tree links and components
#[derive(Debug)]
pub struct Entity {
    id: EntityId,
    name: String,
    tag: Option<String>,
    parent: Option<EntityId>,
    children: Vec<EntityId>,
    components: HashMap<&'static str, ComponentSlot>,
    bits: Bitfield,
    prefab: Option<ComponentValues>,
}

impl Entity {
    pub(crate) fn new(id: EntityId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            tag: None,
            parent: None,
            children: Vec::new(),
            components: HashMap::new(),
            bits: Bitfield::empty(),
            prefab: None,
        }
    }

    /// Get the entity ID
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// Human readable name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename the entity
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Unique secondary key, if tagged
    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    pub(crate) fn set_tag(&mut self, tag: Option<String>) {
        self.tag = tag;
    }

    /// Parent entity, `None` for the world root or a detached entity
    pub const fn parent(&self) -> Option<EntityId> {
        self.parent
    }

    pub(crate) fn set_parent(&mut self, parent: Option<EntityId>) {
        self.parent = parent;
    }

    /// Children in attach order
    pub fn children(&self) -> &[EntityId] {
        &self.children
    }

    /// Child at a position in attach order
    pub fn child_by_index(&self, index: usize) -> Option<EntityId> {
        self.children.get(index).copied()
    }

    pub(crate) fn add_child(&mut self, child: EntityId) {
        if !self.children.contains(&child) {
            self.children.push(child);
        }
    }

    pub(crate) fn remove_child(&mut self, child: EntityId) -> bool {
        match self.children.iter().position(|id| *id == child) {
            Some(index) => {
                self.children.remove(index);
                true
            }
            None => false,
        }
    }

    /// Union of the bits of all attached components
    pub const fn bits(&self) -> Bitfield {
        self.bits
    }

    /// True if the entity carries every component in `mask`
    pub fn has_components(&self, mask: Bitfield) -> bool {
        self.bits.mask_test(mask)
    }

    /// Typed component lookup
    pub fn get_component<T: Component>(&self) -> Option<&T> {
        self.components.get(T::NAME)?.downcast_ref::<T>()
    }

    /// Mutable typed component lookup
    pub fn get_component_mut<T: Component>(&mut self) -> Option<&mut T> {
        self.components.get_mut(T::NAME)?.downcast_mut::<T>()
    }

    /// Component slot by name
    pub fn component(&self, name: &str) -> Option<&ComponentSlot> {
        self.components.get(name)
    }

    /// Mutable component slot by name
    pub fn component_mut(&mut self, name: &str) -> Option<&mut ComponentSlot> {
        self.components.get_mut(name)
    }

    /// Names of all attached components
    pub fn component_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.components.keys().copied()
    }

    /// Typed view over several components, `None` unless all are attached
    pub fn node<Q: ComponentSet>(&self) -> Option<Q::Refs<'_>> {
        Q::fetch(self)
    }

    /// Mutable typed view over several distinct components
    pub fn node_mut<Q: ComponentSet>(&mut self) -> Option<Q::Muts<'_>> {
        Q::fetch_mut(self)
    }

    pub(crate) fn slots_mut(&mut self) -> impl Iterator<Item = (&'static str, &mut ComponentSlot)> {
        self.components.iter_mut().map(|(name, slot)| (*name, slot))
    }

    /// Attach a component slot, returning the one it replaced
    pub(crate) fn insert_component(&mut self, info: &ComponentInfo, slot: ComponentSlot) -> Option<ComponentSlot> {
        self.bits.insert(info.bit);
        self.components.insert(info.name, slot)
    }

    pub(crate) fn remove_component(&mut self, info: &ComponentInfo) -> Option<ComponentSlot> {
        let slot = self.components.remove(info.name)?;
        self.bits.remove(info.bit);
        Some(slot)
    }

    pub(crate) fn take_components(&mut self) -> Vec<&'static str> {
        self.bits = Bitfield::empty();
        self.components.drain().map(|(name, _)| name).collect()
    }

    /// Component values this entity was instantiated from
    pub fn prefab_values(&self) -> Option<&ComponentValues> {
        self.prefab.as_ref()
    }

    pub(crate) fn set_prefab_values(&mut self, values: ComponentValues) {
        self.prefab = Some(values);
    }

    /// Assign attribute strings onto components that are already attached
    ///
    /// Components the entity does not carry and fields missing from a schema
    /// are skipped; nothing is added or removed.
    pub fn apply_values(&mut self, registry: &ComponentRegistry, values: &ComponentValues) -> Result<(), EcsError> {
        for (component, attributes) in values {
            let (Some(slot), Some(info)) = (self.components.get_mut(component.as_str()), registry.info(component))
            else {
                continue;
            };
            for (field, raw) in attributes {
                slot.assign(info, field, raw)?;
            }
        }
        Ok(())
    }

    /// Parse a `component -> attribute -> string` JSON document and apply it
    /// with [`apply_values`](Self::apply_values)
    pub fn initialize_from_json(&mut self, registry: &ComponentRegistry, data: &str) -> Result<(), EcsError> {
        let values: ComponentValues = serde_json::from_str(data)?;
        self.apply_values(registry, &values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::components::{Health, Transform};

    fn registry() -> ComponentRegistry {
        let mut registry = ComponentRegistry::new();
        registry.register::<Transform>().unwrap();
        registry.register::<Health>().unwrap();
        registry
    }

    fn attach<T: Component>(entity: &mut Entity, registry: &ComponentRegistry) {
        let info = registry.info_of::<T>().unwrap();
        entity.insert_component(info, ComponentSlot::new(info.instantiate()));
    }

    #[test]
    fn test_bits_track_attached_components() {
        let registry = registry();
        let mut entity = Entity::new(EntityId::from_raw(1), "hero");
        let transform = registry.bit_of::<Transform>().unwrap();
        let health = registry.bit_of::<Health>().unwrap();

        attach::<Transform>(&mut entity, &registry);
        assert!(entity.has_components(transform));
        assert!(!entity.has_components(transform | health));

        attach::<Health>(&mut entity, &registry);
        assert!(entity.has_components(transform | health));

        entity.remove_component(registry.info_of::<Transform>().unwrap());
        assert!(!entity.has_components(transform));
        assert!(entity.has_components(health));
        assert!(entity.get_component::<Transform>().is_none());
    }

    #[test]
    fn test_initialize_from_json_only_touches_existing_components() {
        let registry = registry();
        let mut entity = Entity::new(EntityId::from_raw(1), "hero");
        attach::<Health>(&mut entity, &registry);

        entity
            .initialize_from_json(
                &registry,
                r#"{"Health": {"hp": "40", "bogus": "1"}, "Transform": {"x": "3"}}"#,
            )
            .unwrap();

        assert_eq!(entity.get_component::<Health>().unwrap().hp, 40.0);
        assert!(entity.get_component::<Transform>().is_none());
    }

    #[test]
    fn test_initialize_from_json_rejects_malformed_documents() {
        let registry = registry();
        let mut entity = Entity::new(EntityId::from_raw(1), "hero");
        let err = entity.initialize_from_json(&registry, "{not json").unwrap_err();
        assert!(matches!(err, EcsError::MalformedPrefab(_)));
    }

    #[test]
    fn test_children_keep_attach_order() {
        let mut entity = Entity::new(EntityId::from_raw(1), "parent");
        entity.add_child(EntityId::from_raw(4));
        entity.add_child(EntityId::from_raw(2));
        entity.add_child(EntityId::from_raw(4));
        assert_eq!(entity.children(), &[EntityId::from_raw(4), EntityId::from_raw(2)]);
        assert_eq!(entity.child_by_index(1), Some(EntityId::from_raw(2)));
        assert!(entity.remove_child(EntityId::from_raw(4)));
        assert!(!entity.remove_child(EntityId::from_raw(4)));
        assert_eq!(entity.child_by_index(0), Some(EntityId::from_raw(2)));
    }
}
