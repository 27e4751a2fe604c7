//! Entity manager
//!
//! Owns every live entity, the tag table and one insertion-ordered index per
//! component type. All structural changes go through here so that an entity
//! is listed in a component's index exactly while it carries that component,
//! and parent/child links always agree on both ends.

use std::collections::HashMap;

use super::component::{Component, ComponentRegistry, ComponentSlot};
use super::components::{Identifiable, Transform};
use super::entity::{Entity, EntityId};
use super::error::EcsError;
use super::prefab::{Prefab, PrefabLibrary};
use super::query::ComponentSet;
use crate::foundation::bitfield::Bitfield;
use crate::foundation::collections::IndexList;

/// Name and tag of the world root entity
pub const WORLD_TAG: &str = "World";

/// Identity supplied by the server when spawning from a loaded prefab
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityOverride {
    /// Entity kind
    pub kind: Option<String>,
    /// Server id
    pub id: Option<i32>,
    /// Display name
    pub name: Option<String>,
}

impl IdentityOverride {
    /// Override only the server id
    pub fn with_id(id: i32) -> Self {
        Self {
            id: Some(id),
            ..Self::default()
        }
    }

    fn is_empty(&self) -> bool {
        self.kind.is_none() && self.id.is_none() && self.name.is_none()
    }
}

/// Registry of all live entities and their per-component indices
#[derive(Debug)]
pub struct EntityManager {
    registry: ComponentRegistry,
    entities: HashMap<EntityId, Entity>,
    tags: HashMap<String, EntityId>,
    indices: HashMap<&'static str, IndexList<EntityId>>,
    next_id: u32,
    root: EntityId,
}

impl EntityManager {
    /// Create a manager with a fresh world root
    ///
    /// The root is named and tagged [`WORLD_TAG`] and carries a [`Transform`],
    /// which is registered if the registry does not know it yet.
    pub fn new(mut registry: ComponentRegistry) -> Result<Self, EcsError> {
        registry.register::<Transform>()?;

        let mut manager = Self {
            registry,
            entities: HashMap::new(),
            tags: HashMap::new(),
            indices: HashMap::new(),
            next_id: 0,
            root: EntityId::from_raw(0),
        };
        manager.root = manager.create_root()?;
        Ok(manager)
    }

    /// Manager over the built-in component types
    pub fn with_builtin_components() -> Result<Self, EcsError> {
        Self::new(ComponentRegistry::builtin()?)
    }

    fn create_root(&mut self) -> Result<EntityId, EcsError> {
        let root = self.create_entity(WORLD_TAG, None)?;
        self.add_component::<Transform>(root)?;
        self.set_tag(root, WORLD_TAG)?;
        log::debug!("Created world root {}", root);
        Ok(root)
    }

    /// Drop every entity and start over with a new root
    ///
    /// Ids keep increasing across a reset and are never reused.
    pub fn clear(&mut self) -> Result<(), EcsError> {
        let count = self.entities.len();
        self.entities.clear();
        self.tags.clear();
        self.indices.clear();
        self.root = self.create_root()?;
        log::info!("Entity manager reset, dropped {} entities", count);
        Ok(())
    }

    /// Component registry
    pub const fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    /// Mutable component registry, for registering game specific types
    pub fn registry_mut(&mut self) -> &mut ComponentRegistry {
        &mut self.registry
    }

    /// The world root entity
    pub const fn root(&self) -> EntityId {
        self.root
    }

    /// Number of live entities, root included
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Always false, the root exists for the manager's whole life
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// True if the id refers to a live entity
    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Iterate over all live entities in no particular order
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    // ---------------------------------------------------------------------
    // Construction
    // ---------------------------------------------------------------------

    /// Create an empty entity, optionally attached under `parent`
    pub fn create_entity(&mut self, name: &str, parent: Option<EntityId>) -> Result<EntityId, EcsError> {
        if let Some(parent) = parent {
            if !self.entities.contains_key(&parent) {
                return Err(EcsError::MissingEntity(parent));
            }
        }

        let id = EntityId::from_raw(self.next_id);
        self.next_id += 1;
        self.entities.insert(id, Entity::new(id, name));

        if let Some(parent) = parent {
            self.link(parent, id);
        }
        Ok(id)
    }

    /// Instantiate a prefab tree under `parent`
    ///
    /// Components are added and their attributes coerced through each
    /// component's schema, then children are built under the new entity
    /// before it is returned. If anything fails the partially built subtree is
    /// deleted again. The tree must already be resolved: a node that still
    /// carries a `ref` is rejected as malformed.
    pub fn create_entity_from_prefab(&mut self, prefab: &Prefab, parent: Option<EntityId>) -> Result<EntityId, EcsError> {
        if let Some(reference) = &prefab.reference {
            return Err(EcsError::MalformedPrefab(format!(
                "'{}' still references '{}', resolve it against a prefab library first",
                prefab.name, reference
            )));
        }
        let id = self.create_entity(&prefab.name, parent)?;
        if let Err(err) = self.populate_from_prefab(id, prefab) {
            log::error!("Failed to instantiate prefab '{}': {}", prefab.name, err);
            self.delete_entity(id);
            return Err(err);
        }
        Ok(id)
    }

    fn populate_from_prefab(&mut self, id: EntityId, prefab: &Prefab) -> Result<(), EcsError> {
        for (component, attributes) in &prefab.components {
            self.add_component_by_name(id, component)?;

            let info = self
                .registry
                .info(component)
                .ok_or_else(|| EcsError::UnknownComponent(component.clone()))?;
            let slot = self
                .entities
                .get_mut(&id)
                .and_then(|entity| entity.component_mut(info.name))
                .ok_or(EcsError::MissingEntity(id))?;
            for (field, raw) in attributes {
                slot.assign(info, field, raw)?;
            }
        }

        if let Some(entity) = self.entities.get_mut(&id) {
            entity.set_prefab_values(prefab.components.clone());
        }
        if let Some(tag) = prefab.effective_tag() {
            self.set_tag(id, tag)?;
        }
        for child in &prefab.children {
            self.create_entity_from_prefab(child, Some(id))?;
        }
        Ok(())
    }

    /// Instantiate a prefab from the loaded library by name
    ///
    /// The parent defaults to the world root. Any identity fields supplied
    /// overwrite the prefab's [`Identifiable`] values and are remembered so a
    /// later [`reload_entity`](Self::reload_entity) keeps them.
    pub fn create_entity_from_loaded_prefab(
        &mut self,
        library: &PrefabLibrary,
        name: &str,
        parent: Option<EntityId>,
        identity: &IdentityOverride,
    ) -> Result<EntityId, EcsError> {
        let Some(prefab) = library.get(name) else {
            log::warn!("Prefab '{}' is not loaded", name);
            return Err(EcsError::UnknownPrefab(name.to_string()));
        };

        let parent = parent.unwrap_or(self.root);
        let id = self.create_entity_from_prefab(prefab, Some(parent))?;

        if !identity.is_empty() {
            if let Some(entity) = self.entities.get_mut(&id) {
                apply_identity(entity, identity);
            }
        }
        Ok(id)
    }

    /// Re-apply prefab attribute values onto existing components, recursively
    ///
    /// Nothing is added or removed; returns false for an unknown entity.
    pub fn reload_entity(&mut self, id: EntityId) -> Result<bool, EcsError> {
        let Some(entity) = self.entities.get_mut(&id) else {
            log::warn!("Cannot reload missing entity {}", id);
            return Ok(false);
        };

        if let Some(values) = entity.prefab_values().cloned() {
            entity.apply_values(&self.registry, &values)?;
        }
        let children = entity.children().to_vec();
        for child in children {
            self.reload_entity(child)?;
        }
        Ok(true)
    }

    // ---------------------------------------------------------------------
    // Components
    // ---------------------------------------------------------------------

    /// Attach a default-initialized component and index the entity under it
    ///
    /// Adding a component that is already attached replaces it (last write
    /// wins) and logs a warning; the index is never duplicated.
    pub fn add_component<T: Component>(&mut self, id: EntityId) -> Result<&mut T, EcsError> {
        self.add_component_by_name(id, T::NAME)?
            .downcast_mut::<T>()
            .ok_or_else(|| EcsError::UnknownComponent(T::NAME.to_string()))
    }

    /// Attach a component instance
    pub fn insert_component<T: Component>(&mut self, id: EntityId, value: T) -> Result<&mut T, EcsError> {
        let component = self.add_component::<T>(id)?;
        *component = value;
        Ok(component)
    }

    /// Attach a default-initialized component by registered name
    pub fn add_component_by_name(&mut self, id: EntityId, name: &str) -> Result<&mut ComponentSlot, EcsError> {
        let info = self
            .registry
            .info(name)
            .ok_or_else(|| EcsError::UnknownComponent(name.to_string()))?;
        let entity = self.entities.get_mut(&id).ok_or(EcsError::MissingEntity(id))?;

        if entity.insert_component(info, ComponentSlot::new(info.instantiate())).is_some() {
            log::warn!("Entity {} already had component '{}', replacing it", id, info.name);
        }
        self.indices.entry(info.name).or_default().push_back(id);
        debug_assert!(entity.has_components(info.bit));

        entity
            .component_mut(info.name)
            .ok_or_else(|| EcsError::UnknownComponent(name.to_string()))
    }

    /// Detach a component, returns false if it was not attached
    pub fn remove_component<T: Component>(&mut self, id: EntityId) -> bool {
        self.remove_component_by_name(id, T::NAME)
    }

    /// Detach a component by name, returns false if it was not attached
    pub fn remove_component_by_name(&mut self, id: EntityId, name: &str) -> bool {
        let (Some(info), Some(entity)) = (self.registry.info(name), self.entities.get_mut(&id)) else {
            return false;
        };
        if entity.remove_component(info).is_none() {
            return false;
        }
        if let Some(index) = self.indices.get_mut(info.name) {
            index.remove(&id);
        }
        true
    }

    /// Enable or disable a component without detaching it
    pub fn set_component_enabled(&mut self, id: EntityId, name: &str, enabled: bool) -> bool {
        match self.entities.get_mut(&id).and_then(|entity| entity.component_mut(name)) {
            Some(slot) => {
                slot.enabled = enabled;
                true
            }
            None => false,
        }
    }

    /// Typed component of an entity
    pub fn get_component<T: Component>(&self, id: EntityId) -> Option<&T> {
        self.entities.get(&id)?.get_component::<T>()
    }

    /// Mutable typed component of an entity
    pub fn get_component_mut<T: Component>(&mut self, id: EntityId) -> Option<&mut T> {
        self.entities.get_mut(&id)?.get_component_mut::<T>()
    }

    /// True if the entity carries every component in `mask`
    pub fn has_components(&self, id: EntityId, mask: Bitfield) -> bool {
        self.entities.get(&id).is_some_and(|entity| entity.has_components(mask))
    }

    /// Typed view over several components of one entity
    pub fn node<Q: ComponentSet>(&self, id: EntityId) -> Option<Q::Refs<'_>> {
        self.entities.get(&id)?.node::<Q>()
    }

    /// Mutable typed view over several components of one entity
    pub fn node_mut<Q: ComponentSet>(&mut self, id: EntityId) -> Option<Q::Muts<'_>> {
        self.entities.get_mut(&id)?.node_mut::<Q>()
    }

    // ---------------------------------------------------------------------
    // Hierarchy and tags
    // ---------------------------------------------------------------------

    fn link(&mut self, parent: EntityId, child: EntityId) {
        if let Some(entity) = self.entities.get_mut(&child) {
            entity.set_parent(Some(parent));
        }
        if let Some(entity) = self.entities.get_mut(&parent) {
            entity.add_child(child);
        }
    }

    /// Attach `child` under `parent`, detaching it from its previous parent
    pub fn add_child(&mut self, parent: EntityId, child: EntityId) -> Result<(), EcsError> {
        if !self.entities.contains_key(&parent) {
            return Err(EcsError::MissingEntity(parent));
        }
        let previous = self
            .entities
            .get(&child)
            .ok_or(EcsError::MissingEntity(child))?
            .parent();

        // Walk up from the new parent to make sure the child is not an ancestor
        let mut cursor = Some(parent);
        while let Some(id) = cursor {
            if id == child {
                return Err(EcsError::InvalidHierarchy { parent, child });
            }
            cursor = self.entities.get(&id).and_then(Entity::parent);
        }

        if let Some(previous) = previous {
            self.remove_child(previous, child);
        }
        self.link(parent, child);
        Ok(())
    }

    /// Detach `child` from `parent`, returns false if it was not a child
    pub fn remove_child(&mut self, parent: EntityId, child: EntityId) -> bool {
        let removed = self
            .entities
            .get_mut(&parent)
            .is_some_and(|entity| entity.remove_child(child));
        if removed {
            if let Some(entity) = self.entities.get_mut(&child) {
                entity.set_parent(None);
            }
        }
        removed
    }

    /// First child of `parent` with the given name
    pub fn get_child(&self, parent: EntityId, name: &str) -> Option<EntityId> {
        self.entities
            .get(&parent)?
            .children()
            .iter()
            .copied()
            .find(|child| self.entities.get(child).is_some_and(|entity| entity.name() == name))
    }

    /// Give an entity a unique tag, replacing any tag it had
    pub fn set_tag(&mut self, id: EntityId, tag: &str) -> Result<(), EcsError> {
        if let Some(&owner) = self.tags.get(tag) {
            if owner != id {
                return Err(EcsError::TagInUse {
                    tag: tag.to_string(),
                    owner,
                });
            }
        }
        let entity = self.entities.get_mut(&id).ok_or(EcsError::MissingEntity(id))?;
        if let Some(old) = entity.tag() {
            self.tags.remove(old);
        }
        entity.set_tag(Some(tag.to_string()));
        self.tags.insert(tag.to_string(), id);
        Ok(())
    }

    /// Remove an entity's tag
    pub fn clear_tag(&mut self, id: EntityId) {
        if let Some(entity) = self.entities.get_mut(&id) {
            if let Some(tag) = entity.tag() {
                self.tags.remove(tag);
            }
            entity.set_tag(None);
        }
    }

    // ---------------------------------------------------------------------
    // Destruction
    // ---------------------------------------------------------------------

    /// Delete an entity and all of its descendants
    ///
    /// Index entries and components go first, then children are deleted
    /// depth-first, then the entity is detached from its parent, its tag is
    /// freed and it leaves the entity table.
    ///
    /// Returns false, deleting nothing, for an id that is not in the table and
    /// for the world root. The root lives as long as the manager, so it cannot
    /// be deleted even though it is a valid entity.
    pub fn delete_entity(&mut self, id: EntityId) -> bool {
        if id == self.root {
            log::warn!("Refusing to delete the world root");
            return false;
        }
        let Some(entity) = self.entities.get_mut(&id) else {
            log::warn!("Cannot delete missing entity {}", id);
            return false;
        };

        let components = entity.take_components();
        let children = entity.children().to_vec();

        for name in components {
            if let Some(index) = self.indices.get_mut(name) {
                index.remove(&id);
            }
        }
        for child in children {
            self.delete_entity(child);
        }

        if let Some(entity) = self.entities.remove(&id) {
            debug_assert!(entity.children().is_empty());
            if let Some(parent) = entity.parent() {
                if let Some(parent) = self.entities.get_mut(&parent) {
                    parent.remove_child(id);
                }
            }
            if let Some(tag) = entity.tag() {
                if self.tags.get(tag) == Some(&id) {
                    self.tags.remove(tag);
                }
            }
        }
        log::debug!("Deleted entity {}", id);
        true
    }

    // ---------------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------------

    /// Entity by id
    pub fn get_entity_with_id(&self, id: EntityId) -> Option<&Entity> {
        let entity = self.entities.get(&id);
        if entity.is_none() {
            log::warn!("No entity with id {}", id);
        }
        entity
    }

    /// Mutable entity by id
    pub fn get_entity_with_id_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        let entity = self.entities.get_mut(&id);
        if entity.is_none() {
            log::warn!("No entity with id {}", id);
        }
        entity
    }

    /// Entity by tag
    pub fn get_entity_with_tag(&self, tag: &str) -> Option<&Entity> {
        let entity = self.tags.get(tag).and_then(|id| self.entities.get(id));
        if entity.is_none() {
            log::warn!("No entity tagged '{}'", tag);
        }
        entity
    }

    /// Oldest entity with a name
    pub fn get_entity_with_name(&self, name: &str) -> Option<&Entity> {
        let entity = self
            .entities
            .values()
            .filter(|entity| entity.name() == name)
            .min_by_key(|entity| entity.id());
        if entity.is_none() {
            log::warn!("No entity named '{}'", name);
        }
        entity
    }

    /// Every entity with a name, oldest first
    pub fn get_entities_with_name(&self, name: &str) -> Vec<EntityId> {
        let mut ids: Vec<_> = self
            .entities
            .values()
            .filter(|entity| entity.name() == name)
            .map(Entity::id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Head of a component's index
    pub fn get_first_entity_with_component<T: Component>(&self) -> Option<EntityId> {
        let first = self.indices.get(T::NAME).and_then(IndexList::front);
        if first.is_none() {
            log::warn!("No entity with component '{}'", T::NAME);
        }
        first
    }

    /// Component of the head of its index
    pub fn get_first_component<T: Component>(&self) -> Option<&T> {
        self.get_component::<T>(self.get_first_entity_with_component::<T>()?)
    }

    /// Ids indexed under a component, in insertion order
    pub fn entities_with_component<T: Component>(&self) -> Vec<EntityId> {
        self.indices
            .get(T::NAME)
            .map(|index| index.iter().collect())
            .unwrap_or_default()
    }

    /// Ids carrying every component of a set, in the first component's index order
    pub fn entities_with<Q: ComponentSet>(&self) -> Result<Vec<EntityId>, EcsError> {
        let mask = Q::mask(&self.registry)?;
        let Some(first) = Q::names().first().copied() else {
            return Ok(Vec::new());
        };
        Ok(self
            .indices
            .get(first)
            .map(|index| index.iter().filter(|id| self.has_components(*id, mask)).collect())
            .unwrap_or_default())
    }

    /// Visit every entity indexed under `T`, in insertion order
    ///
    /// The index is snapshotted before the first callback. Each entity in the
    /// snapshot is visited once, unless an earlier callback deleted it or
    /// removed its `T`; entities added during the walk are not visited.
    /// Returns the number of entities visited.
    pub fn for_each_entity_with_component<T, F>(&mut self, mut f: F) -> usize
    where
        T: Component,
        F: FnMut(&mut Self, EntityId),
    {
        let mut visited = 0;
        for id in self.entities_with_component::<T>() {
            if !self.is_indexed(T::NAME, id) {
                continue;
            }
            f(self, id);
            visited += 1;
        }
        visited
    }

    /// Visit every entity carrying all components of `Q` with a typed view
    ///
    /// Walks a snapshot of the first component's index and filters by the
    /// combined mask. Returns the number of entities visited.
    pub fn for_each_entity_with_node<Q, F>(&mut self, mut f: F) -> Result<usize, EcsError>
    where
        Q: ComponentSet,
        F: FnMut(EntityId, Q::Muts<'_>),
    {
        let mask = Q::mask(&self.registry)?;
        let Some(first) = Q::names().first().copied() else {
            return Ok(0);
        };
        let ids: Vec<EntityId> = self
            .indices
            .get(first)
            .map(|index| index.iter().collect())
            .unwrap_or_default();

        let mut visited = 0;
        for id in ids {
            if !self.is_indexed(first, id) {
                continue;
            }
            let Some(entity) = self.entities.get_mut(&id) else {
                continue;
            };
            if !entity.has_components(mask) {
                continue;
            }
            if let Some(view) = Q::fetch_mut(entity) {
                f(id, view);
                visited += 1;
            }
        }
        Ok(visited)
    }

    fn is_indexed(&self, name: &str, id: EntityId) -> bool {
        self.indices.get(name).is_some_and(|index| index.contains(&id))
    }

    /// Check the cross-table invariants, describing the first violation found
    pub fn validate(&self) -> Result<(), String> {
        for (id, entity) in &self.entities {
            for name in entity.component_names() {
                if !self.indices.get(name).is_some_and(|index| index.contains(id)) {
                    return Err(format!("{id} has '{name}' but is missing from its index"));
                }
            }
            for child in entity.children() {
                match self.entities.get(child) {
                    Some(child_entity) if child_entity.parent() == Some(*id) => {}
                    _ => return Err(format!("{id} lists {child} as a child but the link is broken")),
                }
            }
            if let Some(parent) = entity.parent() {
                if !self.entities.get(&parent).is_some_and(|p| p.children().contains(id)) {
                    return Err(format!("{id} points at parent {parent} which does not list it"));
                }
            }
        }
        for (name, index) in &self.indices {
            for id in index.iter() {
                if self.entities.get(&id).and_then(|entity| entity.component(name)).is_none() {
                    return Err(format!("index '{name}' lists {id} which lacks the component"));
                }
            }
        }
        for (tag, id) in &self.tags {
            if self.entities.get(id).and_then(Entity::tag) != Some(tag.as_str()) {
                return Err(format!("tag '{tag}' points at {id} which does not carry it"));
            }
        }
        Ok(())
    }
}

fn apply_identity(entity: &mut Entity, identity: &IdentityOverride) {
    let mut values = entity.prefab_values().cloned().unwrap_or_default();
    let remembered = values.entry(Identifiable::NAME.to_string()).or_default();

    let Some(component) = entity.get_component_mut::<Identifiable>() else {
        log::warn!("Entity {} has no Identifiable component to override", entity.id());
        return;
    };
    if let Some(id) = identity.id {
        component.id = id;
        remembered.insert("id".into(), id.to_string());
    }
    if let Some(kind) = &identity.kind {
        component.kind.clone_from(kind);
        remembered.insert("kind".into(), kind.clone());
    }
    if let Some(name) = &identity.name {
        component.name.clone_from(name);
        remembered.insert("name".into(), name.clone());
    }
    entity.set_prefab_values(values);
}
