//! Typed multi-component queries
//!
//! A [`ComponentSet`] is a tuple of component types. It builds the combined
//! bitmask used to filter entities and hands out a strongly typed tuple of
//! references, so a query can never observe a component of the wrong shape.

use super::component::{Component, ComponentRegistry};
use super::entity::Entity;
use super::error::EcsError;
use crate::foundation::bitfield::Bitfield;

/// Tuple of distinct component types queried together
pub trait ComponentSet {
    /// Shared references, one per component
    type Refs<'a>;
    /// Mutable references, one per component
    type Muts<'a>;

    /// Component names in tuple order
    fn names() -> Vec<&'static str>;

    /// Fetch shared references, `None` unless every component is attached
    fn fetch(entity: &Entity) -> Option<Self::Refs<'_>>;

    /// Fetch disjoint mutable references, `None` unless every component is attached
    fn fetch_mut(entity: &mut Entity) -> Option<Self::Muts<'_>>;

    /// Combined mask of the set
    ///
    /// Fails for unregistered types and for sets naming a type twice.
    fn mask(registry: &ComponentRegistry) -> Result<Bitfield, EcsError> {
        let names = Self::names();
        let mut mask = Bitfield::empty();
        for name in &names {
            let info = registry
                .info(name)
                .ok_or_else(|| EcsError::UnknownComponent((*name).to_string()))?;
            mask.insert(info.bit);
        }
        if mask.count() as usize != names.len() {
            return Err(EcsError::DuplicateQueryComponent);
        }
        Ok(mask)
    }
}

macro_rules! impl_component_set {
    ($($T:ident : $idx:tt),+) => {
        impl<$($T: Component),+> ComponentSet for ($($T,)+) {
            type Refs<'a> = ($(&'a $T,)+);
            type Muts<'a> = ($(&'a mut $T,)+);

            fn names() -> Vec<&'static str> {
                vec![$($T::NAME),+]
            }

            fn fetch(entity: &Entity) -> Option<Self::Refs<'_>> {
                Some(($(entity.get_component::<$T>()?,)+))
            }

            fn fetch_mut(entity: &mut Entity) -> Option<Self::Muts<'_>> {
                let mut found: ($(Option<&mut $T>,)+) = ($(None::<&mut $T>,)+);
                for (name, slot) in entity.slots_mut() {
                    $(
                        if name == $T::NAME {
                            found.$idx = slot.downcast_mut::<$T>();
                            continue;
                        }
                    )+
                }
                Some(($(found.$idx?,)+))
            }
        }
    };
}

impl_component_set!(A: 0);
impl_component_set!(A: 0, B: 1);
impl_component_set!(A: 0, B: 1, C: 2);
impl_component_set!(A: 0, B: 1, C: 2, D: 3);
