//! Component traits, field schemas and the component registry
//!
//! Component types are plain structs declared with [`component!`](crate::component),
//! which generates an explicit schema of `(name, type, default)` per field.
//! Prefab attribute strings are coerced through that schema, so coercion never
//! depends on what a field happens to hold at runtime.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;

use super::error::EcsError;
use crate::foundation::bitfield::{Bitfield, BitfieldAllocator, BITFIELD_CAPACITY};

/// Runtime type of a component field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// `"true"` / `"false"`
    Bool,
    /// Parsed as a float
    Number,
    /// Copied verbatim
    Text,
}

impl FieldType {
    /// Human readable type name
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bool => "boolean",
            Self::Number => "number",
            Self::Text => "string",
        }
    }

    /// Coerce a raw attribute string into a value of this type
    pub fn parse(self, raw: &str) -> Option<FieldValue> {
        match self {
            Self::Bool => match raw.trim() {
                "true" => Some(FieldValue::Bool(true)),
                "false" => Some(FieldValue::Bool(false)),
                _ => None,
            },
            Self::Number => raw.trim().parse::<f64>().ok().map(FieldValue::Number),
            Self::Text => Some(FieldValue::Text(raw.to_string())),
        }
    }
}

/// Typed value of a component field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Boolean field
    Bool(bool),
    /// Numeric field
    Number(f64),
    /// String field
    Text(String),
}

impl FieldValue {
    /// Type of this value
    pub const fn field_type(&self) -> FieldType {
        match self {
            Self::Bool(_) => FieldType::Bool,
            Self::Number(_) => FieldType::Number,
            Self::Text(_) => FieldType::Text,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(value) => write!(f, "{value}"),
            // Whole numbers print without a trailing ".0"
            Self::Number(value) if value.fract() == 0.0 && value.abs() < 1e15 => {
                write!(f, "{}", *value as i64)
            }
            Self::Number(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
        }
    }
}

/// Rust types usable as component fields
pub trait FieldKind: Sized {
    /// Schema type of the field
    const TYPE: FieldType;

    /// Convert to a typed value
    fn to_value(&self) -> FieldValue;

    /// Convert from a typed value, `None` on a type mismatch
    fn from_value(value: &FieldValue) -> Option<Self>;
}

impl FieldKind for bool {
    const TYPE: FieldType = FieldType::Bool;

    fn to_value(&self) -> FieldValue {
        FieldValue::Bool(*self)
    }

    fn from_value(value: &FieldValue) -> Option<Self> {
        match value {
            FieldValue::Bool(value) => Some(*value),
            _ => None,
        }
    }
}

macro_rules! numeric_field_kind {
    ($($ty:ty),*) => {
        $(
            impl FieldKind for $ty {
                const TYPE: FieldType = FieldType::Number;

                fn to_value(&self) -> FieldValue {
                    FieldValue::Number(f64::from(*self))
                }

                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                fn from_value(value: &FieldValue) -> Option<Self> {
                    match value {
                        FieldValue::Number(value) => Some(*value as $ty),
                        _ => None,
                    }
                }
            }
        )*
    };
}

numeric_field_kind!(f32, f64, i32, u32);

impl FieldKind for String {
    const TYPE: FieldType = FieldType::Text;

    fn to_value(&self) -> FieldValue {
        FieldValue::Text(self.clone())
    }

    fn from_value(value: &FieldValue) -> Option<Self> {
        match value {
            FieldValue::Text(value) => Some(value.clone()),
            _ => None,
        }
    }
}

/// One entry of a component schema
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    /// Field name as used in prefab documents
    pub name: &'static str,
    /// Field type used for coercion
    pub ty: FieldType,
    /// Value a freshly added component holds
    pub default: FieldValue,
}

/// Object-safe view of a component instance
pub trait ComponentData: Any + fmt::Debug {
    /// Registered component name
    fn component_name(&self) -> &'static str;

    /// Read a field by name
    fn field(&self, name: &str) -> Option<FieldValue>;

    /// Write a field by name, false for unknown fields or mismatched types
    fn set_field(&mut self, name: &str, value: &FieldValue) -> bool;

    /// Upcast for downcasting to the concrete type
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for downcasting to the concrete type
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Statically known component type
pub trait Component: ComponentData + Default {
    /// Unique component name, the key used in prefabs and entity maps
    const NAME: &'static str;

    /// Ordered field schema
    fn schema() -> Vec<FieldSpec>;
}

/// Declare a component struct together with its schema and field accessors
///
/// ```
/// quest_engine::component! {
///     /// Hit points
///     pub struct Stamina("Stamina") {
///         /// Current value
///         current: f32 = 10.0,
///         /// Whether it regenerates
///         regenerates: bool = true,
///     }
/// }
/// ```
#[macro_export]
macro_rules! component {
    (
        $(#[$meta:meta])*
        $vis:vis struct $ty:ident($name:literal) {
            $( $(#[$fmeta:meta])* $field:ident : $fty:ty = $default:expr ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq)]
        $vis struct $ty {
            $( $(#[$fmeta])* pub $field: $fty, )*
        }

        impl ::std::default::Default for $ty {
            fn default() -> Self {
                Self { $( $field: $default, )* }
            }
        }

        impl $crate::ecs::component::ComponentData for $ty {
            fn component_name(&self) -> &'static str {
                $name
            }

            fn field(&self, name: &str) -> ::std::option::Option<$crate::ecs::component::FieldValue> {
                match name {
                    $( stringify!($field) => ::std::option::Option::Some(
                        $crate::ecs::component::FieldKind::to_value(&self.$field)
                    ), )*
                    _ => ::std::option::Option::None,
                }
            }

            #[allow(unused_variables)]
            fn set_field(&mut self, name: &str, value: &$crate::ecs::component::FieldValue) -> bool {
                match name {
                    $( stringify!($field) => {
                        match <$fty as $crate::ecs::component::FieldKind>::from_value(value) {
                            ::std::option::Option::Some(value) => {
                                self.$field = value;
                                true
                            }
                            ::std::option::Option::None => false,
                        }
                    } )*
                    _ => false,
                }
            }

            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }

            fn as_any_mut(&mut self) -> &mut dyn ::std::any::Any {
                self
            }
        }

        impl $crate::ecs::component::Component for $ty {
            const NAME: &'static str = $name;

            fn schema() -> ::std::vec::Vec<$crate::ecs::component::FieldSpec> {
                ::std::vec![
                    $( $crate::ecs::component::FieldSpec {
                        name: stringify!($field),
                        ty: <$fty as $crate::ecs::component::FieldKind>::TYPE,
                        default: {
                            let default: $fty = $default;
                            $crate::ecs::component::FieldKind::to_value(&default)
                        },
                    }, )*
                ]
            }
        }
    };
}

/// A component instance as stored on an entity
#[derive(Debug)]
pub struct ComponentSlot {
    /// Disabled components stay attached but systems are expected to skip them
    pub enabled: bool,
    data: Box<dyn ComponentData>,
}

impl ComponentSlot {
    /// Wrap a component instance, enabled
    pub fn new(data: Box<dyn ComponentData>) -> Self {
        Self { enabled: true, data }
    }

    /// Type-erased component
    pub fn data(&self) -> &dyn ComponentData {
        self.data.as_ref()
    }

    /// Mutable type-erased component
    pub fn data_mut(&mut self) -> &mut dyn ComponentData {
        self.data.as_mut()
    }

    /// Downcast to a concrete component
    pub fn downcast_ref<T: Component>(&self) -> Option<&T> {
        self.data.as_any().downcast_ref::<T>()
    }

    /// Mutable downcast to a concrete component
    pub fn downcast_mut<T: Component>(&mut self) -> Option<&mut T> {
        self.data.as_any_mut().downcast_mut::<T>()
    }

    /// Coerce `raw` through the schema and assign it
    ///
    /// Returns `Ok(false)` when the schema has no such field; the attribute
    /// is ignored in that case.
    pub fn assign(&mut self, info: &ComponentInfo, field: &str, raw: &str) -> Result<bool, EcsError> {
        let Some(spec) = info.field(field) else {
            log::debug!("Ignoring unknown attribute {}.{}", info.name, field);
            return Ok(false);
        };
        let value = spec.ty.parse(raw).ok_or_else(|| EcsError::InvalidAttribute {
            component: info.name.to_string(),
            field: field.to_string(),
            value: raw.to_string(),
            expected: spec.ty.as_str(),
        })?;
        Ok(self.data.set_field(field, &value))
    }
}

/// Registration record of a component type
#[derive(Debug, Clone)]
pub struct ComponentInfo {
    /// Component name
    pub name: &'static str,
    /// The single bit owned by this type
    pub bit: Bitfield,
    /// Ordered field schema
    pub schema: Vec<FieldSpec>,
    type_id: TypeId,
    create: fn() -> Box<dyn ComponentData>,
}

impl ComponentInfo {
    /// Construct a default-initialized instance
    pub fn instantiate(&self) -> Box<dyn ComponentData> {
        (self.create)()
    }

    /// Schema entry for a field
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.schema.iter().find(|spec| spec.name == name)
    }

    /// Rust type backing this component
    pub const fn type_id(&self) -> TypeId {
        self.type_id
    }
}

fn create_boxed<T: Component>() -> Box<dyn ComponentData> {
    Box::new(T::default())
}

/// Assigns every component type its bit and remembers how to build it
///
/// Bits are handed out in registration order, so registering the same types in
/// the same order always yields the same bits.
#[derive(Debug, Default)]
pub struct ComponentRegistry {
    allocator: BitfieldAllocator,
    infos: Vec<ComponentInfo>,
    by_name: HashMap<&'static str, usize>,
    by_type: HashMap<TypeId, usize>,
}

impl ComponentRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component type, returns its bit
    ///
    /// Registering a type twice returns the bit it already owns.
    pub fn register<T: Component>(&mut self) -> Result<Bitfield, EcsError> {
        if let Some(&index) = self.by_type.get(&TypeId::of::<T>()) {
            return Ok(self.infos[index].bit);
        }
        if self.by_name.contains_key(T::NAME) {
            return Err(EcsError::DuplicateComponentName(T::NAME));
        }

        let bit = self
            .allocator
            .next_bitfield()
            .ok_or(EcsError::ComponentCapacityExceeded(T::NAME, BITFIELD_CAPACITY))?;

        let index = self.infos.len();
        self.infos.push(ComponentInfo {
            name: T::NAME,
            bit,
            schema: T::schema(),
            type_id: TypeId::of::<T>(),
            create: create_boxed::<T>,
        });
        self.by_name.insert(T::NAME, index);
        self.by_type.insert(TypeId::of::<T>(), index);

        log::debug!("Registered component '{}' as {:?}", T::NAME, bit);
        Ok(bit)
    }

    /// Registration record by name
    pub fn info(&self, name: &str) -> Option<&ComponentInfo> {
        self.by_name.get(name).map(|&index| &self.infos[index])
    }

    /// Registration record by type
    pub fn info_of<T: Component>(&self) -> Option<&ComponentInfo> {
        self.by_type.get(&TypeId::of::<T>()).map(|&index| &self.infos[index])
    }

    /// Bit of a registered type
    pub fn bit_of<T: Component>(&self) -> Option<Bitfield> {
        self.info_of::<T>().map(|info| info.bit)
    }

    /// Combined mask of the named components, `None` if any is unknown
    pub fn mask_of(&self, names: &[&str]) -> Option<Bitfield> {
        names.iter().try_fold(Bitfield::empty(), |mask, name| {
            self.info(name).map(|info| mask | info.bit)
        })
    }

    /// Registered types in bit order
    pub fn iter(&self) -> impl Iterator<Item = &ComponentInfo> {
        self.infos.iter()
    }

    /// Number of registered types
    pub fn len(&self) -> usize {
        self.infos.len()
    }

    /// True when nothing is registered
    pub fn is_empty(&self) -> bool {
        self.infos.is_empty()
    }
}
