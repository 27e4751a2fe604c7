//! Prefab and scene documents
//!
//! A prefab is a declarative entity tree: a name, an optional tag, component
//! attribute strings and child nodes. A node may name another prefab in its
//! `ref` field; resolution replaces the reference with a deep copy of the
//! referenced tree, then layers the node's own data on top. The result never
//! shares data between instances.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use super::error::EcsError;

/// Attribute name -> raw string value
pub type AttributeMap = BTreeMap<String, String>;

/// Component name -> attributes
pub type ComponentValues = BTreeMap<String, AttributeMap>;

/// Declarative template for an entity and its children
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Prefab {
    /// Entity name
    pub name: String,
    /// Unique tag given to the instantiated entity
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    /// Component attribute strings
    pub components: ComponentValues,
    /// Name of a prefab to merge in
    #[serde(rename = "ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    /// Child nodes, instantiated under this entity in order
    pub children: Vec<ChildPrefab>,
}

/// Child nodes share the prefab shape
pub type ChildPrefab = Prefab;

impl Prefab {
    /// Create an empty prefab with a name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Set the tag
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Set one component attribute
    pub fn with_attribute(
        mut self,
        component: impl Into<String>,
        field: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.components
            .entry(component.into())
            .or_default()
            .insert(field.into(), value.into());
        self
    }

    /// Attach a component with default values
    pub fn with_component(mut self, component: impl Into<String>) -> Self {
        self.components.entry(component.into()).or_default();
        self
    }

    /// Reference another prefab
    pub fn with_reference(mut self, name: impl Into<String>) -> Self {
        self.reference = Some(name.into());
        self
    }

    /// Append a child node
    pub fn with_child(mut self, child: ChildPrefab) -> Self {
        self.children.push(child);
        self
    }

    /// Tag, treating an empty string as no tag
    pub fn effective_tag(&self) -> Option<&str> {
        self.tag.as_deref().filter(|tag| !tag.is_empty())
    }

    /// Total number of nodes in the tree
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(Self::node_count).sum::<usize>()
    }

    /// Expand every `ref` in this tree against `prefabs`
    pub fn resolve(&self, prefabs: &HashMap<String, Prefab>) -> Result<Self, EcsError> {
        let mut stack = Vec::new();
        resolve_node(self, prefabs, &mut stack)
    }
}

/// Referenced prefab is the base; the node's name, tag and attributes override
/// it key by key, and its children follow the referenced children. Tags are
/// not inherited through a reference since a tag names a single instance.
fn resolve_node(
    node: &Prefab,
    prefabs: &HashMap<String, Prefab>,
    stack: &mut Vec<String>,
) -> Result<Prefab, EcsError> {
    let mut resolved = match &node.reference {
        Some(reference) => {
            if stack.contains(reference) {
                return Err(EcsError::PrefabCycle(reference.clone()));
            }
            let base = prefabs
                .get(reference)
                .ok_or_else(|| EcsError::UnknownPrefab(reference.clone()))?;

            stack.push(reference.clone());
            let mut base = resolve_node(base, prefabs, stack)?;
            stack.pop();

            base.tag = None;
            base
        }
        None => Prefab::default(),
    };

    if !node.name.is_empty() {
        resolved.name.clone_from(&node.name);
    }
    if node.tag.is_some() {
        resolved.tag.clone_from(&node.tag);
    }
    for (component, attributes) in &node.components {
        let target = resolved.components.entry(component.clone()).or_default();
        for (field, value) in attributes {
            target.insert(field.clone(), value.clone());
        }
    }
    for child in &node.children {
        resolved.children.push(resolve_node(child, prefabs, stack)?);
    }
    resolved.reference = None;

    Ok(resolved)
}

/// All prefabs loaded at startup, keyed by name, with references expanded
#[derive(Debug, Clone, Default)]
pub struct PrefabLibrary {
    prefabs: HashMap<String, Prefab>,
}

impl PrefabLibrary {
    /// Create an empty library
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a set of raw prefabs into a library
    pub fn from_prefabs(raw: Vec<Prefab>) -> Result<Self, EcsError> {
        let mut by_name = HashMap::with_capacity(raw.len());
        for prefab in raw {
            if prefab.name.is_empty() {
                return Err(EcsError::MalformedPrefab("top-level prefab without a name".into()));
            }
            by_name.insert(prefab.name.clone(), prefab);
        }

        let mut prefabs = HashMap::with_capacity(by_name.len());
        for (name, prefab) in &by_name {
            let mut stack = vec![name.clone()];
            prefabs.insert(name.clone(), resolve_node(prefab, &by_name, &mut stack)?);
        }

        log::info!("Resolved {} prefabs", prefabs.len());
        Ok(Self { prefabs })
    }

    /// Parse a JSON array of prefabs and resolve it
    pub fn from_json(json: &str) -> Result<Self, EcsError> {
        let raw: Vec<Prefab> = serde_json::from_str(json)?;
        Self::from_prefabs(raw)
    }

    /// Resolved prefab by name
    pub fn get(&self, name: &str) -> Option<&Prefab> {
        self.prefabs.get(name)
    }

    /// Resolved prefabs keyed by name
    pub const fn as_map(&self) -> &HashMap<String, Prefab> {
        &self.prefabs
    }

    /// Prefab names
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.prefabs.keys().map(String::as_str)
    }

    /// Number of prefabs
    pub fn len(&self) -> usize {
        self.prefabs.len()
    }

    /// True when no prefabs are loaded
    pub fn is_empty(&self) -> bool {
        self.prefabs.is_empty()
    }
}

/// Scene document: a name and a root prefab tree
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneDocument {
    /// Scene name
    pub name: String,
    /// Optional scene identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Root of the scene tree
    pub root: Prefab,
}

impl SceneDocument {
    /// Parse a scene document
    pub fn from_json(json: &str) -> Result<Self, EcsError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Root tree with references expanded against a library
    pub fn resolved_root(&self, library: &PrefabLibrary) -> Result<Prefab, EcsError> {
        self.root.resolve(library.as_map())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PREFABS: &str = r#"[
        {
            "name": "Rat",
            "tag": "first-rat",
            "components": {
                "Health": { "hp": "10", "max_hp": "10" },
                "Transform": {}
            },
            "children": [ { "name": "Shadow", "components": { "Transform": { "y": "1" } } } ]
        },
        {
            "name": "RatPack",
            "children": [
                { "ref": "Rat", "name": "RatA" },
                { "ref": "Rat", "name": "RatB", "components": { "Health": { "hp": "5" } } }
            ]
        }
    ]"#;

    #[test]
    fn test_reference_expansion_merges_and_overrides() {
        let library = PrefabLibrary::from_json(PREFABS).unwrap();
        let pack = library.get("RatPack").unwrap();

        assert_eq!(pack.children.len(), 2);
        let rat_b = &pack.children[1];
        assert_eq!(rat_b.name, "RatB");
        assert_eq!(rat_b.components["Health"]["hp"], "5");
        assert_eq!(rat_b.components["Health"]["max_hp"], "10");
        assert_eq!(rat_b.children[0].name, "Shadow");
        assert!(rat_b.reference.is_none());
        assert!(rat_b.tag.is_none());
    }

    #[test]
    fn test_expanded_references_are_independent_copies() {
        let library = PrefabLibrary::from_json(PREFABS).unwrap();
        let mut pack = library.get("RatPack").unwrap().clone();

        pack.children[0]
            .components
            .get_mut("Health")
            .unwrap()
            .insert("hp".into(), "99".into());

        assert_eq!(pack.children[0].components["Health"]["hp"], "99");
        assert_eq!(pack.children[1].components["Health"]["hp"], "5");
        assert_eq!(library.get("Rat").unwrap().components["Health"]["hp"], "10");
    }

    #[test]
    fn test_reference_cycles_are_detected() {
        let raw = vec![
            Prefab::new("A").with_child(Prefab::default().with_reference("B")),
            Prefab::new("B").with_reference("A"),
        ];
        assert!(matches!(
            PrefabLibrary::from_prefabs(raw),
            Err(EcsError::PrefabCycle(_))
        ));
    }

    #[test]
    fn test_unknown_reference_fails() {
        let raw = vec![Prefab::new("A").with_reference("Missing")];
        assert_eq!(
            PrefabLibrary::from_prefabs(raw).unwrap_err(),
            EcsError::UnknownPrefab("Missing".into())
        );
    }

    #[test]
    fn test_scene_document_resolves_against_library() {
        let library = PrefabLibrary::from_json(PREFABS).unwrap();
        let scene = SceneDocument::from_json(
            r#"{ "name": "cellar", "root": { "name": "Cellar", "children": [ { "ref": "RatPack" } ] } }"#,
        )
        .unwrap();

        let root = scene.resolved_root(&library).unwrap();
        assert_eq!(root.children[0].name, "RatPack");
        assert_eq!(root.node_count(), 1 + 1 + 2 * 2);
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        assert!(matches!(
            PrefabLibrary::from_json("{\"name\": 3}"),
            Err(EcsError::MalformedPrefab(_))
        ));
    }
}
