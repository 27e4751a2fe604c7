//! Specialized collection types

use std::collections::HashMap;
use std::hash::Hash;

pub use slotmap::{DefaultKey, SlotMap};

/// Handle type for stable references into an [`IndexList`]
pub type Handle = DefaultKey;

#[derive(Debug, Clone)]
struct Node<T> {
    value: T,
    prev: Option<Handle>,
    next: Option<Handle>,
}

/// Insertion-ordered doubly linked list of unique values
///
/// Nodes live in a generational slot arena, so removing a value is O(1) and
/// a stale handle simply resolves to nothing instead of dangling. A side map
/// from value to handle makes removal-by-value O(1) and rejects duplicates.
#[derive(Debug, Clone)]
pub struct IndexList<T: Copy + Eq + Hash> {
    nodes: SlotMap<Handle, Node<T>>,
    lookup: HashMap<T, Handle>,
    head: Option<Handle>,
    tail: Option<Handle>,
}

impl<T: Copy + Eq + Hash> IndexList<T> {
    /// Create an empty list
    pub fn new() -> Self {
        Self {
            nodes: SlotMap::new(),
            lookup: HashMap::new(),
            head: None,
            tail: None,
        }
    }

    /// Append a value at the tail, returns false if it was already present
    pub fn push_back(&mut self, value: T) -> bool {
        if self.lookup.contains_key(&value) {
            return false;
        }

        let handle = self.nodes.insert(Node {
            value,
            prev: self.tail,
            next: None,
        });

        match self.tail {
            Some(tail) => self.nodes[tail].next = Some(handle),
            None => self.head = Some(handle),
        }
        self.tail = Some(handle);
        self.lookup.insert(value, handle);
        true
    }

    /// Unlink a value, returns false if it was not present
    pub fn remove(&mut self, value: &T) -> bool {
        let Some(handle) = self.lookup.remove(value) else {
            return false;
        };
        let Some(node) = self.nodes.remove(handle) else {
            return false;
        };

        match node.prev {
            Some(prev) => self.nodes[prev].next = node.next,
            None => self.head = node.next,
        }
        match node.next {
            Some(next) => self.nodes[next].prev = node.prev,
            None => self.tail = node.prev,
        }
        true
    }

    /// True if the value is in the list
    pub fn contains(&self, value: &T) -> bool {
        self.lookup.contains_key(value)
    }

    /// First value in insertion order
    pub fn front(&self) -> Option<T> {
        self.head.map(|head| self.nodes[head].value)
    }

    /// Handle of the first node
    pub const fn head(&self) -> Option<Handle> {
        self.head
    }

    /// Value stored at a handle, `None` if the node has been removed
    pub fn get(&self, handle: Handle) -> Option<T> {
        self.nodes.get(handle).map(|node| node.value)
    }

    /// Handle following `handle`, `None` at the tail or for a removed node
    pub fn next(&self, handle: Handle) -> Option<Handle> {
        self.nodes.get(handle).and_then(|node| node.next)
    }

    /// Handle of a value currently in the list
    pub fn handle_of(&self, value: &T) -> Option<Handle> {
        self.lookup.get(value).copied()
    }

    /// Number of values
    pub fn len(&self) -> usize {
        self.lookup.len()
    }

    /// True if the list holds no values
    pub fn is_empty(&self) -> bool {
        self.lookup.is_empty()
    }

    /// Remove every value
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.lookup.clear();
        self.head = None;
        self.tail = None;
    }

    /// Iterate values in insertion order
    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        let mut cursor = self.head;
        std::iter::from_fn(move || {
            let node = self.nodes.get(cursor?)?;
            cursor = node.next;
            Some(node.value)
        })
    }
}

impl<T: Copy + Eq + Hash> Default for IndexList<T> {
    fn default() -> Self {
        Self::new()
    }
}
