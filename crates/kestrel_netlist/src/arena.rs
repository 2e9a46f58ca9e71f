//! Dense, ID-indexed storage for netlist entities.
//!
//! Nodes, pins and nets each live in an [`Arena`] and refer to one another
//! by typed index instead of by pointer, so the whole graph can be shared
//! read-only between evaluation threads and serialized as a unit.

use serde::{Deserialize, Serialize};
use std::marker::PhantomData;
use std::ops::{Index, IndexMut};

/// Trait for opaque ID types used as arena keys.
pub trait ArenaId: Copy {
    /// Creates an ID from a raw `u32` index.
    fn from_raw(index: u32) -> Self;

    /// Returns the raw `u32` index.
    fn as_raw(self) -> u32;

    /// Returns the index as a `usize`, for side tables keyed by this ID.
    fn index(self) -> usize {
        self.as_raw() as usize
    }
}

/// A dense, append-only container. IDs stay valid for the arena's lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Arena<I: ArenaId, T> {
    items: Vec<T>,
    #[serde(skip)]
    _marker: PhantomData<I>,
}

impl<I: ArenaId, T> Default for Arena<I, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: ArenaId, T> Arena<I, T> {
    /// Creates a new, empty arena.
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Allocates a new item in the arena and returns its ID.
    pub fn alloc(&mut self, item: T) -> I {
        let id = I::from_raw(self.items.len() as u32);
        self.items.push(item);
        id
    }

    /// Returns a reference to the item with the given ID.
    ///
    /// # Panics
    ///
    /// Panics if the ID is out of bounds.
    pub fn get(&self, id: I) -> &T {
        &self.items[id.index()]
    }

    /// Returns a reference to the item, or `None` if the ID is out of bounds.
    pub fn try_get(&self, id: I) -> Option<&T> {
        self.items.get(id.index())
    }

    /// Returns a mutable reference to the item with the given ID.
    ///
    /// # Panics
    ///
    /// Panics if the ID is out of bounds.
    pub fn get_mut(&mut self, id: I) -> &mut T {
        &mut self.items[id.index()]
    }

    /// Returns `true` if `id` refers to an allocated item.
    pub fn contains(&self, id: I) -> bool {
        id.index() < self.items.len()
    }

    /// Returns the number of items in the arena.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if the arena contains no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterates over `(ID, &T)` pairs in allocation order.
    pub fn iter(&self) -> impl Iterator<Item = (I, &T)> {
        self.items
            .iter()
            .enumerate()
            .map(|(i, item)| (I::from_raw(i as u32), item))
    }

    /// Iterates over all IDs in allocation order.
    pub fn ids(&self) -> impl Iterator<Item = I> {
        (0..self.items.len() as u32).map(I::from_raw)
    }

    /// Iterates over references to items in allocation order.
    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }
}

impl<I: ArenaId, T> Index<I> for Arena<I, T> {
    type Output = T;

    fn index(&self, id: I) -> &T {
        self.get(id)
    }
}

impl<I: ArenaId, T> IndexMut<I> for Arena<I, T> {
    fn index_mut(&mut self, id: I) -> &mut T {
        self.get_mut(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{NetId, NodeId};

    #[test]
    fn alloc_and_index() {
        let mut arena: Arena<NodeId, &str> = Arena::new();
        let a = arena.alloc("top^a");
        let b = arena.alloc("top^b");
        assert_eq!(arena[a], "top^a");
        assert_eq!(arena[b], "top^b");
        assert_eq!(b.index(), 1);
    }

    #[test]
    fn get_mut_modifies() {
        let mut arena: Arena<NetId, u32> = Arena::new();
        let id = arena.alloc(1);
        *arena.get_mut(id) += 1;
        assert_eq!(arena[id], 2);
    }

    #[test]
    fn bounds_checks() {
        let mut arena: Arena<NodeId, u8> = Arena::default();
        assert!(arena.is_empty());
        let id = arena.alloc(0);
        assert!(arena.contains(id));
        assert!(!arena.contains(NodeId::from_raw(1)));
        assert!(arena.try_get(NodeId::from_raw(5)).is_none());
    }

    #[test]
    fn ids_follow_allocation_order() {
        let mut arena: Arena<NodeId, u32> = Arena::new();
        arena.alloc(100);
        arena.alloc(200);
        let ids: Vec<u32> = arena.ids().map(|id| id.as_raw()).collect();
        assert_eq!(ids, vec![0, 1]);
        let values: Vec<u32> = arena.iter().map(|(_, v)| *v).collect();
        assert_eq!(values, vec![100, 200]);
    }

    #[test]
    fn serializes_as_plain_list() {
        let mut arena: Arena<NodeId, String> = Arena::new();
        arena.alloc("first".to_string());
        arena.alloc("second".to_string());
        let json = serde_json::to_string(&arena).unwrap();
        assert_eq!(json, r#"["first","second"]"#);
        let restored: Arena<NodeId, String> = serde_json::from_str(&json).unwrap();
        assert_eq!(restored[NodeId::from_raw(1)], "second");
    }
}
