//! Keyed collections that `for_each` can address elements of.
//!
//! Three shapes are supported, all through [`KeyedCollection`]:
//!
//! - [`IdentifiedVec`]: ordered, the key lives inside the element.
//! - [`KeyedVec`]: ordered, plain values paired with an external key.
//! - `HashMap<K, V>`: unordered key → value mapping.

use std::collections::HashMap;
use std::hash::BuildHasher;

use crate::component::ComponentKey;

pub trait KeyedCollection {
    type Key: ComponentKey;
    type Element;

    fn element_mut(&mut self, key: &Self::Key) -> Option<&mut Self::Element>;
}

/// Elements that carry their own stable identity.
pub trait Identifiable {
    type Id: ComponentKey;

    fn id(&self) -> &Self::Id;
}

// ---------------------------------------------------------------------------
// IdentifiedVec
// ---------------------------------------------------------------------------

/// Ordered elements, unique by [`Identifiable::id`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifiedVec<T> {
    elements: Vec<T>,
}

impl<T: Identifiable> IdentifiedVec<T> {
    pub fn new() -> Self {
        Self { elements: Vec::new() }
    }

    /// Append `element`, or replace the element with the same id in place.
    /// Returns the replaced element.
    pub fn push(&mut self, element: T) -> Option<T> {
        match self.position(element.id()) {
            Some(index) => Some(std::mem::replace(&mut self.elements[index], element)),
            None => {
                self.elements.push(element);
                None
            }
        }
    }

    pub fn remove(&mut self, id: &T::Id) -> Option<T> {
        let index = self.position(id)?;
        Some(self.elements.remove(index))
    }

    pub fn get(&self, id: &T::Id) -> Option<&T> {
        self.elements.iter().find(|e| e.id() == id)
    }

    pub fn get_mut(&mut self, id: &T::Id) -> Option<&mut T> {
        self.elements.iter_mut().find(|e| e.id() == id)
    }

    pub fn contains(&self, id: &T::Id) -> bool {
        self.position(id).is_some()
    }

    pub fn ids(&self) -> impl Iterator<Item = &T::Id> {
        self.elements.iter().map(Identifiable::id)
    }

    /// Move the element with `id` to `index` (clamped to the end).
    /// Returns false if no such element exists.
    pub fn move_to(&mut self, id: &T::Id, index: usize) -> bool {
        let Some(from) = self.position(id) else {
            return false;
        };
        let element = self.elements.remove(from);
        let to = index.min(self.elements.len());
        self.elements.insert(to, element);
        true
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.elements.iter()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    fn position(&self, id: &T::Id) -> Option<usize> {
        self.elements.iter().position(|e| e.id() == id)
    }
}

impl<T: Identifiable> Default for IdentifiedVec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Identifiable> FromIterator<T> for IdentifiedVec<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut vec = Self::new();
        for element in iter {
            vec.push(element);
        }
        vec
    }
}

impl<'a, T> IntoIterator for &'a IdentifiedVec<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.iter()
    }
}

impl<T: Identifiable> KeyedCollection for IdentifiedVec<T> {
    type Key = T::Id;
    type Element = T;

    fn element_mut(&mut self, key: &T::Id) -> Option<&mut T> {
        self.get_mut(key)
    }
}

// ---------------------------------------------------------------------------
// KeyedVec
// ---------------------------------------------------------------------------

/// Ordered `(key, value)` pairs, unique by key. For element types that have
/// no identity of their own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyedVec<K, V> {
    entries: Vec<(K, V)>,
}

impl<K: ComponentKey, V> KeyedVec<K, V> {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Append, or replace the value under an existing key in place.
    /// Returns the replaced value.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        match self.position(&key) {
            Some(index) => Some(std::mem::replace(&mut self.entries[index].1, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        let index = self.position(key)?;
        Some(self.entries.remove(index).1)
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        self.entries.iter_mut().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn move_to(&mut self, key: &K, index: usize) -> bool {
        let Some(from) = self.position(key) else {
            return false;
        };
        let entry = self.entries.remove(from);
        let to = index.min(self.entries.len());
        self.entries.insert(to, entry);
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, key: &K) -> Option<usize> {
        self.entries.iter().position(|(k, _)| k == key)
    }
}

impl<K: ComponentKey, V> Default for KeyedVec<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: ComponentKey, V> FromIterator<(K, V)> for KeyedVec<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut vec = Self::new();
        for (key, value) in iter {
            vec.insert(key, value);
        }
        vec
    }
}

impl<K: ComponentKey, V> KeyedCollection for KeyedVec<K, V> {
    type Key = K;
    type Element = V;

    fn element_mut(&mut self, key: &K) -> Option<&mut V> {
        self.get_mut(key)
    }
}

// ---------------------------------------------------------------------------
// HashMap
// ---------------------------------------------------------------------------

impl<K, V, H> KeyedCollection for HashMap<K, V, H>
where
    K: ComponentKey,
    H: BuildHasher,
{
    type Key = K;
    type Element = V;

    fn element_mut(&mut self, key: &K) -> Option<&mut V> {
        self.get_mut(key)
    }
}
