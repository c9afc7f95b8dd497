//! A slab whose keys carry the generation of the slot they were issued for.

use std::marker::PhantomData;
use std::num::NonZeroU32;

/// Trait for keys of a [`GenerationalSlab`].
pub trait GenerationalKey: Copy {
    #[doc(hidden)]
    /// Creates a new key. Must only be called by the slab.
    fn new(slot: u32, generation: NonZeroU32) -> Self;
    #[doc(hidden)]
    /// Returns the slot index.
    fn slot(&self) -> u32;
    #[doc(hidden)]
    /// Returns the generation the key was issued for.
    fn generation(&self) -> NonZeroU32;
}

struct Entry<V> {
    generation: NonZeroU32,
    value: Option<V>,
}

/// A slab with generational slots. A removed slot is reused, but keys issued
/// for an older generation of that slot never resolve again.
pub struct GenerationalSlab<K, V> {
    entries: Vec<Entry<V>>,
    free: Vec<u32>,
    count: usize,
    _marker: PhantomData<K>,
}

impl<K: GenerationalKey, V> Default for GenerationalSlab<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: GenerationalKey, V> GenerationalSlab<K, V> {
    /// Creates an empty slab.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            free: Vec::new(),
            count: 0,
            _marker: PhantomData,
        }
    }

    /// Inserts a value and returns its key. Returns [`None`] once all
    /// [`u32::MAX`] slots are occupied.
    #[must_use]
    pub fn insert(&mut self, value: V) -> Option<K> {
        if let Some(slot) = self.free.pop() {
            let entry = &mut self.entries[slot as usize];
            entry.generation = entry.generation.checked_add(1).unwrap_or(NonZeroU32::MIN);
            entry.value = Some(value);
            self.count += 1;

            return Some(K::new(slot, entry.generation));
        }

        let slot = u32::try_from(self.entries.len()).ok()?;
        self.entries.push(Entry {
            generation: NonZeroU32::MIN,
            value: Some(value),
        });
        self.count += 1;

        Some(K::new(slot, NonZeroU32::MIN))
    }

    /// Returns `true` if the key resolves to a live value.
    #[must_use]
    pub fn contains(&self, key: K) -> bool {
        self.get(key).is_some()
    }

    /// Returns a reference to the value of the given key.
    #[must_use]
    pub fn get(&self, key: K) -> Option<&V> {
        self.entries
            .get(key.slot() as usize)
            .filter(|entry| entry.generation == key.generation())
            .and_then(|entry| entry.value.as_ref())
    }

    /// Returns a mutable reference to the value of the given key.
    #[must_use]
    pub fn get_mut(&mut self, key: K) -> Option<&mut V> {
        self.entries
            .get_mut(key.slot() as usize)
            .filter(|entry| entry.generation == key.generation())
            .and_then(|entry| entry.value.as_mut())
    }

    /// Removes and returns the value of the given key.
    pub fn remove(&mut self, key: K) -> Option<V> {
        let entry = self
            .entries
            .get_mut(key.slot() as usize)
            .filter(|entry| entry.generation == key.generation())?;
        let value = entry.value.take()?;

        self.free.push(key.slot());
        self.count -= 1;

        Some(value)
    }

    /// Iterates over the keys of all live values in slot order.
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys {
            entries: self.entries.iter().enumerate(),
            _marker: PhantomData,
        }
    }

    /// Returns the number of live values.
    #[must_use]
    pub fn count(&self) -> usize {
        self.count
    }

    /// Removes all values. Previously issued keys stay invalid.
    pub fn clear(&mut self) {
        self.free.clear();

        for (slot, entry) in self.entries.iter_mut().enumerate() {
            entry.value = None;
            self.free.push(slot as u32);
        }

        self.free.reverse();
        self.count = 0;
    }
}

/// Iterator over the keys of a [`GenerationalSlab`].
pub struct Keys<'a, K, V> {
    entries: std::iter::Enumerate<std::slice::Iter<'a, Entry<V>>>,
    _marker: PhantomData<K>,
}

impl<K: GenerationalKey, V> Iterator for Keys<'_, K, V> {
    type Item = K;

    fn next(&mut self) -> Option<Self::Item> {
        self.entries
            .by_ref()
            .find(|(_, entry)| entry.value.is_some())
            .map(|(slot, entry)| K::new(slot as u32, entry.generation))
    }
}

#[cfg(test)]
mod tests {
    use crate::{GenerationalKey, GenerationalSlab};

    create_generational_key!(TestKey);

    #[test]
    fn test_insert_assigns_sequential_slots() {
        let mut slab: GenerationalSlab<TestKey, &str> = GenerationalSlab::new();
        let first = slab.insert("first").unwrap();
        let second = slab.insert("second").unwrap();

        assert_eq!(first.slot(), 0);
        assert_eq!(second.slot(), 1);
        assert_eq!(first.generation().get(), 1);
        assert_eq!(slab.count(), 2);
    }

    #[test]
    fn test_reused_slot_bumps_generation() {
        let mut slab: GenerationalSlab<TestKey, u32> = GenerationalSlab::new();
        let old = slab.insert(1).unwrap();
        assert_eq!(slab.remove(old), Some(1));

        let new = slab.insert(2).unwrap();

        assert_eq!(new.slot(), old.slot());
        assert_eq!(new.generation().get(), 2);
        assert!(slab.get(old).is_none());
        assert_eq!(slab.get(new), Some(&2));
    }

    #[test]
    fn test_stale_key_can_not_remove() {
        let mut slab: GenerationalSlab<TestKey, u32> = GenerationalSlab::new();
        let old = slab.insert(1).unwrap();
        let _ = slab.remove(old);
        let new = slab.insert(2).unwrap();

        assert!(slab.remove(old).is_none());
        assert!(slab.contains(new));
    }

    #[test]
    fn test_double_remove() {
        let mut slab: GenerationalSlab<TestKey, u32> = GenerationalSlab::new();
        let key = slab.insert(7).unwrap();

        assert_eq!(slab.remove(key), Some(7));
        assert_eq!(slab.remove(key), None);
        assert_eq!(slab.count(), 0);
    }

    #[test]
    fn test_get_mut() {
        let mut slab: GenerationalSlab<TestKey, u32> = GenerationalSlab::new();
        let key = slab.insert(0).unwrap();
        *slab.get_mut(key).unwrap() = 13;

        assert_eq!(slab.get(key), Some(&13));
    }

    #[test]
    fn test_keys_skip_empty_slots() {
        let mut slab: GenerationalSlab<TestKey, u32> = GenerationalSlab::new();
        let keys: Vec<TestKey> = (0..5).map(|index| slab.insert(index).unwrap()).collect();
        let _ = slab.remove(keys[1]);
        let _ = slab.remove(keys[3]);

        let remaining: Vec<TestKey> = slab.keys().collect();

        assert_eq!(remaining, vec![keys[0], keys[2], keys[4]]);
    }

    #[test]
    fn test_clear_invalidates_keys() {
        let mut slab: GenerationalSlab<TestKey, u32> = GenerationalSlab::new();
        let key = slab.insert(3).unwrap();
        slab.clear();

        assert!(slab.get(key).is_none());
        assert_eq!(slab.count(), 0);

        let new = slab.insert(4).unwrap();
        assert!(slab.get(key).is_none());
        assert_eq!(slab.get(new), Some(&4));
    }
}
