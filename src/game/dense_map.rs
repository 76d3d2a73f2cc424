//! Dense Sorted Map
//!
//! The backbone container of the entity system. Keys live in one
//! contiguous array, values in a parallel contiguous array at the same
//! index, and lookups binary-search the key array.
//!
//! The scene does far more lookups and full iterations (every frame,
//! every entity) than insertions or removals (spawn/despawn only), so
//! paying a shift on mutation in exchange for O(log n) search and
//! linear-memory iteration is the right trade for a frame loop.

use std::fmt;

/// Errors from map construction and strict lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenseMapError {
    /// A map was requested with zero capacity.
    InvalidCapacity,
    /// Strict lookup on a key that is not in the map.
    KeyNotFound,
}

impl fmt::Display for DenseMapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenseMapError::InvalidCapacity => write!(f, "map capacity must be non-zero"),
            DenseMapError::KeyNotFound => write!(f, "key not found"),
        }
    }
}

impl std::error::Error for DenseMapError {}

/// Ordered associative container over two parallel arrays.
///
/// Invariant: `keys` is strictly ascending after every mutation, and
/// `values[i]` belongs to `keys[i]`. The map owns all key and value
/// storage.
pub struct DenseMap<K, V> {
    keys: Vec<K>,
    values: Vec<V>,
}

impl<K: Ord, V> DenseMap<K, V> {
    /// Default capacity used by `new`.
    pub const DEFAULT_CAPACITY: usize = 16;

    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
            .expect("default capacity is non-zero")
    }

    /// Create a map with room for `capacity` entries before the first
    /// regrowth. Zero capacity is a configuration error and fails fast.
    pub fn with_capacity(capacity: usize) -> Result<Self, DenseMapError> {
        if capacity == 0 {
            return Err(DenseMapError::InvalidCapacity);
        }
        Ok(Self {
            keys: Vec::with_capacity(capacity),
            values: Vec::with_capacity(capacity),
        })
    }

    /// Binary search for `key`. Returns the entry index if present.
    pub fn search(&self, key: &K) -> Option<usize> {
        self.keys.binary_search(key).ok()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.search(key).is_some()
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.search(key).map(|i| &self.values[i])
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        match self.keys.binary_search(key) {
            Ok(i) => Some(&mut self.values[i]),
            Err(_) => None,
        }
    }

    /// Strict lookup: absent keys are a reportable logic error in the
    /// caller, not a default value.
    pub fn require(&self, key: &K) -> Result<&V, DenseMapError> {
        self.get(key).ok_or(DenseMapError::KeyNotFound)
    }

    /// Strict mutable lookup. See [`DenseMap::require`].
    pub fn require_mut(&mut self, key: &K) -> Result<&mut V, DenseMapError> {
        self.get_mut(key).ok_or(DenseMapError::KeyNotFound)
    }

    /// Ordered insertion. Entries with larger keys shift one slot right;
    /// capacity doubles first when full.
    ///
    /// Returns a reference to the stored value, or `None` if the key is
    /// already present (duplicates are rejected, existing entry kept).
    pub fn insert(&mut self, key: K, value: V) -> Option<&mut V> {
        match self.keys.binary_search(&key) {
            Ok(_) => None,
            Err(pos) => {
                self.grow_if_full();
                self.keys.insert(pos, key);
                self.values.insert(pos, value);
                Some(&mut self.values[pos])
            }
        }
    }

    /// Upsert accessor: the existing value, or a default-constructed one
    /// inserted at the sorted position. Indexing with a fresh key is a
    /// mutating operation.
    pub fn entry_or_default(&mut self, key: K) -> &mut V
    where
        V: Default,
    {
        match self.keys.binary_search(&key) {
            Ok(pos) => &mut self.values[pos],
            Err(pos) => {
                self.grow_if_full();
                self.keys.insert(pos, key);
                self.values.insert(pos, V::default());
                &mut self.values[pos]
            }
        }
    }

    /// Remove `key`, shifting all subsequent entries one slot left.
    /// Returns the removed value, or `None` if the key was absent.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let pos = self.keys.binary_search(key).ok()?;
        self.keys.remove(pos);
        Some(self.values.remove(pos))
    }

    /// Destroy all entries. Count drops to zero, capacity is unchanged.
    pub fn clear(&mut self) {
        self.keys.clear();
        self.values.clear();
    }

    /// Move all entries into freshly sized storage. The new capacity is
    /// clamped so existing entries always fit.
    pub fn reallocate(&mut self, new_capacity: usize) {
        let cap = new_capacity.max(self.keys.len()).max(1);
        let mut keys = Vec::with_capacity(cap);
        let mut values = Vec::with_capacity(cap);
        keys.append(&mut self.keys);
        values.append(&mut self.values);
        self.keys = keys;
        self.values = values;
    }

    fn grow_if_full(&mut self) {
        if self.keys.len() == self.keys.capacity() {
            let doubled = self.keys.capacity().max(1) * 2;
            self.reallocate(doubled);
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.keys.capacity()
    }

    /// Forward/backward traversal in sorted key order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (&K, &V)> {
        self.keys.iter().zip(self.values.iter())
    }

    /// Like `iter`, but values are mutable. Keys stay read-only so the
    /// sorted invariant cannot be broken through iteration.
    pub fn iter_mut(&mut self) -> impl DoubleEndedIterator<Item = (&K, &mut V)> {
        self.keys.iter().zip(self.values.iter_mut())
    }

    pub fn keys(&self) -> &[K] {
        &self.keys
    }

    pub fn values(&self) -> &[V] {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut [V] {
        &mut self.values
    }
}

impl<K: Ord, V> Default for DenseMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_sorted(map: &DenseMap<i32, i32>) {
        let keys = map.keys();
        for pair in keys.windows(2) {
            assert!(pair[0] < pair[1], "keys not strictly ascending: {:?}", keys);
        }
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let result: Result<DenseMap<i32, i32>, _> = DenseMap::with_capacity(0);
        assert_eq!(result.err(), Some(DenseMapError::InvalidCapacity));
    }

    #[test]
    fn test_insert_keeps_sorted_order() {
        let mut map = DenseMap::new();
        for key in [40, 10, 30, 20, 50, 5, 45] {
            assert!(map.insert(key, key * 2).is_some());
            assert_sorted(&map);
        }
        assert_eq!(map.len(), 7);
    }

    #[test]
    fn test_duplicate_insert_rejected() {
        let mut map = DenseMap::new();
        assert!(map.insert(7, "first").is_some());
        assert!(map.insert(7, "second").is_none());
        assert_eq!(map.get(&7), Some(&"first"));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_search_round_trip() {
        let mut map = DenseMap::new();
        for key in 0..100 {
            map.insert(key, key * 3);
        }
        for key in 0..100 {
            assert_eq!(map.get(&key), Some(&(key * 3)));
        }
        assert!(map.remove(&42).is_some());
        assert_eq!(map.get(&42), None);
        assert!(map.search(&42).is_none());
        assert_sorted(&map);
    }

    #[test]
    fn test_remove_shifts_left() {
        let mut map = DenseMap::new();
        for key in [1, 2, 3, 4, 5] {
            map.insert(key, key);
        }
        assert_eq!(map.remove(&3), Some(3));
        assert_eq!(map.keys(), &[1, 2, 4, 5]);
        assert_eq!(map.values(), &[1, 2, 4, 5]);
        assert_eq!(map.remove(&3), None);
        assert_sorted(&map);
    }

    #[test]
    fn test_upsert_idempotent() {
        let mut map: DenseMap<i32, i32> = DenseMap::new();
        *map.entry_or_default(9) = 11;
        *map.entry_or_default(9) = 11;
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&9), Some(&11));
    }

    #[test]
    fn test_entry_or_default_inserts_sorted() {
        let mut map: DenseMap<i32, i32> = DenseMap::new();
        map.insert(10, 1);
        map.insert(30, 3);
        let v = map.entry_or_default(20);
        assert_eq!(*v, 0);
        assert_eq!(map.keys(), &[10, 20, 30]);
    }

    #[test]
    fn test_require_reports_missing_key() {
        let mut map: DenseMap<i32, i32> = DenseMap::new();
        map.insert(1, 1);
        assert_eq!(map.require(&2).err(), Some(DenseMapError::KeyNotFound));
        assert_eq!(map.require(&1), Ok(&1));
    }

    #[test]
    fn test_capacity_doubles_on_overflow() {
        let mut map = DenseMap::with_capacity(2).unwrap();
        map.insert(1, 1);
        map.insert(2, 2);
        assert_eq!(map.capacity(), 2);
        map.insert(3, 3);
        assert!(map.capacity() >= 4);
        assert_eq!(map.len(), 3);
        assert_sorted(&map);
    }

    #[test]
    fn test_clear_keeps_capacity() {
        let mut map = DenseMap::with_capacity(8).unwrap();
        for key in 0..8 {
            map.insert(key, key);
        }
        let cap = map.capacity();
        map.clear();
        assert!(map.is_empty());
        assert_eq!(map.capacity(), cap);
    }

    #[test]
    fn test_reallocate_preserves_entries() {
        let mut map = DenseMap::new();
        for key in 0..10 {
            map.insert(key, key);
        }
        map.reallocate(64);
        assert!(map.capacity() >= 64);
        assert_eq!(map.len(), 10);
        for key in 0..10 {
            assert_eq!(map.get(&key), Some(&key));
        }
    }

    #[test]
    fn test_backward_iteration() {
        let mut map = DenseMap::new();
        for key in [3, 1, 2] {
            map.insert(key, key * 10);
        }
        let forward: Vec<i32> = map.iter().map(|(k, _)| *k).collect();
        let backward: Vec<i32> = map.iter().rev().map(|(k, _)| *k).collect();
        assert_eq!(forward, vec![1, 2, 3]);
        assert_eq!(backward, vec![3, 2, 1]);
    }

    #[test]
    fn test_iter_mut_mutates_values() {
        let mut map = DenseMap::new();
        map.insert(1, 10);
        map.insert(2, 20);
        for (_, v) in map.iter_mut() {
            *v += 1;
        }
        assert_eq!(map.values(), &[11, 21]);
    }

    #[test]
    fn test_mixed_ops_hold_invariant() {
        let mut map = DenseMap::new();
        let ops: [(bool, i32); 12] = [
            (true, 8), (true, 3), (true, 12), (false, 3),
            (true, 1), (true, 3), (false, 8), (true, 15),
            (false, 99), (true, 7), (false, 1), (true, 2),
        ];
        for (is_insert, key) in ops {
            if is_insert {
                map.insert(key, key);
            } else {
                map.remove(&key);
            }
            assert_sorted(&map);
        }
    }
}
