//! Map and Set containers for [`Value`].
//!
//! Both keep their contents in insertion order, which is the order they are encoded in, but
//! compare and hash without regard to order. Keys and elements are unique under [`Value`]
//! equality. A hash index beside the entries keeps lookups and duplicate checks constant
//! time, so decoding a large Map or Set stays linear.

use std::collections::hash_map::{DefaultHasher, RandomState};
use std::collections::HashMap;
use std::fmt;
use std::hash::{BuildHasher, Hash, Hasher};

use crate::value::Value;

/// Positions of entries, bucketed by the hash of their key.
#[derive(Clone, Default)]
struct HashIndex {
    state: RandomState,
    slots: HashMap<u64, Vec<usize>>,
}

impl HashIndex {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            state: RandomState::new(),
            slots: HashMap::with_capacity(capacity),
        }
    }

    fn hash(&self, key: &Value) -> u64 {
        self.state.hash_one(key)
    }

    fn find(&self, hash: u64, is_match: impl Fn(usize) -> bool) -> Option<usize> {
        self.slots.get(&hash)?.iter().copied().find(|&i| is_match(i))
    }

    fn insert(&mut self, hash: u64, pos: usize) {
        self.slots.entry(hash).or_default().push(pos);
    }

    /// Reindex after entries have moved.
    fn rebuild<'a>(&mut self, keys: impl Iterator<Item = &'a Value>) {
        self.slots.clear();
        for (i, key) in keys.enumerate() {
            let hash = self.hash(key);
            self.insert(hash, i);
        }
    }
}

/// Hash of a single entry, for combining without regard to order.
fn entry_hash<T: Hash>(entry: T) -> u64 {
    let mut hasher = DefaultHasher::new();
    entry.hash(&mut hasher);
    hasher.finish()
}

/// Key-value pairs with unique keys, kept in insertion order.
#[derive(Clone, Default)]
pub struct ValueMap {
    entries: Vec<(Value, Value)>,
    index: HashIndex,
}

impl ValueMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            index: HashIndex::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn find(&self, hash: u64, key: &Value) -> Option<usize> {
        self.index.find(hash, |i| &self.entries[i].0 == key)
    }

    fn position(&self, key: &Value) -> Option<usize> {
        self.find(self.index.hash(key), key)
    }

    fn push(&mut self, hash: u64, key: Value, value: Value) {
        self.index.insert(hash, self.entries.len());
        self.entries.push((key, value));
    }

    /// Insert a pair. If the key was already present, its value is replaced in place and the
    /// old value returned.
    pub fn insert(&mut self, key: impl Into<Value>, value: impl Into<Value>) -> Option<Value> {
        let key = key.into();
        let value = value.into();
        let hash = self.index.hash(&key);
        match self.find(hash, &key) {
            Some(i) => Some(std::mem::replace(&mut self.entries[i].1, value)),
            None => {
                self.push(hash, key, value);
                None
            }
        }
    }

    /// Insert a pair only if the key is new. Returns the rejected pair otherwise.
    pub(crate) fn insert_new(&mut self, key: Value, value: Value) -> Result<(), (Value, Value)> {
        let hash = self.index.hash(&key);
        if self.find(hash, &key).is_some() {
            return Err((key, value));
        }
        self.push(hash, key, value);
        Ok(())
    }

    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.position(key).map(|i| &self.entries[i].1)
    }

    pub fn get_mut(&mut self, key: &Value) -> Option<&mut Value> {
        self.position(key).map(move |i| &mut self.entries[i].1)
    }

    pub fn contains_key(&self, key: &Value) -> bool {
        self.position(key).is_some()
    }

    /// Remove a key, keeping the order of the remaining pairs.
    pub fn remove(&mut self, key: &Value) -> Option<Value> {
        let i = self.position(key)?;
        let (_, value) = self.entries.remove(i);
        self.index.rebuild(self.entries.iter().map(|(k, _)| k));
        Some(value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Value, &Value)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(_, v)| v)
    }
}

impl fmt::Debug for ValueMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl PartialEq for ValueMap {
    fn eq(&self, other: &ValueMap) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(k, v)| other.get(k).map_or(false, |o| o == v))
    }
}

impl Eq for ValueMap {}

impl Hash for ValueMap {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.len().hash(state);
        self.iter()
            .fold(0u64, |acc, entry| acc.wrapping_add(entry_hash(entry)))
            .hash(state);
    }
}

impl IntoIterator for ValueMap {
    type Item = (Value, Value);
    type IntoIter = std::vec::IntoIter<(Value, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<K: Into<Value>, V: Into<Value>> std::iter::FromIterator<(K, V)> for ValueMap {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut map = ValueMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

/// Unique values, kept in insertion order.
#[derive(Clone, Default)]
pub struct ValueSet {
    elements: Vec<Value>,
    index: HashIndex,
}

impl ValueSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            elements: Vec::with_capacity(capacity),
            index: HashIndex::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    fn find(&self, hash: u64, value: &Value) -> Option<usize> {
        self.index.find(hash, |i| &self.elements[i] == value)
    }

    /// Add a value. Returns false if an equal value was already present.
    pub fn insert(&mut self, value: impl Into<Value>) -> bool {
        self.insert_new(value.into()).is_ok()
    }

    pub(crate) fn insert_new(&mut self, value: Value) -> Result<(), Value> {
        let hash = self.index.hash(&value);
        if self.find(hash, &value).is_some() {
            return Err(value);
        }
        self.index.insert(hash, self.elements.len());
        self.elements.push(value);
        Ok(())
    }

    pub fn contains(&self, value: &Value) -> bool {
        self.find(self.index.hash(value), value).is_some()
    }

    pub fn remove(&mut self, value: &Value) -> bool {
        match self.find(self.index.hash(value), value) {
            Some(i) => {
                self.elements.remove(i);
                self.index.rebuild(self.elements.iter());
                true
            }
            None => false,
        }
    }

    pub fn iter(&self) -> std::slice::Iter<Value> {
        self.elements.iter()
    }
}

impl fmt::Debug for ValueSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl PartialEq for ValueSet {
    fn eq(&self, other: &ValueSet) -> bool {
        self.len() == other.len() && self.iter().all(|v| other.contains(v))
    }
}

impl Eq for ValueSet {}

impl Hash for ValueSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.len().hash(state);
        self.iter()
            .fold(0u64, |acc, elem| acc.wrapping_add(entry_hash(elem)))
            .hash(state);
    }
}

impl IntoIterator for ValueSet {
    type Item = Value;
    type IntoIter = std::vec::IntoIter<Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.into_iter()
    }
}

impl<'a> IntoIterator for &'a ValueSet {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.iter()
    }
}

impl<V: Into<Value>> std::iter::FromIterator<V> for ValueSet {
    fn from_iter<T: IntoIterator<Item = V>>(iter: T) -> Self {
        let mut set = ValueSet::new();
        for v in iter {
            set.insert(v);
        }
        set
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn map_insert_replaces_in_place() {
        let mut map = ValueMap::new();
        assert_eq!(map.insert("a", 1), None);
        assert_eq!(map.insert(false, 2), None);
        assert_eq!(map.insert("a", 3), Some(Value::Integer(1)));
        assert_eq!(map.len(), 2);
        let keys: Vec<&Value> = map.keys().collect();
        assert_eq!(keys, vec![&Value::from("a"), &Value::Logical(false)]);
        assert_eq!(map.get(&Value::from("a")), Some(&Value::Integer(3)));
    }

    #[test]
    fn map_remove() {
        let mut map: ValueMap = vec![(1, "one"), (2, "two"), (3, "three")]
            .into_iter()
            .collect();
        assert_eq!(map.remove(&Value::Integer(2)), Some(Value::from("two")));
        assert_eq!(map.remove(&Value::Integer(2)), None);
        let keys: Vec<&Value> = map.keys().collect();
        assert_eq!(keys, vec![&Value::Integer(1), &Value::Integer(3)]);
    }

    #[test]
    fn map_order_insensitive_eq() {
        let a: ValueMap = vec![(1, true), (2, false)].into_iter().collect();
        let b: ValueMap = vec![(2, false), (1, true)].into_iter().collect();
        let c: ValueMap = vec![(2, true), (1, true)].into_iter().collect();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn map_insert_new_rejects_duplicates() {
        let mut map = ValueMap::new();
        assert!(map.insert_new(Value::from("k"), Value::Integer(1)).is_ok());
        assert!(map.insert_new(Value::from("k"), Value::Integer(2)).is_err());
        assert_eq!(map.get(&Value::from("k")), Some(&Value::Integer(1)));
    }

    #[test]
    fn set_unique() {
        let mut set = ValueSet::new();
        assert!(set.insert(1));
        assert!(set.insert("1"));
        assert!(!set.insert(1));
        assert_eq!(set.len(), 2);
        assert!(set.contains(&Value::from("1")));
        assert!(set.remove(&Value::Integer(1)));
        assert!(!set.contains(&Value::Integer(1)));
    }

    #[test]
    fn set_order_insensitive_eq() {
        let a: ValueSet = vec![1, 2, 3].into_iter().collect();
        let b: ValueSet = vec![3, 1, 2].into_iter().collect();
        let c: ValueSet = vec![3, 1].into_iter().collect();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn nested_keys() {
        let mut map = ValueMap::new();
        let key: ValueSet = vec![1, 2].into_iter().collect();
        map.insert(key, "set key");
        let lookup: ValueSet = vec![2, 1].into_iter().collect();
        assert_eq!(
            map.get(&Value::Set(lookup)),
            Some(&Value::from("set key"))
        );
    }

    fn hash_of(value: &Value) -> u64 {
        entry_hash(value)
    }

    #[test]
    fn equal_values_hash_equal() {
        let a: ValueMap = vec![(1, "x"), (2, "y")].into_iter().collect();
        let b: ValueMap = vec![(2, "y"), (1, "x")].into_iter().collect();
        assert_eq!(hash_of(&Value::Map(a)), hash_of(&Value::Map(b)));
        let a: ValueSet = vec![1.5, -0.0, 3.0].into_iter().collect();
        let b: ValueSet = vec![3.0, 1.5, -0.0].into_iter().collect();
        assert_eq!(hash_of(&Value::Set(a)), hash_of(&Value::Set(b)));
        assert_eq!(
            hash_of(&Value::Double(f64::NAN)),
            hash_of(&Value::Double(f64::NAN))
        );
    }

    #[test]
    fn lookups_after_remove() {
        let mut map: ValueMap = (0..100).map(|i| (i, i * 2)).collect();
        for i in (0..100).step_by(3) {
            assert!(map.remove(&Value::Integer(i)).is_some());
        }
        for i in 0..100 {
            let expected = if i % 3 == 0 { None } else { Some(Value::Integer(i * 2)) };
            assert_eq!(map.get(&Value::Integer(i)).cloned(), expected);
        }
        assert!(map.insert_new(Value::Integer(0), Value::Integer(7)).is_ok());
        assert!(map.insert_new(Value::Integer(1), Value::Integer(7)).is_err());

        let mut set: ValueSet = (0..50).collect();
        assert!(set.remove(&Value::Integer(10)));
        assert!(set.contains(&Value::Integer(49)));
        assert!(!set.contains(&Value::Integer(10)));
        assert!(set.insert(10));
        assert_eq!(set.iter().last(), Some(&Value::Integer(10)));
    }

    #[test]
    fn large_set_inserts() {
        let mut set = ValueSet::with_capacity(100_000);
        for i in 0..100_000i64 {
            assert!(set.insert_new(Value::Integer(i)).is_ok());
        }
        assert!(set.insert_new(Value::Integer(99_999)).is_err());
        assert_eq!(set.len(), 100_000);
    }
}
