use std::collections::HashMap;
use std::collections::hash_map;
use std::hash::Hash;
use std::ops::{Add, AddAssign, Mul};

use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// A map from keys to `f64` where every absent key reads as `0.0`.
///
/// Used for state values, Q-values, feature vectors and weight vectors.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(
    transparent,
    bound(
        serialize = "K: Serialize + Eq + Hash",
        deserialize = "K: Deserialize<'de> + Eq + Hash"
    )
)]
pub struct Counter<K> {
    entries: HashMap<K, f64>,
}

impl<K> Default for Counter<K> {
    fn default() -> Self {
        Counter {
            entries: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash> PartialEq for Counter<K> {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl<K: Eq + Hash> Counter<K> {
    pub fn new() -> Self {
        Counter::default()
    }

    /// Returns the value stored for `key`, or `0.0` if there is none.
    pub fn get(&self, key: &K) -> f64 {
        self.entries.get(key).copied().unwrap_or(0.0)
    }

    pub fn set(&mut self, key: K, value: f64) {
        self.entries.insert(key, value);
    }

    /// Mutable access to the value for `key`, inserting `0.0` first if absent.
    pub fn entry(&mut self, key: K) -> &mut f64 {
        self.entries.entry(key).or_insert(0.0)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> hash_map::Iter<'_, K, f64> {
        self.entries.iter()
    }

    pub fn keys(&self) -> hash_map::Keys<'_, K, f64> {
        self.entries.keys()
    }

    pub fn total(&self) -> f64 {
        self.entries.values().sum()
    }

    /// Key with the largest value, if any.
    pub fn arg_max(&self) -> Option<&K> {
        self.entries
            .iter()
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(key, _)| key)
    }

    /// Entries ordered from largest to smallest value.
    pub fn sorted_desc(&self) -> Vec<(&K, f64)> {
        self.entries
            .iter()
            .map(|(key, value)| (key, *value))
            .sorted_by(|(_, a), (_, b)| b.total_cmp(a))
            .collect()
    }

    /// Multiplies every stored value by `factor` in place.
    pub fn scale(&mut self, factor: f64) {
        for value in self.entries.values_mut() {
            *value *= factor;
        }
    }

    /// Sum over shared keys of the product of values. Keys missing from
    /// either side contribute nothing.
    pub fn dot(&self, other: &Counter<K>) -> f64 {
        let (small, large) = if self.len() <= other.len() {
            (self, other)
        } else {
            (other, self)
        };
        small
            .entries
            .iter()
            .map(|(key, value)| value * large.get(key))
            .sum()
    }
}

impl<K: Eq + Hash> FromIterator<(K, f64)> for Counter<K> {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        let mut counter = Counter::new();
        for (key, value) in iter {
            *counter.entry(key) += value;
        }
        counter
    }
}

impl<K: Eq + Hash> IntoIterator for Counter<K> {
    type Item = (K, f64);
    type IntoIter = hash_map::IntoIter<K, f64>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a, K: Eq + Hash> IntoIterator for &'a Counter<K> {
    type Item = (&'a K, &'a f64);
    type IntoIter = hash_map::Iter<'a, K, f64>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl<K: Eq + Hash + Clone> AddAssign<&Counter<K>> for Counter<K> {
    fn add_assign(&mut self, other: &Counter<K>) {
        for (key, value) in &other.entries {
            *self.entry(key.clone()) += value;
        }
    }
}

impl<K: Eq + Hash + Clone> Add<&Counter<K>> for &Counter<K> {
    type Output = Counter<K>;

    fn add(self, other: &Counter<K>) -> Counter<K> {
        let mut sum = self.clone();
        sum += other;
        sum
    }
}

impl<K: Eq + Hash> Mul<f64> for Counter<K> {
    type Output = Counter<K>;

    fn mul(mut self, factor: f64) -> Counter<K> {
        self.scale(factor);
        self
    }
}

/// Dot product.
impl<K: Eq + Hash> Mul<&Counter<K>> for &Counter<K> {
    type Output = f64;

    fn mul(self, other: &Counter<K>) -> f64 {
        self.dot(other)
    }
}
