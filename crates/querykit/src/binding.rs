//! Placeholder-name generation and the `:name` → value binding map.

use crate::value::Value;
use uuid::Uuid;

/// Source of generated placeholder names.
///
/// `Entropy` draws names from UUIDv4 so they cannot collide with anything a
/// caller typed into a predicate; collisions between generated names are
/// negligible by construction. `Sequence` yields `:p1`, `:p2`, … so tests
/// can assert full `(sql, bindings)` pairs.
#[derive(Clone, Debug)]
pub enum NameSource {
    Entropy,
    Sequence(u64),
}

impl NameSource {
    /// Generate the next placeholder token, including the leading `:`.
    pub fn next_name(&mut self) -> String {
        match self {
            NameSource::Entropy => format!(":v{}", Uuid::new_v4().simple()),
            NameSource::Sequence(n) => {
                *n += 1;
                format!(":p{}", n)
            }
        }
    }
}

impl Default for NameSource {
    fn default() -> Self {
        NameSource::Entropy
    }
}

/// An insertion-ordered mapping from placeholder token to value.
///
/// Keys are unique and always carry the leading `:`. Insertion order is
/// preserved so value extraction is stable across renders.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Bindings {
    entries: Vec<(String, Value)>,
}

impl Bindings {
    /// Create an empty binding set.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Normalize a placeholder key to carry the leading `:`.
    fn normalize(name: &str) -> String {
        if name.starts_with(':') {
            name.to_string()
        } else {
            format!(":{}", name)
        }
    }

    /// Insert a binding, replacing any existing entry with the same key.
    pub fn insert(&mut self, name: impl AsRef<str>, value: Value) {
        let key = Self::normalize(name.as_ref());
        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            self.entries.push((key, value));
        }
    }

    /// Insert a binding only if the key is not already present.
    ///
    /// This is the merge rule for caller-supplied predicate params and for
    /// combining sub-select binding sets: existing entries win.
    pub fn insert_missing(&mut self, name: impl AsRef<str>, value: Value) {
        let key = Self::normalize(name.as_ref());
        if !self.entries.iter().any(|(k, _)| *k == key) {
            self.entries.push((key, value));
        }
    }

    /// Look up the value bound to a placeholder token.
    pub fn get(&self, name: &str) -> Option<&Value> {
        let key = Self::normalize(name);
        self.entries.iter().find(|(k, _)| *k == key).map(|(_, v)| v)
    }

    /// Merge another binding set, keeping existing entries on key collision.
    pub fn merge(&mut self, other: &Bindings) {
        for (name, value) in &other.entries {
            self.insert_missing(name, value.clone());
        }
    }

    /// Number of bindings.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(token, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Extract the values in insertion order.
    pub fn values(&self) -> Vec<&Value> {
        self.entries.iter().map(|(_, v)| v).collect()
    }
}

impl<S: Into<String>, V: Into<Value>> FromIterator<(S, V)> for Bindings {
    fn from_iter<T: IntoIterator<Item = (S, V)>>(iter: T) -> Self {
        let mut bindings = Bindings::new();
        for (name, value) in iter {
            bindings.insert(name.into(), value.into());
        }
        bindings
    }
}
