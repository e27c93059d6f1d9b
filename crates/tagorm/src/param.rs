//! Named parameter storage.

use crate::value::Value;
use indexmap::IndexMap;

/// An insertion-ordered `name -> value` map bound against `:name` markers.
///
/// Seeded from a record's resolved field values, then extended while
/// conditions compile (synthesized keys such as `name1`, `name2`, or the
/// placeholder names of named expressions).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParamBag {
    params: IndexMap<String, Value>,
}

impl ParamBag {
    /// Create a new empty bag.
    pub fn new() -> Self {
        Self {
            params: IndexMap::new(),
        }
    }

    /// Insert or replace a parameter.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.params.insert(name.into(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.params.contains_key(name)
    }

    /// Remove a parameter, keeping the order of the others.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.params.shift_remove(name)
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Copy every entry of `other` into this bag, overwriting duplicates.
    pub fn extend(&mut self, other: &ParamBag) {
        for (k, v) in &other.params {
            self.params.insert(k.clone(), v.clone());
        }
    }

    /// Render the bag as a JSON object (nested records are stored this way).
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.params
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for ParamBag {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut bag = ParamBag::new();
        for (k, v) in iter {
            bag.insert(k, v);
        }
        bag
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_insertion_order() {
        let mut bag = ParamBag::new();
        bag.insert("b", 2);
        bag.insert("a", 1);
        bag.insert("b", 3);
        let keys: Vec<_> = bag.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["b", "a"]);
        assert_eq!(bag.get("b"), Some(&Value::Int(3)));
    }

    #[test]
    fn renders_json_object() {
        let bag: ParamBag = [("id", Value::Int(1)), ("name", Value::from("x"))]
            .into_iter()
            .collect();
        assert_eq!(bag.to_json(), serde_json::json!({"id": 1, "name": "x"}));
    }
}
