//! Change values and their text form.
//!
//! YAML values are converted once into [`ChangeValue`], which can only be a
//! scalar, a flat sequence of scalars, or a nested change map. Everything
//! written into the XML goes through [`coerce`].

use serde_yaml::Value;

use crate::constants::SEQUENCE_SEPARATOR;
use crate::error::{Error, Result};

/// A parsed change value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeValue {
    /// Text written as-is.
    Scalar(String),
    /// Items joined with `"; "` when written.
    Sequence(Vec<String>),
    /// Nested changes, only legal under "Additional Applications".
    SubChanges(ChangeMap),
}

impl ChangeValue {
    pub fn scalar(text: impl Into<String>) -> Self {
        ChangeValue::Scalar(text.into())
    }

    /// Converts a YAML leaf value. Mappings are rejected.
    pub fn from_yaml(value: &Value) -> Result<Self> {
        match value {
            Value::Sequence(items) => items
                .iter()
                .map(coerce_yaml)
                .collect::<Result<Vec<_>>>()
                .map(ChangeValue::Sequence),
            Value::Tagged(tagged) => ChangeValue::from_yaml(&tagged.value),
            other => coerce_yaml(other).map(ChangeValue::Scalar),
        }
    }

    /// Returns true for scalars and sequences.
    pub fn is_leaf(&self) -> bool {
        !matches!(self, ChangeValue::SubChanges(_))
    }

    pub fn as_sub_changes(&self) -> Option<&ChangeMap> {
        match self {
            ChangeValue::SubChanges(map) => Some(map),
            _ => None,
        }
    }
}

impl From<&str> for ChangeValue {
    fn from(text: &str) -> Self {
        ChangeValue::Scalar(text.to_string())
    }
}

impl From<ChangeMap> for ChangeValue {
    fn from(map: ChangeMap) -> Self {
        ChangeValue::SubChanges(map)
    }
}

/// Converts a change value into element text.
pub fn coerce(value: &ChangeValue) -> Result<String> {
    match value {
        ChangeValue::Scalar(text) => Ok(text.clone()),
        ChangeValue::Sequence(items) => Ok(items.join(SEQUENCE_SEPARATOR)),
        ChangeValue::SubChanges(_) => Err(Error::ForbiddenElementChange(
            "Only 'Additional Applications' can have an object as a value".to_string(),
        )),
    }
}

/// Converts a raw YAML value into element text.
pub fn coerce_yaml(value: &Value) -> Result<String> {
    match value {
        Value::Null => Ok(String::new()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Number(n) => Ok(n.to_string()),
        Value::String(s) => Ok(s.clone()),
        Value::Sequence(items) => Ok(items
            .iter()
            .map(coerce_yaml)
            .collect::<Result<Vec<_>>>()?
            .join(SEQUENCE_SEPARATOR)),
        Value::Mapping(_) => Err(Error::ForbiddenElementChange(
            "Only 'Additional Applications' can have an object as a value".to_string(),
        )),
        Value::Tagged(tagged) => coerce_yaml(&tagged.value),
    }
}

/// Ordered mapping of element (or application) names to changes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeMap {
    entries: Vec<(String, ChangeValue)>,
}

impl ChangeMap {
    pub fn new() -> Self {
        ChangeMap::default()
    }

    /// Inserts or replaces a value, returning the previous one.
    pub fn insert(&mut self, key: impl Into<String>, value: ChangeValue) -> Option<ChangeValue> {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => Some(std::mem::replace(existing, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&ChangeValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ChangeValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }
}

impl<K: Into<String>> FromIterator<(K, ChangeValue)> for ChangeMap {
    fn from_iter<I: IntoIterator<Item = (K, ChangeValue)>>(iter: I) -> Self {
        let mut map = ChangeMap::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}
