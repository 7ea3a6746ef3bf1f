use indexmap::IndexMap;
use std::fmt;

/// Ordered CSS declarations. Inserting a property that already exists keeps
/// its original position and replaces the value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PropertyMap(IndexMap<String, String>);

impl PropertyMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, property: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(property, value);
        self
    }

    pub fn insert(&mut self, property: impl Into<String>, value: impl Into<String>) {
        self.0.insert(property.into(), value.into());
    }

    pub fn get(&self, property: &str) -> Option<&str> {
        self.0.get(property).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Parses `"display:flex; gap: 1rem"`. Entries without a `:` or with an
    /// empty side are skipped.
    pub fn parse(declarations: &str) -> Self {
        let mut map = Self::new();
        for decl in coral_core::split_top_level(declarations, ';') {
            let Some((name, value)) = decl.split_once(':') else {
                continue;
            };
            let (name, value) = (name.trim(), value.trim());
            if name.is_empty() || value.is_empty() {
                continue;
            }
            map.insert(name, value);
        }
        map
    }

    /// Appends `!important` to every value that does not already carry it.
    pub fn important(&self) -> Self {
        Self(
            self.0
                .iter()
                .map(|(k, v)| {
                    let value = if v.ends_with("!important") {
                        v.clone()
                    } else {
                        format!("{} !important", v)
                    };
                    (k.clone(), value)
                })
                .collect(),
        )
    }

    /// Stable text form, used as part of the dedup key.
    pub fn canonical_key(&self) -> String {
        let mut key = String::new();
        for (name, value) in &self.0 {
            key.push_str(name);
            key.push(':');
            key.push_str(value);
            key.push(';');
        }
        key
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PropertyMap {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut map = Self::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl fmt::Display for PropertyMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical_key())
    }
}
