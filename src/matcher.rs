use regex::Regex;
use std::collections::HashMap;

/// How a rule or variant recognizes its segment.
#[derive(Debug, Clone)]
pub enum Matcher {
    Exact(String),
    Pattern(Regex),
}

impl Matcher {
    pub fn exact(value: impl Into<String>) -> Self {
        Matcher::Exact(value.into())
    }

    /// Compiles `source` anchored at both ends, so `p-(\d+)` never matches
    /// inside `sp-4x`.
    pub fn pattern(source: &str) -> Result<Self, regex::Error> {
        Regex::new(&anchor_pattern(source)).map(Matcher::Pattern)
    }

    pub fn matches<'t>(&self, input: &'t str) -> Option<Captures<'t>> {
        match self {
            Matcher::Exact(value) => (value == input).then(|| Captures::whole(input)),
            Matcher::Pattern(regex) => regex.captures(input).map(|groups| Captures {
                input,
                groups: Some(groups),
            }),
        }
    }
}

fn anchor_pattern(source: &str) -> String {
    let inner = source.strip_prefix('^').unwrap_or(source);
    let inner = match inner.strip_suffix('$') {
        Some(stripped) if !stripped.ends_with('\\') => stripped,
        _ => inner,
    };
    format!("^(?:{})$", inner)
}

/// Capture groups handed to rule and variant handlers. Group 0 is always the
/// whole segment, also for exact matches.
#[derive(Debug)]
pub struct Captures<'t> {
    input: &'t str,
    groups: Option<regex::Captures<'t>>,
}

impl<'t> Captures<'t> {
    pub fn whole(input: &'t str) -> Self {
        Self {
            input,
            groups: None,
        }
    }

    pub fn input(&self) -> &'t str {
        self.input
    }

    pub fn get(&self, idx: usize) -> Option<&'t str> {
        if idx == 0 {
            return Some(self.input);
        }
        self.groups
            .as_ref()
            .and_then(|groups| groups.get(idx))
            .map(|m| m.as_str())
    }

    pub fn name(&self, name: &str) -> Option<&'t str> {
        self.groups
            .as_ref()
            .and_then(|groups| groups.name(name))
            .map(|m| m.as_str())
    }

    /// Capture `idx` as an arbitrary value: underscores become spaces, and
    /// an empty or blank payload yields `None`.
    pub fn arbitrary(&self, idx: usize) -> Option<String> {
        let raw = self.get(idx)?;
        let value = coral_core::normalize_arbitrary_value(raw);
        let value = value.trim();
        if value.is_empty() {
            return None;
        }
        Some(value.to_string())
    }

    /// Number of groups including group 0.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.groups.as_ref().map_or(1, regex::Captures::len)
    }
}

pub trait Matchable {
    fn matcher(&self) -> &Matcher;
}

/// Exact-match table plus ordered pattern list.
///
/// Lookup tries the exact table first; a later exact entry for the same
/// string replaces the earlier one. Patterns are then tried in insertion
/// order and the first match wins. Every entry stays stored, so replaced
/// exact entries are still visible through [`MatchTable::iter`].
#[derive(Debug, Clone)]
pub struct MatchTable<T> {
    entries: Vec<T>,
    exact: HashMap<String, usize>,
    patterns: Vec<usize>,
}

impl<T> Default for MatchTable<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            exact: HashMap::new(),
            patterns: Vec::new(),
        }
    }
}

impl<T: Matchable> MatchTable<T> {
    pub fn insert(&mut self, entry: T) {
        let idx = self.entries.len();
        match entry.matcher() {
            Matcher::Exact(value) => {
                self.exact.insert(value.clone(), idx);
            }
            Matcher::Pattern(_) => self.patterns.push(idx),
        }
        self.entries.push(entry);
    }

    pub fn find<'t>(&self, input: &'t str) -> Option<(&T, Captures<'t>)> {
        if let Some(&idx) = self.exact.get(input) {
            return Some((&self.entries[idx], Captures::whole(input)));
        }

        self.patterns.iter().find_map(|&idx| {
            let entry = &self.entries[idx];
            entry.matcher().matches(input).map(|captures| (entry, captures))
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
