use serde::Deserialize;
use std::collections::BTreeMap;

use crate::error::{CoralError, Result};

/// A design token: a CSS value or a nested table of tokens.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ThemeValue {
    String(String),
    Number(f64),
    Table(BTreeMap<String, ThemeValue>),
}

impl ThemeValue {
    /// Renders a scalar token as CSS text. Tables have no CSS form.
    pub fn to_css_value(&self) -> Option<String> {
        match self {
            ThemeValue::String(value) => Some(value.clone()),
            ThemeValue::Number(value) => Some(format_number(*value)),
            ThemeValue::Table(_) => None,
        }
    }

    pub fn as_table(&self) -> Option<&BTreeMap<String, ThemeValue>> {
        match self {
            ThemeValue::Table(table) => Some(table),
            _ => None,
        }
    }
}

impl From<&str> for ThemeValue {
    fn from(value: &str) -> Self {
        ThemeValue::String(value.to_string())
    }
}

impl From<f64> for ThemeValue {
    fn from(value: f64) -> Self {
        ThemeValue::Number(value)
    }
}

fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// A partial theme, deep-merged into a [`Theme`] by [`Theme::extend`].
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(transparent)]
pub struct ThemeFragment(pub BTreeMap<String, ThemeValue>);

impl ThemeFragment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|err| CoralError::Theme {
            message: format!("failed to parse theme fragment: {}", err),
        })
    }

    /// Adds one token, creating the category table when needed.
    pub fn with(mut self, category: &str, key: &str, value: impl Into<ThemeValue>) -> Self {
        let entry = self
            .0
            .entry(category.to_string())
            .or_insert_with(|| ThemeValue::Table(BTreeMap::new()));
        match entry {
            ThemeValue::Table(table) => {
                table.insert(key.to_string(), value.into());
            }
            other => {
                let mut table = BTreeMap::new();
                table.insert(key.to_string(), value.into());
                *other = ThemeValue::Table(table);
            }
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Category name -> token tables. Mutated only through [`Theme::extend`]
/// during setup; read-only while generating.
#[derive(Debug, Clone, PartialEq)]
pub struct Theme {
    tables: BTreeMap<String, ThemeValue>,
}

impl Theme {
    pub fn empty() -> Self {
        Self {
            tables: BTreeMap::new(),
        }
    }

    /// Deep-merges `fragment`: tables merge key by key, anything else is
    /// replaced. Later merges win.
    pub fn extend(&mut self, fragment: ThemeFragment) {
        for (key, value) in fragment.0 {
            match self.tables.get_mut(&key) {
                Some(existing) => merge_value(existing, value),
                None => {
                    self.tables.insert(key, value);
                }
            }
        }
    }

    pub fn value(&self, path: &[&str]) -> Option<&ThemeValue> {
        let (first, rest) = path.split_first()?;
        let mut current = self.tables.get(*first)?;
        for segment in rest {
            current = current.as_table()?.get(*segment)?;
        }
        Some(current)
    }

    /// Dotted-path access, e.g. `lookup("colors.red.500")`.
    pub fn lookup(&self, path: &str) -> Option<String> {
        let segments = path.split('.').collect::<Vec<_>>();
        self.value(&segments)?.to_css_value()
    }

    pub fn get(&self, category: &str, key: &str) -> Option<String> {
        self.value(&[category, key])?.to_css_value()
    }

    /// Resolves a dashed token against a category, descending into nested
    /// tables: `resolve("colors", "red-500")` finds `colors.red.500`.
    pub fn resolve(&self, category: &str, token: &str) -> Option<String> {
        let table = self.tables.get(category)?.as_table()?;
        resolve_in_table(table, token)
    }

    /// Scalar tokens of one category, in key order.
    pub fn category(&self, name: &str) -> Vec<(&str, String)> {
        self.tables
            .get(name)
            .and_then(ThemeValue::as_table)
            .map(|table| {
                table
                    .iter()
                    .filter_map(|(key, value)| Some((key.as_str(), value.to_css_value()?)))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }
}

impl Default for Theme {
    fn default() -> Self {
        let mut theme = Theme::empty();
        theme.extend(default_fragment());
        theme
    }
}

fn resolve_in_table(table: &BTreeMap<String, ThemeValue>, token: &str) -> Option<String> {
    if let Some(value) = table.get(token) {
        return value.to_css_value();
    }

    for (idx, ch) in token.char_indices().rev() {
        if ch != '-' {
            continue;
        }
        let (head, tail) = (&token[..idx], &token[idx + 1..]);
        if let Some(nested) = table.get(head).and_then(ThemeValue::as_table) {
            if let Some(value) = resolve_in_table(nested, tail) {
                return Some(value);
            }
        }
    }
    None
}

fn merge_value(target: &mut ThemeValue, incoming: ThemeValue) {
    match (target, incoming) {
        (ThemeValue::Table(existing), ThemeValue::Table(incoming)) => {
            for (key, value) in incoming {
                match existing.get_mut(&key) {
                    Some(slot) => merge_value(slot, value),
                    None => {
                        existing.insert(key, value);
                    }
                }
            }
        }
        (slot, incoming) => *slot = incoming,
    }
}

fn table(entries: &[(&str, &str)]) -> ThemeValue {
    ThemeValue::Table(
        entries
            .iter()
            .map(|(key, value)| (key.to_string(), ThemeValue::from(*value)))
            .collect(),
    )
}

fn default_fragment() -> ThemeFragment {
    let mut tables = BTreeMap::new();
    tables.insert(
        "screens".to_string(),
        table(&[
            ("sm", "40rem"),
            ("md", "48rem"),
            ("lg", "64rem"),
            ("xl", "80rem"),
            ("2xl", "96rem"),
        ]),
    );
    tables.insert(
        "containers".to_string(),
        table(&[
            ("3xs", "16rem"),
            ("2xs", "18rem"),
            ("xs", "20rem"),
            ("sm", "24rem"),
            ("md", "28rem"),
            ("lg", "32rem"),
            ("xl", "36rem"),
            ("2xl", "42rem"),
            ("3xl", "48rem"),
            ("4xl", "56rem"),
            ("5xl", "64rem"),
            ("6xl", "72rem"),
            ("7xl", "80rem"),
        ]),
    );
    tables.insert("spacing".to_string(), default_spacing());

    let mut colors = BTreeMap::new();
    colors.insert("black".to_string(), ThemeValue::from("#000"));
    colors.insert("white".to_string(), ThemeValue::from("#fff"));
    colors.insert("transparent".to_string(), ThemeValue::from("transparent"));
    colors.insert("current".to_string(), ThemeValue::from("currentColor"));
    colors.insert(
        "gray".to_string(),
        table(&[
            ("100", "#f3f4f6"),
            ("500", "#6b7280"),
            ("800", "#1f2937"),
            ("900", "#111827"),
        ]),
    );
    colors.insert(
        "red".to_string(),
        table(&[
            ("100", "#fee2e2"),
            ("500", "#ef4444"),
            ("600", "#dc2626"),
            ("900", "#7f1d1d"),
        ]),
    );
    colors.insert(
        "blue".to_string(),
        table(&[
            ("100", "#dbeafe"),
            ("500", "#3b82f6"),
            ("600", "#2563eb"),
            ("900", "#1e3a8a"),
        ]),
    );
    tables.insert("colors".to_string(), ThemeValue::Table(colors));

    ThemeFragment(tables)
}

fn default_spacing() -> ThemeValue {
    let mut spacing = BTreeMap::new();
    spacing.insert("px".to_string(), ThemeValue::from("1px"));
    spacing.insert("0".to_string(), ThemeValue::from("0px"));
    let steps = [
        0.5, 1.0, 1.5, 2.0, 2.5, 3.0, 3.5, 4.0, 5.0, 6.0, 8.0, 10.0, 12.0, 16.0, 20.0, 24.0, 32.0,
        40.0, 48.0, 64.0,
    ];
    for step in steps {
        spacing.insert(
            format_number(step),
            ThemeValue::String(format!("{}rem", format_number(step * 0.25))),
        );
    }
    ThemeValue::Table(spacing)
}

#[cfg(test)]
mod tests {
    use super::{Theme, ThemeFragment, ThemeValue};

    #[test]
    fn default_theme_has_breakpoints_and_spacing() {
        let theme = Theme::default();
        assert_eq!(theme.get("screens", "md").as_deref(), Some("48rem"));
        assert_eq!(theme.get("containers", "sm").as_deref(), Some("24rem"));
        assert_eq!(theme.get("spacing", "4").as_deref(), Some("1rem"));
        assert_eq!(theme.get("spacing", "0.5").as_deref(), Some("0.125rem"));
        assert_eq!(theme.get("spacing", "px").as_deref(), Some("1px"));
    }

    #[test]
    fn resolves_nested_color_tokens() {
        let theme = Theme::default();
        assert_eq!(theme.resolve("colors", "red-500").as_deref(), Some("#ef4444"));
        assert_eq!(theme.resolve("colors", "white").as_deref(), Some("#fff"));
        assert_eq!(theme.resolve("colors", "red-550"), None);
        assert_eq!(theme.resolve("colors", "red"), None);
        assert_eq!(theme.resolve("nope", "red-500"), None);
        assert_eq!(theme.lookup("colors.red.500").as_deref(), Some("#ef4444"));
        assert_eq!(theme.lookup("colors.red"), None);
    }

    #[test]
    fn extend_deep_merges_and_later_wins() {
        let mut theme = Theme::default();
        theme.extend(
            ThemeFragment::new()
                .with("screens", "md", "50rem")
                .with("screens", "3xl", "120rem"),
        );
        assert_eq!(theme.get("screens", "md").as_deref(), Some("50rem"));
        assert_eq!(theme.get("screens", "3xl").as_deref(), Some("120rem"));
        assert_eq!(theme.get("screens", "sm").as_deref(), Some("40rem"));
        assert_eq!(theme.resolve("colors", "red-500").as_deref(), Some("#ef4444"));
    }

    #[test]
    fn extend_merges_nested_tables() {
        let mut theme = Theme::default();
        let fragment = ThemeFragment::from_toml_str(
            r##"
[colors.red]
500 = "#ff0000"

[colors.brand]
primary = "#123456"

[opacity]
50 = 0.5
100 = 1
"##,
        )
        .expect("fragment should parse");
        theme.extend(fragment);

        assert_eq!(theme.resolve("colors", "red-500").as_deref(), Some("#ff0000"));
        assert_eq!(theme.resolve("colors", "red-600").as_deref(), Some("#dc2626"));
        assert_eq!(theme.resolve("colors", "brand-primary").as_deref(), Some("#123456"));
        assert_eq!(theme.get("opacity", "50").as_deref(), Some("0.5"));
        assert_eq!(theme.get("opacity", "100").as_deref(), Some("1"));
    }

    #[test]
    fn scalar_replaces_table() {
        let mut theme = Theme::default();
        theme.extend(ThemeFragment::new().with("colors", "red", "#f00"));
        assert_eq!(theme.resolve("colors", "red").as_deref(), Some("#f00"));
        assert_eq!(theme.resolve("colors", "red-500"), None);
        assert!(matches!(
            theme.value(&["colors", "red"]),
            Some(ThemeValue::String(_))
        ));
    }

    #[test]
    fn rejects_malformed_fragment() {
        assert!(ThemeFragment::from_toml_str("colors = [").is_err());
    }
}
