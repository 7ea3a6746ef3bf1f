use std::fmt;
use std::sync::Arc;

use coral_core::split_top_level;

use crate::error::{CoralError, Result};
use crate::matcher::{Captures, MatchTable, Matchable, Matcher};
use crate::theme::Theme;

/// Comma alternates of one selector, kept apart so each alternate can be
/// transformed on its own by later variants.
pub type SelectorList = Vec<String>;

pub type SelectorHandler =
    Arc<dyn Fn(&str, &Captures<'_>, &Theme) -> Option<SelectorList> + Send + Sync>;

pub type WrapperHandler =
    Arc<dyn Fn(&Captures<'_>, &Theme) -> Option<Vec<Wrapper>> + Send + Sync>;

/// An at-rule shell a variant nests its block inside.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Wrapper {
    Media(String),
    Supports(String),
    Container { name: Option<String>, query: String },
    StartingStyle,
    AtRule(String),
}

impl Wrapper {
    pub fn media(query: impl Into<String>) -> Self {
        Wrapper::Media(query.into())
    }

    /// `display:grid` and `(display:grid)` build the same wrapper.
    pub fn supports(query: impl AsRef<str>) -> Self {
        Wrapper::Supports(normalize_supports_query(query.as_ref()))
    }

    pub fn container(name: Option<String>, query: impl Into<String>) -> Self {
        Wrapper::Container {
            name,
            query: query.into(),
        }
    }

    /// Reads an at-rule prelude such as `@media (hover: hover)`.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw == "@starting-style" {
            return Some(Wrapper::StartingStyle);
        }
        if let Some(query) = raw.strip_prefix("@media") {
            let query = query.trim();
            return (!query.is_empty()).then(|| Wrapper::Media(query.to_string()));
        }
        if let Some(query) = raw.strip_prefix("@supports") {
            let query = query.trim();
            return (!query.is_empty()).then(|| Wrapper::supports(query));
        }
        if let Some(rest) = raw.strip_prefix("@container") {
            let (name, query) = parse_container_prelude(rest.trim())?;
            return Some(Wrapper::Container { name, query });
        }
        if raw.starts_with('@') && raw.len() > 1 {
            return Some(Wrapper::AtRule(raw.to_string()));
        }
        None
    }

    pub fn header(&self) -> String {
        match self {
            Wrapper::Media(query) => format!("@media {}", query),
            Wrapper::Supports(query) => format!("@supports {}", normalize_supports_query(query)),
            Wrapper::Container {
                name: Some(name),
                query,
            } => format!("@container {} {}", name, query),
            Wrapper::Container { name: None, query } => format!("@container {}", query),
            Wrapper::StartingStyle => "@starting-style".to_string(),
            Wrapper::AtRule(raw) => raw.trim().to_string(),
        }
    }
}

impl fmt::Display for Wrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.header())
    }
}

fn parse_container_prelude(raw: &str) -> Option<(Option<String>, String)> {
    if raw.is_empty() {
        return None;
    }

    if raw.starts_with('(') {
        return Some((None, raw.to_string()));
    }

    let (name, query) = raw.split_once(char::is_whitespace)?;
    let name = name.trim();
    let query = query.trim();
    if name.is_empty() || query.is_empty() || !query.starts_with('(') {
        return None;
    }
    Some((Some(name.to_string()), query.to_string()))
}

fn normalize_supports_query(query: &str) -> String {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return "()".to_string();
    }
    if (trimmed.starts_with('(') && trimmed.ends_with(')'))
        || trimmed.starts_with("not ")
        || trimmed.starts_with("selector(")
    {
        return trimmed.to_string();
    }
    format!("({})", trimmed)
}

#[derive(Clone)]
pub enum SelectorTransform {
    /// `&` stands for the incoming selector; a comma list fans out.
    Template(String),
    Dynamic(SelectorHandler),
}

impl SelectorTransform {
    pub fn apply(
        &self,
        selector: &str,
        captures: &Captures<'_>,
        theme: &Theme,
    ) -> Option<SelectorList> {
        let list = match self {
            SelectorTransform::Template(template) => expand_template(template, selector)?,
            SelectorTransform::Dynamic(handler) => handler(selector, captures, theme)?,
        };
        (!list.is_empty()).then_some(list)
    }
}

impl fmt::Debug for SelectorTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectorTransform::Template(template) => {
                f.debug_tuple("Template").field(template).finish()
            }
            SelectorTransform::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

/// Substitutes `selector` into each comma alternate of `template`. An
/// alternate without `&` is read as an ancestor: `.dark` -> `.dark <sel>`.
pub fn expand_template(template: &str, selector: &str) -> Option<SelectorList> {
    let alternates = split_top_level(template, ',');
    if alternates.is_empty() {
        return None;
    }
    Some(
        alternates
            .into_iter()
            .map(|alternate| {
                if alternate.contains('&') {
                    alternate.replace('&', selector)
                } else {
                    format!("{} {}", alternate, selector)
                }
            })
            .collect(),
    )
}

#[derive(Clone)]
pub enum WrapperSpec {
    Static(Vec<Wrapper>),
    Dynamic(WrapperHandler),
}

impl WrapperSpec {
    pub fn apply(&self, captures: &Captures<'_>, theme: &Theme) -> Option<Vec<Wrapper>> {
        match self {
            WrapperSpec::Static(wrappers) => Some(wrappers.clone()),
            WrapperSpec::Dynamic(handler) => handler(captures, theme),
        }
    }
}

impl fmt::Debug for WrapperSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WrapperSpec::Static(wrappers) => f.debug_tuple("Static").field(wrappers).finish(),
            WrapperSpec::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

#[derive(Debug, Clone)]
pub enum VariantKind {
    Selector(SelectorTransform),
    Wrapper(WrapperSpec),
    Both {
        selector: SelectorTransform,
        wrapper: WrapperSpec,
    },
}

#[derive(Debug, Clone)]
pub struct Variant {
    pub name: String,
    pub matcher: Matcher,
    pub kind: VariantKind,
}

/// What one variant contributes: the rewritten alternates and the wrappers
/// to push onto the stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantOutcome {
    pub selectors: SelectorList,
    pub wrappers: Vec<Wrapper>,
}

impl Variant {
    pub fn new(name: impl Into<String>, matcher: Matcher, kind: VariantKind) -> Self {
        Self {
            name: name.into(),
            matcher,
            kind,
        }
    }

    /// `hover` -> `&:hover` style variant matched by its name.
    pub fn selector(name: impl Into<String>, template: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(
            name.clone(),
            Matcher::Exact(name),
            VariantKind::Selector(SelectorTransform::Template(template.into())),
        )
    }

    /// `md` -> `@media (width >= 48rem)` style variant matched by its name.
    pub fn wrapper(name: impl Into<String>, wrapper: Wrapper) -> Self {
        let name = name.into();
        Self::new(
            name.clone(),
            Matcher::Exact(name),
            VariantKind::Wrapper(WrapperSpec::Static(vec![wrapper])),
        )
    }

    pub fn both(name: impl Into<String>, template: impl Into<String>, wrapper: Wrapper) -> Self {
        let name = name.into();
        Self::new(
            name.clone(),
            Matcher::Exact(name),
            VariantKind::Both {
                selector: SelectorTransform::Template(template.into()),
                wrapper: WrapperSpec::Static(vec![wrapper]),
            },
        )
    }

    pub fn pattern(name: impl Into<String>, source: &str, kind: VariantKind) -> Result<Self> {
        let name = name.into();
        let matcher = Matcher::pattern(source)
            .map_err(|err| CoralError::invalid_variant(&name, err.to_string()))?;
        Ok(Self::new(name, matcher, kind))
    }

    pub fn pattern_selector<F>(name: impl Into<String>, source: &str, handler: F) -> Result<Self>
    where
        F: Fn(&str, &Captures<'_>, &Theme) -> Option<SelectorList> + Send + Sync + 'static,
    {
        Self::pattern(
            name,
            source,
            VariantKind::Selector(SelectorTransform::Dynamic(Arc::new(handler))),
        )
    }

    pub fn pattern_wrapper<F>(name: impl Into<String>, source: &str, handler: F) -> Result<Self>
    where
        F: Fn(&Captures<'_>, &Theme) -> Option<Vec<Wrapper>> + Send + Sync + 'static,
    {
        Self::pattern(
            name,
            source,
            VariantKind::Wrapper(WrapperSpec::Dynamic(Arc::new(handler))),
        )
    }

    /// Applies this variant to every alternate. `None` means the variant
    /// recognized its segment but rejected it (e.g. `has-[]`), which
    /// suppresses the whole class.
    pub fn apply(
        &self,
        selectors: &[String],
        captures: &Captures<'_>,
        theme: &Theme,
    ) -> Option<VariantOutcome> {
        let (transform, wrapper) = match &self.kind {
            VariantKind::Selector(transform) => (Some(transform), None),
            VariantKind::Wrapper(wrapper) => (None, Some(wrapper)),
            VariantKind::Both { selector, wrapper } => (Some(selector), Some(wrapper)),
        };

        let selectors = match transform {
            Some(transform) => {
                let mut out = Vec::with_capacity(selectors.len());
                for selector in selectors {
                    out.extend(transform.apply(selector, captures, theme)?);
                }
                out
            }
            None => selectors.to_vec(),
        };

        let wrappers = match wrapper {
            Some(spec) => spec.apply(captures, theme)?,
            None => Vec::new(),
        };

        Some(VariantOutcome {
            selectors,
            wrappers,
        })
    }
}

impl Matchable for Variant {
    fn matcher(&self) -> &Matcher {
        &self.matcher
    }
}

#[derive(Debug, Clone, Default)]
pub struct VariantRegistry {
    table: MatchTable<Variant>,
}

impl VariantRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, variant: Variant) -> Result<()> {
        if variant.name.trim().is_empty() {
            return Err(CoralError::invalid_variant(&variant.name, "variant name is empty"));
        }
        if matches!(&variant.matcher, Matcher::Exact(value) if value.is_empty()) {
            return Err(CoralError::invalid_variant(&variant.name, "exact match is empty"));
        }
        self.table.insert(variant);
        Ok(())
    }

    pub fn find<'t>(&self, segment: &'t str) -> Option<(&Variant, Captures<'t>)> {
        self.table.find(segment)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

/// A variant declared as text, e.g. `@media (hover: hover) { &:hover }`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantTemplate {
    pub wrappers: Vec<Wrapper>,
    pub selector: Option<String>,
}

impl VariantTemplate {
    /// Parses nested at-rule/selector blocks. The innermost body is either a
    /// selector expression or `@slot`; a template with no block at all is a
    /// plain selector template or a single at-rule.
    pub fn parse(template: &str) -> Option<Self> {
        let normalized = coral_core::normalize_arbitrary_value(template.trim());
        parse_template_node(normalized.trim())
    }

    pub fn into_kind(self) -> VariantKind {
        let has_wrappers = !self.wrappers.is_empty();
        let wrapper = WrapperSpec::Static(self.wrappers);
        match self.selector {
            Some(selector) if has_wrappers => VariantKind::Both {
                selector: SelectorTransform::Template(selector),
                wrapper,
            },
            Some(selector) => VariantKind::Selector(SelectorTransform::Template(selector)),
            None => VariantKind::Wrapper(wrapper),
        }
    }
}

fn parse_template_node(raw: &str) -> Option<VariantTemplate> {
    let trimmed = raw.trim().trim_end_matches(';').trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed == "@slot" || trimmed == "&" {
        return Some(VariantTemplate {
            wrappers: Vec::new(),
            selector: None,
        });
    }

    let Some(open_idx) = trimmed.find('{') else {
        if trimmed.starts_with('@') {
            return Some(VariantTemplate {
                wrappers: vec![Wrapper::parse(trimmed)?],
                selector: None,
            });
        }
        return Some(VariantTemplate {
            wrappers: Vec::new(),
            selector: Some(trimmed.to_string()),
        });
    };

    let close_idx = find_matching_brace(trimmed, open_idx)?;
    let head = trimmed[..open_idx].trim();
    let body = trimmed[open_idx + 1..close_idx].trim();
    if head.is_empty() || body.is_empty() {
        return None;
    }

    let mut inner = parse_template_node(body)?;
    if head.starts_with('@') {
        inner.wrappers.insert(0, Wrapper::parse(head)?);
        return Some(inner);
    }

    inner.selector = Some(match inner.selector {
        Some(selector) => compose_nested_selector(head, &selector),
        None => head.to_string(),
    });
    Some(inner)
}

fn compose_nested_selector(outer: &str, inner: &str) -> String {
    if inner.contains('&') {
        return inner.replace('&', outer);
    }
    if outer.contains('&') {
        return outer.replace('&', inner);
    }
    format!("{} {}", outer, inner)
}

fn find_matching_brace(text: &str, open_idx: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (idx, ch) in text[open_idx..].char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(open_idx + idx);
                }
            }
            _ => {}
        }
    }
    None
}
