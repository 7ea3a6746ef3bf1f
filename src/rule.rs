use std::fmt;
use std::sync::Arc;

use crate::error::{CoralError, Result};
use crate::matcher::{Captures, MatchTable, Matchable, Matcher};
use crate::properties::PropertyMap;
use crate::theme::Theme;

/// Produces declarations from regex captures. Returning `None` (or an empty
/// map) means "recognized, but no valid value": the class emits nothing.
pub type RuleHandler = Arc<dyn Fn(&Captures<'_>, &Theme) -> Option<PropertyMap> + Send + Sync>;

#[derive(Clone)]
pub enum RuleBody {
    Static(PropertyMap),
    Dynamic(RuleHandler),
}

impl fmt::Debug for RuleBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleBody::Static(properties) => f.debug_tuple("Static").field(properties).finish(),
            RuleBody::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Rule {
    pub name: String,
    pub matcher: Matcher,
    pub body: RuleBody,
}

impl Rule {
    pub fn new(name: impl Into<String>, matcher: Matcher, body: RuleBody) -> Self {
        Self {
            name: name.into(),
            matcher,
            body,
        }
    }

    /// A static rule matched by its own name, e.g. `popover-auto`.
    pub fn fixed(name: impl Into<String>, properties: PropertyMap) -> Self {
        let name = name.into();
        Self::new(
            name.clone(),
            Matcher::Exact(name),
            RuleBody::Static(properties),
        )
    }

    /// A dynamic rule matched by an (anchored) regex.
    pub fn pattern<F>(name: impl Into<String>, source: &str, handler: F) -> Result<Self>
    where
        F: Fn(&Captures<'_>, &Theme) -> Option<PropertyMap> + Send + Sync + 'static,
    {
        let name = name.into();
        let matcher = Matcher::pattern(source)
            .map_err(|err| CoralError::invalid_rule(&name, err.to_string()))?;
        Ok(Self::new(name, matcher, RuleBody::Dynamic(Arc::new(handler))))
    }

    pub fn apply(&self, captures: &Captures<'_>, theme: &Theme) -> Option<PropertyMap> {
        let properties = match &self.body {
            RuleBody::Static(properties) => properties.clone(),
            RuleBody::Dynamic(handler) => handler(captures, theme)?,
        };
        (!properties.is_empty()).then_some(properties)
    }
}

impl Matchable for Rule {
    fn matcher(&self) -> &Matcher {
        &self.matcher
    }
}

#[derive(Debug)]
pub struct RuleMatch<'r, 't> {
    pub rule: &'r Rule,
    pub captures: Captures<'t>,
}

impl RuleMatch<'_, '_> {
    pub fn properties(&self, theme: &Theme) -> Option<PropertyMap> {
        self.rule.apply(&self.captures, theme)
    }
}

#[derive(Debug, Clone, Default)]
pub struct RuleRegistry {
    table: MatchTable<Rule>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, rule: Rule) -> Result<()> {
        if rule.name.trim().is_empty() {
            return Err(CoralError::invalid_rule(&rule.name, "rule name is empty"));
        }
        if matches!(&rule.matcher, Matcher::Exact(value) if value.is_empty()) {
            return Err(CoralError::invalid_rule(&rule.name, "exact pattern is empty"));
        }
        self.table.insert(rule);
        Ok(())
    }

    pub fn find<'t>(&self, utility: &'t str) -> Option<RuleMatch<'_, 't>> {
        self.table
            .find(utility)
            .map(|(rule, captures)| RuleMatch { rule, captures })
    }

    pub fn resolve(&self, utility: &str, theme: &Theme) -> Option<PropertyMap> {
        self.find(utility)?.properties(theme)
    }

    pub fn named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Rule> + 'a {
        self.table.iter().filter(move |rule| rule.name == name)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}
