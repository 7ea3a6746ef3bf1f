use coral_core::parse_class;
use tracing::trace;

use crate::matcher::Captures;
use crate::plugin::Registry;
use crate::properties::PropertyMap;
use crate::rule::RuleMatch;
use crate::theme::Theme;
use crate::variant::{SelectorList, Variant, Wrapper};

#[derive(Debug)]
pub struct VariantMatch<'r, 't> {
    pub variant: &'r Variant,
    pub captures: Captures<'t>,
}

/// One class token matched against the registries. Lives only for the
/// duration of a generate call.
#[derive(Debug)]
pub struct ResolvedUtility<'r, 't> {
    pub raw: &'t str,
    pub important: bool,
    /// In class-name order, leftmost first.
    pub variant_chain: Vec<VariantMatch<'r, 't>>,
    pub base: RuleMatch<'r, 't>,
}

/// Final CSS for one class: wrapper stack (outermost first), selector
/// alternates, declarations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedBlock {
    pub wrappers: Vec<Wrapper>,
    pub selectors: SelectorList,
    pub properties: PropertyMap,
}

/// Matches the base utility and every variant segment. Any unmatched
/// segment drops the class.
pub fn resolve<'r, 't>(registry: &'r Registry, raw: &'t str) -> Option<ResolvedUtility<'r, 't>> {
    let Some(parsed) = parse_class(raw) else {
        trace!(class = raw, "dropped: no segments");
        return None;
    };
    for diagnostic in &parsed.diagnostics {
        trace!(
            class = raw,
            start = diagnostic.start,
            end = diagnostic.end,
            "{}",
            diagnostic.message
        );
    }

    let Some(base) = registry.rules.find(parsed.utility) else {
        trace!(class = raw, utility = parsed.utility, "dropped: unknown utility");
        return None;
    };

    let mut variant_chain = Vec::with_capacity(parsed.variants.len());
    for &segment in &parsed.variants {
        let Some((variant, captures)) = registry.variants.find(segment) else {
            trace!(class = raw, variant = segment, "dropped: unknown variant");
            return None;
        };
        variant_chain.push(VariantMatch { variant, captures });
    }

    Some(ResolvedUtility {
        raw,
        important: parsed.important,
        variant_chain,
        base,
    })
}

impl ResolvedUtility<'_, '_> {
    /// Runs the handlers. Selector rewriting starts at the variant nearest
    /// the base utility and moves outwards; wrappers stack in class-name
    /// order, so the leftmost variant becomes the outermost at-rule.
    ///
    /// `prefix` is prepended to the class name in the selector only; the
    /// class is matched without it.
    pub fn render(&self, theme: &Theme, prefix: &str) -> Option<ResolvedBlock> {
        let Some(properties) = self.base.properties(theme) else {
            trace!(class = self.raw, "dropped: rule produced no declarations");
            return None;
        };
        let properties = if self.important {
            properties.important()
        } else {
            properties
        };

        let class = format!("{}{}", prefix, self.raw);
        let mut selectors = vec![format!(".{}", escape_selector(&class))];
        let mut outcomes = Vec::with_capacity(self.variant_chain.len());
        for matched in self.variant_chain.iter().rev() {
            let Some(outcome) = matched
                .variant
                .apply(&selectors, &matched.captures, theme)
            else {
                trace!(
                    class = self.raw,
                    variant = matched.variant.name.as_str(),
                    "dropped: variant rejected its segment"
                );
                return None;
            };
            selectors = outcome.selectors;
            outcomes.push(outcome.wrappers);
        }

        let wrappers = outcomes.into_iter().rev().flatten().collect();

        Some(ResolvedBlock {
            wrappers,
            selectors,
            properties,
        })
    }
}

/// Resolve and render in one step.
pub fn resolve_block(registry: &Registry, raw: &str) -> Option<ResolvedBlock> {
    resolve_prefixed_block(registry, raw, "")
}

pub fn resolve_prefixed_block(
    registry: &Registry,
    raw: &str,
    prefix: &str,
) -> Option<ResolvedBlock> {
    resolve(registry, raw)?.render(&registry.theme, prefix)
}

pub fn escape_selector(class: &str) -> String {
    let mut escaped = String::with_capacity(class.len() * 2);

    for (idx, ch) in class.chars().enumerate() {
        match ch {
            '\\' => escaped.push_str("\\\\"),
            ':' => escaped.push_str("\\:"),
            '/' => escaped.push_str("\\/"),
            '[' => escaped.push_str("\\["),
            ']' => escaped.push_str("\\]"),
            '(' => escaped.push_str("\\("),
            ')' => escaped.push_str("\\)"),
            '{' => escaped.push_str("\\{"),
            '}' => escaped.push_str("\\}"),
            '&' => escaped.push_str("\\&"),
            '>' => escaped.push_str("\\>"),
            '<' => escaped.push_str("\\<"),
            '+' => escaped.push_str("\\+"),
            '~' => escaped.push_str("\\~"),
            ',' => escaped.push_str("\\,"),
            '%' => escaped.push_str("\\%"),
            '=' => escaped.push_str("\\="),
            '!' => escaped.push_str("\\!"),
            '*' => escaped.push_str("\\*"),
            '@' => escaped.push_str("\\@"),
            '#' => escaped.push_str("\\#"),
            '$' => escaped.push_str("\\$"),
            '^' => escaped.push_str("\\^"),
            '|' => escaped.push_str("\\|"),
            '?' => escaped.push_str("\\?"),
            ';' => escaped.push_str("\\;"),
            '\'' => escaped.push_str("\\'"),
            '"' => escaped.push_str("\\\""),
            '.' => escaped.push_str("\\."),
            ' ' => escaped.push_str("\\ "),
            '0'..='9' if idx == 0 => {
                escaped.push_str(&format!("\\3{} ", ch));
            }
            _ => escaped.push(ch),
        }
    }

    escaped
}
