use tracing::debug;

use super::{pseudo_class, PSEUDO_CLASSES};
use crate::config::{DarkMode, DEFAULT_DARK_SELECTOR};
use crate::error::Result;
use crate::plugin::{Plugin, PluginContext};
use crate::variant::{expand_template, Variant, Wrapper};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantsPreset {
    dark_mode: DarkMode,
    dark_selector: String,
}

impl VariantsPreset {
    pub const NAME: &'static str = "preset-variants";

    pub fn new(dark_mode: DarkMode) -> Self {
        Self {
            dark_mode,
            dark_selector: DEFAULT_DARK_SELECTOR.to_string(),
        }
    }

    pub fn with_dark_selector(mut self, selector: impl Into<String>) -> Self {
        self.dark_selector = selector.into();
        self
    }
}

impl Plugin for VariantsPreset {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn install(&self, ctx: &mut PluginContext<'_>) -> Result<()> {
        ctx.add_variants(pseudo_variants())?;
        ctx.add_variants(relational_variants()?)?;
        ctx.add_variants(attribute_variants()?)?;
        ctx.add_variants(media_variants())?;
        ctx.add_variants(dark_variants(self.dark_mode, &self.dark_selector))?;
        // Bare-word patterns go last so the bracketed forms above win.
        ctx.add_variants(responsive_variants()?)?;
        ctx.add_variants(container_variants()?)?;

        debug!(
            screens = ctx.theme().category("screens").len(),
            containers = ctx.theme().category("containers").len(),
            dark_mode = ?self.dark_mode,
            "preset variants installed"
        );
        Ok(())
    }
}

fn pseudo_variants() -> Vec<Variant> {
    let mut variants = PSEUDO_CLASSES
        .iter()
        .filter_map(|name| {
            let pseudo = pseudo_class(name)?;
            Some(Variant::selector(*name, format!("&{}", pseudo)))
        })
        .collect::<Vec<_>>();

    variants.extend([
        Variant::selector("before", "&::before"),
        Variant::selector("after", "&::after"),
        Variant::selector("placeholder", "&::placeholder"),
        Variant::selector("selection", "& *::selection, &::selection"),
        Variant::selector("marker", "& *::marker, &::marker"),
        Variant::selector("file", "&::file-selector-button"),
        Variant::selector("backdrop", "&::backdrop"),
        Variant::selector("first-line", "&::first-line"),
        Variant::selector("first-letter", "&::first-letter"),
        Variant::selector("*", ":is(& > *)"),
        Variant::selector("rtl", "[dir=\"rtl\"] &, &:dir(rtl)"),
        Variant::selector("ltr", "[dir=\"ltr\"] &, &:dir(ltr)"),
    ]);
    variants
}

/// `group-*` and `peer-*`: the state lives on an ancestor or a preceding
/// sibling.
fn relational_variants() -> Result<Vec<Variant>> {
    Ok(vec![
        Variant::pattern_selector(
            "group-has",
            r"(group|peer)-has-\[(.+)\]",
            |selector, captures, _| {
                let inner = captures.arbitrary(2)?;
                let marker = format!(".{}:has({})", captures.get(1)?, inner);
                Some(vec![relate(captures.get(1)?, &marker, selector)])
            },
        )?,
        Variant::pattern_selector(
            "group-arbitrary",
            r"(group|peer)-\[(.+)\]",
            |selector, captures, _| {
                let kind = captures.get(1)?;
                let inner = captures.arbitrary(2)?;
                let marker = if inner.contains('&') {
                    inner.replace('&', &format!(".{}", kind))
                } else {
                    format!(".{}{}", kind, inner)
                };
                Some(vec![relate(kind, &marker, selector)])
            },
        )?,
        Variant::pattern_selector(
            "group",
            r"(group|peer)-([a-z-]+)",
            |selector, captures, _| {
                let kind = captures.get(1)?;
                let pseudo = pseudo_class(captures.get(2)?)?;
                Some(vec![relate(kind, &format!(".{}{}", kind, pseudo), selector)])
            },
        )?,
    ])
}

fn relate(kind: &str, marker: &str, selector: &str) -> String {
    if kind == "peer" {
        format!("{} ~ {}", marker, selector)
    } else {
        format!("{} {}", marker, selector)
    }
}

/// `md`, `max-md`, `min-[600px]`, `max-[600px]`. Named breakpoints are read
/// from the theme's `screens` when a class is generated.
fn responsive_variants() -> Result<Vec<Variant>> {
    Ok(vec![
        Variant::pattern_wrapper("min-arbitrary", r"min-\[(.+)\]", |captures, _| {
            let width = captures.arbitrary(1)?;
            Some(vec![Wrapper::media(format!("(width >= {})", width))])
        })?,
        Variant::pattern_wrapper("max-arbitrary", r"max-\[(.+)\]", |captures, _| {
            let width = captures.arbitrary(1)?;
            Some(vec![Wrapper::media(format!("(width < {})", width))])
        })?,
        Variant::pattern_wrapper("screen", r"(max-)?([a-z0-9]+)", |captures, theme| {
            let width = theme.get("screens", captures.get(2)?)?;
            Some(vec![Wrapper::media(width_query(captures.get(1).is_some(), &width))])
        })?,
    ])
}

fn container_variants() -> Result<Vec<Variant>> {
    Ok(vec![
        Variant::pattern_wrapper("@min-arbitrary", r"@min-\[(.+)\]", |captures, _| {
            let width = captures.arbitrary(1)?;
            Some(vec![Wrapper::container(None, format!("(width >= {})", width))])
        })?,
        Variant::pattern_wrapper("@max-arbitrary", r"@max-\[(.+)\]", |captures, _| {
            let width = captures.arbitrary(1)?;
            Some(vec![Wrapper::container(None, format!("(width < {})", width))])
        })?,
        Variant::pattern_wrapper(
            "@named",
            r"@([a-z0-9]+)/([A-Za-z0-9_-]+)",
            |captures, theme| {
                let width = theme.get("containers", captures.get(1)?)?;
                let name = captures.get(2)?.to_string();
                Some(vec![Wrapper::container(Some(name), format!("(width >= {})", width))])
            },
        )?,
        Variant::pattern_wrapper("@container", r"@(max-)?([a-z0-9]+)", |captures, theme| {
            let width = theme.get("containers", captures.get(2)?)?;
            let query = width_query(captures.get(1).is_some(), &width);
            Some(vec![Wrapper::container(None, query)])
        })?,
    ])
}

fn width_query(max: bool, width: &str) -> String {
    if max {
        format!("(width < {})", width)
    } else {
        format!("(width >= {})", width)
    }
}

fn attribute_variants() -> Result<Vec<Variant>> {
    Ok(vec![
        Variant::pattern_wrapper("supports", r"supports-\[(.+)\]", |captures, _| {
            let query = captures.arbitrary(1)?;
            if query.contains(':') || query.contains('(') {
                Some(vec![Wrapper::supports(query)])
            } else {
                Some(vec![Wrapper::supports(format!("{}: var(--coral)", query))])
            }
        })?,
        Variant::pattern_selector("has", r"has-\[(.+)\]", |selector, captures, _| {
            Some(vec![format!("{}:has({})", selector, captures.arbitrary(1)?)])
        })?,
        Variant::pattern_selector("not", r"not-\[(.+)\]", |selector, captures, _| {
            Some(vec![format!("{}:not({})", selector, captures.arbitrary(1)?)])
        })?,
        Variant::pattern_selector("data-arbitrary", r"data-\[(.+)\]", |selector, captures, _| {
            Some(vec![format!("{}[data-{}]", selector, captures.arbitrary(1)?)])
        })?,
        Variant::pattern_selector("data", r"data-([a-z][a-z0-9-]*)", |selector, captures, _| {
            Some(vec![format!("{}[data-{}]", selector, captures.get(1)?)])
        })?,
        Variant::pattern_selector("aria-arbitrary", r"aria-\[(.+)\]", |selector, captures, _| {
            Some(vec![format!("{}[aria-{}]", selector, captures.arbitrary(1)?)])
        })?,
        Variant::pattern_selector(
            "aria",
            r"aria-(busy|checked|disabled|expanded|hidden|pressed|readonly|required|selected)",
            |selector, captures, _| {
                Some(vec![format!("{}[aria-{}=\"true\"]", selector, captures.get(1)?)])
            },
        )?,
        // `[&>*]`, `[.theme-ocean_&]`
        Variant::pattern_selector("arbitrary", r"\[(.+)\]", |selector, captures, _| {
            let template = captures.arbitrary(1)?;
            if template.starts_with('@') {
                return None;
            }
            expand_template(&template, selector)
        })?,
    ])
}

fn media_variants() -> Vec<Variant> {
    vec![
        Variant::wrapper("starting", Wrapper::StartingStyle),
        Variant::wrapper("print", Wrapper::media("print")),
        Variant::wrapper("portrait", Wrapper::media("(orientation: portrait)")),
        Variant::wrapper("landscape", Wrapper::media("(orientation: landscape)")),
        Variant::wrapper(
            "motion-safe",
            Wrapper::media("(prefers-reduced-motion: no-preference)"),
        ),
        Variant::wrapper(
            "motion-reduce",
            Wrapper::media("(prefers-reduced-motion: reduce)"),
        ),
        Variant::wrapper("contrast-more", Wrapper::media("(prefers-contrast: more)")),
        Variant::wrapper("contrast-less", Wrapper::media("(prefers-contrast: less)")),
        Variant::wrapper("forced-colors", Wrapper::media("(forced-colors: active)")),
        Variant::wrapper("pointer-fine", Wrapper::media("(pointer: fine)")),
        Variant::wrapper("pointer-coarse", Wrapper::media("(pointer: coarse)")),
    ]
}

fn dark_variants(mode: DarkMode, selector: &str) -> Vec<Variant> {
    let ancestor = format!("{} &", selector);
    match mode {
        DarkMode::Class => vec![
            Variant::selector("dark", ancestor),
            Variant::selector("light", ".light &"),
        ],
        DarkMode::Media => vec![
            Variant::wrapper("dark", Wrapper::media("(prefers-color-scheme: dark)")),
            Variant::wrapper("light", Wrapper::media("(prefers-color-scheme: light)")),
        ],
        DarkMode::Selector => vec![
            Variant::selector("dark", ancestor),
            Variant::selector("light", "[data-theme=\"light\"] &"),
        ],
        DarkMode::Auto => vec![
            Variant::selector("dark", ancestor),
            Variant::wrapper("dark-media", Wrapper::media("(prefers-color-scheme: dark)")),
            Variant::selector("light", ".light &"),
        ],
    }
}
