use coral_core::{bracket_payload, normalize_arbitrary_value};
use tracing::debug;

use crate::error::Result;
use crate::matcher::Captures;
use crate::plugin::{Plugin, PluginContext};
use crate::properties::PropertyMap;
use crate::rule::Rule;
use crate::theme::Theme;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RulesPreset;

impl RulesPreset {
    pub const NAME: &'static str = "preset-rules";
}

impl Plugin for RulesPreset {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn install(&self, ctx: &mut PluginContext<'_>) -> Result<()> {
        let fixed = fixed_rules();
        let patterns = pattern_rules()?;
        debug!(
            fixed = fixed.len(),
            patterns = patterns.len(),
            "preset rules installed"
        );
        ctx.add_rules(fixed)?;
        ctx.add_rules(patterns)
    }
}

fn fixed_rules() -> Vec<Rule> {
    let mut rules = [
        ("block", "block"),
        ("inline-block", "inline-block"),
        ("inline", "inline"),
        ("flex", "flex"),
        ("inline-flex", "inline-flex"),
        ("grid", "grid"),
        ("inline-grid", "inline-grid"),
        ("flow-root", "flow-root"),
        ("contents", "contents"),
        ("table", "table"),
        ("list-item", "list-item"),
        ("hidden", "none"),
    ]
    .into_iter()
    .map(|(name, value)| Rule::fixed(name, PropertyMap::new().with("display", value)))
    .collect::<Vec<_>>();

    rules.extend([
        Rule::fixed("popover-auto", PropertyMap::new().with("popover", "auto")),
        Rule::fixed("popover-manual", PropertyMap::new().with("popover", "manual")),
        Rule::fixed(
            "container-type-normal",
            PropertyMap::new().with("container-type", "normal"),
        ),
        Rule::fixed(
            "container-type-size",
            PropertyMap::new().with("container-type", "size"),
        ),
        Rule::fixed(
            "container-type-inline-size",
            PropertyMap::new().with("container-type", "inline-size"),
        ),
        Rule::fixed(
            "@container",
            PropertyMap::new().with("container-type", "inline-size"),
        ),
        Rule::fixed("text-left", PropertyMap::new().with("text-align", "left")),
        Rule::fixed("text-center", PropertyMap::new().with("text-align", "center")),
        Rule::fixed("text-right", PropertyMap::new().with("text-align", "right")),
        Rule::fixed("text-justify", PropertyMap::new().with("text-align", "justify")),
    ]);
    rules
}

fn pattern_rules() -> Result<Vec<Rule>> {
    Ok(vec![
        Rule::pattern("@container-named", r"@container/([A-Za-z0-9_-]+)", |captures, _| {
            Some(
                PropertyMap::new()
                    .with("container-type", "inline-size")
                    .with("container-name", captures.get(1)?),
            )
        })?,
        Rule::pattern("container-name", r"container-name-\[(.*)\]", |captures, _| {
            Some(PropertyMap::new().with("container-name", captures.arbitrary(1)?))
        })?,
        Rule::pattern("container", r"container-\[(.*)\]", |captures, _| {
            Some(PropertyMap::new().with("container", captures.arbitrary(1)?))
        })?,
        Rule::pattern("padding", r"(p|px|py|pt|pr|pb|pl|ps|pe)-(.+)", |captures, theme| {
            let value = spacing_value(theme, captures.get(2)?)?;
            Some(sides("padding", captures.get(1)?, &value))
        })?,
        Rule::pattern("margin", r"(-?)(m|mx|my|mt|mr|mb|ml|ms|me)-(.+)", |captures, theme| {
            let token = captures.get(3)?;
            let value = if token == "auto" {
                if is_negative(captures) {
                    return None;
                }
                "auto".to_string()
            } else {
                signed(spacing_value(theme, token)?, is_negative(captures))
            };
            Some(sides("margin", captures.get(2)?, &value))
        })?,
        Rule::pattern("gap", r"gap(-x|-y)?-(.+)", |captures, theme| {
            let value = spacing_value(theme, captures.get(2)?)?;
            let property = match captures.get(1) {
                Some("-x") => "column-gap",
                Some("-y") => "row-gap",
                _ => "gap",
            };
            Some(PropertyMap::new().with(property, value))
        })?,
        Rule::pattern("background", r"bg-(.+)", |captures, theme| {
            let token = captures.get(1)?;
            if let Some(payload) = arbitrary(token) {
                let property = if payload.starts_with("url(") || payload.contains("gradient(") {
                    "background-image"
                } else {
                    "background-color"
                };
                return Some(PropertyMap::new().with(property, payload));
            }
            Some(PropertyMap::new().with("background-color", color_value(theme, token)?))
        })?,
        Rule::pattern("text", r"text-(.+)", |captures, theme| {
            let token = captures.get(1)?;
            if let Some(payload) = arbitrary(token) {
                let property = if looks_like_length(&payload) {
                    "font-size"
                } else {
                    "color"
                };
                return Some(PropertyMap::new().with(property, payload));
            }
            Some(PropertyMap::new().with("color", color_value(theme, token)?))
        })?,
        Rule::pattern("sizing", r"(w|h|size|min-w|max-w|min-h|max-h)-(.+)", |captures, theme| {
            let axis = captures.get(1)?;
            let value = size_value(theme, axis, captures.get(2)?)?;
            let properties = match axis {
                "w" => PropertyMap::new().with("width", value),
                "h" => PropertyMap::new().with("height", value),
                "size" => PropertyMap::new().with("width", value.clone()).with("height", value),
                "min-w" => PropertyMap::new().with("min-width", value),
                "max-w" => PropertyMap::new().with("max-width", value),
                "min-h" => PropertyMap::new().with("min-height", value),
                _ => PropertyMap::new().with("max-height", value),
            };
            Some(properties)
        })?,
        Rule::pattern("translate", r"(-?)translate-(x|y)-(.+)", |captures, theme| {
            let axis = captures.get(2)?;
            let value = translate_value(theme, captures.get(3)?)?;
            Some(
                PropertyMap::new()
                    .with(
                        format!("--coral-translate-{}", axis),
                        signed(value, is_negative(captures)),
                    )
                    .with(
                        "translate",
                        "var(--coral-translate-x, 0) var(--coral-translate-y, 0)",
                    ),
            )
        })?,
        Rule::pattern("starting-opacity", r"starting-opacity-(.+)", |captures, _| {
            let value = ratio_value(captures.get(1)?)?;
            Some(
                PropertyMap::new()
                    .with("--coral-starting-opacity", value)
                    .with("opacity", "var(--coral-starting-opacity)"),
            )
        })?,
        Rule::pattern("starting-scale", r"starting-scale-(.+)", |captures, _| {
            let value = ratio_value(captures.get(1)?)?;
            Some(
                PropertyMap::new()
                    .with("--coral-starting-scale", value)
                    .with("transform", "scale(var(--coral-starting-scale))"),
            )
        })?,
        // `starting--translate-y-full`: the sign sits after the `starting-`
        // prefix.
        Rule::pattern(
            "starting-translate-axis",
            r"starting-(-?)translate-(x|y)-(.+)",
            |captures, theme| {
                let axis = captures.get(2)?;
                let value = translate_value(theme, captures.get(3)?)?;
                Some(
                    PropertyMap::new()
                        .with(
                            format!("--coral-starting-translate-{}", axis),
                            signed(value, is_negative(captures)),
                        )
                        .with(
                            "transform",
                            "translate(var(--coral-starting-translate-x, 0), \
                             var(--coral-starting-translate-y, 0))",
                        ),
                )
            },
        )?,
        Rule::pattern("starting-translate", r"starting-translate-(\[.*\])", |captures, _| {
            Some(
                PropertyMap::new()
                    .with("--coral-starting-translate", arbitrary(captures.get(1)?)?)
                    .with("translate", "var(--coral-starting-translate)"),
            )
        })?,
        // `[mask-type:luminance]`
        Rule::pattern("arbitrary-property", r"\[([a-zA-Z-]+):(.+)\]", |captures, _| {
            Some(PropertyMap::new().with(captures.get(1)?, captures.arbitrary(2)?))
        })?,
    ])
}

fn is_negative(captures: &Captures<'_>) -> bool {
    captures.get(1) == Some("-")
}

fn arbitrary(token: &str) -> Option<String> {
    let payload = normalize_arbitrary_value(bracket_payload(token)?);
    let payload = payload.trim();
    (!payload.is_empty()).then(|| payload.to_string())
}

fn spacing_value(theme: &Theme, token: &str) -> Option<String> {
    if token.starts_with('[') {
        return arbitrary(token);
    }
    theme.get("spacing", token)
}

/// Theme color with an optional `/<percent>` alpha modifier.
fn color_value(theme: &Theme, token: &str) -> Option<String> {
    let (name, alpha) = match token.rsplit_once('/') {
        Some((name, alpha)) if !alpha.is_empty() && alpha.bytes().all(|b| b.is_ascii_digit()) => {
            (name, Some(alpha))
        }
        _ => (token, None),
    };
    let color = theme.resolve("colors", name)?;
    Some(match alpha {
        Some(alpha) => format!("color-mix(in oklab,{} {}%,transparent)", color, alpha),
        None => color,
    })
}

fn size_value(theme: &Theme, axis: &str, token: &str) -> Option<String> {
    if let Some(value) = fraction(token) {
        return Some(value);
    }
    let keyword = match token {
        "full" => "100%",
        "auto" => "auto",
        "min" => "min-content",
        "max" => "max-content",
        "fit" => "fit-content",
        "screen" if axis.ends_with('h') => "100vh",
        "screen" => "100vw",
        _ => return spacing_value(theme, token),
    };
    Some(keyword.to_string())
}

fn translate_value(theme: &Theme, token: &str) -> Option<String> {
    fraction(token)
        .or_else(|| (token == "full").then(|| "100%".to_string()))
        .or_else(|| spacing_value(theme, token))
}

/// `0`..`100` as a unit ratio (`95` -> `0.95`), or an arbitrary payload.
fn ratio_value(token: &str) -> Option<String> {
    if token.starts_with('[') {
        return arbitrary(token);
    }
    let percent = token.parse::<u16>().ok().filter(|percent| *percent <= 100)?;
    Some((f64::from(percent) / 100.0).to_string())
}

fn fraction(token: &str) -> Option<String> {
    let (numerator, denominator) = token.split_once('/')?;
    let valid = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
    if !valid(numerator) || !valid(denominator) || denominator.bytes().all(|b| b == b'0') {
        return None;
    }
    Some(format!("calc({}/{} * 100%)", numerator, denominator))
}

fn sides(property: &str, prefix: &str, value: &str) -> PropertyMap {
    let suffixes: &[&str] = match &prefix[1..] {
        "x" => &["-inline"],
        "y" => &["-block"],
        "t" => &["-top"],
        "r" => &["-right"],
        "b" => &["-bottom"],
        "l" => &["-left"],
        "s" => &["-inline-start"],
        "e" => &["-inline-end"],
        _ => &[""],
    };
    suffixes
        .iter()
        .map(|suffix| (format!("{}{}", property, suffix), value.to_string()))
        .collect()
}

fn signed(value: String, negative: bool) -> String {
    if !negative || value == "0" || value == "0px" {
        return value;
    }
    if let Some(positive) = value.strip_prefix('-') {
        return positive.to_string();
    }
    if value.starts_with(|ch: char| ch.is_ascii_digit() || ch == '.') {
        return format!("-{}", value);
    }
    format!("calc({} * -1)", value)
}

fn looks_like_length(value: &str) -> bool {
    const UNITS: &[&str] = &["px", "rem", "em", "%", "vw", "vh", "pt", "ch"];
    let numeric = value.starts_with(|ch: char| ch.is_ascii_digit() || ch == '.')
        && UNITS.iter().any(|unit| value.ends_with(unit));
    numeric || value.starts_with("clamp(")
}

#[cfg(test)]
mod tests {
    use super::{fraction, signed, RulesPreset};
    use crate::plugin::{Plugin, PluginContext, Registry};
    use crate::properties::PropertyMap;
    use crate::theme::Theme;

    fn registry() -> Registry {
        let mut registry = Registry::new(Theme::default());
        RulesPreset
            .install(&mut PluginContext::new(&mut registry, RulesPreset::NAME))
            .expect("preset should install");
        registry
    }

    fn props(registry: &Registry, utility: &str) -> Option<PropertyMap> {
        registry.rules().resolve(utility, registry.theme())
    }

    fn pairs(properties: &PropertyMap) -> Vec<(&str, &str)> {
        properties.iter().collect()
    }

    #[test]
    fn display_and_popover() {
        let registry = registry();
        let properties = props(&registry, "hidden").expect("rule should resolve");
        assert_eq!(pairs(&properties), vec![("display", "none")]);
        let properties = props(&registry, "popover-auto").expect("rule should resolve");
        assert_eq!(pairs(&properties), vec![("popover", "auto")]);
    }

    #[test]
    fn container_rules() {
        let registry = registry();
        let properties =
            props(&registry, "container-[sidebar_/_inline-size]").expect("rule should resolve");
        assert_eq!(pairs(&properties), vec![("container", "sidebar / inline-size")]);
        assert!(props(&registry, "container-[]").is_none());
        let properties = props(&registry, "@container/card").expect("rule should resolve");
        assert_eq!(
            pairs(&properties),
            vec![("container-type", "inline-size"), ("container-name", "card")]
        );
        let properties = props(&registry, "container-name-[main]").expect("rule should resolve");
        assert_eq!(pairs(&properties), vec![("container-name", "main")]);
    }

    #[test]
    fn spacing_rules() {
        let registry = registry();
        let properties = props(&registry, "p-4").expect("rule should resolve");
        assert_eq!(pairs(&properties), vec![("padding", "1rem")]);
        let properties = props(&registry, "px-[3px]").expect("rule should resolve");
        assert_eq!(pairs(&properties), vec![("padding-inline", "3px")]);
        let properties = props(&registry, "-mt-2").expect("rule should resolve");
        assert_eq!(pairs(&properties), vec![("margin-top", "-0.5rem")]);
        let properties = props(&registry, "mx-auto").expect("rule should resolve");
        assert_eq!(pairs(&properties), vec![("margin-inline", "auto")]);
        let properties = props(&registry, "gap-x-2").expect("rule should resolve");
        assert_eq!(pairs(&properties), vec![("column-gap", "0.5rem")]);
        assert!(props(&registry, "p-13").is_none());
        assert!(props(&registry, "-p-4").is_none());
        assert!(props(&registry, "-m-auto").is_none());
        assert!(props(&registry, "-mx-auto").is_none());
    }

    #[test]
    fn color_rules() {
        let registry = registry();
        let properties = props(&registry, "bg-red-500").expect("rule should resolve");
        assert_eq!(pairs(&properties), vec![("background-color", "#ef4444")]);
        let properties = props(&registry, "bg-red-500/50").expect("rule should resolve");
        assert_eq!(
            pairs(&properties),
            vec![("background-color", "color-mix(in oklab,#ef4444 50%,transparent)")]
        );
        let properties = props(&registry, "bg-[url(http://x)]").expect("rule should resolve");
        assert_eq!(pairs(&properties), vec![("background-image", "url(http://x)")]);
        let properties = props(&registry, "text-[14px]").expect("rule should resolve");
        assert_eq!(pairs(&properties), vec![("font-size", "14px")]);
        let properties = props(&registry, "text-white").expect("rule should resolve");
        assert_eq!(pairs(&properties), vec![("color", "#fff")]);
        let properties = props(&registry, "text-center").expect("rule should resolve");
        assert_eq!(pairs(&properties), vec![("text-align", "center")]);
        assert!(props(&registry, "bg-nope-500").is_none());
    }

    #[test]
    fn sizing_and_translate_rules() {
        let registry = registry();
        let properties = props(&registry, "w-1/2").expect("rule should resolve");
        assert_eq!(pairs(&properties), vec![("width", "calc(1/2 * 100%)")]);
        let properties = props(&registry, "h-screen").expect("rule should resolve");
        assert_eq!(pairs(&properties), vec![("height", "100vh")]);
        let properties = props(&registry, "size-8").expect("rule should resolve");
        assert_eq!(pairs(&properties), vec![("width", "2rem"), ("height", "2rem")]);
        let properties = props(&registry, "-translate-x-1/2").expect("rule should resolve");
        assert_eq!(
            pairs(&properties),
            vec![
                ("--coral-translate-x", "calc(calc(1/2 * 100%) * -1)"),
                ("translate", "var(--coral-translate-x, 0) var(--coral-translate-y, 0)"),
            ]
        );
    }

    #[test]
    fn starting_style_rules() {
        let registry = registry();
        let properties =
            props(&registry, "starting--translate-y-full").expect("rule should resolve");
        assert_eq!(properties.get("--coral-starting-translate-y"), Some("-100%"));
        let properties = props(&registry, "starting-translate-y-4").expect("rule should resolve");
        assert_eq!(properties.get("--coral-starting-translate-y"), Some("1rem"));
        let properties = props(&registry, "starting-opacity-0").expect("rule should resolve");
        assert_eq!(
            pairs(&properties),
            vec![
                ("--coral-starting-opacity", "0"),
                ("opacity", "var(--coral-starting-opacity)"),
            ]
        );
        let properties = props(&registry, "starting-scale-95").expect("rule should resolve");
        assert_eq!(
            pairs(&properties),
            vec![
                ("--coral-starting-scale", "0.95"),
                ("transform", "scale(var(--coral-starting-scale))"),
            ]
        );
        let properties = props(&registry, "starting-opacity-[0.5]").expect("rule should resolve");
        assert_eq!(properties.get("--coral-starting-opacity"), Some("0.5"));
        let properties =
            props(&registry, "starting-translate-[10px,_20px]").expect("rule should resolve");
        assert_eq!(properties.get("--coral-starting-translate"), Some("10px, 20px"));

        for empty in ["starting-opacity-[]", "starting-scale-[]", "starting-translate-[]"] {
            assert!(props(&registry, empty).is_none(), "{} should not resolve", empty);
        }
        assert!(props(&registry, "starting-opacity-150").is_none());
    }

    #[test]
    fn arbitrary_property_rule() {
        let registry = registry();
        let properties = props(&registry, "[mask-type:luminance]").expect("rule should resolve");
        assert_eq!(pairs(&properties), vec![("mask-type", "luminance")]);
        let properties =
            props(&registry, "[grid-template-columns:1fr_auto]").expect("rule should resolve");
        assert_eq!(pairs(&properties), vec![("grid-template-columns", "1fr auto")]);
    }

    #[test]
    fn helpers() {
        assert_eq!(fraction("1/0"), None);
        assert_eq!(fraction("a/2"), None);
        assert_eq!(signed("1rem".to_string(), true), "-1rem");
        assert_eq!(signed("-1rem".to_string(), true), "1rem");
        assert_eq!(signed("0px".to_string(), true), "0px");
        assert_eq!(signed("var(--x)".to_string(), true), "calc(var(--x) * -1)");
    }
}
