//! Built-in variants and rules, installed by
//! [`create_coral_with_preset`](crate::create_coral_with_preset).

mod rules;
mod variants;

pub use rules::RulesPreset;
pub use variants::VariantsPreset;

use crate::config::DarkMode;

/// Pseudo-class, group/peer, responsive, container, attribute, direction,
/// dark-mode and media-feature variants. Reads `screens` and `containers`
/// from the theme at install time.
pub fn variants(dark_mode: &DarkMode) -> VariantsPreset {
    VariantsPreset::new(*dark_mode)
}

/// Display, popover, container, spacing, color, sizing, translate and
/// arbitrary-property rules.
pub fn rules() -> RulesPreset {
    RulesPreset
}

/// Maps a variant name to the pseudo selector it appends, shared by the
/// plain and the `group-*`/`peer-*` forms.
pub(crate) fn pseudo_class(name: &str) -> Option<&'static str> {
    let pseudo = match name {
        "hover" => ":hover",
        "focus" => ":focus",
        "focus-visible" => ":focus-visible",
        "focus-within" => ":focus-within",
        "active" => ":active",
        "visited" => ":visited",
        "target" => ":target",
        "disabled" => ":disabled",
        "enabled" => ":enabled",
        "checked" => ":checked",
        "indeterminate" => ":indeterminate",
        "required" => ":required",
        "optional" => ":optional",
        "valid" => ":valid",
        "invalid" => ":invalid",
        "read-only" => ":read-only",
        "placeholder-shown" => ":placeholder-shown",
        "autofill" => ":autofill",
        "first" => ":first-child",
        "last" => ":last-child",
        "only" => ":only-child",
        "odd" => ":nth-child(odd)",
        "even" => ":nth-child(even)",
        "first-of-type" => ":first-of-type",
        "last-of-type" => ":last-of-type",
        "empty" => ":empty",
        "open" => ":is([open], :popover-open)",
        _ => return None,
    };
    Some(pseudo)
}

pub(crate) const PSEUDO_CLASSES: &[&str] = &[
    "hover",
    "focus",
    "focus-visible",
    "focus-within",
    "active",
    "visited",
    "target",
    "disabled",
    "enabled",
    "checked",
    "indeterminate",
    "required",
    "optional",
    "valid",
    "invalid",
    "read-only",
    "placeholder-shown",
    "autofill",
    "first",
    "last",
    "only",
    "odd",
    "even",
    "first-of-type",
    "last-of-type",
    "empty",
    "open",
];
