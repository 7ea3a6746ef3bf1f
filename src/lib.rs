//! Atomic CSS compiler.
//!
//! Class names such as `hover:dark:bg-red-500` are split into a variant
//! chain and a base utility, matched against rules and variants that
//! plugins registered, and assembled into deduplicated CSS:
//!
//! ```
//! use coral::{create_coral_with_preset, Config};
//!
//! let coral = create_coral_with_preset(Config::default())?.build();
//! let css = coral.generate(&["p-4", "md:hover:bg-red-500"]);
//! assert!(css.contains("@media (width >= 48rem)"));
//! # Ok::<(), coral::CoralError>(())
//! ```

pub mod assembler;
pub mod cache;
pub mod config;
pub mod error;
pub mod generator;
pub mod matcher;
pub mod plugin;
pub mod preset;
pub mod properties;
pub mod resolver;
pub mod rule;
pub mod theme;
pub mod variant;

pub use coral_core::{expand_variant_groups, parse_class, ParsedClass};

pub use cache::CacheStats;
pub use config::{load, Config, DarkMode};
pub use error::{CoralError, Result};
pub use generator::{
    create_coral, create_coral_with_preset, Coral, CoralBuilder, CssOutput, GenerationResult,
};
pub use matcher::{Captures, Matcher};
pub use plugin::{Component, FnPlugin, Hook, HookEvent, Plugin, PluginContext, Registry};
pub use properties::PropertyMap;
pub use resolver::{escape_selector, ResolvedBlock};
pub use rule::{Rule, RuleBody};
pub use theme::{Theme, ThemeFragment, ThemeValue};
pub use variant::{SelectorTransform, Variant, VariantKind, VariantTemplate, Wrapper, WrapperSpec};
