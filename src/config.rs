use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::{CoralError, Result};
use crate::matcher::Matcher;
use crate::plugin::{Plugin, PluginContext};
use crate::properties::PropertyMap;
use crate::rule::Rule;
use crate::theme::{Theme, ThemeFragment};
use crate::variant::{Variant, VariantTemplate};

pub const DEFAULT_DARK_SELECTOR: &str = ".dark";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub minify: bool,
    pub cache: bool,
    /// Prepended to every emitted class selector: `tw-` turns `p-4` into
    /// `.tw-p-4`.
    pub prefix: String,
    /// Emit `@layer base, components, utilities;` and nest the output in
    /// `@layer utilities`.
    pub layers: bool,
    pub dark_mode: DarkMode,
    pub dark_selector: Option<String>,
    pub theme: ThemeFragment,
    /// Variant name -> template, e.g. `hocus = "&:hover, &:focus"`.
    pub variants: BTreeMap<String, String>,
    /// Utility name -> declarations, e.g. `content-auto = "content-visibility: auto"`.
    pub utilities: BTreeMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            minify: false,
            cache: true,
            prefix: String::new(),
            layers: false,
            dark_mode: DarkMode::default(),
            dark_selector: None,
            theme: ThemeFragment::default(),
            variants: BTreeMap::new(),
            utilities: BTreeMap::new(),
        }
    }
}

impl Config {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|err| CoralError::InvalidConfig {
            message: format!("failed to parse config: {}", err),
        })
    }

    pub fn dark_selector(&self) -> &str {
        self.dark_selector
            .as_deref()
            .map(str::trim)
            .filter(|selector| !selector.is_empty())
            .unwrap_or(DEFAULT_DARK_SELECTOR)
    }
}

/// How the `dark` variant is expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DarkMode {
    /// Ancestor class, `.dark &`.
    #[default]
    Class,
    /// `@media (prefers-color-scheme: dark)`.
    Media,
    /// Ancestor selector from `dark_selector`; `light` uses `[data-theme="light"]`.
    Selector,
    /// Class strategy plus a `dark-media` variant for the media query.
    Auto,
}

pub fn load(path: &Path) -> Result<Config> {
    let text = fs::read_to_string(path).map_err(|err| CoralError::InvalidConfig {
        message: format!("failed to read config {}: {}", path.display(), err),
    })?;
    toml::from_str(&text).map_err(|err| CoralError::InvalidConfig {
        message: format!("failed to parse config {}: {}", path.display(), err),
    })
}

/// Default theme with the config's fragment merged over it.
pub fn resolve_theme(config: &Config) -> Theme {
    let mut theme = Theme::default();
    theme.extend(config.theme.clone());
    theme
}

/// Installs the config's custom variants and utilities.
pub struct ConfigPlugin<'c> {
    config: &'c Config,
}

impl<'c> ConfigPlugin<'c> {
    pub const NAME: &'static str = "config";

    pub fn new(config: &'c Config) -> Self {
        Self { config }
    }
}

impl Plugin for ConfigPlugin<'_> {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn install(&self, ctx: &mut PluginContext<'_>) -> Result<()> {
        for (name, template) in &self.config.variants {
            let parsed = VariantTemplate::parse(template).ok_or_else(|| CoralError::InvalidConfig {
                message: format!("invalid template for variant \"{}\": {}", name, template),
            })?;
            ctx.add_variant(Variant::new(
                name.clone(),
                Matcher::exact(name.clone()),
                parsed.into_kind(),
            ))?;
        }

        for (name, declarations) in &self.config.utilities {
            let properties = PropertyMap::parse(declarations);
            if properties.is_empty() {
                return Err(CoralError::InvalidConfig {
                    message: format!("utility \"{}\" has no declarations", name),
                });
            }
            ctx.add_rule(Rule::fixed(name.clone(), properties))?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{load, resolve_theme, Config, ConfigPlugin, DarkMode};
    use crate::error::CoralError;
    use crate::plugin::{Plugin, PluginContext, Registry};
    use crate::resolver::resolve_block;
    use crate::theme::Theme;
    use crate::variant::Wrapper;
    use std::fs;
    use std::time::{SystemTime, UNIX_EPOCH};

    #[test]
    fn loads_toml_config() {
        let path = temp_path("coral_config");
        let _ = fs::write(&path, "minify = true\ndark_mode = \"media\"");
        let config = load(&path).expect("config should parse");
        assert!(config.minify);
        assert!(config.cache);
        assert_eq!(config.dark_mode, DarkMode::Media);
    }

    #[test]
    fn reads_prefix_and_layers() {
        let config = Config::from_toml_str("prefix = \"tw-\"\nlayers = true")
            .expect("config should parse");
        assert_eq!(config.prefix, "tw-");
        assert!(config.layers);
        assert!(!Config::default().layers);
    }

    #[test]
    fn defaults_when_empty() {
        let path = temp_path("coral_config_default");
        let _ = fs::write(&path, "");
        let config = load(&path).expect("config should parse");
        assert_eq!(config, Config::default());
        assert_eq!(config.dark_selector(), ".dark");
        assert_eq!(config.dark_mode, DarkMode::Class);
    }

    #[test]
    fn reports_missing_and_malformed_files() {
        let err = load(&temp_path("coral_config_missing")).expect_err("file does not exist");
        assert!(matches!(
            err,
            CoralError::InvalidConfig { ref message } if message.contains("failed to read")
        ));

        let err = Config::from_toml_str("dark_mode = \"sometimes\"").expect_err("unknown mode");
        assert!(matches!(err, CoralError::InvalidConfig { .. }));
    }

    #[test]
    fn merges_theme_over_defaults() {
        let config = Config::from_toml_str(
            r##"
dark_selector = "[data-mode=dark]"

[theme.colors.brand]
500 = "#ff5500"

[theme.screens]
md = "50rem"
"##,
        )
        .expect("config should parse");

        let theme = resolve_theme(&config);
        assert_eq!(theme.resolve("colors", "brand-500").as_deref(), Some("#ff5500"));
        assert_eq!(theme.get("screens", "md").as_deref(), Some("50rem"));
        assert_eq!(theme.get("screens", "sm").as_deref(), Some("40rem"));
        assert_eq!(config.dark_selector(), "[data-mode=dark]");
    }

    #[test]
    fn installs_custom_variants_and_utilities() {
        let config = Config::from_toml_str(
            r#"
[variants]
hocus = "&:hover, &:focus"
pointer = "@media (pointer: fine) { &:hover }"

[utilities]
content-auto = "content-visibility: auto"
"#,
        )
        .expect("config should parse");

        let mut registry = Registry::new(Theme::default());
        let plugin = ConfigPlugin::new(&config);
        plugin
            .install(&mut PluginContext::new(&mut registry, plugin.name()))
            .expect("config plugin should install");

        let block = resolve_block(&registry, "hocus:content-auto").expect("class should render");
        assert_eq!(
            block.selectors,
            vec![".hocus\\:content-auto:hover", ".hocus\\:content-auto:focus"]
        );
        assert_eq!(block.properties.get("content-visibility"), Some("auto"));

        let block = resolve_block(&registry, "pointer:content-auto").expect("class should render");
        assert_eq!(block.wrappers, vec![Wrapper::media("(pointer: fine)")]);
        assert_eq!(block.selectors, vec![".pointer\\:content-auto:hover"]);
    }

    #[test]
    fn rejects_bad_templates() {
        let config = Config::from_toml_str("[variants]\nbroken = \"@media (x) {\"")
            .expect("config should parse");
        let mut registry = Registry::new(Theme::default());
        let plugin = ConfigPlugin::new(&config);
        let err = plugin
            .install(&mut PluginContext::new(&mut registry, plugin.name()))
            .expect_err("template is invalid");
        assert!(matches!(err, CoralError::InvalidConfig { .. }));
    }

    fn temp_path(prefix: &str) -> std::path::PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        std::env::temp_dir().join(format!("{}_{}.toml", prefix, nanos))
    }
}
