use std::collections::HashSet;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use tracing::debug;

use crate::assembler::{CssBuffer, RenderOptions};
use crate::cache::{CacheStats, ResolutionCache};
use crate::config::{resolve_theme, Config, ConfigPlugin};
use crate::error::{CoralError, Result};
use crate::plugin::{Component, HookEvent, Plugin, PluginContext, Registry};
use crate::preset;
use crate::resolver::{resolve_prefixed_block, ResolvedBlock};
use crate::theme::Theme;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationResult {
    pub css: CssOutput,
    /// Distinct input classes that produced CSS.
    pub class_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CssOutput(String);

impl CssOutput {
    pub fn new(css: String) -> Self {
        Self(css)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for CssOutput {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        self.0.as_str()
    }
}

impl fmt::Display for CssOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

impl From<String> for CssOutput {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<CssOutput> for String {
    fn from(value: CssOutput) -> Self {
        value.0
    }
}

/// Setup phase: plugins install into the registry here, then
/// [`CoralBuilder::build`] freezes it.
#[derive(Debug)]
pub struct CoralBuilder {
    config: Config,
    registry: Registry,
    installed: Vec<String>,
}

impl CoralBuilder {
    fn new(config: Config) -> Self {
        let registry = Registry::new(resolve_theme(&config));
        Self {
            config,
            registry,
            installed: Vec::new(),
        }
    }

    /// Runs `plugin.install`. A plugin that fails leaves the registry as it
    /// was before the call.
    pub fn use_plugin<P>(&mut self, plugin: &P) -> Result<&mut Self>
    where
        P: Plugin + ?Sized,
    {
        let name = plugin.name();
        if let Some(missing) = plugin
            .dependencies()
            .iter()
            .find(|dependency| !self.installed.iter().any(|installed| installed == *dependency))
        {
            return Err(CoralError::PluginDependency {
                plugin: name.to_string(),
                missing: missing.to_string(),
            });
        }

        let mut staged = self.registry.clone();
        plugin.install(&mut PluginContext::new(&mut staged, name))?;

        debug!(
            plugin = name,
            rules = staged.rules.len() - self.registry.rules.len(),
            variants = staged.variants.len() - self.registry.variants.len(),
            "plugin installed"
        );
        self.registry = staged;
        self.installed.push(name.to_string());
        self.registry.fire(&HookEvent::PluginInstalled { name });
        Ok(self)
    }

    /// Plugin names in install order.
    pub fn installed(&self) -> &[String] {
        &self.installed
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn build(self) -> Coral {
        let cache = self.config.cache.then(ResolutionCache::new);
        Coral {
            registry: self.registry,
            config: self.config,
            cache,
        }
    }
}

/// A frozen kernel. Generation takes `&self`, so one instance can serve
/// many threads.
#[derive(Debug)]
pub struct Coral {
    registry: Registry,
    config: Config,
    cache: Option<ResolutionCache>,
}

impl Coral {
    pub fn generate<S: AsRef<str>>(&self, classes: &[S]) -> String {
        self.generate_result(classes).css.into()
    }

    pub fn generate_result<S: AsRef<str>>(&self, classes: &[S]) -> GenerationResult {
        let classes = classes
            .iter()
            .map(|class| class.as_ref().trim())
            .filter(|class| !class.is_empty())
            .collect::<Vec<_>>();
        self.registry
            .fire(&HookEvent::BeforeGenerate { classes: &classes });

        let mut buffer = CssBuffer::new();
        let mut seen = HashSet::with_capacity(classes.len());
        let mut class_count = 0;
        for class in &classes {
            if !seen.insert(*class) {
                continue;
            }
            if let Some(block) = self.resolve(class) {
                buffer.push(&block);
                class_count += 1;
            }
        }

        let css = buffer.render_with(RenderOptions {
            minify: self.config.minify,
            layers: self.config.layers,
        });
        self.registry.fire(&HookEvent::AfterGenerate {
            css: &css,
            class_count,
        });
        debug!(
            classes = classes.len(),
            blocks = buffer.len(),
            class_count,
            cache_hits = self.cache.as_ref().map_or(0, |cache| cache.stats().hits),
            "generated css"
        );

        GenerationResult {
            css: CssOutput::new(css),
            class_count,
        }
    }

    /// Splits on whitespace and expands variant groups such as
    /// `hover:(bg-red-500 text-white)` before generating.
    pub fn generate_from_str(&self, input: &str) -> String {
        let classes = coral_core::expand_variant_groups(input);
        self.generate(&classes)
    }

    /// Resolves one class through the cache when enabled.
    pub fn resolve(&self, class: &str) -> Option<Arc<ResolvedBlock>> {
        let prefix = self.config.prefix.as_str();
        match &self.cache {
            Some(cache) => cache.get_or_insert_with(class, || {
                resolve_prefixed_block(&self.registry, class, prefix)
            }),
            None => resolve_prefixed_block(&self.registry, class, prefix).map(Arc::new),
        }
    }

    pub fn components(&self) -> &[Component] {
        self.registry.components()
    }

    pub fn theme(&self) -> &Theme {
        self.registry.theme()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.cache.as_ref().map(ResolutionCache::stats)
    }

    pub fn clear_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.clear();
        }
    }
}

/// A builder with the config's theme, variants and utilities and nothing
/// else.
pub fn create_coral(config: Config) -> Result<CoralBuilder> {
    let mut builder = CoralBuilder::new(config.clone());
    builder.use_plugin(&ConfigPlugin::new(&config))?;
    Ok(builder)
}

/// Like [`create_coral`], with the built-in variants and rules installed
/// ahead of the config's own.
pub fn create_coral_with_preset(config: Config) -> Result<CoralBuilder> {
    let mut builder = CoralBuilder::new(config.clone());
    builder
        .use_plugin(
            &preset::variants(&config.dark_mode).with_dark_selector(config.dark_selector()),
        )?
        .use_plugin(&preset::rules())?
        .use_plugin(&ConfigPlugin::new(&config))?;
    Ok(builder)
}

#[cfg(test)]
mod tests {
    use super::{create_coral, create_coral_with_preset, CssOutput};
    use crate::config::Config;
    use crate::error::CoralError;
    use crate::plugin::{FnPlugin, Hook, HookEvent, PluginContext};
    use crate::properties::PropertyMap;
    use crate::rule::Rule;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    fn preset() -> super::Coral {
        create_coral_with_preset(Config::default())
            .expect("preset should install")
            .build()
    }

    #[test]
    fn generates_simple_rule() {
        let coral = preset();
        let result = coral.generate_result(&["p-4"]);
        assert_eq!(result.css.as_str(), ".p-4 {\n  padding: 1rem;\n}");
        assert_eq!(result.class_count, 1);
    }

    #[test]
    fn minified_output() {
        let config = Config {
            minify: true,
            ..Config::default()
        };
        let coral = create_coral_with_preset(config)
            .expect("preset should install")
            .build();
        assert_eq!(
            coral.generate(&["md:p-4", "block"]),
            "@media (width >= 48rem){.md\\:p-4{padding:1rem}}.block{display:block}"
        );
    }

    #[test]
    fn duplicate_classes_emit_once() {
        let coral = preset();
        let result = coral.generate_result(&["block", "p-4", "block", " ", "nope"]);
        assert_eq!(
            result.css.as_str(),
            ".block {\n  display: block;\n}\n.p-4 {\n  padding: 1rem;\n}"
        );
        assert_eq!(result.class_count, 2);
    }

    #[test]
    fn variant_groups_expand() {
        let coral = preset();
        assert_eq!(
            coral.generate_from_str("hover:(block p-4)"),
            coral.generate(&["hover:block", "hover:p-4"])
        );
    }

    #[test]
    fn cache_tracks_hits_and_can_be_disabled() {
        let coral = preset();
        coral.generate(&["p-4", "block"]);
        coral.generate(&["p-4"]);
        let stats = coral.cache_stats().expect("cache is enabled by default");
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.size, 2);

        coral.clear_cache();
        assert_eq!(coral.cache_stats().map(|stats| stats.size), Some(0));

        let config = Config {
            cache: false,
            ..Config::default()
        };
        let uncached = create_coral_with_preset(config)
            .expect("preset should install")
            .build();
        assert_eq!(uncached.generate(&["p-4"]), coral.generate(&["p-4"]));
        assert!(uncached.cache_stats().is_none());
    }

    #[test]
    fn plugin_dependencies_must_be_installed_first() {
        let mut builder = create_coral(Config::default()).expect("config should install");
        let forms = FnPlugin::new("forms", |_: &mut PluginContext<'_>| Ok(())).depends_on("base");
        let err = builder.use_plugin(&forms).expect_err("base is missing");
        assert_eq!(
            err,
            CoralError::PluginDependency {
                plugin: "forms".to_string(),
                missing: "base".to_string()
            }
        );

        let base = FnPlugin::new("base", |_: &mut PluginContext<'_>| Ok(()));
        builder
            .use_plugin(&base)
            .and_then(|builder| builder.use_plugin(&forms))
            .expect("dependencies are satisfied");
        assert_eq!(builder.installed(), &["config", "base", "forms"]);
    }

    #[test]
    fn failed_plugin_leaves_registry_untouched() {
        let mut builder = create_coral(Config::default()).expect("config should install");
        let broken = FnPlugin::new("broken", |ctx: &mut PluginContext<'_>| {
            ctx.add_rule(Rule::fixed("block", PropertyMap::new().with("display", "block")))?;
            ctx.add_rule(Rule::pattern("bad", "p-[", |_, _| None)?)
        });
        assert!(builder.use_plugin(&broken).is_err());
        assert!(builder.registry().rules().is_empty());
        assert_eq!(builder.installed(), &["config"]);
    }

    #[test]
    fn hooks_observe_install_and_generate() {
        let installs = Arc::new(Mutex::new(Vec::new()));
        let generated = Arc::new(AtomicUsize::new(0));
        let (installs_seen, generated_seen) = (Arc::clone(&installs), Arc::clone(&generated));
        let observer = FnPlugin::new("observer", move |ctx: &mut PluginContext<'_>| {
            let installs = Arc::clone(&installs_seen);
            ctx.on(Hook::PluginInstalled, move |event| {
                if let HookEvent::PluginInstalled { name } = event {
                    if let Ok(mut names) = installs.lock() {
                        names.push(name.to_string());
                    }
                }
            });
            let generated = Arc::clone(&generated_seen);
            ctx.on(Hook::AfterGenerate, move |event| {
                if let HookEvent::AfterGenerate { class_count, .. } = event {
                    generated.fetch_add(*class_count, Ordering::SeqCst);
                }
            });
            ctx.add_component("card", PropertyMap::new().with("padding", "1rem"));
            Ok(())
        });
        let utilities = FnPlugin::new("utilities", |ctx: &mut PluginContext<'_>| {
            ctx.add_rule(Rule::fixed("block", PropertyMap::new().with("display", "block")))
        });

        let mut builder = create_coral(Config::default()).expect("config should install");
        builder
            .use_plugin(&observer)
            .and_then(|builder| builder.use_plugin(&utilities))
            .expect("plugins should install");
        let coral = builder.build();
        coral.generate(&["block", "unknown"]);

        let names = installs.lock().map(|names| names.clone()).unwrap_or_default();
        assert_eq!(names, vec!["observer", "utilities"]);
        assert_eq!(generated.load(Ordering::SeqCst), 1);
        assert_eq!(coral.components()[0].name, "card");
        assert!(!coral.generate(&["card"]).contains("padding"));
    }

    #[test]
    fn prefix_and_layers_shape_the_output() {
        let config = Config {
            minify: true,
            prefix: "tw-".to_string(),
            layers: true,
            ..Config::default()
        };
        let coral = create_coral_with_preset(config)
            .expect("preset should install")
            .build();
        assert_eq!(
            coral.generate(&["p-4", "md:block"]),
            "@layer base, components, utilities;@layer utilities{.tw-p-4{padding:1rem}@media (width >= 48rem){.tw-md\\:block{display:block}}}"
        );
        assert_eq!(coral.generate(&["nope"]), "");
    }

    #[test]
    fn css_output_conversions() {
        let output = CssOutput::from(".a{}".to_string());
        assert_eq!(output.len(), 4);
        assert_eq!(output.to_string(), ".a{}");
        assert_eq!(String::from(output), ".a{}");
    }
}
