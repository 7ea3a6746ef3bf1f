use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::properties::PropertyMap;
use crate::rule::{Rule, RuleRegistry};
use crate::theme::{Theme, ThemeFragment};
use crate::variant::{Variant, VariantRegistry};

/// Lifecycle points a plugin can observe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hook {
    PluginInstalled,
    BeforeGenerate,
    AfterGenerate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookEvent<'a> {
    PluginInstalled { name: &'a str },
    BeforeGenerate { classes: &'a [&'a str] },
    AfterGenerate { css: &'a str, class_count: usize },
}

impl HookEvent<'_> {
    pub fn hook(&self) -> Hook {
        match self {
            HookEvent::PluginInstalled { .. } => Hook::PluginInstalled,
            HookEvent::BeforeGenerate { .. } => Hook::BeforeGenerate,
            HookEvent::AfterGenerate { .. } => Hook::AfterGenerate,
        }
    }
}

pub type HookCallback = Arc<dyn Fn(&HookEvent<'_>) + Send + Sync>;

/// Stored as registered; the kernel never emits components itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    pub name: String,
    pub definition: PropertyMap,
}

/// Everything plugins contribute. Built once through [`PluginContext`] and
/// read-only afterwards.
#[derive(Clone, Default)]
pub struct Registry {
    pub(crate) theme: Theme,
    pub(crate) rules: RuleRegistry,
    pub(crate) variants: VariantRegistry,
    pub(crate) components: Vec<Component>,
    pub(crate) hooks: Vec<(Hook, HookCallback)>,
}

impl Registry {
    pub fn new(theme: Theme) -> Self {
        Self {
            theme,
            ..Self::default()
        }
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    pub fn rules(&self) -> &RuleRegistry {
        &self.rules
    }

    pub fn variants(&self) -> &VariantRegistry {
        &self.variants
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub(crate) fn fire(&self, event: &HookEvent<'_>) {
        let hook = event.hook();
        for (registered, callback) in &self.hooks {
            if *registered == hook {
                callback(event);
            }
        }
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("theme", &self.theme)
            .field("rules", &self.rules.len())
            .field("variants", &self.variants.len())
            .field("components", &self.components.len())
            .field("hooks", &self.hooks.len())
            .finish()
    }
}

/// Capability handed to [`Plugin::install`]. It borrows the registry only
/// for the duration of the install call.
pub struct PluginContext<'a> {
    registry: &'a mut Registry,
    plugin: &'a str,
}

impl<'a> PluginContext<'a> {
    pub(crate) fn new(registry: &'a mut Registry, plugin: &'a str) -> Self {
        Self { registry, plugin }
    }

    pub fn plugin_name(&self) -> &str {
        self.plugin
    }

    /// Registers a rule. Same-name rules never replace each other; see
    /// [`crate::matcher::MatchTable`] for which one fires.
    pub fn add_rule(&mut self, rule: Rule) -> Result<()> {
        self.registry.rules.add(rule)
    }

    pub fn add_rules(&mut self, rules: impl IntoIterator<Item = Rule>) -> Result<()> {
        for rule in rules {
            self.add_rule(rule)?;
        }
        Ok(())
    }

    pub fn add_variant(&mut self, variant: Variant) -> Result<()> {
        self.registry.variants.add(variant)
    }

    pub fn add_variants(&mut self, variants: impl IntoIterator<Item = Variant>) -> Result<()> {
        for variant in variants {
            self.add_variant(variant)?;
        }
        Ok(())
    }

    pub fn add_component(&mut self, name: impl Into<String>, definition: PropertyMap) {
        self.registry.components.push(Component {
            name: name.into(),
            definition,
        });
    }

    pub fn extend_theme(&mut self, fragment: ThemeFragment) {
        self.registry.theme.extend(fragment);
    }

    pub fn on<F>(&mut self, hook: Hook, callback: F)
    where
        F: Fn(&HookEvent<'_>) + Send + Sync + 'static,
    {
        self.registry.hooks.push((hook, Arc::new(callback)));
    }

    /// The theme as extended so far, for plugins that derive rules from it.
    pub fn theme(&self) -> &Theme {
        &self.registry.theme
    }
}

pub trait Plugin {
    fn name(&self) -> &str;

    /// Plugins that must be installed before this one.
    fn dependencies(&self) -> &[&str] {
        &[]
    }

    fn install(&self, ctx: &mut PluginContext<'_>) -> Result<()>;
}

/// A plugin built from a closure.
pub struct FnPlugin<F> {
    name: String,
    dependencies: Vec<&'static str>,
    install: F,
}

impl<F> FnPlugin<F>
where
    F: Fn(&mut PluginContext<'_>) -> Result<()>,
{
    pub fn new(name: impl Into<String>, install: F) -> Self {
        Self {
            name: name.into(),
            dependencies: Vec::new(),
            install,
        }
    }

    pub fn depends_on(mut self, dependency: &'static str) -> Self {
        self.dependencies.push(dependency);
        self
    }
}

impl<F> Plugin for FnPlugin<F>
where
    F: Fn(&mut PluginContext<'_>) -> Result<()>,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn dependencies(&self) -> &[&str] {
        &self.dependencies
    }

    fn install(&self, ctx: &mut PluginContext<'_>) -> Result<()> {
        (self.install)(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::{FnPlugin, Hook, HookEvent, Plugin, PluginContext, Registry};
    use crate::properties::PropertyMap;
    use crate::rule::Rule;
    use crate::theme::{Theme, ThemeFragment};
    use crate::variant::Variant;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn context_populates_registry() {
        let mut registry = Registry::new(Theme::default());
        let plugin = FnPlugin::new("demo", |ctx: &mut PluginContext<'_>| {
            ctx.add_rule(Rule::fixed("block", PropertyMap::new().with("display", "block")))?;
            ctx.add_variant(Variant::selector("hover", "&:hover"))?;
            ctx.add_component("btn", PropertyMap::new().with("padding", "1rem"));
            ctx.extend_theme(ThemeFragment::new().with("screens", "md", "50rem"));
            assert_eq!(ctx.plugin_name(), "demo");
            assert_eq!(ctx.theme().get("screens", "md").as_deref(), Some("50rem"));
            Ok(())
        });

        let mut ctx = PluginContext::new(&mut registry, "demo");
        plugin.install(&mut ctx).expect("install should succeed");

        assert_eq!(registry.rules().len(), 1);
        assert_eq!(registry.variants().len(), 1);
        assert_eq!(registry.components()[0].name, "btn");
        assert_eq!(registry.theme().get("screens", "md").as_deref(), Some("50rem"));
    }

    #[test]
    fn hooks_fire_only_for_their_event() {
        let mut registry = Registry::new(Theme::default());
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        {
            let mut ctx = PluginContext::new(&mut registry, "hooks");
            ctx.on(Hook::AfterGenerate, move |event| {
                if let HookEvent::AfterGenerate { class_count, .. } = event {
                    seen.fetch_add(*class_count, Ordering::SeqCst);
                }
            });
        }

        registry.fire(&HookEvent::BeforeGenerate { classes: &["p-4"] });
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        registry.fire(&HookEvent::AfterGenerate {
            css: "",
            class_count: 3,
        });
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn fn_plugin_reports_dependencies() {
        let plugin = FnPlugin::new("forms", |_: &mut PluginContext<'_>| Ok(())).depends_on("base");
        assert_eq!(plugin.name(), "forms");
        assert_eq!(plugin.dependencies(), &["base"]);
    }
}
