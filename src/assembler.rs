use std::collections::HashSet;

use crate::properties::PropertyMap;
use crate::resolver::ResolvedBlock;
use crate::variant::Wrapper;

/// Statement emitted ahead of layered output.
pub const LAYER_ORDER: &str = "@layer base, components, utilities;";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderOptions {
    pub minify: bool,
    /// Declare the layer order, then nest every block in `@layer utilities`.
    pub layers: bool,
}

#[derive(Debug, Clone)]
enum NodeKind {
    Rule {
        selector: String,
        properties: PropertyMap,
    },
    Shell(Wrapper),
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    children: Vec<Node>,
}

/// Collects rendered blocks in first-seen order.
///
/// Blocks sharing a wrapper path land in the same at-rule shell: the shell
/// is created where the first such block appeared and later blocks join it.
/// A block identical to one already pushed (same wrappers, selector and
/// declarations) is skipped.
#[derive(Debug, Clone, Default)]
pub struct CssBuffer {
    nodes: Vec<Node>,
    seen: HashSet<String>,
    blocks: usize,
}

impl CssBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one declaration block per selector alternate. Returns how many
    /// were new.
    pub fn push(&mut self, block: &ResolvedBlock) -> usize {
        if block.properties.is_empty() {
            return 0;
        }

        let declarations = block.properties.canonical_key();
        let wrapper_path = block
            .wrappers
            .iter()
            .map(Wrapper::header)
            .collect::<Vec<_>>()
            .join("|");

        let mut added = 0;
        for selector in &block.selectors {
            let key = format!("{}\u{0}{}\u{0}{}", wrapper_path, selector, declarations);
            if !self.seen.insert(key) {
                continue;
            }

            let mut level = &mut self.nodes;
            for wrapper in &block.wrappers {
                level = shell(level, wrapper);
            }
            level.push(Node {
                kind: NodeKind::Rule {
                    selector: selector.clone(),
                    properties: block.properties.clone(),
                },
                children: Vec::new(),
            });
            added += 1;
        }

        self.blocks += added;
        added
    }

    /// Distinct declaration blocks pushed so far.
    pub fn len(&self) -> usize {
        self.blocks
    }

    pub fn is_empty(&self) -> bool {
        self.blocks == 0
    }

    pub fn render(&self, minify: bool) -> String {
        self.render_with(RenderOptions {
            minify,
            layers: false,
        })
    }

    /// Empty buffers render to an empty string, layered or not.
    pub fn render_with(&self, options: RenderOptions) -> String {
        let css = render_level(&self.nodes, options.minify);
        if !options.layers || css.is_empty() {
            return css;
        }
        let separator = if options.minify { "" } else { "\n" };
        let layer = Wrapper::AtRule("@layer utilities".to_string());
        format!(
            "{}{}{}",
            LAYER_ORDER,
            separator,
            wrap_rule(&layer, &css, options.minify)
        )
    }
}

/// Shells are matched by their rendered header, the same text the dedup key
/// is built from.
fn shell<'a>(level: &'a mut Vec<Node>, wrapper: &Wrapper) -> &'a mut Vec<Node> {
    let header = wrapper.header();
    let existing = level
        .iter()
        .position(|node| matches!(&node.kind, NodeKind::Shell(w) if w.header() == header));
    let idx = match existing {
        Some(idx) => idx,
        None => {
            level.push(Node {
                kind: NodeKind::Shell(wrapper.clone()),
                children: Vec::new(),
            });
            level.len() - 1
        }
    };
    &mut level[idx].children
}

fn render_level(nodes: &[Node], minify: bool) -> String {
    let separator = if minify { "" } else { "\n" };
    nodes
        .iter()
        .map(|node| render_node(node, minify))
        .collect::<Vec<_>>()
        .join(separator)
}

fn render_node(node: &Node, minify: bool) -> String {
    match &node.kind {
        NodeKind::Rule {
            selector,
            properties,
        } => rule(selector, properties, minify),
        NodeKind::Shell(wrapper) => {
            wrap_rule(wrapper, &render_level(&node.children, minify), minify)
        }
    }
}

fn rule(selector: &str, properties: &PropertyMap, minify: bool) -> String {
    if minify {
        let declarations = properties
            .iter()
            .map(|(name, value)| format!("{}:{}", name, value))
            .collect::<Vec<_>>()
            .join(";");
        return format!("{}{{{}}}", selector, declarations);
    }

    let lines = properties
        .iter()
        .map(|(name, value)| format!("  {}: {};", name, value))
        .collect::<Vec<_>>()
        .join("\n");
    format!("{} {{\n{}\n}}", selector, lines)
}

fn wrap_rule(wrapper: &Wrapper, css: &str, minify: bool) -> String {
    if minify {
        format!("{}{{{}}}", wrapper.header(), css)
    } else {
        format!("{} {{\n{}\n}}", wrapper.header(), indent_css_block(css, 2))
    }
}

fn indent_css_block(css: &str, spaces: usize) -> String {
    let padding = " ".repeat(spaces);
    css.lines()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{}{}", padding, line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
