//! Tree normalizer.
//!
//! Converts a `RawNode` tree into the `NormalizedNode` tree. Every raw node
//! maps to zero or more normalized nodes: hidden nodes to none, groups to the
//! normalized list of their children, everything else to exactly one node.
//! Parents flatten their children's lists, so nested groups inline without
//! special-casing.
//!
//! Each emitted node also carries its extracted CSS styles. A node's layout
//! depends on its nearest emitted ancestor, which a group passes through.

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::node::{NormalizedNode, OutputType};
use crate::raw::{Bounds, RawNode, RawNodeType};
use crate::style::extract_styles;

/// Base name for nodes whose name has no usable characters.
pub const FALLBACK_NAME: &str = "Component";

/// Largest width and height, in layout units, of a vector still flagged as an
/// icon candidate.
pub const DEFAULT_ICON_MAX_SIZE: f64 = 24.0;

/// Counters collected over one transform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizeStats {
    pub nodes: usize,
    pub hidden_skipped: usize,
    pub groups_inlined: usize,
    pub icons: usize,
}

/// State shared across one top-level transform.
///
/// Holds the name-disambiguation counters, so it must be created (or
/// [`reset`](Self::reset)) for every independent document. Two transforms
/// must never share a context.
#[derive(Debug, Clone)]
pub struct NormalizeContext {
    name_counts: HashMap<String, usize>,
    icon_max_size: f64,
    stats: NormalizeStats,
}

impl Default for NormalizeContext {
    fn default() -> Self {
        Self::new()
    }
}

impl NormalizeContext {
    pub fn new() -> Self {
        Self {
            name_counts: HashMap::new(),
            icon_max_size: DEFAULT_ICON_MAX_SIZE,
            stats: NormalizeStats::default(),
        }
    }

    pub fn with_icon_max_size(mut self, size: f64) -> Self {
        self.icon_max_size = size;
        self
    }

    pub fn stats(&self) -> NormalizeStats {
        self.stats
    }

    /// Forget every name seen so far and zero the stats.
    pub fn reset(&mut self) {
        self.name_counts.clear();
        self.stats = NormalizeStats::default();
    }

    /// Clean `name` into an identifier and disambiguate it against every
    /// name handed out by this context.
    ///
    /// Only ASCII letters and digits are kept. An empty result becomes
    /// `Component`, and a leading digit gets `Component` prepended. The first
    /// occurrence is returned as is, later ones get a two-digit suffix:
    /// `Button`, `Button_01`, `Button_02`. Cleaned names never contain `_`,
    /// so a suffixed name cannot collide with a literal one.
    pub fn unique_name(&mut self, name: &str) -> String {
        let base = clean_name(name);
        let seen = self.name_counts.entry(base.clone()).or_insert(0);
        let n = *seen;
        *seen += 1;

        if n == 0 {
            base
        } else {
            format!("{base}_{n:02}")
        }
    }

    fn is_icon_candidate(&self, bounds: Option<Bounds>) -> bool {
        bounds.is_some_and(|b| {
            b.width > 0.0
                && b.height > 0.0
                && b.width <= self.icon_max_size
                && b.height <= self.icon_max_size
        })
    }
}

fn clean_name(name: &str) -> String {
    let cleaned: String = name.chars().filter(char::is_ascii_alphanumeric).collect();
    match cleaned.chars().next() {
        None => FALLBACK_NAME.to_string(),
        Some(first) if first.is_ascii_digit() => format!("{FALLBACK_NAME}{cleaned}"),
        Some(_) => cleaned,
    }
}

/// Normalize a raw node into zero or more normalized nodes.
///
/// Hidden nodes yield nothing, groups yield their normalized children in
/// order, any other node yields one node with its subtree normalized.
pub fn normalize<'a>(raw: &'a RawNode, ctx: &mut NormalizeContext) -> Vec<NormalizedNode<'a>> {
    normalize_under(raw, None, ctx)
}

fn normalize_under<'a>(
    raw: &'a RawNode,
    parent: Option<&'a RawNode>,
    ctx: &mut NormalizeContext,
) -> Vec<NormalizedNode<'a>> {
    if !raw.visible {
        ctx.stats.hidden_skipped += 1;
        debug!(id = %raw.id, name = %raw.name, "skipping hidden node");
        return Vec::new();
    }

    if raw.node_type == RawNodeType::Group {
        ctx.stats.groups_inlined += 1;
        debug!(id = %raw.id, children = raw.children.len(), "inlining group");
        return raw
            .children
            .iter()
            .flat_map(|child| normalize_under(child, parent, ctx))
            .collect();
    }

    vec![build_node(raw, parent, ctx)]
}

/// Normalize the root of a document.
///
/// Returns `None` when the root is hidden. A root group has no parent to
/// splice its children into, so it is kept as a container.
pub fn normalize_root<'a>(
    raw: &'a RawNode,
    ctx: &mut NormalizeContext,
) -> Option<NormalizedNode<'a>> {
    if !raw.visible {
        ctx.stats.hidden_skipped += 1;
        debug!(id = %raw.id, "document root is hidden");
        return None;
    }

    Some(build_node(raw, None, ctx))
}

/// Normalize a document with a fresh context.
pub fn transform(raw: &RawNode) -> Option<NormalizedNode<'_>> {
    normalize_root(raw, &mut NormalizeContext::new())
}

fn build_node<'a>(
    raw: &'a RawNode,
    parent: Option<&'a RawNode>,
    ctx: &mut NormalizeContext,
) -> NormalizedNode<'a> {
    let output_type = OutputType::for_raw(&raw.node_type);
    let unique_name = ctx.unique_name(&raw.name);
    let is_icon =
        output_type == OutputType::Svg && ctx.is_icon_candidate(raw.absolute_bounding_box);

    ctx.stats.nodes += 1;
    if is_icon {
        ctx.stats.icons += 1;
    }

    let styles = extract_styles(raw, parent);
    let children = raw
        .children
        .iter()
        .flat_map(|child| normalize_under(child, Some(raw), ctx))
        .collect();

    NormalizedNode {
        id: raw.id.clone(),
        name: raw.name.clone(),
        unique_name,
        output_type,
        raw_type: raw.node_type.clone(),
        visible: true,
        is_icon,
        styles,
        children,
        raw,
    }
}
