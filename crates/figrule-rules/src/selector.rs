//! Selector matching against normalized nodes.
//!
//! A selector is a conjunction of optional criteria. Absent fields match
//! anything; a specified field the node has no data for does not match.

use std::fmt;

use figrule_tree::NormalizedNode;
use regex::{Regex, RegexBuilder};
use serde::de::{self, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Upper bound on compiled pattern size for user-authored name patterns.
const PATTERN_SIZE_LIMIT: usize = 1 << 20;

// ============================================================================
// Range
// ============================================================================

/// Inclusive numeric range. Either end may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Range {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl Range {
    pub fn new(min: Option<f64>, max: Option<f64>) -> Self {
        Self { min, max }
    }

    pub fn at_least(min: f64) -> Self {
        Self::new(Some(min), None)
    }

    pub fn at_most(max: f64) -> Self {
        Self::new(None, Some(max))
    }

    pub fn between(min: f64, max: f64) -> Self {
        Self::new(Some(min), Some(max))
    }

    pub fn contains(&self, value: f64) -> bool {
        self.min.map_or(true, |min| value >= min) && self.max.map_or(true, |max| value <= max)
    }
}

// ============================================================================
// Name patterns
// ============================================================================

/// Name criterion: exact display-name equality or a regular expression.
///
/// Patterns are compiled when the rule is loaded. A pattern that fails to
/// compile is kept as [`NamePattern::Invalid`] and never matches.
#[derive(Debug, Clone)]
pub enum NamePattern {
    Exact(String),
    Pattern(Regex),
    Invalid(String),
}

impl NamePattern {
    pub fn exact(name: impl Into<String>) -> Self {
        Self::Exact(name.into())
    }

    /// Compile `source` as a regular expression, falling back to
    /// [`NamePattern::Invalid`].
    pub fn pattern(source: &str) -> Self {
        match RegexBuilder::new(source).size_limit(PATTERN_SIZE_LIMIT).build() {
            Ok(re) => Self::Pattern(re),
            Err(e) => {
                warn!(pattern = source, error = %e, "invalid name pattern; selector will never match");
                Self::Invalid(source.to_string())
            }
        }
    }

    /// Interpret a selector string. `/body/` and `/body/flags` are patterns
    /// (flags `i`, `m`, `s` are honoured; `g`, `u`, `y` are accepted and
    /// ignored). Anything else, including strings with unknown flags, is an
    /// exact name.
    pub fn parse(text: &str) -> Self {
        match split_slash_pattern(text) {
            Some((body, flags)) => {
                let inline: String = flags.chars().filter(|c| matches!(*c, 'i' | 'm' | 's')).collect();
                if inline.is_empty() {
                    Self::pattern(body)
                } else {
                    Self::pattern(&format!("(?{inline}){body}"))
                }
            }
            None => Self::Exact(text.to_string()),
        }
    }

    pub fn is_match(&self, name: &str) -> bool {
        match self {
            Self::Exact(expected) => expected == name,
            Self::Pattern(re) => re.is_match(name),
            Self::Invalid(_) => false,
        }
    }

    pub fn source(&self) -> &str {
        match self {
            Self::Exact(s) | Self::Invalid(s) => s.as_str(),
            Self::Pattern(re) => re.as_str(),
        }
    }

    pub fn is_valid(&self) -> bool {
        !matches!(self, Self::Invalid(_))
    }
}

fn split_slash_pattern(text: &str) -> Option<(&str, &str)> {
    let rest = text.strip_prefix('/')?;
    let close = rest.rfind('/')?;
    let (body, flags) = (&rest[..close], &rest[close + 1..]);
    if body.is_empty() || !flags.chars().all(|c| "gimsuy".contains(c)) {
        return None;
    }
    Some((body, flags))
}

impl PartialEq for NamePattern {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Exact(a), Self::Exact(b)) => a == b,
            (Self::Pattern(a), Self::Pattern(b)) => a.as_str() == b.as_str(),
            (Self::Invalid(a), Self::Invalid(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for NamePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(s) => f.write_str(s),
            Self::Pattern(re) => write!(f, "/{}/", re.as_str()),
            Self::Invalid(s) => write!(f, "/{s}/ (invalid)"),
        }
    }
}

impl Serialize for NamePattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Exact(s) => serializer.serialize_str(s),
            Self::Pattern(_) | Self::Invalid(_) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("pattern", self.source())?;
                map.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for NamePattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Text(String),
            Object { pattern: String },
        }

        match Repr::deserialize(deserializer) {
            Ok(Repr::Text(text)) => Ok(Self::parse(&text)),
            Ok(Repr::Object { pattern }) => Ok(Self::pattern(&pattern)),
            Err(_) => Err(de::Error::custom(
                "name must be a string or an object with a `pattern` string",
            )),
        }
    }
}

// ============================================================================
// Selector
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selector {
    /// Output tag the node must have (`div`, `span`, `svg`, `img`).
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub node_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<NamePattern>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<Range>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<Range>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_children: Option<bool>,
    /// Output tag the parent must have. Never matches a root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_type: Option<String>,
}

impl Selector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_type(mut self, tag: impl Into<String>) -> Self {
        self.node_type = Some(tag.into());
        self
    }

    pub fn with_name(mut self, name: NamePattern) -> Self {
        self.name = Some(name);
        self
    }

    pub fn with_width(mut self, range: Range) -> Self {
        self.width = Some(range);
        self
    }

    pub fn with_height(mut self, range: Range) -> Self {
        self.height = Some(range);
        self
    }

    pub fn with_children(mut self, has_children: bool) -> Self {
        self.has_children = Some(has_children);
        self
    }

    pub fn with_parent_type(mut self, tag: impl Into<String>) -> Self {
        self.parent_type = Some(tag.into());
        self
    }

    /// True when no criterion is specified, i.e. the selector matches every node.
    pub fn is_empty(&self) -> bool {
        self.node_type.is_none()
            && self.name.is_none()
            && self.width.is_none()
            && self.height.is_none()
            && self.has_children.is_none()
            && self.parent_type.is_none()
    }

    pub fn matches(&self, node: &NormalizedNode<'_>, parent: Option<&NormalizedNode<'_>>) -> bool {
        self.node_type
            .as_deref()
            .map_or(true, |tag| node.output_type.as_str() == tag)
            && self.name.as_ref().map_or(true, |name| name.is_match(&node.name))
            && self
                .width
                .map_or(true, |range| node.bounds().is_some_and(|b| range.contains(b.width)))
            && self
                .height
                .map_or(true, |range| node.bounds().is_some_and(|b| range.contains(b.height)))
            && self
                .has_children
                .map_or(true, |expected| node.has_children() == expected)
            && self.parent_type.as_deref().map_or(true, |tag| {
                parent.is_some_and(|p| p.output_type.as_str() == tag)
            })
    }
}

/// See [`Selector::matches`].
pub fn matches(
    node: &NormalizedNode<'_>,
    parent: Option<&NormalizedNode<'_>>,
    selector: &Selector,
) -> bool {
    selector.matches(node, parent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use figrule_tree::{transform, RawNode, RawNodeType};
    use pretty_assertions::assert_eq;

    fn tree() -> RawNode {
        RawNode::new("1:1", "Card", RawNodeType::Frame)
            .with_size(320.0, 200.0)
            .with_children(vec![
                RawNode::new("2:1", "Button", RawNodeType::Frame)
                    .with_size(120.0, 40.0)
                    .with_children(vec![RawNode::new("3:1", "Label", RawNodeType::Text)]),
                RawNode::new("2:2", "Icon", RawNodeType::Vector).with_size(24.0, 24.0),
            ])
    }

    // ========================================================================
    // Field criteria
    // ========================================================================

    #[test]
    fn test_empty_selector_matches_everything() {
        let raw = tree();
        let root = transform(&raw).unwrap();
        let selector = Selector::new();
        assert!(selector.is_empty());
        assert!(root.descendants().all(|n| selector.matches(n, None)));
    }

    #[test]
    fn test_type_matches_output_tag() {
        let raw = tree();
        let root = transform(&raw).unwrap();
        let icon = root.find("2:2").unwrap();
        assert!(Selector::new().with_type("svg").matches(icon, Some(&root)));
        assert!(!Selector::new().with_type("VECTOR").matches(icon, Some(&root)));
        assert!(!Selector::new().with_type("div").matches(icon, Some(&root)));
    }

    #[test]
    fn test_exact_name() {
        let raw = tree();
        let root = transform(&raw).unwrap();
        let button = root.find("2:1").unwrap();
        assert!(Selector::new().with_name(NamePattern::exact("Button")).matches(button, Some(&root)));
        assert!(!Selector::new().with_name(NamePattern::exact("button")).matches(button, Some(&root)));
    }

    #[test]
    fn test_pattern_name() {
        let raw = tree();
        let root = transform(&raw).unwrap();
        let button = root.find("2:1").unwrap();
        let selector = Selector::new().with_name(NamePattern::parse("/^btn|button$/i"));
        assert!(selector.matches(button, Some(&root)));
        assert!(!selector.matches(&root, None));
    }

    #[test]
    fn test_size_ranges_are_inclusive() {
        let raw = tree();
        let root = transform(&raw).unwrap();
        let icon = root.find("2:2").unwrap();
        assert!(Selector::new().with_width(Range::between(24.0, 24.0)).matches(icon, None));
        assert!(Selector::new().with_height(Range::at_most(24.0)).matches(icon, None));
        assert!(!Selector::new().with_width(Range::at_least(25.0)).matches(icon, None));
    }

    #[test]
    fn test_size_without_bounds_fails() {
        let raw = tree();
        let root = transform(&raw).unwrap();
        let label = root.find("3:1").unwrap();
        assert!(label.bounds().is_none());
        assert!(!Selector::new().with_width(Range::at_least(0.0)).matches(label, None));
    }

    #[test]
    fn test_has_children() {
        let raw = tree();
        let root = transform(&raw).unwrap();
        let button = root.find("2:1").unwrap();
        let icon = root.find("2:2").unwrap();
        assert!(Selector::new().with_children(true).matches(button, None));
        assert!(!Selector::new().with_children(true).matches(icon, None));
        assert!(Selector::new().with_children(false).matches(icon, None));
    }

    #[test]
    fn test_parent_type() {
        let raw = tree();
        let root = transform(&raw).unwrap();
        let button = root.find("2:1").unwrap();
        let label = root.find("3:1").unwrap();
        let selector = Selector::new().with_parent_type("div");
        assert!(selector.matches(label, Some(button)));
        assert!(!Selector::new().with_parent_type("svg").matches(label, Some(button)));
    }

    #[test]
    fn test_parent_type_without_parent_fails() {
        let raw = tree();
        let root = transform(&raw).unwrap();
        assert!(!Selector::new().with_parent_type("div").matches(&root, None));
    }

    // ========================================================================
    // Conjunction
    // ========================================================================

    #[test]
    fn test_all_fields_must_hold() {
        let raw = tree();
        let root = transform(&raw).unwrap();
        let button = root.find("2:1").unwrap();
        let both = Selector::new()
            .with_type("div")
            .with_name(NamePattern::exact("Button"));
        let wrong_type = Selector::new()
            .with_type("span")
            .with_name(NamePattern::exact("Button"));
        let wrong_name = Selector::new()
            .with_type("div")
            .with_name(NamePattern::exact("Card"));
        assert!(both.matches(button, Some(&root)));
        assert!(!wrong_type.matches(button, Some(&root)));
        assert!(!wrong_name.matches(button, Some(&root)));
        assert!(matches(button, Some(&root), &both));
    }

    #[test]
    fn test_type_and_width_must_both_hold() {
        let raw = RawNode::new("1:1", "Row", RawNodeType::Frame).with_children(vec![
            RawNode::new("2:1", "Wide", RawNodeType::Frame).with_size(150.0, 10.0),
            RawNode::new("2:2", "Narrow", RawNodeType::Frame).with_size(50.0, 10.0),
            RawNode::new("2:3", "WideIcon", RawNodeType::Vector).with_size(150.0, 10.0),
        ]);
        let root = transform(&raw).unwrap();
        let selector = Selector::new()
            .with_type("div")
            .with_width(Range::at_least(100.0));

        let matched: Vec<bool> = ["2:1", "2:2", "2:3"]
            .iter()
            .map(|id| selector.matches(root.find(id).unwrap(), Some(&root)))
            .collect();
        assert_eq!(matched, vec![true, false, false]);
    }

    // ========================================================================
    // Name pattern parsing
    // ========================================================================

    #[test]
    fn test_parse_plain_string_is_exact() {
        assert_eq!(NamePattern::parse("Button"), NamePattern::exact("Button"));
        assert_eq!(NamePattern::parse("/"), NamePattern::exact("/"));
        assert_eq!(NamePattern::parse("//"), NamePattern::exact("//"));
    }

    #[test]
    fn test_parse_path_like_name_is_exact() {
        // "to" is not a flag set.
        assert_eq!(NamePattern::parse("/path/to"), NamePattern::exact("/path/to"));
    }

    #[test]
    fn test_parse_case_insensitive_flag() {
        let pattern = NamePattern::parse("/^icon/i");
        assert!(pattern.is_match("ICON-close"));
        assert!(!pattern.is_match("close-icon"));
    }

    #[test]
    fn test_invalid_pattern_never_matches() {
        let pattern = NamePattern::parse("/([a-z/");
        assert!(!pattern.is_valid());
        assert!(!pattern.is_match("anything"));
        assert!(!pattern.is_match("([a-z"));
    }

    #[test]
    fn test_invalid_pattern_selector_fails_closed() {
        let raw = tree();
        let root = transform(&raw).unwrap();
        let selector = Selector::new().with_name(NamePattern::pattern("(unclosed"));
        assert!(root.descendants().all(|n| !selector.matches(n, None)));
    }

    // ========================================================================
    // Serde
    // ========================================================================

    #[test]
    fn test_deserialize_selector() {
        let selector: Selector = serde_json::from_value(serde_json::json!({
            "type": "div",
            "name": { "pattern": "^Nav" },
            "width": { "min": 100 },
            "hasChildren": true,
            "parentType": "div"
        }))
        .unwrap();
        assert_eq!(selector.node_type.as_deref(), Some("div"));
        assert_eq!(selector.name, Some(NamePattern::pattern("^Nav")));
        assert_eq!(selector.width, Some(Range::at_least(100.0)));
        assert_eq!(selector.height, None);
        assert_eq!(selector.has_children, Some(true));
    }

    #[test]
    fn test_deserialize_rejects_non_string_name() {
        let result = serde_json::from_value::<Selector>(serde_json::json!({ "name": 42 }));
        assert!(result.is_err());
    }

    #[test]
    fn test_serialize_skips_absent_fields() {
        let selector = Selector::new()
            .with_type("span")
            .with_name(NamePattern::pattern("^Title"));
        assert_eq!(
            serde_json::to_value(&selector).unwrap(),
            serde_json::json!({ "type": "span", "name": { "pattern": "^Title" } })
        );
    }
}
