//! Evaluation entry points: match rules against nodes and resolve them.

use std::collections::BTreeMap;

use figrule_rules::{Framework, Rule};
use figrule_tree::NormalizedNode;
use tracing::{debug, trace};

use crate::resolve::resolve;
use crate::result::{ConflictThresholds, EvaluationResult};
use crate::EngineError;

/// Evaluates nodes against a fixed rule list for one framework.
///
/// Disabled rules are dropped once at construction, so evaluating many nodes
/// never re-filters the list.
#[derive(Debug, Clone)]
pub struct Evaluator<'r> {
    rules: Vec<&'r Rule>,
    framework: Framework,
    thresholds: ConflictThresholds,
}

impl<'r> Evaluator<'r> {
    pub fn new(rules: &'r [Rule], framework: Framework) -> Self {
        let enabled: Vec<&Rule> = rules.iter().filter(|rule| rule.enabled).collect();
        debug!(
            total = rules.len(),
            enabled = enabled.len(),
            %framework,
            "prepared evaluator"
        );
        Self {
            rules: enabled,
            framework,
            thresholds: ConflictThresholds::default(),
        }
    }

    pub fn with_thresholds(mut self, thresholds: ConflictThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn framework(&self) -> Framework {
        self.framework
    }

    /// Number of enabled rules.
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Enabled rules whose selector matches `node`.
    pub fn matching_rules(
        &self,
        node: &NormalizedNode<'_>,
        parent: Option<&NormalizedNode<'_>>,
    ) -> Vec<&'r Rule> {
        self.rules
            .iter()
            .copied()
            .filter(|rule| {
                let hit = rule.selector.matches(node, parent);
                if hit {
                    trace!(rule = %rule.id, node = %node.id, "rule matched");
                }
                hit
            })
            .collect()
    }

    pub fn evaluate_node(
        &self,
        node: &NormalizedNode<'_>,
        parent: Option<&NormalizedNode<'_>>,
    ) -> EvaluationResult {
        let matched = self.matching_rules(node, parent);
        resolve(&node.id, &matched, self.framework, &self.thresholds)
    }

    /// Evaluate every node under `root`, keyed by node id. When two nodes share
    /// an id the later one in pre-order wins.
    pub fn evaluate_tree(&self, root: &NormalizedNode<'_>) -> BTreeMap<String, EvaluationResult> {
        let mut results = BTreeMap::new();
        walk(root, None, &mut |node, parent| {
            results.insert(node.id.clone(), self.evaluate_node(node, parent));
        });
        results
    }

    /// Number of nodes under `root` each enabled rule matches. Rules that match
    /// nothing are reported with a zero count.
    pub fn match_counts(&self, root: &NormalizedNode<'_>) -> BTreeMap<String, usize> {
        let mut counts: BTreeMap<String, usize> =
            self.rules.iter().map(|rule| (rule.id.clone(), 0)).collect();
        walk(root, None, &mut |node, parent| {
            for rule in self.matching_rules(node, parent) {
                *counts.entry(rule.id.clone()).or_default() += 1;
            }
        });
        counts
    }
}

fn walk<'n, 'a>(
    node: &'n NormalizedNode<'a>,
    parent: Option<&'n NormalizedNode<'a>>,
    visit: &mut impl FnMut(&'n NormalizedNode<'a>, Option<&'n NormalizedNode<'a>>),
) {
    visit(node, parent);
    for child in &node.children {
        walk(child, Some(node), visit);
    }
}

/// Evaluate a single node with no parent context. Selectors using
/// `parentType` never match here; use [`Evaluator::evaluate_node`] to supply
/// the parent.
pub fn evaluate_for_framework(
    node: &NormalizedNode<'_>,
    rules: &[Rule],
    framework: &str,
) -> Result<EvaluationResult, EngineError> {
    let framework: Framework = framework.parse()?;
    Ok(Evaluator::new(rules, framework).evaluate_node(node, None))
}

pub fn evaluate_tree(
    root: &NormalizedNode<'_>,
    rules: &[Rule],
    framework: &str,
) -> Result<BTreeMap<String, EvaluationResult>, EngineError> {
    let framework: Framework = framework.parse()?;
    Ok(Evaluator::new(rules, framework).evaluate_tree(root))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::Severity;
    use figrule_rules::{NamePattern, Range, Selector, Tier, Transformer};
    use figrule_tree::{transform, RawNode, RawNodeType};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::time::{Duration, Instant};

    fn page() -> RawNode {
        RawNode::new("1:1", "Page", RawNodeType::Frame).with_children(vec![
            RawNode::new("2:1", "Button", RawNodeType::Frame)
                .with_size(120.0, 40.0)
                .with_children(vec![RawNode::new("3:1", "Label", RawNodeType::Text)]),
            RawNode::new("2:2", "Group", RawNodeType::Group).with_children(vec![
                RawNode::new("3:2", "Close", RawNodeType::Vector).with_size(24.0, 24.0),
            ]),
            RawNode::new("2:3", "Hidden", RawNodeType::Frame).hidden(),
        ])
    }

    fn tailwind(properties: &[(&str, &str)]) -> Transformer {
        properties
            .iter()
            .fold(Transformer::new(), |t, (k, v)| t.with_property(*k, *v))
    }

    fn rules() -> Vec<Rule> {
        vec![
            Rule::new("official-div", "Container", Tier::Official)
                .with_selector(Selector::new().with_type("div"))
                .with_transformer(Framework::ReactTailwind, tailwind(&[("className", "flex")])),
            Rule::new("community-button", "Button", Tier::Community)
                .with_selector(Selector::new().with_name(NamePattern::parse("/button/i")))
                .with_transformer(
                    Framework::ReactTailwind,
                    tailwind(&[("className", "btn"), ("htmlTag", "button")]),
                ),
            Rule::new("custom-label", "Label", Tier::Custom)
                .with_selector(Selector::new().with_type("span").with_parent_type("div"))
                .with_transformer(Framework::HtmlCss, tailwind(&[("fontWeight", "600")])),
            Rule::new("custom-off", "Off", Tier::Custom)
                .with_priority(200)
                .with_selector(Selector::new().with_type("div"))
                .with_transformer(Framework::ReactTailwind, tailwind(&[("className", "never")]))
                .disabled(),
        ]
    }

    // ========================================================================
    // Evaluator
    // ========================================================================

    #[test]
    fn test_disabled_rules_are_dropped_once() {
        let rules = rules();
        let evaluator = Evaluator::new(&rules, Framework::ReactTailwind);
        assert_eq!(evaluator.rule_count(), 3);
    }

    #[test]
    fn test_evaluate_node_merges_matches() {
        let raw = page();
        let root = transform(&raw).unwrap();
        let rules = rules();
        let evaluator = Evaluator::new(&rules, Framework::ReactTailwind);

        let button = root.find("2:1").unwrap();
        let result = evaluator.evaluate_node(button, Some(&root));
        assert_eq!(result.get("className"), Some(&json!("btn")));
        assert_eq!(result.tag(), Some("button"));
        assert_eq!(
            result.applied_rules,
            vec!["official-div".to_string(), "community-button".to_string()]
        );
        assert_eq!(result.conflicts.len(), 1);
        assert_eq!(result.conflicts[0].severity, Severity::Moderate);
    }

    #[test]
    fn test_evaluate_tree_covers_visible_nodes() {
        let raw = page();
        let root = transform(&raw).unwrap();
        let rules = rules();
        let results = Evaluator::new(&rules, Framework::ReactTailwind).evaluate_tree(&root);
        let ids: Vec<&str> = results.keys().map(String::as_str).collect();
        assert_eq!(ids, vec!["1:1", "2:1", "3:1", "3:2"]);
        assert!(results["3:2"].is_empty());
    }

    #[test]
    fn test_parent_is_carried_through_tree() {
        let raw = page();
        let root = transform(&raw).unwrap();
        let rules = rules();
        let results = Evaluator::new(&rules, Framework::HtmlCss).evaluate_tree(&root);
        assert_eq!(results["3:1"].get("fontWeight"), Some(&json!("600")));
        assert_eq!(results["3:1"].source_of("fontWeight"), Some("custom-label"));
    }

    #[test]
    fn test_single_node_with_found_parent_matches_tree() {
        let raw = page();
        let root = transform(&raw).unwrap();
        let rules = rules();
        let evaluator = Evaluator::new(&rules, Framework::HtmlCss);

        let (label, parent) = root.find_with_parent("3:1").unwrap();
        let single = evaluator.evaluate_node(label, parent);
        assert_eq!(single.source_of("fontWeight"), Some("custom-label"));
        assert_eq!(single, evaluator.evaluate_tree(&root)["3:1"]);
    }

    #[test]
    fn test_match_counts() {
        let raw = page();
        let root = transform(&raw).unwrap();
        let rules = rules();
        let counts = Evaluator::new(&rules, Framework::ReactTailwind).match_counts(&root);
        assert_eq!(counts.get("official-div"), Some(&2));
        assert_eq!(counts.get("community-button"), Some(&1));
        assert_eq!(counts.get("custom-label"), Some(&1));
        assert_eq!(counts.get("custom-off"), None);
    }

    #[test]
    fn test_custom_thresholds_apply() {
        let raw = page();
        let root = transform(&raw).unwrap();
        let rules = rules();
        let evaluator = Evaluator::new(&rules, Framework::ReactTailwind)
            .with_thresholds(ConflictThresholds::new(2, 2).unwrap());
        let result = evaluator.evaluate_node(root.find("2:1").unwrap(), Some(&root));
        assert_eq!(result.conflicts[0].severity, Severity::Severe);
    }

    // ========================================================================
    // Free functions
    // ========================================================================

    #[test]
    fn test_evaluate_for_framework() {
        let raw = page();
        let root = transform(&raw).unwrap();
        let result = evaluate_for_framework(&root, &rules(), "react-tailwind-v4").unwrap();
        assert_eq!(result.framework, Framework::ReactTailwindV4);
        assert_eq!(result.get("className"), Some(&json!("flex")));
    }

    #[test]
    fn test_unsupported_framework() {
        let raw = page();
        let root = transform(&raw).unwrap();
        let err = evaluate_tree(&root, &rules(), "flutter").unwrap_err();
        assert_eq!(err.to_string(), "unsupported framework 'flutter'");
        assert!(matches!(err, EngineError::UnsupportedFramework(_)));
    }

    #[test]
    fn test_invalid_pattern_does_not_break_other_rules() {
        let raw = page();
        let root = transform(&raw).unwrap();
        let mut rules = rules();
        rules.push(
            Rule::new("custom-broken", "Broken", Tier::Custom)
                .with_selector(Selector::new().with_name(NamePattern::pattern("([")))
                .with_transformer(Framework::ReactTailwind, tailwind(&[("className", "x")])),
        );
        let results = evaluate_tree(&root, &rules, "react-tailwind").unwrap();
        assert_eq!(results["2:1"].get("className"), Some(&json!("btn")));
        assert!(results
            .values()
            .all(|r| !r.applied_rules.contains(&"custom-broken".to_string())));
    }

    // ========================================================================
    // Performance
    // ========================================================================

    fn wide_tree(nodes: usize) -> RawNode {
        let children = (1..nodes)
            .map(|i| {
                RawNode::new(format!("2:{i}"), format!("Item {}", i % 10), RawNodeType::Frame)
                    .with_size(10.0 * (i % 30) as f64, 20.0)
            })
            .collect();
        RawNode::new("1:1", "Root", RawNodeType::Frame).with_children(children)
    }

    fn many_rules(count: usize) -> Vec<Rule> {
        (0..count)
            .map(|i| {
                Rule::new(format!("custom-{i:02}"), format!("Rule {i}"), Tier::Custom)
                    .with_priority(100 + (i % 7) as u32)
                    .with_selector(
                        Selector::new()
                            .with_type("div")
                            .with_name(NamePattern::parse(&format!("/Item {}/", i % 10)))
                            .with_width(Range::at_least((i % 5) as f64 * 10.0)),
                    )
                    .with_transformer(
                        Framework::ReactTailwind,
                        Transformer::new()
                            .with_property("className", format!("c-{i}"))
                            .with_property(format!("data-{i}"), i as u64),
                    )
            })
            .collect()
    }

    #[test]
    fn test_fifty_rules_hundred_nodes_under_two_seconds() {
        let raw = wide_tree(100);
        let root = transform(&raw).unwrap();
        assert_eq!(root.count(), 100);
        let rules = many_rules(50);

        let start = Instant::now();
        let results = evaluate_tree(&root, &rules, "react-tailwind").unwrap();
        let elapsed = start.elapsed();

        assert_eq!(results.len(), 100);
        assert!(results.values().any(|r| r.has_conflicts()));
        assert!(elapsed < Duration::from_secs(2), "took {elapsed:?}");
    }
}
