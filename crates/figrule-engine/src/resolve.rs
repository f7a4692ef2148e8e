//! Priority and conflict resolution for one node.

use std::collections::{BTreeMap, BTreeSet};

use figrule_rules::{Framework, Rule};
use tracing::trace;

use crate::result::{Conflict, ConflictThresholds, EvaluationResult};

struct Override {
    property: String,
    overridden: String,
    overriding: String,
}

/// Merge the properties of `matched` rules for `framework`.
///
/// Rules are applied in ascending `(priority, id)` order and a later rule
/// overrides what an earlier one set. Every override is recorded; its
/// severity depends on how many distinct rules contributed that property over
/// the whole run, and overrides below the moderate threshold are dropped.
/// Rules without a transformer for `framework` (or its fallback) are still
/// listed in `applied_rules` but contribute nothing.
pub fn resolve(
    node_id: &str,
    matched: &[&Rule],
    framework: Framework,
    thresholds: &ConflictThresholds,
) -> EvaluationResult {
    let mut ordered = matched.to_vec();
    ordered.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.id.cmp(&b.id)));

    let mut result = EvaluationResult::new(node_id, framework);
    let mut contributors: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    let mut overrides = Vec::new();

    for rule in ordered {
        result.applied_rules.push(rule.id.clone());
        let Some(transformer) = rule.transformer_for(framework) else {
            trace!(rule = %rule.id, %framework, "no transformer for framework");
            continue;
        };

        for (property, value) in transformer.iter() {
            contributors
                .entry(property.as_str())
                .or_default()
                .insert(rule.id.as_str());

            if let Some(previous) = result.provenance.insert(property.clone(), rule.id.clone()) {
                if previous != rule.id {
                    overrides.push(Override {
                        property: property.clone(),
                        overridden: previous,
                        overriding: rule.id.clone(),
                    });
                }
            }
            result.properties.insert(property.clone(), value.clone());
        }
    }

    result.conflicts = overrides
        .into_iter()
        .filter_map(|o| {
            let count = contributors.get(o.property.as_str()).map_or(0, BTreeSet::len);
            thresholds.classify(count).map(|severity| Conflict {
                property: o.property,
                overridden: o.overridden,
                overriding: o.overriding,
                severity,
            })
        })
        .collect();

    result
}
