//! Evaluation output: merged properties, provenance and conflicts.

use std::collections::BTreeMap;

use figrule_rules::{Framework, TAG_PROPERTY};
use serde::Serialize;
use serde_json::Value;

// ============================================================================
// Severity thresholds
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Moderate,
    Severe,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ThresholdError {
    #[error("moderate threshold must be at least 2 contributors, got {0}")]
    ModerateTooLow(usize),

    #[error("severe threshold {severe_at} is below the moderate threshold {moderate_at}")]
    SevereBelowModerate { moderate_at: usize, severe_at: usize },
}

/// Maps the number of distinct rules contributing a property to a conflict
/// severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConflictThresholds {
    moderate_at: usize,
    severe_at: usize,
}

impl ConflictThresholds {
    pub fn new(moderate_at: usize, severe_at: usize) -> Result<Self, ThresholdError> {
        if moderate_at < 2 {
            return Err(ThresholdError::ModerateTooLow(moderate_at));
        }
        if severe_at < moderate_at {
            return Err(ThresholdError::SevereBelowModerate {
                moderate_at,
                severe_at,
            });
        }
        Ok(Self {
            moderate_at,
            severe_at,
        })
    }

    pub fn moderate_at(&self) -> usize {
        self.moderate_at
    }

    pub fn severe_at(&self) -> usize {
        self.severe_at
    }

    /// `None` when the property is not contested enough to report.
    pub fn classify(&self, contributors: usize) -> Option<Severity> {
        if contributors >= self.severe_at {
            Some(Severity::Severe)
        } else if contributors >= self.moderate_at {
            Some(Severity::Moderate)
        } else {
            None
        }
    }
}

impl Default for ConflictThresholds {
    fn default() -> Self {
        Self {
            moderate_at: 2,
            severe_at: 3,
        }
    }
}

// ============================================================================
// Result
// ============================================================================

/// One override of a property by a higher-priority rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Conflict {
    pub property: String,
    /// Rule that lost the property.
    pub overridden: String,
    /// Rule that took it over.
    pub overriding: String,
    pub severity: Severity,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResult {
    pub node_id: String,
    pub framework: Framework,
    pub properties: BTreeMap<String, Value>,
    /// Property name to the id of the rule that supplied the final value.
    pub provenance: BTreeMap<String, String>,
    /// In the order the overrides happened.
    pub conflicts: Vec<Conflict>,
    /// Ids of matched rules in application order.
    pub applied_rules: Vec<String>,
}

impl EvaluationResult {
    pub fn new(node_id: impl Into<String>, framework: Framework) -> Self {
        Self {
            node_id: node_id.into(),
            framework,
            properties: BTreeMap::new(),
            provenance: BTreeMap::new(),
            conflicts: Vec::new(),
            applied_rules: Vec::new(),
        }
    }

    pub fn get(&self, property: &str) -> Option<&Value> {
        self.properties.get(property)
    }

    /// Output-tag override, if any rule supplied one.
    pub fn tag(&self) -> Option<&str> {
        self.get(TAG_PROPERTY).and_then(Value::as_str)
    }

    pub fn source_of(&self, property: &str) -> Option<&str> {
        self.provenance.get(property).map(String::as_str)
    }

    pub fn conflicts_for<'s>(&'s self, property: &'s str) -> impl Iterator<Item = &'s Conflict> {
        self.conflicts.iter().filter(move |c| c.property == property)
    }

    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_thresholds() {
        let t = ConflictThresholds::default();
        assert_eq!(t.classify(1), None);
        assert_eq!(t.classify(2), Some(Severity::Moderate));
        assert_eq!(t.classify(3), Some(Severity::Severe));
        assert_eq!(t.classify(7), Some(Severity::Severe));
    }

    #[test]
    fn test_custom_thresholds() {
        let t = ConflictThresholds::new(3, 5).unwrap();
        assert_eq!(t.classify(2), None);
        assert_eq!(t.classify(4), Some(Severity::Moderate));
        assert_eq!(t.classify(5), Some(Severity::Severe));
    }

    #[test]
    fn test_equal_thresholds_skip_moderate() {
        let t = ConflictThresholds::new(2, 2).unwrap();
        assert_eq!(t.classify(2), Some(Severity::Severe));
    }

    #[test]
    fn test_invalid_thresholds() {
        assert_eq!(
            ConflictThresholds::new(1, 3),
            Err(ThresholdError::ModerateTooLow(1))
        );
        assert_eq!(
            ConflictThresholds::new(4, 3),
            Err(ThresholdError::SevereBelowModerate {
                moderate_at: 4,
                severe_at: 3
            })
        );
    }

    #[test]
    fn test_serialize_result() {
        let mut result = EvaluationResult::new("1:1", Framework::HtmlCss);
        result.properties.insert("display".into(), Value::from("flex"));
        result.provenance.insert("display".into(), "r1".into());
        result.applied_rules.push("r1".into());
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            serde_json::json!({
                "nodeId": "1:1",
                "framework": "html-css",
                "properties": { "display": "flex" },
                "provenance": { "display": "r1" },
                "conflicts": [],
                "appliedRules": ["r1"]
            })
        );
    }
}
