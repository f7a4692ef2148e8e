//! Rule ingestion.
//!
//! A rule document is a JSON array. Each entry is parsed and validated on its
//! own; a bad entry is rejected and reported without affecting the others.

use std::collections::HashSet;

use serde_json::Value;
use tracing::{debug, warn};

use crate::rule::Rule;
use crate::RuleError;

/// Outcome of loading a rule document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleLoad {
    /// Accepted rules, in document order.
    pub rules: Vec<Rule>,
    pub rejected: Vec<Rejected>,
}

impl RuleLoad {
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// A rule entry that failed to parse or validate.
#[derive(Debug, Clone, PartialEq)]
pub struct Rejected {
    /// Position in the source array.
    pub index: usize,
    pub id: Option<String>,
    pub error: RuleError,
}

pub fn load_rules(json: &str) -> Result<RuleLoad, RuleError> {
    let value: Value = serde_json::from_str(json).map_err(|e| RuleError::Json(e.to_string()))?;
    let Value::Array(entries) = value else {
        return Err(RuleError::NotAnArray);
    };

    let mut load = RuleLoad::default();
    let mut seen = HashSet::new();

    for (index, entry) in entries.into_iter().enumerate() {
        let id = entry
            .get("id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .map(str::to_string);

        let accepted = parse_rule(entry).and_then(|rule| {
            if seen.insert(rule.id.clone()) {
                Ok(rule)
            } else {
                Err(RuleError::DuplicateId { id: rule.id })
            }
        });

        match accepted {
            Ok(rule) => {
                debug!(id = %rule.id, tier = %rule.tier, priority = rule.priority, "loaded rule");
                load.rules.push(rule);
            }
            Err(error) => {
                warn!(index, id = id.as_deref().unwrap_or("<none>"), %error, "rejected rule");
                load.rejected.push(Rejected { index, id, error });
            }
        }
    }

    Ok(load)
}

/// Parse and validate a single rule value.
pub fn parse_rule(value: Value) -> Result<Rule, RuleError> {
    let rule: Rule = serde_json::from_value(value).map_err(|e| RuleError::Json(e.to_string()))?;
    rule.validate()?;
    Ok(rule)
}
