//! Rule model and validation.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::framework::Framework;
use crate::selector::Selector;
use crate::RuleError;

/// Property name under which a transformer's output-tag override is merged.
pub const TAG_PROPERTY: &str = "htmlTag";

// ============================================================================
// Tiers
// ============================================================================

/// Rule source tier. Each tier owns a disjoint priority band, so a custom
/// rule always outranks a community rule, which outranks an official one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Official,
    Community,
    Custom,
}

impl Tier {
    pub fn band(self) -> RangeInclusive<u32> {
        match self {
            Self::Official => 0..=74,
            Self::Community => 75..=99,
            Self::Custom => 100..=u32::MAX,
        }
    }

    pub fn default_priority(self) -> u32 {
        match self {
            Self::Official => 50,
            Self::Community => 75,
            Self::Custom => 100,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Official => "official",
            Self::Community => "community",
            Self::Custom => "custom",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Transformer
// ============================================================================

/// Output properties a rule contributes for one framework.
///
/// Flat map of property name to value. The optional output-tag override lives
/// under [`TAG_PROPERTY`] and merges like any other property.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transformer {
    pub properties: BTreeMap<String, Value>,
}

impl Transformer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tag(self, tag: impl Into<String>) -> Self {
        self.with_property(TAG_PROPERTY, Value::String(tag.into()))
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    pub fn tag(&self) -> Option<&str> {
        self.properties.get(TAG_PROPERTY).and_then(Value::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.properties.iter()
    }

    fn has_valid_tag(&self) -> bool {
        match self.properties.get(TAG_PROPERTY) {
            None => true,
            Some(Value::String(tag)) => !tag.trim().is_empty(),
            Some(_) => false,
        }
    }
}

// ============================================================================
// Rule
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub tier: Tier,
    pub priority: u32,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    #[serde(default)]
    pub selector: Selector,
    #[serde(default)]
    pub transformers: BTreeMap<Framework, Transformer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

fn enabled_by_default() -> bool {
    true
}

impl Rule {
    /// Enabled rule at the tier's default priority with an empty selector and
    /// no transformers.
    pub fn new(id: impl Into<String>, name: impl Into<String>, tier: Tier) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            tier,
            priority: tier.default_priority(),
            enabled: true,
            selector: Selector::default(),
            transformers: BTreeMap::new(),
            category: None,
            description: None,
            tags: Vec::new(),
        }
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_selector(mut self, selector: Selector) -> Self {
        self.selector = selector;
        self
    }

    pub fn with_transformer(mut self, framework: Framework, transformer: Transformer) -> Self {
        self.transformers.insert(framework, transformer);
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Transformer for `framework`, or for its fallback framework when the
    /// rule has no entry of its own.
    pub fn transformer_for(&self, framework: Framework) -> Option<&Transformer> {
        self.transformers.get(&framework).or_else(|| {
            framework
                .fallback()
                .and_then(|fallback| self.transformers.get(&fallback))
        })
    }

    pub fn validate(&self) -> Result<(), RuleError> {
        if self.id.trim().is_empty() {
            return Err(RuleError::MissingId);
        }
        if self.name.trim().is_empty() {
            return Err(RuleError::MissingName { id: self.id.clone() });
        }

        let band = self.tier.band();
        if !band.contains(&self.priority) {
            return Err(RuleError::PriorityOutOfBand {
                id: self.id.clone(),
                tier: self.tier,
                priority: self.priority,
                min: *band.start(),
                max: *band.end(),
            });
        }

        if self.transformers.is_empty() {
            return Err(RuleError::NoTransformers { id: self.id.clone() });
        }
        if let Some((framework, _)) = self.transformers.iter().find(|(_, t)| !t.has_valid_tag()) {
            return Err(RuleError::InvalidTag {
                id: self.id.clone(),
                framework: *framework,
            });
        }

        if self.tier == Tier::Custom && self.selector.is_empty() {
            return Err(RuleError::EmptySelector { id: self.id.clone() });
        }
        Ok(())
    }
}
