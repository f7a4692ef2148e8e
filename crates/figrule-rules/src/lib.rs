//! figrule Rules
//!
//! Declarative mapping rules: which nodes a rule applies to (its
//! [`Selector`]) and which output properties it contributes per target
//! framework (its [`Transformer`]s). Rules come in three priority tiers,
//! official, community and custom, each owning a disjoint priority band.
//!
//! Custom rules are user-authored and untrusted. Loading validates every rule
//! on its own and rejects bad ones without failing the batch, and selectors
//! with unusable name patterns simply never match.

pub mod framework;
pub mod load;
pub mod rule;
pub mod selector;

pub use framework::{Framework, UnknownFramework};
pub use load::{load_rules, parse_rule, Rejected, RuleLoad};
pub use rule::{Rule, Tier, Transformer, TAG_PROPERTY};
pub use selector::{matches, NamePattern, Range, Selector};

/// Rule loading or validation error.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RuleError {
    #[error("invalid rule JSON: {0}")]
    Json(String),

    #[error("rule document must be a JSON array of rules")]
    NotAnArray,

    #[error("rule has an empty id")]
    MissingId,

    #[error("rule '{id}' has an empty name")]
    MissingName { id: String },

    #[error("rule '{id}': priority {priority} is outside the {tier} band {min}..={max}")]
    PriorityOutOfBand {
        id: String,
        tier: Tier,
        priority: u32,
        min: u32,
        max: u32,
    },

    #[error("rule '{id}' defines no framework transformers")]
    NoTransformers { id: String },

    #[error("custom rule '{id}' must select on at least one field")]
    EmptySelector { id: String },

    #[error("rule '{id}': htmlTag for {framework} must be a non-empty string")]
    InvalidTag { id: String, framework: Framework },

    #[error("duplicate rule id '{id}'")]
    DuplicateId { id: String },
}
