//! figrule Engine
//!
//! Matches rules against normalized nodes and merges what they contribute.
//!
//! # Example
//!
//! ```
//! use figrule_engine::evaluate_tree;
//! use figrule_rules::load_rules;
//! use figrule_tree::{parse_document, transform};
//!
//! let raw = parse_document(r#"{"id": "1:1", "name": "Button", "type": "FRAME"}"#).unwrap();
//! let root = transform(&raw).unwrap();
//! let load = load_rules(r#"[{
//!     "id": "button", "name": "Button", "type": "official", "priority": 50,
//!     "selector": {"name": "Button"},
//!     "transformers": {"html-css": {"htmlTag": "button"}}
//! }]"#).unwrap();
//!
//! let results = evaluate_tree(&root, &load.rules, "html-css").unwrap();
//! assert_eq!(results["1:1"].tag(), Some("button"));
//! ```

pub mod evaluate;
pub mod resolve;
pub mod result;

pub use evaluate::{evaluate_for_framework, evaluate_tree, Evaluator};
pub use resolve::resolve;
pub use result::{Conflict, ConflictThresholds, EvaluationResult, Severity, ThresholdError};

use figrule_rules::UnknownFramework;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    UnsupportedFramework(#[from] UnknownFramework),

    #[error("invalid conflict thresholds: {0}")]
    Thresholds(#[from] ThresholdError),
}
