//! figrule Tree
//!
//! Ingests a raw design document (a tree of frames, groups, text and vector
//! nodes) and normalizes it into the semantic tree the rule engine works on.
//! Hidden nodes are dropped, groups are inlined into their parents, raw type
//! tags are mapped to output element types and every node gets a
//! disambiguated name and its extracted CSS styles.
//!
//! ```text
//! JSON → parse_document() → RawNode → normalize_root() → NormalizedNode
//! ```
//!
//! # Example
//!
//! ```
//! use figrule_tree::{parse_document, NormalizeContext, normalize_root};
//!
//! let raw = parse_document(r#"{"id": "1:1", "name": "Button", "type": "FRAME"}"#).unwrap();
//! let mut ctx = NormalizeContext::new();
//! let node = normalize_root(&raw, &mut ctx).unwrap();
//! assert_eq!(node.unique_name, "Button");
//! assert_eq!(node.output_type.as_str(), "div");
//! ```

pub mod node;
pub mod normalize;
pub mod raw;
pub mod style;

pub use node::{Descendants, NormalizedNode, OutputType};
pub use normalize::{
    normalize, normalize_root, transform, NormalizeContext, NormalizeStats, DEFAULT_ICON_MAX_SIZE,
    FALLBACK_NAME,
};
pub use raw::{Bounds, RawNode, RawNodeType};
pub use style::{extract_styles, Styles};

/// Error raised while ingesting a raw design document.
///
/// Only problems that leave nothing to normalize are reported this way
/// (unparseable JSON, a root that is not a node). Malformed descendants are
/// repaired or skipped during ingestion instead.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Tree error at {path}: {message}")]
pub struct TreeError {
    pub message: String,
    pub path: String,
}

impl TreeError {
    pub fn new(message: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: path.into(),
        }
    }
}

/// Parse a design document from JSON.
///
/// Accepts either a bare node object or a design-API file response that wraps
/// the root node in a `document` field.
pub fn parse_document(json: &str) -> Result<RawNode, TreeError> {
    let value: serde_json::Value =
        serde_json::from_str(json).map_err(|e| TreeError::new(format!("invalid JSON: {e}"), "$"))?;

    match value.get("document") {
        Some(document) if value.get("type").is_none() => RawNode::from_value(document),
        _ => RawNode::from_value(&value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_node() {
        let raw = parse_document(r#"{"id": "1:1", "name": "Root", "type": "FRAME"}"#).unwrap();
        assert_eq!(raw.id, "1:1");
        assert_eq!(raw.node_type, RawNodeType::Frame);
    }

    #[test]
    fn test_parse_document_wrapper() {
        let raw = parse_document(
            r#"{"name": "File", "document": {"id": "0:0", "name": "Page", "type": "SECTION"}}"#,
        )
        .unwrap();
        assert_eq!(raw.id, "0:0");
        assert_eq!(raw.node_type, RawNodeType::Section);
    }

    #[test]
    fn test_parse_invalid_json() {
        let err = parse_document("{not json").unwrap_err();
        assert_eq!(err.path, "$");
        assert!(err.message.starts_with("invalid JSON"));
    }

    #[test]
    fn test_parse_non_object_root() {
        let err = parse_document("[1, 2, 3]").unwrap_err();
        assert!(err.to_string().contains("not a JSON object"));
    }
}
