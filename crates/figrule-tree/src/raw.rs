//! Raw design document nodes.
//!
//! `RawNode` mirrors the shape the design API returns. Only the attributes the
//! normalizer needs are typed; everything else is kept verbatim in `extra` so
//! rules can still reach raw-only data through the normalized node's
//! back-reference.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::TreeError;

/// Display name given to nodes that arrive without one.
pub const DEFAULT_NAME: &str = "Unnamed";

/// Keys lifted into typed fields; anything else lands in `RawNode::extra`.
const TYPED_KEYS: &[&str] = &[
    "id",
    "name",
    "type",
    "visible",
    "locked",
    "absoluteBoundingBox",
    "children",
];

/// Design API node type tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RawNodeType {
    Frame,
    Group,
    Text,
    Vector,
    Rectangle,
    Ellipse,
    Line,
    Star,
    Polygon,
    BooleanOperation,
    Image,
    Component,
    ComponentSet,
    Instance,
    Section,
    /// Any tag outside the known vocabulary, kept as written.
    Other(String),
}

impl RawNodeType {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "FRAME" => Self::Frame,
            "GROUP" => Self::Group,
            "TEXT" => Self::Text,
            "VECTOR" => Self::Vector,
            "RECTANGLE" => Self::Rectangle,
            "ELLIPSE" => Self::Ellipse,
            "LINE" => Self::Line,
            "STAR" => Self::Star,
            "REGULAR_POLYGON" | "POLYGON" => Self::Polygon,
            "BOOLEAN_OPERATION" => Self::BooleanOperation,
            "IMAGE" => Self::Image,
            "COMPONENT" => Self::Component,
            "COMPONENT_SET" => Self::ComponentSet,
            "INSTANCE" => Self::Instance,
            "SECTION" => Self::Section,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Frame => "FRAME",
            Self::Group => "GROUP",
            Self::Text => "TEXT",
            Self::Vector => "VECTOR",
            Self::Rectangle => "RECTANGLE",
            Self::Ellipse => "ELLIPSE",
            Self::Line => "LINE",
            Self::Star => "STAR",
            Self::Polygon => "POLYGON",
            Self::BooleanOperation => "BOOLEAN_OPERATION",
            Self::Image => "IMAGE",
            Self::Component => "COMPONENT",
            Self::ComponentSet => "COMPONENT_SET",
            Self::Instance => "INSTANCE",
            Self::Section => "SECTION",
            Self::Other(tag) => tag,
        }
    }
}

impl From<String> for RawNodeType {
    fn from(tag: String) -> Self {
        Self::from_tag(&tag)
    }
}

impl From<RawNodeType> for String {
    fn from(ty: RawNodeType) -> Self {
        ty.as_str().to_string()
    }
}

impl fmt::Display for RawNodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Absolute bounding box in layout units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// A node of the raw design document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawNode {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: RawNodeType,
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(default)]
    pub locked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub absolute_bounding_box: Option<Bounds>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<RawNode>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_visible() -> bool {
    true
}

impl RawNode {
    pub fn new(id: impl Into<String>, name: impl Into<String>, node_type: RawNodeType) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            node_type,
            visible: true,
            locked: false,
            absolute_bounding_box: None,
            children: Vec::new(),
            extra: Map::new(),
        }
    }

    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.absolute_bounding_box = Some(Bounds::new(0.0, 0.0, width, height));
        self
    }

    pub fn with_children(mut self, children: Vec<RawNode>) -> Self {
        self.children = children;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Raw attribute not lifted into a typed field (`layoutMode`, `fills`, ...).
    ///
    /// Fields of the `style` object (text metrics such as `fontWeight`) are
    /// flattened onto the node and take precedence over a top-level key of
    /// the same name.
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.extra
            .get("style")
            .and_then(|style| style.get(key))
            .or_else(|| self.extra.get(key))
    }

    /// Build a node tree from loosely-shaped JSON.
    ///
    /// Missing or mistyped fields are defaulted and children that are not
    /// objects are skipped, so one bad subtree never blocks the rest of the
    /// document. Fails only when the root itself is not an object.
    pub fn from_value(value: &Value) -> Result<Self, TreeError> {
        match value {
            Value::Object(obj) => Ok(Self::from_object(obj, &mut Vec::new())),
            _ => Err(TreeError::new("root node is not a JSON object", "$")),
        }
    }

    fn from_object(obj: &Map<String, Value>, path: &mut Vec<usize>) -> Self {
        let id = match obj.get("id").and_then(Value::as_str) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => {
                let fallback = positional_id(path);
                warn!(id = %fallback, "node has no id, using positional id");
                fallback
            }
        };

        let name = match obj.get("name").and_then(Value::as_str) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => {
                warn!(%id, "node has no name, defaulting to {}", DEFAULT_NAME);
                DEFAULT_NAME.to_string()
            }
        };

        let node_type = match obj.get("type").and_then(Value::as_str) {
            Some(tag) => RawNodeType::from_tag(tag),
            None => {
                warn!(%id, "node has no type tag");
                RawNodeType::Other("UNKNOWN".to_string())
            }
        };

        let absolute_bounding_box = obj.get("absoluteBoundingBox").and_then(|b| {
            let bounds = bounds_from_value(b);
            if bounds.is_none() && !b.is_null() {
                warn!(%id, "ignoring malformed bounding box");
            }
            bounds
        });

        let mut children = Vec::new();
        match obj.get("children") {
            Some(Value::Array(items)) => {
                for (index, item) in items.iter().enumerate() {
                    match item {
                        Value::Object(child) => {
                            path.push(index);
                            children.push(Self::from_object(child, path));
                            path.pop();
                        }
                        _ => warn!(parent = %id, index, "skipping malformed child"),
                    }
                }
            }
            None | Some(Value::Null) => {}
            Some(_) => warn!(%id, "children is not an array, ignoring"),
        }

        let extra = obj
            .iter()
            .filter(|(key, _)| !TYPED_KEYS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        Self {
            id,
            name,
            node_type,
            visible: obj.get("visible").and_then(Value::as_bool).unwrap_or(true),
            locked: obj.get("locked").and_then(Value::as_bool).unwrap_or(false),
            absolute_bounding_box,
            children,
            extra,
        }
    }
}

fn bounds_from_value(value: &Value) -> Option<Bounds> {
    let coord = |key: &str| value.get(key).and_then(Value::as_f64);
    Some(Bounds {
        x: coord("x").unwrap_or(0.0),
        y: coord("y").unwrap_or(0.0),
        width: coord("width")?,
        height: coord("height")?,
    })
}

fn positional_id(path: &[usize]) -> String {
    if path.is_empty() {
        return "anon:root".to_string();
    }
    let segments: Vec<String> = path.iter().map(|i| i.to_string()).collect();
    format!("anon:{}", segments.join("/"))
}
