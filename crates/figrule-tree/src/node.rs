//! Normalized semantic tree.

use serde::Serialize;
use serde_json::Value;

use crate::raw::{Bounds, RawNode, RawNodeType};
use crate::style::Styles;

/// Output element type a code emitter renders a node as.
///
/// Has no group variant: groups are inlined during normalization and never
/// reach the output tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum OutputType {
    /// Generic container (`div`).
    #[serde(rename = "div")]
    Container,
    /// Text run (`span`).
    #[serde(rename = "span")]
    Text,
    /// Vector artwork rendered as an SVG container.
    #[serde(rename = "svg")]
    Svg,
    /// Bitmap image.
    #[serde(rename = "img")]
    Image,
}

impl OutputType {
    /// Map a raw type tag to its output type. Unknown tags fall back to a
    /// container.
    pub fn for_raw(raw: &RawNodeType) -> Self {
        match raw {
            RawNodeType::Text => Self::Text,
            RawNodeType::Vector | RawNodeType::BooleanOperation => Self::Svg,
            RawNodeType::Image => Self::Image,
            RawNodeType::Frame
            | RawNodeType::Group
            | RawNodeType::Rectangle
            | RawNodeType::Ellipse
            | RawNodeType::Line
            | RawNodeType::Star
            | RawNodeType::Polygon
            | RawNodeType::Component
            | RawNodeType::ComponentSet
            | RawNodeType::Instance
            | RawNodeType::Section
            | RawNodeType::Other(_) => Self::Container,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Container => "div",
            Self::Text => "span",
            Self::Svg => "svg",
            Self::Image => "img",
        }
    }
}

/// A node of the normalized tree.
///
/// Borrows the raw node it was built from, so the normalized tree can never
/// outlive the document it describes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedNode<'a> {
    pub id: String,
    pub name: String,
    /// Name disambiguated across the whole transform (`Button`, `Button_01`).
    pub unique_name: String,
    #[serde(rename = "type")]
    pub output_type: OutputType,
    pub raw_type: RawNodeType,
    pub visible: bool,
    pub is_icon: bool,
    /// CSS properties extracted from layout, paint, effects and text.
    pub styles: Styles,
    pub children: Vec<NormalizedNode<'a>>,
    #[serde(skip)]
    pub raw: &'a RawNode,
}

impl<'a> NormalizedNode<'a> {
    pub fn bounds(&self) -> Option<Bounds> {
        self.raw.absolute_bounding_box
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// Raw attribute of the source node that normalization does not retain.
    pub fn raw_attribute(&self, key: &str) -> Option<&'a Value> {
        self.raw.attribute(key)
    }

    /// Find a node by id in this subtree.
    pub fn find(&self, id: &str) -> Option<&NormalizedNode<'a>> {
        self.descendants().find(|node| node.id == id)
    }

    /// Find a node by id together with its parent in this subtree.
    ///
    /// The parent is `None` only when `id` names `self`.
    pub fn find_with_parent(
        &self,
        id: &str,
    ) -> Option<(&NormalizedNode<'a>, Option<&NormalizedNode<'a>>)> {
        if self.id == id {
            return Some((self, None));
        }
        self.descendants().find_map(|parent| {
            parent
                .children
                .iter()
                .find(|child| child.id == id)
                .map(|child| (child, Some(parent)))
        })
    }

    /// Pre-order iterator over this node and all of its descendants.
    pub fn descendants(&self) -> Descendants<'_, 'a> {
        Descendants { stack: vec![self] }
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn count(&self) -> usize {
        self.descendants().count()
    }
}

/// Pre-order traversal, see [`NormalizedNode::descendants`].
pub struct Descendants<'n, 'a> {
    stack: Vec<&'n NormalizedNode<'a>>,
}

impl<'n, 'a> Iterator for Descendants<'n, 'a> {
    type Item = &'n NormalizedNode<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}
