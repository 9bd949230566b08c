use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub mod error;
pub mod geometry;
pub mod settings;

pub use error::TreeError;
pub use geometry::{
    Circle, FixableCircle, GeometryError, Rect, ReferenceShape, Vector, GEOMETRY_EPSILON,
};
pub use settings::LayoutSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(non_camel_case_types)]
#[repr(i32)]
pub enum NodeKind {
    PACKAGE,
    CLASS,
    INTERFACE,
}

/// Error type for enum conversion failures
#[derive(Error, Debug, Clone)]
pub enum EnumConversionError {
    #[error("Invalid NodeKind value: {0}")]
    InvalidNodeKind(i32),
}

impl TryFrom<i32> for NodeKind {
    type Error = EnumConversionError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(NodeKind::PACKAGE),
            1 => Ok(NodeKind::CLASS),
            2 => Ok(NodeKind::INTERFACE),
            _ => Err(EnumConversionError::InvalidNodeKind(value)),
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::PACKAGE => write!(f, "package"),
            NodeKind::CLASS => write!(f, "class"),
            NodeKind::INTERFACE => write!(f, "interface"),
        }
    }
}

/// Build descriptor for one node of the containment tree.
///
/// `full_name` is the globally unique key (e.g. `"com.example.MyClass"`),
/// `name` the display label drawn inside the circle. Children are given in
/// draw order; that order is stable and determines level assignment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeData {
    pub full_name: String,
    pub name: String,
    pub kind: NodeKind,
    #[serde(default)]
    pub children: Vec<NodeData>,
}

impl NodeData {
    pub fn new(full_name: &str, name: &str, kind: NodeKind) -> Self {
        Self {
            full_name: full_name.to_string(),
            name: name.to_string(),
            kind,
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<NodeData>) -> Self {
        self.children = children;
        self
    }

    /// Number of nodes in this subtree, the descriptor itself included.
    pub fn node_count(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(NodeData::node_count)
            .sum::<usize>()
    }
}
