//! Rule schema model.
//!
//! A rule is written as a JSON-Schema-like document over three attribute
//! namespaces. For attribute extraction only the *shape* of the document
//! matters: which properties nest, and which properties are constrained
//! through a combinator (`anyOf`, `allOf`, `oneOf`, `not`). [`SchemaNode`]
//! captures exactly that shape and nothing more.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// Namespace
// ============================================================================

/// One of the three attribute namespaces a rule can reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Namespace {
    /// The requester.
    Subject,
    /// The resource being accessed.
    Object,
    /// Contextual conditions (time, location, ...).
    Environment,
}

impl Namespace {
    /// All namespaces, in classification precedence order.
    pub const ALL: [Namespace; 3] = [Self::Subject, Self::Object, Self::Environment];

    /// The key used for this namespace in schemas and request documents.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Subject => "subject",
            Self::Object => "object",
            Self::Environment => "environment",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when text does not name a [`Namespace`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown attribute namespace: {0:?}")]
pub struct UnknownNamespace(pub String);

impl FromStr for Namespace {
    type Err = UnknownNamespace;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "subject" => Ok(Self::Subject),
            "object" => Ok(Self::Object),
            "environment" => Ok(Self::Environment),
            other => Err(UnknownNamespace(other.to_string())),
        }
    }
}

// ============================================================================
// SchemaNode
// ============================================================================

/// The structural shape of a schema node.
///
/// Combinator variants hold alternative descriptions of the *same*
/// attribute, so they never add a path segment of their own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaNode {
    /// A concrete constraint (type, enum, range, ...) with no further nesting.
    Leaf,
    /// Named children, in declaration order.
    Properties(Vec<(String, SchemaNode)>),
    /// At least one branch must hold.
    AnyOf(Vec<SchemaNode>),
    /// Every branch must hold.
    AllOf(Vec<SchemaNode>),
    /// Exactly one branch must hold.
    OneOf(Vec<SchemaNode>),
    /// No branch may hold.
    Not(Vec<SchemaNode>),
}

impl SchemaNode {
    /// Reads the shape of a schema document.
    ///
    /// Never fails. Keywords are checked in the order `properties`, `anyOf`,
    /// `allOf`, `oneOf`, `not`; the first one with a usable value decides the
    /// variant. A keyword whose value has the wrong JSON type is ignored, and
    /// anything left over is a [`SchemaNode::Leaf`].
    pub fn parse(value: &Value) -> Self {
        let Some(map) = value.as_object() else {
            return Self::Leaf;
        };

        if let Some(Value::Object(properties)) = map.get("properties") {
            return Self::Properties(
                properties
                    .iter()
                    .map(|(key, child)| (key.clone(), Self::parse(child)))
                    .collect(),
            );
        }

        if let Some(branches) = map.get("anyOf").and_then(Value::as_array) {
            return Self::AnyOf(parse_all(branches));
        }
        if let Some(branches) = map.get("allOf").and_then(Value::as_array) {
            return Self::AllOf(parse_all(branches));
        }
        if let Some(branches) = map.get("oneOf").and_then(Value::as_array) {
            return Self::OneOf(parse_all(branches));
        }

        match map.get("not") {
            Some(Value::Array(branches)) => Self::Not(parse_all(branches)),
            Some(single @ Value::Object(_)) => Self::Not(vec![Self::parse(single)]),
            _ => Self::Leaf,
        }
    }

    /// Returns `true` for a leaf constraint.
    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::Leaf)
    }

    /// Returns the combinator branches of this node, or `None` for leaves and
    /// property containers.
    pub fn branches(&self) -> Option<&[SchemaNode]> {
        match self {
            Self::AnyOf(b) | Self::AllOf(b) | Self::OneOf(b) | Self::Not(b) => Some(b),
            Self::Leaf | Self::Properties(_) => None,
        }
    }
}

fn parse_all(branches: &[Value]) -> Vec<SchemaNode> {
    branches.iter().map(SchemaNode::parse).collect()
}

// ============================================================================
// Tests
// ============================================================================
