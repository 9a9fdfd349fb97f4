//! The dynamic value tree templates render against.
//!
//! A [`ValueNode`] is one addressable point in the hierarchy. Its role is
//! decided by the first access that disambiguates it: navigating by name
//! turns an unset node into a map, navigating by index turns it into a list,
//! and assigning a value makes it a scalar. After that, accessing it with the
//! other shape is a [`FormworkError::ShapeConflict`].
//!
//! ```rust
//! use formwork_render::ValueNode;
//! use serde_json::json;
//!
//! let mut root = ValueNode::new();
//! root.child_mut("persons")?.element_mut(1)?.child_mut("surname")?.set(json!("Paolo"));
//!
//! assert_eq!(
//!     root.to_json(),
//!     json!({"persons": [null, {"surname": "Paolo"}]}),
//! );
//! # Ok::<(), formwork_render::FormworkError>(())
//! ```

use std::collections::BTreeMap;

use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

use crate::error::{FormworkError, Result};

/// The role a node currently plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRole {
    Unset,
    Map,
    List,
    Scalar,
}

impl NodeRole {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeRole::Unset => "unset node",
            NodeRole::Map => "map",
            NodeRole::List => "list",
            NodeRole::Scalar => "scalar",
        }
    }
}

/// One node of the value tree.
///
/// Exactly one payload is present at a time, and it always matches the
/// variant. Maps keep their keys sorted so rendered output is stable.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ValueNode {
    /// A placeholder created by navigation or list padding.
    #[default]
    Unset,
    Map(BTreeMap<String, ValueNode>),
    List(Vec<ValueNode>),
    Scalar(serde_json::Value),
}

impl ValueNode {
    /// Creates an unset root node.
    pub fn new() -> Self {
        ValueNode::Unset
    }

    /// Materializes a JSON value as nodes.
    ///
    /// Objects become maps and arrays become lists, so that later path
    /// assignments can extend structured values loaded from a config file.
    pub fn from_json(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Object(map) => ValueNode::Map(
                map.into_iter()
                    .map(|(key, value)| (key, ValueNode::from_json(value)))
                    .collect(),
            ),
            serde_json::Value::Array(items) => {
                ValueNode::List(items.into_iter().map(ValueNode::from_json).collect())
            }
            scalar => ValueNode::Scalar(scalar),
        }
    }

    pub fn role(&self) -> NodeRole {
        match self {
            ValueNode::Unset => NodeRole::Unset,
            ValueNode::Map(_) => NodeRole::Map,
            ValueNode::List(_) => NodeRole::List,
            ValueNode::Scalar(_) => NodeRole::Scalar,
        }
    }

    pub fn is_unset(&self) -> bool {
        matches!(self, ValueNode::Unset)
    }

    /// Returns the named child, creating it (and fixing this node as a map)
    /// when absent.
    ///
    /// Repeated calls with the same name return the same node.
    pub fn child_mut(&mut self, name: &str) -> Result<&mut ValueNode> {
        if self.is_unset() {
            *self = ValueNode::Map(BTreeMap::new());
        }
        match self {
            ValueNode::Map(children) => Ok(children.entry(name.to_string()).or_default()),
            other => Err(shape_conflict(name, NodeRole::Map, other.role())),
        }
    }

    /// Returns the element at `index`, padding the list with unset nodes up
    /// to and including `index` (and fixing this node as a list).
    pub fn element_mut(&mut self, index: usize) -> Result<&mut ValueNode> {
        let items = self.as_list_mut(index)?;
        if items.len() <= index {
            items.resize_with(index + 1, ValueNode::default);
        }
        Ok(&mut items[index])
    }

    /// Appends a new unset element and returns it.
    pub fn push_mut(&mut self) -> Result<&mut ValueNode> {
        let items = self.as_list_mut("[]")?;
        items.push(ValueNode::Unset);
        let last = items.len() - 1;
        Ok(&mut items[last])
    }

    /// Turns this node into a scalar holding `value`, discarding whatever it
    /// held before.
    ///
    /// Structured values are materialized through [`ValueNode::from_json`].
    pub fn set(&mut self, value: serde_json::Value) {
        *self = ValueNode::from_json(value);
    }

    /// Looks up a named child without creating it.
    pub fn get(&self, name: &str) -> Option<&ValueNode> {
        match self {
            ValueNode::Map(children) => children.get(name),
            _ => None,
        }
    }

    /// Looks up a list element without padding.
    pub fn get_index(&self, index: usize) -> Option<&ValueNode> {
        match self {
            ValueNode::List(items) => items.get(index),
            _ => None,
        }
    }

    pub fn as_scalar(&self) -> Option<&serde_json::Value> {
        match self {
            ValueNode::Scalar(value) => Some(value),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ValueNode::Map(children) => children.len(),
            ValueNode::List(items) => items.len(),
            ValueNode::Scalar(_) | ValueNode::Unset => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Converts the tree to plain JSON. Unset nodes become `null`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            ValueNode::Unset => serde_json::Value::Null,
            ValueNode::Scalar(value) => value.clone(),
            ValueNode::List(items) => {
                serde_json::Value::Array(items.iter().map(ValueNode::to_json).collect())
            }
            ValueNode::Map(children) => serde_json::Value::Object(
                children
                    .iter()
                    .map(|(key, child)| (key.clone(), child.to_json()))
                    .collect(),
            ),
        }
    }

    fn as_list_mut(&mut self, access: impl ToString) -> Result<&mut Vec<ValueNode>> {
        if self.is_unset() {
            *self = ValueNode::List(Vec::new());
        }
        match self {
            ValueNode::List(items) => Ok(items),
            other => Err(shape_conflict(access, NodeRole::List, other.role())),
        }
    }
}

fn shape_conflict(access: impl ToString, expected: NodeRole, found: NodeRole) -> FormworkError {
    FormworkError::ShapeConflict {
        path: access.to_string(),
        expected: expected.as_str(),
        found: found.as_str(),
    }
}

impl Serialize for ValueNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            ValueNode::Unset => serializer.serialize_unit(),
            ValueNode::Scalar(value) => value.serialize(serializer),
            ValueNode::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            ValueNode::Map(children) => {
                let mut map = serializer.serialize_map(Some(children.len()))?;
                for (key, child) in children {
                    map.serialize_entry(key, child)?;
                }
                map.end()
            }
        }
    }
}
