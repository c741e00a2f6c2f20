//! Typed entitlement tree with dot-path lookup

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::GatewayError;

use super::entity::{ResourceEntitlement, ResourcePath};

/// One node of an entitlement tree
///
/// Untagged on the wire: an object carrying `access`/`quota`/`rpm` is a
/// leaf, any other object is a branch of named children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Node {
    Leaf(ResourceEntitlement),
    Branch(HashMap<String, Node>),
}

/// Nested mapping of resource paths to [`ResourceEntitlement`] leaves
///
/// A resource path with no leaf in the tree is always "no entitlement"
/// (denied), never an implicit allow.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntitlementTree {
    root: HashMap<String, Node>,
}

impl EntitlementTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up the leaf addressed by `path`.
    ///
    /// Returns `None` when any segment is missing, when an intermediate
    /// segment is a leaf, or when the final segment is a branch. The
    /// distinction between "not found" and "found but `access=false`" is the
    /// caller's to make.
    pub fn lookup(&self, path: &ResourcePath) -> Option<&ResourceEntitlement> {
        let mut segments = path.segments().peekable();
        let mut current = &self.root;

        loop {
            let segment = segments.next()?;
            let node = current.get(segment)?;

            match (node, segments.peek()) {
                (Node::Leaf(entitlement), None) => return Some(entitlement),
                (Node::Branch(children), Some(_)) => current = children,
                _ => return None,
            }
        }
    }

    /// Inserts a leaf at `path`, creating intermediate branches as needed.
    ///
    /// Fails when an intermediate segment is already occupied by a leaf.
    pub fn insert(
        &mut self,
        path: &ResourcePath,
        entitlement: ResourceEntitlement,
    ) -> Result<(), GatewayError> {
        let segments: Vec<&str> = path.segments().collect();
        let (last, intermediate) = segments
            .split_last()
            .ok_or_else(|| GatewayError::validation("Resource path must not be empty"))?;

        let mut current = &mut self.root;

        for segment in intermediate {
            let node = current
                .entry((*segment).to_string())
                .or_insert_with(|| Node::Branch(HashMap::new()));

            match node {
                Node::Branch(children) => current = children,
                Node::Leaf(_) => {
                    return Err(GatewayError::validation(format!(
                        "Segment '{}' of '{}' is already a leaf",
                        segment, path
                    )));
                }
            }
        }

        current.insert((*last).to_string(), Node::Leaf(entitlement));
        Ok(())
    }

    /// Builder-style insert for fixtures and tests.
    pub fn with(mut self, path: &str, entitlement: ResourceEntitlement) -> Self {
        let path = ResourcePath::new(path).expect("valid resource path");
        self.insert(&path, entitlement).expect("consistent tree");
        self
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }
}
