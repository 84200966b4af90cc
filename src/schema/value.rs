use std::collections::BTreeMap;
use std::collections::HashMap;

use serde::Deserialize;
use serde::Serialize;

use super::Path;

/// A single typed attribute value stored at a leaf of the tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Int(i64),
    UInt(u64),
    Double(f64),
    Bool(bool),
    String(String),
    Bytes(Vec<u8>),
    /// Enumerated hardware states (e.g. "HW_STATE_PRESENT")
    Enum(String),
}

/// A batch of attribute writes, keyed by fully indexed leaf path.
pub type AttributeValueMap = HashMap<Path, Value>;

/// One node of an extracted value tree.
///
/// Groups are keyed maps, repeated groups are lists, attributes are leaves.
/// Equality is structural: `BTreeMap` keeps group comparison independent of
/// the order fields were inserted in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SnapshotNode {
    Group(BTreeMap<String, SnapshotNode>),
    List(Vec<SnapshotNode>),
    Leaf(Value),
}

impl SnapshotNode {
    /// An empty group node.
    pub fn empty_group() -> Self {
        SnapshotNode::Group(BTreeMap::new())
    }

    pub fn group(children: impl IntoIterator<Item = (String, SnapshotNode)>) -> Self {
        SnapshotNode::Group(children.into_iter().collect())
    }
}

/// A point-in-time value tree restricted to one query's registered paths.
///
/// Snapshots are what subscribers receive; deep equality over snapshots is
/// how the engine decides whether an observed subtree changed between polls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    root: SnapshotNode,
}

impl Snapshot {
    pub fn new(root: SnapshotNode) -> Self {
        Snapshot { root }
    }

    pub fn empty() -> Self {
        Snapshot {
            root: SnapshotNode::empty_group(),
        }
    }

    pub fn root(&self) -> &SnapshotNode {
        &self.root
    }

    /// Navigate to the leaf value at `path`, if present.
    ///
    /// Only fully indexed paths resolve to a leaf; `all` entries address a
    /// list, not a single value.
    pub fn leaf(
        &self,
        path: &Path,
    ) -> Option<&Value> {
        let mut node = &self.root;
        for entry in path.entries() {
            let child = match node {
                SnapshotNode::Group(children) => children.get(&entry.name)?,
                _ => return None,
            };
            node = match entry.index {
                Some(index) => match child {
                    SnapshotNode::List(elements) => elements.get(index)?,
                    _ => return None,
                },
                None => child,
            };
        }
        match node {
            SnapshotNode::Leaf(value) => Some(value),
            _ => None,
        }
    }
}
