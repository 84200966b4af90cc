//! In-memory attribute tree.
//!
//! A reference [`AttributeTree`] backed by a plain value tree under a single
//! `RwLock`. Used by tests and by embedders that have no real hardware
//! backend; a production tree would wire leaves to platform data sources and
//! lock per subtree instead.

use std::collections::HashMap;
use std::mem::discriminant;
use std::sync::Arc;

use parking_lot::Mutex;
use parking_lot::RwLock;

use super::AttributeTree;
use super::AttributeValueMap;
use super::Path;
use super::PathEntry;
use super::QueryId;
use super::SchemaDescriptor;
use super::Snapshot;
use super::SnapshotNode;
use super::Value;
use crate::executor::Task;
use crate::executor::TaskExecutor;
use crate::QueryError;
use crate::Result;

pub struct MemAttributeTree {
    descriptor: SchemaDescriptor,
    root: RwLock<SnapshotNode>,
    registered: Mutex<HashMap<QueryId, Vec<Path>>>,
}

impl MemAttributeTree {
    /// Build a tree with the given schema type and initial value tree.
    pub fn new(
        descriptor: SchemaDescriptor,
        root: SnapshotNode,
    ) -> Self {
        MemAttributeTree {
            descriptor,
            root: RwLock::new(root),
            registered: Mutex::new(HashMap::new()),
        }
    }

    fn validate(
        node: &SnapshotNode,
        entries: &[PathEntry],
    ) -> bool {
        let Some(entry) = entries.first() else {
            return true;
        };
        let rest = &entries[1..];

        let SnapshotNode::Group(children) = node else {
            return false;
        };
        let Some(child) = children.get(&entry.name) else {
            return false;
        };

        if entry.all {
            match child {
                SnapshotNode::List(elements) => elements.iter().all(|e| Self::validate(e, rest)),
                _ => false,
            }
        } else if let Some(index) = entry.index {
            match child {
                SnapshotNode::List(elements) => match elements.get(index) {
                    Some(element) => Self::validate(element, rest),
                    None => false,
                },
                _ => false,
            }
        } else {
            Self::validate(child, rest)
        }
    }

    /// Copy the subtree addressed by `entries` out of `src` into `dst`,
    /// preserving group/list positions so snapshots from different paths of
    /// the same query merge into one tree.
    fn copy_path(
        src: &SnapshotNode,
        dst: &mut SnapshotNode,
        entries: &[PathEntry],
    ) -> std::result::Result<(), QueryError> {
        let Some(entry) = entries.first() else {
            *dst = src.clone();
            return Ok(());
        };
        let rest = &entries[1..];

        let SnapshotNode::Group(src_children) = src else {
            return Err(QueryError::ReadError(format!("expected a group at '{}'", entry.name)));
        };
        let SnapshotNode::Group(dst_children) = dst else {
            return Err(QueryError::ReadError(format!("expected a group at '{}'", entry.name)));
        };
        let Some(src_child) = src_children.get(&entry.name) else {
            return Err(QueryError::ReadError(format!("missing attribute '{}'", entry.name)));
        };

        if entry.all || entry.index.is_some() {
            let SnapshotNode::List(src_elements) = src_child else {
                return Err(QueryError::ReadError(format!("'{}' is not a repeated group", entry.name)));
            };
            let dst_child = dst_children
                .entry(entry.name.clone())
                .or_insert_with(|| SnapshotNode::List(Vec::new()));
            let SnapshotNode::List(dst_elements) = dst_child else {
                return Err(QueryError::ReadError(format!("'{}' is not a repeated group", entry.name)));
            };
            while dst_elements.len() < src_elements.len() {
                dst_elements.push(SnapshotNode::empty_group());
            }

            if entry.all {
                for (s, d) in src_elements.iter().zip(dst_elements.iter_mut()) {
                    if rest.is_empty() {
                        *d = s.clone();
                    } else {
                        Self::copy_path(s, d, rest)?;
                    }
                }
            } else {
                let index = entry.index.unwrap_or_default();
                let Some(s) = src_elements.get(index) else {
                    return Err(QueryError::ReadError(format!("index {} out of range in '{}'", index, entry.name)));
                };
                let d = &mut dst_elements[index];
                if rest.is_empty() {
                    *d = s.clone();
                } else {
                    Self::copy_path(s, d, rest)?;
                }
            }
        } else if rest.is_empty() {
            dst_children.insert(entry.name.clone(), src_child.clone());
        } else {
            let dst_child = dst_children
                .entry(entry.name.clone())
                .or_insert_with(SnapshotNode::empty_group);
            Self::copy_path(src_child, dst_child, rest)?;
        }
        Ok(())
    }

    fn write_leaf(
        &self,
        path: &Path,
        value: Value,
    ) -> std::result::Result<(), QueryError> {
        let mut root = self.root.write();
        let mut node = &mut *root;
        for entry in path.entries() {
            if entry.all {
                // Writes must address a single attribute.
                return Err(QueryError::InvalidPath(path.clone()));
            }
            let child = match node {
                SnapshotNode::Group(children) => children
                    .get_mut(&entry.name)
                    .ok_or_else(|| QueryError::InvalidPath(path.clone()))?,
                _ => return Err(QueryError::InvalidPath(path.clone())),
            };
            node = match entry.index {
                Some(index) => match child {
                    SnapshotNode::List(elements) => elements
                        .get_mut(index)
                        .ok_or_else(|| QueryError::InvalidPath(path.clone()))?,
                    _ => return Err(QueryError::InvalidPath(path.clone())),
                },
                None => child,
            };
        }
        match node {
            SnapshotNode::Leaf(existing) if discriminant(existing) == discriminant(&value) => {
                *existing = value;
                Ok(())
            }
            SnapshotNode::Leaf(_) => Err(QueryError::ReadError(format!("attribute type mismatch at {}", path))),
            _ => Err(QueryError::InvalidPath(path.clone())),
        }
    }
}

impl AttributeTree for MemAttributeTree {
    fn descriptor(&self) -> SchemaDescriptor {
        self.descriptor
    }

    fn register_query(
        &self,
        query_id: QueryId,
        paths: &[Path],
    ) -> Result<()> {
        let root = self.root.read();
        for path in paths {
            if path.is_empty() || !Self::validate(&root, path.entries()) {
                return Err(QueryError::InvalidPath(path.clone()).into());
            }
        }
        self.registered.lock().insert(query_id, paths.to_vec());
        Ok(())
    }

    fn unregister_query(
        &self,
        query_id: QueryId,
    ) {
        self.registered.lock().remove(&query_id);
    }

    fn extract(
        &self,
        query_id: QueryId,
        _executor: Arc<dyn TaskExecutor>,
    ) -> Result<Snapshot> {
        // In-memory reads are cheap; no task dispatch needed.
        let paths = self
            .registered
            .lock()
            .get(&query_id)
            .cloned()
            .ok_or_else(|| QueryError::ReadError(format!("query {} is not registered", query_id)))?;

        let root = self.root.read();
        let mut result = SnapshotNode::empty_group();
        for path in &paths {
            Self::copy_path(&root, &mut result, path.entries())?;
        }
        Ok(Snapshot::new(result))
    }

    fn set(
        &self,
        values: AttributeValueMap,
        executor: Arc<dyn TaskExecutor>,
    ) -> Result<()> {
        let failures: Mutex<Vec<QueryError>> = Mutex::new(Vec::new());
        let mut tasks: Vec<Task<'_>> = Vec::with_capacity(values.len());
        for (path, value) in values {
            let failures = &failures;
            tasks.push(Box::new(move || {
                if let Err(e) = self.write_leaf(&path, value) {
                    failures.lock().push(e);
                }
            }));
        }
        executor.run_all(tasks);

        match failures.into_inner().into_iter().next() {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }
}
