//! Boundary contract consumed from the schema/attribute tree.
//!
//! The tree owns value storage, validation and its own internal locking
//! (multiple readers, exclusive writer per subtree). The engine only
//! registers path sets, extracts snapshots and delegates mutations; it never
//! performs hardware I/O itself.

use std::fmt;
use std::sync::Arc;

#[cfg(test)]
use mockall::automock;

use super::AttributeValueMap;
use super::Path;
use super::Snapshot;
use crate::executor::TaskExecutor;
use crate::Result;

/// Identifies the message type a schema tree stores at its root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaDescriptor(pub &'static str);

impl fmt::Display for SchemaDescriptor {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The schema type every [`AttributeDatabase`](crate::AttributeDatabase)
/// root must carry.
pub const PLATFORM_DB_SCHEMA: SchemaDescriptor = SchemaDescriptor("PlatformDB");

/// Engine-wide query identifier, assigned at `make_query` time.
pub type QueryId = u64;

#[cfg_attr(test, automock)]
pub trait AttributeTree: Send + Sync + 'static {
    /// Schema type stored at the root.
    fn descriptor(&self) -> SchemaDescriptor;

    /// Bind `paths` to `query_id` so later extractions can be restricted to
    /// the registered subtrees. Fails with `QueryError::InvalidPath` if any
    /// path does not resolve against the schema.
    fn register_query(
        &self,
        query_id: QueryId,
        paths: &[Path],
    ) -> Result<()>;

    /// Drop the binding for `query_id`. Unknown ids are ignored.
    fn unregister_query(
        &self,
        query_id: QueryId,
    );

    /// Extract the current value tree restricted to the paths registered for
    /// `query_id`. Attribute reads may go through `executor`; the read may be
    /// arbitrarily slow (hardware I/O) and runs under the tree's own locking,
    /// concurrent with writes.
    fn extract(
        &self,
        query_id: QueryId,
        executor: Arc<dyn TaskExecutor>,
    ) -> Result<Snapshot>;

    /// Apply a batch of attribute writes.
    fn set(
        &self,
        values: AttributeValueMap,
        executor: Arc<dyn TaskExecutor>,
    ) -> Result<()>;
}
