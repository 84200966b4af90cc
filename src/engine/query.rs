use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::executor::TaskExecutor;
use crate::schema::AttributeTree;
use crate::schema::Path;
use crate::schema::QueryId;
use crate::schema::Snapshot;
use crate::Result;

static NEXT_QUERY_ID: AtomicU64 = AtomicU64::new(1);

pub(crate) fn next_query_id() -> QueryId {
    NEXT_QUERY_ID.fetch_add(1, Ordering::Relaxed)
}

/// One caller-visible binding of a path set to the schema tree.
///
/// The path set is immutable after construction. The `updated` flag carries
/// "this query's observed subtree changed since the last delivery" between
/// the polling and flushing phases, and can also be forced from outside the
/// poll cycle (new subscriber, hardware event).
pub(crate) struct Query {
    id: QueryId,
    paths: Vec<Path>,
    tree: Arc<dyn AttributeTree>,
    executor: Arc<dyn TaskExecutor>,
    updated: AtomicBool,
}

impl Query {
    pub(crate) fn new(
        id: QueryId,
        paths: Vec<Path>,
        tree: Arc<dyn AttributeTree>,
        executor: Arc<dyn TaskExecutor>,
    ) -> Self {
        Query {
            id,
            paths,
            tree,
            executor,
            updated: AtomicBool::new(false),
        }
    }

    pub(crate) fn id(&self) -> QueryId {
        self.id
    }

    pub(crate) fn paths(&self) -> &[Path] {
        &self.paths
    }

    /// Extract the current value tree restricted to this query's paths.
    /// Pure read; never mutates cached state.
    pub(crate) fn get(&self) -> Result<Snapshot> {
        self.tree.extract(self.id, self.executor.clone())
    }

    pub(crate) fn is_updated(&self) -> bool {
        self.updated.load(Ordering::Acquire)
    }

    pub(crate) fn mark_updated(&self) {
        self.updated.store(true, Ordering::Release);
    }

    pub(crate) fn clear_updated(&self) {
        self.updated.store(false, Ordering::Release);
    }
}
