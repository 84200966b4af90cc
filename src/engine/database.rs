//! The attribute database: schema root + executor + query registry +
//! scheduler lifecycle.
//!
//! ## Key Responsibilities
//! - Validates the schema root at construction
//! - Serves attribute writes (`set`) under a dedicated write lock, disjoint
//!   from the polling lock so hardware writes never block on the scheduler
//! - Creates streaming queries and manages their registry
//! - Starts/stops the single background polling scheduler task
//!
//! ## Example Usage
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use attrdb::AttributeDatabase;
//! use attrdb::DatabaseConfig;
//! use attrdb::InlineExecutor;
//! use attrdb::MemAttributeTree;
//! use attrdb::Path;
//! use attrdb::PathEntry;
//! use attrdb::SnapshotNode;
//! use attrdb::PLATFORM_DB_SCHEMA;
//!
//! # #[tokio::main]
//! # async fn main() -> attrdb::Result<()> {
//! let tree = Arc::new(MemAttributeTree::new(PLATFORM_DB_SCHEMA, SnapshotNode::empty_group()));
//! let database = AttributeDatabase::make(tree, Arc::new(InlineExecutor), DatabaseConfig::default(), true)?;
//! let query = database.make_query(vec![Path::new(vec![PathEntry::named("fan_trays")])])?;
//! let (tx, mut rx) = database.subscription_channel();
//! query.subscribe(tx, Duration::from_secs(1))?;
//! while let Some(snapshot) = rx.recv().await {
//!     println!("{:?}", snapshot);
//! }
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::sync::Weak;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::warn;

use super::next_query_id;
use super::ConfigEventCallback;
use super::DatabaseQuery;
use super::PollingHub;
use super::Query;
use super::Scheduler;
use crate::config::DatabaseConfig;
use crate::executor::TaskExecutor;
use crate::metrics::ATTRDB_ACTIVE_QUERIES;
use crate::schema::AttributeTree;
use crate::schema::AttributeValueMap;
use crate::schema::Path;
use crate::schema::Snapshot;
use crate::schema::PLATFORM_DB_SCHEMA;
use crate::Result;
use crate::SchedulerError;
use crate::SchemaError;

struct SchedulerHandle {
    shutdown_tx: watch::Sender<()>,
    join: JoinHandle<()>,
}

pub struct AttributeDatabase {
    tree: Arc<dyn AttributeTree>,
    executor: Arc<dyn TaskExecutor>,
    hub: Arc<PollingHub>,
    /// Guards `set` only. Intentionally disjoint from the polling lock.
    write_lock: Mutex<()>,
    scheduler: Mutex<Option<SchedulerHandle>>,
    config: DatabaseConfig,
}

impl AttributeDatabase {
    /// Validate the schema root and construct the database, optionally
    /// starting the polling scheduler.
    ///
    /// Must be called within a tokio runtime when `run_scheduler` is true.
    pub fn make(
        tree: Arc<dyn AttributeTree>,
        executor: Arc<dyn TaskExecutor>,
        config: DatabaseConfig,
        run_scheduler: bool,
    ) -> Result<Arc<Self>> {
        let actual = tree.descriptor();
        if actual != PLATFORM_DB_SCHEMA {
            return Err(SchemaError::Mismatch {
                expected: PLATFORM_DB_SCHEMA,
                actual,
            }
            .into());
        }
        config.validate()?;

        let database = Arc::new(AttributeDatabase {
            tree,
            executor,
            hub: PollingHub::new(),
            write_lock: Mutex::new(()),
            scheduler: Mutex::new(None),
            config,
        });
        if run_scheduler {
            database.start_scheduler()?;
        }
        Ok(database)
    }

    /// Apply a batch of attribute writes through the schema tree.
    pub fn set(
        &self,
        values: AttributeValueMap,
    ) -> Result<()> {
        let _guard = self.write_lock.lock();
        self.tree.set(values, self.executor.clone())
    }

    /// Create a streaming query over `paths`.
    ///
    /// The returned handle deregisters the query synchronously when dropped;
    /// the scheduler will never observe it again afterwards.
    pub fn make_query(
        self: &Arc<Self>,
        paths: Vec<Path>,
    ) -> Result<QueryHandle> {
        let id = next_query_id();
        if let Err(e) = self.tree.register_query(id, &paths) {
            self.tree.unregister_query(id);
            return Err(e);
        }

        let query = Query::new(id, paths, self.tree.clone(), self.executor.clone());
        let record = DatabaseQuery::new(query, Arc::downgrade(&self.hub), self.config.min_polling_interval());
        self.hub.register(record.clone());
        ATTRDB_ACTIVE_QUERIES.inc();

        Ok(QueryHandle {
            record,
            hub: Arc::downgrade(&self.hub),
            tree: self.tree.clone(),
        })
    }

    /// A subscription channel sized per the database configuration.
    pub fn subscription_channel(&self) -> (mpsc::Sender<Snapshot>, mpsc::Receiver<Snapshot>) {
        mpsc::channel(self.config.subscriber_channel_capacity)
    }

    /// Hook for hardware event sources; see [`ConfigEventCallback`].
    pub fn event_callback(&self) -> ConfigEventCallback {
        ConfigEventCallback::new(Arc::downgrade(&self.hub))
    }

    pub fn scheduler_is_running(&self) -> bool {
        self.scheduler.lock().is_some()
    }

    pub fn start_scheduler(&self) -> Result<()> {
        let mut slot = self.scheduler.lock();
        if slot.is_some() {
            return Err(SchedulerError::AlreadyRunning.into());
        }
        let (shutdown_tx, shutdown_rx) = watch::channel(());
        let join = tokio::spawn(Scheduler::new(self.hub.clone(), shutdown_rx).run());
        *slot = Some(SchedulerHandle { shutdown_tx, join });
        Ok(())
    }

    /// Stop the scheduler and wait for the task to exit, bounded by the
    /// configured shutdown timeout.
    pub async fn stop_scheduler(&self) -> Result<()> {
        let handle = self.scheduler.lock().take().ok_or(SchedulerError::NotRunning)?;

        if !self.hub.is_empty() {
            // Registered queries outliving the scheduler is a caller
            // ordering bug, not a fatal condition.
            warn!(
                "stopping the scheduler while {} queries are still registered",
                self.hub.len()
            );
        }

        let _ = handle.shutdown_tx.send(());
        // The loop may be parked on an infinite deadline.
        self.hub.wake();

        let wait = self.config.shutdown_timeout();
        let mut join = handle.join;
        match timeout(wait, &mut join).await {
            Ok(_) => Ok(()),
            Err(_) => {
                join.abort();
                Err(SchedulerError::ShutdownTimeout(wait).into())
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn active_query_count(&self) -> usize {
        self.hub.len()
    }
}

impl Drop for AttributeDatabase {
    fn drop(&mut self) {
        if let Some(handle) = self.scheduler.lock().take() {
            let _ = handle.shutdown_tx.send(());
            self.hub.wake();
        }
        if !self.hub.is_empty() {
            warn!(
                "attribute database dropped while {} queries are still registered",
                self.hub.len()
            );
        }
    }
}

/// Caller-visible subscription handle returned by
/// [`AttributeDatabase::make_query`].
pub struct QueryHandle {
    record: Arc<DatabaseQuery>,
    hub: Weak<PollingHub>,
    tree: Arc<dyn AttributeTree>,
}

impl QueryHandle {
    /// Synchronously extract the current snapshot for this query's paths.
    pub fn get(&self) -> Result<Snapshot> {
        self.record.get()
    }

    /// Stream snapshots into `sender` every `interval` (coalesced to the
    /// minimum across this query's subscribers). The first snapshot is
    /// delivered on the next scheduler pass regardless of any deadline.
    /// Dropping the receiver unsubscribes.
    pub fn subscribe(
        &self,
        sender: mpsc::Sender<Snapshot>,
        interval: std::time::Duration,
    ) -> Result<()> {
        self.record.subscribe(sender, interval)
    }

    pub fn paths(&self) -> &[Path] {
        self.record.query().paths()
    }

    #[cfg(test)]
    pub(crate) fn record(&self) -> &Arc<DatabaseQuery> {
        &self.record
    }
}

impl Drop for QueryHandle {
    fn drop(&mut self) {
        if let Some(hub) = self.hub.upgrade() {
            hub.deregister(self.record.id());
            hub.wake();
        }
        self.tree.unregister_query(self.record.id());
        ATTRDB_ACTIVE_QUERIES.dec();
    }
}
