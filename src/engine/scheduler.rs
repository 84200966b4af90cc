//! The background polling scheduler.
//!
//! One task per database runs [`Scheduler::run`]: sleep until the nearest
//! per-query deadline (or until signaled), poll every due query, flush every
//! updated query, repeat. The sleep deadline is always the nearest real
//! deadline, never a fixed tick; with no active deadline the loop parks until
//! a wake signal or shutdown.

use std::collections::HashMap;
use std::future;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::sync::Notify;
use tokio::time::sleep_until;
use tokio::time::Instant;
use tracing::info;
use tracing::trace;
use tracing::warn;

use super::DatabaseQuery;
use super::PollDeadline;
use crate::metrics::ATTRDB_FLUSH_TOTAL;
use crate::metrics::ATTRDB_POLL_FAILURE_TOTAL;
use crate::metrics::ATTRDB_POLL_TOTAL;
use crate::schema::QueryId;

/// Registry of live queries plus the scheduler wake signal.
///
/// The registry mutex is the polling lock: it serializes query
/// registration/deregistration with the scheduler's scan phases and is held
/// only briefly, never across an attribute read.
pub(crate) struct PollingHub {
    queries: Mutex<HashMap<QueryId, Arc<DatabaseQuery>>>,
    wakeup: Notify,
}

impl PollingHub {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(PollingHub {
            queries: Mutex::new(HashMap::new()),
            wakeup: Notify::new(),
        })
    }

    pub(crate) fn register(
        &self,
        query: Arc<DatabaseQuery>,
    ) {
        self.queries.lock().insert(query.id(), query);
    }

    pub(crate) fn deregister(
        &self,
        id: QueryId,
    ) {
        self.queries.lock().remove(&id);
    }

    /// Wake the scheduler loop. Stores a permit, so a signal sent while the
    /// loop is mid-pass is not lost.
    pub(crate) fn wake(&self) {
        self.wakeup.notify_one();
    }

    pub(crate) async fn notified(&self) {
        self.wakeup.notified().await;
    }

    pub(crate) fn len(&self) -> usize {
        self.queries.lock().len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.queries.lock().is_empty()
    }

    /// Nearest deadline across all registered queries.
    pub(crate) fn next_polling_time(&self) -> PollDeadline {
        self.queries
            .lock()
            .values()
            .map(|q| q.next_polling_time())
            .min()
            .unwrap_or(PollDeadline::Never)
    }

    fn due_queries(
        &self,
        now: Instant,
    ) -> Vec<Arc<DatabaseQuery>> {
        self.queries
            .lock()
            .values()
            .filter(|q| q.next_polling_time().is_due(now))
            .cloned()
            .collect()
    }

    fn updated_queries(&self) -> Vec<Arc<DatabaseQuery>> {
        self.queries
            .lock()
            .values()
            .filter(|q| q.is_updated())
            .cloned()
            .collect()
    }

    /// Force an out-of-band delivery round for every registered query.
    pub(crate) fn mark_all_updated(&self) {
        for query in self.queries.lock().values() {
            query.mark_updated();
        }
    }
}

pub(crate) struct Scheduler {
    hub: Arc<PollingHub>,
    shutdown_signal: watch::Receiver<()>,
}

impl Scheduler {
    pub(crate) fn new(
        hub: Arc<PollingHub>,
        shutdown_signal: watch::Receiver<()>,
    ) -> Self {
        Scheduler { hub, shutdown_signal }
    }

    pub(crate) async fn run(mut self) {
        info!("attribute polling scheduler started");
        loop {
            let deadline = self.hub.next_polling_time();
            tokio::select! {
                // Use biased to ensure branch order
                biased;
                // P0: shutdown received
                _ = self.shutdown_signal.changed() => {
                    warn!("scheduler shutdown signal received");
                    break;
                }
                // P1: new subscriber, new/dropped query or hardware event
                _ = self.hub.notified() => {
                    trace!("scheduler wake signal received");
                }
                // P2: nearest polling deadline reached
                _ = Self::wait(deadline) => {
                    trace!("polling deadline reached");
                }
            }

            let now = Instant::now();
            self.poll_due_queries(now);
            self.flush_updated_queries();
        }
        info!("attribute polling scheduler stopped");
    }

    async fn wait(deadline: PollDeadline) {
        match deadline {
            PollDeadline::Now => {}
            PollDeadline::At(at) => sleep_until(at).await,
            PollDeadline::Never => future::pending::<()>().await,
        }
    }

    /// Poll every query whose deadline has elapsed. A failing query is
    /// logged and skipped; it must not take down delivery for the others.
    fn poll_due_queries(
        &self,
        now: Instant,
    ) {
        for query in self.hub.due_queries(now) {
            ATTRDB_POLL_TOTAL.with_label_values(&[&query.id().to_string()]).inc();
            if let Err(e) = query.poll(now) {
                ATTRDB_POLL_FAILURE_TOTAL
                    .with_label_values(&[&query.id().to_string()])
                    .inc();
                warn!("polling query {} failed: {}", query.id(), e);
            }
        }
    }

    /// Flush every query flagged updated, with the same fault isolation as
    /// the polling phase.
    fn flush_updated_queries(&self) {
        for query in self.hub.updated_queries() {
            ATTRDB_FLUSH_TOTAL.with_label_values(&[&query.id().to_string()]).inc();
            if let Err(e) = query.update_subscribers() {
                warn!("flushing query {} failed: {}", query.id(), e);
            }
        }
    }
}
