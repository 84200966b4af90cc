use std::sync::Arc;
use std::sync::Weak;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::time::Instant;

use super::PollingHub;
use super::Query;
use crate::metrics::ATTRDB_DELIVERY_FAILURE_TOTAL;
use crate::schema::QueryId;
use crate::schema::Snapshot;
use crate::DeliveryError;
use crate::Result;

/// When a query next needs to be polled.
///
/// `Never` is the explicit sentinel for dormant queries (no subscribers) and
/// for deadline arithmetic that would overflow; it never contributes to the
/// scheduler's wake deadline. The variant order gives `Now < At(_) < Never`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum PollDeadline {
    Now,
    At(Instant),
    Never,
}

impl PollDeadline {
    pub(crate) fn is_due(
        &self,
        now: Instant,
    ) -> bool {
        match self {
            PollDeadline::Now => true,
            PollDeadline::At(at) => *at <= now,
            PollDeadline::Never => false,
        }
    }
}

struct Subscriber {
    sender: mpsc::Sender<Snapshot>,
    interval: Duration,
}

struct PollState {
    /// Advanced on every poll attempt, even failed ones, so a query whose
    /// reads keep failing cannot busy-loop the scheduler.
    last_poll_time: Option<Instant>,

    /// Last observed snapshot, kept only for deep-equality change detection.
    last_result: Option<Snapshot>,

    /// min over subscriber intervals; `None` while no subscribers remain.
    polling_interval: Option<Duration>,

    subscribers: Vec<Subscriber>,
}

impl PollState {
    // Linear scan; a query rarely carries more than two or three
    // subscribers.
    fn recalculate_polling_interval(&mut self) {
        self.polling_interval = self.subscribers.iter().map(|s| s.interval).min();
    }
}

/// The engine's per-subscription record: one [`Query`] plus its scheduling
/// state and subscriber list.
pub(crate) struct DatabaseQuery {
    query: Query,
    /// Non-owning back-reference used to wake the scheduler; a database that
    /// has already been dropped simply no longer gets woken.
    hub: Weak<PollingHub>,
    min_interval: Duration,
    state: Mutex<PollState>,
}

impl DatabaseQuery {
    pub(crate) fn new(
        query: Query,
        hub: Weak<PollingHub>,
        min_interval: Duration,
    ) -> Arc<Self> {
        Arc::new(DatabaseQuery {
            query,
            hub,
            min_interval,
            state: Mutex::new(PollState {
                last_poll_time: None,
                last_result: None,
                polling_interval: None,
                subscribers: Vec::new(),
            }),
        })
    }

    pub(crate) fn id(&self) -> QueryId {
        self.query.id()
    }

    pub(crate) fn query(&self) -> &Query {
        &self.query
    }

    pub(crate) fn get(&self) -> Result<Snapshot> {
        self.query.get()
    }

    pub(crate) fn is_updated(&self) -> bool {
        self.query.is_updated()
    }

    pub(crate) fn mark_updated(&self) {
        self.query.mark_updated();
    }

    /// Re-read the observed subtree and flag the query updated if it
    /// changed.
    ///
    /// The poll time advances first and unconditionally. If the query is
    /// already flagged (e.g. a hardware event beat us to it) the read is
    /// skipped entirely. Read failures propagate without flagging.
    pub(crate) fn poll(
        &self,
        now: Instant,
    ) -> Result<()> {
        self.state.lock().last_poll_time = Some(now);

        if self.query.is_updated() {
            return Ok(());
        }

        let snapshot = self.query.get()?;
        let mut state = self.state.lock();
        let changed = state.last_result.as_ref().map_or(true, |last| *last != snapshot);
        if changed {
            self.query.mark_updated();
            state.last_result = Some(snapshot);
        }
        Ok(())
    }

    /// Append a subscriber and force an immediate delivery round.
    ///
    /// Existing subscribers of the same query will incidentally receive a
    /// message too. Requested intervals are clamped up to the configured
    /// floor.
    pub(crate) fn subscribe(
        &self,
        sender: mpsc::Sender<Snapshot>,
        interval: Duration,
    ) -> Result<()> {
        let interval = interval.max(self.min_interval);
        {
            let mut state = self.state.lock();
            state.subscribers.push(Subscriber { sender, interval });
            // The new subscriber must receive a snapshot right away.
            self.query.mark_updated();
            state.recalculate_polling_interval();
        }
        if let Some(hub) = self.hub.upgrade() {
            hub.wake();
        }
        Ok(())
    }

    /// Deliver a fresh snapshot to every subscriber.
    ///
    /// A closed channel is the expected unsubscribe mechanism and is removed
    /// silently; a full channel aborts the whole flush with the updated flag
    /// still set, so the current snapshot is retried on the next pass. Only
    /// a fully successful flush clears the flag and replaces the cached
    /// result, so a value that changed between poll and flush is not missed.
    pub(crate) fn update_subscribers(&self) -> Result<()> {
        let snapshot = self.query.get()?;

        let mut state = self.state.lock();
        let mut removed = false;
        let mut i = 0;
        while i < state.subscribers.len() {
            match state.subscribers[i].sender.try_send(snapshot.clone()) {
                Ok(()) => i += 1,
                Err(TrySendError::Closed(_)) => {
                    state.subscribers.remove(i);
                    removed = true;
                }
                Err(TrySendError::Full(_)) => {
                    if removed {
                        state.recalculate_polling_interval();
                    }
                    ATTRDB_DELIVERY_FAILURE_TOTAL
                        .with_label_values(&[&self.id().to_string()])
                        .inc();
                    return Err(DeliveryError::ChannelFull { subscriber_index: i }.into());
                }
            }
        }
        if removed {
            state.recalculate_polling_interval();
        }
        self.query.clear_updated();
        state.last_result = Some(snapshot);
        Ok(())
    }

    /// `last_poll_time + polling_interval`, with explicit sentinels for
    /// never-polled (due immediately) and dormant (never due) queries.
    pub(crate) fn next_polling_time(&self) -> PollDeadline {
        let state = self.state.lock();
        match (state.polling_interval, state.last_poll_time) {
            (None, _) => PollDeadline::Never,
            (Some(_), None) => PollDeadline::Now,
            (Some(interval), Some(last)) => match last.checked_add(interval) {
                Some(at) => PollDeadline::At(at),
                None => PollDeadline::Never,
            },
        }
    }

    #[cfg(test)]
    pub(crate) fn polling_interval(&self) -> Option<Duration> {
        self.state.lock().polling_interval
    }

    #[cfg(test)]
    pub(crate) fn subscriber_count(&self) -> usize {
        self.state.lock().subscribers.len()
    }

    #[cfg(test)]
    pub(crate) fn last_poll_time(&self) -> Option<Instant> {
        self.state.lock().last_poll_time
    }

    #[cfg(test)]
    pub(crate) fn last_result(&self) -> Option<Snapshot> {
        self.state.lock().last_result.clone()
    }
}
