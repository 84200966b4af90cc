use std::sync::Weak;

use tracing::debug;

use super::PollingHub;

/// Out-of-band "configuration applied" hook handed to hardware event
/// sources (hot-plug notifiers, runtime configurators).
///
/// Invocable from any thread. Firing it marks every registered query updated
/// and signals the scheduler, so the next flushing phase delivers fresh
/// snapshots without waiting for a computed poll deadline.
#[derive(Clone)]
pub struct ConfigEventCallback {
    hub: Weak<PollingHub>,
}

impl ConfigEventCallback {
    pub(crate) fn new(hub: Weak<PollingHub>) -> Self {
        ConfigEventCallback { hub }
    }

    pub fn configuration_applied(&self) {
        let Some(hub) = self.hub.upgrade() else {
            debug!("configuration event ignored, the attribute database is gone");
            return;
        };
        hub.mark_all_updated();
        hub.wake();
    }
}
