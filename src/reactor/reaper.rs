//! Completion Reaper: reconciles drained completions with the registry.
//!
//! Each completion is matched to its Watch through the request table. Only a
//! completion carrying the Watch's current token can change its state; any
//! other is left over from a `modify` and is dropped. A tombstone is freed
//! here, once its own completion arrives, and never earlier.

use crate::port::{Completion, CompletionStatus};
use crate::reactor::event::Events;
use crate::reactor::registry::{Registry, WatchState};

/// Applies `completions` to `registry`, draining the buffer.
///
/// Returns the number of Watches that became `Ready`.
pub(crate) fn reap(registry: &mut Registry, completions: &mut Vec<Completion>) -> usize {
    let mut ready = 0;

    for completion in completions.drain(..) {
        let Some(key) = registry.requests.remove(&completion.token) else {
            log::debug!("reap: unknown token={:?}", completion.token);
            continue;
        };
        let Some(watch) = registry.watches.get(key) else {
            continue;
        };

        match (watch.state, completion.status) {
            (WatchState::PendingDelete { token }, _) if token == completion.token => {
                log::debug!("reap: discarding deleted handle={}", watch.handle);
                registry.watches.remove(key);
            }
            (WatchState::Armed { token }, CompletionStatus::Cancelled)
                if token == completion.token =>
            {
                registry.mark_idle(key);
            }
            (WatchState::Armed { token }, CompletionStatus::Signaled(fired))
                if token == completion.token =>
            {
                let reported = fired & (watch.interest | Events::ALWAYS_REPORTED);
                if reported.is_empty() {
                    registry.mark_idle(key);
                } else {
                    log::debug!("reap: handle={} ready {:?}", watch.handle, reported);
                    registry.mark_ready(key, reported);
                    ready += 1;
                }
            }
            _ => {
                log::debug!("reap: stale token={:?}", completion.token);
            }
        }
    }

    ready
}
