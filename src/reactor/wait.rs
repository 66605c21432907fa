//! Wait Orchestrator.
//!
//! A wait first reports Watches that are already `Ready`. Only when there are
//! none does it take the poll lock and block on the port, outside the
//! registry lock, then reap under the registry lock and report what became
//! ready. Level-triggered Watches that were reported are re-armed with a fresh
//! request before the wait returns, so the next wait re-checks the real
//! condition of the handle.

use crate::error::{Error, Result};
use crate::port::{CompletionPort, WaitStatus};
use crate::reactor::core::Instance;
use crate::reactor::event::Event;
use crate::reactor::reaper::reap;
use crate::reactor::registry::{Registry, WatchState};
use crate::reactor::request::arm_pending;
use crate::time::{Deadline, timeout_from_millis};

use std::time::Duration;

impl<P: CompletionPort> Instance<P> {
    /// Waits for events, `timeout_ms` negative meaning forever.
    ///
    /// # Returns
    /// The number of events written to the front of `events`; 0 on timeout.
    ///
    /// # Errors
    /// [`Error::InvalidArgument`] for an empty `events` buffer.
    pub fn wait(&self, events: &mut [Event], timeout_ms: i32) -> Result<usize> {
        self.wait_for(events, timeout_from_millis(timeout_ms), false)
    }

    /// Like [`Self::wait`]; an `alertable` wait also returns when queued work ran.
    pub fn pwait(&self, events: &mut [Event], timeout_ms: i32, alertable: bool) -> Result<usize> {
        self.wait_for(events, timeout_from_millis(timeout_ms), alertable)
    }

    /// Like [`Self::pwait`] with a high-resolution timeout; `None` waits forever.
    pub fn pwait2(
        &self,
        events: &mut [Event],
        timeout: Option<Duration>,
        alertable: bool,
    ) -> Result<usize> {
        self.wait_for(events, timeout, alertable)
    }

    fn wait_for(
        &self,
        events: &mut [Event],
        timeout: Option<Duration>,
        alertable: bool,
    ) -> Result<usize> {
        if events.is_empty() {
            return Err(Error::InvalidArgument);
        }
        log::trace!("wait: capacity={}, timeout={:?}, alertable={}", events.len(), timeout, alertable);

        let deadline = Deadline::after(timeout);

        let emitted = self.with_registry(|registry| emit(registry, &self.port, events));
        if emitted > 0 {
            return Ok(emitted);
        }

        let mut completions = match deadline.remaining() {
            None => self.poll.lock(),
            Some(remaining) => match self.poll.try_lock_for(remaining) {
                Some(completions) => completions,
                None => return Ok(0),
            },
        };

        loop {
            // The previous lock holder may have left Watches ready.
            let emitted = self.with_registry(|registry| emit(registry, &self.port, events));
            if emitted > 0 {
                return Ok(emitted);
            }

            let status =
                self.port
                    .wait(&mut completions, self.batch, deadline.remaining(), alertable)?;

            let emitted = self.with_registry(|registry| {
                reap(registry, &mut completions);
                emit(registry, &self.port, events)
            });
            if emitted > 0 {
                return Ok(emitted);
            }

            if alertable && status == WaitStatus::Alerted {
                return Ok(0);
            }
            if deadline.expired() {
                return Ok(0);
            }
        }
    }
}

/// Arms pending Watches, then copies up to `events.len()` ready Watches and
/// posted events into `events` and re-arms the level-triggered Watches among them.
fn emit<P: CompletionPort>(registry: &mut Registry, port: &P, events: &mut [Event]) -> usize {
    arm_pending(registry, port);

    let mut count = 0;
    while count < events.len() {
        let Some(key) = registry.ready.pop_front() else {
            break;
        };
        let Some(watch) = registry.watches.get_mut(key) else {
            continue;
        };
        let WatchState::Ready {
            events: fired,
            reported: false,
        } = watch.state
        else {
            continue;
        };

        events[count] = Event::new(fired, watch.data);
        count += 1;

        if watch.mode.rearms() {
            registry.mark_idle(key);
        } else {
            watch.state = WatchState::Ready {
                events: fired,
                reported: true,
            };
        }
    }

    while count < events.len() {
        let Some(event) = registry.posted.pop_front() else {
            break;
        };
        events[count] = event;
        count += 1;
    }

    if count > 0 {
        arm_pending(registry, port);
    }

    count
}
