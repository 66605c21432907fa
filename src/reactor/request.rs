//! Poll Request Manager: submits and cancels requests on the completion port.
//!
//! Neither operation blocks. A failed submission is reported on the Watch
//! itself (`Ready` with `EPOLLERR`) instead of failing the caller.

use crate::error::Error;
use crate::port::{CompletionPort, Token};
use crate::reactor::event::Events;
use crate::reactor::registry::{Registry, WatchKey, WatchState};

/// Submits a request for `key` if it is `Idle`.
pub(crate) fn arm<P: CompletionPort>(registry: &mut Registry, port: &P, key: WatchKey) {
    let Some(watch) = registry.watches.get(key) else {
        return;
    };
    if watch.state != WatchState::Idle {
        return;
    }
    let (handle, interest) = (watch.handle, watch.interest);

    let token = registry.next_token();
    match port.submit(token, handle, interest) {
        Ok(()) => {
            log::trace!("arm: handle={}, token={:?}, interest={:?}", handle, token, interest);
            registry.requests.insert(token, key);
            if let Some(watch) = registry.watches.get_mut(key) {
                watch.state = WatchState::Armed { token };
            }
        }
        Err(err) => {
            log::warn!("arm: handle={}: {}", handle, Error::PollSubmitFailed(err));
            registry.mark_ready(key, Events::ERR);
        }
    }
}

/// Arms every Watch queued for an update.
pub(crate) fn arm_pending<P: CompletionPort>(registry: &mut Registry, port: &P) {
    while let Some(key) = registry.updates.pop_front() {
        arm(registry, port, key);
    }
}

/// Asks the port to cancel `token`. The Watch keeps its state until the
/// completion is reaped.
pub(crate) fn cancel<P: CompletionPort>(port: &P, token: Token) {
    log::trace!("cancel: token={:?}", token);
    if let Err(err) = port.cancel(token) {
        log::warn!("cancel: token={:?}: {}", token, err);
    }
}
