//! A completion port on top of `poll(2)`.
//!
//! Each submitted request is a one-shot poll of one handle. The waiting
//! thread snapshots every outstanding request into a `pollfd` array, blocks
//! outside the port lock, and turns each handle that fired into a signaled
//! completion. Submissions and cancellations wake the waiter through a
//! self-pipe so that it picks up the new request set.

use super::wake::WakePipe;
use super::{Completion, CompletionPort, Token, WaitStatus, Work};
use crate::reactor::event::{Events, RawHandle};

use libc::{POLLERR, POLLHUP, POLLIN, POLLNVAL, POLLOUT, pollfd};
use parking_lot::Mutex;
use std::collections::{BTreeMap, VecDeque};
use std::io;
use std::mem;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
struct PendingPoll {
    handle: RawHandle,
    interest: Events,
}

#[derive(Default)]
struct PortState {
    /// Outstanding requests, keyed by token so they are polled in submission order.
    pending: BTreeMap<Token, PendingPoll>,

    /// Completions produced outside a wait (cancellations).
    posted: VecDeque<Completion>,

    work: VecDeque<Work>,
}

/// Completion port emulated with `poll(2)`.
pub struct PollPort {
    state: Mutex<PortState>,
    wake: WakePipe,
}

impl std::fmt::Debug for PollPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("PollPort")
            .field("pending", &state.pending.len())
            .field("posted", &state.posted.len())
            .field("work", &state.work.len())
            .finish()
    }
}

impl PollPort {
    pub fn new() -> io::Result<Self> {
        let wake = WakePipe::new()?;
        log::trace!("new: wake_fd={}", wake.reader());

        Ok(Self {
            state: Mutex::new(PortState::default()),
            wake,
        })
    }

    /// Number of requests that have neither fired nor been cancelled.
    pub fn outstanding(&self) -> usize {
        self.state.lock().pending.len()
    }
}

impl CompletionPort for PollPort {
    fn submit(&self, token: Token, handle: RawHandle, interest: Events) -> io::Result<()> {
        if handle < 0 {
            return Err(io::Error::from_raw_os_error(libc::EBADF));
        }

        self.state
            .lock()
            .pending
            .insert(token, PendingPoll { handle, interest });
        self.wake.wake()
    }

    fn cancel(&self, token: Token) -> io::Result<()> {
        let mut state = self.state.lock();
        if state.pending.remove(&token).is_some() {
            state.posted.push_back(Completion::cancelled(token));
            drop(state);
            self.wake.wake()?;
        }

        Ok(())
    }

    fn wait(
        &self,
        completions: &mut Vec<Completion>,
        max: usize,
        timeout: Option<Duration>,
        alertable: bool,
    ) -> io::Result<WaitStatus> {
        let mut fds;
        let mut tokens;

        {
            let mut state = self.state.lock();
            if drain_posted(&mut state, completions, max) > 0 {
                return Ok(WaitStatus::Completed);
            }
            if alertable && !state.work.is_empty() {
                let work = mem::take(&mut state.work);
                drop(state);
                run_work(work);
                return Ok(WaitStatus::Alerted);
            }

            fds = Vec::with_capacity(state.pending.len() + 1);
            tokens = Vec::with_capacity(state.pending.len());
            fds.push(pollfd {
                fd: self.wake.reader(),
                events: POLLIN,
                revents: 0,
            });
            for (token, pending) in &state.pending {
                fds.push(pollfd {
                    fd: pending.handle,
                    events: interest_to_poll(pending.interest),
                    revents: 0,
                });
                tokens.push(*token);
            }
        }

        let ready = match sys_poll(&mut fds, timeout) {
            Ok(ready) => ready,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {
                return Ok(WaitStatus::Alerted);
            }
            Err(err) => return Err(err),
        };
        if ready == 0 {
            return Ok(WaitStatus::TimedOut);
        }

        let mut state = self.state.lock();
        if fds[0].revents != 0 {
            self.wake.drain();
        }

        for (fd, token) in fds[1..].iter().zip(&tokens) {
            if completions.len() >= max {
                break;
            }
            if fd.revents == 0 {
                continue;
            }
            // Cancelled while we were blocked: its cancelled completion is already posted.
            if state.pending.remove(token).is_some() {
                completions.push(Completion::signaled(*token, poll_to_events(fd.revents)));
            }
        }
        drain_posted(&mut state, completions, max);

        if alertable && completions.is_empty() && !state.work.is_empty() {
            let work = mem::take(&mut state.work);
            drop(state);
            run_work(work);
            return Ok(WaitStatus::Alerted);
        }

        Ok(WaitStatus::Completed)
    }

    fn queue_work(&self, work: Work) -> io::Result<()> {
        self.state.lock().work.push_back(work);
        self.wake.wake()
    }

    fn wake(&self) -> io::Result<()> {
        self.wake.wake()
    }
}

fn drain_posted(state: &mut PortState, completions: &mut Vec<Completion>, max: usize) -> usize {
    let room = max.saturating_sub(completions.len());
    let count = room.min(state.posted.len());
    completions.extend(state.posted.drain(..count));
    count
}

fn run_work(work: VecDeque<Work>) {
    log::trace!("wait: running {} queued work item(s)", work.len());
    for item in work {
        item();
    }
}

fn interest_to_poll(interest: Events) -> i16 {
    let mut events = 0;
    if interest.contains(Events::IN) {
        events |= POLLIN;
    }
    if interest.contains(Events::OUT) {
        events |= POLLOUT;
    }
    events
}

fn poll_to_events(revents: i16) -> Events {
    let mut events = Events::empty();
    if revents & POLLIN != 0 {
        events |= Events::IN;
    }
    if revents & POLLOUT != 0 {
        events |= Events::OUT;
    }
    if revents & POLLHUP != 0 {
        events |= Events::HUP;
    }
    if revents & (POLLERR | POLLNVAL) != 0 {
        events |= Events::ERR;
    }
    events
}

#[cfg(any(target_os = "linux", target_os = "android"))]
fn sys_poll(fds: &mut [pollfd], timeout: Option<Duration>) -> io::Result<usize> {
    let spec = timeout.map(|timeout| {
        let mut spec: libc::timespec = unsafe { mem::zeroed() };
        spec.tv_sec = timeout.as_secs().min(libc::time_t::MAX as u64) as libc::time_t;
        spec.tv_nsec = timeout.subsec_nanos() as _;
        spec
    });
    let spec_ptr = spec
        .as_ref()
        .map_or(std::ptr::null(), |spec| spec as *const libc::timespec);

    let res = unsafe {
        libc::ppoll(
            fds.as_mut_ptr(),
            fds.len() as libc::nfds_t,
            spec_ptr,
            std::ptr::null(),
        )
    };
    if res < 0 {
        return Err(io::Error::last_os_error());
    }

    Ok(res as usize)
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
fn sys_poll(fds: &mut [pollfd], timeout: Option<Duration>) -> io::Result<usize> {
    let timeout_ms = crate::time::timeout_millis(timeout);
    let res = unsafe { libc::poll(fds.as_mut_ptr(), fds.len() as libc::nfds_t, timeout_ms) };
    if res < 0 {
        return Err(io::Error::last_os_error());
    }

    Ok(res as usize)
}
