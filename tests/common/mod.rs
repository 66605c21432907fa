#![allow(dead_code)]

use epoll_shim::{
    Completion, CompletionPort, Events, Instance, InstanceBuilder, RawHandle, Token, WaitStatus,
    Work,
};
use parking_lot::{Condvar, Mutex};
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::io;
use std::os::fd::AsRawFd;
use std::os::unix::net::UnixStream;
use std::time::{Duration, Instant};

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[derive(Default)]
struct ManualState {
    pending: BTreeMap<Token, (RawHandle, Events)>,
    posted: VecDeque<Completion>,
    work: VecDeque<Work>,
    failing: HashSet<RawHandle>,
    submissions: usize,
    woken: bool,
}

/// A completion port driven by the test: requests only complete when `fire`d.
#[derive(Default)]
pub struct ManualPort {
    state: Mutex<ManualState>,
    posted: Condvar,
}

impl ManualPort {
    pub fn new() -> Self {
        Self::default()
    }

    /// Completes the outstanding request for `handle` with `events`.
    /// Returns false when no request is outstanding for it.
    pub fn fire(&self, handle: RawHandle, events: Events) -> bool {
        let mut state = self.state.lock();
        let token = state
            .pending
            .iter()
            .find(|(_, (pending, _))| *pending == handle)
            .map(|(token, _)| *token);

        match token {
            Some(token) => {
                state.pending.remove(&token);
                state.posted.push_back(Completion::signaled(token, events));
                self.posted.notify_all();
                true
            }
            None => false,
        }
    }

    /// Outstanding requests for `handle`.
    pub fn pending_for(&self, handle: RawHandle) -> usize {
        self.state
            .lock()
            .pending
            .values()
            .filter(|(pending, _)| *pending == handle)
            .count()
    }

    pub fn interest_of(&self, handle: RawHandle) -> Option<Events> {
        self.state
            .lock()
            .pending
            .values()
            .find(|(pending, _)| *pending == handle)
            .map(|(_, interest)| *interest)
    }

    pub fn outstanding(&self) -> usize {
        self.state.lock().pending.len()
    }

    pub fn submissions(&self) -> usize {
        self.state.lock().submissions
    }

    /// Makes every later submission for `handle` fail.
    pub fn fail_submissions_for(&self, handle: RawHandle) {
        self.state.lock().failing.insert(handle);
    }
}

impl CompletionPort for ManualPort {
    fn submit(&self, token: Token, handle: RawHandle, interest: Events) -> io::Result<()> {
        let mut state = self.state.lock();
        if state.failing.contains(&handle) {
            return Err(io::Error::from_raw_os_error(libc::ENOTSOCK));
        }

        state.submissions += 1;
        state.pending.insert(token, (handle, interest));
        Ok(())
    }

    fn cancel(&self, token: Token) -> io::Result<()> {
        let mut state = self.state.lock();
        if state.pending.remove(&token).is_some() {
            state.posted.push_back(Completion::cancelled(token));
            self.posted.notify_all();
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
        let deadline = timeout.map(|timeout| Instant::now() + timeout);
        let mut state = self.state.lock();

        loop {
            if !state.posted.is_empty() {
                let room = max.saturating_sub(completions.len());
                let count = room.min(state.posted.len());
                completions.extend(state.posted.drain(..count));
                return Ok(WaitStatus::Completed);
            }

            if alertable && !state.work.is_empty() {
                let work: Vec<Work> = state.work.drain(..).collect();
                drop(state);
                for item in work {
                    item();
                }
                return Ok(WaitStatus::Alerted);
            }

            if state.woken {
                state.woken = false;
                return Ok(WaitStatus::Completed);
            }

            match deadline {
                None => self.posted.wait(&mut state),
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Ok(WaitStatus::TimedOut);
                    }
                    self.posted.wait_for(&mut state, deadline - now);
                }
            }
        }
    }

    fn queue_work(&self, work: Work) -> io::Result<()> {
        self.state.lock().work.push_back(work);
        self.posted.notify_all();
        Ok(())
    }

    fn wake(&self) -> io::Result<()> {
        self.state.lock().woken = true;
        self.posted.notify_all();
        Ok(())
    }
}

pub fn manual_instance() -> Instance<ManualPort> {
    init_logger();
    InstanceBuilder::new().build_with_port(ManualPort::new())
}

/// A connected socket pair; the first end is registered, the second one drives it.
pub fn socket_pair() -> (UnixStream, UnixStream) {
    let (watched, peer) = UnixStream::pair().expect("socketpair");
    watched.set_nonblocking(true).expect("nonblocking");
    (watched, peer)
}

pub fn fd_of(stream: &UnixStream) -> RawHandle {
    stream.as_raw_fd()
}
