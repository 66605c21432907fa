//! Completion ports: the asynchronous mechanism the readiness engine runs on.
//!
//! A port accepts one-shot poll requests, each identified by a [`Token`], and
//! later hands back exactly one [`Completion`] per request: either the events
//! that fired or a cancellation. The engine never assumes a cancelled request
//! is gone until its cancelled completion has been drained.
//!
//! - [`poll`]: [`PollPort`], a completion port built on `poll(2)`
//! - [`wake`]: the self-pipe that interrupts a blocked [`PollPort`] wait

pub mod poll;
mod wake;

pub use poll::PollPort;

use crate::reactor::event::{Events, RawHandle};

use std::io;
use std::time::Duration;

/// Identifies one submitted poll request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Token(pub u64);

/// How a request finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionStatus {
    /// The handle reached one of the polled conditions.
    Signaled(Events),

    /// The request was cancelled before it fired.
    Cancelled,
}

/// One finished request, as drained from a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    pub token: Token,
    pub status: CompletionStatus,
}

impl Completion {
    pub fn signaled(token: Token, events: Events) -> Self {
        Self {
            token,
            status: CompletionStatus::Signaled(events),
        }
    }

    pub fn cancelled(token: Token) -> Self {
        Self {
            token,
            status: CompletionStatus::Cancelled,
        }
    }
}

/// Why a blocking step returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitStatus {
    /// Completions were drained, or the port was woken by new submissions.
    Completed,

    /// The timeout elapsed with nothing to drain.
    TimedOut,

    /// An alertable wait ran queued work, or a signal interrupted the wait.
    Alerted,
}

/// External work queued on a port, run by the next alertable wait.
pub type Work = Box<dyn FnOnce() + Send + 'static>;

/// An asynchronous completion mechanism.
///
/// Implementations must produce exactly one completion per submitted token,
/// and must never block in [`submit`](Self::submit) or [`cancel`](Self::cancel).
pub trait CompletionPort: Send + Sync + 'static {
    /// Starts a one-shot poll of `handle` for `interest`.
    fn submit(&self, token: Token, handle: RawHandle, interest: Events) -> io::Result<()>;

    /// Requests cancellation of `token`.
    ///
    /// A request that already fired keeps its signaled completion.
    fn cancel(&self, token: Token) -> io::Result<()>;

    /// Blocks for up to `timeout` and appends at most `max` completions.
    ///
    /// `None` waits indefinitely. Only one thread calls this at a time.
    fn wait(
        &self,
        completions: &mut Vec<Completion>,
        max: usize,
        timeout: Option<Duration>,
        alertable: bool,
    ) -> io::Result<WaitStatus>;

    /// Queues work to be run by the next alertable wait.
    fn queue_work(&self, work: Work) -> io::Result<()>;

    /// Makes a blocked [`wait`](Self::wait) return, possibly with no completions.
    fn wake(&self) -> io::Result<()>;
}
