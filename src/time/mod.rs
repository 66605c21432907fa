//! Timeout representations used by the wait entry points.
//!
//! The millisecond form (`wait`, `pwait`) treats any negative value as
//! "wait forever"; the `timespec` form (`pwait2`) uses a null pointer for
//! that. Internally every timeout is an `Option<Duration>` where `None`
//! blocks indefinitely and `Some(Duration::ZERO)` never blocks.
//!
//! # Example
//!
//! ```ignore
//! use epoll_shim::time::{Deadline, timeout_from_millis};
//!
//! let deadline = Deadline::after(timeout_from_millis(250));
//! while !deadline.expired() {
//!     let remaining = deadline.remaining();
//!     // ... block for at most `remaining` ...
//! }
//! ```

use crate::error::{Error, Result};

use std::time::{Duration, Instant};

const NANOS_PER_SEC: i64 = 1_000_000_000;

/// Converts a millisecond timeout, negative meaning infinite.
pub fn timeout_from_millis(timeout_ms: i32) -> Option<Duration> {
    if timeout_ms < 0 {
        None
    } else {
        Some(Duration::from_millis(timeout_ms as u64))
    }
}

/// Converts the fields of a `timespec`.
///
/// # Errors
/// [`Error::InvalidArgument`] for negative seconds or nanoseconds outside `0..1e9`.
pub fn timeout_from_timespec(tv_sec: i64, tv_nsec: i64) -> Result<Duration> {
    if tv_sec < 0 || !(0..NANOS_PER_SEC).contains(&tv_nsec) {
        return Err(Error::InvalidArgument);
    }

    Ok(Duration::new(tv_sec as u64, tv_nsec as u32))
}

/// Milliseconds for `poll(2)`, rounded up so a wait never ends early.
pub fn timeout_millis(timeout: Option<Duration>) -> i32 {
    match timeout {
        None => -1,
        Some(timeout) => {
            let mut ms = timeout.as_millis();
            if Duration::from_millis(ms as u64) < timeout {
                ms += 1;
            }
            ms.min(i32::MAX as u128) as i32
        }
    }
}

/// Point in time at which a wait gives up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    /// `None` never expires.
    at: Option<Instant>,
}

impl Deadline {
    /// A deadline `timeout` from now. A timeout too large to represent never expires.
    pub fn after(timeout: Option<Duration>) -> Self {
        Self {
            at: timeout.and_then(|timeout| Instant::now().checked_add(timeout)),
        }
    }

    /// Time left, `None` when the deadline never expires.
    pub fn remaining(&self) -> Option<Duration> {
        self.at
            .map(|at| at.saturating_duration_since(Instant::now()))
    }

    pub fn expired(&self) -> bool {
        self.remaining().is_some_and(|left| left.is_zero())
    }
}
