//! Error taxonomy shared by the Rust API and the C entry points.
//!
//! Every fallible operation returns [`Result`]. The C layer in [`crate::ffi`]
//! converts an [`Error`] into an errno value with [`set_last_error`] and
//! reports `-1` (or a null handle) to its caller.

use std::collections::TryReserveError;
use std::io;

/// Errors reported by an [`Instance`](crate::Instance).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The instance or handle is not a live, correctly-typed object.
    #[error("invalid instance or handle")]
    InvalidHandle,

    /// A zero capacity, a missing event, an unknown operation or non-zero reserved flags.
    #[error("invalid argument")]
    InvalidArgument,

    /// `ADD` on a handle that already has a live registration.
    #[error("handle is already registered")]
    AlreadyRegistered,

    /// `MOD` or `DEL` on a handle without a live registration.
    #[error("handle is not registered")]
    NotFound,

    /// Allocation failed while creating an instance or registering a handle.
    #[error("out of memory")]
    OutOfMemory,

    /// The completion port refused a poll request for one registration.
    ///
    /// This never fails a wait; the registration is reported with `EPOLLERR` instead.
    #[error("failed to submit poll request: {0}")]
    PollSubmitFailed(#[source] io::Error),

    /// The completion port itself failed.
    #[error("completion port error: {0}")]
    Io(#[from] io::Error),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// The errno value that describes this error.
    pub fn code(&self) -> i32 {
        match self {
            Error::InvalidHandle => libc::EBADF,
            Error::InvalidArgument => libc::EINVAL,
            Error::AlreadyRegistered => libc::EEXIST,
            Error::NotFound => libc::ENOENT,
            Error::OutOfMemory => libc::ENOMEM,
            Error::PollSubmitFailed(_) => libc::EIO,
            Error::Io(err) => err.raw_os_error().unwrap_or(libc::EIO),
        }
    }
}

impl From<TryReserveError> for Error {
    fn from(_: TryReserveError) -> Self {
        Error::OutOfMemory
    }
}

/// Stores `code` in the calling thread's `errno`.
pub fn set_last_error(code: i32) {
    unsafe { *errno_location() = code };
}

/// Reads the calling thread's `errno`.
pub fn last_error() -> i32 {
    unsafe { *errno_location() }
}

#[cfg(any(target_os = "linux", target_os = "android", target_os = "emscripten"))]
unsafe fn errno_location() -> *mut i32 {
    unsafe { libc::__errno_location() }
}

#[cfg(any(
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "dragonfly"
))]
unsafe fn errno_location() -> *mut i32 {
    unsafe { libc::__error() }
}

#[cfg(any(target_os = "netbsd", target_os = "openbsd"))]
unsafe fn errno_location() -> *mut i32 {
    unsafe { libc::__errno() }
}
