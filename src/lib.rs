//! epoll-style readiness notification on top of a completion port.
//!
//! Callers create an [`Instance`], register handles with an interest mask,
//! and block until registered handles become ready. Underneath, every
//! registration is a sequence of one-shot asynchronous poll requests whose
//! completions are merged into level-triggered, edge-triggered or one-shot
//! readiness.
//!
//! # Architecture
//!
//! - **Instance**: owns the registry, the completion port and their locks
//! - **Registry**: one Watch per handle with an explicit state machine
//! - **Request manager**: arms and cancels poll requests without blocking
//! - **Reaper**: reconciles completions, including cancel/complete races
//! - **Wait orchestrator**: timeouts, alertable waits and re-arming
//! - **CompletionPort**: the asynchronous mechanism; [`PollPort`] on Unix
//! - **InstanceBuilder**: fluent configuration
//! - **ffi**: C entry points matching `include/epoll_shim.h`

mod builder;
mod error;
pub mod ffi;
pub mod port;
mod reactor;
pub mod time;
mod utils;

pub use builder::{DEFAULT_COMPLETION_BATCH, InstanceBuilder};
pub use error::{Error, Result, last_error, set_last_error};
pub use port::{Completion, CompletionPort, CompletionStatus, PollPort, Token, WaitStatus, Work};
pub use reactor::core::{CtlOp, Instance};
pub use reactor::event::{Event, Events, Payload, RawHandle, TriggerMode};
