//! Readiness engine on top of a completion port.
//!
//! This module turns one-shot completions into epoll-style readiness.
//! It includes:
//! - [`core`]: the [`Instance`](core::Instance) and its `ctl` operations
//! - [`event`]: event bits, payloads and trigger modes
//! - `registry`: the handle → Watch table and the per-Watch state machine
//! - `request`: submitting and cancelling poll requests
//! - `reaper`: applying drained completions to the registry
//! - `wait`: the blocking, timeout and alertable wait calls

pub mod core;
pub mod event;
mod reaper;
mod registry;
mod request;
mod wait;
