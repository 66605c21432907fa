//! Handle Registry: one [`Watch`] per registered handle.
//!
//! A deleted Watch whose poll request is still outstanding leaves the handle
//! map immediately (so the handle may be added again) but stays in the slab
//! as a `PendingDelete` tombstone until the reaper sees its completion.

use crate::error::{Error, Result};
use crate::port::Token;
use crate::reactor::event::{Event, Events, Payload, RawHandle, TriggerMode};
use crate::utils::slab::Slab;

use std::collections::{HashMap, VecDeque};

pub(crate) type WatchKey = usize;

/// Per-Watch state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WatchState {
    /// No outstanding request; the next arm pass submits one.
    Idle,

    /// The request `token` is outstanding.
    Armed { token: Token },

    /// A completion fired `events`. Edge and one-shot Watches stay here after
    /// being `reported` until the caller modifies them.
    Ready { events: Events, reported: bool },

    /// Removed by the caller while `token` was outstanding.
    PendingDelete { token: Token },
}

#[derive(Debug)]
pub(crate) struct Watch {
    pub(crate) handle: RawHandle,
    /// Readiness bits requested, trigger flags stripped.
    pub(crate) interest: Events,
    pub(crate) mode: TriggerMode,
    pub(crate) data: Payload,
    pub(crate) state: WatchState,
}

impl Watch {
    fn new(handle: RawHandle, event: &Event) -> Self {
        Self {
            handle,
            interest: event.events.readiness(),
            mode: event.events.trigger(),
            data: event.data,
            state: WatchState::Idle,
        }
    }
}

pub(crate) struct Registry {
    /// Live registrations. Tombstones are not in here.
    pub(crate) handles: HashMap<RawHandle, WatchKey>,
    pub(crate) watches: Slab<Watch>,

    /// Ready Watches not reported yet, in completion order.
    pub(crate) ready: VecDeque<WatchKey>,

    /// Watches that went `Idle` and need a request.
    pub(crate) updates: VecDeque<WatchKey>,

    /// Every outstanding request, including ones a `modify` already replaced.
    pub(crate) requests: HashMap<Token, WatchKey>,

    /// Events pushed with `Instance::post`, reported as they are.
    pub(crate) posted: VecDeque<Event>,

    next_token: u64,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self {
            handles: HashMap::new(),
            watches: Slab::new(),
            ready: VecDeque::new(),
            updates: VecDeque::new(),
            requests: HashMap::new(),
            posted: VecDeque::new(),
            next_token: 1,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.handles.len()
    }

    pub(crate) fn next_token(&mut self) -> Token {
        let token = Token(self.next_token);
        self.next_token += 1;
        token
    }

    /// Registers `handle` in the `Idle` state.
    ///
    /// # Errors
    /// [`Error::AlreadyRegistered`] if a live Watch exists, [`Error::OutOfMemory`]
    /// if the tables cannot grow.
    pub(crate) fn add(&mut self, handle: RawHandle, event: &Event) -> Result<WatchKey> {
        if self.handles.contains_key(&handle) {
            return Err(Error::AlreadyRegistered);
        }

        self.handles.try_reserve(1)?;
        self.watches.try_reserve()?;
        self.updates.try_reserve(1)?;
        self.requests.try_reserve(1)?;

        let key = self.watches.insert(Watch::new(handle, event));
        self.handles.insert(handle, key);
        self.updates.push_back(key);

        Ok(key)
    }

    /// Replaces interest, mode and payload, and sends the Watch back to `Idle`.
    ///
    /// Returns the outstanding request the caller must cancel, if any.
    pub(crate) fn modify(
        &mut self,
        handle: RawHandle,
        event: &Event,
    ) -> Result<(WatchKey, Option<Token>)> {
        let key = *self.handles.get(&handle).ok_or(Error::NotFound)?;
        let watch = self.watches.get_mut(key).ok_or(Error::NotFound)?;

        let previous = watch.state;
        *watch = Watch::new(handle, event);

        let cancel = match previous {
            WatchState::Armed { token } => Some(token),
            WatchState::Ready { reported, .. } => {
                if !reported {
                    self.ready.retain(|queued| *queued != key);
                }
                None
            }
            WatchState::Idle | WatchState::PendingDelete { .. } => None,
        };
        self.updates.push_back(key);

        Ok((key, cancel))
    }

    /// Unregisters `handle`.
    ///
    /// Returns the outstanding request the caller must cancel; the Watch then
    /// lives on as a tombstone until that request's completion is reaped.
    pub(crate) fn remove(&mut self, handle: RawHandle) -> Result<Option<Token>> {
        let key = self.handles.remove(&handle).ok_or(Error::NotFound)?;
        let Some(watch) = self.watches.get_mut(key) else {
            return Ok(None);
        };

        match watch.state {
            WatchState::Armed { token } => {
                watch.state = WatchState::PendingDelete { token };
                Ok(Some(token))
            }
            WatchState::Ready { reported, .. } => {
                if !reported {
                    self.ready.retain(|queued| *queued != key);
                }
                self.watches.remove(key);
                Ok(None)
            }
            WatchState::Idle | WatchState::PendingDelete { .. } => {
                self.watches.remove(key);
                Ok(None)
            }
        }
    }

    /// Queues a user event for the next wait.
    pub(crate) fn post(&mut self, event: Event) -> Result<()> {
        self.posted.try_reserve(1)?;
        self.posted.push_back(event);
        Ok(())
    }

    /// Moves a Watch to `Ready` and queues it for reporting.
    pub(crate) fn mark_ready(&mut self, key: WatchKey, events: Events) {
        if let Some(watch) = self.watches.get_mut(key) {
            watch.state = WatchState::Ready {
                events,
                reported: false,
            };
            self.ready.push_back(key);
        }
    }

    /// Moves a Watch to `Idle` and queues it for arming.
    pub(crate) fn mark_idle(&mut self, key: WatchKey) {
        if let Some(watch) = self.watches.get_mut(key) {
            watch.state = WatchState::Idle;
            self.updates.push_back(key);
        }
    }

    #[cfg(test)]
    pub(crate) fn state_of(&self, handle: RawHandle) -> Option<WatchState> {
        let key = self.handles.get(&handle)?;
        self.watches.get(*key).map(|watch| watch.state)
    }
}
