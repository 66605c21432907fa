use crate::builder::InstanceBuilder;
use crate::error::{Error, Result};
use crate::port::{Completion, CompletionPort, PollPort, Work};
use crate::reactor::event::{Event, RawHandle};
use crate::reactor::reaper::reap;
use crate::reactor::registry::Registry;
use crate::reactor::request::{arm_pending, cancel};

use parking_lot::{Mutex, ReentrantMutex};
use std::cell::RefCell;

/// Operation selector for [`Instance::ctl`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum CtlOp {
    Add = 1,
    Mod = 2,
    Del = 3,
}

impl TryFrom<i32> for CtlOp {
    type Error = Error;

    fn try_from(op: i32) -> Result<Self> {
        match op {
            1 => Ok(CtlOp::Add),
            2 => Ok(CtlOp::Mod),
            3 => Ok(CtlOp::Del),
            _ => Err(Error::InvalidArgument),
        }
    }
}

/// A readiness-notification instance.
///
/// Owns its completion port and the registrations made through [`Self::ctl`].
/// `ctl` may be called from any thread while another thread blocks in one of
/// the wait calls; the blocking step never holds the registry lock.
///
/// # Example
/// ```ignore
/// let instance = Instance::create1(0)?;
/// instance.add(fd, &Event::readable(Payload::Fd(fd)))?;
///
/// let mut events = [Event::default(); 16];
/// let n = instance.wait(&mut events, -1)?;
/// for event in &events[..n] {
///     println!("{:?} is ready: {:?}", event.data, event.events);
/// }
/// ```
pub struct Instance<P: CompletionPort = PollPort> {
    /// Guards registry mutation against reaping.
    pub(crate) registry: ReentrantMutex<RefCell<Registry>>,

    /// Held by the one thread running the blocking step; owns its completion buffer.
    pub(crate) poll: Mutex<Vec<Completion>>,

    pub(crate) port: P,

    /// Most completions drained per blocking step.
    pub(crate) batch: usize,

    closed: bool,
}

impl Instance<PollPort> {
    /// Creates an instance. `size` is only checked for sign.
    ///
    /// # Errors
    /// [`Error::InvalidArgument`] for a negative `size`, or the port's creation error.
    pub fn create(size: i32) -> Result<Self> {
        if size < 0 {
            return Err(Error::InvalidArgument);
        }

        InstanceBuilder::new().build()
    }

    /// Creates an instance. `flags` is reserved and must be zero.
    pub fn create1(flags: i32) -> Result<Self> {
        if flags != 0 {
            return Err(Error::InvalidArgument);
        }

        InstanceBuilder::new().build()
    }
}

impl<P: CompletionPort> Instance<P> {
    pub(crate) fn with_port(port: P, batch: usize) -> Self {
        Self {
            registry: ReentrantMutex::new(RefCell::new(Registry::new())),
            poll: Mutex::new(Vec::with_capacity(batch)),
            port,
            batch,
            closed: false,
        }
    }

    /// The completion port this instance runs on.
    pub fn port(&self) -> &P {
        &self.port
    }

    /// Number of live registrations.
    pub fn len(&self) -> usize {
        self.with_registry(|registry| registry.len())
    }

    /// Whether no handle is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn with_registry<R>(&self, function: impl FnOnce(&mut Registry) -> R) -> R {
        let guard = self.registry.lock();
        let mut registry = guard.borrow_mut();
        function(&mut registry)
    }

    /// Adds, modifies or deletes the registration of `handle`.
    ///
    /// `event` is required for [`CtlOp::Add`] and [`CtlOp::Mod`] and ignored for [`CtlOp::Del`].
    ///
    /// # Errors
    /// - [`Error::InvalidHandle`] for a negative handle
    /// - [`Error::InvalidArgument`] when `event` is missing
    /// - [`Error::AlreadyRegistered`] / [`Error::NotFound`] per operation
    pub fn ctl(&self, op: CtlOp, handle: RawHandle, event: Option<&Event>) -> Result<()> {
        if handle < 0 {
            return Err(Error::InvalidHandle);
        }

        match op {
            CtlOp::Add => self.add(handle, event.ok_or(Error::InvalidArgument)?),
            CtlOp::Mod => self.modify(handle, event.ok_or(Error::InvalidArgument)?),
            CtlOp::Del => self.delete(handle),
        }
    }

    /// Registers `handle` and arms its first poll request.
    pub fn add(&self, handle: RawHandle, event: &Event) -> Result<()> {
        log::trace!("add: handle={}, events={:?}", handle, event.events);
        if handle < 0 {
            return Err(Error::InvalidHandle);
        }

        self.with_registry(|registry| -> Result<()> {
            registry.add(handle, event)?;
            self.arm_and_notify(registry);
            Ok(())
        })
    }

    /// Replaces the interest, trigger flags and payload of `handle`.
    ///
    /// Takes effect on the very next wait: any outstanding request is
    /// cancelled and a fresh one covers the new interest.
    pub fn modify(&self, handle: RawHandle, event: &Event) -> Result<()> {
        log::trace!("modify: handle={}, events={:?}", handle, event.events);
        if handle < 0 {
            return Err(Error::InvalidHandle);
        }

        self.with_registry(|registry| -> Result<()> {
            let (_, replaced) = registry.modify(handle, event)?;
            if let Some(token) = replaced {
                cancel(&self.port, token);
            }
            self.arm_and_notify(registry);
            Ok(())
        })
    }

    /// Unregisters `handle`. Nothing is reported for it afterwards.
    pub fn delete(&self, handle: RawHandle) -> Result<()> {
        log::trace!("delete: handle={}", handle);
        if handle < 0 {
            return Err(Error::InvalidHandle);
        }

        self.with_registry(|registry| -> Result<()> {
            if let Some(token) = registry.remove(handle)? {
                cancel(&self.port, token);
            }
            Ok(())
        })
    }

    /// Arms queued Watches. A failed submission leaves the Watch ready, so a
    /// blocked waiter is woken to report it.
    fn arm_and_notify(&self, registry: &mut Registry) {
        let ready = registry.ready.len();
        arm_pending(registry, &self.port);
        if registry.ready.len() > ready {
            self.notify();
        }
    }

    fn notify(&self) {
        if let Err(err) = self.port.wake() {
            log::warn!("wake: {}", err);
        }
    }

    /// Pushes a user event; the next wait on any thread reports it unchanged.
    ///
    /// The event is not tied to a registration and is reported exactly once.
    pub fn post(&self, event: Event) -> Result<()> {
        log::trace!("post: events={:?}, data={:?}", event.events, event.data);
        self.with_registry(|registry| registry.post(event))?;
        self.port.wake()?;
        Ok(())
    }

    /// Queues `work` on the port; the next alertable wait runs it and returns.
    pub fn queue_work(&self, work: impl FnOnce() + Send + 'static) -> Result<()> {
        let work: Work = Box::new(work);
        self.port.queue_work(work)?;
        Ok(())
    }

    /// Cancels every outstanding request, waits for their completions and
    /// releases the instance.
    pub fn close(mut self) -> Result<()> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let registry = self.registry.get_mut().get_mut();
        log::trace!(
            "close: {} registration(s), {} outstanding request(s)",
            registry.len(),
            registry.requests.len()
        );

        for token in registry.requests.keys() {
            cancel(&self.port, *token);
        }

        let completions = self.poll.get_mut();
        while !registry.requests.is_empty() {
            self.port.wait(completions, self.batch, None, false)?;
            reap(registry, completions);
            // Reaping re-queues cancelled Watches for arming; nothing is armed any more.
            registry.updates.clear();
        }

        Ok(())
    }
}

impl<P: CompletionPort> Drop for Instance<P> {
    fn drop(&mut self) {
        if let Err(err) = self.shutdown() {
            log::warn!("close: {}", err);
        }
    }
}

impl<P: CompletionPort> std::fmt::Debug for Instance<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (registrations, watches) =
            self.with_registry(|registry| (registry.len(), registry.watches.len()));
        f.debug_struct("Instance")
            .field("registrations", &registrations)
            .field("tombstones", &watches.saturating_sub(registrations))
            .field("batch", &self.batch)
            .finish()
    }
}
