//! C entry points.
//!
//! The layout and constants match `include/epoll_shim.h`. Symbols are exported
//! with an `epoll_shim_` prefix so they never collide with a system epoll; the
//! header maps the familiar names onto them.
//!
//! An instance handle is a boxed [`Instance`] tagged with a signature. Any
//! failure returns `-1` (a null handle for the create calls) and leaves the
//! error code in `errno`.

#![allow(non_camel_case_types)]

use crate::error::{Error, Result, set_last_error};
use crate::reactor::core::{CtlOp, Instance};
use crate::reactor::event::{Event, Events, Payload, RawHandle};
use crate::time::{timeout_from_millis, timeout_from_timespec};

use std::ffi::{c_int, c_void};
use std::ptr;
use std::time::Duration;

pub type HANDLE = *mut c_void;
pub type SOCKET = usize;

pub const EPOLLIN: u32 = Events::IN.bits();
pub const EPOLLOUT: u32 = Events::OUT.bits();
pub const EPOLLHUP: u32 = Events::HUP.bits();
pub const EPOLLERR: u32 = Events::ERR.bits();
pub const EPOLLET: u32 = Events::ET.bits();
pub const EPOLLONESHOT: u32 = Events::ONESHOT.bits();

pub const EPOLL_CTL_ADD: c_int = CtlOp::Add as c_int;
pub const EPOLL_CTL_MOD: c_int = CtlOp::Mod as c_int;
pub const EPOLL_CTL_DEL: c_int = CtlOp::Del as c_int;

/// User data, handed back unmodified with every event.
#[repr(C)]
#[derive(Clone, Copy)]
pub union epoll_data {
    pub ptr: *mut c_void,
    pub fd: c_int,
    pub u32: u32,
    #[cfg(target_pointer_width = "64")]
    pub u64: u64,
    pub sock: SOCKET,
    pub hnd: HANDLE,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct epoll_event {
    pub data: epoll_data,
    pub __overlapped: *mut c_void,
    pub __internal: usize,
    pub events: u32,
}

impl From<Payload> for epoll_data {
    fn from(payload: Payload) -> Self {
        let mut data = epoll_data { sock: 0 };
        match payload {
            Payload::Ptr(value) => data.sock = value,
            Payload::Fd(fd) => data.fd = fd,
            Payload::U32(value) => data.u32 = value,
            Payload::U64(value) => data.sock = value as usize,
            Payload::Handle(handle) => data.hnd = handle as isize as HANDLE,
        }
        data
    }
}

impl From<epoll_data> for Payload {
    /// The union is carried as one pointer-sized value, whichever member was set.
    fn from(data: epoll_data) -> Self {
        Payload::Ptr(unsafe { data.sock })
    }
}

impl From<&epoll_event> for Event {
    fn from(event: &epoll_event) -> Self {
        Event::new(Events::from_bits_truncate(event.events), event.data.into())
    }
}

impl From<Event> for epoll_event {
    fn from(event: Event) -> Self {
        epoll_event {
            data: event.data.into(),
            __overlapped: ptr::null_mut(),
            __internal: 0,
            events: event.events.bits(),
        }
    }
}

const SIGNATURE: u32 = u32::from_be_bytes(*b"epol");

struct EpollHandle {
    signature: u32,
    instance: Instance,
}

/// Resolves `ephnd` to its instance.
///
/// # Safety
/// `ephnd` must be null or a handle returned by a create call and not yet closed.
unsafe fn instance_of<'a>(ephnd: HANDLE) -> Result<&'a Instance> {
    let handle = ephnd.cast::<EpollHandle>();
    if handle.is_null() || !handle.is_aligned() {
        return Err(Error::InvalidHandle);
    }

    let handle = unsafe { &*handle };
    if handle.signature != SIGNATURE {
        return Err(Error::InvalidHandle);
    }
    Ok(&handle.instance)
}

fn raw_handle(handle: HANDLE) -> Result<RawHandle> {
    RawHandle::try_from(handle as isize).map_err(|_| Error::InvalidHandle)
}

fn into_handle(result: Result<Instance>) -> HANDLE {
    match result {
        Ok(instance) => Box::into_raw(Box::new(EpollHandle {
            signature: SIGNATURE,
            instance,
        }))
        .cast(),
        Err(err) => {
            set_last_error(err.code());
            ptr::null_mut()
        }
    }
}

fn into_status(result: Result<usize>) -> c_int {
    match result {
        Ok(count) => c_int::try_from(count).unwrap_or(c_int::MAX),
        Err(err) => {
            log::trace!("ffi: {}", err);
            set_last_error(err.code());
            -1
        }
    }
}

#[unsafe(export_name = "epoll_shim_create")]
pub extern "C" fn epoll_create(size: c_int) -> HANDLE {
    into_handle(Instance::create(size))
}

#[unsafe(export_name = "epoll_shim_create1")]
pub extern "C" fn epoll_create1(flags: c_int) -> HANDLE {
    into_handle(Instance::create1(flags))
}

/// # Safety
/// `ephnd` must come from a create call and must not be used afterwards.
#[unsafe(export_name = "epoll_shim_close")]
pub unsafe extern "C" fn epoll_close(ephnd: HANDLE) -> c_int {
    let result = unsafe { instance_of(ephnd) }.and_then(|_| {
        let mut handle = unsafe { Box::from_raw(ephnd.cast::<EpollHandle>()) };
        handle.signature = 0;
        let EpollHandle { instance, .. } = *handle;
        instance.close()
    });
    into_status(result.map(|()| 0))
}

/// # Safety
/// `ephnd` must be a live handle and `event` null or valid for reads.
#[unsafe(export_name = "epoll_shim_ctl")]
pub unsafe extern "C" fn epoll_ctl(
    ephnd: HANDLE,
    op: c_int,
    handle: HANDLE,
    event: *mut epoll_event,
) -> c_int {
    let result = (|| -> Result<()> {
        let instance = unsafe { instance_of(ephnd)? };
        let op = CtlOp::try_from(op)?;
        let handle = raw_handle(handle)?;
        let event = unsafe { event.as_ref() }.map(Event::from);
        instance.ctl(op, handle, event.as_ref())
    })();
    into_status(result.map(|()| 0))
}

/// # Safety
/// `ephnd` must be a live handle and `events` valid for `maxevents` writes.
#[unsafe(export_name = "epoll_shim_wait")]
pub unsafe extern "C" fn epoll_wait(
    ephnd: HANDLE,
    events: *mut epoll_event,
    maxevents: c_int,
    timeout: c_int,
) -> c_int {
    unsafe { wait_into(ephnd, events, maxevents, Ok(timeout_from_millis(timeout)), false) }
}

/// # Safety
/// See [`epoll_wait`].
#[unsafe(export_name = "epoll_shim_pwait")]
pub unsafe extern "C" fn epoll_pwait(
    ephnd: HANDLE,
    events: *mut epoll_event,
    maxevents: c_int,
    timeout: c_int,
    alertable: bool,
) -> c_int {
    unsafe {
        wait_into(
            ephnd,
            events,
            maxevents,
            Ok(timeout_from_millis(timeout)),
            alertable,
        )
    }
}

/// A null `timeout` waits forever.
///
/// # Safety
/// See [`epoll_wait`]; `timeout` must be null or valid for reads.
#[unsafe(export_name = "epoll_shim_pwait2")]
pub unsafe extern "C" fn epoll_pwait2(
    ephnd: HANDLE,
    events: *mut epoll_event,
    maxevents: c_int,
    timeout: *const libc::timespec,
    alertable: bool,
) -> c_int {
    let timeout = match unsafe { timeout.as_ref() } {
        None => Ok(None),
        Some(ts) => timeout_from_timespec(ts.tv_sec as i64, ts.tv_nsec as i64).map(Some),
    };
    unsafe { wait_into(ephnd, events, maxevents, timeout, alertable) }
}

/// Staging buffers hold at most this many completion batches; further ready
/// events stay queued for the next call.
const STAGING_BATCHES: usize = 4;

fn staging_capacity(maxevents: usize, batch: usize) -> usize {
    maxevents.min(batch.saturating_mul(STAGING_BATCHES)).max(1)
}

unsafe fn wait_into(
    ephnd: HANDLE,
    events: *mut epoll_event,
    maxevents: c_int,
    timeout: Result<Option<Duration>>,
    alertable: bool,
) -> c_int {
    let result = (|| -> Result<usize> {
        let instance = unsafe { instance_of(ephnd)? };
        if events.is_null() || maxevents <= 0 {
            return Err(Error::InvalidArgument);
        }
        let timeout = timeout?;

        let capacity = staging_capacity(maxevents as usize, instance.batch);
        let mut buffer = Vec::new();
        buffer.try_reserve_exact(capacity)?;
        buffer.resize(capacity, Event::default());

        let count = instance.pwait2(&mut buffer, timeout, alertable)?;
        for (index, event) in buffer[..count].iter().enumerate() {
            unsafe { events.add(index).write(epoll_event::from(*event)) };
        }
        Ok(count)
    })();
    into_status(result)
}
