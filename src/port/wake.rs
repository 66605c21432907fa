use libc::{F_GETFD, F_GETFL, F_SETFD, F_SETFL, FD_CLOEXEC, O_NONBLOCK, close, fcntl, pipe};
use std::io;
use std::os::fd::RawFd;

/// Self-pipe used to interrupt a blocked `poll(2)`.
#[derive(Debug)]
pub(crate) struct WakePipe {
    reader: RawFd,
    writer: RawFd,
}

impl WakePipe {
    pub(crate) fn new() -> io::Result<Self> {
        let mut fds = [0 as RawFd; 2];
        if unsafe { pipe(fds.as_mut_ptr()) } < 0 {
            return Err(io::Error::last_os_error());
        }

        let wake = Self {
            reader: fds[0],
            writer: fds[1],
        };
        for fd in fds {
            set_nonblocking(fd)?;
            set_cloexec(fd)?;
        }

        Ok(wake)
    }

    pub(crate) fn reader(&self) -> RawFd {
        self.reader
    }

    /// Makes the read end readable. A full pipe already is, so `EAGAIN` is fine.
    pub(crate) fn wake(&self) -> io::Result<()> {
        let byte = 1u8;
        let res = unsafe { libc::write(self.writer, &byte as *const u8 as *const _, 1) };
        if res < 0 {
            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::WouldBlock {
                return Err(err);
            }
        }

        Ok(())
    }

    /// Empties the pipe.
    pub(crate) fn drain(&self) {
        let mut buf = [0u8; 64];
        loop {
            let res = unsafe { libc::read(self.reader, buf.as_mut_ptr() as *mut _, buf.len()) };
            if res <= 0 {
                break;
            }
        }
    }
}

impl Drop for WakePipe {
    fn drop(&mut self) {
        unsafe {
            close(self.reader);
            close(self.writer);
        }
    }
}

fn set_nonblocking(fd: RawFd) -> io::Result<()> {
    let flags = unsafe { fcntl(fd, F_GETFL) };
    if flags < 0 || unsafe { fcntl(fd, F_SETFL, flags | O_NONBLOCK) } < 0 {
        return Err(io::Error::last_os_error());
    }

    Ok(())
}

fn set_cloexec(fd: RawFd) -> io::Result<()> {
    let flags = unsafe { fcntl(fd, F_GETFD) };
    if flags < 0 || unsafe { fcntl(fd, F_SETFD, flags | FD_CLOEXEC) } < 0 {
        return Err(io::Error::last_os_error());
    }

    Ok(())
}
