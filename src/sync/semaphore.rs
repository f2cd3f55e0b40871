//! Named POSIX semaphores
//!
//! The queue uses two host-global named semaphores: a counting "notify"
//! semaphore posted once per publish, and a binary "registry" semaphore that
//! serializes consumer-slot mutations. Names follow the host convention of a
//! leading `/`. Two queues sharing a name would silently share primitives, so
//! callers must pick unique names per queue.

use std::ffi::CString;
use std::io;
use std::time::Duration;

/// Sleep slice for the emulated timed wait
const TIMED_WAIT_SLICE: Duration = Duration::from_micros(500);

/// Handle to a named POSIX semaphore
///
/// Closing the handle never unlinks the name, so surviving processes can
/// reconnect; removal is an operator action via [`NamedSemaphore::unlink`].
#[derive(Debug)]
pub struct NamedSemaphore {
    sem: *mut libc::sem_t,
    name: CString,
}

// sem_t operations are thread-safe per POSIX.
unsafe impl Send for NamedSemaphore {}
unsafe impl Sync for NamedSemaphore {}

impl NamedSemaphore {
    /// Create a semaphore with `initial` tokens, adopting it if the name
    /// already exists
    pub fn create(name: &str, initial: u32) -> io::Result<Self> {
        let cname = cstring(name)?;
        let sem = unsafe {
            libc::sem_open(
                cname.as_ptr(),
                libc::O_CREAT | libc::O_EXCL,
                0o666 as libc::c_uint,
                initial as libc::c_uint,
            )
        };
        if sem == libc::SEM_FAILED {
            let err = io::Error::last_os_error();
            if err.raw_os_error() == Some(libc::EEXIST) {
                return Self::open(name);
            }
            return Err(err);
        }
        Ok(Self { sem, name: cname })
    }

    /// Open an existing semaphore by name
    pub fn open(name: &str) -> io::Result<Self> {
        let cname = cstring(name)?;
        let sem = unsafe { libc::sem_open(cname.as_ptr(), 0) };
        if sem == libc::SEM_FAILED {
            return Err(io::Error::last_os_error());
        }
        Ok(Self { sem, name: cname })
    }

    /// Increment the semaphore, waking one blocked waiter
    pub fn post(&self) -> io::Result<()> {
        if unsafe { libc::sem_post(self.sem) } != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    /// Decrement the semaphore, blocking until a token is available
    pub fn wait(&self) -> io::Result<()> {
        loop {
            if unsafe { libc::sem_wait(self.sem) } == 0 {
                return Ok(());
            }
            let err = io::Error::last_os_error();
            if err.raw_os_error() != Some(libc::EINTR) {
                return Err(err);
            }
        }
    }

    /// Try to decrement without blocking; `Ok(false)` when no token was
    /// available
    pub fn try_wait(&self) -> io::Result<bool> {
        if unsafe { libc::sem_trywait(self.sem) } == 0 {
            return Ok(true);
        }
        let err = io::Error::last_os_error();
        match err.raw_os_error() {
            Some(libc::EAGAIN) => Ok(false),
            Some(libc::EINTR) => Ok(false),
            _ => Err(err),
        }
    }

    /// Decrement with a timeout, emulated as try-wait plus 500 µs sleep
    /// slices for hosts without a native timed wait
    ///
    /// Returns `Ok(true)` when a token was consumed, `Ok(false)` on expiry.
    pub fn timed_wait(&self, timeout: Duration) -> io::Result<bool> {
        let mut waited = Duration::ZERO;
        loop {
            if self.try_wait()? {
                return Ok(true);
            }
            if waited >= timeout {
                return Ok(false);
            }
            std::thread::sleep(TIMED_WAIT_SLICE);
            waited += TIMED_WAIT_SLICE;
        }
    }

    /// The semaphore's name
    pub fn name(&self) -> &str {
        // constructed from &str, so always valid UTF-8
        self.name.to_str().unwrap_or("")
    }

    /// Remove the name from the host
    ///
    /// Existing handles stay usable; the name becomes free for re-creation.
    pub fn unlink(name: &str) -> io::Result<()> {
        let cname = cstring(name)?;
        if unsafe { libc::sem_unlink(cname.as_ptr()) } != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

impl Drop for NamedSemaphore {
    fn drop(&mut self) {
        unsafe {
            libc::sem_close(self.sem);
        }
    }
}

fn cstring(name: &str) -> io::Result<CString> {
    CString::new(name)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "semaphore name contains NUL"))
}
