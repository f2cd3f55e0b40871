//! Cross-process wakeup primitives
//!
//! The queue's only blocking coordination is through named POSIX semaphores:
//! one counting semaphore carries "new entries" wake hints, one binary
//! semaphore serializes the consumer registry. Tokens may drift relative to
//! published entries, so waiters treat a wakeup strictly as a hint and
//! re-check the index afterwards.

pub mod semaphore;

pub use semaphore::NamedSemaphore;

/// Monotonic clock reading in nanoseconds, used for slot heartbeats
pub(crate) fn monotonic_ns() -> u64 {
    match nix::time::clock_gettime(nix::time::ClockId::CLOCK_MONOTONIC) {
        Ok(ts) => ts.tv_sec() as u64 * 1_000_000_000 + ts.tv_nsec() as u64,
        Err(_) => 0,
    }
}
