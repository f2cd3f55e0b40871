//! Consumer registry backed by the control file's slot table
//!
//! Every slot mutation runs under the registry-lock semaphore. Single-word
//! reads of a slot's cursor or active flag need no lock; only allocation of
//! the `active`/`name`/`last_seq` triple must be mutually exclusive.

use std::sync::atomic::Ordering;

use log::warn;

use crate::error::{QueueError, Result};
use crate::layout::headers::copy_name;
use crate::sync::{monotonic_ns, NamedSemaphore};

use super::files::QueueFiles;

/// Releases the registry lock on scope exit
struct RegistryGuard<'a>(&'a NamedSemaphore);

impl Drop for RegistryGuard<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.0.post() {
            warn!("registry unlock failed: {}", err);
        }
    }
}

/// Register `name` in the slot table, reusing an active slot with the same
/// name
///
/// A reused slot keeps its cursor; `start_seq` only seeds a freshly claimed
/// slot. Returns the slot index, or [`QueueError::ConsumerSlotsFull`] when
/// every slot is taken by another name.
pub(crate) fn register(
    files: &QueueFiles,
    lock: &NamedSemaphore,
    name: &str,
    start_seq: u64,
) -> Result<u32> {
    lock.wait()
        .map_err(|source| QueueError::RegistryLock { source })?;
    let _guard = RegistryGuard(lock);

    let max_consumers = files.control_header().max_consumers;

    // reattach: an active slot carrying this exact name keeps its cursor
    for i in 0..max_consumers {
        let slot = files.slot(i);
        if slot.active.load(Ordering::Acquire) != 0 && slot.name_matches(name.as_bytes()) {
            return Ok(i);
        }
    }

    for i in 0..max_consumers {
        let slot = files.slot(i);
        if slot.active.load(Ordering::Acquire) != 0 {
            continue;
        }
        let raw = files.slot_ptr(i);
        unsafe {
            copy_name(&mut (*raw).name, name.as_bytes());
            (*raw).last_seq.store(start_seq, Ordering::Relaxed);
            (*raw).last_update_ns.store(monotonic_ns(), Ordering::Relaxed);
            // publish the claim last so a lock-free observer never sees an
            // active slot with a half-written name
            (*raw).active.store(1, Ordering::Release);
        }
        return Ok(i);
    }

    Err(QueueError::ConsumerSlotsFull)
}
