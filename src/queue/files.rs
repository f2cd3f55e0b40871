//! The three mapped queue files and their typed views
//!
//! All pointer derivation from the mappings happens here. Accessors compute
//! from the current base address on every call, so a grow-and-remap never
//! leaves a stale typed pointer behind.

use std::io;
use std::mem::size_of;
use std::sync::atomic::Ordering;

use crate::layout::constants::{align_up, INDEX_GROW_ENTRIES};
use crate::layout::headers::{ConsumerSlot, ControlHeader, DataHeader, IndexEntry, IndexHeader};
use crate::mapping::MappedFile;

/// Ownership of the three mappings for one queue handle
///
/// In the producer role all three are writable; in the consumer role `index`
/// and `data` are read-only and `control` is shared read-write.
#[derive(Debug)]
pub(crate) struct QueueFiles {
    pub(crate) index: MappedFile,
    pub(crate) data: MappedFile,
    pub(crate) control: MappedFile,
}

impl QueueFiles {
    /// Typed view of the index header
    ///
    /// The mapping is validated to cover the header at construction.
    pub(crate) fn index_header(&self) -> &IndexHeader {
        unsafe { &*(self.index.as_ptr() as *const IndexHeader) }
    }

    /// Typed view of the data header
    pub(crate) fn data_header(&self) -> &DataHeader {
        unsafe { &*(self.data.as_ptr() as *const DataHeader) }
    }

    /// Typed view of the control header
    pub(crate) fn control_header(&self) -> &ControlHeader {
        unsafe { &*(self.control.as_ptr() as *const ControlHeader) }
    }

    /// Mutable control header, producer init only
    ///
    /// # Safety
    ///
    /// Producer-owned; callers re-stamp the whole control file while no
    /// consumer registration is considered valid.
    pub(crate) unsafe fn control_header_mut(&self) -> &mut ControlHeader {
        &mut *(self.control.as_mut_ptr() as *mut ControlHeader)
    }

    /// Pointer to entry `seq`; caller checks `seq < entry_capacity()`
    pub(crate) fn entry(&self, seq: u64) -> *const IndexEntry {
        debug_assert!(seq < self.entry_capacity());
        unsafe {
            (self.index.as_ptr().add(size_of::<IndexHeader>()) as *const IndexEntry)
                .add(seq as usize)
        }
    }

    /// Writable pointer to entry `seq`, producer only
    ///
    /// # Safety
    ///
    /// Single-writer: only the producer writes entries, and only at
    /// `next_seq` before publishing it.
    pub(crate) unsafe fn entry_mut(&self, seq: u64) -> *mut IndexEntry {
        debug_assert!(seq < self.entry_capacity());
        (self.index.as_mut_ptr().add(size_of::<IndexHeader>()) as *mut IndexEntry)
            .add(seq as usize)
    }

    /// Number of entries the current index mapping can hold
    pub(crate) fn entry_capacity(&self) -> u64 {
        ((self.index.len() - size_of::<IndexHeader>()) / size_of::<IndexEntry>()) as u64
    }

    /// Base of the payload arena
    pub(crate) fn payload(&self) -> *const u8 {
        unsafe { self.data.as_ptr().add(size_of::<DataHeader>()) }
    }

    /// Writable base of the payload arena, producer only
    ///
    /// # Safety
    ///
    /// Single-writer: only the producer appends, beyond `write_pos`.
    pub(crate) unsafe fn payload_mut(&self) -> *mut u8 {
        self.data.as_mut_ptr().add(size_of::<DataHeader>())
    }

    /// Payload bytes covered by the current data mapping
    pub(crate) fn payload_capacity(&self) -> u64 {
        (self.data.len() - size_of::<DataHeader>()) as u64
    }

    /// Consumer slot `i`; caller checks `i < max_consumers`
    pub(crate) fn slot(&self, i: u32) -> &ConsumerSlot {
        debug_assert!(i < self.control_header().max_consumers);
        unsafe { &*self.slot_ptr(i) }
    }

    /// Raw pointer to slot `i`, used for claim writes under the registry lock
    pub(crate) fn slot_ptr(&self, i: u32) -> *mut ConsumerSlot {
        unsafe {
            (self.control.as_mut_ptr().add(size_of::<ControlHeader>()) as *mut ConsumerSlot)
                .add(i as usize)
        }
    }

    /// Grow the data file so the arena covers `required_end` payload bytes
    ///
    /// Grows by 10% of the current mapped size, or directly to the required
    /// size when 10% is not enough, then refreshes `file_size`.
    pub(crate) fn grow_data(&mut self, required_end: u64) -> io::Result<()> {
        let required_file = size_of::<DataHeader>() as u64 + required_end;
        let tenth_up = self.data.len() as u64 * 11 / 10;
        let new_len = align_up(tenth_up.max(required_file), 8) as usize;
        self.data.extend(new_len)?;
        let payload = (new_len - size_of::<DataHeader>()) as u64;
        self.data_header().file_size.store(payload, Ordering::Relaxed);
        Ok(())
    }

    /// Grow the index file so entry `seq` fits, in chunks of at least
    /// 64 Ki entries
    pub(crate) fn grow_index(&mut self, seq: u64) -> io::Result<()> {
        let goal_entries = seq + INDEX_GROW_ENTRIES;
        let new_len = size_of::<IndexHeader>() + goal_entries as usize * size_of::<IndexEntry>();
        self.index.extend(new_len)
    }

    /// Remap the index at its current on-disk size after a producer grow
    pub(crate) fn refresh_index(&mut self) -> io::Result<()> {
        self.index.remap()
    }

    /// Remap the data file at its current on-disk size after a producer grow
    pub(crate) fn refresh_data(&mut self) -> io::Result<()> {
        self.data.remap()
    }
}
