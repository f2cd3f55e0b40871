//! Binary layout of the three shared queue files
//!
//! The queue state lives in three memory-mapped files:
//!
//! - `index`: [`IndexHeader`] followed by an append-only array of
//!   [`IndexEntry`] records, one per published message.
//! - `data`: [`DataHeader`] followed by the append-only payload arena.
//! - `control`: [`ControlHeader`] followed by a fixed table of
//!   [`ConsumerSlot`] records.
//!
//! All structures are 8-byte aligned and stored in host byte order; the queue
//! is host-local by design.

pub mod constants;
pub mod headers;

pub use constants::{
    align_up, CONTROL_MAGIC, DATA_MAGIC, FLAG_ABORTED, FLAG_PENDING, FLAG_READY, INDEX_MAGIC,
    LAYOUT_VERSION, QUEUE_ALIGN, SEM_NAME_CAP, SLOT_NAME_CAP,
};
pub use headers::{ConsumerSlot, ControlHeader, DataHeader, IndexEntry, IndexHeader};
