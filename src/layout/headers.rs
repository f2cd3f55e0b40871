//! Header structures shared through the mapped queue files
//!
//! Every structure here is `#[repr(C)]`, 8-byte aligned and free of implicit
//! padding, so the in-memory representation is exactly the on-disk byte
//! layout. Fields observed concurrently across processes are declared as
//! atomics; they share the representation of their plain integer counterparts.

use std::mem::size_of;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use crate::error::{QueueError, Result};

use super::constants::*;

/// Header at the start of the index file
///
/// Followed by a dense array of [`IndexEntry`] records indexed by sequence
/// number. `next_seq` is the visibility fence: a reader that acquire-loads
/// `next_seq == N` is guaranteed to observe entries `0..N` and their payload
/// bytes fully written.
#[repr(C)]
pub struct IndexHeader {
    /// Magic number for validation
    pub magic: u64,
    /// Layout version
    pub version: u32,
    /// Structure alignment, always 8
    pub align: u32,
    /// Count of committed entries, producer-owned, release-published
    pub next_seq: AtomicU64,
    /// Mirror of `next_seq`
    pub entry_count: AtomicU64,
}

impl IndexHeader {
    /// Stamp a freshly created header
    pub fn init(&mut self) {
        self.magic = INDEX_MAGIC;
        self.version = LAYOUT_VERSION;
        self.align = QUEUE_ALIGN;
        self.next_seq.store(0, Ordering::Relaxed);
        self.entry_count.store(0, Ordering::Relaxed);
    }

    /// Validate magic, version and alignment
    pub fn validate(&self) -> Result<()> {
        if self.magic != INDEX_MAGIC {
            return Err(QueueError::IndexSanity {
                detail: "bad magic",
            });
        }
        if self.version != LAYOUT_VERSION {
            return Err(QueueError::IndexSanity {
                detail: "unsupported version",
            });
        }
        if self.align != QUEUE_ALIGN {
            return Err(QueueError::IndexSanity {
                detail: "unexpected alignment",
            });
        }
        Ok(())
    }
}

/// One committed message in the index file
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct IndexEntry {
    /// Sequence number, equals the entry's array position
    pub seq: u64,
    /// Payload offset divided by 8; caps the arena at 32 GiB
    pub off8: u32,
    /// Payload length in bytes
    pub len: u32,
    /// `FLAG_READY` / `FLAG_ABORTED` bits
    pub flags: u32,
    /// Zero
    pub reserved: u32,
}

impl IndexEntry {
    /// Byte offset of the payload in the data arena
    #[inline]
    pub fn offset(&self) -> u64 {
        (self.off8 as u64) << 3
    }

    /// Whether a consumer may return this entry
    #[inline]
    pub fn is_readable(&self) -> bool {
        self.flags & FLAG_READY != 0 && self.flags & FLAG_ABORTED == 0
    }
}

/// Header at the start of the data file, followed by the payload arena
#[repr(C)]
pub struct DataHeader {
    /// Magic number for validation
    pub magic: u64,
    /// Layout version
    pub version: u32,
    /// Structure alignment, always 8
    pub align: u32,
    /// Producer-owned byte cursor into the arena, always 8-aligned
    pub write_pos: AtomicU64,
    /// Payload bytes available in the current mapping
    pub file_size: AtomicU64,
}

impl DataHeader {
    /// Stamp a freshly created header
    pub fn init(&mut self, payload_bytes: u64) {
        self.magic = DATA_MAGIC;
        self.version = LAYOUT_VERSION;
        self.align = QUEUE_ALIGN;
        self.write_pos.store(0, Ordering::Relaxed);
        self.file_size.store(payload_bytes, Ordering::Relaxed);
    }

    /// Validate magic, version and alignment
    pub fn validate(&self) -> Result<()> {
        if self.magic != DATA_MAGIC {
            return Err(QueueError::DataSanity {
                detail: "bad magic",
            });
        }
        if self.version != LAYOUT_VERSION {
            return Err(QueueError::DataSanity {
                detail: "unsupported version",
            });
        }
        if self.align != QUEUE_ALIGN {
            return Err(QueueError::DataSanity {
                detail: "unexpected alignment",
            });
        }
        Ok(())
    }
}

/// Header at the start of the control file
///
/// Followed by `max_consumers` [`ConsumerSlot`] records. The producer owns
/// this header: it re-stamps the whole control file on every init, so a
/// producer restart invalidates any live consumer registration.
#[repr(C)]
pub struct ControlHeader {
    /// Magic number for validation
    pub magic: u64,
    /// Layout version
    pub version: u32,
    /// Structure alignment, always 8
    pub align: u32,
    /// Fixed capacity of the slot table
    pub max_consumers: u32,
    /// Zero
    pub reserved: u32,
    /// Advisory counter, incremented once per publish
    pub notify_seq: AtomicU64,
    /// NUL-terminated name of the notify semaphore
    pub notify_sem: [u8; SEM_NAME_CAP],
    /// NUL-terminated name of the registry-lock semaphore
    pub registry_sem: [u8; SEM_NAME_CAP],
}

impl ControlHeader {
    /// Stamp a freshly zeroed header
    pub fn init(&mut self, max_consumers: u32, notify_name: &str, registry_name: &str) {
        self.magic = CONTROL_MAGIC;
        self.version = LAYOUT_VERSION;
        self.align = QUEUE_ALIGN;
        self.max_consumers = max_consumers;
        self.reserved = 0;
        self.notify_seq.store(0, Ordering::Relaxed);
        copy_name(&mut self.notify_sem, notify_name.as_bytes());
        copy_name(&mut self.registry_sem, registry_name.as_bytes());
    }

    /// Validate magic, version and alignment
    pub fn validate(&self) -> Result<()> {
        if self.magic != CONTROL_MAGIC {
            return Err(QueueError::ControlSanity {
                detail: "bad magic",
            });
        }
        if self.version != LAYOUT_VERSION {
            return Err(QueueError::ControlSanity {
                detail: "unsupported version",
            });
        }
        if self.align != QUEUE_ALIGN {
            return Err(QueueError::ControlSanity {
                detail: "unexpected alignment",
            });
        }
        Ok(())
    }

    /// The stored notify-semaphore name, up to the first NUL
    pub fn notify_sem_name(&self) -> Result<&str> {
        name_str(&self.notify_sem).ok_or(QueueError::ControlSanity {
            detail: "notify semaphore name is not valid UTF-8",
        })
    }

    /// The stored registry-lock name, up to the first NUL
    pub fn registry_sem_name(&self) -> Result<&str> {
        name_str(&self.registry_sem).ok_or(QueueError::ControlSanity {
            detail: "registry semaphore name is not valid UTF-8",
        })
    }
}

/// One registered consumer in the control file
///
/// A slot is claimed under the registry lock; after that, `last_seq` and the
/// heartbeat are written only by the owning consumer.
#[repr(C)]
pub struct ConsumerSlot {
    /// Next sequence number this consumer will read
    pub last_seq: AtomicU64,
    /// Heartbeat, monotonic nanoseconds of the last drain
    pub last_update_ns: AtomicU64,
    /// 1 when the slot is in use
    pub active: AtomicU32,
    /// NUL-terminated consumer name
    pub name: [u8; SLOT_NAME_CAP],
}

impl ConsumerSlot {
    /// Bounded comparison of the stored name against `candidate`
    ///
    /// Matches the truncation applied at claim time, so a name longer than
    /// the buffer still reattaches to the slot it originally claimed.
    pub fn name_matches(&self, candidate: &[u8]) -> bool {
        let n = candidate.len().min(SLOT_NAME_CAP - 1);
        self.name[..n] == candidate[..n] && self.name[n] == 0
    }
}

/// Copy `src` into a fixed NUL-terminated buffer, truncating to capacity
pub fn copy_name(dst: &mut [u8], src: &[u8]) {
    dst.fill(0);
    let n = src.len().min(dst.len() - 1);
    dst[..n].copy_from_slice(&src[..n]);
}

fn name_str(buf: &[u8]) -> Option<&str> {
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    std::str::from_utf8(&buf[..end]).ok()
}

// The wire layout is load-bearing; a silent size change would corrupt
// existing queue files.
const _: () = assert!(size_of::<IndexHeader>() == 32);
const _: () = assert!(size_of::<IndexEntry>() == 24);
const _: () = assert!(size_of::<DataHeader>() == 32);
const _: () = assert!(size_of::<ControlHeader>() == 160);
const _: () = assert!(size_of::<ConsumerSlot>() == 64);

#[cfg(test)]
mod tests {
    use super::*;

    fn zeroed<T>() -> T {
        unsafe { std::mem::zeroed() }
    }

    #[test]
    fn test_index_header_init_and_validate() {
        let mut h: IndexHeader = zeroed();
        assert!(h.validate().is_err());
        h.init();
        h.validate().unwrap();
        assert_eq!(h.next_seq.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_validate_rejects_wrong_version() {
        let mut h: DataHeader = zeroed();
        h.init(4096);
        h.version = 2;
        match h.validate() {
            Err(QueueError::DataSanity { detail }) => assert_eq!(detail, "unsupported version"),
            other => panic!("unexpected: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_control_header_stores_names() {
        let mut h: ControlHeader = zeroed();
        h.init(8, "/q-notify", "/q-registry");
        h.validate().unwrap();
        assert_eq!(h.notify_sem_name().unwrap(), "/q-notify");
        assert_eq!(h.registry_sem_name().unwrap(), "/q-registry");
        assert_eq!(h.max_consumers, 8);
    }

    #[test]
    fn test_name_truncation() {
        let mut buf = [0xffu8; SLOT_NAME_CAP];
        let long = vec![b'a'; 100];
        copy_name(&mut buf, &long);
        assert_eq!(buf[SLOT_NAME_CAP - 1], 0);
        assert!(buf[..SLOT_NAME_CAP - 1].iter().all(|&b| b == b'a'));
    }

    #[test]
    fn test_slot_name_match_truncated() {
        let mut slot: ConsumerSlot = zeroed();
        let long = vec![b'x'; 100];
        copy_name(&mut slot.name, &long);
        // the same over-long name matches the slot it claimed
        assert!(slot.name_matches(&long));
        assert!(!slot.name_matches(b"x"));
    }

    #[test]
    fn test_entry_readability() {
        let mut e = IndexEntry {
            seq: 0,
            off8: 0,
            len: 0,
            flags: FLAG_READY,
            reserved: 0,
        };
        assert!(e.is_readable());
        e.flags |= FLAG_ABORTED;
        assert!(!e.is_readable());
        e.flags = FLAG_PENDING;
        assert!(!e.is_readable());
    }

    #[test]
    fn test_entry_offset() {
        let e = IndexEntry {
            seq: 7,
            off8: 5,
            len: 3,
            flags: FLAG_READY,
            reserved: 0,
        };
        assert_eq!(e.offset(), 40);
    }
}
