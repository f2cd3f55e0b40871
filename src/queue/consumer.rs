//! Consumer side of the queue
//!
//! Consumers map `index` and `data` read-only and share the `control` file
//! read-write. The drain path is lock-free: it acquire-loads `next_seq` and
//! walks the entry array from the slot's own cursor. When the producer has
//! grown a file past the size mapped at attach time, the consumer remaps at
//! the current on-disk size before touching the new tail.

use std::mem::size_of;
use std::ptr;
use std::sync::atomic::Ordering;

use log::info;

use crate::error::{QueueError, Result};
use crate::layout::headers::{ConsumerSlot, ControlHeader, DataHeader, IndexHeader};
use crate::mapping::MappedFile;
use crate::sync::{monotonic_ns, NamedSemaphore};

use super::config::QueuePaths;
use super::files::QueueFiles;
use super::registry;

/// Zero-copy view of one drained message
///
/// The view borrows the consumer, so it stays valid exactly until the next
/// call that may remap the data file.
#[derive(Debug)]
pub struct MessageView<'a> {
    seq: u64,
    bytes: &'a [u8],
}

impl<'a> MessageView<'a> {
    /// Sequence number assigned by the producer
    #[inline]
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// The message payload
    #[inline]
    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Payload length in bytes
    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the message is zero-length
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl AsRef<[u8]> for MessageView<'_> {
    fn as_ref(&self) -> &[u8] {
        self.bytes
    }
}

/// Reading end of a queue
///
/// Any number of consumers may attach to the same queue files. Each one
/// registers under a stable name and drains from its own cursor.
#[derive(Debug)]
pub struct Consumer {
    files: QueueFiles,
    notify: NamedSemaphore,
    registry: NamedSemaphore,
}

impl Consumer {
    /// Map the queue files, validate their headers, and open the semaphores
    /// named in the control header
    pub fn attach(paths: &QueuePaths) -> Result<Self> {
        let index =
            MappedFile::open_ro(&paths.index).map_err(|source| QueueError::IndexOpen { source })?;
        let data =
            MappedFile::open_ro(&paths.data).map_err(|source| QueueError::DataOpen { source })?;
        let control = MappedFile::open_rw(&paths.control)
            .map_err(|source| QueueError::ControlOpen { source })?;

        if index.len() < size_of::<IndexHeader>() {
            return Err(QueueError::IndexSanity {
                detail: "file too small for header",
            });
        }
        if data.len() < size_of::<DataHeader>() {
            return Err(QueueError::DataSanity {
                detail: "file too small for header",
            });
        }
        if control.len() < size_of::<ControlHeader>() {
            return Err(QueueError::ControlSanity {
                detail: "file too small for header",
            });
        }

        let files = QueueFiles {
            index,
            data,
            control,
        };

        // each file is checked against its own magic
        files.index_header().validate()?;
        files.data_header().validate()?;
        let control_header = files.control_header();
        control_header.validate()?;

        let slots_required = size_of::<ControlHeader>()
            + control_header.max_consumers as usize * size_of::<ConsumerSlot>();
        if files.control.len() < slots_required {
            return Err(QueueError::ControlSanity {
                detail: "file too small for slot table",
            });
        }

        let notify_name = control_header.notify_sem_name()?.to_string();
        let registry_name = control_header.registry_sem_name()?.to_string();

        let notify = NamedSemaphore::open(&notify_name).map_err(|source| {
            QueueError::SemaphoreOpen {
                name: notify_name.clone(),
                source,
            }
        })?;
        let registry = NamedSemaphore::open(&registry_name).map_err(|source| {
            QueueError::SemaphoreOpen {
                name: registry_name.clone(),
                source,
            }
        })?;

        info!(
            "consumer attached: {} entries committed",
            files.index_header().next_seq.load(Ordering::Acquire)
        );

        Ok(Self {
            files,
            notify,
            registry,
        })
    }

    /// Register under `name`, starting at `start_seq`
    ///
    /// Re-registering an active name returns its existing slot with the
    /// cursor untouched, so a restarted consumer resumes where it left off.
    /// `start_seq` beyond the current head is legal; the consumer simply
    /// blocks until the producer catches up.
    pub fn register(&mut self, name: &str, start_seq: u64) -> Result<u32> {
        registry::register(&self.files, &self.registry, name, start_seq)
    }

    /// Drain one message for `slot`, or `None` when the cursor has caught up
    /// with the producer
    ///
    /// Lock-free; never blocks. Entries flagged aborted are skipped without
    /// being returned. The returned view is valid until the next `drain`
    /// call on this consumer.
    pub fn drain(&mut self, slot: u32) -> Result<Option<MessageView<'_>>> {
        if slot >= self.files.control_header().max_consumers {
            return Err(QueueError::InvalidSlot { slot });
        }

        loop {
            // the release store of next_seq is the fence that makes the
            // entry body and its payload bytes visible
            let next = self.files.index_header().next_seq.load(Ordering::Acquire);
            let cur = self.files.slot(slot).last_seq.load(Ordering::Relaxed);
            if cur >= next {
                return Ok(None);
            }

            if cur >= self.files.entry_capacity() {
                // the producer grew the index past our attach-time mapping
                self.files
                    .refresh_index()
                    .map_err(|source| QueueError::IndexExtend { source })?;
                if cur >= self.files.entry_capacity() {
                    return Ok(None);
                }
            }

            let entry = unsafe { ptr::read(self.files.entry(cur)) };
            if !entry.is_readable() {
                self.files
                    .slot(slot)
                    .last_seq
                    .store(cur + 1, Ordering::Relaxed);
                continue;
            }

            let offset = entry.offset();
            let end = offset + entry.len as u64;
            if end > self.files.payload_capacity() {
                self.files
                    .refresh_data()
                    .map_err(|source| QueueError::DataExtend { source })?;
                if end > self.files.payload_capacity() {
                    return Err(QueueError::DataSanity {
                        detail: "entry payload beyond data file",
                    });
                }
            }

            let slot_ref = self.files.slot(slot);
            slot_ref.last_seq.store(cur + 1, Ordering::Relaxed);
            slot_ref
                .last_update_ns
                .store(monotonic_ns(), Ordering::Relaxed);

            let bytes = unsafe {
                std::slice::from_raw_parts(
                    self.files.payload().add(offset as usize),
                    entry.len as usize,
                )
            };
            return Ok(Some(MessageView {
                seq: entry.seq,
                bytes,
            }));
        }
    }

    /// Block until the producer posts a wake hint
    ///
    /// A token is strictly a hint: it may arrive without anything new for
    /// this slot, and entries may become drainable without a token. Callers
    /// re-check with [`Consumer::drain`] after waking.
    pub fn wait_for_new(&self) -> Result<()> {
        self.notify
            .wait()
            .map_err(|source| QueueError::NotifyWait { source })
    }

    /// Like [`Consumer::wait_for_new`] with a timeout in microseconds
    pub fn wait_for_new_timeout(&self, timeout_us: u64) -> Result<()> {
        match self
            .notify
            .timed_wait(std::time::Duration::from_micros(timeout_us))
        {
            Ok(true) => Ok(()),
            Ok(false) => Err(QueueError::TimedOut),
            Err(source) => Err(QueueError::NotifyWait { source }),
        }
    }

    /// The next sequence number `slot` will attempt to read
    pub fn cursor(&self, slot: u32) -> Result<u64> {
        if slot >= self.files.control_header().max_consumers {
            return Err(QueueError::InvalidSlot { slot });
        }
        Ok(self.files.slot(slot).last_seq.load(Ordering::Relaxed))
    }

    /// Sequence number of the producer's next publish, as currently visible
    pub fn head(&self) -> u64 {
        self.files.index_header().next_seq.load(Ordering::Acquire)
    }

    /// Release the mappings and semaphore handles
    ///
    /// The slot registration stays in the control file, so re-attaching and
    /// re-registering the same name resumes from the old cursor. Equivalent
    /// to dropping the handle.
    pub fn close(self) {
        info!("consumer detached");
    }
}
