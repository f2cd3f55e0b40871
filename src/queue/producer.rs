//! Producer side of the queue
//!
//! The producer is the sole writer of the index entries, the payload arena
//! and the control header. Publication order is the visibility fence: the
//! payload and the entry body are fully written before `next_seq` is stored
//! with release semantics, so any consumer that acquire-loads `next_seq`
//! observes complete messages only.

use std::io;
use std::mem::size_of;
use std::ptr;
use std::sync::atomic::Ordering;

use log::{debug, info, warn};

use crate::error::{QueueError, Result};
use crate::layout::constants::{align_up, CONTROL_SIZE_ROUND, FLAG_READY};
use crate::layout::headers::{ConsumerSlot, ControlHeader, DataHeader, IndexHeader};
use crate::mapping::MappedFile;
use crate::sync::NamedSemaphore;

use super::config::{QueueConfig, QueuePaths};
use super::files::QueueFiles;

/// Writing end of a queue
///
/// Exactly one producer may exist per queue. Dropping the handle releases the
/// mappings and semaphore handles; the files and semaphore names persist so
/// a later session can reopen them.
#[derive(Debug)]
pub struct Producer {
    files: QueueFiles,
    notify: NamedSemaphore,
    /// Held so the registry lock outlives producer-only sessions
    _registry: NamedSemaphore,
}

impl Producer {
    /// Open or create the three queue files, stamp headers where needed, and
    /// create or adopt the two named semaphores
    ///
    /// Existing index and data files are reopened with their contents trusted
    /// as authoritative. The control file is zeroed and re-stamped
    /// unconditionally: the producer owns the control header, and a producer
    /// restart invalidates any live consumer registration.
    pub fn create(
        config: &QueueConfig,
        paths: &QueuePaths,
        notify_name: &str,
        registry_name: &str,
    ) -> Result<Self> {
        config.validate()?;

        let index = if MappedFile::exists(&paths.index) {
            let index = MappedFile::open_rw(&paths.index)
                .map_err(|source| QueueError::IndexOpen { source })?;
            if index.len() < size_of::<IndexHeader>() {
                return Err(QueueError::IndexSanity {
                    detail: "file too small for header",
                });
            }
            index
        } else {
            let index = MappedFile::create_rw(&paths.index, config.index_initial_bytes)
                .map_err(|source| QueueError::IndexOpen { source })?;
            unsafe {
                (*(index.as_mut_ptr() as *mut IndexHeader)).init();
            }
            index
        };

        let data = if MappedFile::exists(&paths.data) {
            let data = MappedFile::open_rw(&paths.data)
                .map_err(|source| QueueError::DataOpen { source })?;
            if data.len() < size_of::<DataHeader>() {
                return Err(QueueError::DataSanity {
                    detail: "file too small for header",
                });
            }
            data
        } else {
            let data = MappedFile::create_rw(&paths.data, config.data_initial_bytes)
                .map_err(|source| QueueError::DataOpen { source })?;
            let payload_bytes = (data.len() - size_of::<DataHeader>()) as u64;
            unsafe {
                (*(data.as_mut_ptr() as *mut DataHeader)).init(payload_bytes);
            }
            data
        };

        let control_required = align_up(
            (size_of::<ControlHeader>() + config.max_consumers as usize * size_of::<ConsumerSlot>())
                as u64,
            CONTROL_SIZE_ROUND as u64,
        ) as usize;
        let mut control = if MappedFile::exists(&paths.control) {
            MappedFile::open_rw(&paths.control)
                .map_err(|source| QueueError::ControlOpen { source })?
        } else {
            MappedFile::create_rw(&paths.control, control_required)
                .map_err(|source| QueueError::ControlOpen { source })?
        };
        if control.len() < control_required {
            control
                .extend(control_required)
                .map_err(|source| QueueError::ControlOpen { source })?;
        }

        let files = QueueFiles {
            index,
            data,
            control,
        };

        // the producer owns the control file: wipe it and stamp afresh
        unsafe {
            ptr::write_bytes(files.control.as_mut_ptr(), 0, files.control.len());
            files
                .control_header_mut()
                .init(config.max_consumers, notify_name, registry_name);
        }

        let notify = NamedSemaphore::create(notify_name, 0).map_err(|source| {
            QueueError::SemaphoreOpen {
                name: notify_name.to_string(),
                source,
            }
        })?;
        let registry = NamedSemaphore::create(registry_name, 1).map_err(|source| {
            QueueError::SemaphoreOpen {
                name: registry_name.to_string(),
                source,
            }
        })?;

        info!(
            "producer ready: {} entries committed, {} max consumers",
            files.index_header().next_seq.load(Ordering::Relaxed),
            config.max_consumers,
        );

        Ok(Self {
            files,
            notify,
            _registry: registry,
        })
    }

    /// Append one message and publish it under the next sequence number
    ///
    /// Zero-length messages are legal; they consume a sequence number without
    /// advancing the payload cursor. Returns the assigned sequence number.
    pub fn publish(&mut self, msg: &[u8]) -> Result<u64> {
        let len = u32::try_from(msg.len()).map_err(|_| QueueError::DataExtend {
            source: io::Error::new(io::ErrorKind::InvalidInput, "message exceeds u32 length"),
        })?;

        // 1. place the payload on the next 8-aligned cursor
        let pos = align_up(
            self.files.data_header().write_pos.load(Ordering::Relaxed),
            8,
        );
        let span = align_up(len as u64, 8);
        let end = pos + span;

        if pos >> 3 > u32::MAX as u64 {
            return Err(QueueError::DataExtend {
                source: io::Error::new(
                    io::ErrorKind::OutOfMemory,
                    "payload arena exceeds the 32 GiB offset limit",
                ),
            });
        }

        // 2. grow the arena first; a failed grow aborts with prior state intact
        if end > self.files.data_header().file_size.load(Ordering::Relaxed) {
            let old_len = self.files.data.len();
            self.files
                .grow_data(end)
                .map_err(|source| QueueError::DataExtend { source })?;
            debug!(
                "data file grown: {} -> {} bytes",
                old_len,
                self.files.data.len()
            );
        }

        // 3. copy the payload, zero the padded tail
        unsafe {
            let dst = self.files.payload_mut().add(pos as usize);
            ptr::copy_nonoverlapping(msg.as_ptr(), dst, msg.len());
            if span > len as u64 {
                ptr::write_bytes(dst.add(msg.len()), 0, (span - len as u64) as usize);
            }
        }

        // 4. commit the payload cursor
        self.files
            .data_header()
            .write_pos
            .store(end, Ordering::Relaxed);

        // 5. make room for the entry
        let seq = self.files.index_header().next_seq.load(Ordering::Relaxed);
        if seq >= self.files.entry_capacity() {
            let old_len = self.files.index.len();
            self.files
                .grow_index(seq)
                .map_err(|source| QueueError::IndexExtend { source })?;
            debug!(
                "index file grown: {} -> {} bytes",
                old_len,
                self.files.index.len()
            );
        }

        // 6. write the entry body, then publish next_seq with release
        //    semantics; consumers acquire-load next_seq, so an observed entry
        //    is always fully formed
        unsafe {
            let entry = self.files.entry_mut(seq);
            (*entry).seq = seq;
            (*entry).off8 = (pos >> 3) as u32;
            (*entry).len = len;
            (*entry).flags = FLAG_READY;
            (*entry).reserved = 0;
        }
        let header = self.files.index_header();
        header.entry_count.store(seq + 1, Ordering::Relaxed);
        header.next_seq.store(seq + 1, Ordering::Release);

        // 7. wake hint; failure to post is advisory only
        self.files
            .control_header()
            .notify_seq
            .fetch_add(1, Ordering::Relaxed);
        if let Err(err) = self.notify.post() {
            warn!("notify post failed after seq {}: {}", seq, err);
        }

        Ok(seq)
    }

    /// Sequence number the next publish will be assigned
    pub fn next_seq(&self) -> u64 {
        self.files.index_header().next_seq.load(Ordering::Relaxed)
    }

    /// Best-effort flush of all three mappings to their files
    pub fn sync(&self) {
        for (name, file) in [
            ("index", &self.files.index),
            ("data", &self.files.data),
            ("control", &self.files.control),
        ] {
            if let Err(err) = file.sync() {
                warn!("{} sync failed: {}", name, err);
            }
        }
    }

    /// Release the mappings and semaphore handles
    ///
    /// The files stay on disk and the semaphore names stay registered with
    /// the host. Equivalent to dropping the handle.
    pub fn close(self) {
        info!("producer closed at seq {}", self.next_seq());
    }
}
