//! # mmqueue - SPMC message queue over memory-mapped files
//!
//! A single-producer / multi-consumer message queue for high-throughput,
//! low-latency IPC between cooperating processes on one host. One process
//! publishes variable-length byte messages; any number of consumer processes
//! attach, register under a stable name, and drain at their own pace from a
//! chosen sequence number. Messages are never copied into per-consumer
//! buffers: a drain returns a zero-copy view into the shared payload arena.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   publish    ┌─────────────────────────────────┐
//! │  Producer  │ ───────────▶ │ index.mm   header + entry array │
//! │  (1 per    │              │ data.mm    header + byte arena  │
//! │   queue)   │              │ control.mm header + slot table  │
//! └─────┬──────┘              └───────────────┬─────────────────┘
//!       │ sem_post                            │ drain (lock-free,
//!       ▼                                     ▼  zero-copy)
//! ┌────────────┐   sem_wait   ┌────────────┐ ┌────────────┐
//! │   notify   │ ◀─────────── │ Consumer A │ │ Consumer B │ ...
//! │ semaphore  │              └────────────┘ └────────────┘
//! └────────────┘
//! ```
//!
//! All queue state lives in three shared files. The producer appends payload
//! bytes to the data arena, writes a fixed-size index entry, and publishes it
//! by storing `next_seq` with release semantics; consumers acquire-load
//! `next_seq`, so every visible entry is fully formed. Two host-named POSIX
//! semaphores sit outside the files: a counting "notify" semaphore posted
//! once per publish, and a binary registry lock that serializes consumer
//! slot allocation.
//!
//! ## Quick example
//!
//! ```no_run
//! use mmqueue::{Consumer, Producer, QueueConfig, QueuePaths};
//!
//! let paths = QueuePaths::in_dir(std::path::Path::new("/tmp/my-queue"));
//! let config = QueueConfig::default();
//!
//! let mut producer =
//!     Producer::create(&config, &paths, "/my-queue-notify", "/my-queue-registry")?;
//! producer.publish(b"hello")?;
//!
//! let mut consumer = Consumer::attach(&paths)?;
//! let slot = consumer.register("worker-1", 0)?;
//! while let Some(msg) = consumer.drain(slot)? {
//!     println!("seq {} -> {} bytes", msg.seq(), msg.len());
//! }
//! # Ok::<(), mmqueue::QueueError>(())
//! ```
//!
//! ## Guarantees and limits
//!
//! - Delivery within one slot is in strictly increasing sequence order with
//!   no gaps or duplicates.
//! - Re-registering a name resumes from the slot's stored cursor.
//! - The data arena is append-only and capped at 32 GiB per queue session.
//! - The queue is a live IPC channel, not a durable log: a single producer
//!   owns all appends, and a producer restart re-stamps the control file,
//!   invalidating live registrations.

#[cfg(not(unix))]
compile_error!("mmqueue relies on POSIX named semaphores and mmap");

pub mod error;
pub mod layout;
pub mod mapping;
pub mod queue;
pub mod sync;

pub use error::{error_str, QueueError, Result};
pub use mapping::MappedFile;
pub use queue::{Consumer, MessageView, Producer, QueueConfig, QueuePaths};
pub use sync::NamedSemaphore;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
