//! Unit tests for the queue state machines

use std::sync::atomic::{AtomicUsize, Ordering};

use tempfile::TempDir;

use crate::error::QueueError;
use crate::sync::NamedSemaphore;

use super::{Consumer, Producer, QueueConfig, QueuePaths};

static SEM_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// One queue in a temp directory with unique semaphore names, unlinked on
/// drop so repeated test runs never adopt stale semaphores
pub(crate) struct TestQueue {
    _dir: TempDir,
    pub paths: QueuePaths,
    pub notify_name: String,
    pub registry_name: String,
}

impl TestQueue {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let id = SEM_COUNTER.fetch_add(1, Ordering::SeqCst);
        let paths = QueuePaths::in_dir(dir.path());
        Self {
            _dir: dir,
            paths,
            notify_name: format!("/mmqueue-ut-n-{}-{}", std::process::id(), id),
            registry_name: format!("/mmqueue-ut-r-{}-{}", std::process::id(), id),
        }
    }

    pub fn producer(&self, config: &QueueConfig) -> Producer {
        Producer::create(config, &self.paths, &self.notify_name, &self.registry_name)
            .expect("producer create")
    }

    pub fn consumer(&self) -> Consumer {
        Consumer::attach(&self.paths).expect("consumer attach")
    }
}

impl Drop for TestQueue {
    fn drop(&mut self) {
        let _ = NamedSemaphore::unlink(&self.notify_name);
        let _ = NamedSemaphore::unlink(&self.registry_name);
    }
}

#[test]
fn test_publish_assigns_sequences() {
    let q = TestQueue::new();
    let mut producer = q.producer(&QueueConfig::default());
    assert_eq!(producer.next_seq(), 0);
    assert_eq!(producer.publish(b"a").unwrap(), 0);
    assert_eq!(producer.publish(b"b").unwrap(), 1);
    assert_eq!(producer.publish(b"").unwrap(), 2);
    assert_eq!(producer.next_seq(), 3);
}

#[test]
fn test_attach_requires_producer_files() {
    let q = TestQueue::new();
    match Consumer::attach(&q.paths) {
        Err(QueueError::IndexOpen { .. }) => {}
        other => panic!("unexpected: {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_attach_rejects_foreign_file() {
    let q = TestQueue::new();
    let producer = q.producer(&QueueConfig::default());
    drop(producer);
    // clobber the index magic
    std::fs::write(&q.paths.index, vec![0u8; 4096]).unwrap();
    match Consumer::attach(&q.paths) {
        Err(QueueError::IndexSanity { .. }) => {}
        other => panic!("unexpected: {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_register_claims_and_reuses_slots() {
    let q = TestQueue::new();
    let _producer = q.producer(&QueueConfig::default());
    let mut consumer = q.consumer();

    let a = consumer.register("alpha", 0).unwrap();
    let b = consumer.register("beta", 0).unwrap();
    assert_ne!(a, b);
    assert_eq!(consumer.register("alpha", 42).unwrap(), a);
    // reattach leaves the cursor untouched
    assert_eq!(consumer.cursor(a).unwrap(), 0);
}

#[test]
fn test_register_full_table() {
    let q = TestQueue::new();
    let config = QueueConfig {
        max_consumers: 2,
        ..Default::default()
    };
    let _producer = q.producer(&config);
    let mut consumer = q.consumer();

    consumer.register("a", 0).unwrap();
    consumer.register("b", 0).unwrap();
    match consumer.register("c", 0) {
        Err(QueueError::ConsumerSlotsFull) => {}
        other => panic!("unexpected: {:?}", other.map(|_| ())),
    }
    // same-name registration still succeeds on a full table
    assert_eq!(consumer.register("a", 7).unwrap(), 0);
}

#[test]
fn test_drain_rejects_out_of_range_slot() {
    let q = TestQueue::new();
    let config = QueueConfig {
        max_consumers: 2,
        ..Default::default()
    };
    let _producer = q.producer(&config);
    let mut consumer = q.consumer();
    match consumer.drain(9) {
        Err(QueueError::InvalidSlot { slot: 9 }) => {}
        other => panic!("unexpected: {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_producer_restart_trusts_index_and_data() {
    let q = TestQueue::new();
    let config = QueueConfig::default();
    {
        let mut producer = q.producer(&config);
        producer.publish(b"persisted").unwrap();
        producer.close();
    }
    // the restarted producer picks up where the previous session stopped
    let mut producer = q.producer(&config);
    assert_eq!(producer.next_seq(), 1);
    assert_eq!(producer.publish(b"next").unwrap(), 1);

    let mut consumer = q.consumer();
    let slot = consumer.register("replay", 0).unwrap();
    assert_eq!(consumer.drain(slot).unwrap().unwrap().bytes(), b"persisted");
    assert_eq!(consumer.drain(slot).unwrap().unwrap().bytes(), b"next");
}

#[test]
fn test_producer_restart_resets_registrations() {
    let q = TestQueue::new();
    let config = QueueConfig::default();
    let producer = q.producer(&config);
    let mut consumer = q.consumer();
    let slot = consumer.register("ephemeral", 5).unwrap();
    assert_eq!(consumer.cursor(slot).unwrap(), 5);
    drop(producer);

    // control is producer-owned: a restart wipes the slot table
    let _producer = q.producer(&config);
    assert_eq!(consumer.cursor(slot).unwrap(), 0);
    let mut consumer2 = q.consumer();
    assert_eq!(consumer2.register("ephemeral", 3).unwrap(), 0);
    assert_eq!(consumer2.cursor(0).unwrap(), 3);
}
