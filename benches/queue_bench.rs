use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use mmqueue::{Consumer, NamedSemaphore, Producer, QueueConfig, QueuePaths};
use tempfile::TempDir;

struct BenchQueue {
    _dir: TempDir,
    producer: Producer,
    consumer: Consumer,
    slot: u32,
    notify_name: String,
    registry_name: String,
}

impl BenchQueue {
    fn new(tag: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let paths = QueuePaths::in_dir(dir.path());
        let notify_name = format!("/mmqueue-bench-n-{}-{}", std::process::id(), tag);
        let registry_name = format!("/mmqueue-bench-r-{}-{}", std::process::id(), tag);
        let config = QueueConfig {
            index_initial_bytes: 64 * 1024 * 1024,
            data_initial_bytes: 256 * 1024 * 1024,
            max_consumers: 4,
        };
        let producer = Producer::create(&config, &paths, &notify_name, &registry_name).unwrap();
        let mut consumer = Consumer::attach(&paths).unwrap();
        let slot = consumer.register("bench", 0).unwrap();
        Self {
            _dir: dir,
            producer,
            consumer,
            slot,
            notify_name,
            registry_name,
        }
    }
}

impl Drop for BenchQueue {
    fn drop(&mut self) {
        let _ = NamedSemaphore::unlink(&self.notify_name);
        let _ = NamedSemaphore::unlink(&self.registry_name);
    }
}

fn benchmark_publish_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("Queue_Publish");

    for size in [64usize, 1024, 4096].iter() {
        group.throughput(Throughput::Bytes(*size as u64));
        group.bench_with_input(BenchmarkId::new("publish", size), size, |b, &size| {
            let mut q = BenchQueue::new(&format!("pub{}", size));
            let payload = vec![0x5au8; size];
            b.iter(|| {
                q.producer.publish(&payload).unwrap();
            });
        });
    }

    group.finish();
}

fn benchmark_publish_drain_pairs(c: &mut Criterion) {
    let mut group = c.benchmark_group("Queue_PublishDrain");

    for size in [64usize, 1024].iter() {
        group.throughput(Throughput::Bytes(*size as u64));
        group.bench_with_input(BenchmarkId::new("round_trip", size), size, |b, &size| {
            let mut q = BenchQueue::new(&format!("rt{}", size));
            let payload = vec![0xa5u8; size];
            b.iter(|| {
                q.producer.publish(&payload).unwrap();
                let msg = q.consumer.drain(q.slot).unwrap().unwrap();
                assert_eq!(msg.len(), size);
            });
        });
    }

    group.finish();
}

fn benchmark_drain_empty(c: &mut Criterion) {
    c.bench_function("Queue_DrainEmpty", |b| {
        let mut q = BenchQueue::new("empty");
        b.iter(|| {
            assert!(q.consumer.drain(q.slot).unwrap().is_none());
        });
    });
}

criterion_group!(
    benches,
    benchmark_publish_throughput,
    benchmark_publish_drain_pairs,
    benchmark_drain_empty
);
criterion_main!(benches);
