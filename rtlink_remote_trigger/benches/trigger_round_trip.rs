//! Trigger round trip benchmarks

use criterion::{Criterion, criterion_group, criterion_main};
use rtlink_remote_trigger::{RemoteTriggerClient, RemoteTriggerServer, TriggerServerOptions};
use rtlink_shared_memory::{SegmentName, SharedMemoryManager};
use std::hint::black_box;
use std::time::{Duration, Instant};

/// Synchronous trigger against a server loop on another thread
fn bench_sync_trigger(c: &mut Criterion) {
    let manager = SharedMemoryManager::new();
    let name = SegmentName::new("", "bench", &format!("trigger_{}", std::process::id())).unwrap();
    let server = RemoteTriggerServer::create(&manager, name.clone(), || {})
        .unwrap()
        .start(&TriggerServerOptions::default())
        .unwrap();
    let client = RemoteTriggerClient::create(name, true).unwrap();

    c.bench_function("trigger_round_trip", |b| {
        b.iter(|| {
            black_box(client.trigger(Instant::now() + Duration::from_secs(1))).unwrap();
        });
    });

    server.stop().unwrap();
}

/// Async trigger polled until ready
fn bench_async_trigger(c: &mut Criterion) {
    let manager = SharedMemoryManager::new();
    let name = SegmentName::new("", "bench", &format!("async_{}", std::process::id())).unwrap();
    let server = RemoteTriggerServer::create(&manager, name.clone(), || {})
        .unwrap()
        .start(&TriggerServerOptions::default())
        .unwrap();
    let client = RemoteTriggerClient::create(name, true).unwrap();

    c.bench_function("trigger_async_poll_ready", |b| {
        b.iter(|| {
            let mut request = client.trigger_async().unwrap();
            while !request.ready() {
                std::hint::spin_loop();
            }
            request
                .wait_until(Instant::now() + Duration::from_secs(1))
                .unwrap();
        });
    });

    server.stop().unwrap();
}

criterion_group!(benches, bench_sync_trigger, bench_async_trigger);
criterion_main!(benches);
