//! Throughput Benchmark for TideKV
//!
//! Measures request parsing, command execution against the shared store,
//! and snapshot encoding.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use std::time::Duration;
use tidekv::commands::CommandHandler;
use tidekv::protocol::{Request, RespParser};
use tidekv::storage::{snapshot, Db};

fn request(parts: &[&str]) -> Request {
    Request::new(parts[0], parts[1..].iter().copied())
}

/// Benchmark SET operations
fn bench_set(c: &mut Criterion) {
    let handler = CommandHandler::new(Db::new());

    let mut group = c.benchmark_group("set");
    group.throughput(Throughput::Elements(1));

    group.bench_function("set_small", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = format!("key:{}", i);
            black_box(handler.execute(&request(&["SET", &key, "small_value"])));
            i += 1;
        });
    });

    group.bench_function("set_medium", |b| {
        let mut i = 0u64;
        let value = "x".repeat(1024); // 1KB value
        b.iter(|| {
            let key = format!("key:{}", i);
            black_box(handler.execute(&request(&["SET", &key, &value])));
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark GET operations
fn bench_get(c: &mut Criterion) {
    let handler = CommandHandler::new(Db::new());

    for i in 0..100_000 {
        let key = format!("key:{}", i);
        let value = format!("value:{}", i);
        handler.execute(&request(&["SET", &key, &value]));
    }

    let mut group = c.benchmark_group("get");
    group.throughput(Throughput::Elements(1));

    group.bench_function("get_existing", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = format!("key:{}", i % 100_000);
            black_box(handler.execute(&request(&["GET", &key])));
            i += 1;
        });
    });

    group.bench_function("get_missing", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = format!("missing:{}", i);
            black_box(handler.execute(&request(&["GET", &key])));
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark list operations in the shape of a page token cache
fn bench_lists(c: &mut Criterion) {
    let handler = CommandHandler::new(Db::new());

    let mut group = c.benchmark_group("lists");
    group.throughput(Throughput::Elements(1));

    group.bench_function("rpush", |b| {
        b.iter(|| {
            black_box(handler.execute(&request(&["RPUSH", "tokens", "<p>"])));
        });
    });

    let page: Vec<String> = (0..1_000).map(|i| format!("<span>{}</span>", i)).collect();
    for token in &page {
        handler.execute(&request(&["RPUSH", "page", token]));
    }
    handler.execute(&request(&["LPUSH", "page", "1000"]));

    group.bench_function("lrange_page", |b| {
        b.iter(|| {
            black_box(handler.execute(&request(&["LRANGE", "page", "1", "1000"])));
        });
    });

    group.bench_function("llen", |b| {
        b.iter(|| {
            black_box(handler.execute(&request(&["LLEN", "page"])));
        });
    });

    group.finish();
}

/// Benchmark INCR operations
fn bench_incr(c: &mut Criterion) {
    let handler = CommandHandler::new(Db::new());

    let mut group = c.benchmark_group("incr");
    group.throughput(Throughput::Elements(1));

    group.bench_function("single_counter", |b| {
        b.iter(|| {
            black_box(handler.execute(&request(&["INCR", "counter"])));
        });
    });

    group.finish();
}

/// Benchmark request parsing
fn bench_parse(c: &mut Criterion) {
    let set = request(&["SET", "key:1", "value"]).encode();
    let pipeline: Vec<u8> = (0..100)
        .flat_map(|i| request(&["RPUSH", "page", &format!("token{}", i)]).encode())
        .collect();

    let mut group = c.benchmark_group("parse");

    group.throughput(Throughput::Bytes(set.len() as u64));
    group.bench_function("single_set", |b| {
        let mut parser = RespParser::new();
        b.iter(|| black_box(parser.parse(&set)));
    });

    group.throughput(Throughput::Elements(100));
    group.bench_function("pipeline_100", |b| {
        let mut parser = RespParser::new();
        b.iter(|| {
            let mut pos = 0;
            while let Ok(Some((req, consumed))) = parser.parse(&pipeline[pos..]) {
                black_box(req);
                pos += consumed;
            }
        });
    });

    group.finish();
}

/// Benchmark concurrent access through the single store lock
fn bench_concurrent(c: &mut Criterion) {
    use std::thread;

    let mut group = c.benchmark_group("concurrent");
    group.measurement_time(Duration::from_secs(10));

    group.bench_function("4_threads_mixed", |b| {
        b.iter(|| {
            let db = Db::new();
            let handles: Vec<_> = (0..4)
                .map(|t| {
                    let handler = CommandHandler::new(db.clone());
                    thread::spawn(move || {
                        for i in 0..10_000 {
                            let key = format!("key:{}:{}", t, i);
                            handler.execute(&request(&["SET", &key, "value"]));
                            handler.execute(&request(&["GET", &key]));
                        }
                    })
                })
                .collect();

            for handle in handles {
                handle.join().unwrap();
            }

            black_box(db.lock().len());
        });
    });

    group.finish();
}

/// Benchmark expiry operations
fn bench_expiry(c: &mut Criterion) {
    let handler = CommandHandler::new(Db::new());

    for i in 0..10_000 {
        let key = format!("expire:{}", i);
        handler.execute(&request(&["SET", &key, "value"]));
    }

    let mut group = c.benchmark_group("expiry");
    group.throughput(Throughput::Elements(1));

    group.bench_function("expire_existing", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = format!("expire:{}", i % 10_000);
            black_box(handler.execute(&request(&["EXPIRE", &key, "3600"])));
            i += 1;
        });
    });

    group.bench_function("ttl", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = format!("expire:{}", i % 10_000);
            black_box(handler.execute(&request(&["TTL", &key])));
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark snapshot encoding
fn bench_snapshot(c: &mut Criterion) {
    let db = Db::new();
    let handler = CommandHandler::new(db.clone());
    for i in 0..10_000 {
        let key = format!("key:{}", i);
        handler.execute(&request(&["SET", &key, "value"]));
        handler.execute(&request(&["RPUSH", &format!("list:{}", i % 100), &key]));
    }

    let mut group = c.benchmark_group("snapshot");

    group.bench_function("encode_10k_keys", |b| {
        b.iter(|| black_box(snapshot::encode_snapshot(&db)));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_set,
    bench_get,
    bench_lists,
    bench_incr,
    bench_parse,
    bench_concurrent,
    bench_expiry,
    bench_snapshot,
);

criterion_main!(benches);
