//! Encode/verify/decode and pool checkout throughput.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use criterion::{Criterion, criterion_group, criterion_main};
use pwt_token::{TokenInstance, TokenInstancePool};
use std::hint::black_box;

fn bench_codec(c: &mut Criterion) {
    let token = TokenInstance::new().expect("rng");
    token
        .set_issuer("auth.example")
        .set_subject("user-42")
        .add_audience("billing")
        .set_expiration(3600)
        .add_payload_field("role", "admin");
    let wire = token.encode().expect("encode");

    c.bench_function("encode_signed_token", |b| {
        b.iter(|| black_box(token.encode()));
    });

    c.bench_function("verify_token", |b| {
        b.iter(|| black_box(token.is_token_valid(&wire)));
    });

    c.bench_function("decode_token", |b| {
        let sink = TokenInstance::new().expect("rng");
        sink.copy_algorithm(&token);
        b.iter(|| black_box(sink.decode(&wire)));
    });
}

fn bench_pool_cycle(c: &mut Criterion) {
    c.bench_function("pool_get_put_uncontended", |b| {
        let pool = TokenInstancePool::new(TokenInstance::new().expect("rng"), 8);
        b.iter(|| {
            let handle = pool.get();
            pool.put(&handle);
        });
    });

    c.bench_function("pool_get_put_4_threads", |b| {
        let pool = TokenInstancePool::new(TokenInstance::new().expect("rng"), 4);
        b.iter(|| {
            std::thread::scope(|scope| {
                for _ in 0..4 {
                    let pool = &pool;
                    scope.spawn(move || {
                        for _ in 0..25 {
                            let handle = pool.get();
                            pool.put(&handle);
                        }
                    });
                }
            });
        });
    });
}

criterion_group!(benches, bench_codec, bench_pool_cycle);
criterion_main!(benches);
