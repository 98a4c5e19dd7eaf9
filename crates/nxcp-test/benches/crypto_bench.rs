//! Benchmarks for NXCP secure channel operations

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use nxcp_core::CipherSuite;
use nxcp_crypto::{EncryptionContext, FrameAuthenticator, NativeCipherProvider, SessionNegotiator};
use nxcp_test::{client_key, data_frame, registry, TEST_KEY_BITS};

fn bench_encrypt_by_suite(c: &mut Criterion) {
    let frame = data_frame(1, &[0x5Au8; 1024]);

    let mut group = c.benchmark_group("encrypt_frame");
    group.throughput(Throughput::Bytes(frame.len() as u64));

    for suite in CipherSuite::ALL {
        let ctx = EncryptionContext::generate(suite, &NativeCipherProvider).unwrap();
        group.bench_function(BenchmarkId::from_parameter(suite), |b| {
            b.iter(|| ctx.encrypt_frame(black_box(&frame)).unwrap())
        });
    }

    group.finish();
}

fn bench_decrypt_by_size(c: &mut Criterion) {
    let ctx = EncryptionContext::generate(CipherSuite::Aes256, &NativeCipherProvider).unwrap();
    let sizes = [64, 256, 1024, 4096];

    let mut group = c.benchmark_group("decrypt_by_size");

    for size in sizes {
        let encrypted = ctx.encrypt_frame(&data_frame(1, &vec![0u8; size])).unwrap();

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_function(format!("{}_bytes", size), |b| {
            b.iter(|| ctx.decrypt_frame(black_box(&encrypted)).unwrap())
        });
    }

    group.finish();
}

fn bench_session_key_transport(c: &mut Criterion) {
    let key = client_key();
    let session_key = [0x42u8; 32];
    let encrypted = key.encrypt(&session_key).unwrap();

    let mut group = c.benchmark_group(format!("rsa_{}", TEST_KEY_BITS));
    group.bench_function("encrypt", |b| {
        b.iter(|| key.encrypt(black_box(&session_key)).unwrap())
    });
    group.bench_function("decrypt", |b| {
        b.iter(|| key.decrypt(black_box(&encrypted)).unwrap())
    });
    group.finish();
}

fn bench_handshake(c: &mut Criterion) {
    let key = client_key();
    let client_registry = registry(0x3F);
    let server_registry = registry(0x3F);

    c.bench_function("handshake", |b| {
        b.iter(|| {
            let mut client = SessionNegotiator::new(client_registry.clone());
            let mut server = SessionNegotiator::new(server_registry.clone());

            let request = client.build_request(1, key).unwrap();
            let (_, response) = server.handle_request(&request);
            black_box(client.handle_response(&response, key).unwrap())
        })
    });
}

fn bench_sign(c: &mut Criterion) {
    let message = vec![0u8; 1024];
    let secret = [0x11u8; 32];

    let mut group = c.benchmark_group("hmac_sha256");
    group.throughput(Throughput::Bytes(1024));
    group.bench_function("sign_1024", |b| {
        b.iter(|| FrameAuthenticator::HmacSha256.sign(black_box(&message), &secret))
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_encrypt_by_suite,
    bench_decrypt_by_size,
    bench_session_key_transport,
    bench_handshake,
    bench_sign,
);
criterion_main!(benches);
