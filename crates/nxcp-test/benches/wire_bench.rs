//! Benchmarks for NXCP wire layouts

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use nxcp_core::{CipherMask, CipherSuite};
use nxcp_crypto::{EncryptionContext, NativeCipherProvider};
use nxcp_test::{client_key, data_frame};
use nxcp_wire::{EnvelopeHeader, HandshakeMessage, KeyRequest, MessageHeader, HEADER_SIZE};

fn bench_header_parse(c: &mut Criterion) {
    let frame = data_frame(42, b"header");
    c.bench_function("header_parse_frame", |b| {
        b.iter(|| MessageHeader::parse_frame(black_box(&frame)))
    });
}

fn bench_header_serialize(c: &mut Criterion) {
    let header = MessageHeader::new(0x0100, 42);
    c.bench_function("header_serialize", |b| {
        let mut buf = [0u8; HEADER_SIZE];
        b.iter(|| header.serialize(black_box(&mut buf)))
    });
}

fn bench_envelope_split(c: &mut Criterion) {
    let ctx = EncryptionContext::generate(CipherSuite::Aes128, &NativeCipherProvider).unwrap();
    let encrypted = ctx.encrypt_frame(&data_frame(1, &[0u8; 512])).unwrap();

    c.bench_function("envelope_split", |b| {
        b.iter(|| EnvelopeHeader::split(black_box(&encrypted)))
    });
}

fn bench_key_request_codec(c: &mut Criterion) {
    let request = HandshakeMessage::KeyRequest(KeyRequest {
        id: 1,
        ciphers: CipherMask::ALL,
        public_key: client_key().public_key_bytes(true).unwrap(),
    });
    let frame = request.encode().unwrap();

    c.bench_function("key_request_encode", |b| b.iter(|| black_box(&request).encode()));
    c.bench_function("key_request_decode", |b| {
        b.iter(|| HandshakeMessage::decode(black_box(&frame)))
    });
}

criterion_group!(
    benches,
    bench_header_parse,
    bench_header_serialize,
    bench_envelope_split,
    bench_key_request_codec,
);
criterion_main!(benches);
