//! Shared fixtures

use std::sync::{Arc, OnceLock};

use nxcp_core::CipherMask;
use nxcp_crypto::{CipherRegistry, KeyPair};
use nxcp_wire::{build_binary_message, MessageFlags};

/// Key size used by tests; small enough to generate quickly
pub const TEST_KEY_BITS: usize = 1024;

/// Command code of data frames exchanged after the handshake
pub const DATA_CODE: u16 = 0x0100;

/// Command code of unencrypted keepalive frames
pub const KEEPALIVE_CODE: u16 = 0x0003;

/// Client key pair, generated once per process
pub fn client_key() -> &'static KeyPair {
    static KEY: OnceLock<KeyPair> = OnceLock::new();
    KEY.get_or_init(|| KeyPair::generate(TEST_KEY_BITS).expect("test key generation"))
}

/// Server key pair, generated once per process
pub fn server_key() -> &'static KeyPair {
    static KEY: OnceLock<KeyPair> = OnceLock::new();
    KEY.get_or_init(|| KeyPair::generate(TEST_KEY_BITS).expect("test key generation"))
}

/// Initialized native registry restricted to `mask`
pub fn registry(mask: u32) -> Arc<CipherRegistry> {
    let registry = CipherRegistry::native();
    registry.initialize(CipherMask::new(mask));
    Arc::new(registry)
}

/// Binary data frame
pub fn data_frame(id: u32, payload: &[u8]) -> Vec<u8> {
    build_binary_message(DATA_CODE, id, MessageFlags::NONE, payload)
}

/// Binary frame that bypasses encryption
pub fn keepalive_frame(id: u32) -> Vec<u8> {
    let mut flags = MessageFlags::NONE;
    flags.set_dont_encrypt(true);
    build_binary_message(KEEPALIVE_CODE, id, flags, &[])
}

/// Install a tracing subscriber honouring RUST_LOG, once
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
