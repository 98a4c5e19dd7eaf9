//! Fuzz target for handshake message parsing.
//!
//! Decoding arbitrary frames and feeding them to a negotiator must never
//! panic. Anything that decodes must re-encode to a frame that decodes to
//! the same message.

#![no_main]

use std::sync::{Arc, OnceLock};

use libfuzzer_sys::fuzz_target;
use nxcp_core::CipherMask;
use nxcp_crypto::{CipherRegistry, KeyPair, SessionNegotiator};
use nxcp_wire::HandshakeMessage;

fn key() -> &'static KeyPair {
    static KEY: OnceLock<KeyPair> = OnceLock::new();
    KEY.get_or_init(|| KeyPair::generate(1024).unwrap())
}

fn registry() -> Arc<CipherRegistry> {
    static REGISTRY: OnceLock<Arc<CipherRegistry>> = OnceLock::new();
    REGISTRY
        .get_or_init(|| {
            let registry = CipherRegistry::native();
            registry.initialize(CipherMask::ALL);
            Arc::new(registry)
        })
        .clone()
}

fuzz_target!(|data: &[u8]| {
    if let Ok(message) = HandshakeMessage::decode(data) {
        if let Ok(encoded) = message.encode() {
            assert_eq!(HandshakeMessage::decode(&encoded).unwrap(), message);
        }
    }

    let mut negotiator = SessionNegotiator::new(registry());
    let _ = negotiator.process(data, Some(key()));

    // Same frame as a response to a pending request
    let mut requester = SessionNegotiator::new(registry());
    if requester.build_request(1, key()).is_ok() {
        let _ = requester.process(data, Some(key()));
    }
});
