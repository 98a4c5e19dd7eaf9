//! Fuzz target for encrypted frame decryption.
//!
//! Arbitrary bytes fed to a live context must be rejected with an error,
//! never accepted and never panic.

#![no_main]

use std::sync::OnceLock;

use libfuzzer_sys::fuzz_target;
use nxcp_core::CipherSuite;
use nxcp_crypto::{EncryptionContext, NativeCipherProvider};

fn contexts() -> &'static Vec<EncryptionContext> {
    static CONTEXTS: OnceLock<Vec<EncryptionContext>> = OnceLock::new();
    CONTEXTS.get_or_init(|| {
        CipherSuite::ALL
            .into_iter()
            .map(|suite| EncryptionContext::generate(suite, &NativeCipherProvider).unwrap())
            .collect()
    })
}

fuzz_target!(|data: &[u8]| {
    let Some((&selector, frame)) = data.split_first() else {
        return;
    };
    let ctx = &contexts()[selector as usize % CipherSuite::ALL.len()];

    let _ = ctx.decrypt_frame(frame);

    // Plaintext frames either fail validation or round-trip
    if let Ok(encrypted) = ctx.encrypt_frame(frame) {
        if encrypted.as_slice() != frame {
            assert_eq!(ctx.decrypt_frame(&encrypted).unwrap(), frame);
        }
    }
});
