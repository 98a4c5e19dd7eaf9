//! HMAC-SHA-256 message signing

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use nxcp_core::{NxcpError, NxcpResult};

use crate::CipherProvider;

type HmacSha256 = Hmac<Sha256>;

/// Signature tag length
pub const SIGNATURE_SIZE: usize = 32;

/// Message signer
///
/// Without a cryptographic provider every tag is all zeros, so `verify`
/// accepts only zero tags. Use `is_enabled` to detect that mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameAuthenticator {
    HmacSha256,
    Disabled,
}

impl FrameAuthenticator {
    pub fn for_provider(provider: &dyn CipherProvider) -> Self {
        if provider.message_signing() {
            FrameAuthenticator::HmacSha256
        } else {
            tracing::warn!("Message signing unavailable, signatures will not be checked");
            FrameAuthenticator::Disabled
        }
    }

    pub fn is_enabled(self) -> bool {
        self == FrameAuthenticator::HmacSha256
    }

    /// Sign `message` with a shared secret
    pub fn sign(self, message: &[u8], secret: &[u8]) -> NxcpResult<[u8; SIGNATURE_SIZE]> {
        match self {
            FrameAuthenticator::HmacSha256 => {
                let mut mac = <HmacSha256 as Mac>::new_from_slice(secret)
                    .map_err(|_| NxcpError::InvalidSessionKey)?;
                mac.update(message);
                Ok(mac.finalize().into_bytes().into())
            }
            FrameAuthenticator::Disabled => Ok([0u8; SIGNATURE_SIZE]),
        }
    }

    /// Check a tag produced by `sign`
    pub fn verify(self, message: &[u8], secret: &[u8], tag: &[u8]) -> bool {
        if tag.len() != SIGNATURE_SIZE {
            return false;
        }
        match self.sign(message, secret) {
            Ok(expected) => expected[..].ct_eq(tag).into(),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{NativeCipherProvider, NullCipherProvider};

    #[test]
    fn test_sign_verify() {
        let auth = FrameAuthenticator::for_provider(&NativeCipherProvider);
        assert!(auth.is_enabled());

        let tag = auth.sign(b"message", b"secret").unwrap();
        assert_eq!(tag, auth.sign(b"message", b"secret").unwrap());
        assert!(auth.verify(b"message", b"secret", &tag));
        assert!(!auth.verify(b"massage", b"secret", &tag));
        assert!(!auth.verify(b"message", b"secreT", &tag));
        assert!(!auth.verify(b"message", b"secret", &tag[..31]));
    }

    #[test]
    fn test_known_vector() {
        // RFC 4231 test case 2
        let tag = FrameAuthenticator::HmacSha256
            .sign(b"what do ya want for nothing?", b"Jefe")
            .unwrap();
        assert_eq!(tag[..8], [0x5b, 0xdc, 0xc1, 0x46, 0xbf, 0x60, 0x75, 0x4e]);
    }

    #[test]
    fn test_disabled_mode() {
        let auth = FrameAuthenticator::for_provider(&NullCipherProvider);
        assert!(!auth.is_enabled());

        let tag = auth.sign(b"message", b"secret").unwrap();
        assert_eq!(tag, [0u8; SIGNATURE_SIZE]);
        assert!(auth.verify(b"anything", b"else", &[0u8; SIGNATURE_SIZE]));
        assert!(!auth.verify(b"anything", b"else", &[1u8; SIGNATURE_SIZE]));
    }

    #[test]
    fn test_secret_lengths() {
        // Secrets shorter than, equal to and longer than the SHA-256 block
        let auth = FrameAuthenticator::HmacSha256;
        for len in [0usize, 1, 64, 65, 200] {
            let secret = vec![0x0B; len];
            let tag = auth.sign(b"frame", &secret).unwrap();
            assert!(auth.verify(b"frame", &secret, &tag), "secret length {}", len);
        }
    }
}
