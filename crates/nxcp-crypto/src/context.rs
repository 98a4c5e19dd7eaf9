//! Per-connection encryption context
//!
//! Every frame is encrypted independently from the session IV. The
//! ciphertext covers an 8-byte payload header (CRC32 of the frame) followed
//! by the frame itself. Frames flagged DONT_ENCRYPT pass through unchanged.

use std::fmt;

use parking_lot::Mutex;
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::Zeroizing;

use nxcp_core::{CipherSuite, NxcpError, NxcpResult, MAX_IV_LEN};
use nxcp_wire::{
    EnvelopeHeader, MessageHeader, PayloadHeader, HEADER_SIZE, PAYLOAD_HEADER_SIZE,
};

use crate::{BlockEngine, CipherProvider};

struct Engines {
    encryptor: Box<dyn BlockEngine>,
    decryptor: Box<dyn BlockEngine>,
}

/// Negotiated cipher, session key and IV for one connection
///
/// Shared by the send and receive paths of a connection. Key and IV are
/// fixed at construction; the engines are mutated under a lock.
pub struct EncryptionContext {
    suite: CipherSuite,
    session_key: Zeroizing<Vec<u8>>,
    iv: Zeroizing<Vec<u8>>,
    engines: Mutex<Engines>,
}

impl EncryptionContext {
    /// Create a context with a fresh random key and IV
    pub fn generate(suite: CipherSuite, provider: &dyn CipherProvider) -> NxcpResult<Self> {
        let mut key = Zeroizing::new(vec![0u8; suite.key_len()]);
        let mut iv = Zeroizing::new(vec![0u8; suite.iv_len()]);

        OsRng
            .try_fill_bytes(&mut key)
            .and_then(|_| OsRng.try_fill_bytes(&mut iv))
            .map_err(|_| NxcpError::KeyGenerationFailed)?;

        Self::from_parts(suite, key, iv, provider)
    }

    /// Create a context from received key material
    pub fn new(
        suite: CipherSuite,
        key: &[u8],
        iv: &[u8],
        provider: &dyn CipherProvider,
    ) -> NxcpResult<Self> {
        Self::from_parts(
            suite,
            Zeroizing::new(key.to_vec()),
            Zeroizing::new(iv.to_vec()),
            provider,
        )
    }

    /// Create a context taking ownership of key material
    pub fn from_parts(
        suite: CipherSuite,
        session_key: Zeroizing<Vec<u8>>,
        iv: Zeroizing<Vec<u8>>,
        provider: &dyn CipherProvider,
    ) -> NxcpResult<Self> {
        if session_key.len() != suite.key_len() {
            return Err(NxcpError::SessionKeyMismatch);
        }
        if iv.len() != suite.iv_len() {
            return Err(NxcpError::InvalidSessionKey);
        }

        let engines = Engines {
            encryptor: provider.engine(suite, &session_key)?,
            decryptor: provider.engine(suite, &session_key)?,
        };

        Ok(EncryptionContext {
            suite,
            session_key,
            iv,
            engines: Mutex::new(engines),
        })
    }

    pub fn suite(&self) -> CipherSuite {
        self.suite
    }

    pub fn session_key(&self) -> &[u8] {
        &self.session_key
    }

    pub fn iv(&self) -> &[u8] {
        &self.iv
    }

    /// IV as sent on the wire, zero-padded to the maximum IV length
    pub fn wire_iv(&self) -> Zeroizing<Vec<u8>> {
        let mut iv = Zeroizing::new(vec![0u8; MAX_IV_LEN]);
        iv[..self.iv.len()].copy_from_slice(&self.iv);
        iv
    }

    /// Encrypt a complete plaintext frame into an envelope
    pub fn encrypt_frame(&self, frame: &[u8]) -> NxcpResult<Vec<u8>> {
        let header = MessageHeader::parse_frame(frame)?;
        if header.flags.is_dont_encrypt() {
            return Ok(frame.to_vec());
        }

        let mut plaintext = Zeroizing::new(Vec::with_capacity(PAYLOAD_HEADER_SIZE + frame.len()));
        plaintext.extend_from_slice(&PayloadHeader { checksum: checksum(frame) }.to_bytes());
        plaintext.extend_from_slice(frame);

        let ciphertext = {
            let mut engines = self.engines.lock();
            engines.encryptor.encrypt(&self.iv, &plaintext)?
        };

        let envelope = EnvelopeHeader::for_ciphertext(ciphertext.len());
        let mut out = Vec::with_capacity(envelope.size as usize);
        out.extend_from_slice(&envelope.to_bytes());
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    /// Decrypt an envelope back into the plaintext frame
    pub fn decrypt_frame(&self, encrypted: &[u8]) -> NxcpResult<Vec<u8>> {
        let (envelope, ciphertext) = EnvelopeHeader::split(encrypted)?;

        let decrypted = {
            let mut engines = self.engines.lock();
            Zeroizing::new(engines.decryptor.decrypt(&self.iv, ciphertext)?)
        };

        if decrypted.len() < PAYLOAD_HEADER_SIZE + HEADER_SIZE {
            tracing::debug!(len = decrypted.len(), "Decrypted message too short");
            return Err(NxcpError::DecryptionFailed);
        }

        let payload_header = PayloadHeader::parse(&decrypted)?;
        let frame = &decrypted[PAYLOAD_HEADER_SIZE..];
        let claimed = MessageHeader::parse(frame)?.size as usize;

        if claimed > envelope.size as usize || claimed != frame.len() {
            tracing::debug!(claimed, recovered = frame.len(), "Decrypted message size mismatch");
            return Err(NxcpError::DecryptionFailed);
        }

        if checksum(frame) != payload_header.checksum {
            tracing::debug!(code = ?nxcp_wire::frame_code(frame), "Decrypted message checksum mismatch");
            return Err(NxcpError::ChecksumMismatch);
        }

        Ok(frame.to_vec())
    }

    /// Replace an envelope with its plaintext frame
    ///
    /// The buffer is left untouched on error.
    pub fn decrypt_in_place(&self, buf: &mut Vec<u8>) -> NxcpResult<()> {
        let frame = self.decrypt_frame(buf)?;
        buf.clear();
        buf.extend_from_slice(&frame);
        Ok(())
    }
}

impl fmt::Debug for EncryptionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptionContext")
            .field("suite", &self.suite)
            .finish_non_exhaustive()
    }
}

fn checksum(frame: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new_with_initial(0);
    hasher.update(frame);
    hasher.finalize()
}
