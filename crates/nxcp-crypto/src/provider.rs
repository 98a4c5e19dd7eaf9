//! Cipher providers
//!
//! A provider turns a cipher suite and a session key into a block engine.
//! The native provider backs every suite with a real block cipher in CBC
//! mode; the null provider backs none, which leaves the channel unencrypted
//! and message signing disabled.

use std::fmt;
use std::sync::Arc;

use aes::{Aes128, Aes256};
use blowfish::Blowfish;
use cbc::cipher::{
    block_padding::Pkcs7, BlockCipher, BlockDecryptMut, BlockEncryptMut, InnerIvInit, KeyInit,
};
use des::TdesEde3;
use idea::Idea;
use zeroize::ZeroizeOnDrop;

use nxcp_core::{CipherMask, CipherSuite, CryptoConfig, NxcpError, NxcpResult, ProviderKind};

/// Keyed block cipher running in CBC mode with PKCS#7 padding
///
/// Chaining starts from the given IV on every call.
pub trait BlockEngine: Send {
    fn suite(&self) -> CipherSuite;

    fn encrypt(&mut self, iv: &[u8], plaintext: &[u8]) -> NxcpResult<Vec<u8>>;

    fn decrypt(&mut self, iv: &[u8], ciphertext: &[u8]) -> NxcpResult<Vec<u8>>;
}

/// Source of block engines
pub trait CipherProvider: Send + Sync + fmt::Debug {
    fn kind(&self) -> ProviderKind;

    /// Suites this provider implements
    fn builtin(&self) -> CipherMask;

    /// Create an engine keyed with `key`
    fn engine(&self, suite: CipherSuite, key: &[u8]) -> NxcpResult<Box<dyn BlockEngine>>;

    /// Whether HMAC message signing is available
    fn message_signing(&self) -> bool {
        self.kind() == ProviderKind::Native
    }
}

/// Holds the expanded key schedule, wiped on drop along with every
/// per-frame copy
struct CbcEngine<C: ZeroizeOnDrop> {
    suite: CipherSuite,
    cipher: C,
}

impl<C: ZeroizeOnDrop> ZeroizeOnDrop for CbcEngine<C> {}

impl<C> BlockEngine for CbcEngine<C>
where
    C: BlockCipher + BlockEncryptMut + BlockDecryptMut + Clone + Send + ZeroizeOnDrop,
{
    fn suite(&self) -> CipherSuite {
        self.suite
    }

    fn encrypt(&mut self, iv: &[u8], plaintext: &[u8]) -> NxcpResult<Vec<u8>> {
        let encryptor = cbc::Encryptor::<C>::inner_iv_slice_init(self.cipher.clone(), iv)
            .map_err(|_| NxcpError::InvalidSessionKey)?;
        Ok(encryptor.encrypt_padded_vec_mut::<Pkcs7>(plaintext))
    }

    fn decrypt(&mut self, iv: &[u8], ciphertext: &[u8]) -> NxcpResult<Vec<u8>> {
        if ciphertext.is_empty() || ciphertext.len() % self.suite.block_size() != 0 {
            return Err(NxcpError::DecryptionFailed);
        }

        let decryptor = cbc::Decryptor::<C>::inner_iv_slice_init(self.cipher.clone(), iv)
            .map_err(|_| NxcpError::InvalidSessionKey)?;
        decryptor
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| NxcpError::DecryptionFailed)
    }
}

fn keyed_engine<C>(suite: CipherSuite, key: &[u8]) -> NxcpResult<Box<dyn BlockEngine>>
where
    C: KeyInit
        + BlockCipher
        + BlockEncryptMut
        + BlockDecryptMut
        + Clone
        + Send
        + ZeroizeOnDrop
        + 'static,
{
    let cipher = C::new_from_slice(key).map_err(|_| NxcpError::InvalidSessionKey)?;
    Ok(Box::new(CbcEngine { suite, cipher }))
}

/// Provider backed by RustCrypto block ciphers
#[derive(Clone, Copy, Debug, Default)]
pub struct NativeCipherProvider;

impl CipherProvider for NativeCipherProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Native
    }

    fn builtin(&self) -> CipherMask {
        CipherMask::ALL
    }

    fn engine(&self, suite: CipherSuite, key: &[u8]) -> NxcpResult<Box<dyn BlockEngine>> {
        if key.len() != suite.key_len() {
            return Err(NxcpError::SessionKeyMismatch);
        }

        match suite {
            CipherSuite::Aes256 => keyed_engine::<Aes256>(suite, key),
            CipherSuite::Blowfish256 | CipherSuite::Blowfish128 => {
                keyed_engine::<Blowfish>(suite, key)
            }
            CipherSuite::Idea => keyed_engine::<Idea>(suite, key),
            CipherSuite::TripleDes => keyed_engine::<TdesEde3>(suite, key),
            CipherSuite::Aes128 => keyed_engine::<Aes128>(suite, key),
        }
    }
}

/// Provider for deployments running without encryption
#[derive(Clone, Copy, Debug, Default)]
pub struct NullCipherProvider;

impl CipherProvider for NullCipherProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Null
    }

    fn builtin(&self) -> CipherMask {
        CipherMask::NONE
    }

    fn engine(&self, _suite: CipherSuite, _key: &[u8]) -> NxcpResult<Box<dyn BlockEngine>> {
        Err(NxcpError::EncryptionUnavailable)
    }
}

/// Build the provider selected by configuration
pub fn provider_from_config(config: &CryptoConfig) -> NxcpResult<Arc<dyn CipherProvider>> {
    config.validate()?;

    match config.provider {
        ProviderKind::Native => Ok(Arc::new(NativeCipherProvider)),
        ProviderKind::Null => {
            tracing::warn!("Encryption disabled by configuration, NXCP traffic will not be protected");
            Ok(Arc::new(NullCipherProvider))
        }
    }
}
