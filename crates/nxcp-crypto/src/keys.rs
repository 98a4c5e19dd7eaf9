//! RSA key handling and session key transport
//!
//! Keys serialize to PKCS#1 DER. A stored key pair is the public key
//! structure immediately followed by the private key structure. Public keys
//! sent to peers are either raw PKCS#1 or X.509 SubjectPublicKeyInfo.
//!
//! Session keys and IVs travel under RSA-OAEP with SHA-1, the padding legacy
//! peers use.

use std::fmt;

use rand::rngs::OsRng;
use rsa::pkcs1::der::{asn1::AnyRef, Decode, Reader, SliceReader, Tag};
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey, EncodeRsaPrivateKey, EncodeRsaPublicKey};
use rsa::pkcs8::{DecodePublicKey, EncodePublicKey};
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, Oaep, RsaPrivateKey, RsaPublicKey};
use sha1::Sha1;
use zeroize::Zeroizing;

use nxcp_core::{CryptoConfig, NxcpError, NxcpResult, MAX_IV_LEN, MAX_SESSION_KEY_LEN};
use nxcp_wire::MAX_KEY_BLOB;

/// Public exponent for generated keys
pub const RSA_PUBLIC_EXPONENT: u32 = 65537;

/// Largest payload ever sent under RSA: a session key and an IV
pub const MAX_ASYMMETRIC_PAYLOAD: usize = MAX_SESSION_KEY_LEN + MAX_IV_LEN;

/// RSA key, public only or public + private
#[derive(Clone)]
pub struct KeyPair {
    public: RsaPublicKey,
    private: Option<RsaPrivateKey>,
}

impl KeyPair {
    /// Generate a new key pair with public exponent 65537
    pub fn generate(bits: usize) -> NxcpResult<Self> {
        let exponent = BigUint::from(RSA_PUBLIC_EXPONENT);
        let private = RsaPrivateKey::new_with_exp(&mut OsRng, bits, &exponent)
            .map_err(|_| NxcpError::KeyGenerationFailed)?;
        Ok(Self::from_private(private))
    }

    /// Generate a key pair of the configured size
    pub fn generate_from_config(config: &CryptoConfig) -> NxcpResult<Self> {
        config.validate()?;
        Self::generate(config.rsa_key_bits)
    }

    pub fn from_private(private: RsaPrivateKey) -> Self {
        KeyPair {
            public: private.to_public_key(),
            private: Some(private),
        }
    }

    pub fn from_public(public: RsaPublicKey) -> Self {
        KeyPair {
            public,
            private: None,
        }
    }

    /// Parse a PKCS#1 public key, optionally followed by the matching private key
    pub fn from_bytes(data: &[u8], include_private: bool) -> NxcpResult<Self> {
        let public_len = der_sequence_len(data)?;
        let public = RsaPublicKey::from_pkcs1_der(&data[..public_len])
            .map_err(|_| NxcpError::InvalidKeyEncoding)?;

        if !include_private {
            return Ok(Self::from_public(public));
        }

        let rest = &data[public_len..];
        let private_len = der_sequence_len(rest)?;
        let private = RsaPrivateKey::from_pkcs1_der(&rest[..private_len])
            .map_err(|_| NxcpError::InvalidKeyEncoding)?;

        if private.to_public_key() != public {
            return Err(NxcpError::InvalidKeyEncoding);
        }

        Ok(KeyPair {
            public,
            private: Some(private),
        })
    }

    /// Serialize in the form `from_bytes` reads
    pub fn to_bytes(&self) -> NxcpResult<Zeroizing<Vec<u8>>> {
        let public = self
            .public
            .to_pkcs1_der()
            .map_err(|_| NxcpError::InvalidKeyEncoding)?;

        let mut out = Zeroizing::new(public.as_bytes().to_vec());
        if let Some(private) = &self.private {
            let der = private
                .to_pkcs1_der()
                .map_err(|_| NxcpError::InvalidKeyEncoding)?;
            out.extend_from_slice(der.as_bytes());
        }
        Ok(out)
    }

    /// Public key as sent to a peer
    pub fn public_key_bytes(&self, use_x509_format: bool) -> NxcpResult<Vec<u8>> {
        if use_x509_format {
            self.public
                .to_public_key_der()
                .map(|der| der.as_bytes().to_vec())
                .map_err(|_| NxcpError::InvalidKeyEncoding)
        } else {
            self.public
                .to_pkcs1_der()
                .map(|der| der.as_bytes().to_vec())
                .map_err(|_| NxcpError::InvalidKeyEncoding)
        }
    }

    /// Parse a peer's public key in either format
    pub fn public_from_bytes(blob: &[u8]) -> NxcpResult<Self> {
        RsaPublicKey::from_public_key_der(blob)
            .or_else(|_| RsaPublicKey::from_pkcs1_der(blob))
            .map(Self::from_public)
            .map_err(|_| NxcpError::InvalidPublicKey)
    }

    pub fn has_private(&self) -> bool {
        self.private.is_some()
    }

    /// Modulus size in bits
    pub fn bits(&self) -> usize {
        self.public.size() * 8
    }

    /// RSA-OAEP encrypt a session key or IV
    pub fn encrypt(&self, plaintext: &[u8]) -> NxcpResult<Vec<u8>> {
        if plaintext.len() > MAX_ASYMMETRIC_PAYLOAD {
            return Err(NxcpError::AsymmetricOperationFailed);
        }

        let ciphertext = self
            .public
            .encrypt(&mut OsRng, Oaep::new::<Sha1>(), plaintext)
            .map_err(|_| NxcpError::AsymmetricOperationFailed)?;

        if ciphertext.len() > MAX_KEY_BLOB {
            return Err(NxcpError::KeyBlobTooLarge(ciphertext.len()));
        }
        Ok(ciphertext)
    }

    /// RSA-OAEP decrypt with the private key
    pub fn decrypt(&self, ciphertext: &[u8]) -> NxcpResult<Zeroizing<Vec<u8>>> {
        let private = self
            .private
            .as_ref()
            .ok_or(NxcpError::AsymmetricOperationFailed)?;

        let plaintext = private
            .decrypt(Oaep::new::<Sha1>(), ciphertext)
            .map(Zeroizing::new)
            .map_err(|_| NxcpError::AsymmetricOperationFailed)?;

        if plaintext.len() > MAX_ASYMMETRIC_PAYLOAD {
            return Err(NxcpError::AsymmetricOperationFailed);
        }
        Ok(plaintext)
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("bits", &self.bits())
            .field("private", &self.has_private())
            .finish_non_exhaustive()
    }
}

/// Length of the DER SEQUENCE at the start of `data`, header included
fn der_sequence_len(data: &[u8]) -> NxcpResult<usize> {
    let mut reader = SliceReader::new(data).map_err(|_| NxcpError::InvalidKeyEncoding)?;
    if reader.peek_tag().map_err(|_| NxcpError::InvalidKeyEncoding)? != Tag::Sequence {
        return Err(NxcpError::InvalidKeyEncoding);
    }

    AnyRef::decode(&mut reader).map_err(|_| NxcpError::InvalidKeyEncoding)?;
    usize::try_from(reader.position()).map_err(|_| NxcpError::InvalidKeyEncoding)
}
