//! Crypto configuration

use serde::{Deserialize, Serialize};

use crate::{CipherMask, NxcpError, NxcpResult};

/// Default RSA modulus size for generated key pairs
pub const DEFAULT_RSA_KEY_BITS: usize = 2048;

/// Which cipher implementation backs the secure channel
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Real block ciphers
    #[default]
    Native,
    /// No cryptography: nothing is negotiated and message signing is disabled
    Null,
}

/// Secure channel configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CryptoConfig {
    /// Ciphers this endpoint is willing to negotiate
    pub enabled_ciphers: u32,
    /// Modulus size for generated RSA keys
    pub rsa_key_bits: usize,
    /// Send public keys as X.509 SubjectPublicKeyInfo instead of raw PKCS#1
    pub use_x509_key_format: bool,
    /// Cipher implementation
    pub provider: ProviderKind,
    /// Must be set to run with the null provider
    pub allow_unencrypted: bool,
}

impl Default for CryptoConfig {
    fn default() -> Self {
        CryptoConfig {
            enabled_ciphers: 0xFFFF,
            rsa_key_bits: DEFAULT_RSA_KEY_BITS,
            use_x509_key_format: true,
            provider: ProviderKind::Native,
            allow_unencrypted: false,
        }
    }
}

impl CryptoConfig {
    pub fn enabled_mask(&self) -> CipherMask {
        CipherMask::new(self.enabled_ciphers)
    }

    pub fn validate(&self) -> NxcpResult<()> {
        if !(1024..=16384).contains(&self.rsa_key_bits) {
            return Err(NxcpError::InvalidConfig(format!(
                "rsa_key_bits must be within 1024..=16384, got {}",
                self.rsa_key_bits
            )));
        }

        if self.provider == ProviderKind::Null && !self.allow_unencrypted {
            return Err(NxcpError::InvalidConfig(
                "null provider requires allow_unencrypted".into(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = CryptoConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.enabled_mask(), CipherMask::new(0xFFFF));
    }

    #[test]
    fn test_null_provider_needs_opt_in() {
        let mut config = CryptoConfig {
            provider: ProviderKind::Null,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(NxcpError::InvalidConfig(_))));

        config.allow_unencrypted = true;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_key_bits_range() {
        let config = CryptoConfig {
            rsa_key_bits: 512,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json() {
        let config: CryptoConfig =
            serde_json::from_str(r#"{ "enabled_ciphers": 17, "provider": "native" }"#).unwrap();
        assert_eq!(config.enabled_ciphers, 17);
        assert_eq!(config.rsa_key_bits, DEFAULT_RSA_KEY_BITS);
        assert!(config.use_x509_key_format);

        let config: CryptoConfig = serde_json::from_str(r#"{ "provider": "null" }"#).unwrap();
        assert_eq!(config.provider, ProviderKind::Null);
    }
}
