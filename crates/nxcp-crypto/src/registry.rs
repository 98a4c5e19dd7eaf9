//! Cipher registry
//!
//! Determines once which suites are usable: a suite is supported when the
//! provider implements it, it passes a self-test, and configuration enables
//! it. The result is cached for the lifetime of the registry.

use std::sync::{Arc, OnceLock};

use nxcp_core::{CipherMask, CipherSuite, CryptoConfig, NxcpError, NxcpResult};
use nxcp_wire::{build_binary_message, MessageFlags};

use crate::{provider_from_config, CipherProvider, EncryptionContext, NativeCipherProvider};

const SELF_TEST_CODE: u16 = 0x0001;
const SELF_TEST_PAYLOAD: &[u8] = b"NXCP cipher self-test";

/// Validated set of usable ciphers
#[derive(Debug)]
pub struct CipherRegistry {
    provider: Arc<dyn CipherProvider>,
    supported: OnceLock<CipherMask>,
}

impl CipherRegistry {
    /// Create an uninitialized registry
    pub fn new(provider: Arc<dyn CipherProvider>) -> Self {
        CipherRegistry {
            provider,
            supported: OnceLock::new(),
        }
    }

    /// Create a registry backed by the native provider
    pub fn native() -> Self {
        Self::new(Arc::new(NativeCipherProvider))
    }

    /// Create and initialize a registry from configuration
    pub fn from_config(config: &CryptoConfig) -> NxcpResult<Self> {
        let registry = Self::new(provider_from_config(config)?);
        registry.initialize(config.enabled_mask());
        Ok(registry)
    }

    /// Validate every built-in suite and cache the usable set
    ///
    /// Only the first call does any work; later calls return the cached mask
    /// and ignore `enabled`.
    pub fn initialize(&self, enabled: CipherMask) -> CipherMask {
        *self.supported.get_or_init(|| self.validate(enabled))
    }

    fn validate(&self, enabled: CipherMask) -> CipherMask {
        let builtin = self.provider.builtin();
        let mut validated = CipherMask::NONE;

        for suite in CipherSuite::ALL {
            if !builtin.contains(suite) {
                tracing::debug!(cipher = %suite, "Cipher not available in {:?} provider", self.provider.kind());
                continue;
            }

            match self_test(self.provider.as_ref(), suite) {
                Ok(()) => validated.insert(suite),
                Err(e) => tracing::warn!(cipher = %suite, error = %e, "Cipher failed self-test, disabled"),
            }
        }

        for suite in validated.suites().filter(|s| !enabled.contains(*s)) {
            tracing::info!(cipher = %suite, "Cipher disabled by configuration");
        }

        let supported = enabled.intersect(builtin).intersect(validated);
        if supported.is_empty() {
            tracing::warn!("No ciphers available, NXCP encryption disabled");
        } else {
            tracing::info!("Supported ciphers: {}", supported.names());
        }

        supported
    }

    /// Whether `initialize` has run
    pub fn is_initialized(&self) -> bool {
        self.supported.get().is_some()
    }

    /// Usable ciphers, empty before initialization
    pub fn supported(&self) -> CipherMask {
        self.supported.get().copied().unwrap_or(CipherMask::NONE)
    }

    pub fn is_supported(&self, suite: CipherSuite) -> bool {
        self.supported().contains(suite)
    }

    /// Comma-separated names of usable ciphers, empty when running unencrypted
    pub fn supported_suites_as_text(&self) -> String {
        self.supported().names()
    }

    pub fn provider(&self) -> &dyn CipherProvider {
        self.provider.as_ref()
    }
}

/// Build a throwaway context and push a probe message through it
fn self_test(provider: &dyn CipherProvider, suite: CipherSuite) -> NxcpResult<()> {
    let context = EncryptionContext::generate(suite, provider)?;
    let probe = build_binary_message(SELF_TEST_CODE, 0, MessageFlags::NONE, SELF_TEST_PAYLOAD);

    let encrypted = context.encrypt_frame(&probe)?;
    if context.decrypt_frame(&encrypted)? != probe {
        return Err(NxcpError::DecryptionFailed);
    }
    Ok(())
}
