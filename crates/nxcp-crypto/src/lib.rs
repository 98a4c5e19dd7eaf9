//! NXCP Crypto Engine - Secure channel for NXCP connections
//!
//! Provides the secure channel used by NXCP connections:
//! - Cipher providers (native block ciphers, or a null provider for
//!   builds running without encryption)
//! - Cipher registry with startup self-test
//! - RSA key handling and OAEP session key transport
//! - Session key negotiation
//! - Frame encryption/decryption
//! - HMAC-SHA-256 message signing

pub mod auth;
pub mod context;
pub mod keys;
pub mod negotiator;
pub mod provider;
pub mod registry;

pub use auth::*;
pub use context::*;
pub use keys::*;
pub use negotiator::*;
pub use provider::*;
pub use registry::*;
