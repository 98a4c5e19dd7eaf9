//! Error types for the NXCP secure channel

use thiserror::Error;

/// Secure channel errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NxcpError {
    // Wire errors
    #[error("Invalid wire format: {0}")]
    InvalidWireFormat(String),

    #[error("Buffer too short: expected {expected}, got {actual}")]
    BufferTooShort { expected: usize, actual: usize },

    #[error("Key blob too large: {0} bytes")]
    KeyBlobTooLarge(usize),

    // Negotiation errors
    #[error("No ciphers available")]
    NoCiphersAvailable,

    #[error("Unsupported cipher: {0}")]
    UnsupportedCipher(u16),

    #[error("Invalid public key")]
    InvalidPublicKey,

    #[error("Session key length mismatch")]
    SessionKeyMismatch,

    #[error("Invalid session key")]
    InvalidSessionKey,

    #[error("Unexpected message: 0x{0:04X}")]
    UnexpectedMessage(u16),

    #[error("Handshake in wrong state: {0}")]
    HandshakeState(&'static str),

    #[error("Handshake rejected by peer: code {0}")]
    HandshakeRejected(u32),

    #[error("Encryption not available")]
    EncryptionUnavailable,

    // Asymmetric errors
    #[error("Invalid key encoding")]
    InvalidKeyEncoding,

    #[error("Key generation failed")]
    KeyGenerationFailed,

    #[error("Asymmetric operation failed")]
    AsymmetricOperationFailed,

    // Frame errors
    #[error("Decryption failed")]
    DecryptionFailed,

    #[error("Checksum mismatch")]
    ChecksumMismatch,

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl NxcpError {
    /// Errors after which the connection's context must not be reused
    pub fn is_fatal_for_connection(&self) -> bool {
        matches!(self, NxcpError::DecryptionFailed | NxcpError::ChecksumMismatch)
    }
}

/// Result type for NXCP operations
pub type NxcpResult<T> = Result<T, NxcpError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(NxcpError::ChecksumMismatch.is_fatal_for_connection());
        assert!(NxcpError::DecryptionFailed.is_fatal_for_connection());
        assert!(!NxcpError::NoCiphersAvailable.is_fatal_for_connection());
    }

    #[test]
    fn test_display() {
        assert_eq!(
            NxcpError::UnexpectedMessage(0x84).to_string(),
            "Unexpected message: 0x0084"
        );
    }
}
