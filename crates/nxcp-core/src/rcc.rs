//! Request completion codes carried in session key responses

use crate::NxcpError;

/// Result code of a session key request
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResultCode {
    Success,
    NoCiphers,
    InvalidPublicKey,
    InvalidSessionKey,
    NoEncryptionSupport,
    EncryptionError,
    /// Code this implementation does not know
    Other(u32),
}

impl ResultCode {
    pub fn from_u32(code: u32) -> Self {
        match code {
            0 => ResultCode::Success,
            42 => ResultCode::NoCiphers,
            43 => ResultCode::InvalidPublicKey,
            44 => ResultCode::InvalidSessionKey,
            45 => ResultCode::NoEncryptionSupport,
            98 => ResultCode::EncryptionError,
            other => ResultCode::Other(other),
        }
    }

    pub fn to_u32(self) -> u32 {
        match self {
            ResultCode::Success => 0,
            ResultCode::NoCiphers => 42,
            ResultCode::InvalidPublicKey => 43,
            ResultCode::InvalidSessionKey => 44,
            ResultCode::NoEncryptionSupport => 45,
            ResultCode::EncryptionError => 98,
            ResultCode::Other(code) => code,
        }
    }

    #[inline]
    pub fn is_success(self) -> bool {
        self == ResultCode::Success
    }

    /// Error a requester reports for a failed response
    pub fn into_error(self) -> Option<NxcpError> {
        match self {
            ResultCode::Success => None,
            ResultCode::NoCiphers => Some(NxcpError::NoCiphersAvailable),
            ResultCode::InvalidPublicKey => Some(NxcpError::InvalidPublicKey),
            ResultCode::InvalidSessionKey => Some(NxcpError::InvalidSessionKey),
            ResultCode::NoEncryptionSupport => Some(NxcpError::EncryptionUnavailable),
            other => Some(NxcpError::HandshakeRejected(other.to_u32())),
        }
    }

    /// Code a responder sends for a local failure
    pub fn for_error(err: &NxcpError) -> Self {
        match err {
            NxcpError::NoCiphersAvailable => ResultCode::NoCiphers,
            NxcpError::InvalidPublicKey | NxcpError::AsymmetricOperationFailed => {
                ResultCode::InvalidPublicKey
            }
            NxcpError::InvalidSessionKey | NxcpError::SessionKeyMismatch => {
                ResultCode::InvalidSessionKey
            }
            NxcpError::EncryptionUnavailable => ResultCode::NoEncryptionSupport,
            _ => ResultCode::EncryptionError,
        }
    }
}

impl From<u32> for ResultCode {
    fn from(code: u32) -> Self {
        ResultCode::from_u32(code)
    }
}

impl From<ResultCode> for u32 {
    fn from(code: ResultCode) -> Self {
        code.to_u32()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_values() {
        assert_eq!(ResultCode::Success.to_u32(), 0);
        assert_eq!(ResultCode::NoCiphers.to_u32(), 42);
        assert_eq!(ResultCode::InvalidPublicKey.to_u32(), 43);
        assert_eq!(ResultCode::InvalidSessionKey.to_u32(), 44);
        assert_eq!(ResultCode::NoEncryptionSupport.to_u32(), 45);
        assert_eq!(ResultCode::EncryptionError.to_u32(), 98);
        assert_eq!(ResultCode::from_u32(7), ResultCode::Other(7));
    }

    #[test]
    fn test_error_mapping() {
        assert_eq!(ResultCode::Success.into_error(), None);
        assert_eq!(ResultCode::NoCiphers.into_error(), Some(NxcpError::NoCiphersAvailable));
        assert_eq!(ResultCode::EncryptionError.into_error(), Some(NxcpError::HandshakeRejected(98)));
        assert_eq!(ResultCode::for_error(&NxcpError::KeyGenerationFailed), ResultCode::EncryptionError);
        assert_eq!(ResultCode::for_error(&NxcpError::InvalidPublicKey), ResultCode::InvalidPublicKey);
    }
}
