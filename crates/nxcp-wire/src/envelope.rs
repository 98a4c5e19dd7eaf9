//! Encrypted message envelope
//!
//! Envelope = 8 cleartext bytes + ciphertext:
//! - Bytes 0-1: Command code, always CMD_ENCRYPTED_MESSAGE (BE)
//! - Byte 2: Padding length
//! - Byte 3: Reserved
//! - Bytes 4-7: Total size including envelope and padding (BE)
//!
//! The ciphertext decrypts to an 8-byte payload header (CRC32 of the
//! plaintext message + 4 reserved bytes) followed by the plaintext message.

use nxcp_core::{NxcpError, NxcpResult};

use crate::CMD_ENCRYPTED_MESSAGE;

/// Cleartext bytes in front of the ciphertext
pub const ENVELOPE_HEADER_SIZE: usize = 8;

/// Payload header encrypted in front of the plaintext message
pub const PAYLOAD_HEADER_SIZE: usize = 8;

/// Total size is always rounded up to this boundary
pub const ENVELOPE_ALIGNMENT: usize = 8;

/// Cleartext part of an encrypted message
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EnvelopeHeader {
    /// Bytes counted in `size` that are not transmitted
    pub padding: u8,
    /// Declared total size
    pub size: u32,
}

impl EnvelopeHeader {
    /// Header for `ciphertext_len` bytes of ciphertext, with padding to the
    /// envelope alignment
    pub fn for_ciphertext(ciphertext_len: usize) -> Self {
        let unpadded = ENVELOPE_HEADER_SIZE + ciphertext_len;
        let padding = (ENVELOPE_ALIGNMENT - unpadded % ENVELOPE_ALIGNMENT) % ENVELOPE_ALIGNMENT;
        EnvelopeHeader {
            padding: padding as u8,
            size: (unpadded + padding) as u32,
        }
    }

    /// Parse envelope header from bytes
    pub fn parse(buf: &[u8]) -> NxcpResult<Self> {
        if buf.len() < ENVELOPE_HEADER_SIZE {
            return Err(NxcpError::BufferTooShort {
                expected: ENVELOPE_HEADER_SIZE,
                actual: buf.len(),
            });
        }

        let code = u16::from_be_bytes([buf[0], buf[1]]);
        if code != CMD_ENCRYPTED_MESSAGE {
            return Err(NxcpError::UnexpectedMessage(code));
        }

        Ok(EnvelopeHeader {
            padding: buf[2],
            size: u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]),
        })
    }

    /// Serialize envelope header
    pub fn to_bytes(&self) -> [u8; ENVELOPE_HEADER_SIZE] {
        let mut buf = [0u8; ENVELOPE_HEADER_SIZE];
        buf[0..2].copy_from_slice(&CMD_ENCRYPTED_MESSAGE.to_be_bytes());
        buf[2] = self.padding;
        buf[3] = 0;
        buf[4..8].copy_from_slice(&self.size.to_be_bytes());
        buf
    }

    /// Number of ciphertext bytes the envelope declares
    pub fn ciphertext_len(&self) -> NxcpResult<usize> {
        (self.size as usize)
            .checked_sub(ENVELOPE_HEADER_SIZE + self.padding as usize)
            .ok_or(NxcpError::DecryptionFailed)
    }

    /// Split a received envelope into header and ciphertext
    pub fn split(buf: &[u8]) -> NxcpResult<(Self, &[u8])> {
        let header = Self::parse(buf)?;
        let len = header.ciphertext_len()?;

        if buf.len() < ENVELOPE_HEADER_SIZE + len {
            return Err(NxcpError::BufferTooShort {
                expected: ENVELOPE_HEADER_SIZE + len,
                actual: buf.len(),
            });
        }

        Ok((header, &buf[ENVELOPE_HEADER_SIZE..ENVELOPE_HEADER_SIZE + len]))
    }
}

/// Payload header: checksum of the plaintext message
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PayloadHeader {
    pub checksum: u32,
}

impl PayloadHeader {
    pub fn to_bytes(&self) -> [u8; PAYLOAD_HEADER_SIZE] {
        let mut buf = [0u8; PAYLOAD_HEADER_SIZE];
        buf[0..4].copy_from_slice(&self.checksum.to_be_bytes());
        buf
    }

    pub fn parse(buf: &[u8]) -> NxcpResult<Self> {
        if buf.len() < PAYLOAD_HEADER_SIZE {
            return Err(NxcpError::DecryptionFailed);
        }

        Ok(PayloadHeader {
            checksum: u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_padding_calculation() {
        let header = EnvelopeHeader::for_ciphertext(32);
        assert_eq!(header.padding, 0);
        assert_eq!(header.size, 40);

        let header = EnvelopeHeader::for_ciphertext(29);
        assert_eq!(header.padding, 3);
        assert_eq!(header.size, 40);
        assert_eq!(header.ciphertext_len().unwrap(), 29);
    }

    #[test]
    fn test_envelope_layout() {
        let header = EnvelopeHeader { padding: 5, size: 0x0000_0110 };
        let bytes = header.to_bytes();
        assert_eq!(bytes, [0x00, 0x83, 5, 0, 0x00, 0x00, 0x01, 0x10]);
        assert_eq!(EnvelopeHeader::parse(&bytes).unwrap(), header);
    }

    #[test]
    fn test_split_short_buffer() {
        let header = EnvelopeHeader::for_ciphertext(16);
        let mut buf = header.to_bytes().to_vec();
        buf.extend_from_slice(&[0u8; 8]);

        assert!(matches!(EnvelopeHeader::split(&buf), Err(NxcpError::BufferTooShort { .. })));

        buf.extend_from_slice(&[0u8; 8]);
        let (parsed, ciphertext) = EnvelopeHeader::split(&buf).unwrap();
        assert_eq!(parsed, header);
        assert_eq!(ciphertext.len(), 16);
    }

    #[test]
    fn test_inconsistent_size() {
        let header = EnvelopeHeader { padding: 7, size: 4 };
        assert_eq!(header.ciphertext_len(), Err(NxcpError::DecryptionFailed));
    }

    #[test]
    fn test_wrong_code() {
        let mut bytes = EnvelopeHeader::for_ciphertext(8).to_bytes();
        bytes[1] = 0x82;
        assert_eq!(EnvelopeHeader::parse(&bytes), Err(NxcpError::UnexpectedMessage(0x82)));
    }
}
