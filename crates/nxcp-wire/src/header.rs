//! Message header for NXCP wire protocol
//!
//! Message header is 16 bytes:
//! - Bytes 0-1: Command code (BE)
//! - Bytes 2-3: Flags (BE)
//! - Bytes 4-7: Message size including header (BE)
//! - Bytes 8-11: Message id (BE)
//! - Bytes 12-15: Field count, or payload length for binary messages (BE)

use nxcp_core::{NxcpError, NxcpResult};

use crate::MessageFlags;

/// Message header size in bytes
pub const HEADER_SIZE: usize = 16;

/// Offset of the flags field
pub const FLAGS_OFFSET: usize = 2;

/// Offset of the size field
pub const SIZE_OFFSET: usize = 4;

/// Session key request (requester -> responder)
pub const CMD_REQUEST_SESSION_KEY: u16 = 0x0082;

/// Encrypted message envelope
pub const CMD_ENCRYPTED_MESSAGE: u16 = 0x0083;

/// Session key response (responder -> requester)
pub const CMD_SESSION_KEY: u16 = 0x0084;

/// Message header structure
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MessageHeader {
    /// Command code
    pub code: u16,
    /// Message flags
    pub flags: MessageFlags,
    /// Total message size, header included
    pub size: u32,
    /// Request id, echoed by responses
    pub id: u32,
    /// Number of fields (payload length for binary messages)
    pub num_fields: u32,
}

impl MessageHeader {
    pub fn new(code: u16, id: u32) -> Self {
        MessageHeader {
            code,
            flags: MessageFlags::NONE,
            size: HEADER_SIZE as u32,
            id,
            num_fields: 0,
        }
    }

    /// Parse header from bytes
    pub fn parse(buf: &[u8]) -> NxcpResult<Self> {
        if buf.len() < HEADER_SIZE {
            return Err(NxcpError::BufferTooShort {
                expected: HEADER_SIZE,
                actual: buf.len(),
            });
        }

        Ok(MessageHeader {
            code: u16::from_be_bytes([buf[0], buf[1]]),
            flags: MessageFlags::new(u16::from_be_bytes([buf[2], buf[3]])),
            size: read_u32(buf, 4),
            id: read_u32(buf, 8),
            num_fields: read_u32(buf, 12),
        })
    }

    /// Parse the header of a complete frame, checking that the declared size
    /// covers exactly the given buffer
    pub fn parse_frame(buf: &[u8]) -> NxcpResult<Self> {
        let header = Self::parse(buf)?;

        if header.size as usize != buf.len() {
            return Err(NxcpError::InvalidWireFormat(format!(
                "Declared size {} does not match frame length {}",
                header.size,
                buf.len()
            )));
        }

        Ok(header)
    }

    /// Serialize header into the start of `buf`
    pub fn serialize(&self, buf: &mut [u8]) -> NxcpResult<()> {
        if buf.len() < HEADER_SIZE {
            return Err(NxcpError::BufferTooShort {
                expected: HEADER_SIZE,
                actual: buf.len(),
            });
        }

        buf[..HEADER_SIZE].copy_from_slice(&self.to_bytes());
        Ok(())
    }

    /// Serialize header to a new array
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..2].copy_from_slice(&self.code.to_be_bytes());
        buf[2..4].copy_from_slice(&self.flags.0.to_be_bytes());
        buf[4..8].copy_from_slice(&self.size.to_be_bytes());
        buf[8..12].copy_from_slice(&self.id.to_be_bytes());
        buf[12..16].copy_from_slice(&self.num_fields.to_be_bytes());
        buf
    }
}

/// Command code of a raw frame, if it is long enough to carry one
pub fn frame_code(buf: &[u8]) -> Option<u16> {
    (buf.len() >= 2).then(|| u16::from_be_bytes([buf[0], buf[1]]))
}

/// Whether a received frame is an encrypted envelope
pub fn is_encrypted_frame(buf: &[u8]) -> bool {
    frame_code(buf) == Some(CMD_ENCRYPTED_MESSAGE)
}

/// Build a binary message: header followed by `payload`, zero-padded to an
/// 8-byte boundary
pub fn build_binary_message(code: u16, id: u32, flags: MessageFlags, payload: &[u8]) -> Vec<u8> {
    let padding = (8 - (payload.len() + HEADER_SIZE) % 8) & 7;
    let size = HEADER_SIZE + payload.len() + padding;

    let mut flags = flags;
    flags.set_binary(true);

    let header = MessageHeader {
        code,
        flags,
        size: size as u32,
        id,
        num_fields: payload.len() as u32,
    };

    let mut buf = Vec::with_capacity(size);
    buf.extend_from_slice(&header.to_bytes());
    buf.extend_from_slice(payload);
    buf.resize(size, 0);
    buf
}

/// Payload of a binary message, without alignment padding
pub fn binary_payload(buf: &[u8]) -> NxcpResult<(MessageHeader, &[u8])> {
    let header = MessageHeader::parse_frame(buf)?;
    let len = header.num_fields as usize;

    if !header.flags.is_binary() {
        return Err(NxcpError::InvalidWireFormat("Expected binary message".into()));
    }
    if len > buf.len() - HEADER_SIZE {
        return Err(NxcpError::InvalidWireFormat(format!(
            "Payload length {} exceeds frame",
            len
        )));
    }

    Ok((header, &buf[HEADER_SIZE..HEADER_SIZE + len]))
}

#[inline]
fn read_u32(buf: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([buf[offset], buf[offset + 1], buf[offset + 2], buf[offset + 3]])
}
