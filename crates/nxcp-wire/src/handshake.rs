//! Session key handshake messages
//!
//! Both messages travel as binary NXCP messages. Body layouts (BE):
//! - Request: cipher mask (4), public key length (4), public key
//! - Response: result code (4), cipher id (2), key length (2),
//!   encrypted key length (4), encrypted key, IV length (2),
//!   encrypted IV length (4), encrypted IV

use bytes::{Buf, BufMut};

use nxcp_core::{CipherMask, NxcpError, NxcpResult, ResultCode};

use crate::{
    binary_payload, build_binary_message, frame_code, MessageFlags, CMD_REQUEST_SESSION_KEY,
    CMD_SESSION_KEY,
};

/// Largest encrypted key or IV blob accepted on the wire
pub const MAX_KEY_BLOB: usize = 4096;

/// Largest public key blob accepted on the wire
pub const MAX_PUBLIC_KEY_BLOB: usize = 8192;

/// IV length assumed when a peer does not send one
pub const LEGACY_IV_LEN: u16 = 16;

/// Session key request
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyRequest {
    /// Request id, echoed in the response
    pub id: u32,
    /// Ciphers the requester can use
    pub ciphers: CipherMask,
    /// Requester's public key (PKCS#1 or SubjectPublicKeyInfo DER)
    pub public_key: Vec<u8>,
}

impl KeyRequest {
    fn encode_body(&self) -> NxcpResult<Vec<u8>> {
        let mut body = Vec::with_capacity(8 + self.public_key.len());
        body.put_u32(self.ciphers.bits());
        put_blob(&mut body, &self.public_key, MAX_PUBLIC_KEY_BLOB)?;
        Ok(body)
    }

    fn decode_body(id: u32, mut body: &[u8]) -> NxcpResult<Self> {
        let ciphers = CipherMask::new(take_u32(&mut body)?);
        let public_key = take_blob(&mut body, MAX_PUBLIC_KEY_BLOB)?;
        Ok(KeyRequest {
            id,
            ciphers,
            public_key,
        })
    }
}

/// Session key response
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionKeyResponse {
    /// Id of the request being answered
    pub id: u32,
    pub result: ResultCode,
    /// Selected cipher id
    pub cipher: u16,
    /// Session key length for the selected cipher
    pub key_len: u16,
    /// Session key encrypted with the requester's public key
    pub encrypted_key: Vec<u8>,
    /// IV length, zero when sent by a peer that predates IV negotiation
    pub iv_len: u16,
    /// IV encrypted with the requester's public key
    pub encrypted_iv: Vec<u8>,
}

impl SessionKeyResponse {
    /// Response carrying only a failure code
    pub fn failure(id: u32, result: ResultCode) -> Self {
        SessionKeyResponse {
            id,
            result,
            cipher: 0,
            key_len: 0,
            encrypted_key: Vec::new(),
            iv_len: 0,
            encrypted_iv: Vec::new(),
        }
    }

    /// IV length with the legacy default applied
    pub fn effective_iv_len(&self) -> u16 {
        if self.iv_len == 0 {
            LEGACY_IV_LEN
        } else {
            self.iv_len
        }
    }

    fn encode_body(&self) -> NxcpResult<Vec<u8>> {
        let mut body =
            Vec::with_capacity(22 + self.encrypted_key.len() + self.encrypted_iv.len());
        body.put_u32(self.result.to_u32());
        body.put_u16(self.cipher);
        body.put_u16(self.key_len);
        put_blob(&mut body, &self.encrypted_key, MAX_KEY_BLOB)?;
        body.put_u16(self.iv_len);
        put_blob(&mut body, &self.encrypted_iv, MAX_KEY_BLOB)?;
        Ok(body)
    }

    fn decode_body(id: u32, mut body: &[u8]) -> NxcpResult<Self> {
        let result = ResultCode::from_u32(take_u32(&mut body)?);
        let cipher = take_u16(&mut body)?;
        let key_len = take_u16(&mut body)?;
        let encrypted_key = take_blob(&mut body, MAX_KEY_BLOB)?;

        // Peers that predate IV negotiation stop after the key
        let (iv_len, encrypted_iv) = if body.has_remaining() {
            let iv_len = take_u16(&mut body)?;
            (iv_len, take_blob(&mut body, MAX_KEY_BLOB)?)
        } else {
            (0, Vec::new())
        };

        Ok(SessionKeyResponse {
            id,
            result,
            cipher,
            key_len,
            encrypted_key,
            iv_len,
            encrypted_iv,
        })
    }
}

/// Handshake message, distinguished by command code
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandshakeMessage {
    KeyRequest(KeyRequest),
    SessionKey(SessionKeyResponse),
}

impl HandshakeMessage {
    /// Command code of this message
    pub fn code(&self) -> u16 {
        match self {
            HandshakeMessage::KeyRequest(_) => CMD_REQUEST_SESSION_KEY,
            HandshakeMessage::SessionKey(_) => CMD_SESSION_KEY,
        }
    }

    /// Whether a raw frame is a handshake message
    pub fn is_handshake(frame: &[u8]) -> bool {
        matches!(
            frame_code(frame),
            Some(CMD_REQUEST_SESSION_KEY) | Some(CMD_SESSION_KEY)
        )
    }

    /// Encode into a complete NXCP frame
    pub fn encode(&self) -> NxcpResult<Vec<u8>> {
        let (id, body) = match self {
            HandshakeMessage::KeyRequest(req) => (req.id, req.encode_body()?),
            HandshakeMessage::SessionKey(resp) => (resp.id, resp.encode_body()?),
        };
        Ok(build_binary_message(self.code(), id, MessageFlags::NONE, &body))
    }

    /// Decode a complete NXCP frame
    pub fn decode(frame: &[u8]) -> NxcpResult<Self> {
        let (header, body) = binary_payload(frame)?;
        match header.code {
            CMD_REQUEST_SESSION_KEY => Ok(HandshakeMessage::KeyRequest(KeyRequest::decode_body(
                header.id, body,
            )?)),
            CMD_SESSION_KEY => Ok(HandshakeMessage::SessionKey(
                SessionKeyResponse::decode_body(header.id, body)?,
            )),
            code => Err(NxcpError::UnexpectedMessage(code)),
        }
    }
}

fn put_blob(buf: &mut Vec<u8>, blob: &[u8], max: usize) -> NxcpResult<()> {
    if blob.len() > max {
        return Err(NxcpError::KeyBlobTooLarge(blob.len()));
    }
    buf.put_u32(blob.len() as u32);
    buf.put_slice(blob);
    Ok(())
}

fn take_u16(buf: &mut &[u8]) -> NxcpResult<u16> {
    ensure_remaining(buf, 2)?;
    Ok(buf.get_u16())
}

fn take_u32(buf: &mut &[u8]) -> NxcpResult<u32> {
    ensure_remaining(buf, 4)?;
    Ok(buf.get_u32())
}

fn take_blob(buf: &mut &[u8], max: usize) -> NxcpResult<Vec<u8>> {
    let len = take_u32(buf)? as usize;
    if len > max {
        return Err(NxcpError::KeyBlobTooLarge(len));
    }
    ensure_remaining(buf, len)?;
    let blob = buf[..len].to_vec();
    buf.advance(len);
    Ok(blob)
}

fn ensure_remaining(buf: &&[u8], needed: usize) -> NxcpResult<()> {
    if buf.remaining() < needed {
        return Err(NxcpError::BufferTooShort {
            expected: needed,
            actual: buf.remaining(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MessageHeader, HEADER_SIZE};

    fn sample_response() -> SessionKeyResponse {
        SessionKeyResponse {
            id: 77,
            result: ResultCode::Success,
            cipher: 3,
            key_len: 24,
            encrypted_key: vec![0x11; 128],
            iv_len: 8,
            encrypted_iv: vec![0x22; 128],
        }
    }

    #[test]
    fn test_request_roundtrip() {
        let request = KeyRequest {
            id: 5,
            ciphers: CipherMask::new(0x3F),
            public_key: vec![0x30, 0x82, 0x01, 0x0A, 0x02],
        };
        let frame = HandshakeMessage::KeyRequest(request.clone()).encode().unwrap();

        let header = MessageHeader::parse_frame(&frame).unwrap();
        assert_eq!(header.code, CMD_REQUEST_SESSION_KEY);
        assert_eq!(header.id, 5);
        assert!(header.flags.is_binary());
        assert_eq!(&frame[HEADER_SIZE..HEADER_SIZE + 4], &[0, 0, 0, 0x3F]);

        assert_eq!(HandshakeMessage::decode(&frame).unwrap(), HandshakeMessage::KeyRequest(request));
    }

    #[test]
    fn test_response_layout() {
        let frame = HandshakeMessage::SessionKey(sample_response()).encode().unwrap();
        let body = &frame[HEADER_SIZE..];

        assert_eq!(&body[0..4], &[0, 0, 0, 0]);
        assert_eq!(&body[4..6], &[0, 3]);
        assert_eq!(&body[6..8], &[0, 24]);
        assert_eq!(&body[8..12], &[0, 0, 0, 128]);
        assert_eq!(&body[140..142], &[0, 8]);
    }

    #[test]
    fn test_failure_response() {
        let response = SessionKeyResponse::failure(3, ResultCode::NoCiphers);
        let frame = HandshakeMessage::SessionKey(response.clone()).encode().unwrap();

        match HandshakeMessage::decode(&frame).unwrap() {
            HandshakeMessage::SessionKey(decoded) => {
                assert_eq!(decoded, response);
                assert_eq!(decoded.result, ResultCode::NoCiphers);
            }
            other => panic!("unexpected message {:?}", other),
        }
    }

    #[test]
    fn test_legacy_response_without_iv_length() {
        let mut body = Vec::new();
        body.put_u32(0);
        body.put_u16(0);
        body.put_u16(32);
        body.put_u32(4);
        body.put_slice(&[1, 2, 3, 4]);
        let frame = build_binary_message(CMD_SESSION_KEY, 1, MessageFlags::NONE, &body);

        let HandshakeMessage::SessionKey(response) = HandshakeMessage::decode(&frame).unwrap() else {
            panic!("expected session key response");
        };
        assert_eq!(response.iv_len, 0);
        assert_eq!(response.effective_iv_len(), LEGACY_IV_LEN);
        assert!(response.encrypted_iv.is_empty());
    }

    #[test]
    fn test_oversized_blob_rejected() {
        let mut response = sample_response();
        response.encrypted_key = vec![0; MAX_KEY_BLOB + 1];
        assert_eq!(
            HandshakeMessage::SessionKey(response).encode(),
            Err(NxcpError::KeyBlobTooLarge(MAX_KEY_BLOB + 1))
        );

        let mut body = Vec::new();
        body.put_u32(0);
        body.put_u16(0);
        body.put_u16(32);
        body.put_u32(MAX_KEY_BLOB as u32 + 1);
        let frame = build_binary_message(CMD_SESSION_KEY, 1, MessageFlags::NONE, &body);
        assert!(matches!(
            HandshakeMessage::decode(&frame),
            Err(NxcpError::KeyBlobTooLarge(_))
        ));
    }

    #[test]
    fn test_truncated_body() {
        let frame = HandshakeMessage::SessionKey(sample_response()).encode().unwrap();
        let (header, body) = binary_payload(&frame).unwrap();
        let truncated =
            build_binary_message(header.code, header.id, MessageFlags::NONE, &body[..100]);

        assert!(matches!(
            HandshakeMessage::decode(&truncated),
            Err(NxcpError::BufferTooShort { .. })
        ));
    }

    #[test]
    fn test_other_code_rejected() {
        let frame = build_binary_message(0x0001, 1, MessageFlags::NONE, &[]);
        assert!(!HandshakeMessage::is_handshake(&frame));
        assert_eq!(HandshakeMessage::decode(&frame), Err(NxcpError::UnexpectedMessage(1)));
    }

    proptest::proptest! {
        #[test]
        fn prop_decode_never_panics(data in proptest::collection::vec(proptest::num::u8::ANY, 0..256)) {
            let frame = build_binary_message(CMD_SESSION_KEY, 1, MessageFlags::NONE, &data);
            let _ = HandshakeMessage::decode(&frame);
            let _ = HandshakeMessage::decode(&data);
        }
    }
}
