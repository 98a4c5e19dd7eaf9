//! Session key negotiation
//!
//! The requester advertises its usable ciphers and public key. The responder
//! picks the most preferred common cipher, generates a session key and IV,
//! and returns both encrypted with the requester's public key. Either side
//! may play either role; incoming messages are dispatched on command code.

use std::sync::Arc;

use zeroize::Zeroizing;

use nxcp_core::{CipherSuite, CryptoConfig, NxcpError, NxcpResult, ResultCode};
use nxcp_wire::{HandshakeMessage, KeyRequest, SessionKeyResponse, CMD_SESSION_KEY};

use crate::{CipherRegistry, EncryptionContext, KeyPair};

/// Handshake progress
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HandshakeState {
    Idle,
    /// Request sent, waiting for the response with this id
    AwaitingResponse { request_id: u32 },
    /// Building a response to a peer's request
    Responding,
    Complete,
    Failed,
}

/// Outcome of processing a handshake frame
#[derive(Debug)]
pub enum Negotiation {
    /// Responder side: frame to send back, and the context if negotiation
    /// succeeded
    Reply {
        response: Vec<u8>,
        context: Option<EncryptionContext>,
    },
    /// Requester side: the session is established
    Established(EncryptionContext),
}

/// Handshake state machine for one connection
#[derive(Debug)]
pub struct SessionNegotiator {
    registry: Arc<CipherRegistry>,
    state: HandshakeState,
    use_x509_key_format: bool,
}

impl SessionNegotiator {
    pub fn new(registry: Arc<CipherRegistry>) -> Self {
        SessionNegotiator {
            registry,
            state: HandshakeState::Idle,
            use_x509_key_format: true,
        }
    }

    /// Negotiator using the key format selected by configuration
    pub fn from_config(registry: Arc<CipherRegistry>, config: &CryptoConfig) -> Self {
        Self::new(registry).with_x509_key_format(config.use_x509_key_format)
    }

    /// Choose the public key format sent in requests
    pub fn with_x509_key_format(mut self, enabled: bool) -> Self {
        self.use_x509_key_format = enabled;
        self
    }

    pub fn state(&self) -> HandshakeState {
        self.state
    }

    /// Build a session key request and start waiting for its response
    pub fn build_request(&mut self, id: u32, local_key: &KeyPair) -> NxcpResult<KeyRequest> {
        let request = self.prepare_request(id, local_key)?;
        self.state = HandshakeState::AwaitingResponse { request_id: id };
        Ok(request)
    }

    /// Same as `build_request`, encoded as a frame
    pub fn request_frame(&mut self, id: u32, local_key: &KeyPair) -> NxcpResult<Vec<u8>> {
        let frame = HandshakeMessage::KeyRequest(self.prepare_request(id, local_key)?).encode()?;
        self.state = HandshakeState::AwaitingResponse { request_id: id };
        Ok(frame)
    }

    fn prepare_request(&self, id: u32, local_key: &KeyPair) -> NxcpResult<KeyRequest> {
        if matches!(self.state, HandshakeState::AwaitingResponse { .. }) {
            return Err(NxcpError::HandshakeState("session key request already pending"));
        }

        let ciphers = self.registry.supported();
        if ciphers.is_empty() {
            return Err(NxcpError::NoCiphersAvailable);
        }

        Ok(KeyRequest {
            id,
            ciphers,
            public_key: local_key.public_key_bytes(self.use_x509_key_format)?,
        })
    }

    /// Answer a peer's session key request
    ///
    /// Always yields a well-formed response. The context is returned only
    /// when the response carries a success code.
    pub fn handle_request(
        &mut self,
        request: &KeyRequest,
    ) -> (Option<EncryptionContext>, SessionKeyResponse) {
        self.state = HandshakeState::Responding;

        match self.respond(request) {
            Ok((context, response)) => {
                tracing::debug!(id = request.id, cipher = %context.suite(), "Session key sent");
                self.state = HandshakeState::Complete;
                (Some(context), response)
            }
            Err(e) => {
                tracing::debug!(id = request.id, error = %e, "Session key request rejected");
                self.state = HandshakeState::Failed;
                (None, SessionKeyResponse::failure(request.id, ResultCode::for_error(&e)))
            }
        }
    }

    fn respond(&self, request: &KeyRequest) -> NxcpResult<(EncryptionContext, SessionKeyResponse)> {
        let local = self.registry.supported();
        if local.is_empty() {
            return Err(NxcpError::EncryptionUnavailable);
        }

        let suite = request
            .ciphers
            .intersect(local)
            .preferred()
            .ok_or(NxcpError::NoCiphersAvailable)?;

        let peer_key = KeyPair::public_from_bytes(&request.public_key)?;
        let context = EncryptionContext::generate(suite, self.registry.provider())?;

        let wire_iv = context.wire_iv();
        let encrypted_key = peer_key
            .encrypt(context.session_key())
            .map_err(|_| NxcpError::InvalidPublicKey)?;
        let encrypted_iv = peer_key
            .encrypt(&wire_iv)
            .map_err(|_| NxcpError::InvalidPublicKey)?;

        let response = SessionKeyResponse {
            id: request.id,
            result: ResultCode::Success,
            cipher: suite.id(),
            key_len: suite.key_len() as u16,
            encrypted_key,
            iv_len: wire_iv.len() as u16,
            encrypted_iv,
        };
        Ok((context, response))
    }

    /// Accept the response to our request
    pub fn handle_response(
        &mut self,
        response: &SessionKeyResponse,
        local_key: &KeyPair,
    ) -> NxcpResult<EncryptionContext> {
        match self.state {
            HandshakeState::AwaitingResponse { request_id } if request_id == response.id => {}
            _ => return Err(NxcpError::UnexpectedMessage(CMD_SESSION_KEY)),
        }

        match self.accept(response, local_key) {
            Ok(context) => {
                tracing::debug!(id = response.id, cipher = %context.suite(), "Session established");
                self.state = HandshakeState::Complete;
                Ok(context)
            }
            Err(e) => {
                tracing::debug!(id = response.id, error = %e, "Session key response rejected");
                self.state = HandshakeState::Failed;
                Err(e)
            }
        }
    }

    fn accept(
        &self,
        response: &SessionKeyResponse,
        local_key: &KeyPair,
    ) -> NxcpResult<EncryptionContext> {
        if let Some(err) = response.result.into_error() {
            return Err(err);
        }

        let suite = CipherSuite::from_id(response.cipher)
            .filter(|s| self.registry.is_supported(*s))
            .ok_or(NxcpError::UnsupportedCipher(response.cipher))?;

        let key = local_key.decrypt(&response.encrypted_key)?;
        if key.len() != response.key_len as usize || key.len() != suite.key_len() {
            return Err(NxcpError::SessionKeyMismatch);
        }

        if response.encrypted_iv.is_empty() {
            return Err(NxcpError::InvalidSessionKey);
        }
        let wire_iv = local_key.decrypt(&response.encrypted_iv)?;
        let iv_len = response.effective_iv_len() as usize;
        if wire_iv.len() != iv_len || iv_len < suite.iv_len() {
            return Err(NxcpError::InvalidSessionKey);
        }
        let iv = Zeroizing::new(wire_iv[..suite.iv_len()].to_vec());

        EncryptionContext::from_parts(suite, key, iv, self.registry.provider())
    }

    /// Decode a handshake frame and act on it
    ///
    /// `local_key` is needed only to accept a session key response.
    pub fn process(&mut self, frame: &[u8], local_key: Option<&KeyPair>) -> NxcpResult<Negotiation> {
        match HandshakeMessage::decode(frame)? {
            HandshakeMessage::KeyRequest(request) => {
                let (context, response) = self.handle_request(&request);
                let response = HandshakeMessage::SessionKey(response).encode()?;
                Ok(Negotiation::Reply { response, context })
            }
            HandshakeMessage::SessionKey(response) => {
                let local_key =
                    local_key.ok_or(NxcpError::HandshakeState("no local key to accept session key"))?;
                self.handle_response(&response, local_key)
                    .map(Negotiation::Established)
            }
        }
    }
}
