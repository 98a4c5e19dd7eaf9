//! End-to-end Integration Test Suite
//!
//! Runs the complete secure channel flow between two endpoints:
//! - Session key handshake driven by wire frames
//! - Bidirectional encrypted data exchange over a tampering link
//! - Unencrypted keepalives on the established channel

use std::collections::HashSet;
use std::sync::Arc;

use nxcp_core::{CipherSuite, CryptoConfig, NxcpError, NxcpResult, ProviderKind};
use nxcp_crypto::{CipherRegistry, EncryptionContext, KeyPair, Negotiation, SessionNegotiator};
use nxcp_wire::{binary_payload, is_encrypted_frame};

use crate::fixtures::{client_key, data_frame, keepalive_frame, server_key, DATA_CODE};
use crate::link::{LinkConfig, TamperingLink};

// ============================================================================
// SECURE ENDPOINT
// ============================================================================

/// One side of a connection
pub struct SecureEndpoint {
    pub name: &'static str,
    key: KeyPair,
    negotiator: SessionNegotiator,
    context: Option<EncryptionContext>,
    next_id: u32,
    keepalives: usize,
}

impl SecureEndpoint {
    pub fn new(name: &'static str, key: KeyPair, registry: Arc<CipherRegistry>) -> Self {
        Self {
            name,
            key,
            negotiator: SessionNegotiator::new(registry),
            context: None,
            next_id: 1,
            keepalives: 0,
        }
    }

    /// Choose the public key format sent in requests
    pub fn with_x509_key_format(mut self, enabled: bool) -> Self {
        self.negotiator = self.negotiator.with_x509_key_format(enabled);
        self
    }

    fn next_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        id
    }

    /// Start a handshake; returns the request frame
    pub fn connect(&mut self) -> NxcpResult<Vec<u8>> {
        let id = self.next_id();
        self.negotiator.request_frame(id, &self.key)
    }

    /// Handle a handshake frame; returns a reply frame if one is due
    pub fn handle_handshake(&mut self, frame: &[u8]) -> NxcpResult<Option<Vec<u8>>> {
        match self.negotiator.process(frame, Some(&self.key))? {
            Negotiation::Reply { response, context } => {
                self.context = context;
                Ok(Some(response))
            }
            Negotiation::Established(context) => {
                self.context = Some(context);
                Ok(None)
            }
        }
    }

    pub fn is_established(&self) -> bool {
        self.context.is_some()
    }

    pub fn context(&self) -> Option<&EncryptionContext> {
        self.context.as_ref()
    }

    /// Encrypt a data frame carrying `payload`
    pub fn send(&mut self, payload: &[u8]) -> NxcpResult<Vec<u8>> {
        let frame = data_frame(self.next_id(), payload);
        self.context
            .as_ref()
            .ok_or(NxcpError::EncryptionUnavailable)?
            .encrypt_frame(&frame)
    }

    /// Keepalive frame, passed through the context unencrypted
    pub fn send_keepalive(&mut self) -> NxcpResult<Vec<u8>> {
        let frame = keepalive_frame(self.next_id());
        self.context
            .as_ref()
            .ok_or(NxcpError::EncryptionUnavailable)?
            .encrypt_frame(&frame)
    }

    /// Receive a frame; returns the payload of data frames
    pub fn receive(&mut self, mut frame: Vec<u8>) -> NxcpResult<Option<Vec<u8>>> {
        if is_encrypted_frame(&frame) {
            self.context
                .as_ref()
                .ok_or(NxcpError::EncryptionUnavailable)?
                .decrypt_in_place(&mut frame)?;
        }

        let (header, payload) = binary_payload(&frame)?;
        if header.code == DATA_CODE {
            Ok(Some(payload.to_vec()))
        } else {
            self.keepalives += 1;
            Ok(None)
        }
    }

    pub fn keepalives_received(&self) -> usize {
        self.keepalives
    }
}

// ============================================================================
// INTEGRATION TEST HARNESS
// ============================================================================

/// Configuration for integration tests
#[derive(Debug, Clone)]
pub struct IntegrationTestConfig {
    /// Ciphers enabled on the client
    pub client_ciphers: u32,

    /// Ciphers enabled on the server
    pub server_ciphers: u32,

    /// Server cipher provider
    pub server_provider: ProviderKind,

    /// Send X.509 public keys instead of PKCS#1
    pub use_x509_key_format: bool,

    /// Number of data frames to exchange
    pub message_count: usize,

    /// Send a keepalive every this many data frames
    pub keepalive_interval: usize,

    /// Link damage applied to data frames
    pub link: LinkConfig,

    /// Link RNG seed
    pub seed: u64,
}

impl Default for IntegrationTestConfig {
    fn default() -> Self {
        Self {
            client_ciphers: 0xFFFF,
            server_ciphers: 0xFFFF,
            server_provider: ProviderKind::Native,
            use_x509_key_format: true,
            message_count: 40,
            keepalive_interval: 10,
            link: LinkConfig::clean(),
            seed: 0x4E58_4350,
        }
    }
}

impl IntegrationTestConfig {
    /// Minimal test configuration
    pub fn minimal() -> Self {
        Self {
            message_count: 4,
            keepalive_interval: 2,
            ..Self::default()
        }
    }

    /// Standard test configuration
    pub fn standard() -> Self {
        Self::default()
    }

    /// Many frames over a hostile link
    pub fn hostile() -> Self {
        Self {
            message_count: 300,
            link: LinkConfig::hostile(),
            ..Self::default()
        }
    }

    /// Restrict cipher masks
    pub fn with_ciphers(mut self, client: u32, server: u32) -> Self {
        self.client_ciphers = client;
        self.server_ciphers = server;
        self
    }

    /// With link damage
    pub fn with_link(mut self, link: LinkConfig) -> Self {
        self.link = link;
        self
    }
}

/// Result of an integration test
#[derive(Debug, Clone, Default)]
pub struct IntegrationTestResult {
    /// Negotiated cipher, if the handshake succeeded
    pub suite: Option<CipherSuite>,

    /// Handshake failure
    pub handshake_error: Option<NxcpError>,

    /// Both sides hold the same key and IV
    pub keys_match: bool,

    /// Data frames sent in both directions
    pub frames_sent: usize,

    /// Frames decrypted and accepted
    pub frames_accepted: usize,

    /// Frames rejected by the receiver
    pub frames_rejected: usize,

    /// Damaged frames that were accepted
    pub damaged_accepted: usize,

    /// Intact frames that were rejected
    pub intact_rejected: usize,

    /// Accepted payloads that were never sent
    pub unknown_payloads: usize,

    /// Keepalives received by both sides
    pub keepalives_received: usize,
}

impl IntegrationTestResult {
    /// Check if the test passed
    pub fn passed(&self) -> bool {
        self.suite.is_some()
            && self.keys_match
            && self.damaged_accepted == 0
            && self.intact_rejected == 0
            && self.unknown_payloads == 0
    }
}

/// Integration test harness
pub struct IntegrationTestHarness {
    config: IntegrationTestConfig,
    client: SecureEndpoint,
    server: SecureEndpoint,
    to_server: TamperingLink,
    to_client: TamperingLink,
    sent_payloads: HashSet<Vec<u8>>,
}

impl IntegrationTestHarness {
    /// Create a new test harness
    pub fn new(config: IntegrationTestConfig) -> NxcpResult<Self> {
        let client_registry = CipherRegistry::from_config(&CryptoConfig {
            enabled_ciphers: config.client_ciphers,
            ..Default::default()
        })?;
        let server_registry = CipherRegistry::from_config(&CryptoConfig {
            enabled_ciphers: config.server_ciphers,
            provider: config.server_provider,
            allow_unencrypted: config.server_provider == ProviderKind::Null,
            ..Default::default()
        })?;

        let client = SecureEndpoint::new("client", client_key().clone(), Arc::new(client_registry))
            .with_x509_key_format(config.use_x509_key_format);
        let server = SecureEndpoint::new("server", server_key().clone(), Arc::new(server_registry));

        Ok(Self {
            to_server: TamperingLink::new(config.link.clone(), config.seed),
            to_client: TamperingLink::new(config.link.clone(), config.seed.rotate_left(17)),
            config,
            client,
            server,
            sent_payloads: HashSet::new(),
        })
    }

    /// Run the integration test
    pub fn run(&mut self) -> IntegrationTestResult {
        let mut result = IntegrationTestResult::default();

        if let Err(e) = self.handshake() {
            result.handshake_error = Some(e);
            return result;
        }

        result.suite = self.client.context().map(|c| c.suite());
        result.keys_match = match (self.client.context(), self.server.context()) {
            (Some(c), Some(s)) => c.session_key() == s.session_key() && c.iv() == s.iv(),
            _ => false,
        };

        if let Err(e) = self.exchange(&mut result) {
            result.handshake_error = Some(e);
            return result;
        }

        self.deliver(&mut result);
        result.keepalives_received =
            self.client.keepalives_received() + self.server.keepalives_received();
        result
    }

    /// Handshake over a clean path
    fn handshake(&mut self) -> NxcpResult<()> {
        let request = self.client.connect()?;
        let response = self
            .server
            .handle_handshake(&request)?
            .ok_or(NxcpError::HandshakeState("server sent no response"))?;

        if !self.server.is_established() {
            // The client reports the failure code carried in the response
            self.client.handle_handshake(&response)?;
            return Err(NxcpError::HandshakeState("server did not establish a session"));
        }

        self.client.handle_handshake(&response)?;
        Ok(())
    }

    /// Send data frames in alternating directions
    fn exchange(&mut self, result: &mut IntegrationTestResult) -> NxcpResult<()> {
        for i in 0..self.config.message_count {
            let payload: Vec<u8> = format!("frame {} ", i)
                .into_bytes()
                .into_iter()
                .cycle()
                .take(i % 61)
                .collect();

            if i % 2 == 0 {
                let frame = self.client.send(&payload)?;
                self.to_server.send(frame);
            } else {
                let frame = self.server.send(&payload)?;
                self.to_client.send(frame);
            }
            self.sent_payloads.insert(payload);
            result.frames_sent += 1;

            if self.config.keepalive_interval > 0 && i % self.config.keepalive_interval == 0 {
                let keepalive = self.client.send_keepalive()?;
                self.server.receive(keepalive)?;
                let keepalive = self.server.send_keepalive()?;
                self.client.receive(keepalive)?;
            }
        }
        Ok(())
    }

    /// Deliver everything in flight and check what the receivers accept
    fn deliver(&mut self, result: &mut IntegrationTestResult) {
        let inbound = [
            (self.to_server.drain(), &mut self.server),
            (self.to_client.drain(), &mut self.client),
        ];

        for (frames, endpoint) in inbound {
            for frame in frames {
                match endpoint.receive(frame.data) {
                    Ok(payload) => {
                        result.frames_accepted += 1;
                        if frame.damaged {
                            result.damaged_accepted += 1;
                        }
                        if !payload.map_or(false, |p| self.sent_payloads.contains(&p)) {
                            result.unknown_payloads += 1;
                        }
                    }
                    Err(e) => {
                        result.frames_rejected += 1;
                        if !frame.damaged {
                            tracing::warn!(endpoint = endpoint.name, error = %e, "Intact frame rejected");
                            result.intact_rejected += 1;
                        }
                    }
                }
            }
        }
    }

    pub fn client(&self) -> &SecureEndpoint {
        &self.client
    }

    pub fn server(&self) -> &SecureEndpoint {
        &self.server
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::init_tracing;

    fn run(config: IntegrationTestConfig) -> IntegrationTestResult {
        init_tracing();
        IntegrationTestHarness::new(config).unwrap().run()
    }

    #[test]
    fn test_minimal_exchange() {
        let result = run(IntegrationTestConfig::minimal());

        assert!(result.passed(), "{:?}", result);
        assert_eq!(result.suite, Some(CipherSuite::Aes256));
        assert_eq!(result.frames_accepted, 4);
        assert_eq!(result.frames_rejected, 0);
        assert_eq!(result.keepalives_received, 4);
    }

    #[test]
    fn test_standard_exchange() {
        let result = run(IntegrationTestConfig::standard());

        assert!(result.passed(), "{:?}", result);
        assert_eq!(result.frames_accepted, result.frames_sent);
    }

    #[test]
    fn test_hostile_link() {
        let result = run(IntegrationTestConfig::hostile());

        assert!(result.passed(), "{:?}", result);
        assert!(result.frames_rejected > 0);
        assert!(result.frames_accepted > 0);
    }

    #[test]
    fn test_every_suite() {
        for suite in CipherSuite::ALL {
            let config = IntegrationTestConfig::minimal().with_ciphers(suite.bit(), 0xFFFF);
            let result = run(config);

            assert!(result.passed(), "{}: {:?}", suite, result);
            assert_eq!(result.suite, Some(suite));
        }
    }

    #[test]
    fn test_common_cipher_selected() {
        let config = IntegrationTestConfig::minimal().with_ciphers(0b001001, 0b001100);
        let result = run(config);

        assert_eq!(result.suite, Some(CipherSuite::TripleDes));
        assert!(result.passed());
    }

    #[test]
    fn test_disjoint_ciphers() {
        let config = IntegrationTestConfig::minimal().with_ciphers(0b000001, 0b001100);
        let result = run(config);

        assert!(!result.passed());
        assert_eq!(result.handshake_error, Some(NxcpError::NoCiphersAvailable));
    }

    #[test]
    fn test_server_without_encryption() {
        let config = IntegrationTestConfig {
            server_provider: ProviderKind::Null,
            ..IntegrationTestConfig::minimal()
        };
        let result = run(config);

        assert_eq!(result.handshake_error, Some(NxcpError::EncryptionUnavailable));
    }

    #[test]
    fn test_pkcs1_public_key() {
        let config = IntegrationTestConfig {
            use_x509_key_format: false,
            ..IntegrationTestConfig::minimal()
        };
        let result = run(config);

        assert!(result.passed(), "{:?}", result);
    }

    #[test]
    fn test_send_before_handshake() {
        let harness = IntegrationTestHarness::new(IntegrationTestConfig::minimal()).unwrap();
        assert!(!harness.client().is_established());

        let mut client = SecureEndpoint::new("client", client_key().clone(), crate::registry(0x3F));
        assert_eq!(client.send(b"early").unwrap_err(), NxcpError::EncryptionUnavailable);
    }
}
