//! NXCP Wire Protocol - Binary layouts touched by the secure channel
//!
//! This crate implements:
//! - Message header (16 bytes) and message flags
//! - Encrypted message envelope (8 cleartext bytes + ciphertext)
//! - Session key request/response bodies

pub mod envelope;
pub mod flags;
pub mod handshake;
pub mod header;

pub use envelope::*;
pub use flags::*;
pub use handshake::*;
pub use header::*;
