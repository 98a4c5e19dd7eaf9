//! NXCP Core - Fundamental types for the secure channel
//!
//! This crate defines the types shared by the wire and crypto layers:
//! - Cipher suites and capability masks
//! - Request completion codes carried in handshake responses
//! - Error taxonomy
//! - Crypto configuration

pub mod cipher;
pub mod config;
pub mod error;
pub mod rcc;

pub use cipher::*;
pub use config::*;
pub use error::*;
pub use rcc::*;
