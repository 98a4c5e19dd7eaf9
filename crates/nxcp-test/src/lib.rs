//! NXCP Test Harness - Secure channel validation
//!
//! This crate provides:
//! - Shared key and frame fixtures
//! - A tampering link that corrupts, truncates, duplicates and reorders frames
//! - End-to-end handshake and data exchange testing

pub mod fixtures;
pub mod integration;
pub mod link;

pub use fixtures::*;
pub use integration::*;
pub use link::*;
