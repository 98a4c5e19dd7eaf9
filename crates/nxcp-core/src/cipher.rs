//! Symmetric cipher suites and capability masks
//!
//! Cipher ids and mask bits are fixed by the wire protocol:
//! - Id 0 / bit 0x01: AES-256
//! - Id 1 / bit 0x02: Blowfish-256
//! - Id 2 / bit 0x04: IDEA
//! - Id 3 / bit 0x08: 3DES
//! - Id 4 / bit 0x10: AES-128
//! - Id 5 / bit 0x20: Blowfish-128

use std::fmt;

/// Largest session key used by any suite
pub const MAX_SESSION_KEY_LEN: usize = 32;

/// Largest IV used by any suite (and the legacy default IV length)
pub const MAX_IV_LEN: usize = 16;

/// Symmetric cipher negotiated for a session
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u16)]
pub enum CipherSuite {
    Aes256 = 0,
    Blowfish256 = 1,
    Idea = 2,
    TripleDes = 3,
    Aes128 = 4,
    Blowfish128 = 5,
}

impl CipherSuite {
    /// All suites in preference order
    pub const ALL: [CipherSuite; 6] = [
        CipherSuite::Aes256,
        CipherSuite::Blowfish256,
        CipherSuite::Idea,
        CipherSuite::TripleDes,
        CipherSuite::Aes128,
        CipherSuite::Blowfish128,
    ];

    /// Parse from wire id
    pub fn from_id(id: u16) -> Option<Self> {
        match id {
            0 => Some(CipherSuite::Aes256),
            1 => Some(CipherSuite::Blowfish256),
            2 => Some(CipherSuite::Idea),
            3 => Some(CipherSuite::TripleDes),
            4 => Some(CipherSuite::Aes128),
            5 => Some(CipherSuite::Blowfish128),
            _ => None,
        }
    }

    /// Convert to wire id
    #[inline]
    pub fn id(self) -> u16 {
        self as u16
    }

    /// Capability bit for this suite
    #[inline]
    pub fn bit(self) -> u32 {
        1 << (self as u32)
    }

    /// Session key length in bytes
    pub fn key_len(self) -> usize {
        match self {
            CipherSuite::Aes256 => 32,
            CipherSuite::Blowfish256 => 32,
            CipherSuite::Idea => 16,
            CipherSuite::TripleDes => 24,
            CipherSuite::Aes128 => 16,
            CipherSuite::Blowfish128 => 16,
        }
    }

    /// Cipher block size in bytes
    pub fn block_size(self) -> usize {
        match self {
            CipherSuite::Aes256 | CipherSuite::Aes128 => 16,
            CipherSuite::Blowfish256
            | CipherSuite::Blowfish128
            | CipherSuite::Idea
            | CipherSuite::TripleDes => 8,
        }
    }

    /// IV length in bytes (one block in CBC mode)
    #[inline]
    pub fn iv_len(self) -> usize {
        self.block_size()
    }

    /// Display name used in logs and capability listings
    pub fn name(self) -> &'static str {
        match self {
            CipherSuite::Aes256 => "AES-256",
            CipherSuite::Blowfish256 => "BLOWFISH-256",
            CipherSuite::Idea => "IDEA",
            CipherSuite::TripleDes => "3DES",
            CipherSuite::Aes128 => "AES-128",
            CipherSuite::Blowfish128 => "BLOWFISH-128",
        }
    }
}

impl fmt::Display for CipherSuite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Capability mask, one bit per cipher suite
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CipherMask(pub u32);

impl CipherMask {
    pub const NONE: CipherMask = CipherMask(0);

    /// Every bit that maps to a known suite
    pub const ALL: CipherMask = CipherMask(0x3F);

    #[inline]
    pub fn new(bits: u32) -> Self {
        CipherMask(bits)
    }

    #[inline]
    pub fn bits(self) -> u32 {
        self.0
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 & Self::ALL.0 == 0
    }

    #[inline]
    pub fn contains(self, suite: CipherSuite) -> bool {
        self.0 & suite.bit() != 0
    }

    #[inline]
    pub fn insert(&mut self, suite: CipherSuite) {
        self.0 |= suite.bit();
    }

    #[inline]
    pub fn remove(&mut self, suite: CipherSuite) {
        self.0 &= !suite.bit();
    }

    #[inline]
    pub fn intersect(self, other: CipherMask) -> CipherMask {
        CipherMask(self.0 & other.0)
    }

    /// Suites present in the mask, in preference order
    pub fn suites(self) -> impl Iterator<Item = CipherSuite> {
        CipherSuite::ALL.into_iter().filter(move |s| self.contains(*s))
    }

    /// Most preferred suite present in the mask
    pub fn preferred(self) -> Option<CipherSuite> {
        self.suites().next()
    }

    /// Comma-separated suite names
    pub fn names(self) -> String {
        self.suites().map(CipherSuite::name).collect::<Vec<_>>().join(", ")
    }
}

impl From<u32> for CipherMask {
    fn from(bits: u32) -> Self {
        CipherMask(bits)
    }
}

impl From<CipherMask> for u32 {
    fn from(mask: CipherMask) -> Self {
        mask.0
    }
}

impl FromIterator<CipherSuite> for CipherMask {
    fn from_iter<I: IntoIterator<Item = CipherSuite>>(iter: I) -> Self {
        let mut mask = CipherMask::NONE;
        for suite in iter {
            mask.insert(suite);
        }
        mask
    }
}

impl fmt::Debug for CipherMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CipherMask({:#04x})", self.0)
    }
}
