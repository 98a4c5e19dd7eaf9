//! Message flags for NXCP wire protocol

/// Message flags (2 bytes)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MessageFlags(pub u16);

impl MessageFlags {
    pub const NONE: MessageFlags = MessageFlags(0);

    // Flag bits
    pub const BINARY: u16 = 0x0001;
    pub const END_OF_FILE: u16 = 0x0002;
    pub const DONT_ENCRYPT: u16 = 0x0004;
    pub const END_OF_SEQUENCE: u16 = 0x0008;
    pub const REVERSE_ORDER: u16 = 0x0010;
    pub const CONTROL: u16 = 0x0020;

    #[inline]
    pub fn new(bits: u16) -> Self {
        MessageFlags(bits)
    }

    #[inline]
    pub fn is_binary(self) -> bool {
        self.0 & Self::BINARY != 0
    }

    #[inline]
    pub fn is_end_of_file(self) -> bool {
        self.0 & Self::END_OF_FILE != 0
    }

    /// Message must travel in clear even on an encrypted connection
    #[inline]
    pub fn is_dont_encrypt(self) -> bool {
        self.0 & Self::DONT_ENCRYPT != 0
    }

    #[inline]
    pub fn is_control(self) -> bool {
        self.0 & Self::CONTROL != 0
    }

    #[inline]
    pub fn set_binary(&mut self, value: bool) {
        self.set(Self::BINARY, value);
    }

    #[inline]
    pub fn set_dont_encrypt(&mut self, value: bool) {
        self.set(Self::DONT_ENCRYPT, value);
    }

    #[inline]
    pub fn set_control(&mut self, value: bool) {
        self.set(Self::CONTROL, value);
    }

    #[inline]
    fn set(&mut self, bit: u16, value: bool) {
        if value {
            self.0 |= bit;
        } else {
            self.0 &= !bit;
        }
    }
}

impl From<u16> for MessageFlags {
    fn from(bits: u16) -> Self {
        MessageFlags(bits)
    }
}

impl From<MessageFlags> for u16 {
    fn from(flags: MessageFlags) -> Self {
        flags.0
    }
}
