//! The link's 16-bit CRC.
//!
//! This is a table-free byte-wise variant, not textbook CRC-CCITT. The
//! register is seeded with `0x1021`; counterpart implementations seed with
//! the same value, so it must not be changed.

/// Value the register holds after a reset.
pub const CRC_RESET: u16 = 0x1021;

/// Fold one byte into a register value.
pub const fn update(register: u16, byte: u8) -> u16 {
    let msb = (register >> 8) as u8;
    let lsb = (register & 0xFF) as u8;

    let mut c = byte ^ msb;
    c ^= c >> 4;
    let new_msb = lsb ^ (c >> 3) ^ (c << 4);
    let new_lsb = c ^ (c << 5);

    ((new_msb as u16) << 8) | new_lsb as u16
}

/// CRC of a complete byte run, starting from [`CRC_RESET`].
pub fn checksum(bytes: &[u8]) -> u16 {
    let mut crc = Crc16::new();
    crc.update_slice(bytes);
    crc.value()
}

/// Running CRC accumulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Crc16 {
    register: u16,
}

impl Crc16 {
    pub const fn new() -> Self {
        Self {
            register: CRC_RESET,
        }
    }

    pub fn reset(&mut self) {
        self.register = CRC_RESET;
    }

    pub fn update(&mut self, byte: u8) {
        self.register = update(self.register, byte);
    }

    pub fn update_slice(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.update(byte);
        }
    }

    /// Current register value.
    pub const fn value(&self) -> u16 {
        self.register
    }
}

impl Default for Crc16 {
    fn default() -> Self {
        Self::new()
    }
}
