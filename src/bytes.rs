//! Byte/word order handling for multi-register values.
//!
//! A 32-bit value occupies two consecutive 16-bit registers. Each register is
//! big-endian on the wire per the Modbus specification, but devices disagree
//! about which register carries the high-order word, so both the straight and
//! the word-swapped layouts exist in the field.
//!
//! Uses ABCD notation where A is the most significant byte and D the least
//! significant. For the 32-bit value `0x12345678`:
//!
//! - `BigEndian (ABCD)`: registers `[0x1234, 0x5678]`
//! - `LittleEndian (DCBA)`: registers `[0x7856, 0x3412]`
//! - `BigEndianSwap (CDAB)`: registers `[0x5678, 0x1234]`
//! - `LittleEndianSwap (BADC)`: registers `[0x3412, 0x7856]`

use std::fmt;

/// Byte/word order of a 32-bit value spread across two registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ByteOrder {
    /// ABCD: most significant word in the first register.
    BigEndian,
    /// DCBA: fully reversed byte order.
    LittleEndian,
    /// CDAB: big-endian bytes within each register, words swapped.
    BigEndianSwap,
    /// BADC: little-endian bytes within each register, words in order.
    LittleEndianSwap,
}

impl ByteOrder {
    /// Get descriptive name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BigEndian => "ABCD (Big-Endian)",
            Self::LittleEndian => "DCBA (Little-Endian)",
            Self::BigEndianSwap => "CDAB (Big-Endian Swap)",
            Self::LittleEndianSwap => "BADC (Little-Endian Swap)",
        }
    }

    /// Check if the 16-bit words are swapped relative to big-endian order.
    #[inline]
    pub fn has_word_swap(&self) -> bool {
        matches!(self, Self::BigEndianSwap | Self::LittleEndianSwap)
    }
}

impl fmt::Display for ByteOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Default for ByteOrder {
    /// Default to big-endian (network byte order).
    fn default() -> Self {
        Self::BigEndian
    }
}

/// Convert 2 u16 registers (in address order) to 4 bytes in ABCD order.
#[inline]
pub fn regs_to_bytes_4(regs: &[u16; 2], order: ByteOrder) -> [u8; 4] {
    let [h0, h1] = [regs[0].to_be_bytes(), regs[1].to_be_bytes()];

    match order {
        ByteOrder::BigEndian => [h0[0], h0[1], h1[0], h1[1]],        // ABCD
        ByteOrder::LittleEndian => [h1[1], h1[0], h0[1], h0[0]],     // DCBA
        ByteOrder::BigEndianSwap => [h1[0], h1[1], h0[0], h0[1]],    // CDAB
        ByteOrder::LittleEndianSwap => [h0[1], h0[0], h1[1], h1[0]], // BADC
    }
}

/// Convert 4 bytes (ABCD order) to 2 u16 registers in address order.
#[inline]
pub fn bytes_4_to_regs(bytes: &[u8; 4], order: ByteOrder) -> [u16; 2] {
    match order {
        ByteOrder::BigEndian => [
            u16::from_be_bytes([bytes[0], bytes[1]]),
            u16::from_be_bytes([bytes[2], bytes[3]]),
        ],
        ByteOrder::LittleEndian => [
            u16::from_be_bytes([bytes[3], bytes[2]]),
            u16::from_be_bytes([bytes[1], bytes[0]]),
        ],
        ByteOrder::BigEndianSwap => [
            u16::from_be_bytes([bytes[2], bytes[3]]),
            u16::from_be_bytes([bytes[0], bytes[1]]),
        ],
        ByteOrder::LittleEndianSwap => [
            u16::from_be_bytes([bytes[1], bytes[0]]),
            u16::from_be_bytes([bytes[3], bytes[2]]),
        ],
    }
}

/// Convert 2 u16 registers to f32.
#[inline]
pub fn regs_to_f32(regs: &[u16; 2], order: ByteOrder) -> f32 {
    f32::from_be_bytes(regs_to_bytes_4(regs, order))
}

/// Convert f32 to 2 u16 registers.
#[inline]
pub fn f32_to_regs(value: f32, order: ByteOrder) -> [u16; 2] {
    bytes_4_to_regs(&value.to_be_bytes(), order)
}
