//! Register decoder for SPU values.
//!
//! Pure conversions from raw register words to engineering values; no I/O and
//! no state. The word order is pinned here in one place because historical
//! integrations disagreed about it (word-swap only vs. full byte reorder) and
//! the discrepancy is invisible until a real value is misread.

use crate::bytes::{f32_to_regs, regs_to_f32, ByteOrder};

/// Word order used by the SPU for float32 values.
///
/// The register at the lower address carries the low-order 16 bits of the
/// float; bytes within each register are big-endian on the wire (CDAB).
/// Verified against device captures: registers `[0x0000, 0x3F80]` decode
/// to `1.0`.
pub const SPU_WORD_ORDER: ByteOrder = ByteOrder::BigEndianSwap;

/// Decode a float32 from its two registers, given in address order.
#[inline]
pub fn decode_float32(regs: [u16; 2]) -> f32 {
    regs_to_f32(&regs, SPU_WORD_ORDER)
}

/// Decode a status register: the flag is set when the word is non-zero.
#[inline]
pub fn decode_bool(word: u16) -> bool {
    word != 0
}

/// Encode a float32 into its two registers, in address order.
///
/// Exact inverse of [`decode_float32`]; used by tests and device simulators.
#[inline]
pub fn encode_float32(value: f32) -> [u16; 2] {
    f32_to_regs(value, SPU_WORD_ORDER)
}
