//! Endianness codec between the controller's big-endian wire fields and host
//! integers.
//!
//! Every multi-byte protocol field is big-endian. The helpers here are the
//! only place the crate converts; command code never shifts bytes by hand.

/// Host `u32` → big-endian wire bytes.
#[inline]
pub const fn to_wire_u32(value: u32) -> [u8; 4] {
    value.to_be_bytes()
}

/// Big-endian wire bytes → host `u32`.
#[inline]
pub const fn from_wire_u32(bytes: [u8; 4]) -> u32 {
    u32::from_be_bytes(bytes)
}

/// Host `u16` → big-endian wire bytes.
#[inline]
pub const fn to_wire_u16(value: u16) -> [u8; 2] {
    value.to_be_bytes()
}

/// Big-endian wire bytes → host `u16`.
#[inline]
pub const fn from_wire_u16(bytes: [u8; 2]) -> u16 {
    u16::from_be_bytes(bytes)
}

/// Reverse the byte order of a 32-bit value.
#[inline]
pub const fn swap_u32(value: u32) -> u32 {
    value.swap_bytes()
}

/// Reverse the byte order of a 16-bit value.
#[inline]
pub const fn swap_u16(value: u16) -> u16 {
    value.swap_bytes()
}

/// Decode the `index`-th big-endian `u32` of `bytes`.
///
/// Returns `None` when the slice is too short.
pub fn read_be_u32(bytes: &[u8], index: usize) -> Option<u32> {
    let start = index.checked_mul(4)?;
    let end = start.checked_add(4)?;
    let field: [u8; 4] = bytes.get(start..end)?.try_into().ok()?;
    Some(from_wire_u32(field))
}

/// Encode `values` as consecutive big-endian `u32`s into `out`.
///
/// Stops at whichever runs out first; trailing bytes of `out` are left
/// untouched.
pub fn write_be_u32s(out: &mut [u8], values: &[u32]) {
    for (chunk, value) in out.chunks_exact_mut(4).zip(values) {
        chunk.copy_from_slice(&to_wire_u32(*value));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::arithmetic_side_effects,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;

    #[test]
    fn wire_order_is_most_significant_first() {
        assert_eq!(to_wire_u32(0x1234_5678), [0x12, 0x34, 0x56, 0x78]);
        assert_eq!(to_wire_u16(0xABCD), [0xAB, 0xCD]);
    }

    /// Wire decode equals a byte swap of the little-endian view.
    #[test]
    fn decode_equals_swap_of_native_view() {
        let raw = [0x00, 0x00, 0x05, 0xA0];
        assert_eq!(from_wire_u32(raw), swap_u32(u32::from_le_bytes(raw)));
        assert_eq!(from_wire_u32(raw), 1440);
    }

    #[test]
    fn read_be_u32_indexes_by_field() {
        let bytes = [0, 0, 0, 1, 0, 0, 2, 0];
        assert_eq!(read_be_u32(&bytes, 0), Some(1));
        assert_eq!(read_be_u32(&bytes, 1), Some(512));
        assert_eq!(read_be_u32(&bytes, 2), None);
    }

    #[test]
    fn write_be_u32s_fills_consecutive_fields() {
        let mut out = [0u8; 8];
        write_be_u32s(&mut out, &[0xDEAD_BEEF, 7]);
        assert_eq!(out, [0xDE, 0xAD, 0xBE, 0xEF, 0, 0, 0, 7]);
    }
}
