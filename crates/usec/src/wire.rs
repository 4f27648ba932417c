//! Fixed-layout records exchanged in the data phase.
//!
//! All multi-byte integers are big-endian on the wire and host-order in the
//! structs below; conversion happens only in `encode`/`decode`.

use crate::cdb::TemperatureOption;
use crate::endian::{read_be_u32, to_wire_u32, write_be_u32s};

// ---------------------------------------------------------------------------
// SystemInfo — 116-byte reply to get-system-info
// ---------------------------------------------------------------------------

/// Controller description returned once per panel when the session opens.
///
/// Layout (29 big-endian `u32`s, 116 bytes):
/// ```text
/// [0]      standard_cmd_no
/// [1]      extend_cmd_no
/// [2]      signature
/// [3]      version
/// [4]      width            panel width in pixels
/// [5]      height           panel height in pixels
/// [6]      update_buf_base
/// [7]      image_buf_base   image buffer address used by load/display
/// [8]      temperature_no
/// [9]      mode_no
/// [10..18] frame_count[8]   per-waveform frame counts
/// [18]     num_img_buf
/// [19]     wbf_addr         waveform table address
/// [20..29] reserved[9]
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SystemInfo {
    /// Standard command set version.
    pub standard_cmd_no: u32,
    /// Extended command set version.
    pub extend_cmd_no: u32,
    /// Controller signature.
    pub signature: u32,
    /// Protocol version.
    pub version: u32,
    /// Panel width in pixels.
    pub width: u32,
    /// Panel height in pixels.
    pub height: u32,
    /// Update buffer base address.
    pub update_buf_base: u32,
    /// Image buffer base address.
    pub image_buf_base: u32,
    /// Temperature segment count.
    pub temperature_no: u32,
    /// Waveform mode count.
    pub mode_no: u32,
    /// Frame count per waveform mode.
    pub frame_count: [u32; 8],
    /// Number of image buffers.
    pub num_img_buf: u32,
    /// Waveform table address.
    pub wbf_addr: u32,
    /// Reserved words.
    pub reserved: [u32; 9],
}

impl SystemInfo {
    /// Number of 32-bit words on the wire.
    pub const WORDS: usize = 29;
    /// Encoded size in bytes.
    pub const SIZE: usize = Self::WORDS * 4;

    /// Decode a wire record, converting every field to host order.
    pub fn decode(buf: &[u8; Self::SIZE]) -> Self {
        let mut words = [0u32; Self::WORDS];
        for (i, word) in words.iter_mut().enumerate() {
            *word = read_be_u32(buf, i).unwrap_or_default();
        }
        let [standard_cmd_no, extend_cmd_no, signature, version, width, height, update_buf_base, image_buf_base, temperature_no, mode_no, f0, f1, f2, f3, f4, f5, f6, f7, num_img_buf, wbf_addr, r0, r1, r2, r3, r4, r5, r6, r7, r8] =
            words;
        Self {
            standard_cmd_no,
            extend_cmd_no,
            signature,
            version,
            width,
            height,
            update_buf_base,
            image_buf_base,
            temperature_no,
            mode_no,
            frame_count: [f0, f1, f2, f3, f4, f5, f6, f7],
            num_img_buf,
            wbf_addr,
            reserved: [r0, r1, r2, r3, r4, r5, r6, r7, r8],
        }
    }

    /// Encode into wire order. Used by the in-memory bus to answer probes.
    pub fn encode(&self) -> [u8; Self::SIZE] {
        let head = [
            self.standard_cmd_no,
            self.extend_cmd_no,
            self.signature,
            self.version,
            self.width,
            self.height,
            self.update_buf_base,
            self.image_buf_base,
            self.temperature_no,
            self.mode_no,
        ];
        let words: Vec<u32> = head
            .into_iter()
            .chain(self.frame_count)
            .chain([self.num_img_buf, self.wbf_addr])
            .chain(self.reserved)
            .collect();
        let mut buf = [0u8; Self::SIZE];
        write_be_u32s(&mut buf, &words);
        buf
    }
}

// ---------------------------------------------------------------------------
// DisplayAreaArg — 28-byte data phase of display-area
// ---------------------------------------------------------------------------

/// Rectangle refresh request.
///
/// Layout (7 big-endian `u32`s): `mem_addr, wav_mode, pos_x, pos_y, width,
/// height, engine_index`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayAreaArg {
    /// Image buffer the refresh reads from.
    pub mem_addr: u32,
    /// Waveform mode wire value.
    pub wav_mode: u32,
    /// Left edge.
    pub pos_x: u32,
    /// Top edge.
    pub pos_y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Non-zero asks the controller to finish before replying.
    pub engine_index: u32,
}

impl DisplayAreaArg {
    /// Encoded size in bytes.
    pub const SIZE: usize = 28;

    /// Encode in wire order.
    pub fn encode(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        write_be_u32s(
            &mut buf,
            &[
                self.mem_addr,
                self.wav_mode,
                self.pos_x,
                self.pos_y,
                self.width,
                self.height,
                self.engine_index,
            ],
        );
        buf
    }

    /// Decode from a payload; `None` when shorter than [`Self::SIZE`].
    pub fn decode(buf: &[u8]) -> Option<Self> {
        Some(Self {
            mem_addr: read_be_u32(buf, 0)?,
            wav_mode: read_be_u32(buf, 1)?,
            pos_x: read_be_u32(buf, 2)?,
            pos_y: read_be_u32(buf, 3)?,
            width: read_be_u32(buf, 4)?,
            height: read_be_u32(buf, 5)?,
            engine_index: read_be_u32(buf, 6)?,
        })
    }
}

// ---------------------------------------------------------------------------
// LoadImageArg — 20-byte header in front of load-image-area rows
// ---------------------------------------------------------------------------

/// Header of a load-image-area payload; pixel rows follow immediately.
///
/// Layout (5 big-endian `u32`s): `addr, x, y, w, h`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadImageArg {
    /// Destination image buffer.
    pub addr: u32,
    /// Left edge.
    pub x: u32,
    /// Top edge of this chunk.
    pub y: u32,
    /// Row width in pixels.
    pub w: u32,
    /// Rows in this chunk.
    pub h: u32,
}

impl LoadImageArg {
    /// Encoded size in bytes.
    pub const SIZE: usize = 20;

    /// Encode in wire order.
    pub fn encode(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        write_be_u32s(&mut buf, &[self.addr, self.x, self.y, self.w, self.h]);
        buf
    }

    /// Decode the header of a payload; `None` when shorter than [`Self::SIZE`].
    pub fn decode(buf: &[u8]) -> Option<Self> {
        Some(Self {
            addr: read_be_u32(buf, 0)?,
            x: read_be_u32(buf, 1)?,
            y: read_be_u32(buf, 2)?,
            w: read_be_u32(buf, 3)?,
            h: read_be_u32(buf, 4)?,
        })
    }
}

// ---------------------------------------------------------------------------
// TemperatureArg — 2-byte temperature exchange
// ---------------------------------------------------------------------------

/// Temperature exchange buffer: `[flag, value]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemperatureArg {
    /// Get or set.
    pub option: TemperatureOption,
    /// Degrees Celsius as the controller's raw byte.
    pub value: u8,
}

impl TemperatureArg {
    /// Encoded size in bytes.
    pub const SIZE: usize = 2;

    /// Read request.
    pub const fn get() -> Self {
        Self {
            option: TemperatureOption::Get,
            value: 0,
        }
    }

    /// Force `celsius`.
    pub const fn set(celsius: i8) -> Self {
        Self {
            option: TemperatureOption::Set,
            value: u8::from_ne_bytes(celsius.to_ne_bytes()),
        }
    }

    /// Outgoing buffer.
    pub const fn encode(&self) -> [u8; Self::SIZE] {
        [self.option as u8, self.value]
    }

    /// Interpret the buffer after the call.
    ///
    /// A GET reply arrives transposed (`[value, flag]`), so the two bytes are
    /// swapped back; a SET leaves the buffer as sent.
    pub const fn from_reply(option: TemperatureOption, reply: [u8; Self::SIZE]) -> Self {
        let [first, second] = reply;
        let value = match option {
            TemperatureOption::Get => first,
            TemperatureOption::Set => second,
        };
        Self { option, value }
    }

    /// Value as a signed Celsius reading.
    pub const fn celsius(&self) -> i8 {
        i8::from_ne_bytes([self.value])
    }
}

/// Host-order word of a 4-byte register reply, as received.
pub fn register_from_reply(reply: [u8; 4]) -> u32 {
    u32::from_ne_bytes(reply)
}

/// Wire order of a register value being written.
pub fn register_to_wire(value: u32) -> [u8; 4] {
    to_wire_u32(value)
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

    fn sample_info() -> SystemInfo {
        SystemInfo {
            standard_cmd_no: 1,
            extend_cmd_no: 2,
            signature: 0x3839_3531,
            version: 0x0001_0002,
            width: 1440,
            height: 640,
            update_buf_base: 0x0011_0000,
            image_buf_base: 0x0012_0000,
            temperature_no: 14,
            mode_no: 6,
            frame_count: [1, 2, 3, 4, 5, 6, 7, 8],
            num_img_buf: 2,
            wbf_addr: 0x0080_0000,
            reserved: [9; 9],
        }
    }

    #[test]
    fn system_info_is_116_bytes() {
        assert_eq!(SystemInfo::SIZE, 116);
    }

    #[test]
    fn system_info_fields_land_at_documented_words() {
        let buf = sample_info().encode();
        assert_eq!(read_be_u32(&buf, 4), Some(1440));
        assert_eq!(read_be_u32(&buf, 5), Some(640));
        assert_eq!(read_be_u32(&buf, 7), Some(0x0012_0000));
        assert_eq!(read_be_u32(&buf, 17), Some(8));
        assert_eq!(read_be_u32(&buf, 19), Some(0x0080_0000));
        assert_eq!(SystemInfo::decode(&buf), sample_info());
    }

    #[test]
    fn display_area_arg_orders_address_then_mode_then_rect() {
        let arg = DisplayAreaArg {
            mem_addr: 0x0012_0000,
            wav_mode: 2,
            pos_x: 0,
            pos_y: 0,
            width: 720,
            height: 640,
            engine_index: 1,
        };
        let buf = arg.encode();
        assert_eq!(&buf[0..4], &[0x00, 0x12, 0x00, 0x00]);
        assert_eq!(&buf[4..8], &[0, 0, 0, 2]);
        assert_eq!(&buf[16..20], &[0x00, 0x00, 0x02, 0xD0]);
        assert_eq!(&buf[24..28], &[0, 0, 0, 1]);
        assert_eq!(DisplayAreaArg::decode(&buf), Some(arg));
        assert_eq!(DisplayAreaArg::decode(&buf[..27]), None);
    }

    #[test]
    fn load_image_arg_header_layout() {
        let arg = LoadImageArg {
            addr: 0x0012_0000,
            x: 0,
            y: 85,
            w: 720,
            h: 85,
        };
        let buf = arg.encode();
        assert_eq!(&buf[8..12], &[0, 0, 0, 85]);
        assert_eq!(LoadImageArg::decode(&buf), Some(arg));
    }

    /// The controller answers a GET as `[value, flag]`.
    #[test]
    fn temperature_get_reply_is_transposed() {
        let reply = TemperatureArg::from_reply(TemperatureOption::Get, [23, 0]);
        assert_eq!(reply.value, 23);
        assert_eq!(reply.celsius(), 23);

        let below_zero = TemperatureArg::from_reply(TemperatureOption::Get, [0xFB, 0]);
        assert_eq!(below_zero.celsius(), -5);
    }

    #[test]
    fn temperature_set_encodes_flag_first() {
        assert_eq!(TemperatureArg::set(-5).encode(), [1, 0xFB]);
        assert_eq!(TemperatureArg::get().encode(), [0, 0]);
    }

    #[test]
    fn register_write_goes_out_big_endian() {
        assert_eq!(register_to_wire(0x0102_0304), [1, 2, 3, 4]);
    }

    /// Replies are handed back in native order without a swap.
    #[test]
    fn register_read_is_native_order() {
        let reply = [1, 2, 3, 4];
        assert_eq!(register_from_reply(reply), u32::from_ne_bytes(reply));
    }
}
