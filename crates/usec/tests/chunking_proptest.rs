//! Property-based tests for upload chunking and wire encoding.
//! Verifies invariants hold for all geometries, not just the 720 × 640 panels.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::arithmetic_side_effects, // test geometry math on small constants
    clippy::indexing_slicing
)]

use usec::endian::{from_wire_u16, from_wire_u32, to_wire_u16, to_wire_u32};
use usec::mocks::MockBus;
use usec::upload::{RowChunks, Strategy};
use usec::wire::{DisplayAreaArg, SystemInfo};
use usec::{Opcode, Session, SessionConfig};

proptest::proptest! {
    /// Chunks cover every row exactly once, in order, each within the ceiling.
    #[test]
    fn chunks_tile_every_row(width in 1u32..=4096, height in 0u32..=2048, max in 4096u32..=65_535) {
        let chunks = RowChunks::new(width, height, max).unwrap();
        let per_chunk = chunks.rows_per_chunk();
        let mut next = 0u32;
        for chunk in chunks {
            assert_eq!(chunk.first_row, next);
            assert!(chunk.rows >= 1 && chunk.rows <= per_chunk);
            assert!(u64::from(chunk.rows) * u64::from(width) <= u64::from(max));
            next += chunk.rows;
        }
        assert_eq!(next, height);
    }

    /// Only the last chunk may be short.
    #[test]
    fn only_the_tail_chunk_is_short(width in 1u32..=2048, height in 1u32..=1024) {
        let chunks: Vec<_> = RowChunks::new(width, height, 61_440).unwrap().collect();
        let per_chunk = 61_440 / width;
        let (last, body) = chunks.split_last().unwrap();
        assert!(body.iter().all(|c| c.rows == per_chunk));
        assert_eq!(last.rows, height - per_chunk * u32::try_from(body.len()).unwrap());
    }

    /// Rows wider than the ceiling never produce chunks.
    #[test]
    fn too_wide_rows_are_rejected(max in 1u32..=4096, extra in 1u32..=1000) {
        assert!(RowChunks::new(max + extra, 10, max).is_err());
    }

    /// Full-width rows never use load-image-area.
    #[test]
    fn native_width_always_writes_memory(width in 1u32..=8192) {
        assert_eq!(Strategy::select(width, width), Strategy::WriteMemory);
    }

    /// Wire order is big-endian regardless of host order.
    #[test]
    fn wire_integers_are_big_endian(a in proptest::num::u32::ANY, b in proptest::num::u16::ANY) {
        assert_eq!(to_wire_u32(a), a.to_be_bytes());
        assert_eq!(from_wire_u32(to_wire_u32(a)), a);
        assert_eq!(to_wire_u16(b), b.to_be_bytes());
        assert_eq!(from_wire_u16(to_wire_u16(b)), b);
    }

    /// Geometry words are read back from their documented offsets.
    #[test]
    fn system_info_geometry_words(width in proptest::num::u32::ANY, height in proptest::num::u32::ANY, base in proptest::num::u32::ANY) {
        let info = SystemInfo { width, height, image_buf_base: base, ..SystemInfo::default() };
        let buf = info.encode();
        assert_eq!(buf.get(16..20), Some(&width.to_be_bytes()[..]));
        assert_eq!(buf.get(20..24), Some(&height.to_be_bytes()[..]));
        assert_eq!(buf.get(28..32), Some(&base.to_be_bytes()[..]));
        assert_eq!(SystemInfo::decode(&buf), info);
    }

    /// Every byte of a composite frame of any panel size reaches its panel.
    #[test]
    fn upload_places_every_byte(width in 1u32..=96, height in 1u32..=48, max in 96u32..=4096) {
        let bus = MockBus::with_geometry(width, height);
        let config = SessionConfig { max_transfer_bytes: max, ..SessionConfig::default() };
        let mut session = Session::open_with(&mut bus.opener(), config).unwrap();
        let frame = usize::try_from(width * height).unwrap();
        let image: Vec<u8> = (0..4 * frame).map(|i| u8::try_from(i % 253).unwrap()).collect();

        session.upload_image(&image).unwrap();

        for (panel, expected) in image.chunks(frame).enumerate() {
            assert!(bus.memory(panel) == expected);
        }
        for call in bus.calls_for(Opcode::FastWriteMemory) {
            assert!(u32::try_from(call.payload.len()).unwrap() <= max);
        }
    }

    /// The display-area argument keeps field order for any rectangle.
    #[test]
    fn display_area_field_order(x in 0u32..4096, y in 0u32..4096, w in 0u32..4096, h in 0u32..4096) {
        let arg = DisplayAreaArg {
            mem_addr: 0x0012_36E0,
            wav_mode: 2,
            pos_x: x,
            pos_y: y,
            width: w,
            height: h,
            engine_index: 1,
        };
        let buf = arg.encode();
        assert_eq!(buf.get(8..12), Some(&x.to_be_bytes()[..]));
        assert_eq!(buf.get(16..20), Some(&w.to_be_bytes()[..]));
        assert_eq!(DisplayAreaArg::decode(&buf), Some(arg));
    }
}
