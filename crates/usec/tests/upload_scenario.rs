//! Composite framebuffer upload scenarios.
//!
//! A 4 × 720 × 640 frame must land byte for byte in each panel's image
//! buffer, split into transfer-sized row chunks at the right addresses.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::arithmetic_side_effects, // test geometry math on small constants
    clippy::indexing_slicing
)]

use usec::mocks::{MockBus, MockDevice, MOCK_IMAGE_BASE};
use usec::wire::LoadImageArg;
use usec::{Area, Direction, Opcode, Session, SessionConfig, SystemInfo, UsecError};

const W: usize = 720;
const H: usize = 640;

fn open_with(bus: &MockBus, config: SessionConfig) -> Session<MockDevice> {
    Session::open_with(&mut bus.opener(), config).unwrap()
}

fn open(bus: &MockBus) -> Session<MockDevice> {
    open_with(bus, SessionConfig::default())
}

/// Distinct bytes per panel so a misplaced cursor shows up.
fn composite(panels: usize, frame: usize) -> Vec<u8> {
    (0..panels * frame)
        .map(|i| u8::try_from(((i / frame) * 61 + i % 251) % 256).unwrap() ^ 0x5A)
        .collect()
}

#[test]
fn composite_frame_lands_in_every_panel() {
    let bus = MockBus::new();
    let mut session = open(&bus);
    let image = composite(4, W * H);

    session.upload_image(&image).unwrap();

    for (panel, expected) in image.chunks(W * H).enumerate() {
        let memory = bus.memory(panel);
        assert_eq!(memory.len(), W * H, "panel {panel}");
        assert!(memory == expected, "panel {panel} contents differ");
    }
}

#[test]
fn full_width_rows_use_fast_write_in_transfer_sized_chunks() {
    let bus = MockBus::new();
    let mut session = open(&bus);
    bus.clear_calls();

    session.upload_image(&composite(4, W * H)).unwrap();

    let writes = bus.calls_for(Opcode::FastWriteMemory);
    // 61440 / 720 = 85 rows per chunk: 7 full chunks and one of 45 rows.
    assert_eq!(writes.len(), 4 * 8);
    assert!(bus.calls_for(Opcode::LoadImageArea).is_empty());

    let panel0: Vec<_> = writes.iter().filter(|c| c.panel == 0).collect();
    for (k, call) in panel0.iter().enumerate() {
        let first_row = u32::try_from(k * 85).unwrap();
        assert_eq!(call.direction, Direction::ToDevice);
        assert_eq!(call.cdb.address(), MOCK_IMAGE_BASE + first_row * 720);
        let rows = if k == 7 { 45 } else { 85 };
        assert_eq!(usize::from(call.cdb.length()), rows * W);
        assert_eq!(call.payload.len(), rows * W);
    }

    let order: Vec<usize> = writes.iter().map(|c| c.panel).collect();
    let mut sorted = order.clone();
    sorted.sort_unstable();
    assert_eq!(order, sorted, "panels must upload in index order");
}

#[test]
fn plain_write_opcode_when_fast_write_disabled() {
    let bus = MockBus::new();
    let mut session = open_with(
        &bus,
        SessionConfig {
            fast_write: false,
            ..SessionConfig::default()
        },
    );
    session.upload_image(&composite(4, W * H)).unwrap();

    assert_eq!(bus.calls_for(Opcode::WriteMemory).len(), 32);
    assert!(bus.calls_for(Opcode::FastWriteMemory).is_empty());
}

#[test]
fn wrong_length_is_rejected_before_any_io() {
    let bus = MockBus::new();
    let mut session = open(&bus);
    bus.clear_calls();

    for len in [0, 4 * W * H - 1, 4 * W * H + 1, 1440 * 640] {
        let err = session.upload_image(&vec![0u8; len]).unwrap_err();
        assert!(
            matches!(err, UsecError::BufferLength { expected, actual } if expected == 4 * W * H && actual == len)
        );
        assert!(err.is_contract_violation());
    }
    assert!(bus.calls().is_empty());
}

#[test]
fn failed_chunk_finishes_its_panel_then_stops_the_upload() {
    let bus = MockBus::new();
    let mut session = open(&bus);
    bus.clear_calls();
    let third_chunk = MOCK_IMAGE_BASE + 2 * 85 * 720;
    bus.fail_when(move |call| {
        call.panel == 1
            && call.opcode() == Some(Opcode::FastWriteMemory)
            && call.cdb.address() == third_chunk
    });

    let err = session.upload_image(&composite(4, W * H)).unwrap_err();
    match err {
        UsecError::Partial {
            panel,
            failed,
            attempted,
            ..
        } => assert_eq!((panel, failed, attempted), (1, 1, 8)),
        other => panic!("unexpected error {other}"),
    }

    let panels: Vec<usize> = bus.calls().iter().map(|c| c.panel).collect();
    assert_eq!(panels.iter().filter(|&&p| p == 0).count(), 8);
    assert_eq!(panels.iter().filter(|&&p| p == 1).count(), 8);
    assert!(!panels.contains(&2) && !panels.contains(&3));
}

#[test]
fn wide_native_panels_use_memory_writes_at_native_stride() {
    let bus = MockBus::with_geometry(1440, 640);
    let mut session = open(&bus);
    bus.clear_calls();
    let image = composite(4, 1440 * 640);

    session.upload_image(&image).unwrap();

    // 61440 / 1440 = 42 rows per chunk; 640 = 15 × 42 + 10.
    let panel2: Vec<_> = bus
        .calls_for(Opcode::FastWriteMemory)
        .into_iter()
        .filter(|c| c.panel == 2)
        .collect();
    assert_eq!(panel2.len(), 16);
    assert_eq!(panel2.get(1).unwrap().cdb.address(), MOCK_IMAGE_BASE + 42 * 1440);
    assert_eq!(panel2.last().unwrap().payload.len(), 10 * 1440);
    assert!(bus.memory(2) == image.get(2 * 1440 * 640..3 * 1440 * 640).unwrap());
}

#[test]
fn narrow_area_goes_through_load_image_with_positioned_headers() {
    let bus = MockBus::new();
    let mut session = open(&bus);
    bus.clear_calls();
    let area = Area {
        x: 100,
        y: 40,
        width: 360,
        height: 200,
    };
    let pixels: Vec<u8> = (0..360 * 200).map(|i| u8::try_from(i % 199).unwrap()).collect();

    session.upload_area(1, area, &pixels).unwrap();

    let loads = bus.calls_for(Opcode::LoadImageArea);
    // 61440 / 360 = 170 rows per chunk.
    assert_eq!(loads.len(), 2);
    let second = loads.get(1).unwrap();
    let header = LoadImageArg::decode(second.payload.get(..LoadImageArg::SIZE).unwrap()).unwrap();
    assert_eq!(header.addr, MOCK_IMAGE_BASE);
    assert_eq!((header.x, header.y, header.w, header.h), (100, 40 + 170, 360, 30));
    assert_eq!(second.payload.len(), LoadImageArg::SIZE + 30 * 360);

    let memory = bus.memory(1);
    let row_start = 41 * W + 100;
    assert_eq!(memory.get(row_start..row_start + 360), pixels.get(360..720));
}

#[test]
fn row_wider_than_transfer_ceiling_fails_before_io() {
    let bus = MockBus::new();
    let mut session = open_with(
        &bus,
        SessionConfig {
            max_transfer_bytes: 512,
            ..SessionConfig::default()
        },
    );
    bus.clear_calls();

    let err = session.upload_image(&composite(4, W * H)).unwrap_err();
    assert!(matches!(
        err,
        UsecError::RowTooWide {
            width: 720,
            max_transfer: 512
        }
    ));
    assert!(bus.calls().is_empty());
}

#[test]
fn mixed_geometries_advance_the_cursor_per_panel() {
    let bus = MockBus::new();
    bus.set_system_info(
        1,
        SystemInfo {
            width: 360,
            height: 100,
            image_buf_base: MOCK_IMAGE_BASE,
            ..SystemInfo::default()
        },
    );
    let mut session = open(&bus);
    let sizes = [W * H, 360 * 100, W * H, W * H];
    let total: usize = sizes.iter().sum();
    let image: Vec<u8> = (0..total).map(|i| u8::try_from(i % 241).unwrap()).collect();

    session.upload_image(&image).unwrap();

    let mut cursor = 0;
    for (panel, size) in sizes.into_iter().enumerate() {
        assert!(bus.memory(panel) == image.get(cursor..cursor + size).unwrap());
        cursor += size;
    }
}
