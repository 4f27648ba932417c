//! Screen update sequencing: physical refresh order, then PMIC power-off.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::arithmetic_side_effects, // test geometry math on small constants
    clippy::indexing_slicing
)]

use usec::mocks::{MockBus, MockDevice, MOCK_IMAGE_BASE};
use usec::wire::DisplayAreaArg;
use usec::{Opcode, Session, SessionConfig, UpdateMode, UsecError, PHYSICAL_REFRESH_ORDER};

fn open(bus: &MockBus) -> Session<MockDevice> {
    let session = Session::open_with(&mut bus.opener(), SessionConfig::default()).unwrap();
    bus.clear_calls();
    session
}

#[test]
fn update_refreshes_in_physical_order_then_powers_off_panel_zero() {
    let bus = MockBus::new();
    let mut session = open(&bus);

    session.update_display(UpdateMode::Gc16, true).unwrap();

    let sequence: Vec<(usize, Option<Opcode>)> = bus
        .calls()
        .iter()
        .map(|call| (call.panel, call.opcode()))
        .collect();
    assert_eq!(
        sequence,
        vec![
            (0, Some(Opcode::DisplayArea)),
            (1, Some(Opcode::DisplayArea)),
            (3, Some(Opcode::DisplayArea)),
            (2, Some(Opcode::DisplayArea)),
            (0, Some(Opcode::Pmic)),
        ]
    );
    assert_eq!(PHYSICAL_REFRESH_ORDER, [0, 1, 3, 2]);
    assert_eq!(bus.power_on(), Some(false));
}

#[test]
fn display_area_argument_covers_the_whole_panel() {
    let bus = MockBus::new();
    let mut session = open(&bus);

    session.update_display(UpdateMode::A2, false).unwrap();

    for call in bus.calls_for(Opcode::DisplayArea) {
        let arg = DisplayAreaArg::decode(&call.payload).unwrap();
        assert_eq!(arg.mem_addr, MOCK_IMAGE_BASE);
        assert_eq!(arg.wav_mode, 4);
        assert_eq!((arg.pos_x, arg.pos_y), (0, 0));
        assert_eq!((arg.width, arg.height), (720, 640));
        assert_eq!(arg.engine_index, 0);
    }
}

#[test]
fn power_off_cdb_layout() {
    let bus = MockBus::new();
    let mut session = open(&bus);

    session.power_off().unwrap();

    let call = bus.calls_for(Opcode::Pmic).pop().unwrap();
    let bytes = call.cdb.as_bytes();
    assert_eq!(bytes.get(7..12), Some(&[0x00, 0x02, 0x00, 0x01, 0x00][..]));
}

#[test]
fn failed_refresh_still_attempts_every_panel_and_powers_off() {
    let bus = MockBus::new();
    let mut session = open(&bus);
    bus.fail_command(3, Opcode::DisplayArea);

    // The refresh aggregate is logged; the power-off status is returned.
    session.update_display(UpdateMode::Gc16, true).unwrap();

    assert_eq!(bus.calls_for(Opcode::DisplayArea).len(), 4);
    assert_eq!(bus.calls_for(Opcode::Pmic).len(), 1);

    let outcome = session.refresh(UpdateMode::Gc16, true);
    assert_eq!(outcome.attempted(), 4);
    assert_eq!(outcome.failed_panels(), vec![3]);
}

#[test]
fn power_off_failure_is_the_update_result() {
    let bus = MockBus::new();
    let mut session = open(&bus);
    bus.fail_command(0, Opcode::Pmic);

    let err = session.update_display(UpdateMode::Du, true).unwrap_err();
    assert!(matches!(
        err,
        UsecError::Command {
            panel: 0,
            opcode: Opcode::Pmic,
            ..
        }
    ));
    assert_eq!(bus.calls_for(Opcode::DisplayArea).len(), 4);
}

#[test]
fn raw_mode_outside_range_is_rejected_before_io() {
    let bus = MockBus::new();
    let mut session = open(&bus);

    for raw in [6u8, 7, 0xFF] {
        let err = session.update_display_raw(raw, true).unwrap_err();
        assert!(matches!(err, UsecError::InvalidMode(m) if m == raw));
    }
    assert!(bus.calls().is_empty());

    session.update_display_raw(5, true).unwrap();
    let arg = DisplayAreaArg::decode(&bus.calls_for(Opcode::DisplayArea).pop().unwrap().payload)
        .unwrap();
    assert_eq!(arg.wav_mode, 5);
}
