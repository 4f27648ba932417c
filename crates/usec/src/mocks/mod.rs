//! In-memory pass-through bus for tests, benches and dry runs.
//!
//! A [`MockBus`] stands in for the four device nodes. It records every
//! request, answers probes with a configurable [`SystemInfo`], keeps each
//! panel's image buffer so uploads can be checked byte for byte, and can be
//! told to fail opens or individual commands.
//!
//! ```text
//! MockBus (shared state) ──opener()──► MockOpener ──open()──► MockDevice × 4
//!        ▲                                                      │
//!        └──────────── calls, memory, registers, PMIC ◄─────────┘
//! ```
//!
//! Handles share state through `Rc<RefCell<_>>`; the bus is single-threaded
//! like the session that drives it.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io;
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;

use crate::cdb::{Cdb, Opcode, TemperatureOption, VCOM_READ};
use crate::config::PANEL_COUNT;
use crate::transport::{DataPhase, DeviceOpener, Direction, PassThrough, Request, TransportError};
use crate::wire::{LoadImageArg, SystemInfo};

/// Image buffer base address reported by default.
pub const MOCK_IMAGE_BASE: u32 = 0x0012_36E0;

/// One recorded pass-through request.
#[derive(Debug, Clone)]
pub struct Call {
    /// Panel the device was opened for.
    pub panel: usize,
    /// Command block as issued.
    pub cdb: Cdb,
    /// Data phase direction.
    pub direction: Direction,
    /// Outgoing payload; empty for device-to-host requests.
    pub payload: Vec<u8>,
    /// Data phase length in bytes.
    pub len: usize,
    /// Sense buffer length handed to the device.
    pub sense_len: usize,
    /// Request timeout.
    pub timeout: Duration,
}

impl Call {
    /// Decoded opcode of the recorded command.
    pub fn opcode(&self) -> Option<Opcode> {
        self.cdb.opcode()
    }
}

type FailHook = Box<dyn FnMut(&Call) -> bool>;

struct BusState {
    info: [SystemInfo; PANEL_COUNT],
    calls: Vec<Call>,
    open_handles: usize,
    opens: usize,
    fail_open: Option<usize>,
    fail: Option<FailHook>,
    memory: [Vec<u8>; PANEL_COUNT],
    registers: HashMap<(usize, u32), [u8; 4]>,
    temperature: i8,
    forced_temperature: Option<i8>,
    vcom: u16,
    power_on: Option<bool>,
}

/// Shared handle to the in-memory bus.
#[derive(Clone)]
pub struct MockBus {
    state: Rc<RefCell<BusState>>,
}

impl Default for MockBus {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBus {
    /// Four 720 × 640 panels.
    pub fn new() -> Self {
        Self::with_geometry(720, 640)
    }

    /// Four panels of `width × height`.
    pub fn with_geometry(width: u32, height: u32) -> Self {
        let info = SystemInfo {
            standard_cmd_no: 1,
            extend_cmd_no: 1,
            signature: u32::from_be_bytes(*b"8951"),
            version: 1,
            width,
            height,
            update_buf_base: 0x0010_0000,
            image_buf_base: MOCK_IMAGE_BASE,
            mode_no: 6,
            num_img_buf: 1,
            ..SystemInfo::default()
        };
        Self {
            state: Rc::new(RefCell::new(BusState {
                info: [info; PANEL_COUNT],
                calls: Vec::new(),
                open_handles: 0,
                opens: 0,
                fail_open: None,
                fail: None,
                memory: Default::default(),
                registers: HashMap::new(),
                temperature: 25,
                forced_temperature: None,
                vcom: 1500,
                power_on: None,
            })),
        }
    }

    /// Opener that hands out devices on this bus.
    pub fn opener(&self) -> MockOpener {
        MockOpener { bus: self.clone() }
    }

    /// Replace the system info panel `panel` reports.
    pub fn set_system_info(&self, panel: usize, info: SystemInfo) {
        if let Some(slot) = self.state.borrow_mut().info.get_mut(panel) {
            *slot = info;
        }
    }

    // ----- failure injection -----

    /// Make opening panel `panel` fail with `NotFound`.
    pub fn fail_open(&self, panel: usize) {
        self.state.borrow_mut().fail_open = Some(panel);
    }

    /// Fail every request for which `hook` returns true.
    pub fn fail_when(&self, hook: impl FnMut(&Call) -> bool + 'static) {
        self.state.borrow_mut().fail = Some(Box::new(hook));
    }

    /// Fail every `opcode` request on `panel`.
    pub fn fail_command(&self, panel: usize, opcode: Opcode) {
        self.fail_when(move |call| call.panel == panel && call.opcode() == Some(opcode));
    }

    /// Remove every injected failure.
    pub fn clear_failures(&self) {
        let mut state = self.state.borrow_mut();
        state.fail = None;
        state.fail_open = None;
    }

    // ----- observation -----

    /// Every request so far, in issue order.
    pub fn calls(&self) -> Vec<Call> {
        self.state.borrow().calls.clone()
    }

    /// Requests carrying `opcode`, in issue order.
    pub fn calls_for(&self, opcode: Opcode) -> Vec<Call> {
        self.state
            .borrow()
            .calls
            .iter()
            .filter(|call| call.opcode() == Some(opcode))
            .cloned()
            .collect()
    }

    /// Forget the recorded requests.
    pub fn clear_calls(&self) {
        self.state.borrow_mut().calls.clear();
    }

    /// Device handles currently open.
    pub fn open_handles(&self) -> usize {
        self.state.borrow().open_handles
    }

    /// Successful opens since the bus was created.
    pub fn opens(&self) -> usize {
        self.state.borrow().opens
    }

    /// Panel `panel`'s image buffer, starting at its image base.
    pub fn memory(&self, panel: usize) -> Vec<u8> {
        self.state
            .borrow()
            .memory
            .get(panel)
            .cloned()
            .unwrap_or_default()
    }

    /// Raw bytes last written to a register, as sent on the wire.
    pub fn register(&self, panel: usize, address: u32) -> Option<[u8; 4]> {
        self.state.borrow().registers.get(&(panel, address)).copied()
    }

    /// Raw reply bytes for a register read.
    pub fn set_register(&self, panel: usize, address: u32, reply: [u8; 4]) {
        self.state
            .borrow_mut()
            .registers
            .insert((panel, address), reply);
    }

    /// Temperature the sensor reports.
    pub fn set_sensor_temperature(&self, celsius: i8) {
        self.state.borrow_mut().temperature = celsius;
    }

    /// Temperature last forced through a set request.
    pub fn forced_temperature(&self) -> Option<i8> {
        self.state.borrow().forced_temperature
    }

    /// VCOM magnitude in millivolts.
    pub fn set_vcom(&self, millivolts: u16) {
        self.state.borrow_mut().vcom = millivolts;
    }

    /// Current VCOM magnitude in millivolts.
    pub fn vcom(&self) -> u16 {
        self.state.borrow().vcom
    }

    /// Power rail state last requested, if any.
    pub fn power_on(&self) -> Option<bool> {
        self.state.borrow().power_on
    }
}

/// Opens [`MockDevice`]s on a [`MockBus`].
pub struct MockOpener {
    bus: MockBus,
}

impl DeviceOpener for MockOpener {
    type Device = MockDevice;

    fn open(&mut self, panel: usize, path: &Path) -> io::Result<MockDevice> {
        let mut state = self.bus.state.borrow_mut();
        if state.fail_open == Some(panel) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such device: {}", path.display()),
            ));
        }
        state.open_handles = state.open_handles.saturating_add(1);
        state.opens = state.opens.saturating_add(1);
        Ok(MockDevice {
            panel,
            bus: self.bus.clone(),
        })
    }
}

/// One panel's handle on the bus. Dropping it closes the handle.
pub struct MockDevice {
    panel: usize,
    bus: MockBus,
}

impl Drop for MockDevice {
    fn drop(&mut self) {
        let mut state = self.bus.state.borrow_mut();
        state.open_handles = state.open_handles.saturating_sub(1);
    }
}

impl PassThrough for MockDevice {
    fn execute(&mut self, request: Request<'_>) -> Result<(), TransportError> {
        let call = Call {
            panel: self.panel,
            cdb: *request.cdb,
            direction: request.data.direction(),
            payload: match &request.data {
                DataPhase::ToDevice(buf) => buf.to_vec(),
                _ => Vec::new(),
            },
            len: request.data.len(),
            sense_len: request.sense.len(),
            timeout: request.timeout,
        };

        let mut state = self.bus.state.borrow_mut();
        let failed = state.fail.as_mut().is_some_and(|hook| hook(&call));
        state.calls.push(call);
        if failed {
            return Err(TransportError::Io(io::Error::other("injected failure")));
        }

        let cdb = request.cdb;
        match (cdb.opcode(), request.data) {
            (Some(Opcode::GetSystemInfo), DataPhase::FromDevice(buf)) => {
                let info = state.info.get(self.panel).copied().unwrap_or_default();
                copy_prefix(buf, &info.encode());
            }
            (Some(Opcode::ReadMemory), DataPhase::FromDevice(buf)) => {
                let offset = state.offset(self.panel, cdb.address());
                let memory = state.memory.get(self.panel).map(Vec::as_slice).unwrap_or_default();
                copy_prefix(buf, memory.get(offset..).unwrap_or_default());
            }
            (Some(Opcode::WriteMemory | Opcode::FastWriteMemory), DataPhase::ToDevice(data)) => {
                let offset = state.offset(self.panel, cdb.address());
                state.write(self.panel, offset, data);
            }
            (Some(Opcode::LoadImageArea), DataPhase::ToDevice(data)) => {
                state.load_image(self.panel, data);
            }
            (Some(Opcode::ReadRegister), DataPhase::FromDevice(buf)) => {
                let reply = state
                    .registers
                    .get(&(self.panel, cdb.address()))
                    .copied()
                    .unwrap_or_default();
                copy_prefix(buf, &reply);
            }
            (Some(Opcode::WriteRegister), DataPhase::ToDevice(data)) => {
                let mut raw = [0u8; 4];
                copy_prefix(&mut raw, data);
                state.registers.insert((self.panel, cdb.address()), raw);
            }
            (Some(Opcode::Temperature), DataPhase::FromDevice(buf)) => {
                let [.., option, value, _, _, _, _, _, _, _] = *cdb.as_bytes();
                if option == TemperatureOption::Get as u8 {
                    // The controller answers value first.
                    let [celsius] = state.temperature.to_ne_bytes();
                    copy_prefix(buf, &[celsius, option]);
                } else {
                    state.forced_temperature = Some(i8::from_ne_bytes([value]));
                }
            }
            (Some(Opcode::Pmic), DataPhase::FromDevice(buf)) => {
                let [.., set_vcom, set_power, power_on, _, _, _, _] = *cdb.as_bytes();
                if cdb.length() == VCOM_READ {
                    copy_prefix(buf, &state.vcom.to_be_bytes());
                } else if set_vcom != 0 {
                    state.vcom = cdb.length();
                }
                if set_power != 0 {
                    state.power_on = Some(power_on != 0);
                }
            }
            _ => {}
        }
        Ok(())
    }
}

impl BusState {
    /// Offset of `address` into panel `panel`'s image buffer.
    fn offset(&self, panel: usize, address: u32) -> usize {
        let base = self
            .info
            .get(panel)
            .map(|info| info.image_buf_base)
            .unwrap_or_default();
        usize::try_from(address.saturating_sub(base)).unwrap_or(usize::MAX)
    }

    fn write(&mut self, panel: usize, offset: usize, data: &[u8]) {
        let Some(memory) = self.memory.get_mut(panel) else {
            return;
        };
        let end = offset.saturating_add(data.len());
        if memory.len() < end {
            memory.resize(end, 0);
        }
        if let Some(dst) = memory.get_mut(offset..end) {
            dst.copy_from_slice(data);
        }
    }

    /// Place header-positioned rows at the panel's native stride.
    fn load_image(&mut self, panel: usize, payload: &[u8]) {
        let Some(header) = payload.get(..LoadImageArg::SIZE).and_then(LoadImageArg::decode) else {
            return;
        };
        let rows = payload.get(LoadImageArg::SIZE..).unwrap_or_default();
        let stride = self.info.get(panel).map(|info| info.width).unwrap_or_default();
        let (Ok(width), Ok(stride)) = (usize::try_from(header.w), usize::try_from(stride)) else {
            return;
        };
        if width == 0 {
            return;
        }
        let origin = self.offset(panel, header.addr);
        for (row, pixels) in (0u32..).zip(rows.chunks(width)) {
            let y = usize::try_from(header.y.saturating_add(row)).unwrap_or(usize::MAX);
            let x = usize::try_from(header.x).unwrap_or(usize::MAX);
            let offset = origin
                .saturating_add(y.saturating_mul(stride))
                .saturating_add(x);
            self.write(panel, offset, pixels);
        }
    }
}

fn copy_prefix(dst: &mut [u8], src: &[u8]) {
    let n = dst.len().min(src.len());
    if let (Some(dst), Some(src)) = (dst.get_mut(..n), src.get(..n)) {
        dst.copy_from_slice(src);
    }
}
