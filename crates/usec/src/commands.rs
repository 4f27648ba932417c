//! Per-panel command set.
//!
//! Every method composes the same three steps: encode a [`Cdb`], run one
//! pass-through [`Request`], decode the reply. A [`PanelCommands`] borrows the
//! session mutably, so at most one command is in flight per session and the
//! shared sense buffer is never aliased.

use std::time::Duration;

use crate::cdb::{Cdb, Opcode, PmicControl, WriteOpcode};
use crate::config::INQUIRY_LEN;
use crate::endian::from_wire_u16;
use crate::error::UsecError;
use crate::mode::UpdateMode;
use crate::session::PanelGeometry;
use crate::transport::{DataPhase, PassThrough, Request};
use crate::wire::{
    register_from_reply, register_to_wire, DisplayAreaArg, LoadImageArg, SystemInfo,
    TemperatureArg,
};

/// Rectangle on one panel, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Area {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Width.
    pub width: u32,
    /// Height.
    pub height: u32,
}

impl Area {
    /// Whole panel: `(0, 0, width, height)`.
    pub const fn full(geometry: PanelGeometry) -> Self {
        Self {
            x: 0,
            y: 0,
            width: geometry.width,
            height: geometry.height,
        }
    }

    /// Pixel count, `None` on overflow.
    pub fn pixels(&self) -> Option<usize> {
        let w = usize::try_from(self.width).ok()?;
        let h = usize::try_from(self.height).ok()?;
        w.checked_mul(h)
    }
}

/// Command access to one panel of an open session.
pub struct PanelCommands<'s, D: PassThrough> {
    pub(crate) panel: usize,
    pub(crate) device: &'s mut D,
    pub(crate) geometry: PanelGeometry,
    pub(crate) sense: &'s mut [u8],
    pub(crate) write: WriteOpcode,
    pub(crate) timeout: Duration,
}

impl<D: PassThrough> PanelCommands<'_, D> {
    /// Panel index 0–3.
    pub fn panel(&self) -> usize {
        self.panel
    }

    /// Geometry learned when the session opened.
    pub fn geometry(&self) -> PanelGeometry {
        self.geometry
    }

    fn exec(&mut self, opcode: Opcode, cdb: &Cdb, data: DataPhase<'_>) -> Result<(), UsecError> {
        tracing::trace!(
            panel = self.panel,
            opcode = opcode.name(),
            len = data.len(),
            "pass-through"
        );
        self.device
            .execute(Request {
                cdb,
                data,
                sense: &mut *self.sense,
                timeout: self.timeout,
            })
            .map_err(|source| UsecError::Command {
                panel: self.panel,
                opcode,
                source,
            })
    }

    /// Standard inquiry into a scratch buffer; only success matters.
    pub fn inquiry(&mut self) -> Result<(), UsecError> {
        let mut scratch = vec![0u8; INQUIRY_LEN];
        self.exec(
            Opcode::Inquiry,
            &Cdb::inquiry(),
            DataPhase::FromDevice(&mut scratch),
        )
    }

    /// Read and decode the controller's system info record.
    pub fn system_info(&mut self) -> Result<SystemInfo, UsecError> {
        let mut buf = [0u8; SystemInfo::SIZE];
        self.exec(
            Opcode::GetSystemInfo,
            &Cdb::system_info(),
            DataPhase::FromDevice(&mut buf),
        )?;
        Ok(SystemInfo::decode(&buf))
    }

    /// Read `buf.len()` bytes of controller memory at `address`.
    pub fn read_mem(&mut self, address: u32, buf: &mut [u8]) -> Result<(), UsecError> {
        let len = u16::try_from(buf.len())
            .map_err(|_| UsecError::LengthOverflow { len: buf.len() })?;
        self.exec(
            Opcode::ReadMemory,
            &Cdb::read_memory(address, len),
            DataPhase::FromDevice(buf),
        )
    }

    /// Write `data` to controller memory at `address` with the session's
    /// write opcode.
    pub fn write_mem(&mut self, address: u32, data: &[u8]) -> Result<(), UsecError> {
        let len = u16::try_from(data.len())
            .map_err(|_| UsecError::LengthOverflow { len: data.len() })?;
        self.exec(
            self.write.opcode(),
            &Cdb::write_memory(self.write, address, len),
            DataPhase::ToDevice(data),
        )
    }

    /// Read a register. The 4 reply bytes are returned in native order as
    /// received, without a wire-order conversion.
    pub fn read_reg(&mut self, address: u32) -> Result<u32, UsecError> {
        let mut buf = [0u8; 4];
        self.exec(
            Opcode::ReadRegister,
            &Cdb::read_register(address),
            DataPhase::FromDevice(&mut buf),
        )?;
        Ok(register_from_reply(buf))
    }

    /// Write a register; `value` goes out in wire order.
    pub fn write_reg(&mut self, address: u32, value: u32) -> Result<(), UsecError> {
        let buf = register_to_wire(value);
        self.exec(
            Opcode::WriteRegister,
            &Cdb::write_register(address),
            DataPhase::ToDevice(&buf),
        )
    }

    /// Refresh `area` from the panel's image buffer with `mode`.
    pub fn display_area(
        &mut self,
        area: Area,
        mode: UpdateMode,
        wait: bool,
    ) -> Result<(), UsecError> {
        let arg = DisplayAreaArg {
            mem_addr: self.geometry.image_base,
            wav_mode: mode.wire(),
            pos_x: area.x,
            pos_y: area.y,
            width: area.width,
            height: area.height,
            engine_index: u32::from(wait),
        };
        self.exec(
            Opcode::DisplayArea,
            &Cdb::display_area(),
            DataPhase::ToDevice(&arg.encode()),
        )
    }

    /// Load `rows` (8 bpp, `area.width × area.height` bytes) into the image
    /// buffer at `area`. The payload is the header followed by the rows.
    pub fn load_image_area(&mut self, area: Area, rows: &[u8]) -> Result<(), UsecError> {
        let expected = area.pixels().ok_or(UsecError::LengthOverflow {
            len: rows.len(),
        })?;
        if rows.len() != expected {
            return Err(UsecError::BufferLength {
                expected,
                actual: rows.len(),
            });
        }
        let header = LoadImageArg {
            addr: self.geometry.image_base,
            x: area.x,
            y: area.y,
            w: area.width,
            h: area.height,
        };
        let mut payload = Vec::with_capacity(LoadImageArg::SIZE.saturating_add(rows.len()));
        payload.extend_from_slice(&header.encode());
        payload.extend_from_slice(rows);
        self.exec(
            Opcode::LoadImageArea,
            &Cdb::load_image_area(),
            DataPhase::ToDevice(&payload),
        )
    }

    /// Get or force the temperature. A GET reply is un-transposed before it
    /// is returned.
    pub fn temperature(&mut self, arg: TemperatureArg) -> Result<TemperatureArg, UsecError> {
        let mut buf = arg.encode();
        self.exec(
            Opcode::Temperature,
            &Cdb::temperature(arg.option, arg.value),
            DataPhase::FromDevice(&mut buf),
        )?;
        Ok(TemperatureArg::from_reply(arg.option, buf))
    }

    /// Read the sensor temperature in °C.
    pub fn get_temperature(&mut self) -> Result<i8, UsecError> {
        Ok(self.temperature(TemperatureArg::get())?.celsius())
    }

    /// Force the waveform temperature to `celsius`.
    pub fn set_temperature(&mut self, celsius: i8) -> Result<(), UsecError> {
        self.temperature(TemperatureArg::set(celsius)).map(|_| ())
    }

    /// PMIC control. When `control` reads VCOM the 2-byte reply is decoded
    /// from wire order; otherwise it is returned as received.
    pub fn pmic(&mut self, control: PmicControl) -> Result<u16, UsecError> {
        let mut buf = [0u8; 2];
        self.exec(
            Opcode::Pmic,
            &Cdb::pmic(control),
            DataPhase::FromDevice(&mut buf),
        )?;
        Ok(if control.reads_vcom() {
            from_wire_u16(buf)
        } else {
            u16::from_ne_bytes(buf)
        })
    }

    /// Trigger a controller reset. No data phase payload.
    pub fn auto_reset(&mut self) -> Result<(), UsecError> {
        self.exec(
            Opcode::AutoReset,
            &Cdb::auto_reset(),
            DataPhase::ToDevice(&[]),
        )
    }
}
