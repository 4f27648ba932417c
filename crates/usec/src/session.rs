//! Device session: four open panels, their geometry and the shared sense
//! buffer.
//!
//! # Lifecycle
//!
//! ```text
//! open_with ──► for panel 0..4: open ─► inquiry ─► system info ─► geometry
//!    │                 any failure: release every handle opened so far
//!    ▼
//!  Ready ── commands / upload / refresh ──► close (idempotent, also on Drop)
//! ```
//!
//! A session is either fully open or does not exist; a half-open session is
//! never handed to the caller. Every operation takes `&mut self`, which is
//! what serialises use of the single sense buffer. Share a session between
//! threads only behind a lock.

use std::path::Path;

use crate::cdb::{Opcode, PmicControl, WriteOpcode};
use crate::commands::PanelCommands;
use crate::config::{SessionConfig, PANEL_COUNT};
use crate::error::UsecError;
use crate::status::Outcome;
use crate::transport::{DeviceOpener, PassThrough};
use crate::wire::SystemInfo;

/// Panel whose controller carries the temperature sensor and VCOM readout.
pub const SENSOR_PANEL: usize = 2;

// ---------------------------------------------------------------------------
// PanelGeometry
// ---------------------------------------------------------------------------

/// Geometry learned from a panel's system info at open time. Immutable
/// afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PanelGeometry {
    /// Native width in pixels.
    pub width: u32,
    /// Native height in pixels.
    pub height: u32,
    /// Image buffer base address in controller memory.
    pub image_base: u32,
}

impl PanelGeometry {
    /// Keep the three fields the session needs; the rest is discarded.
    pub const fn from_system_info(info: &SystemInfo) -> Self {
        Self {
            width: info.width,
            height: info.height,
            image_base: info.image_buf_base,
        }
    }

    /// Bytes of one full 8 bpp frame, `None` on overflow.
    pub fn frame_len(&self) -> Option<usize> {
        let w = usize::try_from(self.width).ok()?;
        let h = usize::try_from(self.height).ok()?;
        w.checked_mul(h)
    }
}

impl From<&SystemInfo> for PanelGeometry {
    fn from(info: &SystemInfo) -> Self {
        Self::from_system_info(info)
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// One physical panel: its handle (absent once closed) and geometry.
struct Panel<D> {
    device: Option<D>,
    geometry: PanelGeometry,
}

impl<D> Default for Panel<D> {
    fn default() -> Self {
        Self {
            device: None,
            geometry: PanelGeometry::default(),
        }
    }
}

/// Open connection to all four panels of one controller board.
pub struct Session<D: PassThrough> {
    panels: [Panel<D>; PANEL_COUNT],
    sense: Box<[u8]>,
    write: WriteOpcode,
    config: SessionConfig,
}

#[cfg(target_os = "linux")]
impl Session<crate::sg::SgDevice> {
    /// Open the four default device nodes through `SG_IO`.
    pub fn open() -> Result<Self, UsecError> {
        Self::open_with(&mut crate::sg::SgOpener, SessionConfig::default())
    }

    /// Open the device nodes named in `config` through `SG_IO`.
    pub fn open_config(config: SessionConfig) -> Result<Self, UsecError> {
        Self::open_with(&mut crate::sg::SgOpener, config)
    }
}

impl<D: PassThrough> Session<D> {
    /// Open and probe every panel in index order.
    ///
    /// On any failure all handles opened so far are closed before the error
    /// is returned.
    pub fn open_with<O>(opener: &mut O, config: SessionConfig) -> Result<Self, UsecError>
    where
        O: DeviceOpener<Device = D>,
    {
        config.validate()?;
        let mut session = Self {
            panels: Default::default(),
            sense: vec![0u8; config.sense_len].into_boxed_slice(),
            write: WriteOpcode::from_fast_write(config.fast_write),
            config,
        };

        for index in 0..PANEL_COUNT {
            if let Err(err) = session.attach(opener, index) {
                tracing::warn!(panel = index, error = %err, "session open failed, releasing panels");
                session.close();
                return Err(err);
            }
        }

        tracing::info!(
            fast_write = session.config.fast_write,
            max_transfer = session.config.max_transfer_bytes,
            "usec session open"
        );
        Ok(session)
    }

    /// Open panel `index`, probe it and record its geometry.
    fn attach<O>(&mut self, opener: &mut O, index: usize) -> Result<(), UsecError>
    where
        O: DeviceOpener<Device = D>,
    {
        let path: &Path = self
            .config
            .device_paths
            .get(index)
            .ok_or(UsecError::InvalidPanel(index))?;
        let device = opener
            .open(index, path)
            .map_err(|source| UsecError::Open {
                panel: index,
                path: path.to_path_buf(),
                source,
            })?;
        self.slot(index)?.device = Some(device);

        let mut commands = self.panel(index)?;
        commands.inquiry().map_err(into_probe)?;
        let info = commands.system_info().map_err(into_probe)?;

        let geometry = PanelGeometry::from(&info);
        self.slot(index)?.geometry = geometry;
        tracing::debug!(
            panel = index,
            width = geometry.width,
            height = geometry.height,
            image_base = geometry.image_base,
            "panel probed"
        );
        Ok(())
    }

    fn slot(&mut self, index: usize) -> Result<&mut Panel<D>, UsecError> {
        self.panels
            .get_mut(index)
            .ok_or(UsecError::InvalidPanel(index))
    }

    /// Close every panel handle. Safe to call more than once.
    pub fn close(&mut self) {
        let mut released = 0usize;
        for panel in &mut self.panels {
            if panel.device.take().is_some() {
                released = released.saturating_add(1);
            }
        }
        self.sense.fill(0);
        if released > 0 {
            tracing::info!(released, "usec session closed");
        }
    }

    /// True until [`close`](Self::close) runs.
    pub fn is_open(&self) -> bool {
        self.panels.iter().all(|panel| panel.device.is_some())
    }

    /// Settings the session was opened with.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Opcode used for memory writes.
    pub fn write_opcode(&self) -> WriteOpcode {
        self.write
    }

    /// Geometry of panel `index`.
    pub fn geometry(&self, index: usize) -> Result<PanelGeometry, UsecError> {
        self.panels
            .get(index)
            .map(|panel| panel.geometry)
            .ok_or(UsecError::InvalidPanel(index))
    }

    /// Geometry of every panel, index order.
    pub fn geometries(&self) -> [PanelGeometry; PANEL_COUNT] {
        let mut out = [PanelGeometry::default(); PANEL_COUNT];
        for (slot, panel) in out.iter_mut().zip(&self.panels) {
            *slot = panel.geometry;
        }
        out
    }

    /// Size of the composite framebuffer: the sum of every panel's frame.
    pub fn composite_len(&self) -> Option<usize> {
        self.panels
            .iter()
            .try_fold(0usize, |acc, panel| acc.checked_add(panel.geometry.frame_len()?))
    }

    /// Raw command access to panel `index`.
    pub fn panel(&mut self, index: usize) -> Result<PanelCommands<'_, D>, UsecError> {
        let timeout = self.config.timeout();
        let panel = self
            .panels
            .get_mut(index)
            .ok_or(UsecError::InvalidPanel(index))?;
        let device = panel.device.as_mut().ok_or(UsecError::Closed)?;
        Ok(PanelCommands {
            panel: index,
            device,
            geometry: panel.geometry,
            sense: &mut self.sense,
            write: self.write,
            timeout,
        })
    }

    /// Run `step` on each panel of `order`, attempting all of them.
    pub(crate) fn fan_out<F>(&mut self, opcode: Opcode, order: &[usize], mut step: F) -> Outcome
    where
        F: FnMut(&mut PanelCommands<'_, D>) -> Result<(), UsecError>,
    {
        let mut outcome = Outcome::new(opcode);
        for &index in order {
            let result = self
                .panel(index)
                .and_then(|mut commands| step(&mut commands));
            outcome.record(index, result);
        }
        outcome
    }

    // -----------------------------------------------------------------------
    // Sensor / PMIC
    // -----------------------------------------------------------------------

    /// Panel temperature in °C, read from the sensor panel.
    pub fn get_temperature(&mut self) -> Result<i8, UsecError> {
        let celsius = self.panel(SENSOR_PANEL)?.get_temperature()?;
        tracing::info!(celsius, "screen temperature");
        Ok(celsius)
    }

    /// Force every panel's waveform temperature to `celsius`.
    pub fn set_temperature(&mut self, celsius: i8) -> Result<(), UsecError> {
        self.fan_out(Opcode::Temperature, &ALL_PANELS, |panel| {
            panel.set_temperature(celsius)
        })
        .into_result()
    }

    /// VCOM magnitude in millivolts (the voltage itself is negative), read
    /// from the sensor panel.
    pub fn get_vcom(&mut self) -> Result<u16, UsecError> {
        let millivolts = self.panel(SENSOR_PANEL)?.pmic(PmicControl::READ_VCOM)?;
        tracing::info!(vcom_mv = millivolts, "screen VCOM");
        Ok(millivolts)
    }

    /// Program panel `index`'s VCOM to `millivolts`.
    pub fn set_vcom(&mut self, index: usize, millivolts: u16) -> Result<(), UsecError> {
        self.panel(index)?
            .pmic(PmicControl::set_vcom(millivolts))
            .map(|_| ())
    }

    /// Switch every panel's power rails on or off.
    pub fn set_power(&mut self, on: bool) -> Result<(), UsecError> {
        self.fan_out(Opcode::Pmic, &ALL_PANELS, |panel| {
            panel.pmic(PmicControl::set_power(on)).map(|_| ())
        })
        .into_result()
    }

    /// Reset every panel's controller.
    pub fn auto_reset(&mut self) -> Result<(), UsecError> {
        self.fan_out(Opcode::AutoReset, &ALL_PANELS, |panel| panel.auto_reset())
            .into_result()
    }
}

impl<D: PassThrough> Drop for Session<D> {
    fn drop(&mut self) {
        self.close();
    }
}

/// Panels in index order.
pub(crate) const ALL_PANELS: [usize; PANEL_COUNT] = [0, 1, 2, 3];

fn into_probe(err: UsecError) -> UsecError {
    match err {
        UsecError::Command {
            panel,
            opcode,
            source,
        } => UsecError::Probe {
            panel,
            opcode,
            source,
        },
        other => other,
    }
}
