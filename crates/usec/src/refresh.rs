//! Display refresh sequencing.
//!
//! A screen update triggers a full-panel display-area command on every panel
//! in physical order, then powers the PMIC rails down through panel 0.

use crate::cdb::{Opcode, PmicControl};
use crate::commands::Area;
use crate::error::UsecError;
use crate::mode::UpdateMode;
use crate::session::Session;
use crate::status::Outcome;
use crate::transport::PassThrough;

/// Order in which panels are refreshed. Panels 2 and 3 are swapped relative
/// to index order to follow the physical quadrant layout.
pub const PHYSICAL_REFRESH_ORDER: [usize; 4] = [0, 1, 3, 2];

/// Panel whose PMIC is switched off after a refresh.
pub const POWER_PANEL: usize = 0;

impl<D: PassThrough> Session<D> {
    /// Refresh every panel in [`PHYSICAL_REFRESH_ORDER`], attempting all four
    /// regardless of individual failures.
    pub fn refresh(&mut self, mode: UpdateMode, wait: bool) -> Outcome {
        self.fan_out(Opcode::DisplayArea, &PHYSICAL_REFRESH_ORDER, |panel| {
            let area = Area::full(panel.geometry());
            panel.display_area(area, mode, wait)
        })
    }

    /// Switch the PMIC rails off through [`POWER_PANEL`].
    pub fn power_off(&mut self) -> Result<(), UsecError> {
        self.panel(POWER_PANEL)?
            .pmic(PmicControl::POWER_OFF)
            .map(|_| ())
    }

    /// Refresh all panels with `mode`, then power the rails off.
    ///
    /// The refresh aggregate is logged, not returned: the result is the
    /// power-off status, and the power-off is attempted even when a refresh
    /// step failed. Use [`refresh`](Self::refresh) to inspect refresh
    /// failures.
    pub fn update_display(&mut self, mode: UpdateMode, wait: bool) -> Result<(), UsecError> {
        let outcome = self.refresh(mode, wait);
        if outcome.is_ok() {
            tracing::info!(mode = mode.name(), wait, "screen update");
        } else {
            for failure in outcome.failures() {
                tracing::warn!(
                    panel = failure.panel,
                    mode = mode.name(),
                    error = %failure.error,
                    "panel refresh failed"
                );
            }
        }
        self.power_off()
    }

    /// [`update_display`](Self::update_display) with a raw wire mode number.
    /// Numbers outside 0–5 are rejected before any I/O.
    pub fn update_display_raw(&mut self, mode: u8, wait: bool) -> Result<(), UsecError> {
        let mode = UpdateMode::try_from(mode)?;
        self.update_display(mode, wait)
    }
}
