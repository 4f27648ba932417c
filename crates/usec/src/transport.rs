//! Pass-through transport abstraction.
//!
//! A [`PassThrough`] device executes exactly one CDB per call, synchronously,
//! with one data phase and one sense buffer. Success means the host I/O
//! primitive completed; the device's own status byte and sense data are not
//! interpreted.
//!
//! ```text
//! PanelCommands ──► Request { cdb, data, sense, timeout } ──► PassThrough::execute
//!                                                              ├─ SgDevice   (Linux SG_IO)
//!                                                              └─ MockDevice (tests)
//! ```

use std::io;
use std::path::Path;
use std::time::Duration;

use crate::cdb::Cdb;

/// Data phase of one pass-through request.
#[derive(Debug)]
pub enum DataPhase<'a> {
    /// No data transfer.
    None,
    /// Host → device.
    ToDevice(&'a [u8]),
    /// Device → host.
    FromDevice(&'a mut [u8]),
}

impl DataPhase<'_> {
    /// Number of bytes in the data phase.
    pub fn len(&self) -> usize {
        match self {
            Self::None => 0,
            Self::ToDevice(buf) => buf.len(),
            Self::FromDevice(buf) => buf.len(),
        }
    }

    /// True when no bytes move.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Direction without the buffer.
    pub fn direction(&self) -> Direction {
        match self {
            Self::None => Direction::None,
            Self::ToDevice(_) => Direction::ToDevice,
            Self::FromDevice(_) => Direction::FromDevice,
        }
    }
}

/// Transfer direction of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// No data phase.
    None,
    /// Host → device.
    ToDevice,
    /// Device → host.
    FromDevice,
}

/// One pass-through request. Built per call and never reused.
#[derive(Debug)]
pub struct Request<'a> {
    /// Command block.
    pub cdb: &'a Cdb,
    /// Payload and direction.
    pub data: DataPhase<'a>,
    /// Sense buffer the device may fill; never inspected.
    pub sense: &'a mut [u8],
    /// Per-request timeout.
    pub timeout: Duration,
}

/// Failure of the host-side pass-through primitive.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The ioctl (or its stand-in) returned an error.
    #[error("pass-through I/O failed: {0}")]
    Io(#[from] io::Error),

    /// The payload length does not fit the request descriptor.
    #[error("payload of {0} bytes exceeds the request descriptor limit")]
    PayloadTooLarge(usize),
}

/// A device that executes one pass-through request at a time.
pub trait PassThrough {
    /// Issue `request` and block until the host I/O primitive completes.
    fn execute(&mut self, request: Request<'_>) -> Result<(), TransportError>;
}

impl<T: PassThrough + ?Sized> PassThrough for Box<T> {
    fn execute(&mut self, request: Request<'_>) -> Result<(), TransportError> {
        (**self).execute(request)
    }
}

/// Opens the device node of one panel.
pub trait DeviceOpener {
    /// Device handle produced by [`DeviceOpener::open`].
    type Device: PassThrough;

    /// Open `path` read/write for panel `panel`.
    fn open(&mut self, panel: usize, path: &Path) -> io::Result<Self::Device>;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn data_phase_reports_direction_and_length() {
        let out = [1u8, 2, 3];
        let mut inp = [0u8; 8];
        assert_eq!(DataPhase::ToDevice(&out).direction(), Direction::ToDevice);
        assert_eq!(DataPhase::ToDevice(&out).len(), 3);
        let from = DataPhase::FromDevice(&mut inp);
        assert_eq!(from.direction(), Direction::FromDevice);
        assert_eq!(from.len(), 8);
        assert!(DataPhase::None.is_empty());
    }

    #[test]
    fn io_errors_convert_into_transport_errors() {
        let err: TransportError = io::Error::other("EIO").into();
        assert!(matches!(err, TransportError::Io(_)));
        assert!(err.to_string().starts_with("pass-through I/O failed"));
    }
}
