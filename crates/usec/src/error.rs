//! Error type for every fallible session operation.

use std::io;
use std::path::PathBuf;

use crate::cdb::Opcode;
use crate::transport::TransportError;

/// Errors returned by [`Session`](crate::Session) and [`PanelCommands`](crate::PanelCommands).
///
/// Device-reported status and sense data are never inspected, so there is no
/// variant for "the controller rejected the command": a pass-through call that
/// the kernel completed counts as success.
#[derive(Debug, thiserror::Error)]
pub enum UsecError {
    // ----- construction -----
    /// A panel's device node could not be opened.
    #[error("cannot open panel {panel} device '{}'", path.display())]
    Open {
        /// Panel index 0–3.
        panel: usize,
        /// Device node that failed to open.
        path: PathBuf,
        /// Error from `open(2)`.
        #[source]
        source: io::Error,
    },

    /// The inquiry or system-info probe failed while opening the session.
    #[error("panel {panel}: {opcode} probe failed")]
    Probe {
        /// Panel index 0–3.
        panel: usize,
        /// Probe command that failed.
        opcode: Opcode,
        /// Underlying pass-through failure.
        #[source]
        source: TransportError,
    },

    // ----- transport -----
    /// A single command's pass-through call failed.
    #[error("panel {panel}: {opcode} command failed")]
    Command {
        /// Panel index 0–3.
        panel: usize,
        /// Command that failed.
        opcode: Opcode,
        /// Underlying pass-through failure.
        #[source]
        source: TransportError,
    },

    /// Some transfers of an aggregated operation failed; all were attempted.
    #[error("panel {panel}: {failed} of {attempted} {opcode} transfers failed")]
    Partial {
        /// Panel of the first failure.
        panel: usize,
        /// Command whose transfers failed.
        opcode: Opcode,
        /// Number of failed transfers.
        failed: usize,
        /// Number of attempted transfers.
        attempted: usize,
        /// First failure.
        #[source]
        source: Box<UsecError>,
    },

    // ----- caller contract -----
    /// Image buffer length differs from the session's composite size.
    #[error("image buffer is {actual} bytes, expected {expected}")]
    BufferLength {
        /// Required length (sum of `width × height` over all panels).
        expected: usize,
        /// Length supplied by the caller.
        actual: usize,
    },

    /// Update mode outside `INIT..=DU4`.
    #[error("update mode {0} is out of range (0..=5)")]
    InvalidMode(u8),

    /// Panel index outside `0..4`.
    #[error("panel index {0} is out of range")]
    InvalidPanel(usize),

    /// The session has been closed.
    #[error("session is closed")]
    Closed,

    /// A single row does not fit into one transfer.
    #[error("row width {width} exceeds the {max_transfer}-byte transfer ceiling")]
    RowTooWide {
        /// Row width in bytes.
        width: u32,
        /// Configured transfer ceiling.
        max_transfer: u32,
    },

    /// A memory transfer length does not fit the 16-bit CDB length field.
    #[error("transfer of {len} bytes does not fit a 16-bit length field")]
    LengthOverflow {
        /// Requested length in bytes.
        len: usize,
    },

    /// A computed controller address overflowed 32 bits.
    #[error("panel {panel}: controller address overflows 32 bits")]
    AddressOverflow {
        /// Panel index 0–3.
        panel: usize,
    },

    /// A [`SessionConfig`](crate::SessionConfig) value is unusable.
    #[error("invalid config `{field}`: {reason}")]
    InvalidConfig {
        /// Offending field.
        field: &'static str,
        /// Why the value was rejected.
        reason: &'static str,
    },
}

impl UsecError {
    /// True for errors raised before any I/O was attempted.
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            Self::BufferLength { .. }
                | Self::InvalidMode(_)
                | Self::InvalidPanel(_)
                | Self::Closed
                | Self::RowTooWide { .. }
                | Self::LengthOverflow { .. }
                | Self::AddressOverflow { .. }
                | Self::InvalidConfig { .. }
        )
    }
}
