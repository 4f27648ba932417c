//! Protocol constants and session configuration.
//!
//! The constants mirror the controller's fixed limits. [`SessionConfig`]
//! carries the handful of values a deployment may reasonably change (device
//! nodes, write opcode, transfer ceiling, timeout) and defaults to the
//! constants.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::UsecError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Number of physical panels (display quadrants) behind one controller board.
pub const PANEL_COUNT: usize = 4;

/// Sense buffer length handed to every pass-through request.
pub const SENSE_LEN: usize = 256;

/// Inquiry scratch block length; the inquiry payload is `BLOCK_LEN * 256` bytes.
pub const BLOCK_LEN: usize = 32;

/// Inquiry scratch payload length.
pub const INQUIRY_LEN: usize = BLOCK_LEN * 256;

/// Pass-through timeout in milliseconds.
pub const TIMEOUT_MS: u32 = 50_000;

/// Largest single pass-through data transfer the controller accepts (60 KiB).
pub const MAX_TRANSFER_BYTES: u32 = 60 * 1024;

/// Widest row the load-image-area command accepts; wider rows go through
/// raw memory writes.
pub const LOAD_IMAGE_MAX_WIDTH: u32 = 2048;

/// Device nodes of panels 0–3, in panel index order.
pub const DEVICE_PATHS: [&str; PANEL_COUNT] = [
    "/dev/eink_usec_312BWN0_1",
    "/dev/eink_usec_312BWN0_2",
    "/dev/eink_usec_312BWN0_3",
    "/dev/eink_usec_312BWN0_4",
];

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Settings resolved once when a [`Session`](crate::Session) is opened.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, deny_unknown_fields))]
pub struct SessionConfig {
    /// Device node per panel, index 0–3.
    pub device_paths: [PathBuf; PANEL_COUNT],
    /// Use the fast write-memory opcode (0xA5) instead of the plain one (0x82).
    pub fast_write: bool,
    /// Single-transfer ceiling used to size upload chunks.
    pub max_transfer_bytes: u32,
    /// Pass-through timeout in milliseconds.
    pub timeout_ms: u32,
    /// Sense buffer length owned by the session.
    pub sense_len: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            device_paths: DEVICE_PATHS.map(PathBuf::from),
            fast_write: true,
            max_transfer_bytes: MAX_TRANSFER_BYTES,
            timeout_ms: TIMEOUT_MS,
            sense_len: SENSE_LEN,
        }
    }
}

impl SessionConfig {
    /// Pass-through timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(u64::from(self.timeout_ms))
    }

    /// Reject settings the wire format cannot express.
    ///
    /// Memory writes carry their length in a 16-bit CDB field, so the
    /// transfer ceiling must fit in `1..=65535`.
    pub fn validate(&self) -> Result<(), UsecError> {
        if self.max_transfer_bytes == 0 || self.max_transfer_bytes > u32::from(u16::MAX) {
            return Err(UsecError::InvalidConfig {
                field: "max_transfer_bytes",
                reason: "must be within 1..=65535",
            });
        }
        if self.timeout_ms == 0 {
            return Err(UsecError::InvalidConfig {
                field: "timeout_ms",
                reason: "must be non-zero",
            });
        }
        if self.sense_len == 0 {
            return Err(UsecError::InvalidConfig {
                field: "sense_len",
                reason: "must be non-zero",
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_controller_constants() {
        let cfg = SessionConfig::default();
        assert!(cfg.fast_write);
        assert_eq!(cfg.max_transfer_bytes, 61_440);
        assert_eq!(cfg.timeout(), Duration::from_secs(50));
        assert_eq!(cfg.sense_len, 256);
        assert_eq!(
            cfg.device_paths[3],
            PathBuf::from("/dev/eink_usec_312BWN0_4")
        );
        cfg.validate().unwrap();
    }

    /// The write-memory length field is 16 bits wide.
    #[test]
    fn transfer_ceiling_above_u16_is_rejected() {
        let cfg = SessionConfig {
            max_transfer_bytes: 65_536,
            ..SessionConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(UsecError::InvalidConfig {
                field: "max_transfer_bytes",
                ..
            })
        ));
    }

    #[test]
    fn zero_values_are_rejected() {
        for cfg in [
            SessionConfig {
                max_transfer_bytes: 0,
                ..SessionConfig::default()
            },
            SessionConfig {
                timeout_ms: 0,
                ..SessionConfig::default()
            },
            SessionConfig {
                sense_len: 0,
                ..SessionConfig::default()
            },
        ] {
            assert!(cfg.validate().is_err());
        }
    }
}
