//! Protocol layer for a four-panel IT8951 e-ink controller board reached
//! through SCSI pass-through (`SG_IO`).
//!
//! The board exposes each of its four panels (display quadrants) as a separate
//! device node. A [`Session`] opens all four, probes their geometry, and then
//! drives them with vendor CDBs: image uploads, refreshes, temperature, VCOM
//! and power control.
//!
//! # Architecture Layers
//!
//! ```text
//! Application (usec-demo, callers)
//!         ↓
//! Session ─ upload_image / update_display / temperature / VCOM / power
//!         ↓
//! PanelCommands ─ one method per vendor command
//!         ↓
//! Cdb + wire records (big-endian encoders)
//!         ↓
//! PassThrough ─ SgDevice (Linux SG_IO) | MockDevice (feature `mock`)
//! ```
//!
//! # Features
//!
//! - `serde`: (de)serialise [`SessionConfig`] and [`UpdateMode`]
//! - `mock`: in-memory pass-through bus in [`mocks`]
//!
//! # Example
//!
//! ```no_run
//! # #[cfg(target_os = "linux")]
//! # fn main() -> Result<(), usec::UsecError> {
//! use usec::{Session, UpdateMode};
//!
//! let mut session = Session::open()?;
//! let frame = vec![0xFF; session.composite_len().unwrap_or_default()];
//! session.upload_image(&frame)?;
//! session.update_display(UpdateMode::Gc16, true)?;
//! # Ok(())
//! # }
//! # #[cfg(not(target_os = "linux"))]
//! # fn main() {}
//! ```

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in library code
#![deny(clippy::expect_used)] // no .expect() in library code
#![deny(clippy::panic)] // no panic!() in library code
#![deny(clippy::unreachable)]
#![deny(unused_must_use)]
// all Results must be handled
// ────────────────────────────────────────────────────────────────────────────
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::print_stdout)] // use tracing in lib code
#![allow(clippy::doc_markdown)] // opcodes and device paths in doc comments
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod cdb;
pub mod commands;
pub mod config;
pub mod endian;
pub mod error;
pub mod mode;
pub mod refresh;
pub mod session;
pub mod status;
pub mod transport;
pub mod upload;
pub mod wire;

#[cfg(target_os = "linux")]
pub mod sg;

#[cfg(any(test, feature = "mock"))]
pub mod mocks;

pub use cdb::{Cdb, Opcode, PmicControl, TemperatureOption, WriteOpcode};
pub use commands::{Area, PanelCommands};
pub use config::{SessionConfig, PANEL_COUNT};
pub use error::UsecError;
pub use mode::{PixelDepth, UpdateMode};
pub use refresh::PHYSICAL_REFRESH_ORDER;
pub use session::{PanelGeometry, Session, SENSOR_PANEL};
pub use status::{Failure, Outcome};
pub use transport::{DataPhase, DeviceOpener, Direction, PassThrough, Request, TransportError};
pub use upload::{RowChunk, RowChunks, Strategy};
pub use wire::SystemInfo;

#[cfg(target_os = "linux")]
pub use sg::{SgDevice, SgOpener};
