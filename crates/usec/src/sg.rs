//! Linux SCSI generic (`SG_IO`) pass-through.
//!
//! Each panel is a device node (`/dev/eink_usec_312BWN0_N`) bound to the `sg`
//! or block layer. One [`Request`] maps to one `ioctl(fd, SG_IO, &hdr)` with a
//! freshly built `sg_io_hdr`.

use std::fs::{File, OpenOptions};
use std::io;
use std::os::fd::AsRawFd;
use std::path::Path;
use std::ptr;

use libc::{c_int, c_uchar, c_uint, c_ushort, c_void};

use crate::cdb::CDB_LEN;
use crate::transport::{DataPhase, DeviceOpener, PassThrough, Request, TransportError};

// ---------------------------------------------------------------------------
// <scsi/sg.h>
// ---------------------------------------------------------------------------

/// ioctl request number; its C type differs between libc flavours.
const SG_IO: u32 = 0x2285;

const SG_INTERFACE_ID: c_int = b'S' as c_int;

#[allow(clippy::cast_possible_truncation)] // CDB_LEN is 16
const CMD_LEN: c_uchar = CDB_LEN as c_uchar;

const SG_DXFER_NONE: c_int = -1;
const SG_DXFER_TO_DEV: c_int = -2;
const SG_DXFER_FROM_DEV: c_int = -3;

/// Suppress LUN insertion into byte 1 of the CDB.
const SG_FLAG_LUN_INHIBIT: c_uint = 2;

/// `struct sg_io_hdr` from `<scsi/sg.h>`.
#[repr(C)]
#[allow(dead_code)] // most fields are only read by the kernel
struct SgIoHdr {
    interface_id: c_int,
    dxfer_direction: c_int,
    cmd_len: c_uchar,
    mx_sb_len: c_uchar,
    iovec_count: c_ushort,
    dxfer_len: c_uint,
    dxferp: *mut c_void,
    cmdp: *const c_uchar,
    sbp: *mut c_uchar,
    timeout: c_uint,
    flags: c_uint,
    pack_id: c_int,
    usr_ptr: *mut c_void,
    status: c_uchar,
    masked_status: c_uchar,
    msg_status: c_uchar,
    sb_len_wr: c_uchar,
    host_status: c_ushort,
    driver_status: c_ushort,
    resid: c_int,
    duration: c_uint,
    info: c_uint,
}

// ---------------------------------------------------------------------------
// SgDevice
// ---------------------------------------------------------------------------

/// One panel's device node, opened read/write.
///
/// The file descriptor is closed when the value is dropped.
#[derive(Debug)]
pub struct SgDevice {
    file: File,
    panel: usize,
}

impl SgDevice {
    /// Open `path` read/write.
    pub fn open(panel: usize, path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        tracing::debug!(panel, path = %path.display(), "sg device opened");
        Ok(Self { file, panel })
    }
}

impl PassThrough for SgDevice {
    fn execute(&mut self, request: Request<'_>) -> Result<(), TransportError> {
        let Request {
            cdb,
            data,
            sense,
            timeout,
        } = request;

        let len = data.len();
        let dxfer_len = c_uint::try_from(len).map_err(|_| TransportError::PayloadTooLarge(len))?;
        let (dxfer_direction, dxferp) = match data {
            DataPhase::None => (SG_DXFER_NONE, ptr::null_mut()),
            // The kernel only reads through dxferp for TO_DEV transfers.
            DataPhase::ToDevice(buf) => (SG_DXFER_TO_DEV, buf.as_ptr().cast_mut().cast::<c_void>()),
            DataPhase::FromDevice(buf) => (SG_DXFER_FROM_DEV, buf.as_mut_ptr().cast::<c_void>()),
        };

        let mut hdr = SgIoHdr {
            interface_id: SG_INTERFACE_ID,
            dxfer_direction,
            cmd_len: CMD_LEN,
            // mx_sb_len is one byte wide.
            mx_sb_len: c_uchar::try_from(sense.len()).unwrap_or(c_uchar::MAX),
            iovec_count: 0,
            dxfer_len,
            dxferp,
            cmdp: cdb.as_bytes().as_ptr(),
            sbp: sense.as_mut_ptr(),
            timeout: c_uint::try_from(timeout.as_millis()).unwrap_or(c_uint::MAX),
            flags: SG_FLAG_LUN_INHIBIT,
            pack_id: 0,
            usr_ptr: ptr::null_mut(),
            status: 0,
            masked_status: 0,
            msg_status: 0,
            sb_len_wr: 0,
            host_status: 0,
            driver_status: 0,
            resid: 0,
            duration: 0,
            info: 0,
        };

        // SAFETY: `hdr` is a valid `sg_io_hdr`. Every pointer in it refers to
        // a buffer borrowed for the duration of this call (`cdb`, `data`,
        // `sense`) and each length field matches its buffer, clamped where the
        // field is narrower. SG_IO is synchronous, so the kernel holds no
        // reference after `ioctl` returns.
        let rc = unsafe { libc::ioctl(self.file.as_raw_fd(), SG_IO as _, ptr::addr_of_mut!(hdr)) };
        if rc < 0 {
            let err = io::Error::last_os_error();
            tracing::debug!(panel = self.panel, error = %err, "SG_IO failed");
            return Err(TransportError::Io(err));
        }

        tracing::trace!(
            panel = self.panel,
            status = hdr.status,
            host_status = hdr.host_status,
            driver_status = hdr.driver_status,
            duration_ms = hdr.duration,
            "SG_IO complete"
        );
        Ok(())
    }
}

/// Opens panels as [`SgDevice`]s.
#[derive(Debug, Default, Clone, Copy)]
pub struct SgOpener;

impl DeviceOpener for SgOpener {
    type Device = SgDevice;

    fn open(&mut self, panel: usize, path: &Path) -> io::Result<SgDevice> {
        SgDevice::open(panel, path)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
