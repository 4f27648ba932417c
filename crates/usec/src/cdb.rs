//! IT8951 vendor command descriptor blocks.
//!
//! Every command is a 16-byte CDB. Byte 0 is the vendor marker `0xFE`
//! (`0x12` for the standard SCSI inquiry), byte 6 carries the opcode and the
//! remaining bytes hold opcode-specific big-endian fields:
//!
//! | Offset | Field |
//! |--------|-------|
//! | 0      | marker (`0xFE`, or `0x12` for inquiry) |
//! | 2–5    | 32-bit address (memory / register commands) |
//! | 6      | opcode |
//! | 7–8    | 16-bit length, temperature option/value, or PMIC VCOM |
//! | 9–11   | PMIC flags (set VCOM, set power, power on/off) |
//!
//! Unlisted bytes are zero. Encoders never range-check their scalars.

use core::fmt;

use crate::endian::{to_wire_u16, to_wire_u32};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// CDB length used for every command.
pub const CDB_LEN: usize = 16;

/// Vendor command marker at byte 0.
pub const VENDOR_MARKER: u8 = 0xFE;

/// Standard SCSI INQUIRY operation code.
pub const INQUIRY: u8 = 0x12;

/// Get-system-info signature, ASCII `"8951"`.
const SYSTEM_INFO_SIGNATURE: [u8; 4] = *b"8951";

/// Register commands transfer one 32-bit word.
const REGISTER_WIDTH: u8 = 0x04;

/// VCOM argument meaning "read the current value, change nothing".
pub const VCOM_READ: u16 = 0xFFFF;

// ---------------------------------------------------------------------------
// Opcode
// ---------------------------------------------------------------------------

/// Command set understood by the controller.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    /// Standard SCSI inquiry; liveness probe only.
    Inquiry = INQUIRY,
    /// Read the 116-byte system info record.
    GetSystemInfo = 0x80,
    /// Read controller memory.
    ReadMemory = 0x81,
    /// Write controller memory.
    WriteMemory = 0x82,
    /// Read one 32-bit register.
    ReadRegister = 0x83,
    /// Write one 32-bit register.
    WriteRegister = 0x84,
    /// Refresh a display area from the image buffer.
    DisplayArea = 0x94,
    /// Load pixel rows into an image buffer area.
    LoadImageArea = 0xA2,
    /// PMIC control: power rails and VCOM.
    Pmic = 0xA3,
    /// Get or force the panel temperature.
    Temperature = 0xA4,
    /// Write controller memory, fast path.
    FastWriteMemory = 0xA5,
    /// Trigger a controller reset.
    AutoReset = 0xA7,
}

impl Opcode {
    /// Opcode byte placed at CDB offset 6 (offset 0 for inquiry).
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Short lowercase name for logs and error messages.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Inquiry => "inquiry",
            Self::GetSystemInfo => "get-system-info",
            Self::ReadMemory => "read-memory",
            Self::WriteMemory => "write-memory",
            Self::ReadRegister => "read-register",
            Self::WriteRegister => "write-register",
            Self::DisplayArea => "display-area",
            Self::LoadImageArea => "load-image-area",
            Self::Pmic => "pmic",
            Self::Temperature => "temperature",
            Self::FastWriteMemory => "fast-write-memory",
            Self::AutoReset => "auto-reset",
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which opcode memory writes use. Chosen once per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteOpcode {
    /// `0x82`.
    Normal,
    /// `0xA5`.
    #[default]
    Fast,
}

impl WriteOpcode {
    /// Resolve from the `fast_write` config flag.
    pub const fn from_fast_write(fast: bool) -> Self {
        if fast {
            Self::Fast
        } else {
            Self::Normal
        }
    }

    /// Opcode emitted by [`Cdb::write_memory`].
    pub const fn opcode(self) -> Opcode {
        match self {
            Self::Normal => Opcode::WriteMemory,
            Self::Fast => Opcode::FastWriteMemory,
        }
    }
}

/// Get/set selector for the temperature command (CDB byte 7).
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemperatureOption {
    /// Read the sensor.
    Get = 0,
    /// Force a temperature value.
    Set = 1,
}

/// PMIC control fields (CDB bytes 7–11).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PmicControl {
    /// VCOM in millivolts, or [`VCOM_READ`].
    pub vcom: u16,
    /// Apply `vcom`.
    pub set_vcom: bool,
    /// Apply `power_on`.
    pub set_power: bool,
    /// Power rail state when `set_power` is set.
    pub power_on: bool,
}

impl PmicControl {
    /// Read the current VCOM without changing anything.
    pub const READ_VCOM: Self = Self {
        vcom: VCOM_READ,
        set_vcom: false,
        set_power: false,
        power_on: false,
    };

    /// Power-off issued after every full refresh. The VCOM field is ignored
    /// by the controller when `set_vcom` is clear.
    pub const POWER_OFF: Self = Self {
        vcom: 2,
        set_vcom: false,
        set_power: true,
        power_on: false,
    };

    /// Set VCOM to `millivolts`.
    pub const fn set_vcom(millivolts: u16) -> Self {
        Self {
            vcom: millivolts,
            set_vcom: true,
            set_power: false,
            power_on: false,
        }
    }

    /// Switch the power rails on or off.
    pub const fn set_power(on: bool) -> Self {
        Self {
            vcom: 0,
            set_vcom: false,
            set_power: true,
            power_on: on,
        }
    }

    /// True when the reply carries a VCOM reading.
    pub const fn reads_vcom(&self) -> bool {
        self.vcom == VCOM_READ
    }
}

// ---------------------------------------------------------------------------
// Cdb
// ---------------------------------------------------------------------------

/// One encoded 16-byte command block. Built fresh for every call.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Cdb([u8; CDB_LEN]);

impl Cdb {
    /// Vendor CDB with the marker and `opcode` set, everything else zero.
    const fn vendor(opcode: Opcode) -> Self {
        let mut bytes = [0u8; CDB_LEN];
        bytes[0] = VENDOR_MARKER;
        bytes[6] = opcode.code();
        Self(bytes)
    }

    /// Vendor CDB with a big-endian address at bytes 2–5.
    fn addressed(opcode: Opcode, address: u32) -> Self {
        let mut cdb = Self::vendor(opcode);
        let [a, b, c, d] = to_wire_u32(address);
        cdb.0[2] = a;
        cdb.0[3] = b;
        cdb.0[4] = c;
        cdb.0[5] = d;
        cdb
    }

    /// Store a big-endian `u16` at bytes 7–8.
    fn with_u16_at_7(mut self, value: u16) -> Self {
        let [hi, lo] = to_wire_u16(value);
        self.0[7] = hi;
        self.0[8] = lo;
        self
    }

    /// Standard SCSI inquiry.
    pub const fn inquiry() -> Self {
        let mut bytes = [0u8; CDB_LEN];
        bytes[0] = INQUIRY;
        Self(bytes)
    }

    /// Get system info: signature `"8951"` at 2–5, `0x01` at 8, `0x02` at 10.
    pub fn system_info() -> Self {
        let mut cdb = Self::addressed(
            Opcode::GetSystemInfo,
            u32::from_be_bytes(SYSTEM_INFO_SIGNATURE),
        );
        cdb.0[8] = 0x01;
        cdb.0[10] = 0x02;
        cdb
    }

    /// Read `length` bytes of controller memory at `address`.
    pub fn read_memory(address: u32, length: u16) -> Self {
        Self::addressed(Opcode::ReadMemory, address).with_u16_at_7(length)
    }

    /// Write `length` bytes of controller memory at `address`.
    pub fn write_memory(write: WriteOpcode, address: u32, length: u16) -> Self {
        Self::addressed(write.opcode(), address).with_u16_at_7(length)
    }

    /// Read the register at `address`.
    pub fn read_register(address: u32) -> Self {
        let mut cdb = Self::addressed(Opcode::ReadRegister, address);
        cdb.0[8] = REGISTER_WIDTH;
        cdb
    }

    /// Write the register at `address`.
    pub fn write_register(address: u32) -> Self {
        let mut cdb = Self::addressed(Opcode::WriteRegister, address);
        cdb.0[8] = REGISTER_WIDTH;
        cdb
    }

    /// Display area; the rectangle travels in the data phase.
    pub const fn display_area() -> Self {
        Self::vendor(Opcode::DisplayArea)
    }

    /// Load image area; header and rows travel in the data phase.
    pub const fn load_image_area() -> Self {
        Self::vendor(Opcode::LoadImageArea)
    }

    /// Get or set the temperature.
    pub const fn temperature(option: TemperatureOption, value: u8) -> Self {
        let mut cdb = Self::vendor(Opcode::Temperature);
        cdb.0[7] = option as u8;
        cdb.0[8] = value;
        cdb
    }

    /// PMIC control.
    pub fn pmic(control: PmicControl) -> Self {
        let mut cdb = Self::vendor(Opcode::Pmic).with_u16_at_7(control.vcom);
        cdb.0[9] = u8::from(control.set_vcom);
        cdb.0[10] = u8::from(control.set_power);
        cdb.0[11] = u8::from(control.power_on);
        cdb
    }

    /// Controller reset.
    pub const fn auto_reset() -> Self {
        Self::vendor(Opcode::AutoReset)
    }

    /// Raw command bytes.
    pub const fn as_bytes(&self) -> &[u8; CDB_LEN] {
        &self.0
    }

    /// Decoded opcode, if the block carries a known one.
    pub fn opcode(&self) -> Option<Opcode> {
        let [marker, _, _, _, _, _, code, ..] = self.0;
        if marker == INQUIRY {
            return Some(Opcode::Inquiry);
        }
        if marker != VENDOR_MARKER {
            return None;
        }
        Some(match code {
            0x80 => Opcode::GetSystemInfo,
            0x81 => Opcode::ReadMemory,
            0x82 => Opcode::WriteMemory,
            0x83 => Opcode::ReadRegister,
            0x84 => Opcode::WriteRegister,
            0x94 => Opcode::DisplayArea,
            0xA2 => Opcode::LoadImageArea,
            0xA3 => Opcode::Pmic,
            0xA4 => Opcode::Temperature,
            0xA5 => Opcode::FastWriteMemory,
            0xA7 => Opcode::AutoReset,
            _ => return None,
        })
    }

    /// Big-endian address at bytes 2–5.
    pub fn address(&self) -> u32 {
        let [_, _, a, b, c, d, ..] = self.0;
        u32::from_be_bytes([a, b, c, d])
    }

    /// Big-endian `u16` at bytes 7–8 (length or VCOM).
    pub fn length(&self) -> u16 {
        let [_, _, _, _, _, _, _, hi, lo, ..] = self.0;
        u16::from_be_bytes([hi, lo])
    }
}

impl fmt::Debug for Cdb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cdb(")?;
        for (i, byte) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{byte:02X}")?;
        }
        f.write_str(")")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::arithmetic_side_effects,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;

    fn bytes(cdb: Cdb) -> [u8; CDB_LEN] {
        *cdb.as_bytes()
    }

    #[test]
    fn inquiry_is_standard_scsi_with_zero_tail() {
        let mut expected = [0u8; 16];
        expected[0] = 0x12;
        assert_eq!(bytes(Cdb::inquiry()), expected);
    }

    #[test]
    fn system_info_carries_signature_and_flags() {
        assert_eq!(
            bytes(Cdb::system_info()),
            [
                0xFE, 0x00, 0x38, 0x39, 0x35, 0x31, 0x80, 0x00, 0x01, 0x00, 0x02, 0x00, 0x00,
                0x00, 0x00, 0x00
            ]
        );
    }

    #[test]
    fn memory_commands_encode_address_and_length_big_endian() {
        let read = bytes(Cdb::read_memory(0x0012_3456, 0xF000));
        assert_eq!(
            read,
            [0xFE, 0, 0x00, 0x12, 0x34, 0x56, 0x81, 0xF0, 0x00, 0, 0, 0, 0, 0, 0, 0]
        );

        let fast = bytes(Cdb::write_memory(WriteOpcode::Fast, 0xAABB_CCDD, 0x0102));
        assert_eq!(
            fast,
            [0xFE, 0, 0xAA, 0xBB, 0xCC, 0xDD, 0xA5, 0x01, 0x02, 0, 0, 0, 0, 0, 0, 0]
        );

        let normal = Cdb::write_memory(WriteOpcode::Normal, 1, 2);
        assert_eq!(normal.opcode(), Some(Opcode::WriteMemory));
        assert_eq!(normal.address(), 1);
        assert_eq!(normal.length(), 2);
    }

    #[test]
    fn register_commands_set_width_byte() {
        let read = bytes(Cdb::read_register(0x1800_1138));
        assert_eq!(
            read,
            [0xFE, 0, 0x18, 0x00, 0x11, 0x38, 0x83, 0, 0x04, 0, 0, 0, 0, 0, 0, 0]
        );
        let write = bytes(Cdb::write_register(0x1800_1138));
        assert_eq!(write[6], 0x84);
        assert_eq!(write[8], 0x04);
        assert_eq!(write[7], 0x00);
    }

    #[test]
    fn argument_in_data_phase_commands_only_set_marker_and_opcode() {
        for (cdb, op) in [
            (Cdb::display_area(), 0x94),
            (Cdb::load_image_area(), 0xA2),
            (Cdb::auto_reset(), 0xA7),
        ] {
            let mut expected = [0u8; 16];
            expected[0] = 0xFE;
            expected[6] = op;
            assert_eq!(bytes(cdb), expected);
        }
    }

    #[test]
    fn temperature_places_option_and_value() {
        let get = bytes(Cdb::temperature(TemperatureOption::Get, 0));
        assert_eq!(&get[6..9], &[0xA4, 0x00, 0x00]);
        let set = bytes(Cdb::temperature(TemperatureOption::Set, 25));
        assert_eq!(&set[6..9], &[0xA4, 0x01, 25]);
    }

    #[test]
    fn pmic_encodes_vcom_high_byte_first_then_flags() {
        let cdb = bytes(Cdb::pmic(PmicControl::set_vcom(0x0834)));
        assert_eq!(
            cdb,
            [0xFE, 0, 0, 0, 0, 0, 0xA3, 0x08, 0x34, 1, 0, 0, 0, 0, 0, 0]
        );

        let off = bytes(Cdb::pmic(PmicControl::POWER_OFF));
        assert_eq!(&off[6..12], &[0xA3, 0x00, 0x02, 0, 1, 0]);

        let read = bytes(Cdb::pmic(PmicControl::READ_VCOM));
        assert_eq!(&read[7..12], &[0xFF, 0xFF, 0, 0, 0]);
    }

    #[test]
    fn write_opcode_resolves_from_flag() {
        assert_eq!(WriteOpcode::from_fast_write(true).opcode().code(), 0xA5);
        assert_eq!(WriteOpcode::from_fast_write(false).opcode().code(), 0x82);
    }

    #[test]
    fn opcode_round_trips_through_decoder() {
        assert_eq!(Cdb::inquiry().opcode(), Some(Opcode::Inquiry));
        assert_eq!(Cdb::system_info().opcode(), Some(Opcode::GetSystemInfo));
        assert_eq!(Cdb::auto_reset().opcode(), Some(Opcode::AutoReset));
    }
}
