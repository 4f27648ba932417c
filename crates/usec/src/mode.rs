//! Waveform update modes and pixel depths.

use core::fmt;
use core::str::FromStr;

use crate::error::UsecError;

/// Waveform used by a display-area refresh. The discriminant is the wire value.
///
/// Mode choice is the caller's responsibility; the session forwards it as-is.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum UpdateMode {
    /// INIT - full erase to white.
    ///
    /// Use whenever the image buffer may not match the optical state of the
    /// panel, e.g. after power-up, before trusting any content.
    Init = 0,

    /// DU - Direct Update
    ///
    /// - **Grayscale**: black & white targets only
    /// - **Flashing**: none
    ///
    /// Very fast. Transitions from any gray to black or white.
    Du = 1,

    /// GC16 - Grayscale Clearing 16-level
    ///
    /// - **Grayscale**: 16 levels
    /// - **Flashing**: full-screen flash
    ///
    /// Highest quality. Default for whole-image refresh.
    #[default]
    Gc16 = 2,

    /// GL16 - Grayscale 16-level, reduced flash
    ///
    /// Sparse content (anti-aliased text) on a white background.
    Gl16 = 3,

    /// A2 - Animation mode
    ///
    /// - **Grayscale**: black & white only
    /// - **Flashing**: none
    ///
    /// Fast paging and simple animation.
    A2 = 4,

    /// DU4 - Direct Update 4-level
    ///
    /// Fast like DU but supports gray-to-gray transitions.
    Du4 = 5,
}

impl UpdateMode {
    /// Every mode in wire order.
    pub const ALL: [Self; 6] = [
        Self::Init,
        Self::Du,
        Self::Gc16,
        Self::Gl16,
        Self::A2,
        Self::Du4,
    ];

    /// Wire value sent in the display-area argument.
    pub const fn wire(self) -> u32 {
        self as u32
    }

    /// Upper-case mode name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Init => "INIT",
            Self::Du => "DU",
            Self::Gc16 => "GC16",
            Self::Gl16 => "GL16",
            Self::A2 => "A2",
            Self::Du4 => "DU4",
        }
    }
}

impl TryFrom<u8> for UpdateMode {
    type Error = UsecError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .iter()
            .copied()
            .find(|mode| *mode as u8 == value)
            .ok_or(UsecError::InvalidMode(value))
    }
}

impl fmt::Display for UpdateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for UpdateMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|mode| mode.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown update mode '{s}' (init, du, gc16, gl16, a2, du4)"))
    }
}

/// Pixel formats the controller's image buffer can hold.
///
/// Only [`PixelDepth::Bpp8`] is wired into upload and refresh; the narrower
/// depths are declared for completeness.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PixelDepth {
    /// 1 bit per pixel.
    Bpp1 = 0,
    /// 2 bits per pixel.
    Bpp2 = 1,
    /// 4 bits per pixel.
    Bpp4 = 2,
    /// 8 bits per pixel, one byte per pixel.
    #[default]
    Bpp8 = 3,
}

impl PixelDepth {
    /// Bits per pixel.
    pub const fn bits(self) -> u8 {
        match self {
            Self::Bpp1 => 1,
            Self::Bpp2 => 2,
            Self::Bpp4 => 4,
            Self::Bpp8 => 8,
        }
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
    fn wire_values_follow_declaration_order() {
        for (i, mode) in UpdateMode::ALL.iter().enumerate() {
            assert_eq!(mode.wire(), u32::try_from(i).unwrap());
        }
    }

    #[test]
    fn try_from_accepts_zero_to_five_only() {
        assert_eq!(UpdateMode::try_from(2).unwrap(), UpdateMode::Gc16);
        assert_eq!(UpdateMode::try_from(5).unwrap(), UpdateMode::Du4);
        assert!(matches!(
            UpdateMode::try_from(6),
            Err(UsecError::InvalidMode(6))
        ));
        assert!(matches!(
            UpdateMode::try_from(255),
            Err(UsecError::InvalidMode(255))
        ));
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("gc16".parse::<UpdateMode>().unwrap(), UpdateMode::Gc16);
        assert_eq!("INIT".parse::<UpdateMode>().unwrap(), UpdateMode::Init);
        assert!("gc4".parse::<UpdateMode>().is_err());
    }

    #[test]
    fn pixel_depth_default_is_eight_bits() {
        assert_eq!(PixelDepth::default().bits(), 8);
        assert_eq!(PixelDepth::Bpp8 as u8, 3);
    }
}
