//! Image upload engine.
//!
//! A composite 8 bpp framebuffer is split across the panels in index order
//! (panel 0's `width × height` bytes first, then panel 1's, ...). Within a
//! panel, rows travel in chunks of `max_transfer / width` rows, the last chunk
//! holding the remainder.
//!
//! Two transfer strategies, chosen per area:
//!
//! | Condition | Command | Destination |
//! |-----------|---------|-------------|
//! | `width <= 2048 && width != native width` | load-image-area | header `{base, x, y + row, width, rows}` + rows |
//! | otherwise (full width, or wider than 2048) | write-memory | `base + x + (y + row) × native width` |
//!
//! Chunk results are accumulated; a failed chunk does not stop the remaining
//! chunks of its panel, but a failed panel stops the upload.

use crate::cdb::Opcode;
use crate::commands::{Area, PanelCommands};
use crate::config::LOAD_IMAGE_MAX_WIDTH;
use crate::error::UsecError;
use crate::session::{PanelGeometry, Session, ALL_PANELS};
use crate::status::Outcome;
use crate::transport::PassThrough;

// ---------------------------------------------------------------------------
// Row chunking
// ---------------------------------------------------------------------------

/// One chunk of consecutive rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowChunk {
    /// First row, relative to the area's top edge.
    pub first_row: u32,
    /// Rows in this chunk; at least 1.
    pub rows: u32,
}

/// Splits `height` rows into chunks that fit one transfer.
///
/// Chunks cover every row exactly once, in increasing order.
#[derive(Debug, Clone)]
pub struct RowChunks {
    height: u32,
    rows_per_chunk: u32,
    next: u32,
}

impl RowChunks {
    /// Plan chunks for rows of `width` bytes under a `max_transfer` ceiling.
    ///
    /// A zero-width area has nothing to send and yields no chunks.
    pub fn new(width: u32, height: u32, max_transfer: u32) -> Result<Self, UsecError> {
        let Some(rows_per_chunk) = max_transfer.checked_div(width) else {
            return Ok(Self {
                height: 0,
                rows_per_chunk: 1,
                next: 0,
            });
        };
        if rows_per_chunk == 0 {
            return Err(UsecError::RowTooWide {
                width,
                max_transfer,
            });
        }
        Ok(Self {
            height,
            rows_per_chunk,
            next: 0,
        })
    }

    /// Rows in every chunk but possibly the last.
    pub fn rows_per_chunk(&self) -> u32 {
        self.rows_per_chunk
    }
}

impl Iterator for RowChunks {
    type Item = RowChunk;

    fn next(&mut self) -> Option<RowChunk> {
        let remaining = self.height.checked_sub(self.next).filter(|r| *r > 0)?;
        let chunk = RowChunk {
            first_row: self.next,
            rows: remaining.min(self.rows_per_chunk),
        };
        self.next = self.next.saturating_add(chunk.rows);
        Some(chunk)
    }
}

// ---------------------------------------------------------------------------
// Strategy
// ---------------------------------------------------------------------------

/// How an area's rows reach the image buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Load-image-area with a positioned header per chunk.
    LoadImageArea,
    /// Raw memory writes at linear addresses.
    WriteMemory,
}

impl Strategy {
    /// Pick the strategy for rows `width` pixels wide on a panel
    /// `native_width` pixels wide.
    pub const fn select(width: u32, native_width: u32) -> Self {
        if width <= LOAD_IMAGE_MAX_WIDTH && width != native_width {
            Self::LoadImageArea
        } else {
            Self::WriteMemory
        }
    }
}

/// Linear image buffer address of pixel `(x, y)`.
fn linear_address(panel: usize, geometry: PanelGeometry, x: u32, y: u32) -> Result<u32, UsecError> {
    y.checked_mul(geometry.width)
        .and_then(|offset| offset.checked_add(x))
        .and_then(|offset| offset.checked_add(geometry.image_base))
        .ok_or(UsecError::AddressOverflow { panel })
}

/// Checked plan for one area: everything a caller can get wrong is rejected
/// here, before the first transfer.
struct AreaPlan {
    area: Area,
    strategy: Strategy,
    chunks: RowChunks,
    row_len: usize,
}

impl AreaPlan {
    fn new(
        panel: usize,
        geometry: PanelGeometry,
        area: Area,
        pixels: usize,
        max_transfer: u32,
    ) -> Result<Self, UsecError> {
        let expected = area.pixels().ok_or(UsecError::LengthOverflow { len: pixels })?;
        if pixels != expected {
            return Err(UsecError::BufferLength {
                expected,
                actual: pixels,
            });
        }
        let strategy = Strategy::select(area.width, geometry.width);
        let chunks = RowChunks::new(area.width, area.height, max_transfer)?;
        if strategy == Strategy::WriteMemory && area.height > 0 {
            let last_row = area
                .y
                .checked_add(area.height.saturating_sub(1))
                .ok_or(UsecError::AddressOverflow { panel })?;
            linear_address(panel, geometry, area.x, last_row)?;
        }
        let row_len = usize::try_from(area.width)
            .map_err(|_| UsecError::LengthOverflow { len: pixels })?;
        Ok(Self {
            area,
            strategy,
            chunks,
            row_len,
        })
    }

    fn opcode<D: PassThrough>(&self, commands: &PanelCommands<'_, D>) -> Opcode {
        match self.strategy {
            Strategy::LoadImageArea => Opcode::LoadImageArea,
            Strategy::WriteMemory => commands.write.opcode(),
        }
    }

    /// Send every chunk, recording each result.
    fn run<D: PassThrough>(self, commands: &mut PanelCommands<'_, D>, pixels: &[u8]) -> Outcome {
        let panel = commands.panel();
        let geometry = commands.geometry();
        let mut outcome = Outcome::new(self.opcode(commands));

        for chunk in self.chunks.clone() {
            let result = self.chunk_bytes(pixels, chunk).and_then(|rows| {
                let y = self
                    .area
                    .y
                    .checked_add(chunk.first_row)
                    .ok_or(UsecError::AddressOverflow { panel })?;
                match self.strategy {
                    Strategy::LoadImageArea => commands.load_image_area(
                        Area {
                            x: self.area.x,
                            y,
                            width: self.area.width,
                            height: chunk.rows,
                        },
                        rows,
                    ),
                    Strategy::WriteMemory => {
                        let address = linear_address(panel, geometry, self.area.x, y)?;
                        commands.write_mem(address, rows)
                    }
                }
            });
            tracing::trace!(
                panel,
                first_row = chunk.first_row,
                rows = chunk.rows,
                ok = result.is_ok(),
                "chunk"
            );
            outcome.record(panel, result);
        }
        outcome
    }

    fn chunk_bytes<'p>(&self, pixels: &'p [u8], chunk: RowChunk) -> Result<&'p [u8], UsecError> {
        let overflow = || UsecError::LengthOverflow { len: pixels.len() };
        let first = usize::try_from(chunk.first_row).map_err(|_| overflow())?;
        let rows = usize::try_from(chunk.rows).map_err(|_| overflow())?;
        let start = first.checked_mul(self.row_len).ok_or_else(overflow)?;
        let len = rows.checked_mul(self.row_len).ok_or_else(overflow)?;
        let end = start.checked_add(len).ok_or_else(overflow)?;
        pixels.get(start..end).ok_or_else(overflow)
    }
}

// ---------------------------------------------------------------------------
// Session entry points
// ---------------------------------------------------------------------------

impl<D: PassThrough> Session<D> {
    /// Upload one composite 8 bpp framebuffer to all panels.
    ///
    /// `image` must be exactly the sum of every panel's `width × height`
    /// (`4 × W × H` for identical panels); anything else is rejected before
    /// any I/O. Panels are written in index order; the first panel with a
    /// failed chunk ends the upload.
    pub fn upload_image(&mut self, image: &[u8]) -> Result<(), UsecError> {
        let expected = self
            .composite_len()
            .ok_or(UsecError::LengthOverflow { len: image.len() })?;
        if image.len() != expected {
            return Err(UsecError::BufferLength {
                expected,
                actual: image.len(),
            });
        }
        if !self.is_open() {
            return Err(UsecError::Closed);
        }

        let max_transfer = self.config().max_transfer_bytes;
        let mut plans = Vec::with_capacity(ALL_PANELS.len());
        let mut cursor = 0usize;
        for index in ALL_PANELS {
            let geometry = self.geometry(index)?;
            let frame_len = geometry
                .frame_len()
                .ok_or(UsecError::LengthOverflow { len: image.len() })?;
            let end = cursor
                .checked_add(frame_len)
                .ok_or(UsecError::LengthOverflow { len: image.len() })?;
            let plan = AreaPlan::new(index, geometry, Area::full(geometry), frame_len, max_transfer)?;
            plans.push((index, plan, cursor..end));
            cursor = end;
        }

        for (index, plan, range) in plans {
            let frame = image.get(range).ok_or(UsecError::BufferLength {
                expected,
                actual: image.len(),
            })?;
            let mut commands = self.panel(index)?;
            let outcome = plan.run(&mut commands, frame);
            if let Err(err) = outcome.into_result() {
                tracing::warn!(panel = index, error = %err, "image upload failed");
                return Err(err);
            }
            tracing::info!(panel = index, bytes = frame.len(), "image part uploaded");
        }
        Ok(())
    }

    /// Upload `pixels` (8 bpp, `area.width × area.height` bytes) into panel
    /// `index`'s image buffer at `area`, picking the transfer strategy from
    /// the area width. Every chunk is attempted.
    pub fn upload_area(&mut self, index: usize, area: Area, pixels: &[u8]) -> Result<(), UsecError> {
        let max_transfer = self.config().max_transfer_bytes;
        let geometry = self.geometry(index)?;
        let plan = AreaPlan::new(index, geometry, area, pixels.len(), max_transfer)?;
        let mut commands = self.panel(index)?;
        plan.run(&mut commands, pixels).into_result()
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

    fn collect(width: u32, height: u32, max: u32) -> Vec<(u32, u32)> {
        RowChunks::new(width, height, max)
            .unwrap()
            .map(|c| (c.first_row, c.rows))
            .collect()
    }

    #[test]
    fn full_width_panel_chunks_to_transfer_ceiling() {
        // 61440 / 720 = 85 rows per chunk; 640 = 7 × 85 + 45.
        let chunks = collect(720, 640, 61_440);
        assert_eq!(chunks.len(), 8);
        assert_eq!(chunks.first(), Some(&(0, 85)));
        assert_eq!(chunks.last(), Some(&(595, 45)));
    }

    #[test]
    fn exact_multiple_has_no_short_tail() {
        let chunks = collect(1024, 120, 61_440);
        assert_eq!(chunks, vec![(0, 60), (60, 60)]);
    }

    #[test]
    fn row_wider_than_ceiling_is_rejected() {
        assert!(matches!(
            RowChunks::new(70_000, 1, 61_440),
            Err(UsecError::RowTooWide { width: 70_000, .. })
        ));
    }

    #[test]
    fn empty_areas_yield_nothing() {
        assert!(collect(0, 640, 61_440).is_empty());
        assert!(collect(720, 0, 61_440).is_empty());
    }

    #[test]
    fn strategy_follows_width_rule() {
        assert_eq!(Strategy::select(720, 720), Strategy::WriteMemory);
        assert_eq!(Strategy::select(360, 720), Strategy::LoadImageArea);
        assert_eq!(Strategy::select(2048, 4096), Strategy::LoadImageArea);
        assert_eq!(Strategy::select(2049, 4096), Strategy::WriteMemory);
    }

    #[test]
    fn linear_address_uses_native_stride() {
        let geometry = PanelGeometry {
            width: 720,
            height: 640,
            image_base: 0x0012_0000,
        };
        assert_eq!(
            linear_address(0, geometry, 0, 85).unwrap(),
            0x0012_0000 + 85 * 720
        );
        assert!(matches!(
            linear_address(1, geometry, 0, u32::MAX),
            Err(UsecError::AddressOverflow { panel: 1 })
        ));
    }
}
