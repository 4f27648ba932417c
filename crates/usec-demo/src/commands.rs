//! Demo commands. Each takes an open session over any transport, so the
//! same code drives the device nodes and the `--dry-run` bus.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use usec::{PassThrough, Session, UpdateMode};

use crate::frames;

/// Print per-panel geometry, temperature and VCOM.
pub fn info<D: PassThrough>(session: &mut Session<D>) -> Result<()> {
    for (panel, geometry) in session.geometries().iter().enumerate() {
        println!(
            "[status] panel {panel}: {}x{}, image buffer at {:#010x}",
            geometry.width, geometry.height, geometry.image_base
        );
    }

    let celsius = session
        .get_temperature()
        .context("cannot read temperature value")?;
    println!("[status] screen temperature: {celsius} [degC]");

    let vcom = session.get_vcom().context("cannot read VCOM value")?;
    #[allow(clippy::arithmetic_side_effects)] // float division, display only
    let volts = f32::from(vcom) / 1000.0;
    println!("[status] screen VCOM: -{volts:.2} [V]");
    Ok(())
}

/// Full-screen INIT update without waiting for the display engine.
pub fn clear<D: PassThrough>(session: &mut Session<D>) -> Result<()> {
    session
        .update_display(UpdateMode::Init, false)
        .context("cannot clear screen")
}

/// Load `path`, upload it and refresh with `mode`.
pub fn show<D: PassThrough>(session: &mut Session<D>, path: &Path, mode: UpdateMode) -> Result<()> {
    let frame = frames::load(path)?;
    println!(
        "[demo] input image resolution: {}x{}",
        frame.width, frame.height
    );

    let expected = session
        .composite_len()
        .context("screen size does not fit in memory")?;
    frame.check_len(expected)?;

    println!("[demo] uploading '{}' image", path.display());
    session
        .upload_image(&frame.pixels)
        .with_context(|| format!("cannot upload '{}' image", path.display()))?;

    println!("[demo] displaying '{}' image", path.display());
    session
        .update_display(mode, false)
        .with_context(|| format!("cannot display '{}' image", path.display()))
}

/// Status, clear, every image in `images` with GC16, pause, clear.
///
/// An image that fails to show is reported and skipped.
pub fn demo<D: PassThrough>(session: &mut Session<D>, images: &Path, pause: Duration) -> Result<()> {
    info(session)?;
    clear(session)?;

    let paths = frames::scan_images(images)?;
    if paths.is_empty() {
        tracing::warn!(dir = %images.display(), "no .png or .bmp images found");
    }
    for path in &paths {
        if let Err(err) = show(session, path, UpdateMode::Gc16) {
            eprintln!("[error] {err:#}");
        }
    }

    std::thread::sleep(pause);
    clear(session)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};
    use usec::mocks::{MockBus, MockDevice};
    use usec::{Opcode, SessionConfig};

    /// Four 8 × 4 panels: a 16 × 8 image fills the composite frame.
    fn small_screen() -> (MockBus, Session<MockDevice>) {
        let bus = MockBus::with_geometry(8, 4);
        let session = Session::open_with(&mut bus.opener(), SessionConfig::default()).unwrap();
        bus.clear_calls();
        (bus, session)
    }

    fn write_image(dir: &Path, name: &str, width: u32, height: u32, level: u8) {
        GrayImage::from_pixel(width, height, Luma([level]))
            .save(dir.join(name))
            .unwrap();
    }

    #[test]
    fn show_uploads_and_refreshes() {
        let (bus, mut session) = small_screen();
        let dir = tempfile::tempdir().unwrap();
        write_image(dir.path(), "grey.png", 16, 8, 0x80);

        show(&mut session, &dir.path().join("grey.png"), UpdateMode::Du).unwrap();

        for panel in 0..4 {
            assert_eq!(bus.memory(panel), vec![0x80u8; 32]);
        }
        assert_eq!(bus.calls_for(Opcode::DisplayArea).len(), 4);
        assert_eq!(bus.calls_for(Opcode::Pmic).len(), 1);
    }

    #[test]
    fn show_rejects_images_of_the_wrong_size() {
        let (bus, mut session) = small_screen();
        let dir = tempfile::tempdir().unwrap();
        write_image(dir.path(), "small.png", 4, 4, 0);

        let err = show(&mut session, &dir.path().join("small.png"), UpdateMode::Gc16)
            .unwrap_err();
        assert!(err.to_string().contains("screen takes 128 bytes"));
        assert!(bus.calls().is_empty());
    }

    #[test]
    fn demo_shows_every_image_between_two_clears() {
        let (bus, mut session) = small_screen();
        let dir = tempfile::tempdir().unwrap();
        write_image(dir.path(), "img_1.png", 16, 8, 0x10);
        write_image(dir.path(), "img_2.png", 16, 8, 0x20);
        write_image(dir.path(), "img_3.bmp", 3, 3, 0x30);

        demo(&mut session, dir.path(), Duration::ZERO).unwrap();

        // Two clears and two good images; the 3 × 3 image is skipped.
        assert_eq!(bus.calls_for(Opcode::DisplayArea).len(), 4 * 4);
        assert_eq!(bus.memory(3), vec![0x20u8; 32]);
    }

    #[test]
    fn info_reads_sensor_panel() {
        let (bus, mut session) = small_screen();
        info(&mut session).unwrap();
        assert!(bus
            .calls()
            .iter()
            .all(|call| call.panel == usec::SENSOR_PANEL));
    }
}
