//! Image files to 8 bpp frames.
//!
//! Any format the `image` crate decodes is accepted; pixels are converted to
//! 8-bit luma and kept row-major, which is the composite layout the session
//! uploads as-is.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use walkdir::WalkDir;

const IMAGE_EXTENSIONS: &[&str] = &["png", "bmp"];

/// One decoded grayscale image.
pub struct Frame {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl Frame {
    /// Fail with a readable message unless the frame is exactly `expected`
    /// bytes.
    pub fn check_len(&self, expected: usize) -> Result<()> {
        if self.pixels.len() != expected {
            bail!(
                "'{}' is {}x{} ({} bytes) but the screen takes {} bytes",
                self.path.display(),
                self.width,
                self.height,
                self.pixels.len(),
                expected
            );
        }
        Ok(())
    }
}

/// Decode `path` and convert it to 8-bit grayscale.
pub fn load(path: &Path) -> Result<Frame> {
    let decoded =
        image::open(path).with_context(|| format!("cannot load '{}' image", path.display()))?;
    let gray = decoded.to_luma8();
    let (width, height) = gray.dimensions();
    Ok(Frame {
        path: path.to_path_buf(),
        width,
        height,
        pixels: gray.into_raw(),
    })
}

/// Every `.png`/`.bmp` below `dir`, sorted by file name.
pub fn scan_images(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in WalkDir::new(dir).follow_links(true).sort_by_file_name() {
        let entry = entry.with_context(|| format!("cannot read '{}'", dir.display()))?;
        if entry.file_type().is_file() && is_image(entry.path()) {
            paths.push(entry.into_path());
        }
    }
    Ok(paths)
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
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
    use image::{GrayImage, Luma, Rgb, RgbImage};

    #[test]
    fn color_images_are_converted_to_luma() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("white.png");
        RgbImage::from_pixel(6, 2, Rgb([255, 255, 255]))
            .save(&path)
            .unwrap();

        let frame = load(&path).unwrap();
        assert_eq!((frame.width, frame.height), (6, 2));
        assert_eq!(frame.pixels, vec![255u8; 12]);
    }

    #[test]
    fn rows_stay_in_row_major_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ramp.bmp");
        GrayImage::from_fn(3, 2, |x, y| Luma([u8::try_from(x + 3 * y).unwrap() * 10]))
            .save(&path)
            .unwrap();

        let frame = load(&path).unwrap();
        assert_eq!(frame.pixels, vec![0, 10, 20, 30, 40, 50]);
    }

    #[test]
    fn size_mismatch_names_the_file() {
        let frame = Frame {
            path: PathBuf::from("images/img_1.png"),
            width: 10,
            height: 10,
            pixels: vec![0; 100],
        };
        frame.check_len(100).unwrap();
        let message = frame.check_len(1_843_200).unwrap_err().to_string();
        assert!(message.contains("img_1.png"));
        assert!(message.contains("1843200"));
    }

    #[test]
    fn scan_keeps_images_sorted_by_name() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["img_3.png", "img_1.PNG", "notes.txt", "img_2.bmp"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }

        let names: Vec<String> = scan_images(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["img_1.PNG", "img_2.bmp", "img_3.png"]);
    }

    #[test]
    fn missing_image_is_an_error() {
        assert!(load(Path::new("/nonexistent/img.png")).is_err());
    }
}
