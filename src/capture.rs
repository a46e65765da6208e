//! PNG-sequence frame sink.
//!
//! Writes every captured frame as `<dir>/<prefix>_NNNNNN.png`. Stands in for a
//! video encoder in the preview host and in tests.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::{ImageBuffer, Rgba};
use log::{debug, info};

use crate::frame_buffer::{BYTES_PER_PIXEL, FrameSink, FrameView};

pub struct PngSequenceSink {
    directory: PathBuf,
    prefix: String,
    next_index: usize,
    /// Captured rows arrive bottom-up (GL order) and must be flipped
    bottom_up: bool,
    scratch: Vec<u8>,
}

impl PngSequenceSink {
    /// Create the output directory if needed.
    pub fn new(directory: &Path, prefix: &str, bottom_up: bool) -> Result<Self> {
        std::fs::create_dir_all(directory)
            .with_context(|| format!("Failed to create capture directory {}", directory.display()))?;
        info!("Capturing frames to {}", directory.display());
        Ok(Self {
            directory: directory.to_path_buf(),
            prefix: prefix.to_string(),
            next_index: 0,
            bottom_up,
            scratch: Vec::new(),
        })
    }

    /// Number of frames written so far
    pub fn frames_written(&self) -> usize {
        self.next_index
    }

    pub fn frame_path(&self, index: usize) -> PathBuf {
        self.directory
            .join(format!("{}_{:06}.png", self.prefix, index))
    }
}

impl FrameSink for PngSequenceSink {
    fn consume(&mut self, frame: FrameView<'_>) -> Result<()> {
        let row_bytes = frame.width as usize * BYTES_PER_PIXEL;
        self.scratch.clear();
        self.scratch.reserve(row_bytes * frame.height as usize);

        for i in 0..frame.height {
            let y = if self.bottom_up { frame.height - 1 - i } else { i };
            self.scratch.extend_from_slice(frame.row(y));
        }

        let path = self.frame_path(self.next_index);
        let image: ImageBuffer<Rgba<u8>, &[u8]> =
            ImageBuffer::from_raw(frame.width, frame.height, self.scratch.as_slice())
                .context("Captured frame smaller than its declared size")?;
        image
            .save_with_format(&path, image::ImageFormat::Png)
            .with_context(|| format!("Failed to write {}", path.display()))?;

        debug!("Captured frame {} -> {}", self.next_index, path.display());
        self.next_index += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame_buffer::FrameBuffer;

    fn temp_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("orientview_{}_{}", name, std::process::id()))
    }

    /// 1x2 frame: row 0 red, row 1 blue
    fn two_row_frame() -> Vec<u8> {
        vec![255, 0, 0, 255, 0, 0, 255, 255]
    }

    #[test]
    fn test_writes_numbered_frames() {
        let dir = temp_dir("capture_numbered");
        let mut sink = PngSequenceSink::new(&dir, "frame", false).unwrap();

        let fb = FrameBuffer::new(4, 3);
        sink.consume(fb.view()).unwrap();
        sink.consume(fb.view()).unwrap();

        assert_eq!(sink.frames_written(), 2);
        assert!(dir.join("frame_000000.png").exists());
        let second = image::open(dir.join("frame_000001.png")).unwrap();
        assert_eq!((second.width(), second.height()), (4, 3));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_bottom_up_rows_flipped() {
        let dir = temp_dir("capture_flip");
        let pixels = two_row_frame();
        let view = FrameView {
            pixels: &pixels,
            row_stride: 4,
            width: 1,
            height: 2,
        };

        let mut sink = PngSequenceSink::new(&dir, "gl", true).unwrap();
        sink.consume(view).unwrap();
        let image = image::open(sink.frame_path(0)).unwrap().to_rgba8();
        std::fs::remove_dir_all(&dir).unwrap();

        // Last GL row is the top of the picture
        assert_eq!(image.get_pixel(0, 0).0, [0, 0, 255, 255]);
        assert_eq!(image.get_pixel(0, 1).0, [255, 0, 0, 255]);
    }

    #[test]
    fn test_top_down_rows_kept() {
        let dir = temp_dir("capture_keep");
        let pixels = two_row_frame();
        let view = FrameView {
            pixels: &pixels,
            row_stride: 4,
            width: 1,
            height: 2,
        };

        let mut sink = PngSequenceSink::new(&dir, "td", false).unwrap();
        sink.consume(view).unwrap();
        let image = image::open(sink.frame_path(0)).unwrap().to_rgba8();
        std::fs::remove_dir_all(&dir).unwrap();

        assert_eq!(image.get_pixel(0, 0).0, [255, 0, 0, 255]);
    }
}
