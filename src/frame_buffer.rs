//! Pixel buffers exchanged with the decoder and the encoder.
//!
//! - [`FrameData`] - decoder output uploaded into the video panel texture
//! - [`FrameBuffer`] - the compositor's capture buffer, one per output size
//! - [`FrameView`] - borrowed view of a captured frame handed to a [`FrameSink`]

/// Bytes per RGBA8 pixel
pub const BYTES_PER_PIXEL: usize = 4;

/// Raw RGBA frame from the decoder.
///
/// `row_length` is in bytes and may be larger than `width * 4` when the
/// decoder pads its rows.
#[derive(Debug, Clone, Copy)]
pub struct FrameData<'a> {
    pub data: &'a [u8],
    pub row_length: usize,
    pub width: u32,
    pub height: u32,
}

impl<'a> FrameData<'a> {
    /// Tightly packed RGBA frame.
    pub fn packed(data: &'a [u8], width: u32, height: u32) -> Self {
        Self {
            data,
            row_length: width as usize * BYTES_PER_PIXEL,
            width,
            height,
        }
    }

    /// Row length in pixels, as GL wants it for `UNPACK_ROW_LENGTH`.
    pub fn row_length_pixels(&self) -> usize {
        self.row_length / BYTES_PER_PIXEL
    }

    /// True when `data` covers every row at the declared stride.
    pub fn is_complete(&self) -> bool {
        if self.width == 0 || self.height == 0 {
            return false;
        }
        let row_bytes = self.width as usize * BYTES_PER_PIXEL;
        if self.row_length < row_bytes {
            return false;
        }
        let needed = self.row_length * (self.height as usize - 1) + row_bytes;
        self.data.len() >= needed
    }
}

/// Owned capture buffer for one composited frame.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    pixels: Vec<u8>,
    row_stride: usize,
    width: u32,
    height: u32,
}

impl FrameBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        let mut buffer = Self::default();
        buffer.allocate(width, height);
        buffer
    }

    /// Reallocate for a new output size. Keeps the storage when the size is unchanged.
    pub fn allocate(&mut self, width: u32, height: u32) {
        let len = width as usize * height as usize * BYTES_PER_PIXEL;
        if self.width == width && self.height == height && self.pixels.len() == len {
            return;
        }
        self.pixels = vec![0u8; len];
        self.row_stride = width as usize * BYTES_PER_PIXEL;
        self.width = width;
        self.height = height;
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn row_stride(&self) -> usize {
        self.row_stride
    }

    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    pub(crate) fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    /// Borrow for the encoder. Valid until the next capture overwrites the buffer.
    pub fn view(&self) -> FrameView<'_> {
        FrameView {
            pixels: &self.pixels,
            row_stride: self.row_stride,
            width: self.width,
            height: self.height,
        }
    }
}

/// Borrowed RGBA8 frame handed to the encoder for the current frame only.
#[derive(Debug, Clone, Copy)]
pub struct FrameView<'a> {
    pub pixels: &'a [u8],
    pub row_stride: usize,
    pub width: u32,
    pub height: u32,
}

impl<'a> FrameView<'a> {
    /// Pixels of row `y` (in buffer order), without stride padding.
    pub fn row(&self, y: u32) -> &'a [u8] {
        let start = y as usize * self.row_stride;
        &self.pixels[start..start + self.width as usize * BYTES_PER_PIXEL]
    }
}

/// Consumer of captured frames (the video encoder).
pub trait FrameSink {
    /// Encode one frame. The view must not be retained past this call.
    fn consume(&mut self, frame: FrameView<'_>) -> anyhow::Result<()>;
}
