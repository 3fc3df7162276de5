//! RGBA frame buffers in CPU memory.
//!
//! Both the still-image preview and the video render loop hand these to the
//! pixel transform. Rows may be padded; `stride` is the byte distance between
//! row starts.

use crate::error::{Result, TintcutError};

/// Bytes per RGBA8 pixel.
pub const BYTES_PER_PIXEL: usize = 4;

/// An 8-bit RGBA frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Bytes per row (may include padding)
    pub stride: usize,
    data: Vec<u8>,
}

impl FrameBuffer {
    /// Create a zeroed frame with tightly packed rows.
    pub fn new(width: u32, height: u32) -> Self {
        let stride = width as usize * BYTES_PER_PIXEL;
        Self {
            width,
            height,
            stride,
            data: vec![0u8; stride * height as usize],
        }
    }

    /// Wrap tightly packed RGBA bytes.
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        Self::from_rgba_with_stride(width, height, width as usize * BYTES_PER_PIXEL, data)
    }

    /// Wrap RGBA bytes whose rows are `stride` bytes apart.
    pub fn from_rgba_with_stride(
        width: u32,
        height: u32,
        stride: usize,
        data: Vec<u8>,
    ) -> Result<Self> {
        let row_bytes = width as usize * BYTES_PER_PIXEL;
        if stride < row_bytes {
            return Err(TintcutError::InvalidParameter(format!(
                "stride {stride} is smaller than a {width}px row ({row_bytes} bytes)"
            )));
        }
        let expected = stride * height as usize;
        if data.len() < expected {
            return Err(TintcutError::InvalidParameter(format!(
                "frame {width}x{height} needs {expected} bytes, got {}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            stride,
            data,
        })
    }

    /// Fill every pixel with one RGBA value.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let mut frame = Self::new(width, height);
        for px in frame.data.chunks_exact_mut(BYTES_PER_PIXEL) {
            px.copy_from_slice(&rgba);
        }
        frame
    }

    /// Resize in place when the native dimensions change. Contents are zeroed.
    pub fn ensure_size(&mut self, width: u32, height: u32) {
        if self.width != width || self.height != height {
            *self = Self::new(width, height);
        }
    }

    /// Raw bytes, including any row padding.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Raw bytes, mutable.
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Consume the frame and return its bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Pixel bytes of one row, padding excluded.
    #[inline]
    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.stride;
        &self.data[start..start + self.width as usize * BYTES_PER_PIXEL]
    }

    /// Pixel bytes of one row, mutable.
    #[inline]
    pub fn row_mut(&mut self, y: u32) -> &mut [u8] {
        let start = y as usize * self.stride;
        let end = start + self.width as usize * BYTES_PER_PIXEL;
        &mut self.data[start..end]
    }

    /// Read one pixel.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = x as usize * BYTES_PER_PIXEL;
        let row = self.row(y);
        Some([row[i], row[i + 1], row[i + 2], row[i + 3]])
    }

    /// Write one pixel. Out-of-bounds writes are ignored.
    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let i = x as usize * BYTES_PER_PIXEL;
        self.row_mut(y)[i..i + BYTES_PER_PIXEL].copy_from_slice(&rgba);
    }

    /// Total memory usage of this frame in bytes.
    pub fn memory_size(&self) -> usize {
        self.data.len()
    }
}
