/// Pixel format tag carried by engine bitmaps.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum PixelFormat {
    /// Single-channel coverage (glyph masks, path coverage).
    A8Unorm,
    /// 4-channel BGRA, premultiplied alpha.
    Bgra8UnormSrgb,
}

impl PixelFormat {
    #[inline]
    pub const fn bytes_per_pixel(self) -> u32 {
        match self {
            PixelFormat::A8Unorm => 1,
            PixelFormat::Bgra8UnormSrgb => 4,
        }
    }
}

/// Borrowed bitmap handed over by the engine for a texture upload.
///
/// `pixels == None` marks an empty placeholder: the texture will only ever be
/// rendered into (a render target) and never uploaded from the CPU.
///
/// Rows are `row_bytes` apart, which may exceed `width * bytes_per_pixel`. The
/// final row may be short of the full stride.
#[derive(Debug, Copy, Clone)]
pub struct Bitmap<'a> {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub row_bytes: u32,
    pub pixels: Option<&'a [u8]>,
}

impl<'a> Bitmap<'a> {
    /// Pixel-carrying bitmap.
    #[inline]
    pub fn new(width: u32, height: u32, format: PixelFormat, row_bytes: u32, pixels: &'a [u8]) -> Self {
        Self {
            width,
            height,
            format,
            row_bytes,
            pixels: Some(pixels),
        }
    }

    /// Tightly packed pixel-carrying bitmap.
    #[inline]
    pub fn packed(width: u32, height: u32, format: PixelFormat, pixels: &'a [u8]) -> Self {
        Self::new(width, height, format, width.saturating_mul(format.bytes_per_pixel()), pixels)
    }

    /// Render-target placeholder without pixel data.
    #[inline]
    pub fn empty(width: u32, height: u32, format: PixelFormat) -> Self {
        Self {
            width,
            height,
            format,
            row_bytes: width.saturating_mul(format.bytes_per_pixel()),
            pixels: None,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pixels.is_none()
    }

    /// Bytes of one row without stride padding.
    #[inline]
    pub fn packed_row_bytes(&self) -> u64 {
        u64::from(self.width) * u64::from(self.format.bytes_per_pixel())
    }

    /// Size of the pixel block as handed over by the engine.
    #[inline]
    pub fn byte_size(&self) -> u64 {
        self.pixels.map_or(0, |p| p.len() as u64)
    }

    /// Checks the stride and the pixel block length against the dimensions.
    pub fn validate(&self) -> Result<(), String> {
        if self.width == 0 || self.height == 0 {
            return Err(format!("zero-sized bitmap {}x{}", self.width, self.height));
        }
        let packed = self.packed_row_bytes();
        if packed > u64::from(u32::MAX) {
            return Err(format!("packed row of {packed} bytes does not fit a 32-bit stride"));
        }
        let Some(pixels) = self.pixels else { return Ok(()) };

        if u64::from(self.row_bytes) < packed {
            return Err(format!(
                "row stride {} is smaller than a packed row of {packed} bytes",
                self.row_bytes
            ));
        }

        let needed = u64::from(self.row_bytes) * u64::from(self.height - 1) + packed;
        if (pixels.len() as u64) < needed {
            return Err(format!(
                "{} pixel bytes supplied, {needed} required",
                pixels.len()
            ));
        }
        Ok(())
    }
}
