use std::borrow::Cow;

use crate::stream::Bitmap;

/// How a bitmap's rows are laid out in its staging buffer.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct StagingLayout {
    /// Distance between row starts in the staging buffer.
    pub bytes_per_row: u32,
    pub rows: u32,
    /// Bytes the staging buffer must hold.
    pub size: u64,
    /// Rows are rewritten at `bytes_per_row` instead of copied verbatim.
    pub repack: bool,
}

impl StagingLayout {
    /// Keeps the bitmap's own stride when the backend accepts it, otherwise
    /// the smallest multiple of `alignment` that fits a packed row.
    ///
    /// An aligned stride that does not fit in 32 bits yields a size of
    /// `u64::MAX`, which no copy limit admits.
    pub fn for_bitmap(bitmap: &Bitmap<'_>, alignment: u32) -> Self {
        let alignment = alignment.max(1);
        let packed = bitmap.packed_row_bytes();
        let rows = bitmap.height;
        let spanned = |stride: u64| {
            stride
                .saturating_mul(u64::from(rows.saturating_sub(1)))
                .saturating_add(packed)
        };

        if bitmap.row_bytes % alignment == 0 {
            return Self {
                bytes_per_row: bitmap.row_bytes,
                rows,
                size: spanned(u64::from(bitmap.row_bytes)).max(bitmap.byte_size()),
                repack: false,
            };
        }

        let aligned = packed.div_ceil(u64::from(alignment)) * u64::from(alignment);
        match u32::try_from(aligned) {
            Ok(bytes_per_row) => Self {
                bytes_per_row,
                rows,
                size: spanned(aligned),
                repack: true,
            },
            Err(_) => Self {
                bytes_per_row: 0,
                rows,
                size: u64::MAX,
                repack: true,
            },
        }
    }

    /// Staging contents for `bitmap`. Borrows the pixels when no repack is needed.
    pub fn fill<'a>(&self, bitmap: &Bitmap<'a>) -> Cow<'a, [u8]> {
        let Some(pixels) = bitmap.pixels else {
            return Cow::Owned(Vec::new());
        };
        if !self.repack {
            return Cow::Borrowed(pixels);
        }

        let packed = bitmap.packed_row_bytes() as usize;
        let src_stride = bitmap.row_bytes as usize;
        let dst_stride = self.bytes_per_row as usize;
        let mut out = vec![0u8; self.size as usize];
        for (y, dst) in out.chunks_mut(dst_stride).enumerate().take(self.rows as usize) {
            let s = y * src_stride;
            dst[..packed].copy_from_slice(&pixels[s..s + packed]);
        }
        Cow::Owned(out)
    }
}
