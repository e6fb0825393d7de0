// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Host-memory pixel storage.

use super::PixelFormat;
use crate::error::ResourceError;
use crate::math::Rect;
use std::fmt;

/// A tightly packed block of pixels in one [`PixelFormat`].
#[derive(Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    format: PixelFormat,
    width: u32,
    height: u32,
    stride: usize,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Creates a zero-filled buffer.
    pub fn new(format: PixelFormat, width: u32, height: u32) -> Self {
        let stride = width as usize * format.bytes_per_pixel();
        Self {
            format,
            width,
            height,
            stride,
            data: vec![0; stride * height as usize],
        }
    }

    /// Wraps existing bytes. Fails if `data` does not hold exactly
    /// `width * height` pixels of `format`.
    pub fn from_bytes(
        format: PixelFormat,
        width: u32,
        height: u32,
        data: Vec<u8>,
    ) -> Result<Self, ResourceError> {
        let stride = width as usize * format.bytes_per_pixel();
        if data.len() != stride * height as usize {
            return Err(ResourceError::AllocationFailed {
                width,
                height,
                reason: format!(
                    "expected {} bytes of {format:?}, got {}",
                    stride * height as usize,
                    data.len()
                ),
            });
        }
        Ok(Self {
            format,
            width,
            height,
            stride,
            data,
        })
    }

    /// Creates a canonical buffer from premultiplied ARGB pixels in row order.
    ///
    /// # Panics
    /// Panics if `pixels.len() != width * height`.
    pub fn from_argb_pre(width: u32, height: u32, pixels: &[u32]) -> Self {
        assert_eq!(
            pixels.len(),
            width as usize * height as usize,
            "pixel count does not match dimensions"
        );
        Self {
            format: PixelFormat::IntArgbPre,
            width,
            height,
            stride: width as usize * 4,
            data: bytemuck::cast_slice(pixels).to_vec(),
        }
    }

    /// Creates a buffer filled with one canonical colour.
    pub fn solid(format: PixelFormat, width: u32, height: u32, argb_pre: u32) -> Self {
        let mut buffer = Self::new(format, width, height);
        buffer.fill(argb_pre);
        buffer
    }

    /// The pixel layout.
    #[inline]
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// The width in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// The height in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Bytes per row.
    #[inline]
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// The buffer bounds, anchored at the origin.
    pub fn bounds(&self) -> Rect {
        Rect::from_xywh(0, 0, self.width as i32, self.height as i32)
    }

    /// The raw bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// The raw bytes, mutably.
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    #[inline]
    fn offset(&self, x: u32, y: u32) -> usize {
        debug_assert!(x < self.width && y < self.height);
        y as usize * self.stride + x as usize * self.format.bytes_per_pixel()
    }

    /// Reads one pixel as canonical premultiplied ARGB.
    ///
    /// # Panics
    /// Panics if the coordinates are outside the buffer.
    #[inline]
    pub fn get(&self, x: u32, y: u32) -> u32 {
        let off = self.offset(x, y);
        self.format.load(&self.data[off..])
    }

    /// Writes one canonical premultiplied ARGB pixel.
    ///
    /// # Panics
    /// Panics if the coordinates are outside the buffer.
    #[inline]
    pub fn set(&mut self, x: u32, y: u32, argb_pre: u32) {
        let off = self.offset(x, y);
        self.format.store(&mut self.data[off..], argb_pre);
    }

    /// Reads one pixel, reporting out-of-range coordinates as an error.
    pub fn try_get(&self, x: i32, y: i32) -> Result<u32, ResourceError> {
        if !self.bounds().contains(x, y) {
            return Err(ResourceError::OutOfBounds { x, y });
        }
        Ok(self.get(x as u32, y as u32))
    }

    /// Fills every pixel with one canonical colour.
    pub fn fill(&mut self, argb_pre: u32) {
        let bpp = self.format.bytes_per_pixel();
        let mut encoded = [0u8; 4];
        self.format.store(&mut encoded, argb_pre);
        for px in self.data.chunks_exact_mut(bpp) {
            px.copy_from_slice(&encoded[..bpp]);
        }
    }

    /// Returns every pixel as canonical premultiplied ARGB in row order.
    pub fn to_argb_pre(&self) -> Vec<u32> {
        let mut out = Vec::with_capacity(self.width as usize * self.height as usize);
        for y in 0..self.height {
            for x in 0..self.width {
                out.push(self.get(x, y));
            }
        }
        out
    }

    /// Returns a copy of this buffer converted to `format`.
    pub fn converted(&self, format: PixelFormat) -> PixelBuffer {
        if format == self.format {
            return self.clone();
        }
        let mut out = PixelBuffer::new(format, self.width, self.height);
        out.copy_from(self, self.bounds(), 0, 0);
        out
    }

    /// Copies `src_rect` of `src` to `(dx, dy)` with format conversion and no
    /// blending. The copy is clipped to both buffers.
    pub fn copy_from(&mut self, src: &PixelBuffer, src_rect: Rect, dx: i32, dy: i32) {
        let (ox, oy) = (src_rect.x1 - dx, src_rect.y1 - dy);
        let dst_rect = src_rect
            .intersect(&src.bounds())
            .translate(-ox, -oy)
            .intersect(&self.bounds());
        for y in dst_rect.y1..dst_rect.y2 {
            for x in dst_rect.x1..dst_rect.x2 {
                let p = src.get((x + ox) as u32, (y + oy) as u32);
                self.set(x as u32, y as u32, p);
            }
        }
    }
}

impl fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("format", &self.format)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("stride", &self.stride)
            .finish_non_exhaustive()
    }
}
