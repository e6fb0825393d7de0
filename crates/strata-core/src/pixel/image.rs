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

//! CPU-side images handed to the queue as blit sources or destinations.

use super::{PixelBuffer, PixelFormat};
use crate::math::Rect;
use crate::surface::NativeHandle;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_CPU_IMAGE: AtomicU64 = AtomicU64::new(1);

/// A CPU-side image with a process-unique handle.
///
/// The format and dimensions never change; the pixels sit behind a lock so a
/// producer and the flusher thread can both reach them.
#[derive(Debug)]
pub struct CpuImage {
    handle: NativeHandle,
    format: PixelFormat,
    width: u32,
    height: u32,
    pixels: RwLock<PixelBuffer>,
}

impl CpuImage {
    /// Creates a zero-filled image.
    pub fn new(format: PixelFormat, width: u32, height: u32) -> Arc<Self> {
        Self::from_buffer(PixelBuffer::new(format, width, height))
    }

    /// Wraps an existing buffer.
    pub fn from_buffer(buffer: PixelBuffer) -> Arc<Self> {
        let seq = NEXT_CPU_IMAGE.fetch_add(1, Ordering::Relaxed);
        Arc::new(Self {
            handle: NativeHandle::cpu(seq),
            format: buffer.format(),
            width: buffer.width(),
            height: buffer.height(),
            pixels: RwLock::new(buffer),
        })
    }

    /// The handle records use to name this image.
    #[inline]
    pub fn handle(&self) -> NativeHandle {
        self.handle
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

    /// The image bounds, anchored at the origin.
    pub fn bounds(&self) -> Rect {
        Rect::from_xywh(0, 0, self.width as i32, self.height as i32)
    }

    /// Locks the pixels for reading.
    pub fn read(&self) -> RwLockReadGuard<'_, PixelBuffer> {
        self.pixels.read()
    }

    /// Locks the pixels for writing.
    pub fn write(&self) -> RwLockWriteGuard<'_, PixelBuffer> {
        self.pixels.write()
    }

    /// Returns a copy of the current pixels.
    pub fn snapshot(&self) -> PixelBuffer {
        self.pixels.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_are_unique_and_tagged() {
        let a = CpuImage::new(PixelFormat::IntRgb, 1, 1);
        let b = CpuImage::new(PixelFormat::IntRgb, 1, 1);
        assert_ne!(a.handle(), b.handle());
        assert!(a.handle().is_cpu());
    }

    #[test]
    fn writes_are_visible_to_readers() {
        let img = CpuImage::new(PixelFormat::IntArgbPre, 2, 1);
        img.write().set(1, 0, 0xFF11_2233);
        assert_eq!(img.read().get(1, 0), 0xFF11_2233);
        assert_eq!(img.snapshot().get(0, 0), 0);
    }
}
