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

//! Reusable canonical-format scratch images.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use strata_core::{CpuImage, PixelFormat};

/// Caches one canonical intermediate image.
///
/// The cached image is handed out again only when it is large enough and no
/// one else holds it, so two concurrent users never alias. Contents are
/// undefined on reuse; callers overwrite the region they read.
#[derive(Debug, Default)]
pub struct IntermediateCache {
    slot: Mutex<Option<Arc<CpuImage>>>,
    created: AtomicU64,
    reused: AtomicU64,
}

impl IntermediateCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns an image of at least `width` x `height` canonical pixels.
    pub fn acquire(&self, width: u32, height: u32) -> Arc<CpuImage> {
        let mut slot = self.slot.lock();
        if let Some(image) = slot.as_ref() {
            if Arc::strong_count(image) == 1 && image.width() >= width && image.height() >= height {
                self.reused.fetch_add(1, Ordering::Relaxed);
                return Arc::clone(image);
            }
        }
        // A replacement also covers the size of the image it replaces.
        let (w, h) = match slot.as_ref() {
            Some(old) if Arc::strong_count(old) == 1 => {
                (width.max(old.width()), height.max(old.height()))
            }
            _ => (width, height),
        };
        let image = CpuImage::new(PixelFormat::CANONICAL, w.max(1), h.max(1));
        self.created.fetch_add(1, Ordering::Relaxed);
        log::trace!("Created {w}x{h} intermediate image {}", image.handle());
        *slot = Some(Arc::clone(&image));
        image
    }

    /// Drops the cached image. A user still holding it keeps it alive.
    pub fn purge(&self) {
        self.slot.lock().take();
    }

    /// Images created so far.
    pub fn created(&self) -> u64 {
        self.created.load(Ordering::Relaxed)
    }

    /// Acquisitions served by the cached image.
    pub fn reused(&self) -> u64 {
        self.reused.load(Ordering::Relaxed)
    }
}
