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

//! Keeps producer-side resources alive until the records using them have run.

use std::collections::HashMap;
use std::sync::Arc;
use strata_core::{CpuImage, NativeHandle, ResourceTable, SurfaceDescriptor, SurfaceRef};

/// The set of resources referenced by not-yet-flushed records.
///
/// It is non-empty only between an enqueue and the end of the next flush, and
/// it doubles as the table through which the executor resolves CPU images.
#[derive(Debug, Default)]
pub struct RetainedSet {
    surfaces: HashMap<NativeHandle, Arc<SurfaceDescriptor>>,
    images: HashMap<NativeHandle, Arc<CpuImage>>,
}

impl RetainedSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Retains a surface or image. Adding the same handle twice is a no-op.
    pub fn add(&mut self, resource: &SurfaceRef) {
        match resource {
            SurfaceRef::Gpu(desc) => self.add_surface(desc),
            SurfaceRef::Cpu(image) => self.add_image(image),
        }
    }

    /// Retains a driver-resident surface.
    pub fn add_surface(&mut self, desc: &Arc<SurfaceDescriptor>) {
        self.surfaces
            .entry(desc.handle())
            .or_insert_with(|| Arc::clone(desc));
    }

    /// Retains a CPU image.
    pub fn add_image(&mut self, image: &Arc<CpuImage>) {
        self.images
            .entry(image.handle())
            .or_insert_with(|| Arc::clone(image));
    }

    /// Returns `true` if `handle` is retained.
    pub fn contains(&self, handle: NativeHandle) -> bool {
        self.surfaces.contains_key(&handle) || self.images.contains_key(&handle)
    }

    /// Number of retained resources.
    pub fn len(&self) -> usize {
        self.surfaces.len() + self.images.len()
    }

    /// Returns `true` if nothing is retained.
    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty() && self.images.is_empty()
    }

    /// Releases every retained resource.
    pub fn clear(&mut self) {
        self.surfaces.clear();
        self.images.clear();
    }
}

impl ResourceTable for RetainedSet {
    fn cpu_image(&self, handle: NativeHandle) -> Option<&Arc<CpuImage>> {
        self.images.get(&handle)
    }
}
