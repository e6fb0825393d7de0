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

use super::SoftwareExecutor;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use strata_core::{
    ExecutionError, GraphicsConfig, NativeHandle, PixelBuffer, PixelFormat, ResourceError,
    SurfaceCaps, SurfaceKind, SurfaceRequest, Transparency,
};

/// First handle given to a surface. Config handles count up from 1.
const FIRST_SURFACE_HANDLE: u64 = 0x1_0000;

/// Limits of the simulated driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceLimits {
    /// The largest texture dimension configs report and allocations accept.
    pub max_texture_size: u32,
    /// Bytes of surface storage the device may hold at once.
    pub memory_budget: u64,
}

impl Default for DeviceLimits {
    fn default() -> Self {
        Self {
            max_texture_size: 4096,
            memory_budget: 256 * 1024 * 1024,
        }
    }
}

/// A config of the software device.
#[derive(Debug)]
pub struct SoftwareConfig {
    handle: NativeHandle,
    caps: SurfaceCaps,
    max_texture_size: u32,
}

impl GraphicsConfig for SoftwareConfig {
    fn native_config(&self) -> NativeHandle {
        self.handle
    }

    fn capabilities(&self) -> SurfaceCaps {
        self.caps
    }

    fn max_texture_size(&self) -> u32 {
        self.max_texture_size
    }
}

#[derive(Debug)]
pub(crate) struct SurfaceEntry {
    pub(crate) config: NativeHandle,
    pub(crate) kind: SurfaceKind,
    format: PixelFormat,
    width: u32,
    height: u32,
    double_buffered: bool,
    front: PixelBuffer,
    back: Option<PixelBuffer>,
    released: bool,
}

impl SurfaceEntry {
    /// The storage format and buffering a request gets under `config`.
    fn layout(config: &SoftwareConfig, request: &SurfaceRequest) -> (PixelFormat, bool) {
        let format = match request.transparency {
            Transparency::Opaque => PixelFormat::IntRgb,
            Transparency::Bitmask | Transparency::Translucent => PixelFormat::IntArgbPre,
        };
        let double_buffered = request.kind == SurfaceKind::OnscreenSurface
            && config.caps.contains(SurfaceCaps::DOUBLEBUFFERED);
        (format, double_buffered)
    }

    fn new(config: &SoftwareConfig, request: &SurfaceRequest) -> Self {
        let (format, double_buffered) = Self::layout(config, request);
        let mut entry = Self {
            config: config.handle,
            kind: request.kind,
            format,
            width: request.width,
            height: request.height,
            double_buffered,
            front: PixelBuffer::new(format, 0, 0),
            back: None,
            released: true,
        };
        entry.ensure_storage();
        entry
    }

    /// Bytes a live allocation of `request` holds under `config`.
    fn footprint(config: &SoftwareConfig, request: &SurfaceRequest) -> u64 {
        let (format, double_buffered) = Self::layout(config, request);
        let buffers = if double_buffered { 2 } else { 1 };
        request.width as u64 * request.height as u64 * format.bytes_per_pixel() as u64 * buffers
    }

    /// Bytes currently held.
    pub(crate) fn resident_bytes(&self) -> u64 {
        let back = self.back.as_ref().map_or(0, |b| b.data().len());
        (self.front.data().len() + back) as u64
    }

    /// Reallocates zeroed storage after a release.
    pub(crate) fn ensure_storage(&mut self) {
        if !self.released {
            return;
        }
        self.front = PixelBuffer::new(self.format, self.width, self.height);
        self.back = self
            .double_buffered
            .then(|| PixelBuffer::new(self.format, self.width, self.height));
        self.released = false;
    }

    /// Drops the storage but keeps the surface.
    pub(crate) fn release(&mut self) {
        self.front = PixelBuffer::new(self.format, 0, 0);
        self.back = None;
        self.released = true;
    }

    /// The buffer draws land in: the back buffer when there is one.
    pub(crate) fn draw_buffer(&self) -> &PixelBuffer {
        self.back.as_ref().unwrap_or(&self.front)
    }

    pub(crate) fn draw_buffer_mut(&mut self) -> &mut PixelBuffer {
        match &mut self.back {
            Some(back) => back,
            None => &mut self.front,
        }
    }

    /// Presents the back buffer. The back buffer keeps its contents.
    pub(crate) fn swap(&mut self) {
        if let Some(back) = &self.back {
            self.front = back.clone();
        }
    }
}

/// Configs and surfaces of one device. Shared by the device and its executors.
#[derive(Debug, Default)]
pub(crate) struct SurfaceStore {
    configs: HashMap<NativeHandle, Arc<SoftwareConfig>>,
    pub(crate) surfaces: HashMap<NativeHandle, SurfaceEntry>,
    next_surface: u64,
}

impl SurfaceStore {
    pub(crate) fn has_config(&self, config: NativeHandle) -> bool {
        self.configs.contains_key(&config)
    }

    fn resident_bytes(&self) -> u64 {
        self.surfaces.values().map(SurfaceEntry::resident_bytes).sum()
    }

    pub(crate) fn allocate(
        &mut self,
        config: NativeHandle,
        request: &SurfaceRequest,
        limits: &DeviceLimits,
    ) -> Result<NativeHandle, ResourceError> {
        let refuse = |reason: &str| ResourceError::AllocationFailed {
            width: request.width,
            height: request.height,
            reason: reason.to_owned(),
        };
        let config = self
            .configs
            .get(&config)
            .cloned()
            .ok_or(ResourceError::InvalidHandle(config))?;
        if request.width == 0 || request.height == 0 {
            return Err(refuse("empty size"));
        }
        let max = config.max_texture_size;
        if request.kind.is_texture_backed() && (request.width > max || request.height > max) {
            return Err(refuse("exceeds the maximum texture size"));
        }

        let needed = SurfaceEntry::footprint(&config, request);
        if self.resident_bytes() + needed > limits.memory_budget {
            return Err(refuse("out of device memory"));
        }

        let handle = NativeHandle(FIRST_SURFACE_HANDLE + self.next_surface);
        self.next_surface += 1;
        self.surfaces.insert(handle, SurfaceEntry::new(&config, request));
        log::debug!(
            "Software device allocated {:?} {handle} ({}x{}, {needed} bytes).",
            request.kind,
            request.width,
            request.height
        );
        Ok(handle)
    }

    /// Looks a surface up for writing, reallocating released storage.
    pub(crate) fn surface_mut(
        &mut self,
        handle: NativeHandle,
    ) -> Result<&mut SurfaceEntry, ExecutionError> {
        let entry = self
            .surfaces
            .get_mut(&handle)
            .ok_or(ExecutionError::UnknownHandle(handle))?;
        entry.ensure_storage();
        Ok(entry)
    }

    pub(crate) fn dispose_surface(&mut self, handle: NativeHandle) -> Result<(), ExecutionError> {
        self.surfaces
            .remove(&handle)
            .map(|_| ())
            .ok_or(ExecutionError::UnknownHandle(handle))
    }

    /// Removes a config together with any surface still allocated from it.
    pub(crate) fn dispose_config(&mut self, config: NativeHandle) -> Result<usize, ExecutionError> {
        if self.configs.remove(&config).is_none() {
            return Err(ExecutionError::UnknownHandle(config));
        }
        let before = self.surfaces.len();
        self.surfaces.retain(|_, entry| entry.config != config);
        Ok(before - self.surfaces.len())
    }
}

/// The software device: a factory of configs and executors over one shared
/// surface store.
#[derive(Debug, Clone)]
pub struct SoftwareDevice {
    store: Arc<Mutex<SurfaceStore>>,
    limits: DeviceLimits,
    next_config: Arc<AtomicU64>,
}

impl Default for SoftwareDevice {
    fn default() -> Self {
        Self::new(DeviceLimits::default())
    }
}

impl SoftwareDevice {
    /// Creates a device with no configs.
    pub fn new(limits: DeviceLimits) -> Self {
        log::info!(
            "Software device created (max texture {}, budget {} bytes).",
            limits.max_texture_size,
            limits.memory_budget
        );
        Self {
            store: Arc::new(Mutex::new(SurfaceStore::default())),
            limits,
            next_config: Arc::new(AtomicU64::new(1)),
        }
    }

    /// The limits the device enforces.
    pub fn limits(&self) -> DeviceLimits {
        self.limits
    }

    /// Creates a config whose surfaces get `caps`.
    pub fn create_config(&self, caps: SurfaceCaps) -> Arc<SoftwareConfig> {
        let handle = NativeHandle(self.next_config.fetch_add(1, Ordering::Relaxed));
        let config = Arc::new(SoftwareConfig {
            handle,
            caps,
            max_texture_size: self.limits.max_texture_size,
        });
        self.store.lock().configs.insert(handle, Arc::clone(&config));
        log::debug!("Software device created config {handle} with {caps:?}.");
        config
    }

    /// An executor drawing into this device's surfaces.
    pub fn executor(&self) -> SoftwareExecutor {
        SoftwareExecutor::new(Arc::clone(&self.store), self.limits)
    }

    /// Returns `true` while `config` has not been disposed.
    pub fn has_config(&self, config: NativeHandle) -> bool {
        self.store.lock().has_config(config)
    }

    /// Number of live surfaces.
    pub fn surface_count(&self) -> usize {
        self.store.lock().surfaces.len()
    }

    /// Bytes of surface storage currently held.
    pub fn bytes_allocated(&self) -> u64 {
        self.store.lock().resident_bytes()
    }

    /// Returns `true` if the surface exists but its storage was released.
    pub fn is_released(&self, handle: NativeHandle) -> bool {
        self.store
            .lock()
            .surfaces
            .get(&handle)
            .is_some_and(|entry| entry.released)
    }

    /// A copy of the buffer draws into `handle` land in.
    pub fn pixels(&self, handle: NativeHandle) -> Option<PixelBuffer> {
        self.store
            .lock()
            .surfaces
            .get(&handle)
            .map(|entry| entry.draw_buffer().clone())
    }

    /// A copy of what `handle` currently presents. Differs from
    /// [`SoftwareDevice::pixels`] for double-buffered surfaces until a swap.
    pub fn front_pixels(&self, handle: NativeHandle) -> Option<PixelBuffer> {
        self.store
            .lock()
            .surfaces
            .get(&handle)
            .map(|entry| entry.front.clone())
    }
}
