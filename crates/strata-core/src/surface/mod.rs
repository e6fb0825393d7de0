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

//! The surface descriptor model: every pixel-bearing resource is either one of
//! three kinds of driver-resident storage or a CPU-side image.

use crate::math::Rect;
use crate::pixel::CpuImage;
use bitflags::bitflags;
use crate::traits::GraphicsConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// An opaque handle naming a resource on the native side of the queue.
///
/// Handles of CPU-side images carry [`NativeHandle::CPU_TAG`]; they are resolved
/// on the worker through the queue's retained set rather than by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct NativeHandle(pub u64);

impl NativeHandle {
    /// The null handle. Never names a live resource.
    pub const NULL: Self = Self(0);

    /// Tag bit carried by every CPU-side image handle.
    pub const CPU_TAG: u64 = 1 << 62;

    /// Creates a CPU image handle from a sequence number.
    #[inline]
    pub const fn cpu(seq: u64) -> Self {
        Self(seq | Self::CPU_TAG)
    }

    /// Returns `true` for the null handle.
    #[inline]
    pub const fn is_null(&self) -> bool {
        self.0 == 0
    }

    /// Returns `true` if this handle names a CPU-side image.
    #[inline]
    pub const fn is_cpu(&self) -> bool {
        self.0 & Self::CPU_TAG != 0
    }
}

impl fmt::Display for NativeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_cpu() {
            write!(f, "cpu#{}", self.0 & !Self::CPU_TAG)
        } else {
            write!(f, "#{}", self.0)
        }
    }
}

/// The kind of driver-resident pixel storage behind a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SurfaceKind {
    /// Drawable directly. May be double-buffered, in which case its content
    /// becomes visible only after a buffer swap.
    OnscreenSurface,
    /// Not drawable. Receives pixels through uploads and is consumed by
    /// drawing it as a textured quad.
    Texture,
    /// Drawable like an onscreen surface, consumed like a texture.
    RenderTargetTexture,
}

impl SurfaceKind {
    /// All surface kinds.
    pub const ALL: [SurfaceKind; 3] = [
        SurfaceKind::OnscreenSurface,
        SurfaceKind::Texture,
        SurfaceKind::RenderTargetTexture,
    ];

    /// Returns `true` if rendering commands may target this kind directly.
    #[inline]
    pub const fn is_drawable(self) -> bool {
        matches!(
            self,
            SurfaceKind::OnscreenSurface | SurfaceKind::RenderTargetTexture
        )
    }

    /// Returns `true` if this kind is sampled as a texture when used as a source.
    #[inline]
    pub const fn is_texture_backed(self) -> bool {
        matches!(self, SurfaceKind::Texture | SurfaceKind::RenderTargetTexture)
    }

    /// The id written into surface lifecycle records.
    pub const fn id(self) -> i32 {
        match self {
            SurfaceKind::OnscreenSurface => 1,
            SurfaceKind::Texture => 3,
            SurfaceKind::RenderTargetTexture => 5,
        }
    }

    /// Looks up a kind by its record id.
    pub const fn from_id(id: i32) -> Option<Self> {
        match id {
            1 => Some(SurfaceKind::OnscreenSurface),
            3 => Some(SurfaceKind::Texture),
            5 => Some(SurfaceKind::RenderTargetTexture),
            _ => None,
        }
    }
}

/// How a surface stores alpha.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Transparency {
    /// Every pixel is fully opaque.
    #[default]
    Opaque,
    /// Every pixel is either fully opaque or fully transparent.
    Bitmask,
    /// Pixels carry arbitrary alpha.
    Translucent,
}

bitflags! {
    /// Capability bits of a graphics config or of a surface allocated from it.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SurfaceCaps: u32 {
        /// The surface has a back buffer and needs explicit swaps.
        const DOUBLEBUFFERED = 1 << 0;
        /// Textures may have non-power-of-two dimensions.
        const TEXTURE_NPOT = 1 << 1;
        /// Rectangle-target textures are available.
        const TEXTURE_RECT = 1 << 2;
        /// Textures can be used as render targets.
        const RENDER_TO_TEXTURE = 1 << 3;
        /// The surface stores an alpha channel.
        const STORED_ALPHA = 1 << 4;
    }
}

/// A request to allocate a driver-resident surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SurfaceRequest {
    /// The kind of storage requested.
    pub kind: SurfaceKind,
    /// The width in pixels.
    pub width: u32,
    /// The height in pixels.
    pub height: u32,
    /// How the surface stores alpha.
    pub transparency: Transparency,
}

impl SurfaceRequest {
    /// Creates a request.
    pub const fn new(kind: SurfaceKind, width: u32, height: u32, transparency: Transparency) -> Self {
        Self {
            kind,
            width,
            height,
            transparency,
        }
    }

    /// Returns the dimensions the driver must allocate under the given
    /// capabilities. Texture-backed kinds round up to powers of two when the
    /// config lacks [`SurfaceCaps::TEXTURE_NPOT`] and [`SurfaceCaps::TEXTURE_RECT`].
    pub fn native_size(&self, caps: SurfaceCaps) -> (u32, u32) {
        let npot = caps.intersects(SurfaceCaps::TEXTURE_NPOT | SurfaceCaps::TEXTURE_RECT);
        if self.kind.is_texture_backed() && !npot {
            (
                self.width.max(1).next_power_of_two(),
                self.height.max(1).next_power_of_two(),
            )
        } else {
            (self.width, self.height)
        }
    }
}

/// Describes a live driver-resident surface.
///
/// The kind is fixed at construction. The native handle stays valid until the
/// surface is disposed, which only ever happens on the flusher thread; the
/// descriptor records that through [`SurfaceDescriptor::mark_disposed`].
#[derive(Debug)]
pub struct SurfaceDescriptor {
    handle: NativeHandle,
    kind: SurfaceKind,
    config: Arc<dyn GraphicsConfig>,
    transparency: Transparency,
    caps: SurfaceCaps,
    width: u32,
    height: u32,
    native_width: u32,
    native_height: u32,
    disposed: AtomicBool,
}

impl SurfaceDescriptor {
    /// Creates a descriptor for a freshly allocated surface.
    ///
    /// ## Arguments
    /// * `handle` - The handle returned by the driver.
    /// * `request` - The logical request the surface was allocated for.
    /// * `config` - The config the surface belongs to.
    /// * `native_size` - The dimensions actually allocated.
    pub fn new(
        handle: NativeHandle,
        request: &SurfaceRequest,
        config: Arc<dyn GraphicsConfig>,
        native_size: (u32, u32),
    ) -> Self {
        let mut caps = config.capabilities();
        if request.transparency == Transparency::Opaque {
            caps.remove(SurfaceCaps::STORED_ALPHA);
        }
        if request.kind != SurfaceKind::OnscreenSurface {
            caps.remove(SurfaceCaps::DOUBLEBUFFERED);
        }
        Self {
            handle,
            kind: request.kind,
            config,
            transparency: request.transparency,
            caps,
            width: request.width,
            height: request.height,
            native_width: native_size.0,
            native_height: native_size.1,
            disposed: AtomicBool::new(false),
        }
    }

    /// The native handle.
    #[inline]
    pub fn handle(&self) -> NativeHandle {
        self.handle
    }

    /// The surface kind.
    #[inline]
    pub fn kind(&self) -> SurfaceKind {
        self.kind
    }

    /// The config this surface was allocated from.
    #[inline]
    pub fn config(&self) -> &Arc<dyn GraphicsConfig> {
        &self.config
    }

    /// How the surface stores alpha.
    #[inline]
    pub fn transparency(&self) -> Transparency {
        self.transparency
    }

    /// Returns `true` if the surface holds no alpha.
    #[inline]
    pub fn is_opaque(&self) -> bool {
        self.transparency == Transparency::Opaque
    }

    /// The capability bits of this surface.
    #[inline]
    pub fn caps(&self) -> SurfaceCaps {
        self.caps
    }

    /// Returns `true` if the surface has every capability in `caps`.
    #[inline]
    pub fn has_caps(&self, caps: SurfaceCaps) -> bool {
        self.caps.contains(caps)
    }

    /// The logical width.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// The logical height.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// The allocated `(width, height)`, which may exceed the logical size.
    #[inline]
    pub fn native_size(&self) -> (u32, u32) {
        (self.native_width, self.native_height)
    }

    /// Returns `true` if the allocation is larger than the logical size.
    #[inline]
    pub fn is_padded(&self) -> bool {
        self.native_width != self.width || self.native_height != self.height
    }

    /// The logical bounds in surface coordinates.
    pub fn bounds(&self) -> Rect {
        Rect::from_xywh(0, 0, self.width as i32, self.height as i32)
    }

    /// Records that the native resource has been released.
    pub fn mark_disposed(&self) {
        self.disposed.store(true, Ordering::Release);
    }

    /// Returns `true` once the native resource has been released.
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }
}

/// A pixel source or destination: either driver-resident or a CPU image.
#[derive(Debug, Clone)]
pub enum SurfaceRef {
    /// A driver-resident surface.
    Gpu(Arc<SurfaceDescriptor>),
    /// A CPU-side image.
    Cpu(Arc<CpuImage>),
}

impl SurfaceRef {
    /// The handle written into records referencing this surface.
    pub fn handle(&self) -> NativeHandle {
        match self {
            SurfaceRef::Gpu(desc) => desc.handle(),
            SurfaceRef::Cpu(image) => image.handle(),
        }
    }

    /// The logical bounds.
    pub fn bounds(&self) -> Rect {
        match self {
            SurfaceRef::Gpu(desc) => desc.bounds(),
            SurfaceRef::Cpu(image) => image.bounds(),
        }
    }

    /// Returns the descriptor of a driver-resident surface.
    pub fn as_gpu(&self) -> Option<&Arc<SurfaceDescriptor>> {
        match self {
            SurfaceRef::Gpu(desc) => Some(desc),
            SurfaceRef::Cpu(_) => None,
        }
    }

    /// Returns the image of a CPU-side surface.
    pub fn as_cpu(&self) -> Option<&Arc<CpuImage>> {
        match self {
            SurfaceRef::Cpu(image) => Some(image),
            SurfaceRef::Gpu(_) => None,
        }
    }

    /// Returns `true` if the surface holds no alpha.
    pub fn is_opaque(&self) -> bool {
        match self {
            SurfaceRef::Gpu(desc) => desc.is_opaque(),
            SurfaceRef::Cpu(image) => !image.format().has_alpha(),
        }
    }
}

impl From<Arc<SurfaceDescriptor>> for SurfaceRef {
    fn from(desc: Arc<SurfaceDescriptor>) -> Self {
        SurfaceRef::Gpu(desc)
    }
}

impl From<Arc<CpuImage>> for SurfaceRef {
    fn from(image: Arc<CpuImage>) -> Self {
        SurfaceRef::Cpu(image)
    }
}
