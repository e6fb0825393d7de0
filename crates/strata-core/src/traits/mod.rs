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

//! Contracts of the collaborators the rendering queue consumes.

use crate::error::{ExecutionError, ResourceError};
use crate::pixel::CpuImage;
use crate::surface::{NativeHandle, SurfaceCaps, SurfaceRef, SurfaceRequest};
use std::fmt;
use std::sync::Arc;

/// A device configuration: the native config a context is created for, plus
/// the capabilities of the surfaces allocated from it.
pub trait GraphicsConfig: Send + Sync + fmt::Debug {
    /// The native handle of this config. Two configs with the same handle
    /// share one native context.
    fn native_config(&self) -> NativeHandle;

    /// The capability bits surfaces allocated from this config inherit.
    fn capabilities(&self) -> SurfaceCaps;

    /// The largest texture dimension the driver accepts.
    fn max_texture_size(&self) -> u32;
}

/// Resolves CPU image handles referenced by records during one flush.
pub trait ResourceTable {
    /// Returns the CPU image named by `handle`, if it was retained for this flush.
    fn cpu_image(&self, handle: NativeHandle) -> Option<&Arc<CpuImage>>;
}

/// The native side of the queue. Only the flusher thread ever calls into it.
pub trait NativeExecutor: Send {
    /// Runs a block of encoded records in order.
    ///
    /// ## Arguments
    /// * `records` - The bytes written since the previous flush. Every record
    ///   starts with a little-endian `i32` opcode.
    /// * `resources` - Resolves the CPU images records refer to.
    ///
    /// ## Returns
    /// An error aborts the rest of `records`; the queue reports it to the
    /// producer waiting on the flush.
    fn execute(&mut self, records: &[u8], resources: &dyn ResourceTable)
        -> Result<(), ExecutionError>;

    /// Allocates a driver-resident surface.
    ///
    /// ## Arguments
    /// * `config` - The native config the surface belongs to.
    /// * `request` - The kind, transparency and *native* (already padded)
    ///   dimensions to allocate.
    ///
    /// ## Returns
    /// The native handle of the new surface.
    fn allocate_surface(
        &mut self,
        config: NativeHandle,
        request: &SurfaceRequest,
    ) -> Result<NativeHandle, ResourceError>;
}

/// Hands back the representation of a logical image best suited to a config.
pub trait SourceProducer: Send + Sync {
    /// Returns the surface to read from when drawing into a destination of
    /// `config`, or into a CPU image when `config` is `None`.
    fn source_for(&self, config: Option<&dyn GraphicsConfig>) -> SurfaceRef;
}

impl SourceProducer for SurfaceRef {
    fn source_for(&self, _config: Option<&dyn GraphicsConfig>) -> SurfaceRef {
        self.clone()
    }
}

impl SourceProducer for Arc<CpuImage> {
    fn source_for(&self, _config: Option<&dyn GraphicsConfig>) -> SurfaceRef {
        SurfaceRef::Cpu(Arc::clone(self))
    }
}
