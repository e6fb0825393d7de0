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

//! Surface lifecycle operations. Everything that touches a native handle is
//! encoded as a record or run as a post-flush callback, so it happens on the
//! flusher thread.

use super::RenderQueue;
use crate::error::{PipelineError, QueueError};
use crate::record::Record;
use std::sync::Arc;
use strata_core::{
    GraphicsConfig, ResourceError, SurfaceCaps, SurfaceDescriptor, SurfaceKind, SurfaceRequest,
};

impl RenderQueue {
    /// Allocates a driver-resident surface of `config`.
    ///
    /// The allocation runs on the flusher thread after everything queued
    /// before it, and the call blocks until it is done.
    ///
    /// ## Errors
    /// `AllocationFailed` for an empty size, for a render-target texture on a
    /// config without render-to-texture support, for a size above the
    /// config's texture limit, or when the driver refuses.
    pub fn create_surface(
        &self,
        config: &Arc<dyn GraphicsConfig>,
        request: SurfaceRequest,
    ) -> Result<Arc<SurfaceDescriptor>, PipelineError> {
        let refuse = |reason: &str| ResourceError::AllocationFailed {
            width: request.width,
            height: request.height,
            reason: reason.to_owned(),
        };
        if request.width == 0 || request.height == 0 {
            return Err(refuse("empty size").into());
        }
        let caps = config.capabilities();
        if request.kind == SurfaceKind::RenderTargetTexture
            && !caps.contains(SurfaceCaps::RENDER_TO_TEXTURE)
        {
            return Err(refuse("render-to-texture is not supported").into());
        }
        let (width, height) = request.native_size(caps);
        let max = config.max_texture_size();
        if request.kind.is_texture_backed() && (width > max || height > max) {
            return Err(refuse("exceeds the maximum texture size").into());
        }

        let native = SurfaceRequest::new(request.kind, width, height, request.transparency);
        let native_config = config.native_config();
        let (tx, rx) = crossbeam_channel::bounded(1);

        let guard = self.lock();
        guard.flush_now()?;
        guard.flush_and_invoke(move |executor| {
            let _ = tx.send(executor.allocate_surface(native_config, &native));
        })?;
        drop(guard);

        let handle = rx.recv().map_err(|_| QueueError::WorkerGone)??;
        log::debug!(
            "Allocated {:?} {handle} ({}x{}, native {width}x{height}).",
            request.kind,
            request.width,
            request.height
        );
        Ok(Arc::new(SurfaceDescriptor::new(
            handle,
            &request,
            Arc::clone(config),
            (width, height),
        )))
    }

    /// Disposes a surface. Idempotent.
    ///
    /// The context binding is dropped, since the native side may have had the
    /// surface bound, and the descriptor is marked disposed only once the
    /// driver has released it.
    pub fn dispose_surface(&self, surface: &Arc<SurfaceDescriptor>) -> Result<(), PipelineError> {
        if surface.is_disposed() {
            return Ok(());
        }
        let guard = self.lock();
        guard.bind_scratch(surface.config().as_ref());
        guard.enqueue(&Record::DisposeSurface(surface.handle()));
        guard.context().invalidate();
        let disposed = Arc::clone(surface);
        guard.flush_and_invoke(move |_| disposed.mark_disposed())?;
        log::debug!("Disposed surface {}.", surface.handle());
        Ok(())
    }

    /// Releases the driver storage of a surface while keeping its handle.
    /// Later reads see undefined contents.
    pub fn flush_surface(&self, surface: &Arc<SurfaceDescriptor>) -> Result<(), PipelineError> {
        if surface.is_disposed() {
            return Err(ResourceError::Disposed(surface.handle()).into());
        }
        let guard = self.lock();
        guard.bind_scratch(surface.config().as_ref());
        guard.enqueue(&Record::FlushSurface(surface.handle()));
        guard.context().invalidate();
        guard.flush_now()?;
        Ok(())
    }

    /// Destroys the native context of `config`. Surfaces of that config must
    /// already be disposed.
    pub fn dispose_config(&self, config: &dyn GraphicsConfig) -> Result<(), PipelineError> {
        let guard = self.lock();
        guard.invalidate_context()?;
        guard.enqueue(&Record::DisposeConfig(config.native_config()));
        guard.flush_now()?;
        log::debug!("Disposed config {}.", config.native_config());
        Ok(())
    }

    /// Presents the back buffer of an on-screen surface. Other kinds have
    /// nothing to present and return immediately.
    pub fn swap_buffers(&self, surface: &Arc<SurfaceDescriptor>) -> Result<(), PipelineError> {
        if surface.kind() != SurfaceKind::OnscreenSurface {
            return Ok(());
        }
        if surface.is_disposed() {
            return Err(ResourceError::Disposed(surface.handle()).into());
        }
        let guard = self.lock();
        guard.retain_surface(surface);
        guard.enqueue(&Record::SwapBuffers(surface.handle()));
        guard.flush_now()?;
        Ok(())
    }

    /// Makes the driver finish all outstanding work.
    pub fn sync(&self) -> Result<(), QueueError> {
        self.lock().sync()
    }
}
