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

use super::device::{DeviceLimits, SurfaceEntry, SurfaceStore};
use parking_lot::Mutex;
use std::sync::Arc;
use strata_core::pixel::blend;
use strata_core::{
    AffineTransform, ClipRegion, Composite, ExecutionError, NativeExecutor, NativeHandle,
    PixelBuffer, Rect, ResourceError, ResourceTable, SurfaceKind, SurfaceRequest,
};
use strata_pipeline::{PackedParams, Record, RecordReader};

/// What the simulated context is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bound {
    Surfaces {
        config: NativeHandle,
        src: NativeHandle,
        dst: NativeHandle,
    },
    Scratch {
        config: NativeHandle,
    },
}

impl Bound {
    fn config(&self) -> NativeHandle {
        match *self {
            Bound::Surfaces { config, .. } | Bound::Scratch { config } => config,
        }
    }

    fn references(&self, handle: NativeHandle) -> bool {
        matches!(*self, Bound::Surfaces { src, dst, .. } if src == handle || dst == handle)
    }
}

/// Render state of the current context.
#[derive(Debug, Clone)]
struct RenderState {
    clip: ClipRegion,
    shape_spans: Option<Vec<Rect>>,
    composite: Composite,
    transform: AffineTransform,
    paint: Option<u32>,
}

impl Default for RenderState {
    fn default() -> Self {
        Self {
            clip: ClipRegion::unbounded(),
            shape_spans: None,
            composite: Composite::default(),
            transform: AffineTransform::IDENTITY,
            paint: None,
        }
    }
}

/// Geometry of one `BLIT` record.
#[derive(Debug, Clone, Copy)]
struct BlitOp {
    params: PackedParams,
    src_rect: Rect,
    dst: (f64, f64, f64, f64),
    src: NativeHandle,
    target: NativeHandle,
}

/// Interprets the record stream against host-memory surfaces.
///
/// One context is simulated: binding a surface of another config, or an
/// `INVALIDATE_CONTEXT` record, starts from default state.
#[derive(Debug)]
pub struct SoftwareExecutor {
    store: Arc<Mutex<SurfaceStore>>,
    limits: DeviceLimits,
    bound: Option<Bound>,
    state: RenderState,
    records: u64,
}

fn malformed(offset: usize, reason: impl Into<String>) -> ExecutionError {
    ExecutionError::MalformedRecord {
        offset,
        reason: reason.into(),
    }
}

impl SoftwareExecutor {
    pub(super) fn new(store: Arc<Mutex<SurfaceStore>>, limits: DeviceLimits) -> Self {
        Self {
            store,
            limits,
            bound: None,
            state: RenderState::default(),
            records: 0,
        }
    }

    /// Records executed so far, padding excluded.
    pub fn records_executed(&self) -> u64 {
        self.records
    }

    fn bind(&mut self, next: Bound) {
        if self.bound.map(|b| b.config()) != Some(next.config()) {
            self.state = RenderState::default();
        }
        log::trace!("Software context bound to {next:?}");
        self.bound = Some(next);
    }

    fn unbind(&mut self) {
        self.bound = None;
        self.state = RenderState::default();
    }

    /// The destination of the current surface binding.
    fn bound_dst(&self, offset: usize) -> Result<NativeHandle, ExecutionError> {
        match self.bound {
            Some(Bound::Surfaces { dst, .. }) => Ok(dst),
            _ => Err(malformed(offset, "draw without a bound destination")),
        }
    }

    fn apply(
        &mut self,
        store: &mut SurfaceStore,
        offset: usize,
        record: Record,
        resources: &dyn ResourceTable,
    ) -> Result<(), ExecutionError> {
        match record {
            Record::Noop => return Ok(()),
            Record::FillRect { x, y, w, h } => {
                self.fill(store, offset, Rect::from_xywh(x, y, w, h))?
            }
            Record::Blit {
                params,
                sx1,
                sy1,
                sx2,
                sy2,
                dx1,
                dy1,
                dx2,
                dy2,
                src,
                dst,
            } => {
                let op = BlitOp {
                    params,
                    src_rect: Rect::new(sx1, sy1, sx2, sy2),
                    dst: (dx1, dy1, dx2, dy2),
                    src,
                    target: dst,
                };
                self.blit(store, offset, &op, resources)?;
            }
            Record::SurfaceToSwBlit {
                sx,
                sy,
                dx,
                dy,
                w,
                h,
                dst_format,
                src,
                dst,
            } => {
                if self.bound_dst(offset)? != src {
                    let reason = format!("read from {src}, which is not bound");
                    return Err(malformed(offset, reason));
                }
                let image = resources
                    .cpu_image(dst)
                    .ok_or(ExecutionError::UnknownHandle(dst))?;
                if image.format() != dst_format {
                    return Err(malformed(
                        offset,
                        format!("{dst} is {:?}, record says {dst_format:?}", image.format()),
                    ));
                }
                let entry = store.surface_mut(src)?;
                image
                    .write()
                    .copy_from(entry.draw_buffer(), Rect::from_xywh(sx, sy, w, h), dx, dy);
            }
            Record::SetRectClip(rect) => self.state.clip = ClipRegion::rect(rect),
            Record::BeginShapeClip => self.state.shape_spans = Some(Vec::new()),
            Record::SetShapeClipSpans(spans) => self
                .state
                .shape_spans
                .as_mut()
                .ok_or_else(|| malformed(offset, "clip spans outside a shape clip"))?
                .extend(spans),
            Record::EndShapeClip => {
                let spans = self
                    .state
                    .shape_spans
                    .take()
                    .ok_or_else(|| malformed(offset, "shape clip was never begun"))?;
                self.state.clip = ClipRegion::from_spans(spans);
            }
            Record::ResetClip => self.state.clip = ClipRegion::unbounded(),
            Record::SetAlphaComposite {
                rule, extra_alpha, ..
            } => self.state.composite = Composite::alpha(rule, extra_alpha),
            Record::SetXorComposite { xor_pixel } => {
                self.state.composite = Composite::xor(xor_pixel)
            }
            Record::ResetComposite => self.state.composite = Composite::default(),
            Record::SetTransform(transform) => self.state.transform = transform,
            Record::ResetTransform => self.state.transform = AffineTransform::IDENTITY,
            Record::SetSurfaces { src, dst } => {
                let config = store.surface_mut(dst)?.config;
                store.surface_mut(src)?;
                self.bind(Bound::Surfaces { config, src, dst });
            }
            Record::SetScratchSurface { config } => {
                if !store.has_config(config) {
                    return Err(ExecutionError::UnknownHandle(config));
                }
                self.bind(Bound::Scratch { config });
            }
            Record::FlushSurface(handle) => {
                store
                    .surfaces
                    .get_mut(&handle)
                    .ok_or(ExecutionError::UnknownHandle(handle))?
                    .release();
                log::debug!("Software device released the storage of {handle}.");
            }
            Record::DisposeSurface(handle) => {
                store.dispose_surface(handle)?;
                if self.bound.is_some_and(|b| b.references(handle)) {
                    self.unbind();
                }
                log::debug!("Software device disposed {handle}.");
            }
            Record::DisposeConfig(config) => {
                let dropped = store.dispose_config(config)?;
                if self.bound.is_some_and(|b| b.config() == config) {
                    self.unbind();
                }
                log::debug!("Software device disposed config {config} ({dropped} surfaces).");
            }
            Record::InvalidateContext => self.unbind(),
            Record::Sync => log::trace!("Software device synced."),
            Record::SwapBuffers(handle) => store.surface_mut(handle)?.swap(),
            Record::ResetPaint => self.state.paint = None,
            Record::SetColor { argb_pre } => self.state.paint = Some(argb_pre),
        }
        self.records += 1;
        Ok(())
    }

    fn fill(
        &mut self,
        store: &mut SurfaceStore,
        offset: usize,
        rect: Rect,
    ) -> Result<(), ExecutionError> {
        let dst = self.bound_dst(offset)?;
        let color = self
            .state
            .paint
            .ok_or_else(|| malformed(offset, "fill without a paint"))?;
        let rect = if self.state.transform.is_identity() {
            rect
        } else {
            let (x1, y1, x2, y2) = self.state.transform.transform_bounds(
                rect.x1 as f64,
                rect.y1 as f64,
                rect.x2 as f64,
                rect.y2 as f64,
            );
            Rect::covering(x1, y1, x2, y2)
        };
        let entry = store.surface_mut(dst)?;
        blend::fill_rect(
            entry.draw_buffer_mut(),
            rect,
            &self.state.clip,
            &self.state.composite,
            color,
        );
        Ok(())
    }

    fn blit(
        &mut self,
        store: &mut SurfaceStore,
        offset: usize,
        op: &BlitOp,
        resources: &dyn ResourceTable,
    ) -> Result<(), ExecutionError> {
        if op.params.is_iso() == op.src.is_cpu() {
            return Err(malformed(offset, "surface copy flag does not match the source"));
        }
        let (target_kind, target_config) = {
            let entry = store.surface_mut(op.target)?;
            (entry.kind, entry.config)
        };

        // Uploads into plain textures run on the scratch binding and ignore
        // clip and composite; everything else draws into the bound surface.
        let upload = target_kind == SurfaceKind::Texture;
        let (clip, composite) = if upload {
            if self.bound != Some(Bound::Scratch { config: target_config }) {
                let reason = format!("upload into {} without its scratch binding", op.target);
                return Err(malformed(offset, reason));
            }
            (ClipRegion::unbounded(), Composite::SRC)
        } else {
            if self.bound_dst(offset)? != op.target {
                let reason = format!("draw into {}, which is not bound", op.target);
                return Err(malformed(offset, reason));
            }
            (self.state.clip.clone(), self.state.composite)
        };

        let (dx1, dy1, dx2, dy2) = op.dst;
        let r = op.src_rect;
        let mut to_device = AffineTransform::rect_to_rect(
            r.x1 as f64,
            r.y1 as f64,
            r.x2 as f64,
            r.y2 as f64,
            dx1,
            dy1,
            dx2,
            dy2,
        );
        if op.params.has_transform() {
            to_device = to_device.then(&self.state.transform);
        }

        let draw = |src: &PixelBuffer, dst: &mut PixelBuffer| {
            blend::draw_mapped(src, r, dst, &to_device, &clip, &composite);
        };

        if op.src.is_cpu() {
            let image = resources
                .cpu_image(op.src)
                .ok_or(ExecutionError::UnknownHandle(op.src))?;
            if op.params.src_format() != image.format().id() {
                return Err(malformed(offset, format!("{} is not {:?}", op.src, image.format())));
            }
            let pixels = image.read();
            draw(&*pixels, store.surface_mut(op.target)?.draw_buffer_mut());
        } else if op.src == op.target {
            let entry = store.surface_mut(op.target)?;
            let snapshot = entry.draw_buffer().clone();
            draw(&snapshot, entry.draw_buffer_mut());
        } else {
            store.surface_mut(op.src)?;
            let mut target: SurfaceEntry = store
                .surfaces
                .remove(&op.target)
                .ok_or(ExecutionError::UnknownHandle(op.target))?;
            let result = match store.surfaces.get(&op.src) {
                Some(source) => {
                    draw(source.draw_buffer(), target.draw_buffer_mut());
                    Ok(())
                }
                None => Err(ExecutionError::UnknownHandle(op.src)),
            };
            store.surfaces.insert(op.target, target);
            result?;
        }
        Ok(())
    }
}

impl NativeExecutor for SoftwareExecutor {
    fn execute(
        &mut self,
        records: &[u8],
        resources: &dyn ResourceTable,
    ) -> Result<(), ExecutionError> {
        let store = Arc::clone(&self.store);
        let mut store = store.lock();
        for item in RecordReader::new(records) {
            let (offset, record) = item?;
            log::trace!("Software device executing {:?} at {offset}", record.opcode());
            if let Err(err) = self.apply(&mut store, offset, record, resources) {
                log::warn!("Software device failed at offset {offset}: {err}");
                return Err(err);
            }
        }
        Ok(())
    }

    fn allocate_surface(
        &mut self,
        config: NativeHandle,
        request: &SurfaceRequest,
    ) -> Result<NativeHandle, ResourceError> {
        self.store.lock().allocate(config, request, &self.limits)
    }
}
