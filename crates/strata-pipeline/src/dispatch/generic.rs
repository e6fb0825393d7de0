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

//! The adapter used when no direct loop exists for a request.
//!
//! The source is first converted into a canonical premultiplied image, then
//! a direct loop from that image to the destination runs. When the
//! destination cannot take the requested composite either, the affected
//! destination region is read into a second canonical image, composited in
//! software and copied back with a plain copy.

use super::{
    effective_kind, DestType, DrawContext, Geometry, IntermediateCache, Primitive, SourceType,
};
use crate::error::PipelineError;
use crate::ops::BlitRect;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use strata_core::pixel::blend;
use strata_core::{
    AffineTransform, ClipRegion, Composite, CompositeKind, PixelFormat, Rect, SurfaceRef,
};

const CANONICAL: SourceType = SourceType::Cpu(PixelFormat::CANONICAL);

/// Counters of a [`GenericAdapter`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenericStats {
    /// Requests routed through the adapter.
    pub invocations: u64,
    /// Requests that also had to composite the destination in software.
    pub composite_fallbacks: u64,
    /// Intermediate images allocated.
    pub intermediates_created: u64,
    /// Intermediate images served from the cache.
    pub intermediates_reused: u64,
}

/// Converts through the canonical format. One instance serves every
/// geometry and destination type.
#[derive(Debug, Default)]
pub struct GenericAdapter {
    source: IntermediateCache,
    destination: IntermediateCache,
    invocations: AtomicU64,
    composite_fallbacks: AtomicU64,
}

impl GenericAdapter {
    /// Creates an adapter with empty caches.
    pub fn new() -> Self {
        Self::default()
    }

    /// A snapshot of the counters.
    pub fn stats(&self) -> GenericStats {
        GenericStats {
            invocations: self.invocations.load(Ordering::Relaxed),
            composite_fallbacks: self.composite_fallbacks.load(Ordering::Relaxed),
            intermediates_created: self.source.created() + self.destination.created(),
            intermediates_reused: self.source.reused() + self.destination.reused(),
        }
    }

    /// Drops both cached images.
    pub fn purge(&self) {
        self.source.purge();
        self.destination.purge();
    }

    /// Runs one blit through a direct loop of the blit table.
    fn copy(
        cx: &DrawContext<'_>,
        src: &SurfaceRef,
        dst: &SurfaceRef,
        clip: &ClipRegion,
        rect: BlitRect,
    ) -> Result<(), PipelineError> {
        let copy_cx = DrawContext {
            src,
            dst,
            composite: &Composite::SRC,
            clip,
            ..*cx
        };
        let (src_type, dst_type) = (SourceType::of(src), DestType::of(dst));
        cx.registry
            .table::<BlitRect>()
            .lookup_direct(&copy_cx, &rect, src_type, CompositeKind::SrcNoEa, dst_type)
            .ok_or(PipelineError::NoLoop {
                src: src_type,
                composite: CompositeKind::SrcNoEa,
                dst: dst_type,
            })?
            .draw(&copy_cx, &rect)
    }

    /// Composites `cx.src`, which must be a canonical CPU image, into the
    /// destination region the operation touches, then copies that region back.
    ///
    /// The queue lock is held from the read to the write-back so no other
    /// producer can draw into the region in between.
    fn composite_in_software<G: Geometry>(
        &self,
        cx: &DrawContext<'_>,
        geom: &G,
    ) -> Result<(), PipelineError> {
        self.composite_fallbacks.fetch_add(1, Ordering::Relaxed);
        let area = geom
            .device_bounds()
            .intersect(&cx.clip.bounds())
            .intersect(&cx.dst.bounds());
        if area.is_empty() {
            return Ok(());
        }
        let Some(src_image) = cx.src.as_cpu() else {
            return Err(PipelineError::NoLoop {
                src: SourceType::of(cx.src),
                composite: cx.composite.kind(),
                dst: DestType::of(cx.dst),
            });
        };
        log::debug!(
            "Compositing {:?} into {} in software over {area:?}",
            cx.composite,
            cx.dst.handle()
        );

        let _guard = cx.queue.lock();
        let (w, h) = (area.width(), area.height());
        let local = Rect::from_xywh(0, 0, w, h);
        let scratch_image = self.destination.acquire(w as u32, h as u32);
        let scratch = SurfaceRef::Cpu(Arc::clone(&scratch_image));

        Self::copy(
            cx,
            cx.dst,
            &scratch,
            &ClipRegion::rect(local),
            BlitRect::new(area.x1, area.y1, 0, 0, w, h),
        )?;

        {
            let to_local = geom
                .to_device()
                .then(&AffineTransform::translation(-area.x1 as f64, -area.y1 as f64));
            let clip = cx.clip.translate(-area.x1, -area.y1).intersect_rect(&local);
            let src_pixels = src_image.read();
            let mut scratch_pixels = scratch_image.write();
            blend::draw_mapped(
                &src_pixels,
                geom.src_rect(),
                &mut scratch_pixels,
                &to_local,
                &clip,
                cx.composite,
            );
        }

        Self::copy(
            cx,
            &scratch,
            cx.dst,
            &ClipRegion::rect(area),
            BlitRect::new(0, 0, area.x1, area.y1, w, h),
        )
    }
}

impl<G: Geometry> Primitive<G> for GenericAdapter {
    fn name(&self) -> &'static str {
        "GenericAdapter"
    }

    fn draw(&self, cx: &DrawContext<'_>, geom: &G) -> Result<(), PipelineError> {
        self.invocations.fetch_add(1, Ordering::Relaxed);
        let requested = geom.src_rect();
        let src_rect = requested.intersect(&cx.src.bounds());
        if src_rect.is_empty() {
            return Ok(());
        }

        let converted;
        let (canonical, moved) = if SourceType::of(cx.src) == CANONICAL {
            (cx.src, *geom)
        } else {
            let (w, h) = (src_rect.width(), src_rect.height());
            converted = SurfaceRef::Cpu(self.source.acquire(w as u32, h as u32));
            Self::copy(
                cx,
                cx.src,
                &converted,
                &ClipRegion::rect(Rect::from_xywh(0, 0, w, h)),
                BlitRect::new(src_rect.x1, src_rect.y1, 0, 0, w, h),
            )?;
            let moved =
                geom.with_src_origin(requested.x1 - src_rect.x1, requested.y1 - src_rect.y1);
            (&converted, moved)
        };

        let leg = DrawContext {
            src: canonical,
            ..*cx
        };
        let direct = G::table(cx.registry).lookup_direct(
            &leg,
            &moved,
            CANONICAL,
            effective_kind(&leg),
            DestType::of(cx.dst),
        );
        match direct {
            Some(primitive) => primitive.draw(&leg, &moved),
            None => self.composite_in_software(&leg, &moved),
        }
    }
}
