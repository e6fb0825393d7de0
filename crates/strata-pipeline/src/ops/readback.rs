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

//! Reads driver surface pixels back into CPU images.

use super::BlitRect;
use crate::context::ValidateRequest;
use crate::dispatch::{DrawContext, Primitive};
use crate::error::PipelineError;
use crate::queue::QueueGuard;
use crate::record::Record;
use std::sync::Arc;
use strata_core::pixel::blend;
use strata_core::{AffineTransform, Composite, CpuImage, Rect, SurfaceDescriptor, SurfaceRef};

/// Copies surface pixels into a CPU image, converting to the image format on
/// the driver side. Always flushes, since the caller reads the image next.
///
/// With a shaped clip the block is read into a canonical scratch image
/// first and copied into the destination span by span.
#[derive(Debug, Default)]
pub struct SurfaceToSwLoop;

fn read_block(
    guard: &QueueGuard<'_>,
    src: &Arc<SurfaceDescriptor>,
    dst: &Arc<CpuImage>,
    block: &BlitRect,
) -> Result<(), PipelineError> {
    guard.validate(&ValidateRequest::new(src));
    guard.retain_surface(src);
    guard.retain_image(dst);
    guard.enqueue(&Record::SurfaceToSwBlit {
        sx: block.sx,
        sy: block.sy,
        dx: block.dx,
        dy: block.dy,
        w: block.w,
        h: block.h,
        dst_format: dst.format(),
        src: src.handle(),
        dst: dst.handle(),
    });
    guard.flush_now()?;
    Ok(())
}

impl Primitive<BlitRect> for SurfaceToSwLoop {
    fn name(&self) -> &'static str {
        "SurfaceToSw"
    }

    fn accepts(&self, cx: &DrawContext<'_>, _geom: &BlitRect) -> bool {
        matches!((cx.src, cx.dst), (SurfaceRef::Gpu(_), SurfaceRef::Cpu(_)))
    }

    fn draw(&self, cx: &DrawContext<'_>, geom: &BlitRect) -> Result<(), PipelineError> {
        let (SurfaceRef::Gpu(src), SurfaceRef::Cpu(image)) = (cx.src, cx.dst) else {
            return Ok(());
        };
        let block = geom
            .clip_source(&src.bounds())
            .clip_dest(&cx.clip.bounds().intersect(&image.bounds()));
        if block.is_empty() {
            return Ok(());
        }

        if cx.clip.is_rectangular() {
            let guard = cx.queue.lock();
            return read_block(&guard, src, image, &block);
        }

        let scratch = cx.registry.readback_cache().acquire(block.w as u32, block.h as u32);
        {
            let guard = cx.queue.lock();
            let local = BlitRect::new(block.sx, block.sy, 0, 0, block.w, block.h);
            read_block(&guard, src, &scratch, &local)?;
        }
        let pixels = scratch.read();
        blend::draw_mapped(
            &pixels,
            Rect::from_xywh(0, 0, block.w, block.h),
            &mut image.write(),
            &AffineTransform::translation(block.dx as f64, block.dy as f64),
            cx.clip,
            &Composite::SRC,
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::PrimitiveRegistry;
    use crate::ops::Blitter;
    use crate::testing::{queue_with, surface, FakeExecutor, TestConfig};
    use strata_core::{ClipRegion, PixelFormat, SurfaceKind, Transparency};

    #[test]
    fn rectangular_readback_is_one_record() {
        let (queue, log) = queue_with(FakeExecutor::default(), 0);
        let registry = PrimitiveRegistry::new();
        let config = Arc::new(TestConfig::new(1));
        let src = surface(&config, 30, SurfaceKind::OnscreenSurface, 20, 20, Transparency::Opaque);
        let image = CpuImage::new(PixelFormat::Ushort555Rgb, 8, 8);

        Blitter::new(&queue, &registry)
            .blit(
                &src.clone().into(),
                &image.clone().into(),
                &Composite::SRC,
                &ClipRegion::unbounded(),
                BlitRect::new(15, 15, 0, 0, 8, 8),
            )
            .unwrap();

        assert_eq!(log.execute_calls(), 1);
        assert_eq!(
            log.records().last(),
            Some(&Record::SurfaceToSwBlit {
                sx: 15,
                sy: 15,
                dx: 0,
                dy: 0,
                w: 5,
                h: 5,
                dst_format: PixelFormat::Ushort555Rgb,
                src: src.handle(),
                dst: image.handle(),
            })
        );
    }

    #[test]
    fn shaped_clip_reads_into_scratch() {
        let (queue, log) = queue_with(FakeExecutor::default(), 0);
        let registry = PrimitiveRegistry::new();
        let config = Arc::new(TestConfig::new(1));
        let src = surface(&config, 30, SurfaceKind::Texture, 8, 8, Transparency::Opaque);
        let image = CpuImage::from_buffer(strata_core::PixelBuffer::solid(
            PixelFormat::IntRgb,
            8,
            8,
            0xFFFF_FFFF,
        ));
        let clip = ClipRegion::from_spans([Rect::new(0, 0, 8, 2), Rect::new(0, 4, 8, 6)]);

        Blitter::new(&queue, &registry)
            .blit(
                &src.into(),
                &image.clone().into(),
                &Composite::SRC,
                &clip,
                BlitRect::new(0, 0, 0, 0, 8, 8),
            )
            .unwrap();

        let Some(Record::SurfaceToSwBlit { dst, dst_format, .. }) = log.records().last().cloned() else {
            panic!("expected a readback");
        };
        assert_ne!(dst, image.handle());
        assert_eq!(dst_format, PixelFormat::IntArgbPre);
        // The fake driver leaves the scratch zeroed: only clipped rows change.
        assert_eq!(image.read().get(0, 0), 0xFF00_0000);
        assert_eq!(image.read().get(0, 3), 0xFFFF_FFFF);
    }
}
