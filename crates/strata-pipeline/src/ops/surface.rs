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

//! Loops drawing into drawable driver surfaces.

use super::{blit_record, draw_request};
use crate::dispatch::{DrawContext, Geometry, Primitive};
use crate::error::PipelineError;
use crate::ops::Interpolation;
use crate::record::PackedParams;
use strata_core::{SurfaceCaps, SurfaceDescriptor, SurfaceKind, SurfaceRef};

fn drawable(dst: &SurfaceDescriptor) -> bool {
    match dst.kind() {
        SurfaceKind::OnscreenSurface => true,
        SurfaceKind::RenderTargetTexture => dst.has_caps(SurfaceCaps::RENDER_TO_TEXTURE),
        SurfaceKind::Texture => false,
    }
}

/// Surface to surface draws through the driver's textured path.
///
/// Flushes at once only when the destination is on screen and the source is
/// not a plain texture; everything else stays batched.
#[derive(Debug, Default)]
pub struct IsoBlitLoop;

impl<G: Geometry> Primitive<G> for IsoBlitLoop {
    fn name(&self) -> &'static str {
        "IsoBlit"
    }

    fn accepts(&self, cx: &DrawContext<'_>, geom: &G) -> bool {
        let (SurfaceRef::Gpu(src), SurfaceRef::Gpu(dst)) = (cx.src, cx.dst) else {
            return false;
        };
        // Filtering a padded texture would sample the padding.
        let padded_filtered = src.kind() == SurfaceKind::Texture
            && src.is_padded()
            && geom.hint() != Interpolation::Nearest;
        drawable(dst) && !padded_filtered
    }

    fn draw(&self, cx: &DrawContext<'_>, geom: &G) -> Result<(), PipelineError> {
        let (SurfaceRef::Gpu(src), SurfaceRef::Gpu(dst)) = (cx.src, cx.dst) else {
            return Ok(());
        };
        let quad = geom.quad();
        let params = PackedParams::new(
            true,
            quad.transform.is_some(),
            src.kind() == SurfaceKind::RenderTargetTexture,
            src.kind().is_texture_backed(),
            geom.hint().id(),
            0,
        );

        let guard = cx.queue.lock();
        guard.validate(&draw_request(dst, cx, &quad).src(src.handle()));
        guard.retain_surface(src);
        guard.retain_surface(dst);
        guard.enqueue(&blit_record(params, &quad, src.handle(), dst.handle()));
        if dst.kind() == SurfaceKind::OnscreenSurface && src.kind() != SurfaceKind::Texture {
            guard.flush_now()?;
        }
        Ok(())
    }
}

/// CPU image to drawable surface draws. The image may change as soon as the
/// call returns, so every draw flushes.
#[derive(Debug, Default)]
pub struct SwToSurfaceLoop;

impl<G: Geometry> Primitive<G> for SwToSurfaceLoop {
    fn name(&self) -> &'static str {
        "SwToSurface"
    }

    fn accepts(&self, cx: &DrawContext<'_>, _geom: &G) -> bool {
        matches!((cx.src, cx.dst), (SurfaceRef::Cpu(_), SurfaceRef::Gpu(dst)) if drawable(dst))
    }

    fn draw(&self, cx: &DrawContext<'_>, geom: &G) -> Result<(), PipelineError> {
        let (SurfaceRef::Cpu(image), SurfaceRef::Gpu(dst)) = (cx.src, cx.dst) else {
            return Ok(());
        };
        let quad = geom.quad();
        let params = PackedParams::new(
            false,
            quad.transform.is_some(),
            false,
            false,
            geom.hint().id(),
            image.format().id(),
        );

        let guard = cx.queue.lock();
        guard.validate(&draw_request(dst, cx, &quad));
        guard.retain_image(image);
        guard.retain_surface(dst);
        guard.enqueue(&blit_record(params, &quad, image.handle(), dst.handle()));
        guard.flush_now()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::PrimitiveRegistry;
    use crate::ops::{BlitRect, Blitter, ScaleRect};
    use crate::record::Record;
    use crate::testing::{queue_with, surface, FakeExecutor, TestConfig};
    use std::sync::Arc;
    use strata_core::{
        ClipRegion, Composite, CpuImage, PixelFormat, Rect, SurfaceCaps, Transparency,
    };

    #[test]
    fn onscreen_destination_flushes_once() {
        let (queue, log) = queue_with(FakeExecutor::default(), 0);
        let registry = PrimitiveRegistry::new();
        let config = Arc::new(TestConfig::new(1));
        let src = surface(&config, 10, SurfaceKind::RenderTargetTexture, 32, 32, Transparency::Translucent);
        let dst = surface(&config, 11, SurfaceKind::OnscreenSurface, 32, 32, Transparency::Opaque);

        Blitter::new(&queue, &registry)
            .blit(
                &src.clone().into(),
                &dst.clone().into(),
                &Composite::SRC_OVER,
                &ClipRegion::rect(Rect::new(0, 0, 32, 32)),
                BlitRect::new(0, 0, 5, 5, 10, 10),
            )
            .unwrap();

        assert_eq!(queue.stats().flushes, 1);
        assert_eq!(log.execute_calls(), 1);
        let Some(Record::Blit { params, sx2, dx1, dx2, .. }) = log.records().last().cloned() else {
            panic!("last record is not a blit");
        };
        assert!(params.is_iso() && params.is_rtt() && params.is_texture());
        assert_eq!((sx2, dx1, dx2), (10, 5.0, 15.0));
    }

    #[test]
    fn offscreen_destination_stays_batched() {
        let (queue, log) = queue_with(FakeExecutor::default(), 0);
        let registry = PrimitiveRegistry::new();
        let config = Arc::new(TestConfig::new(1));
        let src = surface(&config, 10, SurfaceKind::Texture, 16, 16, Transparency::Opaque);
        let dst = surface(&config, 11, SurfaceKind::RenderTargetTexture, 16, 16, Transparency::Opaque);
        let blitter = Blitter::new(&queue, &registry);
        let clip = ClipRegion::rect(Rect::new(0, 0, 16, 16));

        blitter
            .blit(&src.clone().into(), &dst.clone().into(), &Composite::SRC, &clip, BlitRect::new(0, 0, 0, 0, 8, 8))
            .unwrap();
        let onscreen = surface(&config, 12, SurfaceKind::OnscreenSurface, 16, 16, Transparency::Opaque);
        blitter
            .blit(&src.clone().into(), &onscreen.into(), &Composite::SRC, &clip, BlitRect::new(0, 0, 0, 0, 8, 8))
            .unwrap();

        assert_eq!(log.execute_calls(), 0);
        assert!(queue.lock().pending_records() > 0);
        queue.flush_now().unwrap();
        let blits = log
            .records()
            .into_iter()
            .filter(|r| matches!(r, Record::Blit { .. }))
            .count();
        assert_eq!(blits, 2);
    }

    #[test]
    fn render_target_without_capability_falls_back() {
        let (queue, _log) = queue_with(FakeExecutor::default(), 0);
        let registry = PrimitiveRegistry::new();
        let config = Arc::new(TestConfig::with_caps(2, SurfaceCaps::TEXTURE_NPOT));
        let src = surface(&config, 10, SurfaceKind::OnscreenSurface, 8, 8, Transparency::Opaque);
        let dst = surface(&config, 11, SurfaceKind::RenderTargetTexture, 8, 8, Transparency::Opaque);
        let cx = DrawContext {
            queue: &queue,
            registry: &registry,
            src: &src.into(),
            dst: &dst.into(),
            composite: &Composite::SRC,
            clip: &ClipRegion::unbounded(),
        };
        let geom = BlitRect::new(0, 0, 0, 0, 8, 8);
        let chosen = registry.table::<BlitRect>().lookup(&cx, &geom).map(|p| p.name());
        assert_eq!(chosen, Some("GenericAdapter"));
    }

    #[test]
    fn filtered_padded_texture_is_declined() {
        let (queue, _log) = queue_with(FakeExecutor::default(), 0);
        let registry = PrimitiveRegistry::new();
        let config = Arc::new(TestConfig::with_caps(3, SurfaceCaps::RENDER_TO_TEXTURE));
        let src: SurfaceRef = surface(&config, 10, SurfaceKind::Texture, 5, 5, Transparency::Opaque).into();
        let dst: SurfaceRef = surface(&config, 11, SurfaceKind::OnscreenSurface, 8, 8, Transparency::Opaque).into();
        let clip = ClipRegion::unbounded();
        let cx = DrawContext {
            queue: &queue,
            registry: &registry,
            src: &src,
            dst: &dst,
            composite: &Composite::SRC,
            clip: &clip,
        };
        let smooth = ScaleRect::new(Rect::new(0, 0, 5, 5), (0.0, 0.0, 8.0, 8.0), Interpolation::Bilinear);
        let sharp = ScaleRect { hint: Interpolation::Nearest, ..smooth };
        assert!(!<IsoBlitLoop as Primitive<ScaleRect>>::accepts(&IsoBlitLoop, &cx, &smooth));
        assert!(<IsoBlitLoop as Primitive<ScaleRect>>::accepts(&IsoBlitLoop, &cx, &sharp));
    }

    #[test]
    fn cpu_source_always_flushes() {
        let (queue, log) = queue_with(FakeExecutor::default(), 0);
        let registry = PrimitiveRegistry::new();
        let config = Arc::new(TestConfig::new(1));
        let dst = surface(&config, 11, SurfaceKind::RenderTargetTexture, 16, 16, Transparency::Opaque);
        let image = CpuImage::new(PixelFormat::IntRgb, 4, 4);

        Blitter::new(&queue, &registry)
            .blit(
                &image.clone().into(),
                &dst.into(),
                &Composite::SRC,
                &ClipRegion::unbounded(),
                BlitRect::new(0, 0, 2, 2, 4, 4),
            )
            .unwrap();

        assert_eq!(log.execute_calls(), 1);
        assert_eq!(Arc::strong_count(&image), 1);
        let Some(Record::Blit { params, src, .. }) = log.records().last().cloned() else {
            panic!("last record is not a blit");
        };
        assert_eq!(src, image.handle());
        assert_eq!(params.src_format(), PixelFormat::IntRgb.id());
        assert!(!params.is_iso());
    }
}
