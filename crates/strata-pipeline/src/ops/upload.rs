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

//! Uploads of CPU pixels into plain textures.

use super::{blit_record, BlitRect};
use crate::dispatch::{DrawContext, Geometry, Primitive};
use crate::error::PipelineError;
use crate::record::PackedParams;
use strata_core::{SurfaceKind, SurfaceRef};

/// Writes a CPU image block into a texture, a sub-image upload on the
/// driver side. Textures have no clip state, so only rectangular clips are
/// taken; the block is already clipped to them.
#[derive(Debug, Default)]
pub struct SwToTextureLoop;

impl Primitive<BlitRect> for SwToTextureLoop {
    fn name(&self) -> &'static str {
        "SwToTexture"
    }

    fn accepts(&self, cx: &DrawContext<'_>, _geom: &BlitRect) -> bool {
        cx.clip.is_rectangular()
            && matches!(
                (cx.src, cx.dst),
                (SurfaceRef::Cpu(_), SurfaceRef::Gpu(dst)) if dst.kind() == SurfaceKind::Texture
            )
    }

    fn draw(&self, cx: &DrawContext<'_>, geom: &BlitRect) -> Result<(), PipelineError> {
        let (SurfaceRef::Cpu(image), SurfaceRef::Gpu(dst)) = (cx.src, cx.dst) else {
            return Ok(());
        };
        let geom = geom.clip_dest(&cx.clip.bounds());
        if geom.is_empty() {
            return Ok(());
        }
        let params = PackedParams::new(
            false,
            false,
            false,
            true,
            geom.hint().id(),
            image.format().id(),
        );

        let guard = cx.queue.lock();
        guard.bind_scratch(dst.config().as_ref());
        guard.retain_image(image);
        guard.retain_surface(dst);
        guard.enqueue(&blit_record(params, &geom.quad(), image.handle(), dst.handle()));
        guard.flush_now()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Binding;
    use crate::dispatch::PrimitiveRegistry;
    use crate::ops::Blitter;
    use crate::record::Record;
    use crate::testing::{queue_with, surface, FakeExecutor, TestConfig};
    use std::sync::Arc;
    use strata_core::{ClipRegion, Composite, CpuImage, NativeHandle, PixelFormat, Rect, Transparency};

    #[test]
    fn upload_binds_scratch_and_flushes() {
        let (queue, log) = queue_with(FakeExecutor::default(), 0);
        let registry = PrimitiveRegistry::new();
        let config = Arc::new(TestConfig::new(4));
        let texture = surface(&config, 20, SurfaceKind::Texture, 10, 10, Transparency::Opaque);
        let image = CpuImage::new(PixelFormat::ThreeByteBgr, 10, 10);

        Blitter::new(&queue, &registry)
            .blit(
                &image.clone().into(),
                &texture.clone().into(),
                &Composite::SRC,
                &ClipRegion::rect(Rect::new(0, 0, 10, 10)),
                BlitRect::new(0, 0, 0, 0, 10, 10),
            )
            .unwrap();

        assert_eq!(log.execute_calls(), 1);
        let records = log.records();
        assert_eq!(
            records[0],
            Record::SetScratchSurface {
                config: NativeHandle(4)
            }
        );
        let Record::Blit { params, dst, .. } = &records[1] else {
            panic!("expected a blit");
        };
        assert!(params.is_texture() && !params.is_iso());
        assert_eq!(*dst, texture.handle());
        assert_eq!(
            queue.lock().context().binding(),
            Some(Binding::Scratch {
                config: NativeHandle(4)
            })
        );
    }

    #[test]
    fn shaped_clip_is_declined() {
        let (queue, _log) = queue_with(FakeExecutor::default(), 0);
        let registry = PrimitiveRegistry::new();
        let config = Arc::new(TestConfig::new(4));
        let src: SurfaceRef = CpuImage::new(PixelFormat::IntArgb, 4, 4).into();
        let dst: SurfaceRef = surface(&config, 20, SurfaceKind::Texture, 4, 4, Transparency::Opaque).into();
        let clip = ClipRegion::from_spans([Rect::new(0, 0, 4, 1), Rect::new(0, 2, 4, 3)]);
        let cx = DrawContext {
            queue: &queue,
            registry: &registry,
            src: &src,
            dst: &dst,
            composite: &Composite::SRC,
            clip: &clip,
        };
        assert!(!SwToTextureLoop.accepts(&cx, &BlitRect::new(0, 0, 0, 0, 4, 4)));
    }
}
