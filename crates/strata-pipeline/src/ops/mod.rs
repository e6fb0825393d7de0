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

//! Blit, scale and transform operations.
//!
//! [`Blitter`] is the front end: it rejects disposed surfaces, clips each
//! request to its source and destination, and hands what is left to the loop
//! the registry picks. The loops themselves live in the submodules and are
//! registered by [`register_loops`].

mod readback;
mod software;
mod surface;
mod upload;

pub use readback::SurfaceToSwLoop;
pub use software::SoftwareLoop;
pub use surface::{IsoBlitLoop, SwToSurfaceLoop};
pub use upload::SwToTextureLoop;

use crate::context::{ValidateFlags, ValidateRequest};
use crate::dispatch::{
    BlitQuad, DestType, DispatchKey, DrawContext, Geometry, Primitive, PrimitiveRegistry,
    SourceType,
};
use crate::error::PipelineError;
use crate::queue::RenderQueue;
use crate::record::{PackedParams, Record};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use strata_core::pixel::blend;
use strata_core::{
    AffineTransform, ClipRegion, Composite, CompositeKind, NativeHandle, Paint, PixelFormat,
    Rect, ResourceError, SourceProducer, SurfaceKind, SurfaceRef,
};

/// Interpolation requested for scaled and transformed draws. The id is the
/// value carried in the hint byte of a blit record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interpolation {
    /// Nearest neighbour.
    #[default]
    Nearest,
    /// Bilinear.
    Bilinear,
    /// Bicubic.
    Bicubic,
}

impl Interpolation {
    /// The hint id.
    pub const fn id(self) -> u8 {
        match self {
            Interpolation::Nearest => 1,
            Interpolation::Bilinear => 2,
            Interpolation::Bicubic => 3,
        }
    }

    /// Parses a hint id.
    pub const fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Interpolation::Nearest),
            2 => Some(Interpolation::Bilinear),
            3 => Some(Interpolation::Bicubic),
            _ => None,
        }
    }
}

/// An unscaled copy of a `w` x `h` block from `(sx, sy)` to `(dx, dy)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct BlitRect {
    pub sx: i32,
    pub sy: i32,
    pub dx: i32,
    pub dy: i32,
    pub w: i32,
    pub h: i32,
}

impl BlitRect {
    /// Creates a blit.
    pub const fn new(sx: i32, sy: i32, dx: i32, dy: i32, w: i32, h: i32) -> Self {
        Self {
            sx,
            sy,
            dx,
            dy,
            w,
            h,
        }
    }

    /// Shrinks the blit so it reads only inside `bounds`.
    pub fn clip_source(&self, bounds: &Rect) -> Self {
        let s = self.src_rect().intersect(bounds);
        Self::new(
            s.x1,
            s.y1,
            self.dx + (s.x1 - self.sx),
            self.dy + (s.y1 - self.sy),
            s.width(),
            s.height(),
        )
    }

    /// Shrinks the blit so it writes only inside `bounds`.
    pub fn clip_dest(&self, bounds: &Rect) -> Self {
        let d = self.device_bounds().intersect(bounds);
        Self::new(
            self.sx + (d.x1 - self.dx),
            self.sy + (d.y1 - self.dy),
            d.x1,
            d.y1,
            d.width(),
            d.height(),
        )
    }

    /// Returns `true` if nothing is copied.
    pub fn is_empty(&self) -> bool {
        self.w <= 0 || self.h <= 0
    }
}

/// Draws the source rectangle stretched onto a device-space rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleRect {
    /// Source pixels read.
    pub src: Rect,
    /// Destination corners `(x1, y1, x2, y2)` in device space. A corner
    /// order opposite to the source flips the image.
    pub dst: (f64, f64, f64, f64),
    /// Requested interpolation.
    pub hint: Interpolation,
}

impl ScaleRect {
    /// Creates a scaled draw.
    pub const fn new(src: Rect, dst: (f64, f64, f64, f64), hint: Interpolation) -> Self {
        Self { src, dst, hint }
    }
}

/// Draws the source rectangle onto a user-space rectangle, then through a
/// user to device transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformRect {
    /// Source pixels read.
    pub src: Rect,
    /// Destination corners `(x1, y1, x2, y2)` in user space.
    pub dst: (f64, f64, f64, f64),
    /// User to device transform.
    pub transform: AffineTransform,
    /// Requested interpolation.
    pub hint: Interpolation,
}

impl TransformRect {
    /// Creates a transformed draw.
    pub const fn new(
        src: Rect,
        dst: (f64, f64, f64, f64),
        transform: AffineTransform,
        hint: Interpolation,
    ) -> Self {
        Self {
            src,
            dst,
            transform,
            hint,
        }
    }
}

/// Maps the corners of `clipped` through `src -> dst` to get the matching
/// destination corners.
fn clip_mapped(src: Rect, dst: (f64, f64, f64, f64), clipped: Rect) -> (f64, f64, f64, f64) {
    if clipped == src {
        return dst;
    }
    let map = AffineTransform::rect_to_rect(
        src.x1 as f64,
        src.y1 as f64,
        src.x2 as f64,
        src.y2 as f64,
        dst.0,
        dst.1,
        dst.2,
        dst.3,
    );
    let (x1, y1) = map.transform_point(clipped.x1 as f64, clipped.y1 as f64);
    let (x2, y2) = map.transform_point(clipped.x2 as f64, clipped.y2 as f64);
    (x1, y1, x2, y2)
}

/// Builds the blit record for `quad`.
pub(crate) fn blit_record(
    params: PackedParams,
    quad: &BlitQuad,
    src: NativeHandle,
    dst: NativeHandle,
) -> Record {
    let (dx1, dy1, dx2, dy2) = quad.dst;
    Record::Blit {
        params,
        sx1: quad.src.x1,
        sy1: quad.src.y1,
        sx2: quad.src.x2,
        sy2: quad.src.y2,
        dx1,
        dy1,
        dx2,
        dy2,
        src,
        dst,
    }
}

/// The validate request of a draw into `dst` with the state of `cx`.
pub(crate) fn draw_request<'a>(
    dst: &'a strata_core::SurfaceDescriptor,
    cx: &DrawContext<'a>,
    quad: &'a BlitQuad,
) -> ValidateRequest<'a> {
    let flags = if cx.src.is_opaque() {
        ValidateFlags::SRC_IS_OPAQUE
    } else {
        ValidateFlags::empty()
    };
    let req = ValidateRequest::new(dst)
        .clip(cx.clip)
        .composite(cx.composite, flags);
    match quad.transform.as_ref() {
        Some(t) => req.transform(t),
        None => req,
    }
}

fn register_everywhere<P>(registry: &mut PrimitiveRegistry, key: DispatchKey, primitive: &Arc<P>)
where
    P: Primitive<BlitRect> + Primitive<ScaleRect> + Primitive<TransformRect> + 'static,
{
    registry.register::<BlitRect>(key, primitive.clone());
    registry.register::<ScaleRect>(key, primitive.clone());
    registry.register::<TransformRect>(key, primitive.clone());
}

/// Registers every built-in loop.
pub fn register_loops(registry: &mut PrimitiveRegistry) {
    const DRAWABLE: [SurfaceKind; 2] = [SurfaceKind::OnscreenSurface, SurfaceKind::RenderTargetTexture];

    let iso = Arc::new(IsoBlitLoop);
    let to_surface = Arc::new(SwToSurfaceLoop);
    let software = Arc::new(SoftwareLoop);
    let upload: Arc<dyn Primitive<BlitRect>> = Arc::new(SwToTextureLoop);
    let readback: Arc<dyn Primitive<BlitRect>> = Arc::new(SurfaceToSwLoop);

    for dst in DRAWABLE {
        for src in SurfaceKind::ALL {
            let key = DispatchKey::new(SourceType::Gpu(src), CompositeKind::AnyAlpha, DestType::Gpu(dst));
            register_everywhere(registry, key, &iso);
        }
        for format in PixelFormat::ALL {
            let key = DispatchKey::new(SourceType::Cpu(format), CompositeKind::AnyAlpha, DestType::Gpu(dst));
            register_everywhere(registry, key, &to_surface);
        }
    }

    for format in PixelFormat::ALL {
        registry.register::<BlitRect>(
            DispatchKey::new(
                SourceType::Cpu(format),
                CompositeKind::SrcNoEa,
                DestType::Gpu(SurfaceKind::Texture),
            ),
            upload.clone(),
        );
        for src in SurfaceKind::ALL {
            registry.register::<BlitRect>(
                DispatchKey::new(SourceType::Gpu(src), CompositeKind::SrcNoEa, DestType::Cpu(format)),
                readback.clone(),
            );
        }

        let canonical = SourceType::Cpu(PixelFormat::CANONICAL);
        let to_canonical = DispatchKey::new(
            SourceType::Cpu(format),
            CompositeKind::SrcNoEa,
            DestType::Cpu(PixelFormat::CANONICAL),
        );
        register_everywhere(registry, to_canonical, &software);
        register_everywhere(
            registry,
            DispatchKey::new(canonical, CompositeKind::AnyAlpha, DestType::Cpu(format)),
            &software,
        );
        register_everywhere(
            registry,
            DispatchKey::new(canonical, CompositeKind::Xor, DestType::Cpu(format)),
            &software,
        );
    }
}

/// The front end of the blit operations.
///
/// Cheap to create; borrow one per batch of draws.
#[derive(Debug, Clone, Copy)]
pub struct Blitter<'a> {
    queue: &'a RenderQueue,
    registry: &'a PrimitiveRegistry,
}

fn check_live(surface: &SurfaceRef) -> Result<(), PipelineError> {
    match surface {
        SurfaceRef::Gpu(desc) if desc.is_disposed() => {
            Err(ResourceError::Disposed(desc.handle()).into())
        }
        _ => Ok(()),
    }
}

impl<'a> Blitter<'a> {
    /// Creates a front end drawing through `queue` with the loops of `registry`.
    pub fn new(queue: &'a RenderQueue, registry: &'a PrimitiveRegistry) -> Self {
        Self { queue, registry }
    }

    fn run<G: Geometry>(
        &self,
        src: &SurfaceRef,
        dst: &SurfaceRef,
        composite: &Composite,
        clip: &ClipRegion,
        geom: &G,
    ) -> Result<(), PipelineError> {
        let cx = DrawContext {
            queue: self.queue,
            registry: self.registry,
            src,
            dst,
            composite,
            clip,
        };
        self.registry.dispatch(&cx, geom)
    }

    /// Copies a block of pixels.
    pub fn blit(
        &self,
        src: &SurfaceRef,
        dst: &SurfaceRef,
        composite: &Composite,
        clip: &ClipRegion,
        rect: BlitRect,
    ) -> Result<(), PipelineError> {
        check_live(src)?;
        check_live(dst)?;
        let clip = clip.intersect_rect(&dst.bounds());
        let rect = rect.clip_source(&src.bounds()).clip_dest(&clip.bounds());
        if rect.is_empty() || clip.is_empty() {
            return Ok(());
        }
        self.run(src, dst, composite, &clip, &rect)
    }

    /// Draws a source rectangle stretched onto a device rectangle.
    pub fn scale(
        &self,
        src: &SurfaceRef,
        dst: &SurfaceRef,
        composite: &Composite,
        clip: &ClipRegion,
        geom: ScaleRect,
    ) -> Result<(), PipelineError> {
        check_live(src)?;
        check_live(dst)?;
        let clip = clip.intersect_rect(&dst.bounds());
        let visible = geom.src.intersect(&src.bounds());
        if visible.is_empty() || clip.is_empty() {
            return Ok(());
        }
        let geom = ScaleRect {
            src: visible,
            dst: clip_mapped(geom.src, geom.dst, visible),
            ..geom
        };
        if geom.device_bounds().intersect(&clip.bounds()).is_empty() {
            return Ok(());
        }
        self.run(src, dst, composite, &clip, &geom)
    }

    /// Draws a source rectangle through a user to device transform.
    pub fn transform(
        &self,
        src: &SurfaceRef,
        dst: &SurfaceRef,
        composite: &Composite,
        clip: &ClipRegion,
        geom: TransformRect,
    ) -> Result<(), PipelineError> {
        check_live(src)?;
        check_live(dst)?;
        let clip = clip.intersect_rect(&dst.bounds());
        let visible = geom.src.intersect(&src.bounds());
        if visible.is_empty() || clip.is_empty() || geom.transform.inverse().is_none() {
            return Ok(());
        }
        let geom = TransformRect {
            src: visible,
            dst: clip_mapped(geom.src, geom.dst, visible),
            ..geom
        };
        if geom.device_bounds().intersect(&clip.bounds()).is_empty() {
            return Ok(());
        }
        self.run(src, dst, composite, &clip, &geom)
    }

    /// Draws the whole of a logical image at `(dx, dy)`, reading whichever
    /// representation `producer` hands out for the destination.
    pub fn draw_image(
        &self,
        producer: &dyn SourceProducer,
        dst: &SurfaceRef,
        composite: &Composite,
        clip: &ClipRegion,
        dx: i32,
        dy: i32,
    ) -> Result<(), PipelineError> {
        let src = producer.source_for(dst.as_gpu().map(|d| d.config().as_ref()));
        let b = src.bounds();
        let rect = BlitRect::new(b.x1, b.y1, dx, dy, b.width(), b.height());
        self.blit(&src, dst, composite, clip, rect)
    }

    /// Fills a rectangle with a paint.
    ///
    /// Plain textures are not drawable and have no fill loop.
    pub fn fill_rect(
        &self,
        dst: &SurfaceRef,
        composite: &Composite,
        clip: &ClipRegion,
        paint: &Paint,
        rect: Rect,
    ) -> Result<(), PipelineError> {
        check_live(dst)?;
        let clip = clip.intersect_rect(&dst.bounds());
        let rect = rect.intersect(&clip.bounds());
        if rect.is_empty() || clip.is_empty() {
            return Ok(());
        }
        match dst {
            SurfaceRef::Gpu(desc) if desc.kind().is_drawable() => {
                let guard = self.queue.lock();
                guard.validate(
                    &ValidateRequest::new(desc)
                        .clip(&clip)
                        .composite(composite, ValidateFlags::empty())
                        .paint(paint),
                );
                guard.retain_surface(desc);
                guard.enqueue(&Record::FillRect {
                    x: rect.x1,
                    y: rect.y1,
                    w: rect.width(),
                    h: rect.height(),
                });
                if desc.kind() == SurfaceKind::OnscreenSurface {
                    guard.flush_now()?;
                }
                Ok(())
            }
            SurfaceRef::Gpu(desc) => Err(PipelineError::NoLoop {
                src: SourceType::Any,
                composite: composite.kind(),
                dst: DestType::Gpu(desc.kind()),
            }),
            SurfaceRef::Cpu(image) => {
                blend::fill_rect(&mut image.write(), rect, &clip, composite, paint.argb_pre());
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{queue_with, surface, FakeExecutor, TestConfig};
    use strata_core::{CpuImage, PixelBuffer, Transparency};

    #[test]
    fn texture_to_texture_goes_through_one_reused_intermediate() {
        let (queue, log) = queue_with(FakeExecutor::default(), 0);
        let registry = PrimitiveRegistry::new();
        let config = Arc::new(TestConfig::new(1));
        let src: SurfaceRef = surface(&config, 40, SurfaceKind::Texture, 16, 16, Transparency::Opaque).into();
        let dst: SurfaceRef = surface(&config, 41, SurfaceKind::Texture, 16, 16, Transparency::Opaque).into();
        let blitter = Blitter::new(&queue, &registry);
        let clip = ClipRegion::unbounded();

        blitter
            .blit(&src, &dst, &Composite::SRC, &clip, BlitRect::new(0, 0, 0, 0, 10, 10))
            .unwrap();
        let stats = registry.generic_stats();
        assert_eq!((stats.invocations, stats.intermediates_created), (1, 1));
        assert_eq!(stats.composite_fallbacks, 0);
        let records = log.records();
        assert!(matches!(records.iter().find(|r| matches!(r, Record::SurfaceToSwBlit { .. })),
            Some(Record::SurfaceToSwBlit { w: 10, h: 10, .. })));
        assert!(matches!(records.last(), Some(Record::Blit { dst, .. }) if *dst == NativeHandle(41)));

        blitter
            .blit(&src, &dst, &Composite::SRC, &clip, BlitRect::new(0, 0, 0, 0, 10, 10))
            .unwrap();
        let stats = registry.generic_stats();
        assert_eq!(stats.invocations, 2);
        assert_eq!((stats.intermediates_created, stats.intermediates_reused), (1, 1));
    }

    #[test]
    fn blending_into_a_texture_round_trips_the_destination() {
        let (queue, log) = queue_with(FakeExecutor::default(), 0);
        let registry = PrimitiveRegistry::new();
        let config = Arc::new(TestConfig::new(1));
        let dst: SurfaceRef = surface(&config, 41, SurfaceKind::Texture, 16, 16, Transparency::Opaque).into();
        let src: SurfaceRef = CpuImage::new(PixelFormat::IntArgb, 4, 4).into();

        Blitter::new(&queue, &registry)
            .blit(&src, &dst, &Composite::SRC_OVER, &ClipRegion::unbounded(), BlitRect::new(0, 0, 2, 2, 4, 4))
            .unwrap();

        assert_eq!(registry.generic_stats().composite_fallbacks, 1);
        let kinds: Vec<_> = log
            .records()
            .into_iter()
            .filter_map(|r| match r {
                Record::SurfaceToSwBlit { sx, sy, w, h, .. } => Some(("read", sx, sy, w, h)),
                Record::Blit { dx1, dy1, sx2, sy2, .. } => {
                    Some(("write", dx1 as i32, dy1 as i32, sx2, sy2))
                }
                _ => None,
            })
            .collect();
        assert_eq!(kinds, vec![("read", 2, 2, 4, 4), ("write", 2, 2, 4, 4)]);
    }

    #[test]
    fn disposed_surfaces_are_rejected() {
        let (queue, _log) = queue_with(FakeExecutor::default(), 0);
        let registry = PrimitiveRegistry::new();
        let config = Arc::new(TestConfig::new(1));
        let desc = surface(&config, 40, SurfaceKind::OnscreenSurface, 8, 8, Transparency::Opaque);
        desc.mark_disposed();
        let src: SurfaceRef = CpuImage::new(PixelFormat::IntRgb, 2, 2).into();

        let err = Blitter::new(&queue, &registry)
            .blit(&src, &desc.into(), &Composite::SRC, &ClipRegion::unbounded(), BlitRect::new(0, 0, 0, 0, 2, 2))
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Resource(ResourceError::Disposed(NativeHandle(40)))
        ));
    }

    #[test]
    fn fully_clipped_requests_do_nothing() {
        let (queue, log) = queue_with(FakeExecutor::default(), 0);
        let registry = PrimitiveRegistry::empty();
        let config = Arc::new(TestConfig::new(1));
        let dst: SurfaceRef = surface(&config, 40, SurfaceKind::OnscreenSurface, 8, 8, Transparency::Opaque).into();
        let src: SurfaceRef = CpuImage::new(PixelFormat::IntRgb, 2, 2).into();
        let blitter = Blitter::new(&queue, &registry);
        let clip = ClipRegion::rect(Rect::new(0, 0, 4, 4));

        blitter
            .blit(&src, &dst, &Composite::SRC, &clip, BlitRect::new(0, 0, 6, 6, 2, 2))
            .unwrap();
        blitter
            .scale(&src, &dst, &Composite::SRC, &clip, ScaleRect::new(Rect::new(5, 5, 9, 9), (0.0, 0.0, 4.0, 4.0), Interpolation::Nearest))
            .unwrap();
        assert_eq!(log.execute_calls(), 0);

        let err = blitter
            .blit(&src, &dst, &Composite::SRC, &clip, BlitRect::new(0, 0, 0, 0, 2, 2))
            .unwrap_err();
        assert!(matches!(err, PipelineError::NoLoop { src: SourceType::Cpu(PixelFormat::IntRgb), .. }));
    }

    #[test]
    fn scale_clips_source_proportionally() {
        let (queue, _log) = queue_with(FakeExecutor::default(), 0);
        let registry = PrimitiveRegistry::new();
        let src = CpuImage::from_buffer(PixelBuffer::from_argb_pre(2, 1, &[0xFF11_1111, 0xFF22_2222]));
        let dst = CpuImage::new(PixelFormat::IntArgbPre, 8, 2);

        // The requested source is twice as wide as the image; only its left
        // half exists and lands on the left half of the destination.
        Blitter::new(&queue, &registry)
            .scale(
                &src.into(),
                &dst.clone().into(),
                &Composite::SRC,
                &ClipRegion::unbounded(),
                ScaleRect::new(Rect::new(0, 0, 4, 1), (0.0, 0.0, 8.0, 2.0), Interpolation::Bilinear),
            )
            .unwrap();

        let row: Vec<u32> = (0..8).map(|x| dst.read().get(x, 1)).collect();
        assert_eq!(row[..4], [0xFF11_1111, 0xFF11_1111, 0xFF22_2222, 0xFF22_2222]);
        assert_eq!(row[4..], [0, 0, 0, 0]);
    }

    #[test]
    fn draw_image_asks_the_producer() {
        let (queue, _log) = queue_with(FakeExecutor::default(), 0);
        let registry = PrimitiveRegistry::new();
        let image = CpuImage::from_buffer(PixelBuffer::solid(PixelFormat::IntArgbPre, 2, 2, 0xFF00_FF00));
        let dst = CpuImage::new(PixelFormat::IntRgb, 4, 4);

        Blitter::new(&queue, &registry)
            .draw_image(&image, &dst.clone().into(), &Composite::SRC_OVER, &ClipRegion::unbounded(), 2, 2)
            .unwrap();

        assert_eq!(dst.read().get(3, 3), 0xFF00_FF00);
        assert_eq!(dst.read().get(1, 1), 0xFF00_0000);
    }

    #[test]
    fn fill_batches_offscreen_and_flushes_onscreen() {
        let (queue, log) = queue_with(FakeExecutor::default(), 0);
        let registry = PrimitiveRegistry::new();
        let config = Arc::new(TestConfig::new(1));
        let rtt: SurfaceRef = surface(&config, 40, SurfaceKind::RenderTargetTexture, 8, 8, Transparency::Opaque).into();
        let onscreen: SurfaceRef = surface(&config, 41, SurfaceKind::OnscreenSurface, 8, 8, Transparency::Opaque).into();
        let texture: SurfaceRef = surface(&config, 42, SurfaceKind::Texture, 8, 8, Transparency::Opaque).into();
        let blitter = Blitter::new(&queue, &registry);
        let paint = Paint::Color(0xFF12_3456);
        let clip = ClipRegion::unbounded();

        blitter.fill_rect(&rtt, &Composite::SRC, &clip, &paint, Rect::new(-2, -2, 4, 4)).unwrap();
        assert_eq!(log.execute_calls(), 0);
        blitter.fill_rect(&onscreen, &Composite::SRC, &clip, &paint, Rect::new(0, 0, 4, 4)).unwrap();
        assert_eq!(log.execute_calls(), 1);
        let fills: Vec<_> = log
            .records()
            .into_iter()
            .filter(|r| matches!(r, Record::FillRect { .. }))
            .collect();
        assert_eq!(fills[0], Record::FillRect { x: 0, y: 0, w: 4, h: 4 });
        assert!(log.records().contains(&Record::SetColor { argb_pre: 0xFF12_3456 }));

        assert!(blitter.fill_rect(&texture, &Composite::SRC, &clip, &paint, Rect::new(0, 0, 4, 4)).is_err());
    }

    #[test]
    fn interpolation_ids_round_trip() {
        for hint in [Interpolation::Nearest, Interpolation::Bilinear, Interpolation::Bicubic] {
            assert_eq!(Interpolation::from_id(hint.id()), Some(hint));
        }
        assert_eq!(Interpolation::from_id(0), None);
    }
}
