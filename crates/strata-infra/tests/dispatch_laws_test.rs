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

use anyhow::Result;
use std::sync::Arc;
use strata_core::{
    AffineTransform, ClipRegion, Composite, CompositeRule, CpuImage, GraphicsConfig, Paint,
    PixelBuffer, PixelFormat, Rect, SurfaceCaps, SurfaceKind, SurfaceRef, SurfaceRequest,
    Transparency,
};
use strata_infra::{logging, Recording, RecordingExecutor, SoftwareDevice};
use strata_pipeline::{
    BlitRect, Blitter, Opcode, PrimitiveRegistry, QueueSettings, RenderQueue, ValidateFlags,
    ValidateRequest,
};

// --- Test Setup ---
struct Harness {
    device: SoftwareDevice,
    config: Arc<dyn GraphicsConfig>,
    queue: RenderQueue,
    registry: PrimitiveRegistry,
    recording: Recording,
}

impl Harness {
    fn new() -> Result<Self> {
        logging::init_for_tests();
        let device = SoftwareDevice::default();
        let config: Arc<dyn GraphicsConfig> = device.create_config(
            SurfaceCaps::TEXTURE_NPOT | SurfaceCaps::RENDER_TO_TEXTURE | SurfaceCaps::STORED_ALPHA,
        );
        let executor = RecordingExecutor::wrapping(device.executor());
        let recording = executor.recording();
        let settings = QueueSettings {
            idle_flush_interval_ms: 0,
            ..QueueSettings::default()
        };
        Ok(Self {
            device,
            config,
            queue: RenderQueue::new(executor, settings)?,
            registry: PrimitiveRegistry::new(),
            recording,
        })
    }

    fn surface(&self, kind: SurfaceKind, w: u32, h: u32) -> Result<SurfaceRef> {
        let request = SurfaceRequest::new(kind, w, h, Transparency::Translucent);
        Ok(self.queue.create_surface(&self.config, request)?.into())
    }

    fn blitter(&self) -> Blitter<'_> {
        Blitter::new(&self.queue, &self.registry)
    }

    /// A texture holding a 16x16 pattern with varying alpha.
    fn patterned_texture(&self) -> Result<SurfaceRef> {
        let texture = self.surface(SurfaceKind::Texture, 16, 16)?;
        let pixels: Vec<u32> = (0..256u32)
            .map(|i| {
                let a = 0x40 + (i % 4) * 0x3F;
                let c = (i * 7) & 0xFF;
                strata_core::pixel::premultiply(a << 24 | c << 16 | (0xFF - c) << 8 | 0x80)
            })
            .collect();
        let seed: SurfaceRef = CpuImage::from_buffer(PixelBuffer::from_argb_pre(16, 16, &pixels)).into();
        self.blitter().blit(
            &seed,
            &texture,
            &Composite::SRC,
            &ClipRegion::unbounded(),
            BlitRect::new(0, 0, 0, 0, 16, 16),
        )?;
        Ok(texture)
    }

    fn pixels(&self, surface: &SurfaceRef) -> PixelBuffer {
        self.device
            .pixels(surface.handle())
            .expect("surface is still allocated")
    }
}
// ---

#[test]
fn test_generic_copy_matches_explicit_canonical_copy() -> Result<()> {
    let h = Harness::new()?;
    let src = h.patterned_texture()?;
    let via_generic = h.surface(SurfaceKind::Texture, 16, 16)?;
    let via_explicit = h.surface(SurfaceKind::Texture, 16, 16)?;
    let clip = ClipRegion::unbounded();
    let rect = BlitRect::new(2, 3, 4, 1, 10, 9);

    // No loop copies texture to texture, so this goes through the adapter.
    h.blitter()
        .blit(&src, &via_generic, &Composite::SRC, &clip, rect)?;
    assert_eq!(h.registry.generic_stats().invocations, 1);

    // The same copy with the canonical step spelled out, over direct loops only.
    let canonical: SurfaceRef = CpuImage::new(PixelFormat::CANONICAL, 10, 9).into();
    h.blitter().blit(
        &src,
        &canonical,
        &Composite::SRC,
        &clip,
        BlitRect::new(2, 3, 0, 0, 10, 9),
    )?;
    h.blitter().blit(
        &canonical,
        &via_explicit,
        &Composite::SRC,
        &clip,
        BlitRect::new(0, 0, 4, 1, 10, 9),
    )?;
    assert_eq!(h.registry.generic_stats().invocations, 1);

    assert_eq!(h.pixels(&via_generic), h.pixels(&via_explicit));
    assert_ne!(h.pixels(&via_generic).get(4, 1), 0);
    Ok(())
}

#[test]
fn test_generic_blend_matches_explicit_canonical_copy() -> Result<()> {
    let h = Harness::new()?;
    let src = h.patterned_texture()?;
    let via_generic = h.patterned_texture()?;
    let via_explicit = h.patterned_texture()?;
    let half_over = Composite::alpha(CompositeRule::SrcOver, 0.5);
    let clip = ClipRegion::from_spans([Rect::new(0, 0, 16, 6), Rect::new(4, 6, 12, 16)]);

    h.blitter()
        .blit(&src, &via_generic, &half_over, &clip, BlitRect::new(0, 0, 3, 3, 12, 12))?;

    let canonical: SurfaceRef = CpuImage::new(PixelFormat::CANONICAL, 12, 12).into();
    h.blitter().blit(
        &src,
        &canonical,
        &Composite::SRC,
        &ClipRegion::unbounded(),
        BlitRect::new(0, 0, 0, 0, 12, 12),
    )?;
    h.blitter()
        .blit(&canonical, &via_explicit, &half_over, &clip, BlitRect::new(0, 0, 3, 3, 12, 12))?;

    assert_eq!(h.pixels(&via_generic), h.pixels(&via_explicit));
    assert_ne!(h.pixels(&via_generic), h.pixels(&src));
    Ok(())
}

#[test]
fn test_identical_validates_rebind_at_most_once() -> Result<()> {
    let h = Harness::new()?;
    let dst = h.surface(SurfaceKind::RenderTargetTexture, 8, 8)?;
    let desc = dst.as_gpu().expect("driver surface");
    let clip = ClipRegion::rect(Rect::new(1, 1, 7, 7));
    let composite = Composite::SRC_OVER;
    let transform = AffineTransform::translation(1.0, 0.0);
    let paint = Paint::Color(0xFF00_FF00);
    let request = ValidateRequest::new(desc)
        .clip(&clip)
        .composite(&composite, ValidateFlags::empty())
        .transform(&transform)
        .paint(&paint);

    let guard = h.queue.lock();
    guard.validate(&request);
    let after_first = guard.pending_records();
    guard.validate(&request);
    assert_eq!(guard.pending_records(), after_first);
    guard.flush_now()?;
    drop(guard);
    assert_eq!(h.recording.count(Opcode::SetSurfaces), 1);

    // After an invalidation the same state is bound again from scratch.
    let guard = h.queue.lock();
    guard.invalidate_context()?;
    guard.validate(&request);
    guard.flush_now()?;
    drop(guard);
    assert_eq!(h.recording.count(Opcode::SetSurfaces), 2);
    assert_eq!(h.recording.count(Opcode::InvalidateContext), 1);
    Ok(())
}

#[test]
fn test_repeated_fills_share_one_binding() -> Result<()> {
    let h = Harness::new()?;
    let dst = h.surface(SurfaceKind::RenderTargetTexture, 8, 8)?;
    let clip = ClipRegion::unbounded();
    let paint = Paint::Color(0xFF00_00FF);
    let rebinds = h.queue.context_stats().rebinds;

    for x in 0..4 {
        h.blitter()
            .fill_rect(&dst, &Composite::SRC, &clip, &paint, Rect::new(x * 2, 0, x * 2 + 1, 8))?;
    }
    h.queue.flush_now()?;

    assert_eq!(h.queue.context_stats().rebinds, rebinds + 1);
    assert_eq!(h.recording.count(Opcode::SetSurfaces), 1);
    assert_eq!(h.recording.count(Opcode::SetColor), 1);
    assert_eq!(h.recording.count(Opcode::FillRect), 4);
    let pixels = h.pixels(&dst);
    assert_eq!(pixels.get(0, 3), 0xFF00_00FF);
    assert_eq!(pixels.get(1, 3), 0);
    assert_eq!(pixels.get(6, 7), 0xFF00_00FF);
    Ok(())
}

#[test]
fn test_xor_onto_a_drawable_surface_round_trips_through_software() -> Result<()> {
    // --- 1. Setup: a uniformly filled screen and a source with mixed alpha ---
    let h = Harness::new()?;
    let screen = h.surface(SurfaceKind::OnscreenSurface, 8, 8)?;
    let backdrop = 0xFF20_4060;
    h.blitter().fill_rect(
        &screen,
        &Composite::SRC,
        &ClipRegion::unbounded(),
        &Paint::Color(backdrop),
        Rect::new(0, 0, 8, 8),
    )?;
    let source: Vec<u32> = (0..16u32)
        .map(|i| if i % 3 == 0 { 0x4010_1010 } else { 0xFF00_00FF | i << 12 })
        .collect();
    let image: SurfaceRef = CpuImage::from_buffer(PixelBuffer::from_argb_pre(4, 4, &source)).into();
    let xor = Composite::xor(0xFF00_FF00);

    // --- 2. Action: no loop paints XOR onto a surface directly ---
    h.blitter().blit(
        &image,
        &screen,
        &xor,
        &ClipRegion::unbounded(),
        BlitRect::new(0, 0, 2, 3, 4, 4),
    )?;

    // --- 3. Assert: every pixel matches the per-pixel XOR rule ---
    assert_eq!(h.registry.generic_stats().composite_fallbacks, 1);
    assert_eq!(h.recording.count(Opcode::SurfaceToSwBlit), 1);
    let pixels = h.pixels(&screen);
    for y in 0..8u32 {
        for x in 0..8u32 {
            let inside = (2..6).contains(&x) && (3..7).contains(&y);
            let expected = if inside {
                let src = source[((y - 3) * 4 + (x - 2)) as usize];
                strata_core::pixel::blend::composite_pixel(&xor, src, backdrop)
            } else {
                backdrop
            };
            assert_eq!(pixels.get(x, y), expected, "pixel ({x}, {y})");
        }
    }
    assert_ne!(pixels.get(3, 3), backdrop);
    Ok(())
}
