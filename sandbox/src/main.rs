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

// Strata Sandbox
// Draws a small scene through the render queue and the software device.
//
// Usage: sandbox [settings.json]

use std::sync::Arc;

use anyhow::{Context, Result};
use strata_core::{
    ClipRegion, Composite, CompositeRule, CpuImage, GraphicsConfig, Paint, PixelBuffer,
    PixelFormat, Rect, SurfaceCaps, SurfaceKind, SurfaceRef, SurfaceRequest, Transparency,
};
use strata_infra::{logging, SoftwareDevice};
use strata_pipeline::{
    BlitRect, Blitter, Interpolation, PrimitiveRegistry, QueueSettings, RenderQueue, ScaleRect,
};

const CANVAS: u32 = 128;
const SCREEN: u32 = 256;

fn load_settings() -> Result<QueueSettings> {
    let Some(path) = std::env::args().nth(1) else {
        return Ok(QueueSettings::default());
    };
    let json = std::fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
    let settings = QueueSettings::from_json(&json).with_context(|| format!("parsing {path}"))?;
    log::info!("Loaded queue settings from {path}.");
    Ok(settings)
}

/// A 64x64 image with red growing along x and blue along y.
fn gradient() -> Arc<CpuImage> {
    let pixels: Vec<u32> = (0..64u32)
        .flat_map(|y| (0..64u32).map(move |x| 0xFF00_0000 | (x * 4) << 16 | (y * 4)))
        .collect();
    CpuImage::from_buffer(PixelBuffer::from_argb_pre(64, 64, &pixels))
}

fn main() -> Result<()> {
    logging::init();

    let settings = load_settings()?;
    let device = SoftwareDevice::default();
    let config: Arc<dyn GraphicsConfig> = device.create_config(
        SurfaceCaps::TEXTURE_NPOT
            | SurfaceCaps::RENDER_TO_TEXTURE
            | SurfaceCaps::DOUBLEBUFFERED
            | SurfaceCaps::STORED_ALPHA,
    );
    let queue = RenderQueue::new(device.executor(), settings)?;
    let registry = PrimitiveRegistry::new();
    let blitter = Blitter::new(&queue, &registry);

    // --- 1. Surfaces ---
    let request = |kind, size| SurfaceRequest::new(kind, size, size, Transparency::Translucent);
    let screen = queue.create_surface(&config, request(SurfaceKind::OnscreenSurface, SCREEN))?;
    let canvas = queue.create_surface(&config, request(SurfaceKind::RenderTargetTexture, CANVAS))?;
    let screen_ref = SurfaceRef::Gpu(Arc::clone(&screen));
    let canvas_ref = SurfaceRef::Gpu(Arc::clone(&canvas));
    let everywhere = ClipRegion::unbounded();

    // --- 2. Scene: a backdrop, a translucent gradient and a clipped bar ---
    blitter.fill_rect(
        &canvas_ref,
        &Composite::SRC,
        &everywhere,
        &Paint::Color(0xFF20_2020),
        canvas.bounds(),
    )?;
    let image = gradient();
    blitter.draw_image(
        &image,
        &canvas_ref,
        &Composite::alpha(CompositeRule::SrcOver, 0.75),
        &everywhere,
        32,
        32,
    )?;
    let bars = ClipRegion::from_spans([Rect::new(0, 100, 128, 104), Rect::new(0, 110, 128, 114)]);
    blitter.fill_rect(
        &canvas_ref,
        &Composite::SRC_OVER,
        &bars,
        &Paint::Color(0xFF00_C000),
        canvas.bounds(),
    )?;

    // --- 3. Present the canvas stretched over the screen ---
    let stretch = ScaleRect::new(
        canvas.bounds(),
        (0.0, 0.0, f64::from(SCREEN), f64::from(SCREEN)),
        Interpolation::Bilinear,
    );
    blitter.scale(&canvas_ref, &screen_ref, &Composite::SRC, &everywhere, stretch)?;
    queue.swap_buffers(&screen)?;

    // --- 4. Read a corner back ---
    let readback = CpuImage::new(PixelFormat::IntArgbPre, 16, 16);
    let center = (SCREEN / 2) as i32;
    blitter.blit(
        &screen_ref,
        &SurfaceRef::Cpu(Arc::clone(&readback)),
        &Composite::SRC,
        &everywhere,
        BlitRect::new(center, center, 0, 0, 16, 16),
    )?;
    log::info!("Screen center reads {:#010x}.", readback.read().get(0, 0));

    // --- 5. Teardown ---
    queue.dispose_surface(&canvas)?;
    queue.dispose_surface(&screen)?;
    queue.dispose_config(config.as_ref())?;

    log::info!("Queue: {:?}", queue.stats());
    log::info!("Context: {:?}", queue.context_stats());
    log::info!("Generic dispatch: {:?}", registry.generic_stats());
    log::info!(
        "Device holds {} surfaces ({} bytes).",
        device.surface_count(),
        device.bytes_allocated()
    );
    Ok(())
}
